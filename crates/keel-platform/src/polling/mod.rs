//! Status-polling protocols
//!
//! Each protocol is a [`Probe`](keel_core::retry::Probe) that GETs a
//! resource and maps what it sees onto retry, success or failure. A
//! [`Poller`] pairs a `PlatformClient` with a `PollEngine` and exposes one
//! entry point per protocol.
//!
//! Diagnostics follow one rule: a protocol that ends without success leaves
//! at least one diagnostic behind. Request failures are already recorded by
//! the executor, domain failures by the probe, and giving up (timeout or
//! cancellation) by [`Poller::settle`].

mod completion;
mod ready;
mod registration;
mod removal;

pub use completion::{ActionStatus, BuildStatus};
pub use registration::{
    NodeStatus, OrgStatus, RegistrationPhase, RegistrationStatus, Verifier, NODE_REGISTRATION_PATH,
    ORG_REGISTRATION_PATH, STATUS_PATH,
};

use keel_core::retry::{PollEngine, RetryError, RetryObserver, TracingObserver};
use thiserror::Error;

use crate::client::PlatformClient;
use crate::diagnostics::Diagnostics;

/// Terminal failure reported by a polling probe
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// An HTTP call inside the probe failed; the executor recorded why
    #[error("{0} failed")]
    Request(&'static str),

    /// The remote object reached a state it will not recover from
    #[error("{0}")]
    Domain(String),
}

/// Error returned by every polling protocol
pub type PollError = RetryError<ProbeFailure>;

/// Runs polling protocols against one platform client
pub struct Poller<'a, O = TracingObserver> {
    client: &'a PlatformClient,
    engine: PollEngine<O>,
}

impl<'a, O: RetryObserver> Poller<'a, O> {
    pub fn new(client: &'a PlatformClient, engine: PollEngine<O>) -> Self {
        Self { client, engine }
    }

    /// Record a diagnostic when the engine gave up waiting
    ///
    /// Probe failures pass through untouched since their diagnostic was
    /// recorded where the failure happened.
    fn settle<T>(
        result: Result<T, PollError>,
        waiting_for: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<T, PollError> {
        if let Err(err) = &result {
            let detail = match err.progress() {
                Some(progress) => format!("{} {}", err, progress),
                None => err.to_string(),
            };
            match err {
                RetryError::Failed { .. } => {}
                RetryError::Exhausted { .. } | RetryError::TimedOut { .. } => {
                    diagnostics.add_error(format!("Timed out waiting for {}", waiting_for), detail);
                }
                RetryError::Cancelled { .. } => {
                    diagnostics.add_error(format!("Cancelled waiting for {}", waiting_for), detail);
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::retry::Interruption;
    use std::time::Duration;

    type Settle = Poller<'static, TracingObserver>;

    #[test]
    fn test_settle_leaves_probe_failures_alone() {
        let mut diags = Diagnostics::new();
        let result: Result<(), PollError> = Err(RetryError::failed(
            1,
            ProbeFailure::Request("ready-check"),
        ));

        let err = Settle::settle(result, "/r1 to be ready", &mut diags).unwrap_err();

        assert_eq!(err.to_string(), "failed on attempt 1: ready-check failed");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_settle_reports_timeout_with_progress() {
        let mut diags = Diagnostics::new();
        let result: Result<(), PollError> = Err(RetryError::TimedOut {
            attempts: 12,
            elapsed: Duration::from_secs(600),
            last_reason: "not ready yet".to_string(),
            progress: Some("(waiting for ready - status: pending)".to_string()),
        });

        let _ = Settle::settle(result, "/r1 to be ready", &mut diags);

        let diag = diags.last().unwrap();
        assert_eq!(diag.summary, "Timed out waiting for /r1 to be ready");
        assert!(diag.detail.ends_with("(waiting for ready - status: pending)"));
    }

    #[test]
    fn test_settle_reports_cancellation() {
        let mut diags = Diagnostics::new();
        let result: Result<(), PollError> =
            Err(RetryError::cancelled(2, Interruption::Cancelled, None));

        let _ = Settle::settle(result, "/r1 to be removed", &mut diags);

        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags.last().map(|d| d.summary.as_str()),
            Some("Cancelled waiting for /r1 to be removed")
        );
    }

    #[test]
    fn test_settle_passes_success_through() {
        let mut diags = Diagnostics::new();
        let value = Settle::settle(Ok(7), "anything", &mut diags).unwrap();
        assert_eq!(value, 7);
        assert!(diags.is_empty());
    }
}
