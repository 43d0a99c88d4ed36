use async_trait::async_trait;
use keel_core::retry::{Decision, OperationContext, Probe, RetryObserver, RetrySession};
use serde::Deserialize;

use super::{PollError, Poller, ProbeFailure};
use crate::client::PlatformClient;
use crate::diagnostics::Diagnostics;
use crate::request::{HttpOptions, Request};

#[derive(Debug, Default, Deserialize)]
struct StatusBody {
    #[serde(default)]
    status: String,
}

/// Polls until the resource reports `status: ready` (any case)
struct ReadyProbe<'a> {
    client: &'a PlatformClient,
    ctx: &'a OperationContext,
    path: &'a str,
    diagnostics: &'a mut Diagnostics,
}

#[async_trait]
impl Probe for ReadyProbe<'_> {
    type Output = ();
    type Error = ProbeFailure;

    async fn attempt(&mut self, session: &mut RetrySession) -> Decision<(), ProbeFailure> {
        let outcome = self
            .client
            .execute_for::<StatusBody>(
                self.ctx,
                &Request::get(self.path),
                HttpOptions::default(),
                self.diagnostics,
            )
            .await;
        if !outcome.ok() {
            return Decision::Fail(ProbeFailure::Request("ready-check"));
        }

        let status = outcome.into_value().unwrap_or_default().status;
        if status.eq_ignore_ascii_case("ready") {
            return Decision::Succeed(());
        }
        session.set_progress(format!("(waiting for ready - status: {})", status));
        Decision::retry("not ready yet")
    }
}

impl<O: RetryObserver> Poller<'_, O> {
    /// Wait for the resource at `path` to become ready
    pub async fn wait_for_ready(
        &self,
        ctx: &OperationContext,
        path: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), PollError> {
        let mut probe = ReadyProbe {
            client: self.client,
            ctx,
            path,
            diagnostics: &mut *diagnostics,
        };
        let result = self
            .engine
            .run(ctx, &format!("ready-check {}", path), &mut probe)
            .await;
        Self::settle(result, &format!("{} to be ready", path), diagnostics)
    }
}
