use async_trait::async_trait;
use keel_core::retry::{Decision, OperationContext, Probe, RetryObserver, RetrySession};

use super::{PollError, Poller, ProbeFailure};
use crate::client::PlatformClient;
use crate::diagnostics::Diagnostics;
use crate::request::{HttpOptions, Request};

/// Polls until GET answers 404
///
/// Safe to repeat against an absent resource: the first 404 ends the loop.
struct RemovalProbe<'a> {
    client: &'a PlatformClient,
    ctx: &'a OperationContext,
    path: &'a str,
    diagnostics: &'a mut Diagnostics,
}

#[async_trait]
impl Probe for RemovalProbe<'_> {
    type Output = ();
    type Error = ProbeFailure;

    async fn attempt(&mut self, session: &mut RetrySession) -> Decision<(), ProbeFailure> {
        let outcome = self
            .client
            .execute(
                self.ctx,
                &Request::get(self.path),
                HttpOptions::allow_404(),
                self.diagnostics,
            )
            .await;
        if !outcome.ok() {
            return Decision::Fail(ProbeFailure::Request("removal-check"));
        }
        if outcome.is_status(404) {
            return Decision::Succeed(());
        }

        if let Some(status) = outcome.status() {
            session.set_progress(format!("(waiting for removal - status: {})", status));
        }
        Decision::retry("not removed yet")
    }
}

impl<O: RetryObserver> Poller<'_, O> {
    /// Wait for the resource at `path` to disappear
    pub async fn wait_for_removal(
        &self,
        ctx: &OperationContext,
        path: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), PollError> {
        let mut probe = RemovalProbe {
            client: self.client,
            ctx,
            path,
            diagnostics: &mut *diagnostics,
        };
        let result = self
            .engine
            .run(ctx, &format!("removal-check {}", path), &mut probe)
            .await;
        Self::settle(result, &format!("{} to be removed", path), diagnostics)
    }
}
