//! Build and action completion checks
//!
//! Both follow the same partition of the `status` field: `succeeded` ends
//! the loop successfully, `failed` ends it with a domain failure, and every
//! other value (including an empty one) asks for another attempt.

use async_trait::async_trait;
use keel_core::retry::{Decision, OperationContext, Probe, RetryObserver, RetrySession};
use serde::{Deserialize, Serialize};

use super::{PollError, Poller, ProbeFailure};
use crate::client::PlatformClient;
use crate::diagnostics::Diagnostics;
use crate::request::{HttpOptions, Request};

const STATUS_SUCCEEDED: &str = "succeeded";
const STATUS_FAILED: &str = "failed";

/// Build resource as returned by the platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile_error: Option<String>,
}

/// Asynchronous action as returned by the platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Where a status string lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completion {
    Succeeded,
    Failed,
    Pending,
}

fn classify(status: &str) -> Completion {
    match status {
        STATUS_SUCCEEDED => Completion::Succeeded,
        STATUS_FAILED => Completion::Failed,
        _ => Completion::Pending,
    }
}

fn waiting(status: &str) -> String {
    format!("(waiting for completion - status: {})", status)
}

struct BuildProbe<'a> {
    client: &'a PlatformClient,
    ctx: &'a OperationContext,
    path: &'a str,
    diagnostics: &'a mut Diagnostics,
}

#[async_trait]
impl Probe for BuildProbe<'_> {
    type Output = BuildStatus;
    type Error = ProbeFailure;

    async fn attempt(&mut self, session: &mut RetrySession) -> Decision<BuildStatus, ProbeFailure> {
        let outcome = self
            .client
            .execute_for::<BuildStatus>(
                self.ctx,
                &Request::get(self.path),
                HttpOptions::default(),
                self.diagnostics,
            )
            .await;
        if !outcome.ok() {
            return Decision::Fail(ProbeFailure::Request("build-check"));
        }

        let build = outcome.into_value().unwrap_or_default();
        session.set_progress(waiting(&build.status));
        match classify(&build.status) {
            Completion::Succeeded => Decision::Succeed(build),
            Completion::Failed => {
                self.diagnostics
                    .add_error("build failed", build.compile_error.unwrap_or_default());
                Decision::Fail(ProbeFailure::Domain("build failed".to_string()))
            }
            Completion::Pending => Decision::retry("not ready yet"),
        }
    }
}

struct ActionProbe<'a> {
    client: &'a PlatformClient,
    ctx: &'a OperationContext,
    path: &'a str,
    diagnostics: &'a mut Diagnostics,
}

#[async_trait]
impl Probe for ActionProbe<'_> {
    type Output = ActionStatus;
    type Error = ProbeFailure;

    async fn attempt(
        &mut self,
        session: &mut RetrySession,
    ) -> Decision<ActionStatus, ProbeFailure> {
        let outcome = self
            .client
            .execute_for::<ActionStatus>(
                self.ctx,
                &Request::get(self.path),
                HttpOptions::default().allow(429),
                self.diagnostics,
            )
            .await;
        if !outcome.ok() {
            return Decision::Fail(ProbeFailure::Request("action-check"));
        }
        if outcome.is_status(429) {
            return Decision::retry("rate limit exceeded");
        }

        let action = outcome.into_value().unwrap_or_default();
        session.set_progress(waiting(&action.status));
        match classify(&action.status) {
            Completion::Succeeded => Decision::Succeed(action),
            Completion::Failed => {
                self.diagnostics
                    .add_error("action failed", action.error.unwrap_or_default());
                Decision::Fail(ProbeFailure::Domain("action failed".to_string()))
            }
            Completion::Pending => Decision::retry("not ready yet"),
        }
    }
}

impl<O: RetryObserver> Poller<'_, O> {
    /// Wait for the build at `path` to finish compiling
    ///
    /// A failed build records its compile error as a diagnostic.
    pub async fn wait_for_build(
        &self,
        ctx: &OperationContext,
        path: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<BuildStatus, PollError> {
        let mut probe = BuildProbe {
            client: self.client,
            ctx,
            path,
            diagnostics: &mut *diagnostics,
        };
        let result = self
            .engine
            .run(ctx, &format!("build-check {}", path), &mut probe)
            .await;
        Self::settle(result, &format!("build {} to complete", path), diagnostics)
    }

    /// Wait for the action at `path` to finish
    ///
    /// A 429 from the status endpoint is treated as "try again later".
    pub async fn wait_for_action(
        &self,
        ctx: &OperationContext,
        path: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<ActionStatus, PollError> {
        let mut probe = ActionProbe {
            client: self.client,
            ctx,
            path,
            diagnostics: &mut *diagnostics,
        };
        let result = self
            .engine
            .run(ctx, &format!("action-check {}", path), &mut probe)
            .await;
        Self::settle(result, &format!("action {} to complete", path), diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_partition() {
        assert_eq!(classify("succeeded"), Completion::Succeeded);
        assert_eq!(classify("failed"), Completion::Failed);
        for other in ["", "pending", "running", "Succeeded", "FAILED", "unknown"] {
            assert_eq!(classify(other), Completion::Pending, "status {:?}", other);
        }
    }

    #[test]
    fn test_build_status_decoding() {
        let build: BuildStatus =
            serde_json::from_str(r#"{"status":"failed","compileError":"syntax error","id":"b1"}"#)
                .unwrap();
        assert_eq!(build.status, "failed");
        assert_eq!(build.compile_error.as_deref(), Some("syntax error"));

        let empty: BuildStatus = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, BuildStatus::default());
    }

    #[test]
    fn test_progress_text() {
        assert_eq!(
            waiting("pending"),
            "(waiting for completion - status: pending)"
        );
    }
}
