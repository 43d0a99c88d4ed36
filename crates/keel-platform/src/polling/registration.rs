//! Two-phase registration check
//!
//! The status endpoint describes two sub-resources: the organization and
//! the node. The organization must be registered before the node. Each
//! attempt re-reads the status and acts only on what it observed:
//!
//! | Observed            | Action                                   |
//! |---------------------|------------------------------------------|
//! | org not registered  | POST org registration (once per session) |
//! | only org registered | POST node registration (once per session)|
//! | both registered     | done                                     |
//!
//! A POST is never assumed to have worked; the next GET confirms it.

use async_trait::async_trait;
use keel_core::retry::{Decision, OperationContext, Probe, RetryObserver, RetrySession};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{PollError, Poller, ProbeFailure};
use crate::client::PlatformClient;
use crate::diagnostics::Diagnostics;
use crate::request::{HttpOptions, Request};

pub const STATUS_PATH: &str = "status";
pub const ORG_REGISTRATION_PATH: &str = "network/organizations/self";
pub const NODE_REGISTRATION_PATH: &str = "network/nodes/self";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verifier {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgStatus {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub registered: bool,
    #[serde(default)]
    pub did: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub verifiers: Vec<Verifier>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub registered: bool,
    #[serde(default)]
    pub id: String,
}

/// Combined status of the organization and node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationStatus {
    #[serde(default)]
    pub org: OrgStatus,
    #[serde(default)]
    pub node: NodeStatus,
}

/// Registration progress as observed from the status endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationPhase {
    /// The organization is not registered (whatever the node reports)
    Unregistered,
    /// The organization is registered but the node is not
    OrgRegistered,
    /// Both are registered
    Complete,
}

impl RegistrationStatus {
    pub fn phase(&self) -> RegistrationPhase {
        match (self.org.registered, self.node.registered) {
            (true, true) => RegistrationPhase::Complete,
            (true, false) => RegistrationPhase::OrgRegistered,
            (false, _) => RegistrationPhase::Unregistered,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.phase() == RegistrationPhase::Complete
    }

    /// Verifier values of the organization
    pub fn org_verifiers(&self) -> Vec<&str> {
        self.org.verifiers.iter().map(|v| v.value.as_str()).collect()
    }
}

fn join(base: &str, suffix: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), suffix)
}

struct RegistrationProbe<'a> {
    client: &'a PlatformClient,
    ctx: &'a OperationContext,
    base: &'a str,
    diagnostics: &'a mut Diagnostics,
    org_submitted: bool,
    node_submitted: bool,
}

impl RegistrationProbe<'_> {
    /// POST an empty registration request; false when it failed
    async fn submit(&mut self, suffix: &str) -> bool {
        let path = join(self.base, suffix);
        info!("Submitting registration: POST {}", path);
        let request = Request::post(path).json(&serde_json::json!({}));
        self.client
            .execute(self.ctx, &request, HttpOptions::default(), self.diagnostics)
            .await
            .ok()
    }
}

#[async_trait]
impl Probe for RegistrationProbe<'_> {
    type Output = RegistrationStatus;
    type Error = ProbeFailure;

    async fn attempt(
        &mut self,
        session: &mut RetrySession,
    ) -> Decision<RegistrationStatus, ProbeFailure> {
        let outcome = self
            .client
            .execute_for::<RegistrationStatus>(
                self.ctx,
                &Request::get(join(self.base, STATUS_PATH)),
                HttpOptions::default(),
                self.diagnostics,
            )
            .await;
        if !outcome.ok() {
            return Decision::Fail(ProbeFailure::Request("status-check"));
        }

        let status = outcome.into_value().unwrap_or_default();
        session.set_progress(format!(
            "(waiting for registration - org registered: {}, node registered: {})",
            status.org.registered, status.node.registered
        ));

        match status.phase() {
            RegistrationPhase::Complete => return Decision::Succeed(status),
            RegistrationPhase::Unregistered if !self.org_submitted => {
                if !self.submit(ORG_REGISTRATION_PATH).await {
                    return Decision::Fail(ProbeFailure::Request("org-register"));
                }
                self.org_submitted = true;
            }
            RegistrationPhase::OrgRegistered if !self.node_submitted => {
                if !self.submit(NODE_REGISTRATION_PATH).await {
                    return Decision::Fail(ProbeFailure::Request("node-register"));
                }
                self.node_submitted = true;
            }
            _ => {}
        }
        Decision::retry("waiting for registration to complete")
    }
}

impl<O: RetryObserver> Poller<'_, O> {
    /// Drive the organization and node under `base` to registered
    ///
    /// `base` is the service's API root; the status and registration
    /// endpoints are resolved relative to it. Returns the final status,
    /// which carries the organization DID, verifiers and node ID.
    pub async fn ensure_registered(
        &self,
        ctx: &OperationContext,
        base: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<RegistrationStatus, PollError> {
        let mut probe = RegistrationProbe {
            client: self.client,
            ctx,
            base,
            diagnostics: &mut *diagnostics,
            org_submitted: false,
            node_submitted: false,
        };
        let result = self
            .engine
            .run(ctx, &format!("register {}", base), &mut probe)
            .await;
        Self::settle(result, &format!("registration of {}", base), diagnostics)
    }
}
