//! Builders for clients, policies and engines used across tests

use std::sync::Arc;
use std::time::Duration;

use keel_core::retry::{
    OperationContext, PollEngine, PollEngineBuilder, RetryObserver, RetrySession, StatsObserver,
};
use keel_core::types::{NetworkConfig, ProviderConfig, RetryPolicy, RetryStrategy};
use keel_platform::PlatformClient;
use wiremock::MockServer;

/// Provider config pointing at the mock server
///
/// Rate-limit retries are off so each mock response is seen exactly once.
pub fn test_config(server: &MockServer) -> ProviderConfig {
    ProviderConfig {
        platform_api: Some(server.uri()),
        network: NetworkConfig {
            http_timeout_secs: 5,
            rate_limit_retries: 0,
            ..NetworkConfig::default()
        },
        polling: quick_policy(),
        ..ProviderConfig::default()
    }
}

pub fn test_client(server: &MockServer) -> PlatformClient {
    PlatformClient::new(&test_config(server)).expect("client should build")
}

/// Polling policy with short fixed delays
pub fn quick_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: Some(20),
        max_elapsed_secs: Some(10),
        strategy: RetryStrategy::FixedDelay,
        backoff_multiplier: 1.0,
        initial_delay_ms: 10,
        max_delay_ms: 10,
    }
}

/// Engine that records every session event
pub fn observed_engine(stats: &Arc<StatsObserver>) -> PollEngine<Arc<StatsObserver>> {
    PollEngineBuilder::new()
        .with_policy(quick_policy())
        .with_observer(stats.clone())
        .build()
}

/// Observer that cancels the context once the given attempt asks to retry
pub struct CancelOnRetry {
    pub attempt: u32,
    pub ctx: OperationContext,
}

impl RetryObserver for CancelOnRetry {
    fn on_attempt_start(&self, _session: &RetrySession) {}

    fn on_retry(&self, session: &RetrySession, _reason: &str, _delay: Duration) {
        if session.attempt() >= self.attempt {
            self.ctx.cancel();
        }
    }

    fn on_success(&self, _session: &RetrySession) {}

    fn on_failure(&self, _session: &RetrySession, _error: &dyn std::fmt::Display) {}

    fn on_gave_up(&self, _session: &RetrySession, _reason: &str) {}
}
