//! Poll engine
//!
//! Runs a [`Probe`] until it returns a terminal [`Decision`], sleeping
//! between attempts according to a `RetryPolicy`. The engine decides nothing
//! about retryability itself; it only enforces the policy bounds and the
//! operation context.

use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::types::RetryPolicy;

use super::context::{Interruption, OperationContext};
use super::error::RetryError;
use super::observer::{RetryObserver, TracingObserver};
use super::strategies::calculate_delay;

/// What a probe wants the engine to do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision<T, E> {
    /// Not there yet; try again after the backoff delay
    Retry(String),
    /// Terminal success
    Succeed(T),
    /// Terminal failure the caller must surface
    Fail(E),
}

impl<T, E> Decision<T, E> {
    pub fn retry(reason: impl Into<String>) -> Self {
        Decision::Retry(reason.into())
    }
}

/// One status check, invoked once per attempt
#[async_trait]
pub trait Probe: Send {
    type Output: Send;
    type Error: Display + Send;

    /// Run one attempt. `session.attempt()` starts at 1.
    async fn attempt(&mut self, session: &mut RetrySession) -> Decision<Self::Output, Self::Error>;
}

/// State of one engine invocation
///
/// The engine owns the attempt counter; the probe owns the progress
/// annotation.
#[derive(Debug, Clone)]
pub struct RetrySession {
    name: String,
    attempt: u32,
    progress: Option<String>,
    started: Instant,
}

impl RetrySession {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attempt: 0,
            progress: None,
            started: Instant::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current attempt number (1-indexed once the first attempt has started)
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn progress(&self) -> Option<&str> {
        self.progress.as_deref()
    }

    /// Replace the progress annotation shown to operators
    pub fn set_progress(&mut self, progress: impl Into<String>) {
        self.progress = Some(progress.into());
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn cancelled<E>(&self, cause: Interruption) -> RetryError<E> {
        RetryError::cancelled(self.attempt, cause, self.progress.clone())
    }
}

/// Builder for configuring a `PollEngine`
///
/// # Example
///
/// ```rust
/// use keel_core::retry::{PollEngineBuilder, StatsObserver};
/// use keel_core::types::RetryPolicy;
///
/// let engine = PollEngineBuilder::new()
///     .with_policy(RetryPolicy::default())
///     .with_observer(StatsObserver::new())
///     .with_jitter(true)
///     .build();
/// ```
pub struct PollEngineBuilder<O = TracingObserver> {
    policy: RetryPolicy,
    observer: O,
    jitter: bool,
}

impl Default for PollEngineBuilder<TracingObserver> {
    fn default() -> Self {
        Self::new()
    }
}

impl PollEngineBuilder<TracingObserver> {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            policy: RetryPolicy::default(),
            observer: TracingObserver,
            jitter: false,
        }
    }
}

impl<O> PollEngineBuilder<O> {
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_observer<O2>(self, observer: O2) -> PollEngineBuilder<O2> {
        PollEngineBuilder {
            policy: self.policy,
            observer,
            jitter: self.jitter,
        }
    }

    /// Enable or disable jitter
    ///
    /// Disabled by default. Jittered delays are still clamped so they never
    /// fall below the previous delay.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn build(self) -> PollEngine<O> {
        PollEngine {
            policy: self.policy,
            observer: self.observer,
            jitter: self.jitter,
        }
    }
}

/// Drives probes under a retry policy
#[derive(Debug, Clone)]
pub struct PollEngine<O = TracingObserver> {
    policy: RetryPolicy,
    observer: O,
    jitter: bool,
}

impl PollEngine<TracingObserver> {
    /// Engine with the given policy, logging through `tracing`
    pub fn new(policy: RetryPolicy) -> Self {
        PollEngineBuilder::new().with_policy(policy).build()
    }

    pub fn builder() -> PollEngineBuilder<TracingObserver> {
        PollEngineBuilder::new()
    }
}

impl<O: RetryObserver> PollEngine<O> {
    /// Run `probe` until it reaches a terminal decision
    ///
    /// # Errors
    ///
    /// - `Failed` when the probe returns `Decision::Fail`
    /// - `Exhausted` when `max_attempts` retries were requested
    /// - `TimedOut` when `max_elapsed_secs` passed, including while an
    ///   attempt is still in flight
    /// - `Cancelled` when `ctx` is cancelled or its deadline passes, either
    ///   during an attempt or during the sleep between attempts
    pub async fn run<P: Probe>(
        &self,
        ctx: &OperationContext,
        name: &str,
        probe: &mut P,
    ) -> Result<P::Output, RetryError<P::Error>> {
        let mut session = RetrySession::new(name);
        let max_elapsed = self.policy.max_elapsed();
        let mut previous_delay = Duration::ZERO;

        loop {
            if let Some(cause) = ctx.interruption() {
                self.observer.on_cancelled(&session, cause);
                return Err(session.cancelled(cause));
            }

            session.attempt += 1;
            self.observer.on_attempt_start(&session);

            let budget = max_elapsed.map(|limit| self.attempt_budget(limit, session.elapsed()));
            let attempt = probe.attempt(&mut session);
            let finished = match budget {
                Some(budget) => ctx
                    .run(tokio::time::timeout(budget, attempt))
                    .await
                    .map(|result| result.ok()),
                None => ctx.run(attempt).await.map(Some),
            };

            let decision = match finished {
                Ok(Some(decision)) => decision,
                Ok(None) => {
                    let reason = "attempt still running at the time limit".to_string();
                    self.observer.on_gave_up(&session, &reason);
                    return Err(RetryError::TimedOut {
                        attempts: session.attempt,
                        elapsed: session.elapsed(),
                        last_reason: reason,
                        progress: session.progress.clone(),
                    });
                }
                Err(cause) => {
                    self.observer.on_cancelled(&session, cause);
                    return Err(session.cancelled(cause));
                }
            };

            let reason = match decision {
                Decision::Succeed(output) => {
                    self.observer.on_success(&session);
                    return Ok(output);
                }
                Decision::Fail(error) => {
                    self.observer.on_failure(&session, &error);
                    return Err(RetryError::failed(session.attempt, error));
                }
                Decision::Retry(reason) => reason,
            };

            if let Some(max_attempts) = self.policy.max_attempts {
                if session.attempt >= max_attempts {
                    self.observer.on_gave_up(&session, &reason);
                    return Err(RetryError::Exhausted {
                        attempts: session.attempt,
                        elapsed: session.elapsed(),
                        last_reason: reason,
                        progress: session.progress.clone(),
                    });
                }
            }

            let mut delay =
                calculate_delay(&self.policy, session.attempt, self.jitter).max(previous_delay);
            previous_delay = delay;

            if let Some(limit) = max_elapsed {
                let elapsed = session.elapsed();
                if elapsed >= limit {
                    self.observer.on_gave_up(&session, &reason);
                    return Err(RetryError::TimedOut {
                        attempts: session.attempt,
                        elapsed,
                        last_reason: reason,
                        progress: session.progress.clone(),
                    });
                }
                // One last check lands exactly on the ceiling
                delay = delay.min(limit - elapsed);
            }

            self.observer.on_retry(&session, &reason, delay);

            if let Err(cause) = ctx.sleep(delay).await {
                self.observer.on_cancelled(&session, cause);
                return Err(session.cancelled(cause));
            }
        }
    }

    /// How long the next attempt may run before the elapsed ceiling stops it
    ///
    /// An attempt that starts with time left is cut off at the ceiling. The
    /// final check, which starts exactly on the ceiling, gets one maximum
    /// backoff delay to finish.
    fn attempt_budget(&self, limit: Duration, elapsed: Duration) -> Duration {
        match limit.checked_sub(elapsed) {
            Some(remaining) if !remaining.is_zero() => remaining,
            _ => Duration::from_millis(self.policy.max_delay_ms),
        }
    }
}
