//! Ambient operation context
//!
//! Every lifecycle operation carries one `OperationContext`. It combines a
//! cancellation token with an optional deadline, and is consulted by both
//! suspension points in the system: the engine's inter-attempt sleep and
//! the in-flight HTTP call.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why an operation stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interruption {
    /// The cancellation token fired
    #[error("operation cancelled")]
    Cancelled,

    /// The context deadline elapsed
    #[error("operation deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation token plus optional deadline
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl OperationContext {
    /// A context that is never cancelled unless `cancel` is called
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a child context whose deadline is at most `timeout` from now
    ///
    /// Cancelling the parent cancels the child, not the other way round.
    /// A timeout too large to represent leaves the parent's deadline as is.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = match (self.deadline, Instant::now().checked_add(timeout)) {
            (Some(existing), Some(candidate)) => Some(existing.min(candidate)),
            (existing, None) => existing,
            (None, candidate) => candidate,
        };
        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    /// Derive a child context sharing the parent's deadline
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancel this context and every child derived from it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, if one is set
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// The reason this context is done, or `None` while it is still live
    pub fn interruption(&self) -> Option<Interruption> {
        if self.token.is_cancelled() {
            return Some(Interruption::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interruption::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.interruption().is_some()
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub async fn done(&self) -> Interruption {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.token.cancelled() => Interruption::Cancelled,
                _ = tokio::time::sleep_until(deadline) => Interruption::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                Interruption::Cancelled
            }
        }
    }

    /// Race a future against this context
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Interruption> {
        if let Some(reason) = self.interruption() {
            return Err(reason);
        }
        tokio::select! {
            biased;
            reason = self.done() => Err(reason),
            output = fut => Ok(output),
        }
    }

    /// Sleep unless the context finishes first
    pub async fn sleep(&self, duration: Duration) -> Result<(), Interruption> {
        self.run(tokio::time::sleep(duration)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_live_context_runs_future() {
        let ctx = OperationContext::new();
        assert_eq!(ctx.run(async { 7 }).await, Ok(7));
        assert!(!ctx.is_done());
        assert!(ctx.remaining().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_context_short_circuits() {
        let ctx = OperationContext::new();
        ctx.cancel();
        assert_eq!(ctx.interruption(), Some(Interruption::Cancelled));
        assert_eq!(ctx.run(async { 7 }).await, Err(Interruption::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_interrupts_sleep() {
        let ctx = OperationContext::new().with_timeout(Duration::from_secs(1));
        let result = ctx.sleep(Duration::from_secs(60)).await;
        assert_eq!(result, Err(Interruption::DeadlineExceeded));
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_sleep() {
        let ctx = OperationContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let result = ctx.sleep(Duration::from_secs(60)).await;
        assert_eq!(result, Err(Interruption::Cancelled));
    }

    #[tokio::test]
    async fn test_parent_cancellation_reaches_child() {
        let parent = OperationContext::new();
        let child = parent.child();
        parent.cancel();
        assert!(child.is_done());

        let parent = OperationContext::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn test_child_timeout_never_extends_parent_deadline() {
        let parent = OperationContext::new().with_timeout(Duration::from_secs(5));
        let child = parent.with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());

        let tighter = parent.with_timeout(Duration::from_secs(1));
        assert!(tighter.deadline() < parent.deadline());
    }

    #[tokio::test]
    async fn test_unrepresentable_timeout_keeps_parent_deadline() {
        let huge = Duration::from_secs(u64::MAX);

        let root = OperationContext::new().with_timeout(huge);
        assert!(root.deadline().is_none());
        assert_eq!(root.run(async { 7 }).await, Ok(7));

        let parent = OperationContext::new().with_timeout(Duration::from_secs(5));
        let child = parent.with_timeout(huge);
        assert_eq!(child.deadline(), parent.deadline());

        parent.cancel();
        assert_eq!(child.interruption(), Some(Interruption::Cancelled));
    }
}
