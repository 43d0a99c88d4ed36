//! Retry observation and logging
//!
//! This module provides the `RetryObserver` trait for monitoring poll
//! sessions and a `TracingObserver` implementation that logs using the
//! `tracing` crate. Every callback receives the live `RetrySession`, so the
//! operation name, attempt number, and progress annotation are always
//! available to the observer.

use std::fmt::Display;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::context::Interruption;
use super::engine::RetrySession;

/// Observer trait for poll session events
///
/// # Example
///
/// ```rust
/// use keel_core::retry::{RetryObserver, RetrySession};
/// use std::fmt::Display;
/// use std::time::Duration;
///
/// struct PrintObserver;
///
/// impl RetryObserver for PrintObserver {
///     fn on_attempt_start(&self, session: &RetrySession) {
///         println!("{} attempt {}", session.name(), session.attempt());
///     }
///
///     fn on_retry(&self, _session: &RetrySession, reason: &str, delay: Duration) {
///         println!("retrying in {:?}: {}", delay, reason);
///     }
///
///     fn on_success(&self, _session: &RetrySession) {}
///
///     fn on_failure(&self, _session: &RetrySession, _error: &dyn Display) {}
///
///     fn on_gave_up(&self, _session: &RetrySession, _reason: &str) {}
/// }
/// ```
pub trait RetryObserver: Send + Sync {
    /// Called before the probe is invoked
    fn on_attempt_start(&self, session: &RetrySession);

    /// Called when the probe asked for another attempt
    ///
    /// # Arguments
    ///
    /// * `session` - The session, with the probe's latest progress annotation
    /// * `reason` - Why the probe wants to retry
    /// * `delay` - The delay before the next attempt
    fn on_retry(&self, session: &RetrySession, reason: &str, delay: Duration);

    /// Called when the probe reported success
    fn on_success(&self, session: &RetrySession);

    /// Called when the probe reported a terminal failure
    fn on_failure(&self, session: &RetrySession, error: &dyn Display);

    /// Called when the attempt or elapsed-time bound was reached
    fn on_gave_up(&self, session: &RetrySession, reason: &str);

    /// Called when the operation context stopped the session
    fn on_cancelled(&self, session: &RetrySession, cause: Interruption) {
        let _ = (session, cause);
    }
}

/// A no-op observer that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RetryObserver for NoOpObserver {
    fn on_attempt_start(&self, _session: &RetrySession) {}

    fn on_retry(&self, _session: &RetrySession, _reason: &str, _delay: Duration) {}

    fn on_success(&self, _session: &RetrySession) {}

    fn on_failure(&self, _session: &RetrySession, _error: &dyn Display) {}

    fn on_gave_up(&self, _session: &RetrySession, _reason: &str) {}
}

/// An observer that logs session events using the `tracing` crate
///
/// # Log Levels
///
/// - `on_attempt_start`: DEBUG
/// - `on_retry`: INFO with the progress annotation
/// - `on_success`: INFO (if > 1 attempt) or DEBUG (first attempt)
/// - `on_failure`: WARN
/// - `on_gave_up`: ERROR
/// - `on_cancelled`: WARN
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RetryObserver for TracingObserver {
    fn on_attempt_start(&self, session: &RetrySession) {
        tracing::debug!(
            operation = %session.name(),
            attempt = session.attempt(),
            "starting attempt"
        );
    }

    fn on_retry(&self, session: &RetrySession, reason: &str, delay: Duration) {
        tracing::info!(
            operation = %session.name(),
            attempt = session.attempt(),
            progress = session.progress().unwrap_or(""),
            delay_ms = delay.as_millis() as u64,
            "{}",
            reason
        );
    }

    fn on_success(&self, session: &RetrySession) {
        let elapsed_ms = session.elapsed().as_millis() as u64;
        if session.attempt() > 1 {
            tracing::info!(
                operation = %session.name(),
                attempt = session.attempt(),
                elapsed_ms,
                "completed after polling"
            );
        } else {
            tracing::debug!(
                operation = %session.name(),
                elapsed_ms,
                "completed on first attempt"
            );
        }
    }

    fn on_failure(&self, session: &RetrySession, error: &dyn Display) {
        tracing::warn!(
            operation = %session.name(),
            attempt = session.attempt(),
            error = %error,
            "probe reported failure"
        );
    }

    fn on_gave_up(&self, session: &RetrySession, reason: &str) {
        tracing::error!(
            operation = %session.name(),
            attempts = session.attempt(),
            elapsed_ms = session.elapsed().as_millis() as u64,
            progress = session.progress().unwrap_or(""),
            reason,
            "gave up waiting"
        );
    }

    fn on_cancelled(&self, session: &RetrySession, cause: Interruption) {
        tracing::warn!(
            operation = %session.name(),
            attempt = session.attempt(),
            cause = %cause,
            "polling stopped"
        );
    }
}

/// An observer that collects statistics about poll sessions
///
/// Useful for testing and metrics collection. The progress annotation seen
/// on every retry is recorded in order.
#[derive(Debug, Default)]
pub struct StatsObserver {
    attempt_starts: AtomicU32,
    retries: AtomicU32,
    successes: AtomicU32,
    failures: AtomicU32,
    give_ups: AtomicU32,
    cancellations: AtomicU32,
    progress_log: Mutex<Vec<String>>,
}

impl StatsObserver {
    /// Create a new stats observer
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempt_starts(&self) -> u32 {
        self.attempt_starts.load(Ordering::SeqCst)
    }

    pub fn retries(&self) -> u32 {
        self.retries.load(Ordering::SeqCst)
    }

    pub fn successes(&self) -> u32 {
        self.successes.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn give_ups(&self) -> u32 {
        self.give_ups.load(Ordering::SeqCst)
    }

    pub fn cancellations(&self) -> u32 {
        self.cancellations.load(Ordering::SeqCst)
    }

    /// Progress annotations observed on each retry, oldest first
    pub fn progress_log(&self) -> Vec<String> {
        self.progress_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

impl RetryObserver for StatsObserver {
    fn on_attempt_start(&self, _session: &RetrySession) {
        self.attempt_starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_retry(&self, session: &RetrySession, _reason: &str, _delay: Duration) {
        self.retries.fetch_add(1, Ordering::SeqCst);
        if let (Some(progress), Ok(mut log)) = (session.progress(), self.progress_log.lock()) {
            log.push(progress.to_string());
        }
    }

    fn on_success(&self, _session: &RetrySession) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_failure(&self, _session: &RetrySession, _error: &dyn Display) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }

    fn on_gave_up(&self, _session: &RetrySession, _reason: &str) {
        self.give_ups.fetch_add(1, Ordering::SeqCst);
    }

    fn on_cancelled(&self, _session: &RetrySession, _cause: Interruption) {
        self.cancellations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Implement RetryObserver for Arc<T> where T: RetryObserver
impl<T: RetryObserver + ?Sized> RetryObserver for std::sync::Arc<T> {
    fn on_attempt_start(&self, session: &RetrySession) {
        (**self).on_attempt_start(session)
    }

    fn on_retry(&self, session: &RetrySession, reason: &str, delay: Duration) {
        (**self).on_retry(session, reason, delay)
    }

    fn on_success(&self, session: &RetrySession) {
        (**self).on_success(session)
    }

    fn on_failure(&self, session: &RetrySession, error: &dyn Display) {
        (**self).on_failure(session, error)
    }

    fn on_gave_up(&self, session: &RetrySession, reason: &str) {
        (**self).on_gave_up(session, reason)
    }

    fn on_cancelled(&self, session: &RetrySession, cause: Interruption) {
        (**self).on_cancelled(session, cause)
    }
}

/// Implement RetryObserver for Box<T> where T: RetryObserver
impl<T: RetryObserver + ?Sized> RetryObserver for Box<T> {
    fn on_attempt_start(&self, session: &RetrySession) {
        (**self).on_attempt_start(session)
    }

    fn on_retry(&self, session: &RetrySession, reason: &str, delay: Duration) {
        (**self).on_retry(session, reason, delay)
    }

    fn on_success(&self, session: &RetrySession) {
        (**self).on_success(session)
    }

    fn on_failure(&self, session: &RetrySession, error: &dyn Display) {
        (**self).on_failure(session, error)
    }

    fn on_gave_up(&self, session: &RetrySession, reason: &str) {
        (**self).on_gave_up(session, reason)
    }

    fn on_cancelled(&self, session: &RetrySession, cause: Interruption) {
        (**self).on_cancelled(session, cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_noop_observer() {
        let observer = NoOpObserver;
        let session = RetrySession::new("noop");

        observer.on_attempt_start(&session);
        observer.on_retry(&session, "not yet", Duration::from_millis(100));
        observer.on_success(&session);
        observer.on_failure(&session, &"boom");
        observer.on_gave_up(&session, "too slow");
        observer.on_cancelled(&session, Interruption::Cancelled);
    }

    #[test]
    fn test_stats_observer_counts() {
        let observer = StatsObserver::new();
        let session = RetrySession::new("stats");

        observer.on_attempt_start(&session);
        observer.on_retry(&session, "not yet", Duration::from_millis(100));
        observer.on_attempt_start(&session);
        observer.on_success(&session);

        assert_eq!(observer.attempt_starts(), 2);
        assert_eq!(observer.retries(), 1);
        assert_eq!(observer.successes(), 1);
        assert_eq!(observer.failures(), 0);
        assert_eq!(observer.give_ups(), 0);
    }

    #[test]
    fn test_stats_observer_records_progress() {
        let observer = StatsObserver::new();
        let mut session = RetrySession::new("build");

        observer.on_retry(&session, "no progress yet", Duration::ZERO);
        session.set_progress("(waiting for completion - status: pending)");
        observer.on_retry(&session, "pending", Duration::ZERO);
        session.set_progress("(waiting for completion - status: running)");
        observer.on_retry(&session, "running", Duration::ZERO);

        assert_eq!(
            observer.progress_log(),
            vec![
                "(waiting for completion - status: pending)".to_string(),
                "(waiting for completion - status: running)".to_string(),
            ]
        );
    }

    #[test]
    fn test_arc_observer_delegates() {
        let stats = Arc::new(StatsObserver::new());
        let shared: Arc<dyn RetryObserver> = stats.clone();
        let session = RetrySession::new("shared");

        shared.on_gave_up(&session, "deadline");
        shared.on_cancelled(&session, Interruption::DeadlineExceeded);

        assert_eq!(stats.give_ups(), 1);
        assert_eq!(stats.cancellations(), 1);
    }
}
