//! Error types for the retry/poll engine
//!
//! A poll session ends in one of four ways besides success. `Failed` means
//! the probe itself declared the remote object will never reach the
//! expected state. The other three mean the engine gave up waiting, and
//! callers are expected to word them differently.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use super::context::Interruption;

/// Errors that can end a poll session
///
/// Generic over `E`, the probe's own terminal error type.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The probe reported a terminal failure
    Failed {
        /// Attempt on which the probe failed
        attempts: u32,
        /// The probe's error
        source: E,
    },

    /// The maximum number of attempts was reached
    Exhausted {
        /// Number of attempts made before giving up
        attempts: u32,
        /// Total duration spent across all attempts
        elapsed: Duration,
        /// Reason given by the probe on its last attempt
        last_reason: String,
        /// Progress annotation at the time of giving up
        progress: Option<String>,
    },

    /// The overall elapsed-time ceiling was reached
    TimedOut {
        /// Number of attempts made before giving up
        attempts: u32,
        /// Total duration spent across all attempts
        elapsed: Duration,
        /// Reason given by the probe on its last attempt
        last_reason: String,
        /// Progress annotation at the time of giving up
        progress: Option<String>,
    },

    /// The operation context was cancelled or its deadline passed
    Cancelled {
        /// Number of attempts started before cancellation
        attempts: u32,
        /// Which of the two interruptions occurred
        cause: Interruption,
        /// Progress annotation at the time of cancellation
        progress: Option<String>,
    },
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Failed { attempts, source } => {
                write!(f, "failed on attempt {}: {}", attempts, source)
            }
            RetryError::Exhausted {
                attempts,
                elapsed,
                last_reason,
                ..
            } => {
                write!(
                    f,
                    "gave up after {} attempts over {:.2}s: {}",
                    attempts,
                    elapsed.as_secs_f64(),
                    last_reason
                )
            }
            RetryError::TimedOut {
                attempts,
                elapsed,
                last_reason,
                ..
            } => {
                write!(
                    f,
                    "timed out after {:.2}s ({} attempts): {}",
                    elapsed.as_secs_f64(),
                    attempts,
                    last_reason
                )
            }
            RetryError::Cancelled {
                attempts, cause, ..
            } => {
                write!(f, "{} after {} attempts", cause, attempts)
            }
        }
    }
}

impl<E: Error + 'static> Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RetryError::Failed { source, .. } => Some(source),
            RetryError::Cancelled { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

impl<E> RetryError<E> {
    /// Create a probe failure error
    pub fn failed(attempts: u32, source: E) -> Self {
        RetryError::Failed { attempts, source }
    }

    /// Create a cancellation error
    pub fn cancelled(attempts: u32, cause: Interruption, progress: Option<String>) -> Self {
        RetryError::Cancelled {
            attempts,
            cause,
            progress,
        }
    }

    /// Get the number of attempts made
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Failed { attempts, .. } => *attempts,
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::TimedOut { attempts, .. } => *attempts,
            RetryError::Cancelled { attempts, .. } => *attempts,
        }
    }

    /// Check if the probe reported a terminal failure
    pub fn is_failed(&self) -> bool {
        matches!(self, RetryError::Failed { .. })
    }

    /// Check if the attempt bound was reached
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    /// Check if the elapsed-time bound was reached
    pub fn is_timed_out(&self) -> bool {
        matches!(self, RetryError::TimedOut { .. })
    }

    /// Check if the context was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }

    /// True for every outcome where the engine stopped waiting on its own
    /// account rather than because the probe failed
    pub fn gave_up(&self) -> bool {
        !self.is_failed()
    }

    /// Last progress annotation recorded before giving up
    pub fn progress(&self) -> Option<&str> {
        match self {
            RetryError::Exhausted { progress, .. }
            | RetryError::TimedOut { progress, .. }
            | RetryError::Cancelled { progress, .. } => progress.as_deref(),
            RetryError::Failed { .. } => None,
        }
    }

    /// Get the underlying probe error, consuming this error
    pub fn into_source(self) -> Option<E> {
        match self {
            RetryError::Failed { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Get a reference to the underlying probe error
    pub fn source_ref(&self) -> Option<&E> {
        match self {
            RetryError::Failed { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Map the probe error type using a closure
    pub fn map_err<F, E2>(self, f: F) -> RetryError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            RetryError::Failed { attempts, source } => RetryError::Failed {
                attempts,
                source: f(source),
            },
            RetryError::Exhausted {
                attempts,
                elapsed,
                last_reason,
                progress,
            } => RetryError::Exhausted {
                attempts,
                elapsed,
                last_reason,
                progress,
            },
            RetryError::TimedOut {
                attempts,
                elapsed,
                last_reason,
                progress,
            } => RetryError::TimedOut {
                attempts,
                elapsed,
                last_reason,
                progress,
            },
            RetryError::Cancelled {
                attempts,
                cause,
                progress,
            } => RetryError::Cancelled {
                attempts,
                cause,
                progress,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn timed_out() -> RetryError<io::Error> {
        RetryError::TimedOut {
            attempts: 7,
            elapsed: Duration::from_secs(30),
            last_reason: "status is pending".to_string(),
            progress: Some("(waiting for completion - status: pending)".to_string()),
        }
    }

    #[test]
    fn test_failed_error() {
        let err: RetryError<io::Error> =
            RetryError::failed(1, io::Error::new(io::ErrorKind::NotFound, "not found"));

        assert!(err.is_failed());
        assert!(!err.gave_up());
        assert_eq!(err.attempts(), 1);
        assert!(err.progress().is_none());
        assert!(err.source().is_some());
    }

    #[test]
    fn test_timed_out_error() {
        let err = timed_out();

        assert!(err.is_timed_out());
        assert!(!err.is_exhausted());
        assert!(err.gave_up());
        assert_eq!(err.attempts(), 7);
        assert_eq!(
            err.progress(),
            Some("(waiting for completion - status: pending)")
        );
    }

    #[test]
    fn test_cancelled_error() {
        let err: RetryError<io::Error> =
            RetryError::cancelled(2, Interruption::DeadlineExceeded, None);

        assert!(err.is_cancelled());
        assert!(err.gave_up());
        assert_eq!(err.attempts(), 2);
        assert_eq!(
            err.to_string(),
            "operation deadline exceeded after 2 attempts"
        );
    }

    #[test]
    fn test_into_source() {
        let err: RetryError<String> = RetryError::failed(3, "build failed".to_string());
        assert_eq!(err.into_source(), Some("build failed".to_string()));

        let err: RetryError<String> = RetryError::cancelled(3, Interruption::Cancelled, None);
        assert_eq!(err.into_source(), None);
    }

    #[test]
    fn test_map_err() {
        let err: RetryError<i32> = RetryError::failed(3, 42);
        let mapped = err.map_err(|n| format!("error code: {}", n));
        assert!(matches!(mapped, RetryError::Failed { source, .. } if source == "error code: 42"));

        let mapped = timed_out().map_err(|e| e.to_string());
        assert!(mapped.is_timed_out());
        assert_eq!(mapped.attempts(), 7);
    }

    #[test]
    fn test_display() {
        let display = timed_out().to_string();
        assert!(display.contains("timed out"));
        assert!(display.contains("7 attempts"));
        assert!(display.contains("status is pending"));
    }
}
