//! Retry/poll engine
//!
//! This module drives every asynchronous status check in Keel. A caller
//! supplies a [`Probe`]; the engine invokes it with attempt 1, 2, ... and
//! stops as soon as the probe returns a terminal [`Decision`], the policy
//! bound is reached, or the [`OperationContext`] is cancelled.
//!
//! # Features
//!
//! - Fixed, linear, and capped exponential backoff (delays never shrink)
//! - Overall bounds by attempt count and by elapsed time
//! - Cooperative cancellation through `tokio_util`'s `CancellationToken`
//! - A progress annotation the probe can update, reported on every attempt
//! - Observable attempts via the `RetryObserver` trait
//!
//! # Example
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use keel_core::retry::{Decision, OperationContext, PollEngine, Probe, RetrySession};
//! use keel_core::types::RetryPolicy;
//!
//! struct Countdown(u32);
//!
//! #[async_trait]
//! impl Probe for Countdown {
//!     type Output = ();
//!     type Error = String;
//!
//!     async fn attempt(&mut self, session: &mut RetrySession) -> Decision<(), String> {
//!         self.0 -= 1;
//!         session.set_progress(format!("{} to go", self.0));
//!         if self.0 == 0 {
//!             Decision::Succeed(())
//!         } else {
//!             Decision::retry("still counting")
//!         }
//!     }
//! }
//!
//! async fn example() {
//!     let engine = PollEngine::new(RetryPolicy::default());
//!     let ctx = OperationContext::new();
//!     engine.run(&ctx, "countdown", &mut Countdown(3)).await.unwrap();
//! }
//! ```

mod context;
mod engine;
mod error;
mod observer;
mod strategies;

pub use context::{Interruption, OperationContext};
pub use engine::{Decision, PollEngine, PollEngineBuilder, Probe, RetrySession};
pub use error::RetryError;
pub use observer::{NoOpObserver, RetryObserver, StatsObserver, TracingObserver};
pub use strategies::calculate_delay;
