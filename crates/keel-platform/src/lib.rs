//! # keel-platform
//!
//! Talks to the platform's REST API on behalf of resource lifecycle
//! operations:
//! - [`PlatformClient`] executes one request and classifies its outcome,
//!   appending a diagnostic for every failed call
//! - [`polling`] layers the ready, removal, build, action and registration
//!   checks on top of the executor and the `keel_core` poll engine

pub mod client;
pub mod diagnostics;
pub mod error;
pub mod polling;
pub mod request;

pub use client::PlatformClient;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{Error, Result};
pub use polling::{PollError, Poller, ProbeFailure};
pub use request::{Body, HttpOptions, Method, Outcome, Request};
