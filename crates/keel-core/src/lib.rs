//! # keel-core
//!
//! Core library for Keel providing:
//! - Provider configuration types and hierarchical loading
//! - Error types shared across the workspace
//! - The retry/poll engine that drives every asynchronous status check

pub mod config;
pub mod error;
pub mod retry;
pub mod types;

pub use config::ConfigLoader;
pub use error::{Error, Result};
pub use types::ProviderConfig;
