//! Type definitions for Keel provider configuration

mod provider_config;

pub use provider_config::*;
