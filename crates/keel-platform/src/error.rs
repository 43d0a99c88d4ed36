//! Error types for platform client construction

use thiserror::Error;

/// Errors raised while setting up a `PlatformClient`
///
/// Request failures are not errors in this sense; they are reported through
/// `Diagnostics` and the returned `Outcome`.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] keel_core::Error),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
