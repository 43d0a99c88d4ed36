//! CLI command implementations

pub mod config;
pub mod request;
pub mod wait;

use anyhow::{Context, Result};
use camino::Utf8Path;
use keel_core::retry::OperationContext;
use keel_core::{ConfigLoader, ProviderConfig};

/// Load provider configuration from `--config` or the default location
pub(crate) fn load_config(path: Option<&Utf8Path>) -> Result<ProviderConfig> {
    let loader = match path {
        Some(path) => ConfigLoader::new().with_file(path.to_path_buf()),
        None => ConfigLoader::new(),
    };
    loader.load().context("Failed to load provider configuration")
}

/// Context cancelled by Ctrl-C, with an optional deadline
pub(crate) fn operation_context(timeout_secs: Option<u64>) -> OperationContext {
    let root = OperationContext::new();
    let ctx = match timeout_secs {
        Some(secs) => root.with_timeout(std::time::Duration::from_secs(secs)),
        None => root.child(),
    };

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            root.cancel();
        }
    });

    ctx
}
