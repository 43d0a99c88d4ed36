//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use keel_platform::Method;

/// Keel - talk to the platform API and wait for resources to settle
#[derive(Parser, Debug)]
#[command(name = "keel")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to provider.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a single request to the platform API
    Request(RequestArgs),

    /// Poll a resource until it reaches a terminal state
    #[command(subcommand)]
    Wait(WaitCommands),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    pub method: Method,

    /// Server-relative path, e.g. /api/v1/environments
    pub path: String,

    /// JSON request body
    #[arg(long, conflicts_with = "yaml_file")]
    pub json: Option<String>,

    /// Send the contents of this file as a YAML request body
    #[arg(long)]
    pub yaml_file: Option<Utf8PathBuf>,

    /// Treat 404 as success
    #[arg(long)]
    pub allow_404: bool,

    /// Abort the request after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum WaitCommands {
    /// Wait until the resource reports status "ready"
    Ready(WaitArgs),

    /// Wait until the resource is gone (GET returns 404)
    Removed(WaitArgs),

    /// Wait for a build to succeed or fail
    Build(WaitArgs),

    /// Wait for an asynchronous action to succeed or fail
    Action(WaitArgs),

    /// Register the organization and node under a service API root
    Registration(WaitArgs),
}

#[derive(Args, Debug)]
pub struct WaitArgs {
    /// Server-relative path of the resource (or service API root)
    pub path: String,

    /// Give up after this many seconds (overrides polling.max-elapsed-secs)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Output the final resource as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration
    Show(ConfigShowArgs),
}

#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
