//! Common test infrastructure for keel-platform tests
//!
//! # Usage
//!
//! In your test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! # Modules
//!
//! - `fixtures`: Client, policy and engine builders wired to a mock server
//! - `mock_server`: Wiremock setup helpers and request inspection

// Not every test file uses every helper
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fixtures;
pub mod mock_server;

pub use fixtures::*;
pub use mock_server::*;
