//! Command-line host for marketlink contract sessions.
//!
//! Wires the session core to a JSON-RPC node (standing in for an injected
//! wallet) and to either the HTTP address registry or a local addresses
//! directory.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod output;
pub mod registry_dir;
pub mod wallet;
