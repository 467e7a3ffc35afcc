//! # breakline
//!
//! Command-line front end: applies a policy to an HTML fragment and manages
//! the policy stored in the host settings file.

#![deny(unsafe_code)]

pub mod cli;
pub mod commands;

pub use cli::{ApplyArgs, Cli, Command, PolicyCommand, PolicySwitches};
pub use commands::execute;
