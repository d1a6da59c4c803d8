//! SoilSense command-line front end.
//!
//! Stands where an HTTP layer would: it loads the registry once per
//! invocation, marshals inputs from files and prints results as JSON.

pub mod commands;
pub mod config;

pub use config::{CliArgs, Command, SoilsenseConfig};
