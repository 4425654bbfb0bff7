//! Command-line interface module.
//!
//! Provides argument parsing and CLI command handling.

pub mod args;
pub mod commands;

pub use args::{is_informational, Args};
