//! Retrace CLI - command-line front end for the retrace rewriter
//!
//! This crate provides argument parsing and the `run` entry point used by the
//! `retrace` binary.

pub mod cli;

// Re-export commonly used types for convenience
pub use cli::{build_command, run, CliOptions};
