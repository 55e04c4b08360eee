//! CLI module for the roster command-line interface.
//!
//! Every command opens the configured graph, performs one operation and
//! prints the result as text or JSON.

mod commands;
mod output;

pub use commands::*;
