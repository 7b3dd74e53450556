//! Command-line interface
//!
//! Argument parsing for the `ledger-core` binary.

pub mod commands;

pub use commands::{Command, HexBytes, Opt};
