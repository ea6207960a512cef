//! CLI module for admitr - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
