//! Command-line interface

pub mod commands;
pub mod display;
pub mod provision;

pub use commands::CliArgs;
