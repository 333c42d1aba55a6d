//! Presence tracker CLI library.
//!
//! This crate provides the CLI interface for the presence tracker.

mod cli;
pub mod commands;
mod config;
pub mod console;

pub use cli::{Cli, Commands, ReportArgs, TrackArgs};
pub use config::Config;
