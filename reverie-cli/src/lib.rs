//! Reverie CLI library: configuration handling and subcommand bodies.

pub mod commands;
pub mod config;
