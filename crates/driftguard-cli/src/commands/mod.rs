//! CLI commands

pub mod access;
pub mod diff;
