//! Subcommand implementations

pub mod evaluate;
pub mod insights;
pub mod models;
pub mod train;
