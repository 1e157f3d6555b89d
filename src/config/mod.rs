//! Configuration module
//!
//! TOML settings for table defaults and the printed table.

#[allow(clippy::module_inception)]
pub mod config;

pub use config::{Config, DisplayConfig, TableConfig};
