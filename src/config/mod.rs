//! Configuration management for the litreview CLI.
//!
//! Settings are layered in this order, later layers winning:
//! - built-in defaults
//! - the JSON file at `~/.litreview/config`
//! - environment variables (a `.env` file is loaded by the binary first)
//! - command-line flags, applied by the CLI through [`ConfigBuilder`]

mod builder;
mod constants;
mod defaults;
mod environment;
mod loader;
mod types;
mod validation;

pub use builder::ConfigBuilder;
pub use types::{
    Config, LoggingSettings, OutputFormat, OutputSettings, SearchSettings, ValidationSettings,
};
