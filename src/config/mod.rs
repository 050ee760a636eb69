//! Configuration module for Scrapeline
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use scrapeline::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scrapeline.toml")).unwrap();
//! println!("Dispatcher will run {} workers", config.dispatcher.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, DispatcherConfig, FetcherConfig, OutputConfig, RewriterConfig, SourceConfig,
    SourceKind,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
