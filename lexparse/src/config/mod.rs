//! Configuration module for lexparse
//! Automatically uses generated constants from TOML configuration

// Include generated constants from build.rs
// This file is generated at compile time from the workspace TOML configuration
include!(concat!(env!("OUT_DIR"), "/constants.rs"));

pub mod runtime;

pub use runtime::{
    ConfigError, LexerPreferences, LoggingPreferences, ParserPreferences, RuntimeConfig,
};
