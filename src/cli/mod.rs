#![forbid(unsafe_code)]

//! Command-line support: loading relations from CSV, reading plan files, and
//! rendering results.

use thiserror::Error;

use crate::config::ConfigError;
use crate::query::QueryError;

/// CSV relation loading and export.
pub mod relation_io;

/// Text and JSON rendering of results and schemas.
pub mod output;

pub use output::{render_json, render_schema, render_text};
pub use relation_io::{load_plan, load_relation, parse_table_arg, read_relation, write_relation};

/// Error type for CLI operations.
#[derive(Error, Debug)]
pub enum CliError {
    /// Generic error message.
    #[error("{0}")]
    Message(String),
    /// IO error from file operations.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// CSV parsing or writing error.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// JSON plan or output error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// TOML plan error.
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    /// Engine configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Query construction or evaluation error.
    #[error("{}", crate::query::errors::QueryErrorWithCode(.0))]
    Query(#[from] QueryError),
}

impl From<&str> for CliError {
    fn from(value: &str) -> Self {
        CliError::Message(value.to_string())
    }
}

impl From<String> for CliError {
    fn from(value: String) -> Self {
        CliError::Message(value)
    }
}
