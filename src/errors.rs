// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::config::path::PathError;
use crate::config::transform::TransformError;
use crate::exec::CommandError;
use crate::template::TemplateError;

#[derive(Error, Debug)]
pub enum PackflowError {
    /// Structurally invalid phase/task/predicate arguments. Always fatal to
    /// the phase and raised before any external process is spawned.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{kind} '{name}' registered twice")]
    DuplicateRegistration { kind: &'static str, name: String },

    #[error("Task not found: {0}")]
    UnknownTask(String),

    #[error("Predicate not found: {0}")]
    UnknownPredicate(String),

    /// An external command exited nonzero (or could not be run at all).
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Invalid config path: {0}")]
    Path(#[from] PathError),

    #[error("Config transform failed: {0}")]
    Transform(#[from] TransformError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PackflowError {
    pub fn config(msg: impl Into<String>) -> Self {
        PackflowError::Configuration(msg.into())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PackflowError>;
