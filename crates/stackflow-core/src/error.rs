//! Core error types

use crate::template::Section;
use thiserror::Error;

/// Errors raised while building, freezing or persisting a compiled template
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(
        "Logical id collision in {section}: '{id}' is already defined with a different {existing_kind} spec (incoming: {incoming_kind})"
    )]
    NamingCollision {
        section: Section,
        id: String,
        existing_kind: String,
        incoming_kind: String,
    },

    #[error("Conflicting values while merging '{id}' at '{path}'")]
    MergeConflict { id: String, path: String },

    #[error("'{from}' references '{to}', which is not defined in Resources")]
    DanglingReference { from: String, to: String },

    #[error("Invalid resource spec for '{id}': {message}")]
    InvalidSpec { id: String, message: String },

    #[error("Artifact '{file}' holds a {found} entity, expected {expected}")]
    EntityMismatch {
        file: String,
        expected: String,
        found: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
