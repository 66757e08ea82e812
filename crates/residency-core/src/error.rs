//! Validation errors raised by domain rules.

use thiserror::Error;

/// Errors produced while validating client input against domain rules.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A required field was absent or blank.
    #[error("{0} is required")]
    MissingField(String),

    /// An identifier did not parse.
    #[error("invalid {field}: '{value}'")]
    InvalidId { field: String, value: String },

    /// A title produced no usable slug characters.
    #[error("title '{0}' does not contain any letters or digits")]
    EmptySlug(String),

    /// A field had an unacceptable value.
    #[error("invalid {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

impl CoreError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
