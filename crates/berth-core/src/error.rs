// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Core error type for Berth operations
#[derive(Error, Debug, Diagnostic)]
pub enum BerthError {
    /// Validation failed
    #[error("Validation failed for {record_type}: {details}")]
    #[diagnostic(
        code(berth::validation_failed),
        help("{help_text}")
    )]
    ValidationFailed {
        #[allow(unused)]
        record_type: String,
        #[allow(unused)]
        details: String,
        #[allow(unused)]
        help_text: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(
        code(berth::serialization_error),
        help("Ensure the record format is valid JSON")
    )]
    SerializationError {
        #[allow(unused)]
        message: String,
        #[source]
        #[allow(unused)]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Unknown priority tier
    #[error("Unknown priority: {priority}")]
    #[diagnostic(
        code(berth::invalid_priority),
        help("Use either 'high' or 'low'")
    )]
    InvalidPriority {
        #[allow(unused)]
        priority: String,
    },
}

/// Result type alias for Berth operations
pub type Result<T> = std::result::Result<T, BerthError>;

impl BerthError {
    /// Create a ValidationFailed error
    pub fn validation_failed(
        record_type: impl Into<String>,
        details: impl Into<String>,
        help_text: impl Into<String>,
    ) -> Self {
        Self::ValidationFailed {
            record_type: record_type.into(),
            details: details.into(),
            help_text: help_text.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source,
        }
    }

    /// Create an InvalidPriority error
    pub fn invalid_priority(priority: impl Into<String>) -> Self {
        Self::InvalidPriority {
            priority: priority.into(),
        }
    }
}
