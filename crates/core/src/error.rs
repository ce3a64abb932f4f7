//! Core Error Types
//!
//! Errors raised by the session context: an unusable project root or a
//! language tag with nothing left after sanitizing.
//!
//! The root crate wraps these in `AppError` alongside its storage and model
//! failures.

use thiserror::Error;

/// Core error type for the Agent Context workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A language tag that cannot name a context bucket
    #[error("Invalid language tag: {0}")]
    InvalidTag(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid tag error
    pub fn invalid_tag(tag: impl Into<String>) -> Self {
        Self::InvalidTag(tag.into())
    }
}

impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
