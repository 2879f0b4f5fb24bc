//! Error types for G-code rewriting.

use thiserror::Error;

/// Errors that can occur while configuring or running the rewriter.
#[derive(Error, Debug, PartialEq)]
pub enum ZshiftError {
    /// Invalid rewrite settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Input already carries this tool's annotations.
    #[error("input was already processed (annotated line {line}); rewriting again would double-apply shifts")]
    AlreadyProcessed {
        /// 1-based line number of the first annotated line.
        line: usize,
    },
}

/// Result type for rewrite operations.
pub type Result<T> = std::result::Result<T, ZshiftError>;
