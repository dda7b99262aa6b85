//! Error type shared by every analysis.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    /// Source text was rejected by both grammar modes.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A binding pattern kind outside identifier / rest / default / array / object.
    #[error("unsupported pattern `{kind}` at {line}:{column}")]
    UnsupportedPattern {
        kind: String,
        line: usize,
        column: usize,
    },

    #[error("invalid sample size {columns}x{rows}: both dimensions must be positive")]
    InvalidSampleSize { columns: usize, rows: usize },

    #[error("identifier tree filter cannot both include and exclude node types")]
    ConflictingTypeFilters,

    #[error("unknown mixer `{0}` (expected average, power, geometric or harmonic)")]
    UnknownMixer(String),

    #[error("invalid color `{0}`")]
    InvalidColor(String),

    #[error("source contains no function")]
    NoFunction,
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
