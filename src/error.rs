//! Error types for Claude Report

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Parser error
    #[error("Parser error: {0}")]
    Parser(String),

    /// API error
    #[error("API error: {0}")]
    Api(String),

    /// Document rendering error (HTML/PDF)
    #[error("Render error: {0}")]
    Render(String),

    /// AI completion service error
    #[error("AI error: {0}")]
    Ai(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Not found error
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for Core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl From<walkdir::Error> for CoreError {
    fn from(e: walkdir::Error) -> Self {
        match e.into_io_error() {
            Some(io) => CoreError::Io(io),
            None => CoreError::Io(std::io::Error::other("filesystem loop detected")),
        }
    }
}
