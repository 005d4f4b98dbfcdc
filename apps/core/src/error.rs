use std::io;
use thiserror::Error;

/// Application-wide error type, consolidating all possible errors into a single enum.
///
/// Every failure mode of the classification pipeline maps to a distinct variant so
/// front ends can tell "backend unreachable" from "reply unparsable" from "reply
/// rejected by schema" without string matching.
#[derive(Debug, Error)]
pub enum AppError {
    /// A prompt template name did not resolve to a known template.
    #[error("Unknown prompt template: {0}")]
    TemplateNotFound(String),

    /// No model identifier could be resolved for the generation backend.
    #[error("Generation backend not configured: no model identifier is set")]
    BackendNotConfigured,

    /// The generation backend reported non-success; carries its diagnostic text.
    #[error("Generation backend error: {0}")]
    BackendExecution(String),

    /// No JSON array or object could be located in the model output.
    #[error("Could not find a JSON array or object in the model output")]
    NoJsonFound,

    /// The model output could not be parsed as JSON, even after extraction.
    #[error("Failed to parse model output as JSON: {0}")]
    UnparsableOutput(String),

    /// A filing could not be retrieved from its source.
    #[error("Failed to fetch filing (status {status_hint}): {url}")]
    Fetch { url: String, status_hint: String },

    /// Represents errors originating from the database, typically from `sqlx`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents standard input/output errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Represents configuration-related errors (e.g., an unreadable taxonomy store).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Represents errors from operations that did not complete in time.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Represents errors specific to the backend task, such as a dropped channel.
    #[error("Backend task error: {0}")]
    Task(String),
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        AppError::Timeout(format!("Operation timed out: {}", err))
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::Config(format!("URL parse error: {}", err))
    }
}
