//! Crate-wide error type

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CallbotError>;

#[derive(Error, Debug)]
pub enum CallbotError {
    /// A produced decision broke its four-key/enum-range contract.
    /// This is a logic bug in a decider, never a caller-input problem.
    #[error("decision schema violation: {0}")]
    SchemaViolation(String),

    #[error("invalid catalog pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("interaction store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("decision model error: {0}")]
    Model(String),

    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },

    #[error("session already exists: {0}")]
    SessionExists(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),
}

impl CallbotError {
    pub fn collaborator(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self::Collaborator {
            collaborator,
            message: message.into(),
        }
    }

    /// Schema violations must surface loudly instead of being coerced
    pub fn is_schema_violation(&self) -> bool {
        matches!(self, Self::SchemaViolation(_))
    }
}

impl From<toml::de::Error> for CallbotError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for CallbotError {
    fn from(err: std::io::Error) -> Self {
        Self::Config(err.to_string())
    }
}
