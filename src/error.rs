// src/error.rs

//! Unified error handling for the search agent.

use std::fmt;

use thiserror::Error;

/// Result type alias for agent operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Required configuration value missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Search call failed or returned a malformed payload
    #[error("Search provider error: {0}")]
    Provider(String),

    /// Mail delivery failed at connect, auth, or send
    #[error("Mail transport error: {0}")]
    Transport(String),

    /// History could not be written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Remote backup of the history failed
    #[error("Remote sync error for {target}: {message}")]
    Sync { target: String, message: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a search provider error.
    pub fn provider(message: impl fmt::Display) -> Self {
        Self::Provider(message.to_string())
    }

    /// Create a mail transport error.
    pub fn transport(message: impl fmt::Display) -> Self {
        Self::Transport(message.to_string())
    }

    /// Create a persistence error.
    pub fn persistence(message: impl fmt::Display) -> Self {
        Self::Persistence(message.to_string())
    }

    /// Create a remote sync error with the target it was aimed at.
    pub fn sync(target: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Sync {
            target: target.into(),
            message: message.to_string(),
        }
    }
}
