//! Custom error types for Statecraft.
//!
//! This module provides the error taxonomy shared by every stage of the
//! decision pipeline. The classification helpers decide what the caller does
//! with a failure: retry it, skip the affected issue, or stop the run.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Statecraft operations
#[derive(Error, Debug)]
pub enum StatecraftError {
    // =========================================================================
    // Remote Errors
    // =========================================================================
    /// Network or HTTP-level failure (connection refused, timeout, 5xx, 429)
    #[error("Transport error during {operation}: {message}")]
    Transport { operation: String, message: String },

    /// Credentials were rejected by the remote API
    #[error("Authentication rejected during {operation} (HTTP {status})")]
    Auth { operation: String, status: u16 },

    // =========================================================================
    // Content Errors
    // =========================================================================
    /// A remote or model response could not be decoded
    #[error("Failed to parse {context}: {message}")]
    Parse { context: String, message: String },

    /// A value fell outside the set it was required to belong to
    #[error("Validation failed: {message}")]
    Validation { message: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Failed to load configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl StatecraftError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create a transport error
    pub fn transport(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(operation: impl Into<String>, status: u16) -> Self {
        Self::Auth {
            operation: operation.into(),
            status,
        }
    }

    /// Create a parse error
    pub fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// Check if the failed operation may succeed when repeated unchanged.
    ///
    /// Only transport failures qualify. Parse and validation failures of model
    /// output are retried by the decision engine itself, which owns that policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Check if this error is fatal for the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Auth { .. } | Self::Config { .. } | Self::InvalidConfig { .. }
        )
    }

    /// Short, stable label used in structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Auth { .. } => "auth",
            Self::Parse { .. } => "parse",
            Self::Validation { .. } => "validation",
            Self::Config { .. } | Self::InvalidConfig { .. } => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Auth { .. } => 2,
            Self::Transport { .. } => 3,
            Self::Parse { .. } => 4,
            Self::Config { .. } | Self::InvalidConfig { .. } => 7,
            _ => 1,
        }
    }
}

/// Type alias for Statecraft results
pub type Result<T> = std::result::Result<T, StatecraftError>;
