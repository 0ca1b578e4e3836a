//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use miette::Diagnostic;
use thiserror::Error;

use driftguard_core::CoreError;
use driftguard_kube::KubeError;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// The reference is not allowed
    #[error("Access denied: {message}")]
    #[diagnostic(
        code(driftguard::cli::access_denied),
        help("label the requesting namespace so that one of the policy's namespaceSelectors matches it")
    )]
    AccessDenied { message: String },

    /// Malformed manifest, policy or configuration
    #[error("Invalid input: {message}")]
    #[diagnostic(code(driftguard::cli::input))]
    InvalidInput {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(driftguard::cli::io))]
    Io { message: String },

    /// Cluster or dry-run failure
    #[error("{message}")]
    #[diagnostic(code(driftguard::cli::kube))]
    Kube {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(driftguard::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::AccessDenied { .. } => exit_codes::ACCESS_DENIED,
            CliError::InvalidInput { .. } => exit_codes::INVALID_INPUT,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Kube { .. } => exit_codes::ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an input error (user provided invalid input)
    pub fn input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            help: None,
        }
    }

    /// Create an input error with help text
    pub fn input_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match &err {
            CoreError::AccessDenied { .. } => CliError::AccessDenied {
                message: err.to_string(),
            },
            CoreError::Selector { .. }
            | CoreError::InvalidObject { .. }
            | CoreError::Serialization(_) => CliError::input(err.to_string()),
            _ => CliError::Kube {
                message: err.to_string(),
                help: None,
            },
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        match err {
            KubeError::Core(core) => core.into(),
            KubeError::Io(io) => io.into(),
            KubeError::InvalidConfig(_) | KubeError::Serialization(_) => {
                CliError::input(err.to_string())
            }
            KubeError::Timeout { .. } => CliError::Kube {
                message: err.to_string(),
                help: Some("raise `timeout` in the configuration file".to_string()),
            },
            KubeError::Api(_) | KubeError::Discovery(_) => CliError::Kube {
                message: err.to_string(),
                help: Some("check that the current kube context points at a reachable cluster".to_string()),
            },
            other => CliError::Kube {
                message: other.to_string(),
                help: None,
            },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
