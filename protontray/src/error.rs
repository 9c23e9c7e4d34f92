//! Error handling for the ProtonVPN tray applet.
//!
//! This module provides a hierarchical error system using `thiserror` that covers
//! external command execution, status probing, configuration and startup. Failures of the
//! external VPN client are modelled as values so that callers can degrade to a safe
//! "assume disconnected" state instead of aborting.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the applet.
#[derive(Error, Debug)]
pub enum AppletError {
    /// External command errors
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Status probing errors
    #[error("Status error: {0}")]
    Probe(#[from] ProbeError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Server directory errors
    #[error("Server directory error: {0}")]
    Servers(#[from] ServerDirectoryError),

    /// Single-instance guard errors
    #[error("Instance error: {0}")]
    Instance(#[from] InstanceError),

    /// I/O operations errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic system errors for unrecoverable conditions
    #[error("System error: {message}")]
    System { message: String },
}

/// Errors produced while running the external VPN client.
///
/// Both variants keep the command line so log lines can be traced back to the
/// invocation that produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The executable could not be started (missing, not executable, not authorized)
    #[error("Failed to execute '{command}': {reason}")]
    SpawnFailure { command: String, reason: String },

    /// The executable ran but reported an error
    #[error("'{command}' exited with {exit}: {stderr}")]
    NonZeroExit {
        command: String,
        exit: String,
        stderr: String,
    },
}

/// Errors produced while classifying the VPN connection state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The status command itself failed
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The status output matched no known pattern
    #[error("VPN status could not be parsed: {output}")]
    ParseFailure { output: String },

    /// Network interfaces could not be enumerated
    #[error("Network interfaces unavailable: {reason}")]
    Interface { reason: String },
}

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Missing required configuration field
    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    /// Invalid value for configuration field
    #[error("Invalid value for field '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// TOML/ENV deserialization error
    #[error("Configuration parsing error: {message}")]
    ParseError { message: String },
}

/// Errors raised while reading the cached server list of the VPN client.
#[derive(Error, Debug)]
pub enum ServerDirectoryError {
    /// The server list file could not be read
    #[error("Server list not readable: {path}")]
    NotReadable { path: PathBuf },

    /// The server list is not valid JSON of the expected shape
    #[error("Server list malformed: {reason}")]
    Malformed { reason: String },
}

/// Errors raised by the single-instance guard.
#[derive(Error, Debug)]
pub enum InstanceError {
    /// Another applet process is already running
    #[error("There is an instance already running (pid {pid})")]
    AlreadyRunning { pid: u32 },

    /// The process table could not be inspected
    #[error("Process lookup failed: {reason}")]
    LookupFailed { reason: String },
}

impl From<tokio::task::JoinError> for AppletError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            AppletError::system("Task was cancelled")
        } else if err.is_panic() {
            AppletError::system("Task panicked")
        } else {
            AppletError::system(format!("Task failed: {err}"))
        }
    }
}

impl From<serde_json::Error> for ServerDirectoryError {
    fn from(err: serde_json::Error) -> Self {
        ServerDirectoryError::Malformed {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppletError {
    fn from(err: serde_json::Error) -> Self {
        AppletError::Servers(err.into())
    }
}

impl From<tracing::subscriber::SetGlobalDefaultError> for AppletError {
    fn from(err: tracing::subscriber::SetGlobalDefaultError) -> Self {
        AppletError::system(format!("Failed to set global tracing subscriber: {err}"))
    }
}

impl From<figment::Error> for AppletError {
    fn from(err: figment::Error) -> Self {
        let field = err.path.join(".");
        let config_error = match &err.kind {
            figment::error::Kind::MissingField(missing) => ConfigError::MissingField {
                field: if field.is_empty() {
                    missing.to_string()
                } else {
                    format!("{field}.{missing}")
                },
            },
            _ if field.is_empty() => ConfigError::ParseError {
                message: err.to_string(),
            },
            figment::error::Kind::InvalidType(_, _) => ConfigError::InvalidValue {
                field,
                reason: "invalid type".to_string(),
            },
            figment::error::Kind::UnknownVariant(_, _) => ConfigError::InvalidValue {
                field,
                reason: "unknown variant".to_string(),
            },
            figment::error::Kind::InvalidValue(_, _) => ConfigError::InvalidValue {
                field,
                reason: "invalid value".to_string(),
            },
            _ => ConfigError::InvalidValue {
                field,
                reason: err.to_string(),
            },
        };
        AppletError::Config(config_error)
    }
}

impl AppletError {
    /// Creates a new AppletError with a system message.
    ///
    /// ### Arguments
    /// - `message` - A string message describing the system error.
    pub fn system(message: impl Into<String>) -> Self {
        AppletError::System {
            message: message.into(),
        }
    }

    /// Creates an AppletError for a configuration file that does not exist.
    ///
    /// ### Arguments
    /// - `path` - The path to the configuration file that was not found.
    pub fn config_file_not_found(path: impl Into<PathBuf>) -> Self {
        AppletError::Config(ConfigError::FileNotFound { path: path.into() })
    }
}

/// Result type alias for applet operations.
pub type Result<T> = std::result::Result<T, AppletError>;
