//! Error types for packferry-exec

use thiserror::Error;

/// Errors that can occur while driving a session host
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Failed to connect to the session host
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Remote command exited non-zero
    #[error("command failed with status {status}: {stderr}")]
    CommandFailed {
        /// Exit status code
        status: i32,
        /// Stderr output
        stderr: String,
    },

    /// SSH key error
    #[error("SSH key error: {0}")]
    SshKeyError(String),

    /// Process spawn error
    #[error("failed to spawn process: {0}")]
    SpawnError(String),

    /// I/O error during execution or file transfer
    #[error("I/O error: {0}")]
    IoError(String),

    /// Session was used before `ready()` or after `finish()`
    #[error("not connected")]
    NotConnected,

    /// A required credential or setting is missing from the catalog
    #[error("invalid configuration: {0}")]
    ConfigError(String),
}
