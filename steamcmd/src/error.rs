//! Error types for steamcmd.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for steamcmd operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Question registration errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Interview session errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Pseudo-terminal errors
    #[error("Terminal error: {0}")]
    Terminal(#[from] TerminalError),

    /// SteamCMD process errors
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    /// Installer-level errors
    #[error("Installer error: {0}")]
    Installer(#[from] InstallerError),
}

/// Errors raised while registering recognized prompts.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The prompt pattern did not compile.
    #[error("Invalid question pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The question text is empty.
    #[error("Question text for pattern '{pattern}' is empty")]
    EmptyText { pattern: String },
}

/// Errors raised by the ask/answer protocol.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The interview was closed, or the other side went away.
    #[error("Interview session closed")]
    Closed,

    /// An answer was given with no question waiting for it.
    #[error("No question is waiting for an answer")]
    NoPendingQuestion,
}

/// Pseudo-terminal errors.
#[derive(Error, Debug)]
pub enum TerminalError {
    /// Failed to allocate a PTY or start the program on it
    #[error("Failed to spawn '{program}' on a pseudo-terminal: {message}")]
    SpawnFailed { program: String, message: String },

    /// Reading from or writing to the terminal failed
    #[error("Terminal I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors reported by the SteamCMD process itself.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// SteamCMD exited with a non-zero status
    #[error("SteamCMD exited with status {code}")]
    Exit { code: u32 },

    /// Waiting for the process failed
    #[error("Failed to wait for SteamCMD: {0}")]
    Wait(#[source] io::Error),
}

/// Installer errors (single-flight guard, validation, provisioning).
#[derive(Error, Debug)]
pub enum InstallerError {
    /// An install or update is already in progress on this installer
    #[error("Installer is already running")]
    AlreadyRunning,

    /// The application to update has no id
    #[error("Application id is missing")]
    MissingAppId,

    /// The application to update has no install directory
    #[error("Application install directory is missing")]
    MissingAppDir,

    /// The SteamCMD provisioning script failed
    #[error("SteamCMD bootstrap failed: {message}")]
    BootstrapFailed { message: String },

    /// The interview did not finish in time
    #[error("Interview timed out after {0:?}")]
    Timeout(Duration),

    /// An install or update was started outside of a tokio runtime
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),

    /// A background task died without producing a result
    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

/// Result type alias using steamcmd's Error.
pub type Result<T> = std::result::Result<T, Error>;
