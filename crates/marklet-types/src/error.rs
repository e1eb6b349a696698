//! Error types for marklet.

use std::io;

/// Errors produced by the document pipeline.
#[derive(Debug, thiserror::Error)]
pub enum MarkletError {
    #[error("malformed locator: {0}")]
    MalformedLocator(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Failure category reported to a host for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedLocator,
    Connection,
    MalformedResponse,
    Decode,
    Timeout,
    Config,
    Io,
}

impl MarkletError {
    /// The category of this error, without its message.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MarkletError::MalformedLocator(_) => ErrorKind::MalformedLocator,
            MarkletError::Connection(_) => ErrorKind::Connection,
            MarkletError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            MarkletError::Decode(_) => ErrorKind::Decode,
            MarkletError::Timeout(_) => ErrorKind::Timeout,
            MarkletError::Config(_) | MarkletError::TomlParse(_) => ErrorKind::Config,
            MarkletError::Io(_) => ErrorKind::Io,
        }
    }

    /// Map an I/O error from a socket operation, keeping timeouts
    /// distinguishable from other failures.
    pub fn from_socket(context: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                MarkletError::Timeout(format!("{context}: {err}"))
            },
            _ => MarkletError::Connection(format!("{context}: {err}")),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, MarkletError>;
