use std::io;
use thiserror::Error;

/// Error definition for possible errors in this crate
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the plan or download parameters are invalid
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// Returned when the server name or port couldn't be resolved
    #[error("Failed to resolve {0}: {1}")]
    Resolution(String, #[source] io::Error),
    /// Returned when none of the resolved endpoints accepted a connection
    #[error("Failed to connect to {0}: {1}")]
    Connection(String, #[source] io::Error),
    /// Represents problems with socket and file IO
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Returned when the status line isn't valid HTTP
    #[error("Invalid response: {0}")]
    Protocol(String),
    /// Returned when the server answers with anything but 200 or 206
    #[error("Response returned with status code {code}")]
    HttpStatus { code: u16 },
    /// Returned when the url couldn't be parsed
    #[error("Failed to parse URL: {0}")]
    Url(String),
    /// Returned when the url scheme isn't http(s)
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),
    /// Returned when the checksum didn't match, holds the computed sum
    #[error("Checksum doesn't match, got {0}")]
    SHAMismatch(String),
    /// Returned when a fetcher task died before reaching a terminal state
    #[error("Fetch task failed: {0}")]
    TaskFailed(String),
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::Url(e.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::TaskFailed(e.to_string())
    }
}

/// Alias for Result<T, multiget::Error>
pub type Result<T> = std::result::Result<T, Error>;
