//! Error types and handling for gzpipe
//!
//! This module provides the error taxonomy shared by every gzpipe crate. Engine
//! status codes are surfaced as a closed set of [`EngineStatus`] kinds, sink
//! failures keep their original [`std::io::Error`], and everything is
//! classified through [`ErrorKind`] and [`ErrorSeverity`].

use std::fmt;

/// Error severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Low severity - operation can continue
    Low,
    /// Medium severity - operation may be retried
    Medium,
    /// High severity - operation should be aborted
    High,
    /// Critical severity - the process state is suspect
    Critical,
}

/// Non-OK status reported by the DEFLATE engine
///
/// The set is closed: every status the engine can return maps onto one of
/// these kinds, with [`EngineStatus::Unknown`] catching codes outside the
/// documented range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EngineStatus {
    /// The stream reached its end. Success while finishing, an error anywhere else.
    StreamEnd,
    /// A preset dictionary is required
    NeedDictionary,
    /// The engine reported a host I/O error
    Errno,
    /// The stream state is inconsistent or a parameter was invalid
    StreamError,
    /// The data is corrupted
    DataError,
    /// The engine could not obtain memory
    MemoryError,
    /// No progress was possible
    BufferError,
    /// The engine library version is incompatible with the caller
    VersionError,
    /// A status code outside the documented set
    Unknown(i32),
}

impl EngineStatus {
    /// Short human readable description of the status
    pub fn description(self) -> &'static str {
        match self {
            Self::StreamEnd => "stream end",
            Self::NeedDictionary => "need dictionary",
            Self::Errno => "host I/O error",
            Self::StreamError => "stream state error",
            Self::DataError => "data corruption",
            Self::MemoryError => "out of memory",
            Self::BufferError => "buffer error",
            Self::VersionError => "version mismatch",
            Self::Unknown(_) => "unknown status",
        }
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown status code {code}"),
            other => f.write_str(other.description()),
        }
    }
}

/// Main error type for gzpipe operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The DEFLATE engine returned a non-OK status
    #[error("Compression engine error: {status}{}", detail(.message))]
    Engine {
        /// Status reported by the engine
        status: EngineStatus,
        /// Detail message the engine attached to the stream, if any
        message: Option<String>,
    },

    /// The destination sink failed
    #[error("I/O error: {source}")]
    Io {
        /// Error returned by the sink, unchanged
        #[from]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Generic error with custom message
    #[error("{message}")]
    Other {
        /// Custom error message
        message: String,
    },
}

fn detail(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(" ({m})"))
        .unwrap_or_default()
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Errors reported by the compression engine
    Engine,
    /// Sink I/O errors
    Io,
    /// Configuration errors
    Config,
    /// Other errors
    Other,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Engine { .. } => ErrorKind::Engine,
            Self::Io { .. } => ErrorKind::Io,
            Self::Config { .. } => ErrorKind::Config,
            Self::Other { .. } => ErrorKind::Other,
        }
    }

    /// Get the error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Engine { status, .. } => match status {
                EngineStatus::BufferError | EngineStatus::StreamEnd => ErrorSeverity::Low,
                EngineStatus::Errno | EngineStatus::MemoryError => ErrorSeverity::Medium,
                EngineStatus::NeedDictionary
                | EngineStatus::StreamError
                | EngineStatus::Unknown(_) => ErrorSeverity::High,
                EngineStatus::DataError | EngineStatus::VersionError => ErrorSeverity::Critical,
            },
            Self::Io { .. } => ErrorSeverity::Medium,
            Self::Config { .. } => ErrorSeverity::High,
            Self::Other { .. } => ErrorSeverity::Medium,
        }
    }

    /// Check if this error is recoverable
    ///
    /// A compressor that returned an error is never resumed; recoverable here
    /// means that starting over with a fresh compressor may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Engine { status, .. } => {
                matches!(status, EngineStatus::MemoryError | EngineStatus::Errno)
            }
            Self::Io { source } => matches!(
                source.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),
            Self::Config { .. } => false,
            Self::Other { .. } => true,
        }
    }

    /// Engine status carried by this error, if it came from the engine
    pub fn engine_status(&self) -> Option<EngineStatus> {
        match self {
            Self::Engine { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Create a new engine error without a detail message
    pub fn engine(status: EngineStatus) -> Self {
        Self::Engine {
            status,
            message: None,
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::Io { source } => source,
            Error::Config { .. } => std::io::Error::new(std::io::ErrorKind::InvalidInput, error),
            other => std::io::Error::other(other),
        }
    }
}
