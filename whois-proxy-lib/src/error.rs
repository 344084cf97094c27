//! Error handling for proxied WHOIS operations.
//!
//! This module defines the error type shared by the tunnel, the query loop and
//! the configuration layer. A pattern that matches nothing is not an error:
//! extraction returns `None` instead.

use std::fmt;
use std::time::Duration;

/// Main error type for proxied WHOIS operations.
///
/// None of these are retried by the library; every failure is surfaced to the
/// caller of the top-level operation.
#[derive(Debug, Clone)]
pub enum WhoisProxyError {
    /// The proxy could not be reached (refused, unreachable, or connect timeout)
    Connection {
        proxy: String,
        message: String,
        /// Raw OS error code, when the failure came from the operating system
        code: Option<i32>,
    },

    /// Read or write failure after the tunnel was opened, other than a clean end of data
    Io {
        message: String,
    },

    /// A single operation exceeded its time bound
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// The query string is unusable (e.g. empty after trimming)
    InvalidDomain {
        domain: String,
        reason: String,
    },

    /// Configuration errors (invalid settings, unparsable TOML, etc.)
    ConfigError {
        message: String,
    },

    /// File I/O errors when reading configuration files
    FileError {
        path: String,
        message: String,
    },
}

impl WhoisProxyError {
    /// Create a new connection error.
    pub fn connection<P: Into<String>, M: Into<String>>(proxy: P, message: M) -> Self {
        Self::Connection {
            proxy: proxy.into(),
            message: message.into(),
            code: None,
        }
    }

    /// Create a connection error from the underlying I/O failure, keeping its OS error code.
    pub fn connection_from_io<P: Into<String>>(proxy: P, err: &std::io::Error) -> Self {
        Self::Connection {
            proxy: proxy.into(),
            message: err.to_string(),
            code: err.raw_os_error(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the failure happened before any byte reached the proxy.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

impl fmt::Display for WhoisProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection {
                proxy,
                message,
                code,
            } => {
                if let Some(code) = code {
                    write!(
                        f,
                        "Connection to proxy {} failed (os error {}): {}",
                        proxy, code, message
                    )
                } else {
                    write!(f, "Connection to proxy {} failed: {}", proxy, message)
                }
            }
            Self::Io { message } => {
                write!(f, "I/O error: {}", message)
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::InvalidDomain { domain, reason } => {
                write!(f, "Invalid domain '{}': {}", domain, reason)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
        }
    }
}

impl std::error::Error for WhoisProxyError {}

impl From<std::io::Error> for WhoisProxyError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}
