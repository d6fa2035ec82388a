//! Error types for matmark operations.
//!
//! Configuration and I/O failures are fatal and abort the run before any
//! measurement work; counter failures may be fatal or skippable depending on
//! the tolerate-counter-errors mode. Validation outcomes are never errors —
//! they are recorded in the run metrics instead.

use std::fmt;

/// Errors that can occur while setting up or driving a benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The run configuration is invalid (block size, loop order, dimensions).
    Config {
        /// Human-readable error message.
        message: String,
    },
    /// A file could not be found, read, created or written.
    Io {
        /// Path of the offending file.
        path: String,
        /// Human-readable error message.
        message: String,
    },
    /// The hardware counter subsystem failed.
    Counter {
        /// Human-readable error message.
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Error::Io { path, message } => {
                write!(f, "I/O error: {} ({})", message, path)
            }
            Error::Counter { message } => {
                write!(f, "Counter error: {}", message)
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type alias for matmark operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Creates a configuration error.
pub fn config_error(message: impl Into<String>) -> Error {
    Error::Config {
        message: message.into(),
    }
}

/// Creates an I/O error carrying the offending path.
pub fn io_error(path: impl Into<String>, message: impl Into<String>) -> Error {
    Error::Io {
        path: path.into(),
        message: message.into(),
    }
}

/// Creates a counter subsystem error.
pub fn counter_error(message: impl Into<String>) -> Error {
    Error::Counter {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = config_error("block size must divide the matrix dimension");
        let display = format!("{}", error);
        assert!(display.contains("Configuration error"));
        assert!(display.contains("block size must divide"));
    }

    #[test]
    fn test_io_error_display() {
        let error = io_error("/tmp/matrix.csv", "cannot read the input file");
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("/tmp/matrix.csv"));
        assert!(display.contains("cannot read the input file"));
    }

    #[test]
    fn test_counter_error_display() {
        let error = counter_error("event set creation failed");
        let display = format!("{}", error);
        assert!(display.contains("Counter error"));
        assert!(display.contains("event set creation failed"));
    }

    #[test]
    fn test_error_equality() {
        let error1 = config_error("bad block size");
        let error2 = config_error("bad block size");
        let error3 = config_error("bad loop order");

        assert_eq!(error1, error2);
        assert_ne!(error1, error3);
    }

    #[test]
    fn test_error_trait_implementation() {
        let error = counter_error("test error");

        let _: &dyn std::error::Error = &error;
        assert!(std::error::Error::source(&error).is_none());
    }
}
