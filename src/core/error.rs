//! Error types for the logger system

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// File driver error with path
    #[error("File driver error for '{path}': {message}")]
    FileDriverError { path: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError { path: String, message: String },

    /// Delivery queue full and worker pool at capacity; the write was dropped
    #[error("Driver '{driver}' busy: queue full with {max_workers} workers running")]
    DriverBusy { driver: String, max_workers: usize },

    /// Write attempted after the driver was shut down
    #[error("Driver '{driver}' is closed")]
    DriverClosed { driver: String },

    /// HTTP request construction error
    #[cfg(feature = "network")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a file driver error
    pub fn file_driver(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileDriverError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotationError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a capacity error
    pub fn busy(driver: impl Into<String>, max_workers: usize) -> Self {
        LoggerError::DriverBusy {
            driver: driver.into(),
            max_workers,
        }
    }

    pub fn closed(driver: impl Into<String>) -> Self {
        LoggerError::DriverClosed {
            driver: driver.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// True when the error reports a dropped write under load rather than a fault.
    ///
    /// Callers can use this to sample or skip logging while a sink is saturated.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, LoggerError::DriverBusy { .. })
    }
}
