//! Logging macros with `format!` style arguments.
//!
//! Each macro works on a [`Logger`](crate::Logger) and on a
//! [`Ctx`](crate::Ctx); with a `Ctx` the context's id, tag and pending
//! fields are attached as usual. The recorded source location is the line
//! of the macro call.
//!
//! # Examples
//!
//! ```
//! use rust_event_logger::prelude::*;
//! use rust_event_logger::{info, warn};
//!
//! let logger = Logger::new(LogLevel::Debug, Vec::new());
//!
//! let port = 8080;
//! info!(logger, "listening on port {}", port);
//!
//! let mut ctx = logger.ctx(create_id());
//! ctx.tag("checkout");
//! warn!(ctx, "cart {} has {} stale items", "c-17", 3);
//! ```

/// Log a formatted message at an explicit level.
///
/// # Examples
///
/// ```
/// # use rust_event_logger::prelude::*;
/// # let logger = Logger::new(LogLevel::Debug, Vec::new());
/// use rust_event_logger::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, format!($($arg)+))
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a fatal-level message. The event carries a call stack.
///
/// # Examples
///
/// ```
/// # use rust_event_logger::prelude::*;
/// # let logger = Logger::new(LogLevel::Debug, Vec::new());
/// use rust_event_logger::fatal;
/// fatal!(logger, "Unable to recover from error: {}", "disk full");
/// ```
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Fatal, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{Driver, Event, LogLevel, Logger, OutputFormat, Result};
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct CaptureDriver {
        writes: Arc<Mutex<Vec<Value>>>,
    }

    impl Driver for CaptureDriver {
        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            self.writes.lock().push(serde_json::from_slice(buf)?);
            Ok(buf.len())
        }

        fn format(&self, event: &Event) -> Vec<u8> {
            OutputFormat::Json.render(event)
        }

        fn name(&self) -> &str {
            "capture"
        }
    }

    fn logger_with_capture(level: LogLevel) -> (Logger, CaptureDriver) {
        let capture = CaptureDriver::default();
        let logger = Logger::builder()
            .min_level(level)
            .driver(capture.clone())
            .build();
        (logger, capture)
    }

    #[test]
    fn test_log_macro_formats() {
        let (logger, capture) = logger_with_capture(LogLevel::Debug);
        log!(logger, LogLevel::Info, "Formatted: {}", 42);
        log!(logger, LogLevel::Error, "plain");

        let events = capture.writes.lock();
        assert_eq!(events[0]["message"], "Formatted: 42");
        assert_eq!(events[0]["level"], "info");
        assert_eq!(events[1]["level"], "error");
    }

    #[test]
    fn test_level_macros() {
        let (logger, capture) = logger_with_capture(LogLevel::Debug);
        debug!(logger, "Count: {}", 5);
        info!(logger, "Items: {}", 100);
        warn!(logger, "Retry {} of {}", 1, 3);
        error!(logger, "Code: {}", 500);
        fatal!(logger, "disk {}", "full");

        let events = capture.writes.lock();
        let levels: Vec<&str> = events.iter().map(|e| e["level"].as_str().unwrap()).collect();
        assert_eq!(levels, ["debug", "info", "warn", "error", "fatal"]);
        assert_eq!(events[2]["message"], "Retry 1 of 3");
        assert!(events[4]["data"].is_array());
    }

    #[test]
    fn test_macro_records_call_site() {
        let (logger, capture) = logger_with_capture(LogLevel::Debug);
        let line = line!() + 1;
        info!(logger, "here");

        assert_eq!(capture.writes.lock()[0]["file"], format!("macros:{}", line));
    }

    #[test]
    fn test_macros_on_ctx() {
        let (logger, capture) = logger_with_capture(LogLevel::Info);
        let mut ctx = logger.ctx("m-1");
        ctx.tag("sync").field("batch", 4);
        info!(ctx, "synced {} rows", 120);
        debug!(ctx, "filtered");

        let events = capture.writes.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["guid"], "m-1");
        assert_eq!(events[0]["action"], "sync");
        assert_eq!(events[0]["message"], "synced 120 rows");
        assert_eq!(events[0]["data"]["batch"], 4);
    }
}
