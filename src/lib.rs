//! # Rust Event Logger
//!
//! Structured event logging with pluggable output drivers.
//!
//! ## Features
//!
//! - **Severity filtering**: events below the logger threshold cost one comparison
//! - **Correlation contexts**: attach an id, an action tag and structured fields
//! - **Rotating files**: size-triggered rotation with bounded retention
//! - **HTTP delivery**: non-blocking, backed by a self-sizing worker pool
//! - **Thread Safe**: one logger can be shared by any number of threads
//!
//! ## Example
//!
//! ```no_run
//! use rust_event_logger::prelude::*;
//! use rust_event_logger::drivers::{FileDriver, FileOptions};
//!
//! let file = FileDriver::new(
//!     FileOptions::new("logs/server.log")
//!         .with_max_file_size(50)
//!         .with_max_file_count(7),
//! )?;
//!
//! let logger = Logger::builder()
//!     .min_level(LogLevel::Info)
//!     .service_name("billing")
//!     .driver(file)
//!     .build();
//!
//! logger.info("service started");
//! logger.ctx(create_id()).tag("invoice").field("amount", 42).info("issued");
//! # Ok::<(), rust_event_logger::LoggerError>(())
//! ```

pub mod core;
pub mod drivers;
pub mod macros;

pub mod prelude {
    #[cfg(feature = "console")]
    pub use crate::drivers::ConsoleDriver;
    pub use crate::drivers::{FileDriver, FileOptions};
    pub use crate::core::{
        create_id, Ctx, Driver, Event, LogLevel, Logger, LoggerBuilder, LoggerError,
        LoggerMetrics, OutputFormat, Result, TimestampFormat, DEFAULT_SHUTDOWN_TIMEOUT,
    };
}

pub use core::{
    create_id, source_basename, Ctx, Driver, Event, LogLevel, Logger, LoggerBuilder, LoggerError,
    LoggerMetrics, OutputFormat, Pool, Pooled, Reusable, Result, TimestampFormat,
    DEFAULT_SHUTDOWN_TIMEOUT, MAX_STACK_FRAMES, UNKNOWN_LOCATION,
};
