//! Core logger types and traits

pub mod context;
pub mod driver;
pub mod error;
pub mod event;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod output_format;
pub mod pool;
pub mod timestamp;

pub use context::Ctx;
pub use driver::Driver;
pub use error::{LoggerError, Result};
pub use event::{create_id, source_basename, Event, UNKNOWN_LOCATION};
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder, DEFAULT_SHUTDOWN_TIMEOUT, MAX_STACK_FRAMES};
pub use metrics::LoggerMetrics;
pub use output_format::OutputFormat;
pub use pool::{Pool, Pooled, Reusable};
pub use timestamp::TimestampFormat;
