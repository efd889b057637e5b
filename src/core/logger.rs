//! Main logger implementation
//!
//! The logger filters by severity, builds one pooled [`Event`] per call and
//! fans it out to every registered [`Driver`]. Each driver call runs under a
//! single logger-wide lock, so no two drivers ever write at the same time.

use super::{
    context::{Ctx, CtxState},
    driver::Driver,
    error::{LoggerError, Result},
    event::{format_location, Event},
    log_level::LogLevel,
    metrics::{should_alert, LoggerMetrics},
    pool::Pool,
    timestamp::TimestampFormat,
};
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use std::backtrace::Backtrace;
use std::io;
use std::panic::{self, AssertUnwindSafe, Location};
use std::time::{Duration, Instant};

/// Default timeout used by [`Logger::shutdown`] callers that have no better bound
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum number of frames attached to a FATAL event
pub const MAX_STACK_FRAMES: usize = 5;

/// Key holding the captured frames when a FATAL event already carries data
pub const CALL_STACK_KEY: &str = "call_stacks";

pub struct Logger {
    service: RwLock<String>,
    min_level: LogLevel,
    drivers: Mutex<Vec<Box<dyn Driver>>>,
    timestamp_format: TimestampFormat,
    events: Pool<Event>,
    pub(crate) contexts: Pool<CtxState>,
    metrics: LoggerMetrics,
}

impl Logger {
    /// Create a logger with an explicit threshold and driver set.
    ///
    /// Drivers are invoked in the order given.
    #[must_use]
    pub fn new(min_level: LogLevel, drivers: Vec<Box<dyn Driver>>) -> Self {
        Self {
            service: RwLock::new(default_service_name()),
            min_level,
            drivers: Mutex::new(drivers),
            timestamp_format: TimestampFormat::default(),
            events: Pool::new(),
            contexts: Pool::new(),
            metrics: LoggerMetrics::new(),
        }
    }

    /// Register another driver. Requires exclusive access, so the driver
    /// list never changes while a dispatch is in flight.
    pub fn add_driver(&mut self, driver: Box<dyn Driver>) {
        self.drivers.get_mut().push(driver);
    }

    pub fn set_min_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    #[must_use]
    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// True if an event at `level` would reach the drivers.
    #[inline]
    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level >= self.min_level
    }

    pub fn set_service_name(&self, name: impl Into<String>) {
        *self.service.write() = name.into();
    }

    #[must_use]
    pub fn service_name(&self) -> String {
        self.service.read().clone()
    }

    #[must_use]
    pub fn driver_count(&self) -> usize {
        self.drivers.lock().len()
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    /// Emit an event attributed to the caller of this method.
    ///
    /// See [`Logger::output_at`].
    #[track_caller]
    pub fn output(
        &self,
        level: LogLevel,
        tag: &str,
        id: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Result<()> {
        self.output_at(Some(Location::caller()), level, tag, id, message.into(), data)
    }

    /// Core dispatch entry point.
    ///
    /// Returns `Ok(())` without touching any driver when `level` is below the
    /// threshold. FATAL events get up to [`MAX_STACK_FRAMES`] frames merged
    /// into `data`. Every driver is invoked even if an earlier one fails; the
    /// first failure is returned once the fan-out is complete.
    pub fn output_at(
        &self,
        location: Option<&Location<'_>>,
        level: LogLevel,
        tag: &str,
        id: &str,
        message: String,
        data: Option<Value>,
    ) -> Result<()> {
        if !self.enabled(level) {
            self.metrics.record_filtered();
            return Ok(());
        }

        let data = if level == LogLevel::Fatal {
            Some(attach_call_stack(data, capture_call_stack(location)))
        } else {
            data
        };

        let mut event = self.events.acquire();
        event.fill(
            &self.service.read(),
            self.timestamp_format.now(),
            level,
            format_location(location),
            id,
            tag,
            message,
            data,
        );
        self.metrics.record_dispatched();
        self.dispatch(&event)
    }

    /// Fan an event out to all drivers, each rendering it in its own format.
    fn dispatch(&self, event: &Event) -> Result<()> {
        self.fan_out(|driver| {
            let payload = driver.format(event);
            driver.write(&payload)
        })
    }

    /// Send pre-rendered bytes to every driver unchanged.
    ///
    /// Bypasses the threshold, formatting and event pooling, so the logger
    /// can stand in for a plain byte sink. Every driver is invoked; the first
    /// failure is returned once all of them have run.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_event_logger::prelude::*;
    ///
    /// let logger = Logger::new(LogLevel::Info, Vec::new());
    /// assert_eq!(logger.write_raw(b"raw line\n")?, 9);
    /// # Ok::<(), rust_event_logger::LoggerError>(())
    /// ```
    pub fn write_raw(&self, buf: &[u8]) -> Result<usize> {
        self.fan_out(|driver| driver.write(buf))?;
        Ok(buf.len())
    }

    /// Run `call` against each driver in turn, taking the lock once per driver.
    fn fan_out<F>(&self, mut call: F) -> Result<()>
    where
        F: FnMut(&mut dyn Driver) -> Result<usize>,
    {
        let count = self.drivers.lock().len();
        let mut first_error = None;

        for idx in 0..count {
            let mut drivers = self.drivers.lock();
            let Some(driver) = drivers.get_mut(idx) else {
                break;
            };

            // Per-driver panic isolation: one broken sink must not silence the rest.
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| call(driver.as_mut())));

            let error = match outcome {
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => e,
                Err(panic_info) => {
                    let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                        s.to_string()
                    } else if let Some(s) = panic_info.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    eprintln!(
                        "[LOGGER CRITICAL] Driver #{} ({}) panicked: {}. \
                         Other drivers continue to function.",
                        idx,
                        driver.name(),
                        panic_msg
                    );
                    LoggerError::other(format!("driver '{}' panicked: {}", driver.name(), panic_msg))
                }
            };

            let failures = self.metrics.record_driver_failure();
            if should_alert(failures) {
                eprintln!(
                    "[LOGGER ERROR] Driver #{} ({}) failed: {} ({} driver failures so far)",
                    idx,
                    driver.name(),
                    error,
                    failures + 1
                );
            }
            first_error.get_or_insert(error);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Acquire a correlation context bound to this logger.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_event_logger::prelude::*;
    ///
    /// let logger = Logger::new(LogLevel::Debug, Vec::new());
    /// let mut ctx = logger.ctx(create_id());
    /// ctx.tag("checkout").info("cart validated");
    /// ctx.field("items", 3).info("payment accepted");
    /// ctx.free();
    /// ```
    pub fn ctx(&self, id: impl AsRef<str>) -> Ctx<'_> {
        Ctx::new(self, id.as_ref())
    }

    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let _ = self.output_at(Some(Location::caller()), level, "", "", message.into(), None);
    }

    /// Log with a structured payload attached.
    #[track_caller]
    pub fn log_with_data(&self, level: LogLevel, message: impl Into<String>, data: Value) {
        let _ = self.output_at(
            Some(Location::caller()),
            level,
            "",
            "",
            message.into(),
            Some(data),
        );
    }

    #[inline]
    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    #[track_caller]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    #[track_caller]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    #[inline]
    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Log at FATAL. Does not terminate the process.
    #[inline]
    #[track_caller]
    pub fn fatal(&self, message: impl Into<String>) {
        self.log(LogLevel::Fatal, message);
    }

    /// Flush every driver. All drivers are attempted; the first error is returned.
    pub fn flush(&self) -> Result<()> {
        let mut drivers = self.drivers.lock();
        let mut first_error = None;
        for driver in drivers.iter_mut() {
            if let Err(e) = driver.flush() {
                eprintln!("[LOGGER ERROR] Driver ({}) flush failed: {}", driver.name(), e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Shut down every driver, sharing `timeout` across them.
    ///
    /// Returns `true` if every driver released its pending output in time.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rust_event_logger::{Logger, LogLevel, DEFAULT_SHUTDOWN_TIMEOUT};
    ///
    /// let logger = Logger::new(LogLevel::Info, Vec::new());
    /// logger.info("Important message");
    /// if !logger.shutdown(DEFAULT_SHUTDOWN_TIMEOUT) {
    ///     eprintln!("Warning: Logger shutdown timed out");
    /// }
    /// ```
    pub fn shutdown(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut drivers = self.drivers.lock();
        let mut clean = true;
        for driver in drivers.iter_mut() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !driver.shutdown(remaining) {
                eprintln!(
                    "[LOGGER WARNING] Driver ({}) did not shut down cleanly. \
                     Some logs may be lost.",
                    driver.name()
                );
                clean = false;
            }
        }
        clean
    }
}

/// Lets a shared logger back `write!`, `io::copy` or a foreign log bridge.
impl io::Write for &Logger {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_raw(buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        Logger::flush(*self).map_err(io::Error::other)
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        for driver in self.drivers.get_mut().iter_mut() {
            if let Err(e) = driver.flush() {
                eprintln!(
                    "[LOGGER ERROR] Failed to flush driver ({}) during shutdown: {}",
                    driver.name(),
                    e
                );
            }
        }

        let failures = self.metrics.driver_failures();
        if failures > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger shutting down with {} failed driver writes",
                failures
            );
        }
    }
}

fn default_service_name() -> String {
    std::env::args()
        .next()
        .and_then(|arg0| {
            std::path::Path::new(&arg0)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "app".to_string())
}

/// Capture up to [`MAX_STACK_FRAMES`] `file:line` frames, starting at the
/// frame of `location` when it can be found in the backtrace.
fn capture_call_stack(location: Option<&Location<'_>>) -> Vec<String> {
    let trace = Backtrace::force_capture().to_string();
    let frames: Vec<&str> = trace
        .lines()
        .filter_map(|line| line.trim_start().strip_prefix("at "))
        .collect();

    let fallback = || {
        location
            .map(|loc| vec![format!("{}:{}", loc.file(), loc.line())])
            .unwrap_or_default()
    };

    let Some(loc) = location else {
        return fallback();
    };
    let needle = format!("{}:{}:", loc.file(), loc.line());
    match frames.iter().position(|frame| frame.contains(&needle)) {
        Some(start) => frames[start..]
            .iter()
            .take(MAX_STACK_FRAMES)
            .map(|frame| strip_column(frame).to_string())
            .collect(),
        None => fallback(),
    }
}

/// `path/to/file.rs:12:5` -> `path/to/file.rs:12`
fn strip_column(frame: &str) -> &str {
    match frame.rsplit_once(':') {
        Some((head, col)) if !col.is_empty() && col.bytes().all(|b| b.is_ascii_digit()) => head,
        _ => frame,
    }
}

/// Frames become the whole payload, or a sibling of existing data.
fn attach_call_stack(data: Option<Value>, frames: Vec<String>) -> Value {
    match data {
        None => Value::from(frames),
        Some(data) => json!({
            "data": data,
            CALL_STACK_KEY: frames,
        }),
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use rust_event_logger::prelude::*;
///
/// let logger = Logger::builder()
///     .min_level(LogLevel::Warn)
///     .service_name("billing")
///     .timestamp_format(TimestampFormat::Rfc3339)
///     .build();
/// assert_eq!(logger.service_name(), "billing");
/// ```
pub struct LoggerBuilder {
    min_level: LogLevel,
    drivers: Vec<Box<dyn Driver>>,
    service_name: Option<String>,
    timestamp_format: TimestampFormat,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            min_level: LogLevel::Debug,
            drivers: Vec::new(),
            service_name: None,
            timestamp_format: TimestampFormat::default(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Add a driver; drivers run in the order they are added
    #[must_use = "builder methods return a new value"]
    pub fn driver<D: Driver + 'static>(mut self, driver: D) -> Self {
        self.drivers.push(Box::new(driver));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn boxed_driver(mut self, driver: Box<dyn Driver>) -> Self {
        self.drivers.push(driver);
        self
    }

    /// Service name stamped on every event. Defaults to the executable name.
    #[must_use = "builder methods return a new value"]
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    pub fn build(self) -> Logger {
        let mut logger = Logger::new(self.min_level, self.drivers);
        logger.timestamp_format = self.timestamp_format;
        if let Some(name) = self.service_name {
            *logger.service.get_mut() = name;
        }
        logger
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }
}
