//! HTTP delivery driver
//!
//! Posts every rendered event to a remote collector without ever blocking
//! the caller on network I/O. Requests go through a bounded queue served
//! by a self-sizing pool of worker threads:
//!
//! - a write that finds the queue full starts one more worker (up to
//!   `max_workers`) and hands it the request directly
//! - a write that finds the queue full with the pool at its limit is
//!   dropped and reported as [`LoggerError::DriverBusy`]
//! - a worker idle for `idle_timeout` exits, unless it is the last one
//!
//! Delivery is best effort: transport errors and non-2xx responses are
//! ignored and nothing is retried.

use crate::core::driver::Driver;
use crate::core::error::{LoggerError, Result};
use crate::core::event::Event;
use crate::core::output_format::OutputFormat;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use reqwest::blocking::{Client, Request};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Lower bound applied to [`HttpOptions::max_workers`]
pub const MIN_WORKERS: usize = 4;
/// Pending requests held before the pool has to grow
pub const DEFAULT_QUEUE_CAPACITY: usize = 20;
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

const DRIVER_NAME: &str = "http";

/// Configuration for [`HttpDriver`]
///
/// # Example
///
/// ```
/// use rust_event_logger::drivers::HttpOptions;
/// use reqwest::header::{HeaderValue, CONTENT_TYPE};
/// use reqwest::Method;
/// use std::time::Duration;
///
/// let options = HttpOptions::new("http://collector.internal:8080/logs")
///     .with_method(Method::PUT)
///     .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
///     .with_timeout(Duration::from_secs(3))
///     .with_max_workers(16);
/// ```
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub addr: String,
    pub method: Method,
    pub headers: HeaderMap,
    /// Per-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Upper bound on concurrent workers, raised to [`MIN_WORKERS`] if lower
    pub max_workers: usize,
    pub queue_capacity: usize,
    pub idle_timeout: Duration,
    pub format: OutputFormat,
}

impl HttpOptions {
    /// POST to `addr` with no headers and no timeout.
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            method: Method::POST,
            headers: HeaderMap::new(),
            timeout: None,
            max_workers: MIN_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            format: OutputFormat::Pattern,
        }
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_idle_timeout(mut self, idle: Duration) -> Self {
        self.idle_timeout = idle;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

/// State shared between the driver and its workers
struct WorkerPool {
    client: Client,
    queue: Receiver<Request>,
    workers: AtomicUsize,
    max_workers: usize,
    idle_timeout: Duration,
}

impl WorkerPool {
    /// Claim a worker slot. Fails once the pool is at `max_workers`.
    fn reserve(&self) -> bool {
        let mut current = self.workers.load(Ordering::Acquire);
        loop {
            if current >= self.max_workers {
                return false;
            }
            match self.workers.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Give up an idle slot, unless it is the last one.
    fn retire(&self) -> bool {
        let mut current = self.workers.load(Ordering::Acquire);
        loop {
            if current <= 1 {
                return false;
            }
            match self.workers.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Start a worker on an already reserved slot.
    fn spawn(pool: &Arc<Self>, first: Option<Request>) -> Result<()> {
        let worker_pool = Arc::clone(pool);
        let spawned = thread::Builder::new()
            .name("http-log-worker".to_string())
            .spawn(move || worker_pool.run(first));

        if let Err(e) = spawned {
            pool.workers.fetch_sub(1, Ordering::AcqRel);
            return Err(LoggerError::io_operation(
                "spawn http worker",
                "failed to start delivery thread",
                e,
            ));
        }
        Ok(())
    }

    fn run(&self, first: Option<Request>) {
        if let Some(request) = first {
            self.deliver(request);
        }

        loop {
            match self.queue.recv_timeout(self.idle_timeout) {
                Ok(request) => self.deliver(request),
                Err(RecvTimeoutError::Timeout) => {
                    if self.retire() {
                        return;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.workers.fetch_sub(1, Ordering::AcqRel);
                    return;
                }
            }
        }
    }

    fn deliver(&self, request: Request) {
        // Response bodies are never read; dropping the response releases the connection.
        let result = catch_unwind(AssertUnwindSafe(|| self.client.execute(request)));
        if result.is_err() {
            eprintln!("[LOGGER ERROR] HTTP delivery panicked; request dropped");
        }
    }
}

/// Driver that ships events to an HTTP endpoint
///
/// # Example
///
/// ```no_run
/// use rust_event_logger::drivers::{HttpDriver, HttpOptions};
/// use rust_event_logger::prelude::*;
///
/// let http = HttpDriver::new(HttpOptions::new("http://127.0.0.1:9000/ingest"))?;
/// let logger = Logger::builder().driver(http).build();
/// logger.error("payment gateway unreachable");
/// logger.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
/// # Ok::<(), rust_event_logger::LoggerError>(())
/// ```
pub struct HttpDriver {
    url: Url,
    method: Method,
    headers: HeaderMap,
    format: OutputFormat,
    sender: Option<Sender<Request>>,
    pool: Arc<WorkerPool>,
}

impl HttpDriver {
    /// Validate the options, build the client and start the first worker.
    ///
    /// # Errors
    ///
    /// Returns error if the address is not a valid URL, the client cannot be
    /// built, or the first worker thread cannot be started.
    pub fn new(options: HttpOptions) -> Result<Self> {
        let url = Url::parse(&options.addr).map_err(|e| {
            LoggerError::config("HttpDriver", format!("invalid address '{}': {}", options.addr, e))
        })?;

        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| LoggerError::config("HttpDriver", format!("cannot build client: {}", e)))?;

        let (sender, receiver) = bounded(options.queue_capacity.max(1));
        let pool = Arc::new(WorkerPool {
            client,
            queue: receiver,
            workers: AtomicUsize::new(0),
            max_workers: options.max_workers.max(MIN_WORKERS),
            idle_timeout: options.idle_timeout,
        });

        if pool.reserve() {
            WorkerPool::spawn(&pool, None)?;
        }

        Ok(Self {
            url,
            method: options.method,
            headers: options.headers,
            format: options.format,
            sender: Some(sender),
            pool,
        })
    }

    /// Live workers, never above [`max_workers`](Self::max_workers)
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.pool.workers.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn max_workers(&self) -> usize {
        self.pool.max_workers
    }

    /// Requests waiting in the queue
    #[must_use]
    pub fn pending(&self) -> usize {
        self.sender.as_ref().map_or(0, Sender::len)
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn build_request(&self, body: &[u8]) -> Result<Request> {
        let request = self
            .pool
            .client
            .request(self.method.clone(), self.url.clone())
            .headers(self.headers.clone())
            .body(body.to_vec())
            .build()?;
        Ok(request)
    }
}

impl Driver for HttpDriver {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| LoggerError::closed(DRIVER_NAME))?;
        let request = self.build_request(buf)?;

        match sender.try_send(request) {
            Ok(()) => Ok(buf.len()),
            Err(TrySendError::Full(request)) => {
                if !self.pool.reserve() {
                    return Err(LoggerError::busy(DRIVER_NAME, self.pool.max_workers));
                }
                WorkerPool::spawn(&self.pool, Some(request))?;
                Ok(buf.len())
            }
            Err(TrySendError::Disconnected(_)) => Err(LoggerError::closed(DRIVER_NAME)),
        }
    }

    fn format(&self, event: &Event) -> Vec<u8> {
        self.format.render(event)
    }

    fn name(&self) -> &str {
        DRIVER_NAME
    }

    /// Close the queue and wait for workers to finish what is queued.
    fn shutdown(&mut self, timeout: Duration) -> bool {
        drop(self.sender.take());

        let start = Instant::now();
        loop {
            let remaining = self.worker_count();
            if remaining == 0 {
                return true;
            }
            if start.elapsed() >= timeout {
                eprintln!(
                    "[LOGGER WARNING] {} http worker(s) still delivering after {:?}. \
                     Some logs may be lost.",
                    remaining, timeout
                );
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
}
