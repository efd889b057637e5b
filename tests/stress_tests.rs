//! Stress tests for concurrent logging
//!
//! These tests verify:
//! - No event is lost or interleaved when many threads share one logger
//! - Rotation and retention hold while several threads log into one file
//! - Context churn across threads delivers every kept event

use rust_event_logger::drivers::{FileDriver, FileOptions};
use rust_event_logger::prelude::*;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

#[test]
fn test_many_threads_no_lost_or_torn_lines() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("concurrent.log");
    let driver = FileDriver::new(FileOptions::new(&log_file).with_format(OutputFormat::Json))
        .expect("Failed to create file driver");
    let logger = Arc::new(Logger::builder().driver(driver).build());

    const THREADS: usize = 16;
    const PER_THREAD: usize = 200;

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                let id = create_id();
                for i in 0..PER_THREAD {
                    logger.ctx(&id).tag(format!("thread-{}", t)).info(format!("{}", i));
                }
                id
            })
        })
        .collect();

    let ids: HashSet<String> = handles
        .into_iter()
        .map(|h| h.join().expect("Thread panicked"))
        .collect();
    logger.flush().expect("Failed to flush");

    let content = fs::read_to_string(&log_file).expect("Failed to read log file");
    let events: Vec<Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).expect("torn or interleaved line"))
        .collect();

    assert_eq!(ids.len(), THREADS);
    assert_eq!(events.len(), THREADS * PER_THREAD);
    for id in &ids {
        let count = events.iter().filter(|e| e["guid"] == id.as_str()).count();
        assert_eq!(count, PER_THREAD);
    }
}

#[test]
fn test_rotation_under_concurrent_load() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("busy.log");
    let driver = FileDriver::new(
        FileOptions::new(&log_file)
            .with_max_file_size(1)
            .with_max_file_count(3),
    )
    .expect("Failed to create file driver");
    let logger = Arc::new(Logger::builder().driver(driver).build());

    let payload = Arc::new("y".repeat(512));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let logger = Arc::clone(&logger);
            let payload = Arc::clone(&payload);
            thread::spawn(move || {
                for _ in 0..3000 {
                    logger.info(payload.as_str());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }
    assert!(logger.shutdown(DEFAULT_SHUTDOWN_TIMEOUT));

    let count = fs::read_dir(temp_dir.path())
        .expect("Failed to read dir")
        .filter_map(|e| e.ok())
        .count();
    assert!(count <= 3, "retention exceeded: {} files", count);
    assert_eq!(logger.metrics().driver_failures(), 0);
}

#[test]
fn test_context_churn_filters_and_delivers() {
    let writes = Arc::new(AtomicUsize::new(0));

    struct CountingDriver(Arc<AtomicUsize>);

    impl Driver for CountingDriver {
        fn write(&mut self, buf: &[u8]) -> rust_event_logger::Result<usize> {
            self.0.fetch_add(1, Ordering::Relaxed);
            Ok(buf.len())
        }

        fn format(&self, event: &Event) -> Vec<u8> {
            event.message.as_bytes().to_vec()
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    let logger = Logger::builder()
        .min_level(LogLevel::Info)
        .driver(CountingDriver(Arc::clone(&writes)))
        .build();

    thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for i in 0..1000 {
                    let mut ctx = logger.ctx(create_id());
                    ctx.field("i", i).debug("filtered");
                    ctx.info("kept");
                    ctx.free();
                }
            });
        }
    });

    assert_eq!(writes.load(Ordering::Relaxed), 8000);
    assert_eq!(logger.metrics().filtered(), 8000);
}
