//! Driver trait for log output destinations

use super::{error::Result, event::Event};
use std::time::Duration;

/// A pluggable output sink.
///
/// The logger renders each event with [`Driver::format`] and hands the bytes
/// to [`Driver::write`]. Drivers only ever see a borrowed `&Event` and must
/// copy whatever they need before returning.
pub trait Driver: Send + Sync {
    /// Accept a fully rendered payload, returning the number of bytes taken.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Render an event into this driver's wire or display representation.
    fn format(&self, event: &Event) -> Vec<u8>;

    fn name(&self) -> &str;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release resources, waiting at most `timeout` for pending output.
    ///
    /// Returns `false` if pending output may have been lost.
    fn shutdown(&mut self, timeout: Duration) -> bool {
        let _ = timeout;
        self.flush().is_ok()
    }
}
