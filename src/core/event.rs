//! Event record passed from the dispatch core to drivers

use super::log_level::LogLevel;
use super::pool::Reusable;
use rand::RngCore;
use serde::Serialize;
use serde_json::Value;
use std::panic::Location;

/// Marker used when a caller location cannot be resolved.
pub const UNKNOWN_LOCATION: &str = "unknown";

/// One emitted log record.
///
/// Events are owned by the logger's pool and lent to drivers as `&Event`
/// for the duration of a single dispatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Event {
    pub service: String,
    pub timestamp: String,
    pub level: LogLevel,
    /// `file:line` of the application call site
    #[serde(skip_serializing_if = "String::is_empty")]
    pub file: String,
    /// Correlation id, only set for events issued through a `Ctx`
    #[serde(rename = "guid", skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// What the event is about, e.g. `login` or `callback`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub action: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Event {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            ..Self::default()
        }
    }

    /// Overwrite every field, reusing the existing string buffers.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn fill(
        &mut self,
        service: &str,
        timestamp: String,
        level: LogLevel,
        file: String,
        id: &str,
        action: &str,
        message: String,
        data: Option<Value>,
    ) {
        self.service.clear();
        self.service.push_str(service);
        self.timestamp = timestamp;
        self.level = level;
        self.file = file;
        self.id.clear();
        self.id.push_str(id);
        self.action.clear();
        self.action.push_str(action);
        self.message = message;
        self.data = data;
    }
}

impl Reusable for Event {
    /// Drop payloads so a pooled event does not pin caller data.
    fn reset(&mut self) {
        self.message.clear();
        self.data = None;
    }
}

/// Extract the final path component of a source file without its extension.
///
/// Both `/` and `\` are treated as separators. An empty result degrades to
/// [`UNKNOWN_LOCATION`].
pub fn source_basename(path: &str) -> &str {
    let name = match path.rfind(['/', '\\']) {
        Some(idx) => &path[idx + 1..],
        None => path,
    };
    let stem = match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    };
    if stem.is_empty() {
        UNKNOWN_LOCATION
    } else {
        stem
    }
}

/// Render a caller location as `file:line`.
pub fn format_location(location: Option<&Location<'_>>) -> String {
    match location {
        Some(loc) => format!("{}:{}", source_basename(loc.file()), loc.line()),
        None => format!("{}:0", UNKNOWN_LOCATION),
    }
}

/// Generate a random correlation id: 16 random bytes, lowercase hex encoded.
pub fn create_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
