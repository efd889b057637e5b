//! Output formats for rendering events
//!
//! - Pattern: flat human-readable line (default)
//! - Json: one compact JSON object per line
//! - JsonPretty: tab-indented JSON object

use super::event::Event;
use serde::{Deserialize, Serialize};

/// Output format for events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Flat text format
    ///
    /// Example: `[2025-01-08 10:30:45] info main:20 (login#4f2a..)-> user signed in`
    #[default]
    Pattern,

    /// Compact JSON, newline terminated
    Json,

    /// Indented JSON, newline terminated
    JsonPretty,
}

impl OutputFormat {
    /// Render an event according to this format.
    ///
    /// Rendering depends only on the event's public fields, so the same event
    /// always renders to the same bytes.
    pub fn render(&self, event: &Event) -> Vec<u8> {
        match self {
            OutputFormat::Pattern => format_pattern(event),
            OutputFormat::Json => format_json(event, false),
            OutputFormat::JsonPretty => format_json(event, true),
        }
    }
}

/// Render an event as a flat text line.
///
/// The `(action#id)` group only appears when either is set. Structured data
/// follows on its own `fields->` line.
pub fn format_pattern(event: &Event) -> Vec<u8> {
    let mut out = if !event.action.is_empty() || !event.id.is_empty() {
        format!(
            "[{}] {} {} ({}#{})-> {}",
            event.timestamp, event.level, event.file, event.action, event.id, event.message
        )
    } else {
        format!(
            "[{}] {} {}-> {}",
            event.timestamp, event.level, event.file, event.message
        )
    };
    if !out.ends_with('\n') {
        out.push('\n');
    }
    if let Some(ref data) = event.data {
        out.push_str("fields-> ");
        out.push_str(&data.to_string());
        out.push('\n');
    }
    out.into_bytes()
}

/// Render an event as JSON.
pub fn format_json(event: &Event, pretty: bool) -> Vec<u8> {
    let rendered = if pretty {
        to_tab_indented(event)
    } else {
        serde_json::to_vec(event)
    };
    match rendered {
        Ok(mut bytes) => {
            bytes.push(b'\n');
            bytes
        }
        Err(e) => {
            // Event only holds strings and JSON values, so this is unexpected.
            eprintln!("[LOGGER ERROR] Failed to encode event as JSON: {}", e);
            format_pattern(event)
        }
    }
}

fn to_tab_indented(event: &Event) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(256);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    serde::Serialize::serialize(event, &mut serializer)?;
    Ok(buf)
}
