//! Console driver
//!
//! Writes to stdout, either as pattern lines colored by level or as JSON.

use crate::core::driver::Driver;
use crate::core::error::Result;
use crate::core::event::Event;
use crate::core::output_format::OutputFormat;
use colored::Colorize;
use std::io::{self, Write};

pub struct ConsoleDriver {
    out: Box<dyn Write + Send + Sync>,
    format: OutputFormat,
    use_colors: bool,
}

impl ConsoleDriver {
    pub fn new() -> Self {
        Self {
            out: Box::new(io::stdout()),
            format: OutputFormat::Pattern,
            use_colors: true,
        }
    }

    /// Switch to JSON output, tab-indented when `indent` is set.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_event_logger::drivers::ConsoleDriver;
    ///
    /// let driver = ConsoleDriver::new().with_json(true);
    /// ```
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_json(mut self, indent: bool) -> Self {
        self.format = if indent {
            OutputFormat::JsonPretty
        } else {
            OutputFormat::Json
        };
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Send output somewhere other than stdout.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_writer(mut self, out: impl Write + Send + Sync + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    fn colorize(&self, event: &Event, line: Vec<u8>) -> Vec<u8> {
        let color = match event.level.color_code() {
            Some(color) if self.use_colors => color,
            _ => return line,
        };
        let text = String::from_utf8_lossy(&line);
        // Keep the reset sequence ahead of the final newline.
        let body = text.trim_end_matches('\n');
        let mut colored = body.color(color).to_string();
        colored.push('\n');
        colored.into_bytes()
    }
}

impl Default for ConsoleDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for ConsoleDriver {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.out.write_all(buf)?;
        Ok(buf.len())
    }

    fn format(&self, event: &Event) -> Vec<u8> {
        let rendered = self.format.render(event);
        match self.format {
            OutputFormat::Pattern => self.colorize(event, rendered),
            OutputFormat::Json | OutputFormat::JsonPretty => rendered,
        }
    }

    fn name(&self) -> &str {
        "console"
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
