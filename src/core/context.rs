//! Correlation contexts
//!
//! A [`Ctx`] carries a correlation id, an action tag and a pending
//! structured payload across one or more log calls. The id and tag persist
//! between calls; the payload is consumed by the next terminal call.

use super::error::Result;
use super::log_level::LogLevel;
use super::logger::Logger;
use super::pool::{Pooled, Reusable};
use serde_json::{Map, Value};
use std::fmt;
use std::panic::Location;

/// Pooled storage behind a [`Ctx`]
#[derive(Debug, Default)]
pub struct CtxState {
    id: String,
    tag: String,
    data: Option<Value>,
}

impl Reusable for CtxState {
    fn reset(&mut self) {
        self.id.clear();
        self.tag.clear();
        self.data = None;
    }
}

/// Short-lived correlation handle bound to one [`Logger`]
///
/// Builder methods take `&mut self`, so a single `Ctx` can only be driven
/// from one place at a time. [`Ctx::free`] consumes the handle; dropping it
/// has the same effect.
///
/// # Example
///
/// ```
/// use rust_event_logger::prelude::*;
/// use serde_json::json;
///
/// let logger = Logger::new(LogLevel::Debug, Vec::new());
/// let mut ctx = logger.ctx("abc123");
/// ctx.tag("login")
///     .fields(json!({"user": "ana"}))
///     .info("credentials accepted")
///     .warn("password expires soon");
/// ctx.free();
/// ```
pub struct Ctx<'a> {
    logger: &'a Logger,
    state: Pooled<'a, CtxState>,
}

impl<'a> Ctx<'a> {
    pub(crate) fn new(logger: &'a Logger, id: &str) -> Self {
        let mut state = logger.contexts.acquire();
        state.id.push_str(id);
        Self { logger, state }
    }

    pub fn id(&self) -> &str {
        &self.state.id
    }

    pub fn tag_name(&self) -> &str {
        &self.state.tag
    }

    /// Pending payload for the next terminal call, if any.
    pub fn pending_data(&self) -> Option<&Value> {
        self.state.data.as_ref()
    }

    /// Set the action tag for this and following calls.
    pub fn tag(&mut self, tag: impl AsRef<str>) -> &mut Self {
        self.state.tag.clear();
        self.state.tag.push_str(tag.as_ref());
        self
    }

    /// Replace the pending payload.
    pub fn fields(&mut self, data: impl Into<Value>) -> &mut Self {
        self.state.data = Some(data.into());
        self
    }

    /// Add one key to the pending payload.
    ///
    /// A pending payload that is not a JSON object is replaced.
    pub fn field(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        match self.state.data {
            Some(Value::Object(ref mut map)) => {
                map.insert(key.into(), value.into());
            }
            _ => {
                let mut map = Map::new();
                map.insert(key.into(), value.into());
                self.state.data = Some(Value::Object(map));
            }
        }
        self
    }

    /// Emit an event carrying this context's id, tag and pending payload,
    /// returning the first driver error.
    ///
    /// The chaining calls below discard the result; use this one to react to
    /// [`LoggerError::DriverBusy`](crate::LoggerError::DriverBusy) and the like.
    #[track_caller]
    pub fn output(&mut self, level: LogLevel, message: impl Into<String>) -> Result<()> {
        let data = self.state.data.take();
        self.logger.output_at(
            Some(Location::caller()),
            level,
            &self.state.tag,
            &self.state.id,
            message.into(),
            data,
        )
    }

    /// Emit an event carrying this context's id, tag and pending payload.
    #[track_caller]
    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) -> &mut Self {
        let _ = self.output(level, message);
        self
    }

    #[inline]
    #[track_caller]
    pub fn debug(&mut self, message: impl Into<String>) -> &mut Self {
        self.log(LogLevel::Debug, message)
    }

    #[inline]
    #[track_caller]
    pub fn info(&mut self, message: impl Into<String>) -> &mut Self {
        self.log(LogLevel::Info, message)
    }

    #[inline]
    #[track_caller]
    pub fn warn(&mut self, message: impl Into<String>) -> &mut Self {
        self.log(LogLevel::Warn, message)
    }

    #[inline]
    #[track_caller]
    pub fn error(&mut self, message: impl Into<String>) -> &mut Self {
        self.log(LogLevel::Error, message)
    }

    #[inline]
    #[track_caller]
    pub fn fatal(&mut self, message: impl Into<String>) -> &mut Self {
        self.log(LogLevel::Fatal, message)
    }

    /// Return this context to its logger's pool.
    pub fn free(self) {}
}

impl fmt::Debug for Ctx<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ctx")
            .field("id", &self.state.id)
            .field("tag", &self.state.tag)
            .field("data", &self.state.data)
            .finish()
    }
}
