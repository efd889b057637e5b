//! Driver implementations

#[cfg(feature = "console")]
pub mod console;
pub mod file;
#[cfg(feature = "network")]
pub mod http;

#[cfg(feature = "console")]
pub use console::ConsoleDriver;
pub use file::{FileDriver, FileOptions};
#[cfg(feature = "network")]
pub use http::{HttpDriver, HttpOptions};

pub use crate::core::Driver;
