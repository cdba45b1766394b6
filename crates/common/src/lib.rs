//! Common utilities and types shared across the GLBP workspace.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
