//! Common utilities for usbhost
//!
//! This crate provides functionality shared by the workspace: the logging
//! setup used by the CLI, a small shared error type, and byte-image builders
//! that tests use to describe device nodes.

pub mod error;
pub mod logging;
pub mod test_utils;

pub use error::{Error, Result};
pub use logging::{LogFormat, setup_logging};
