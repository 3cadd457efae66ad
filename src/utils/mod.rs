//! Shared helpers: logging setup, timing and bounded polling.

pub mod logger;
pub mod poll;
pub mod timer;
