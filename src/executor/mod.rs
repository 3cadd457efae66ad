//! Suite execution
//!
//! Builds the suite fixtures once and runs scenarios sequentially against them.

mod context;
mod runner;

pub use context::SuiteContext;
pub use runner::SuiteRunner;
