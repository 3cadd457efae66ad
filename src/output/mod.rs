//! Output formatting module
//!
//! Renders suite results for the terminal or a results file.

mod formatter;

pub use formatter::{write_results_to_file, OutputFormat, ResultFormatter};
