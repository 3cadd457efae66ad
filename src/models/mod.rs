//! Data models for the e2e suite
//!
//! Scenario identifiers, results and summaries.

mod test_result;

pub use test_result::{ScenarioKind, ScenarioResult, StepTiming, SuiteSummary, TestStatus};
