//! Scenario runner
//!
//! Runs scenarios one after another. A failing scenario is recorded and the
//! next one still runs.

use chrono::Utc;
use tracing::{error, info};

use super::SuiteContext;
use crate::models::{ScenarioKind, ScenarioResult, SuiteSummary, TestStatus};
use crate::scenarios::{self, is_assertion_failure};
use crate::utils::timer::{Stopwatch, Timer};

pub struct SuiteRunner<'a> {
    ctx: &'a SuiteContext,
}

impl<'a> SuiteRunner<'a> {
    pub fn new(ctx: &'a SuiteContext) -> Self {
        Self { ctx }
    }

    /// Run a single scenario
    pub async fn run_scenario(&self, kind: ScenarioKind) -> ScenarioResult {
        info!("Running {}", kind);

        let timer = Timer::start(kind.id());
        let mut stopwatch = Stopwatch::new();
        let outcome = scenarios::run_scenario(kind, self.ctx, &mut stopwatch).await;
        let duration_ms = timer.stop();

        let result = match outcome {
            Ok(()) => ScenarioResult::pass(kind, duration_ms),
            Err(e) => {
                let message = format!("{e:#}");
                if is_assertion_failure(&e) {
                    error!("{} failed: {}", kind, message);
                    ScenarioResult::fail(kind, duration_ms, message)
                } else {
                    error!("{} failed with error: {}", kind, message);
                    ScenarioResult::error(kind, duration_ms, message)
                }
            }
        };

        result.with_steps(stopwatch.steps())
    }

    /// Run `selected` in order. Known scenarios that were not selected are
    /// reported as skipped after them.
    pub async fn run(&self, selected: &[ScenarioKind]) -> SuiteSummary {
        let started_at = Utc::now();
        info!(
            "Starting suite for cluster {} ({} scenarios)",
            self.ctx.config.cluster_name,
            selected.len()
        );

        let (to_run, skipped) = schedule(selected);
        let mut results = Vec::new();
        for kind in to_run {
            let result = self.run_scenario(kind).await;
            info!("  {}", result);
            results.push(result);
        }
        results.extend(
            skipped
                .into_iter()
                .map(|kind| ScenarioResult::skip(kind, "not selected")),
        );

        let summary = SuiteSummary::new(&self.ctx.config.cluster_name, started_at, results);
        let failed = summary
            .results
            .iter()
            .filter(|r| matches!(r.status, TestStatus::Fail | TestStatus::Error))
            .count();

        info!(
            "Suite completed in {}ms - Pass: {}/{} ({} failed)",
            summary.total_duration_ms,
            summary.passed,
            summary.total - summary.skipped,
            failed
        );

        summary
    }
}

/// Split into the scenarios to run, in selection order without repeats, and
/// the known scenarios that were not selected
fn schedule(selected: &[ScenarioKind]) -> (Vec<ScenarioKind>, Vec<ScenarioKind>) {
    let mut to_run = Vec::new();
    for kind in selected {
        if !to_run.contains(kind) {
            to_run.push(*kind);
        }
    }
    let skipped = ScenarioKind::all()
        .into_iter()
        .filter(|kind| !to_run.contains(kind))
        .collect();
    (to_run, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_keeps_selection_order() {
        let (to_run, skipped) =
            schedule(&[ScenarioKind::NetworkPolicy, ScenarioKind::ClusterApi]);
        assert_eq!(
            to_run,
            vec![ScenarioKind::NetworkPolicy, ScenarioKind::ClusterApi]
        );
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_schedule_skips_unselected() {
        let (to_run, skipped) = schedule(&[
            ScenarioKind::NetworkPolicy,
            ScenarioKind::NetworkPolicy,
        ]);
        assert_eq!(to_run, vec![ScenarioKind::NetworkPolicy]);
        assert_eq!(skipped, vec![ScenarioKind::ClusterApi]);
    }
}
