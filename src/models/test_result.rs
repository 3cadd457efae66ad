//! Scenario result models
//!
//! Defines the scenarios, their results, and status types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scenarios the suite knows how to run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioKind {
    /// Cluster object, workload API server and apiserver cert secret are present
    ClusterApi,
    /// Ingress-denial NetworkPolicy blocks and then restores probe traffic
    NetworkPolicy,
}

impl ScenarioKind {
    pub fn number(&self) -> u8 {
        match self {
            ScenarioKind::ClusterApi => 1,
            ScenarioKind::NetworkPolicy => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioKind::ClusterApi => "Cluster API Endpoint",
            ScenarioKind::NetworkPolicy => "Network Policy Enforcement",
        }
    }

    /// Identifier used on the command line and in config files
    pub fn id(&self) -> &'static str {
        match self {
            ScenarioKind::ClusterApi => "cluster-api",
            ScenarioKind::NetworkPolicy => "network-policy",
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            ScenarioKind::ClusterApi => "Cluster API Operations",
            ScenarioKind::NetworkPolicy => "Network Connectivity",
        }
    }

    pub fn all() -> Vec<ScenarioKind> {
        vec![ScenarioKind::ClusterApi, ScenarioKind::NetworkPolicy]
    }

    /// Parse from a number or an id
    pub fn from_str(s: &str) -> Option<ScenarioKind> {
        let s = s.trim().to_lowercase();
        ScenarioKind::all()
            .into_iter()
            .find(|k| k.id() == s || k.number().to_string() == s)
    }

    /// Parse a comma-separated selection. An empty selection means every scenario.
    pub fn parse_selection(selection: &str) -> Result<Vec<ScenarioKind>, String> {
        let mut selected = Vec::new();
        for part in selection.split(',').filter(|p| !p.trim().is_empty()) {
            let kind =
                ScenarioKind::from_str(part).ok_or_else(|| format!("Unknown scenario: {part}"))?;
            if !selected.contains(&kind) {
                selected.push(kind);
            }
        }
        if selected.is_empty() {
            selected = ScenarioKind::all();
        }
        Ok(selected)
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scenario {}: {}", self.number(), self.name())
    }
}

/// Scenario execution status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    /// An assertion did not hold
    Fail,
    Skip,
    /// The scenario could not run to its assertions
    Error,
}

impl TestStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            TestStatus::Pass => "✓",
            TestStatus::Fail => "✗",
            TestStatus::Skip => "○",
            TestStatus::Error => "!",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TestStatus::Pass)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::Pass => write!(f, "PASS"),
            TestStatus::Fail => write!(f, "FAIL"),
            TestStatus::Skip => write!(f, "SKIP"),
            TestStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Duration of one scenario step
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTiming {
    pub name: String,
    pub duration_ms: u64,
}

/// Result of a single scenario
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario: ScenarioKind,
    pub status: TestStatus,
    pub duration_ms: u64,
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepTiming>,
}

impl ScenarioResult {
    pub fn pass(scenario: ScenarioKind, duration_ms: u64) -> Self {
        Self {
            scenario,
            status: TestStatus::Pass,
            duration_ms,
            message: None,
            steps: Vec::new(),
        }
    }

    pub fn fail(scenario: ScenarioKind, duration_ms: u64, message: impl Into<String>) -> Self {
        Self {
            scenario,
            status: TestStatus::Fail,
            duration_ms,
            message: Some(message.into()),
            steps: Vec::new(),
        }
    }

    pub fn skip(scenario: ScenarioKind, reason: impl Into<String>) -> Self {
        Self {
            scenario,
            status: TestStatus::Skip,
            duration_ms: 0,
            message: Some(reason.into()),
            steps: Vec::new(),
        }
    }

    pub fn error(scenario: ScenarioKind, duration_ms: u64, error: impl Into<String>) -> Self {
        Self {
            scenario,
            status: TestStatus::Error,
            duration_ms,
            message: Some(error.into()),
            steps: Vec::new(),
        }
    }

    pub fn with_steps(mut self, steps: Vec<StepTiming>) -> Self {
        self.steps = steps;
        self
    }
}

impl fmt::Display for ScenarioResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.status.symbol(),
            self.scenario,
            self.duration_ms
        )?;
        if let Some(msg) = &self.message {
            write!(f, " - {msg}")?;
        }
        Ok(())
    }
}

/// Summary of one suite run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub cluster: String,
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub total_duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteSummary {
    pub fn new(
        cluster: impl Into<String>,
        started_at: DateTime<Utc>,
        results: Vec<ScenarioResult>,
    ) -> Self {
        let count = |status: TestStatus| results.iter().filter(|r| r.status == status).count();

        Self {
            cluster: cluster.into(),
            started_at,
            total: results.len(),
            passed: count(TestStatus::Pass),
            failed: count(TestStatus::Fail),
            skipped: count(TestStatus::Skip),
            errors: count(TestStatus::Error),
            total_duration_ms: results.iter().map(|r| r.duration_ms).sum(),
            results,
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }

    /// True when nothing failed or errored. Skipped scenarios do not fail the run.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }
}

impl fmt::Display for SuiteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cluster {}", self.cluster)?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for result in &self.results {
            writeln!(f, "  {result}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Skip: {} | Error: {}",
            self.total, self.passed, self.failed, self.skipped, self.errors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_from_str() {
        assert_eq!(
            ScenarioKind::from_str("network-policy"),
            Some(ScenarioKind::NetworkPolicy)
        );
        assert_eq!(ScenarioKind::from_str("1"), Some(ScenarioKind::ClusterApi));
        assert_eq!(ScenarioKind::from_str(" Cluster-API "), Some(ScenarioKind::ClusterApi));
        assert_eq!(ScenarioKind::from_str("dns"), None);
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(
            ScenarioKind::parse_selection("").unwrap(),
            ScenarioKind::all()
        );
        assert_eq!(
            ScenarioKind::parse_selection("network-policy,2").unwrap(),
            vec![ScenarioKind::NetworkPolicy]
        );
        assert!(ScenarioKind::parse_selection("network-policy,bogus").is_err());
    }

    #[test]
    fn test_scenario_serde_id() {
        let json = serde_json::to_string(&ScenarioKind::NetworkPolicy).unwrap();
        assert_eq!(json, "\"network-policy\"");
    }

    #[test]
    fn test_suite_summary_counts() {
        let results = vec![
            ScenarioResult::pass(ScenarioKind::ClusterApi, 100),
            ScenarioResult::fail(ScenarioKind::NetworkPolicy, 50, "policy not enforced"),
        ];

        let summary = SuiteSummary::new("rke", Utc::now(), results);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total_duration_ms, 150);
        assert!(!summary.is_success());
        assert_eq!(summary.pass_rate(), 50.0);
    }

    #[test]
    fn test_skipped_does_not_fail_suite() {
        let results = vec![
            ScenarioResult::pass(ScenarioKind::NetworkPolicy, 10),
            ScenarioResult::skip(ScenarioKind::ClusterApi, "not selected"),
        ];
        assert!(SuiteSummary::new("rke", Utc::now(), results).is_success());
    }
}
