//! Output formatters for scenario results
//!
//! Provides JSON, table, CSV, and summary output formats.

use std::io::Write;

use crate::models::{ScenarioResult, SuiteSummary, TestStatus};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    fn status_label(&self, status: TestStatus) -> String {
        let label = format!("{} {}", status.symbol(), status);
        if !self.colorize {
            return label;
        }
        let color = match status {
            TestStatus::Pass => "32",
            TestStatus::Fail | TestStatus::Error => "31",
            TestStatus::Skip => "33",
        };
        format!("\x1b[{color}m{label}\x1b[0m")
    }

    fn format_result_table(&self, result: &ScenarioResult) -> String {
        let mut line = format!(
            "{:2}. {:28} {} [{:>7}ms]",
            result.scenario.number(),
            result.scenario.name(),
            self.status_label(result.status),
            result.duration_ms
        );
        if !result.status.is_success() {
            if let Some(msg) = &result.message {
                line.push_str(&format!("\n      {msg}"));
            }
        }
        for step in &result.steps {
            line.push_str(&format!("\n      - {:32} {:>7}ms", step.name, step.duration_ms));
        }
        line
    }

    /// Format a whole suite run
    pub fn format_summary(&self, summary: &SuiteSummary) -> String {
        match self.format {
            OutputFormat::Table => self.format_summary_table(summary),
            OutputFormat::Json => serde_json::to_string(summary).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(summary).unwrap_or_default(),
            OutputFormat::Csv => csv_rows(&summary.results).unwrap_or_default(),
            OutputFormat::Summary => self.format_summary_brief(summary),
        }
    }

    fn format_summary_table(&self, summary: &SuiteSummary) -> String {
        let mut output = String::new();

        output.push_str("\n═══════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(
            " Cluster {} ({})\n",
            summary.cluster,
            summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output.push_str("═══════════════════════════════════════════════════════════════\n");

        for result in &summary.results {
            output.push_str(&format!(" {}\n", self.format_result_table(result)));
        }

        output.push_str("───────────────────────────────────────────────────────────────\n");

        let fail_str = if self.colorize && summary.failed > 0 {
            format!("\x1b[31m{}\x1b[0m", summary.failed)
        } else {
            summary.failed.to_string()
        };
        output.push_str(&format!(
            " Total: {} | Pass: {} | Fail: {} | Skip: {} | Error: {}\n",
            summary.total, summary.passed, fail_str, summary.skipped, summary.errors
        ));
        output.push_str(&format!(
            " Pass Rate: {:.1}% | Duration: {}ms\n",
            summary.pass_rate(),
            summary.total_duration_ms
        ));

        output
    }

    fn format_summary_brief(&self, summary: &SuiteSummary) -> String {
        format!(
            "{}: {}/{} passed ({:.1}%) in {}ms",
            summary.cluster,
            summary.passed,
            summary.total,
            summary.pass_rate(),
            summary.total_duration_ms
        )
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

fn csv_rows(results: &[ScenarioResult]) -> anyhow::Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(["number", "scenario", "status", "duration_ms", "message"])?;
    for result in results {
        writer.write_record([
            result.scenario.number().to_string(),
            result.scenario.id().to_string(),
            result.status.to_string(),
            result.duration_ms.to_string(),
            result.message.clone().unwrap_or_default(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

/// Write results to a file
pub fn write_results_to_file(
    path: &str,
    summary: &SuiteSummary,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let formatter = ResultFormatter::new(format).no_color();
    let content = formatter.format_summary(summary);

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
