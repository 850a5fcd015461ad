// src/report/markdown.rs — Human-readable run report

use chrono::{DateTime, Local};
use std::fmt::Write;

use super::{retry_overhead_percent, ReportExporter};
use crate::core::types::{AttemptRecord, Outcome, WorkflowResult};
use crate::infra::errors::WorkflowError;

#[derive(Debug, Clone, Default)]
pub struct MarkdownReport {
    generated_at: Option<DateTime<Local>>,
}

impl MarkdownReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the timestamp printed in the header (defaults to render time).
    pub fn generated_at(mut self, at: DateTime<Local>) -> Self {
        self.generated_at = Some(at);
        self
    }
}

impl ReportExporter for MarkdownReport {
    fn extension(&self) -> &'static str {
        "md"
    }

    fn render(&self, result: &WorkflowResult) -> Result<String, WorkflowError> {
        let at = self.generated_at.unwrap_or_else(Local::now);
        let mut out = String::new();
        write_report(&mut out, result, at).map_err(|e| anyhow::anyhow!("report formatting failed: {e}"))?;
        Ok(out)
    }
}

fn outcome_description(result: &WorkflowResult) -> &'static str {
    match result.outcome {
        Outcome::Success => "A candidate passed the quality gate.",
        Outcome::Partial => {
            "No candidate passed the quality gate; the best candidate is included."
        }
        Outcome::Failure if result.was_cancelled() && result.any_candidate_produced() => {
            "The run was cancelled; the best candidate so far is included."
        }
        Outcome::Failure if result.was_cancelled() => "The run was cancelled.",
        Outcome::Failure => "No usable candidate was produced.",
    }
}

fn write_report(
    out: &mut String,
    result: &WorkflowResult,
    at: DateTime<Local>,
) -> std::fmt::Result {
    let max_attempts = result.max_retries as usize + 1;

    writeln!(out, "# Code Generation Report\n")?;
    writeln!(out, "**Generated:** {}  ", at.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out, "**Outcome:** {} ({})  ", result.outcome, result.final_reason)?;
    writeln!(out, "**Description:** {}  ", outcome_description(result))?;
    writeln!(out, "**Attempts:** {} / {}  ", result.attempts(), max_attempts)?;
    writeln!(
        out,
        "**Quality threshold:** 0 critical, <= {} warnings\n",
        result.warning_threshold
    )?;

    writeln!(out, "## Task\n\n```\n{}\n```\n", result.task.description)?;

    let delivered_idx = result.accepted_attempt.or(result.best_attempt);
    match result.delivered_candidate() {
        Some(c) => {
            let label = if result.accepted_attempt.is_some() {
                "Accepted candidate"
            } else {
                "Best candidate"
            };
            match delivered_idx {
                Some(idx) => writeln!(out, "## {} (attempt {})\n", label, idx + 1)?,
                None => writeln!(out, "## {}\n", label)?,
            }
            writeln!(out, "**Function:** `{}`\n", c.function_name)?;
            if !c.explanation.is_empty() {
                writeln!(out, "{}\n", c.explanation)?;
            }
            writeln!(out, "```python\n{}\n```\n", c.code.trim_end())?;
            if !c.dependencies.is_empty() {
                writeln!(out, "### Dependencies\n")?;
                for dep in &c.dependencies {
                    writeln!(out, "- `{}`", dep)?;
                }
                writeln!(out)?;
            }
            if !c.test_code.trim().is_empty() {
                writeln!(out, "### Tests\n\n```python\n{}\n```\n", c.test_code.trim_end())?;
            }
            if !c.usage_examples.is_empty() {
                writeln!(out, "### Usage examples\n")?;
                for example in &c.usage_examples {
                    writeln!(out, "```python\n{}\n```\n", example.trim_end())?;
                }
            }
        }
        None => writeln!(out, "## Candidate\n\nNo candidate was produced.\n")?,
    }

    if let Some(summary) = delivered_idx
        .and_then(|idx| result.attempt_history.get(idx))
        .and_then(|r| r.summary.as_ref())
    {
        writeln!(out, "## Findings\n")?;
        writeln!(
            out,
            "{} critical, {} warning(s), {} info\n",
            summary.critical_count,
            summary.warning_count,
            summary.info_count()
        )?;
        if !summary.findings.is_empty() {
            writeln!(out, "| Severity | Category | Message |")?;
            writeln!(out, "|----------|----------|---------|")?;
            for f in &summary.findings {
                writeln!(out, "| {} | {} | {} |", f.severity, f.category, escape_cell(&f.message))?;
            }
            writeln!(out)?;
        }
        if !summary.scores.is_empty() {
            writeln!(out, "### Scores\n")?;
            for (name, score) in &summary.scores {
                writeln!(out, "- **{}:** {:.1}", name, score)?;
            }
            writeln!(out)?;
        }
    }

    writeln!(out, "## Attempt history\n")?;
    if result.attempt_history.is_empty() {
        writeln!(out, "No attempts were made.\n")?;
    } else {
        writeln!(out, "| # | Verdict | Critical | Warnings | Duration | Cost | Error |")?;
        writeln!(out, "|---|---------|----------|----------|----------|------|-------|")?;
        for record in &result.attempt_history {
            write_attempt_row(out, record)?;
        }
        writeln!(out)?;
    }

    let m = &result.metrics;
    writeln!(out, "## Metrics\n")?;
    writeln!(out, "- **Total duration:** {:.2}s", m.total_duration.as_secs_f64())?;
    writeln!(out, "- **Mean attempt duration:** {:.2}s", m.mean_duration.as_secs_f64())?;
    writeln!(out, "- **Total cost units:** {}", m.total_cost)?;
    writeln!(out, "- **Cost per attempt:** {:.1}", m.cost_per_attempt())?;
    writeln!(out, "- **External calls:** {}", m.total_calls())?;
    for (phase, stats) in &m.by_phase {
        writeln!(
            out,
            "- **{}:** {} call(s), {:.2}s total, {:.2}s mean, {} cost units",
            phase,
            stats.calls,
            stats.total_duration.as_secs_f64(),
            stats.mean_duration.as_secs_f64(),
            stats.total_cost
        )?;
    }
    writeln!(out)?;

    writeln!(out, "## Efficiency\n")?;
    writeln!(
        out,
        "- **Attempts used:** {} of {} maximum",
        result.attempts(),
        max_attempts
    )?;
    writeln!(
        out,
        "- **Retry overhead:** {:.1}% additional processing",
        retry_overhead_percent(result.attempts())
    )?;

    Ok(())
}

fn write_attempt_row(out: &mut String, record: &AttemptRecord) -> std::fmt::Result {
    let (critical, warnings) = match &record.summary {
        Some(s) => (s.critical_count.to_string(), s.warning_count.to_string()),
        None => ("-".to_string(), "-".to_string()),
    };
    writeln!(
        out,
        "| {} | {} | {} | {} | {:.2}s | {} | {} |",
        record.attempt_index + 1,
        record.verdict.reason,
        critical,
        warnings,
        record.duration.as_secs_f64(),
        record.cost_units,
        record.error.as_deref().map(escape_cell).unwrap_or_default()
    )
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
