// src/cli/check.rs — `codegate check`: gate an existing candidate file

use std::path::Path;

use crate::core::feedback::FeedbackAggregator;
use crate::core::gate;
use crate::core::types::{CandidateArtifact, FindingsSummary, Verdict};
use crate::infra::config::Config;

use super::run::build_detector;

/// What a single check pass concluded.
#[derive(Debug)]
pub struct CheckReport {
    pub summary: FindingsSummary,
    pub verdict: Verdict,
    /// Present only when the candidate was rejected.
    pub directive: Option<String>,
}

/// Inspect, aggregate and gate one candidate, without producing anything.
pub async fn check_candidate(
    candidate: &CandidateArtifact,
    config: &Config,
    task: Option<&str>,
    analyzer: Option<&str>,
    warning_threshold: u32,
) -> anyhow::Result<CheckReport> {
    let detector = build_detector(config, task, analyzer);
    let inspection = detector.inspect(candidate).await?;

    let feedback = FeedbackAggregator::from_config(&config.feedback, warning_threshold);
    let summary = feedback
        .aggregate(inspection.findings)
        .with_scores(inspection.scores);
    let verdict = gate::evaluate(&summary, warning_threshold);
    let directive = (!verdict.accepted).then(|| feedback.build_retry_directive(&summary, None));

    Ok(CheckReport {
        summary,
        verdict,
        directive,
    })
}

/// Run the check subcommand. Returns whether the candidate passed.
pub async fn run_check(
    file: &Path,
    task: Option<&str>,
    analyzer: Option<&str>,
    config: &Config,
    warning_threshold: u32,
) -> anyhow::Result<bool> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", file.display(), e))?;
    let candidate: CandidateArtifact = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("{} is not a candidate: {}", file.display(), e))?;

    let report = check_candidate(&candidate, config, task, analyzer, warning_threshold).await?;

    println!(
        "{}: {} critical, {} warning(s), {} info",
        candidate.function_name,
        report.summary.critical_count,
        report.summary.warning_count,
        report.summary.info_count()
    );
    for finding in &report.summary.findings {
        println!("  [{}] ({}) {}", finding.severity, finding.category, finding.message);
    }
    for (name, score) in &report.summary.scores {
        println!("  score {}: {:.1}", name, score);
    }
    println!(
        "\n{}",
        gate::explain(&report.verdict, Some(&report.summary), warning_threshold)
    );
    if let Some(ref directive) = report.directive {
        println!("\nRetry directive:\n{}", directive);
    }

    Ok(report.verdict.accepted)
}
