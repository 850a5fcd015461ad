// src/cli/run.rs — Default command: run tasks through the retry loop

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::feedback::FeedbackAggregator;
use crate::core::orchestrator::RetryOrchestrator;
use crate::core::types::{Outcome, Task, WorkflowConfig, WorkflowResult};
use crate::evaluator::command::CommandDetector;
use crate::evaluator::static_analysis::HeuristicDetector;
use crate::evaluator::{CompositeDetector, IssueDetector};
use crate::infra::config::Config;
use crate::infra::paths;
use crate::provider::command::CommandProducer;
use crate::report::{JsonReport, MarkdownReport, ReportExporter};

/// Per-invocation settings taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub max_retries: Option<u32>,
    pub warning_threshold: Option<u32>,
    pub producer: Option<String>,
    pub analyzer: Option<String>,
    /// `None` disables the report file.
    pub report_dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

impl RunOptions {
    /// Config file values with command-line overrides applied.
    pub fn workflow_config(&self, config: &Config) -> WorkflowConfig {
        let mut wf = WorkflowConfig::from(&config.workflow);
        if let Some(n) = self.max_retries {
            wf.max_retries = n;
        }
        if let Some(n) = self.warning_threshold {
            wf.warning_threshold = n;
        }
        wf
    }
}

/// Heuristic checks, followed by the external analyzer when one is configured.
pub fn build_detector(
    config: &Config,
    task_hint: Option<&str>,
    analyzer: Option<&str>,
) -> Arc<dyn IssueDetector> {
    let mut heuristic = HeuristicDetector::new(config.detector.clone());
    if let Some(task) = task_hint {
        heuristic = heuristic.with_task_hint(task);
    }

    match analyzer.or(config.detector.command.as_deref()) {
        Some(cmd) if !cmd.trim().is_empty() => Arc::new(CompositeDetector::new(vec![
            Box::new(heuristic),
            Box::new(CommandDetector::new(cmd)),
        ])),
        _ => Arc::new(heuristic),
    }
}

/// Run every task sequentially, each with an isolated orchestrator.
/// Returns true when all of them succeeded.
pub async fn run_tasks(
    tasks: &[(String, String)],
    config: &Config,
    opts: &RunOptions,
    cancel: CancellationToken,
) -> anyhow::Result<bool> {
    let labelled = tasks.len() > 1;
    let mut all_succeeded = true;

    for (label, description) in tasks {
        if cancel.is_cancelled() {
            tracing::warn!(task = %label, "Skipping task after cancellation");
            all_succeeded = false;
            continue;
        }
        let label = labelled.then_some(label.as_str());
        let result = run_task(label, description, config, opts, cancel.clone()).await?;
        all_succeeded &= result.outcome == Outcome::Success;
    }

    Ok(all_succeeded)
}

/// Execute one task through the retry loop and emit its output and report.
pub async fn run_task(
    label: Option<&str>,
    description: &str,
    config: &Config,
    opts: &RunOptions,
    cancel: CancellationToken,
) -> anyhow::Result<WorkflowResult> {
    let workflow = opts.workflow_config(config);

    let mut producer_section = config.producer.clone();
    if let Some(ref cmd) = opts.producer {
        producer_section.command = Some(cmd.clone());
    }
    let producer = Arc::new(CommandProducer::from_config(&producer_section)?);
    let detector = build_detector(config, Some(description), opts.analyzer.as_deref());
    let feedback = FeedbackAggregator::from_config(&config.feedback, workflow.warning_threshold);

    let mut orchestrator = RetryOrchestrator::new(workflow, producer, detector)?
        .with_feedback(feedback)
        .with_cancellation(cancel);
    if !opts.quiet {
        orchestrator = match label {
            Some(l) => orchestrator.with_progress(super::progress::labelled_progress(l.to_string())),
            None => orchestrator.with_progress(super::progress::terminal_progress()),
        };
    }

    let result = orchestrator.run(Task::new(description)).await?;

    if opts.json {
        println!("{}", JsonReport.render(&result)?);
    } else {
        print_result(label, &result);
    }

    if let Some(ref dir) = opts.report_dir {
        let path = write_report(dir, label, &result)?;
        if !opts.quiet {
            eprintln!("Report written to {}", path.display());
        }
    }

    Ok(result)
}

fn print_result(label: Option<&str>, result: &WorkflowResult) {
    if let Some(label) = label {
        println!("=== {} ===", label);
    }
    println!(
        "Outcome: {} ({}) after {} attempt(s)",
        result.outcome,
        result.final_reason,
        result.attempts()
    );
    match result.delivered_candidate() {
        Some(c) => {
            println!("Function: {}\n", c.function_name);
            println!("{}", c.code.trim_end());
        }
        None => println!("No candidate was produced."),
    }
}

/// Persist the markdown report under `dir` with a timestamped name.
pub fn write_report(
    dir: &Path,
    label: Option<&str>,
    result: &WorkflowResult,
) -> anyhow::Result<PathBuf> {
    let exporter = MarkdownReport::new();
    let now = chrono::Local::now();
    let text = exporter.render(result)?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(paths::report_file_name(now, label, exporter.extension()));
    std::fs::write(&path, text)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metrics::MetricsSummary;
    use crate::core::types::VerdictReason;

    #[test]
    fn test_cli_overrides_win() {
        let config = Config::default();
        let opts = RunOptions {
            max_retries: Some(1),
            warning_threshold: Some(0),
            ..Default::default()
        };
        let wf = opts.workflow_config(&config);
        assert_eq!(wf.max_retries, 1);
        assert_eq!(wf.warning_threshold, 0);
        assert_eq!(wf.detector_timeout.as_secs(), 30);
    }

    #[test]
    fn test_no_overrides_keeps_file_values() {
        let mut config = Config::default();
        config.workflow.max_retries = 7;
        let wf = RunOptions::default().workflow_config(&config);
        assert_eq!(wf.max_retries, 7);
    }

    #[test]
    fn test_build_detector_picks_composite_with_analyzer() {
        let config = Config::default();
        assert_eq!(build_detector(&config, None, None).name(), "heuristic");
        assert_eq!(
            build_detector(&config, None, Some("./analyze.sh")).name(),
            "composite"
        );
    }

    #[tokio::test]
    async fn test_run_task_without_producer_is_config_error() {
        let err = run_task(
            None,
            "t",
            &Config::default(),
            &RunOptions::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("no producer configured"));
    }

    #[test]
    fn test_write_report_creates_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = WorkflowResult {
            task: Task::new("t"),
            outcome: Outcome::Failure,
            final_reason: VerdictReason::RetriesExhausted,
            best_candidate: None,
            best_attempt: None,
            accepted_attempt: None,
            attempt_history: vec![],
            metrics: MetricsSummary::default(),
            max_retries: 0,
            warning_threshold: 0,
        };
        let path = write_report(dir.path(), Some("simple"), &result).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("codegate_report_simple_"));
        assert!(name.ends_with(".md"));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("No attempts were made."));
    }
}
