// src/core/orchestrator.rs — Retry controller
//
// Drives generate -> check -> gate -> (retry | finish) for one task. All run
// state (attempt history, metrics, state machine) lives in the instance and
// dies with it; concurrent runs each build their own orchestrator.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::feedback::FeedbackAggregator;
use super::gate;
use super::metrics::{MetricsTracker, Phase};
use super::state::WorkflowState;
use super::types::*;
use crate::evaluator::IssueDetector;
use crate::infra::errors::WorkflowError;
use crate::provider::CandidateProducer;

/// Result of one guarded collaborator call.
enum CallOutcome<T> {
    Finished(Result<T, WorkflowError>),
    TimedOut,
    Cancelled,
}

/// Race a collaborator call against its timeout and the cancellation token.
async fn guarded<T>(
    cancel: &CancellationToken,
    limit: Duration,
    call: impl Future<Output = Result<T, WorkflowError>>,
) -> CallOutcome<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => CallOutcome::Cancelled,
        res = tokio::time::timeout(limit, call) => match res {
            Ok(inner) => CallOutcome::Finished(inner),
            Err(_) => CallOutcome::TimedOut,
        },
    }
}

/// The state machine that owns a single quality-gated generation run.
pub struct RetryOrchestrator {
    config: WorkflowConfig,
    producer: Arc<dyn CandidateProducer>,
    detector: Arc<dyn IssueDetector>,
    feedback: FeedbackAggregator,
    metrics: MetricsTracker,
    state: WorkflowState,
    history: Vec<AttemptRecord>,
    cancel: CancellationToken,
    /// Optional callback for real-time progress events.
    on_progress: Option<Box<dyn Fn(ProgressEvent) + Send + Sync>>,
}

impl RetryOrchestrator {
    /// Build an orchestrator. An invalid configuration is rejected here, so a
    /// bad config never starts the loop.
    pub fn new(
        config: WorkflowConfig,
        producer: Arc<dyn CandidateProducer>,
        detector: Arc<dyn IssueDetector>,
    ) -> Result<Self, WorkflowError> {
        config.validate()?;
        let feedback = FeedbackAggregator::new(config.warning_threshold);
        Ok(Self {
            config,
            producer,
            detector,
            feedback,
            metrics: MetricsTracker::new(),
            state: WorkflowState::Init,
            history: Vec::new(),
            cancel: CancellationToken::new(),
            on_progress: None,
        })
    }

    pub fn with_feedback(mut self, feedback: FeedbackAggregator) -> Self {
        self.feedback = feedback;
        self
    }

    /// Use an externally owned token so callers (Ctrl-C handler, parent task)
    /// can abort the run.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Set a callback for real-time progress events.
    pub fn with_progress(mut self, cb: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(cb));
        self
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    fn transition(&mut self, next: WorkflowState) -> Result<(), WorkflowError> {
        if !self.state.can_transition_to(next) {
            tracing::error!(from = %self.state, to = %next, "Invalid state transition");
            return Err(WorkflowError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(from = %self.state, to = %next, "State transition");
        self.state = next;
        Ok(())
    }

    /// Run the loop to completion. Consumes the orchestrator: one instance, one run.
    ///
    /// Producer and detector failures (timeouts included) are recorded and
    /// consume an attempt slot. Cancellation ends the run with outcome
    /// `failure` and keeps the history collected so far. Only implementation
    /// errors are returned as `Err`.
    pub async fn run(mut self, task: Task) -> Result<WorkflowResult, WorkflowError> {
        let run_start = Instant::now();
        let max_attempts = self.config.max_attempts();
        let mut directive: Option<String> = None;
        let mut accepted_attempt: Option<usize> = None;

        tracing::info!(
            task_id = %task.id,
            max_retries = self.config.max_retries,
            warning_threshold = self.config.warning_threshold,
            "Starting run"
        );

        self.transition(WorkflowState::Generating)?;

        let final_reason = loop {
            let attempt_index = self.history.len();

            if self.cancel.is_cancelled() {
                tracing::warn!(attempt = attempt_index, "Cancelled before generation");
                break VerdictReason::Cancelled;
            }

            self.emit(ProgressEvent::AttemptStart {
                attempt: attempt_index + 1,
                max_attempts,
            });

            let Some(record) = self
                .attempt(&task, attempt_index, directive.as_deref())
                .await?
            else {
                tracing::warn!(attempt = attempt_index, "Cancelled during generation; attempt discarded");
                break VerdictReason::Cancelled;
            };

            self.metrics.record_attempt(record.duration, record.cost_units);
            self.emit(ProgressEvent::AttemptEnd {
                attempt: attempt_index + 1,
                verdict: record.verdict,
                critical: record.summary.as_ref().map_or(0, |s| s.critical_count),
                warnings: record.summary.as_ref().map_or(0, |s| s.warning_count),
                elapsed: record.duration,
            });
            tracing::info!(
                attempt = attempt_index,
                "{}",
                gate::explain(
                    &record.verdict,
                    record.summary.as_ref(),
                    self.config.warning_threshold
                )
            );

            let verdict = record.verdict;
            let next_directive = record
                .summary
                .as_ref()
                .map(|s| self.feedback.build_retry_directive(s, Some(attempt_index + 1)));
            self.history.push(record);

            if verdict.reason == VerdictReason::Cancelled {
                tracing::warn!(attempt = attempt_index, "Cancelled during check");
                break VerdictReason::Cancelled;
            }

            if verdict.accepted {
                accepted_attempt = Some(attempt_index);
                break VerdictReason::Approved;
            }

            if attempt_index >= self.config.max_retries as usize {
                break VerdictReason::RetriesExhausted;
            }

            // A failed collaborator call leaves no summary; keep the last directive.
            if next_directive.is_some() {
                directive = next_directive;
            }
            self.transition(WorkflowState::Retrying)?;
            self.transition(WorkflowState::Generating)?;
        };

        self.finish(task, final_reason, accepted_attempt, run_start)
    }

    /// One generate -> check -> decide cycle. `None` when cancelled before a
    /// candidate exists; a cancellation during the check still yields a
    /// record carrying the candidate.
    async fn attempt(
        &mut self,
        task: &Task,
        attempt_index: usize,
        directive: Option<&str>,
    ) -> Result<Option<AttemptRecord>, WorkflowError> {
        let started_at = Utc::now();
        let attempt_start = Instant::now();
        let cancel = self.cancel.clone();

        let producer = Arc::clone(&self.producer);
        let gen_start = Instant::now();
        let generated = guarded(
            &cancel,
            self.config.producer_timeout,
            producer.generate(&task.description, directive),
        )
        .await;
        let gen_elapsed = gen_start.elapsed();

        let output = match generated {
            CallOutcome::Cancelled => return Ok(None),
            CallOutcome::Finished(Ok(output)) => {
                self.metrics
                    .record_call(Phase::Generate, gen_elapsed, output.cost_units);
                output
            }
            CallOutcome::Finished(Err(e)) => {
                self.metrics.record_call(Phase::Generate, gen_elapsed, 0);
                return self.failed_generation(attempt_index, e, started_at, attempt_start);
            }
            CallOutcome::TimedOut => {
                self.metrics.record_call(Phase::Generate, gen_elapsed, 0);
                let e = WorkflowError::Producer {
                    message: format!(
                        "no candidate within {}s",
                        self.config.producer_timeout.as_secs_f64()
                    ),
                    timed_out: true,
                };
                return self.failed_generation(attempt_index, e, started_at, attempt_start);
            }
        };

        self.transition(WorkflowState::Checking)?;

        let detector = Arc::clone(&self.detector);
        let check_start = Instant::now();
        let checked = guarded(
            &cancel,
            self.config.detector_timeout,
            detector.inspect(&output.candidate),
        )
        .await;
        let check_elapsed = check_start.elapsed();

        let (summary, verdict, check_cost, error) = match checked {
            CallOutcome::Cancelled => {
                self.metrics.record_call(Phase::Check, check_elapsed, 0);
                (
                    None,
                    Verdict::rejected(VerdictReason::Cancelled),
                    0,
                    Some(WorkflowError::Cancelled.to_string()),
                )
            }
            CallOutcome::Finished(Ok(inspection)) => {
                self.metrics
                    .record_call(Phase::Check, check_elapsed, inspection.cost_units);
                let summary = self
                    .feedback
                    .aggregate(inspection.findings)
                    .with_scores(inspection.scores);
                let verdict = gate::evaluate(&summary, self.config.warning_threshold);
                (Some(summary), verdict, inspection.cost_units, None)
            }
            CallOutcome::Finished(Err(e)) => {
                self.metrics.record_call(Phase::Check, check_elapsed, 0);
                self.failed_check(attempt_index, e)
            }
            CallOutcome::TimedOut => {
                self.metrics.record_call(Phase::Check, check_elapsed, 0);
                let e = WorkflowError::Detector {
                    message: format!(
                        "no findings within {}s",
                        self.config.detector_timeout.as_secs_f64()
                    ),
                    timed_out: true,
                };
                self.failed_check(attempt_index, e)
            }
        };

        self.transition(WorkflowState::Deciding)?;

        Ok(Some(AttemptRecord {
            attempt_index,
            candidate: Some(output.candidate),
            summary,
            verdict,
            duration: attempt_start.elapsed(),
            cost_units: output.cost_units + check_cost,
            error,
            started_at,
        }))
    }

    fn failed_generation(
        &mut self,
        attempt_index: usize,
        error: WorkflowError,
        started_at: chrono::DateTime<Utc>,
        attempt_start: Instant,
    ) -> Result<Option<AttemptRecord>, WorkflowError> {
        tracing::warn!(
            attempt = attempt_index,
            timed_out = error.is_timeout(),
            error = %error,
            "Producer failed"
        );
        self.transition(WorkflowState::Deciding)?;
        Ok(Some(AttemptRecord {
            attempt_index,
            candidate: None,
            summary: None,
            verdict: Verdict::rejected(VerdictReason::ProducerFailed),
            duration: attempt_start.elapsed(),
            cost_units: 0,
            error: Some(error.to_string()),
            started_at,
        }))
    }

    fn failed_check(
        &self,
        attempt_index: usize,
        error: WorkflowError,
    ) -> (Option<FindingsSummary>, Verdict, u64, Option<String>) {
        tracing::warn!(
            attempt = attempt_index,
            timed_out = error.is_timeout(),
            error = %error,
            "Detector failed"
        );
        (
            None,
            Verdict::rejected(VerdictReason::DetectorFailed),
            0,
            Some(error.to_string()),
        )
    }

    fn finish(
        mut self,
        task: Task,
        final_reason: VerdictReason,
        accepted_attempt: Option<usize>,
        run_start: Instant,
    ) -> Result<WorkflowResult, WorkflowError> {
        self.transition(WorkflowState::Finished)?;

        let outcome = match final_reason {
            VerdictReason::Approved => Outcome::Success,
            VerdictReason::RetriesExhausted if any_candidate_produced(&self.history) => {
                Outcome::Partial
            }
            _ => Outcome::Failure,
        };

        let best_attempt = select_best(&self.history);
        let best_candidate = best_attempt
            .and_then(|idx| self.history.get(idx))
            .and_then(|r| r.candidate.clone());
        let metrics = self.metrics.summary();

        self.emit(ProgressEvent::Complete {
            outcome,
            attempts: self.history.len(),
            total_cost: metrics.total_cost,
            total_duration: run_start.elapsed(),
        });
        tracing::info!(
            outcome = %outcome,
            reason = %final_reason,
            attempts = self.history.len(),
            best_attempt = ?best_attempt,
            "Run finished"
        );

        Ok(WorkflowResult {
            task,
            outcome,
            final_reason,
            best_candidate,
            best_attempt,
            accepted_attempt,
            attempt_history: self.history,
            metrics,
            max_retries: self.config.max_retries,
            warning_threshold: self.config.warning_threshold,
        })
    }
}

/// Index of the best candidate: fewest total issues, earliest on ties.
/// Candidates whose check failed rank after every checked candidate.
pub fn select_best(history: &[AttemptRecord]) -> Option<usize> {
    history
        .iter()
        .filter(|r| r.candidate.is_some())
        .min_by_key(|r| match r.total_issues() {
            Some(n) => (0u8, n),
            None => (1u8, 0),
        })
        .map(|r| r.attempt_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Inspection;
    use crate::provider::ProducerOutput;
    use async_trait::async_trait;

    fn candidate(name: &str) -> CandidateArtifact {
        CandidateArtifact {
            function_name: name.into(),
            code: String::new(),
            explanation: String::new(),
            dependencies: vec![],
            test_code: String::new(),
            usage_examples: vec![],
        }
    }

    fn record(idx: usize, cand: Option<&str>, issues: Option<(usize, usize)>) -> AttemptRecord {
        AttemptRecord {
            attempt_index: idx,
            candidate: cand.map(candidate),
            summary: issues.map(|(c, w)| FindingsSummary {
                critical_count: c,
                warning_count: w,
                ..Default::default()
            }),
            verdict: Verdict::rejected(VerdictReason::CriticalIssues),
            duration: Duration::ZERO,
            cost_units: 0,
            error: None,
            started_at: Utc::now(),
        }
    }

    struct Echo;

    #[async_trait]
    impl CandidateProducer for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        async fn generate(&self, task: &str, _d: Option<&str>) -> Result<ProducerOutput, WorkflowError> {
            Ok(candidate(task).into())
        }
    }

    struct Clean;

    #[async_trait]
    impl IssueDetector for Clean {
        fn name(&self) -> &str {
            "clean"
        }
        async fn inspect(&self, _c: &CandidateArtifact) -> Result<Inspection, WorkflowError> {
            Ok(Inspection::default())
        }
    }

    // ─── select_best ────────────────────────────────────────────

    #[test]
    fn test_select_best_fewest_issues() {
        let history = vec![
            record(0, Some("a"), Some((2, 1))),
            record(1, Some("b"), Some((0, 2))),
            record(2, Some("c"), Some((1, 3))),
        ];
        assert_eq!(select_best(&history), Some(1));
    }

    #[test]
    fn test_select_best_ties_keep_earliest() {
        let history = vec![
            record(0, Some("a"), Some((1, 1))),
            record(1, Some("b"), Some((0, 2))),
        ];
        assert_eq!(select_best(&history), Some(0));
    }

    #[test]
    fn test_select_best_ignores_missing_candidates() {
        let history = vec![record(0, None, None), record(1, Some("b"), Some((3, 0)))];
        assert_eq!(select_best(&history), Some(1));
    }

    #[test]
    fn test_select_best_unchecked_ranks_last() {
        let history = vec![
            record(0, Some("a"), None),
            record(1, Some("b"), Some((4, 9))),
            record(2, Some("c"), None),
        ];
        assert_eq!(select_best(&history), Some(1));
        assert_eq!(select_best(&history[..1]), Some(0));
    }

    #[test]
    fn test_select_best_empty() {
        assert_eq!(select_best(&[]), None);
        assert_eq!(select_best(&[record(0, None, None)]), None);
    }

    // ─── construction and state ─────────────────────────────────

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = WorkflowConfig {
            max_retries: MAX_RETRIES_CEILING + 1,
            ..Default::default()
        };
        let res = RetryOrchestrator::new(config, Arc::new(Echo), Arc::new(Clean));
        assert!(matches!(res, Err(WorkflowError::Config(_))));
    }

    #[test]
    fn test_new_starts_in_init() {
        let orch =
            RetryOrchestrator::new(WorkflowConfig::default(), Arc::new(Echo), Arc::new(Clean))
                .unwrap();
        assert_eq!(orch.state(), WorkflowState::Init);
    }

    #[test]
    fn test_transition_guard() {
        let mut orch =
            RetryOrchestrator::new(WorkflowConfig::default(), Arc::new(Echo), Arc::new(Clean))
                .unwrap();
        assert!(matches!(
            orch.transition(WorkflowState::Deciding),
            Err(WorkflowError::InvalidTransition { .. })
        ));
        orch.transition(WorkflowState::Finished).unwrap();
        assert!(matches!(
            orch.transition(WorkflowState::Finished),
            Err(WorkflowError::InvalidTransition {
                from: WorkflowState::Finished,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_clean_first_attempt_succeeds() {
        let orch =
            RetryOrchestrator::new(WorkflowConfig::default(), Arc::new(Echo), Arc::new(Clean))
                .unwrap();
        let result = orch.run(Task::new("square")).await.unwrap();
        assert_eq!(result.outcome, Outcome::Success);
        assert_eq!(result.attempts(), 1);
        assert_eq!(result.accepted_attempt, Some(0));
        assert_eq!(
            result.delivered_candidate().map(|c| c.function_name.as_str()),
            Some("square")
        );
        assert_eq!(result.metrics.total_attempts, 1);
        assert_eq!(result.metrics.by_phase[&Phase::Generate].calls, 1);
        assert_eq!(result.metrics.by_phase[&Phase::Check].calls, 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let orch =
            RetryOrchestrator::new(WorkflowConfig::default(), Arc::new(Echo), Arc::new(Clean))
                .unwrap()
                .with_cancellation(token);
        let result = orch.run(Task::new("square")).await.unwrap();
        assert_eq!(result.outcome, Outcome::Failure);
        assert_eq!(result.final_reason, VerdictReason::Cancelled);
        assert!(result.attempt_history.is_empty());
        assert_eq!(result.metrics.mean_duration, Duration::ZERO);
    }
}
