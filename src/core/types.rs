// src/core/types.rs — Core domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::metrics::MetricsSummary;
use crate::infra::errors::WorkflowError;

/// Hard ceiling on `max_retries`; anything larger is a configuration mistake.
pub const MAX_RETRIES_CEILING: u32 = 100;

/// Immutable task description, one per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,
}

impl Task {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            description: description.into(),
        }
    }
}

/// One generated unit: a function plus its tests and documentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateArtifact {
    pub function_name: String,
    pub code: String,
    pub explanation: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub test_code: String,
    #[serde(default)]
    pub usage_examples: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Syntax,
    Security,
    Style,
    Documentation,
    Testing,
    Advisory,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::Syntax => "syntax",
            Category::Security => "security",
            Category::Style => "style",
            Category::Documentation => "documentation",
            Category::Testing => "testing",
            Category::Advisory => "advisory",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}

/// A single detected issue. Produced fresh per check pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Finding {
    pub category: Category,
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    pub fn new(category: Category, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            category,
            severity,
            message: message.into(),
        }
    }

    pub fn critical(category: Category, message: impl Into<String>) -> Self {
        Self::new(category, Severity::Critical, message)
    }

    pub fn warning(category: Category, message: impl Into<String>) -> Self {
        Self::new(category, Severity::Warning, message)
    }

    pub fn info(category: Category, message: impl Into<String>) -> Self {
        Self::new(category, Severity::Info, message)
    }
}

/// Aggregate over one check pass. Built by `FeedbackAggregator::aggregate`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindingsSummary {
    pub critical_count: usize,
    pub warning_count: usize,
    pub findings: Vec<Finding>,
    /// Informational model-derived scores (e.g. "quality" -> 7.0). Never gate input.
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
}

impl FindingsSummary {
    pub fn total_issues(&self) -> usize {
        self.critical_count + self.warning_count
    }

    pub fn info_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Info)
            .count()
    }

    pub fn with_scores(mut self, scores: BTreeMap<String, f64>) -> Self {
        self.scores = scores;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictReason {
    Approved,
    CriticalIssues,
    WarningThresholdExceeded,
    RetriesExhausted,
    ProducerFailed,
    DetectorFailed,
    Cancelled,
}

impl std::fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VerdictReason::Approved => "approved",
            VerdictReason::CriticalIssues => "critical_issues",
            VerdictReason::WarningThresholdExceeded => "warning_threshold_exceeded",
            VerdictReason::RetriesExhausted => "retries_exhausted",
            VerdictReason::ProducerFailed => "producer_failed",
            VerdictReason::DetectorFailed => "detector_failed",
            VerdictReason::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub accepted: bool,
    pub reason: VerdictReason,
}

impl Verdict {
    pub fn approved() -> Self {
        Self {
            accepted: true,
            reason: VerdictReason::Approved,
        }
    }

    pub fn rejected(reason: VerdictReason) -> Self {
        Self {
            accepted: false,
            reason,
        }
    }
}

/// One generate -> check -> decide cycle. Appended, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt_index: usize,
    pub candidate: Option<CandidateArtifact>,
    pub summary: Option<FindingsSummary>,
    pub verdict: Verdict,
    pub duration: Duration,
    pub cost_units: u64,
    /// Collaborator error text when the producer or detector failed.
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn total_issues(&self) -> Option<usize> {
        self.summary.as_ref().map(|s| s.total_issues())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Partial,
    Failure,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::Partial => write!(f, "partial"),
            Outcome::Failure => write!(f, "failure"),
        }
    }
}

/// Terminal state of a run, handed to report exporters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub task: Task,
    pub outcome: Outcome,
    /// `approved`, `retries_exhausted` or `cancelled`.
    pub final_reason: VerdictReason,
    /// Fewest total issues among produced candidates; earliest wins ties.
    pub best_candidate: Option<CandidateArtifact>,
    pub best_attempt: Option<usize>,
    pub accepted_attempt: Option<usize>,
    pub attempt_history: Vec<AttemptRecord>,
    pub metrics: MetricsSummary,
    pub max_retries: u32,
    pub warning_threshold: u32,
}

impl WorkflowResult {
    pub fn attempts(&self) -> usize {
        self.attempt_history.len()
    }

    /// The candidate a caller should ship: the accepted one on success,
    /// otherwise the best one seen.
    pub fn delivered_candidate(&self) -> Option<&CandidateArtifact> {
        self.accepted_attempt
            .and_then(|idx| self.attempt_history.get(idx))
            .and_then(|r| r.candidate.as_ref())
            .or(self.best_candidate.as_ref())
    }

    pub fn was_cancelled(&self) -> bool {
        self.final_reason == VerdictReason::Cancelled
    }

    pub fn any_candidate_produced(&self) -> bool {
        any_candidate_produced(&self.attempt_history)
    }
}

/// Whether any attempt got as far as producing a candidate. Separates
/// "never produced a usable candidate" from "never passed the gate".
pub fn any_candidate_produced(history: &[AttemptRecord]) -> bool {
    history.iter().any(|r| r.candidate.is_some())
}

/// Configuration for the retry loop.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub max_retries: u32,
    pub warning_threshold: u32,
    pub producer_timeout: Duration,
    pub detector_timeout: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            warning_threshold: 5,
            producer_timeout: Duration::from_secs(120),
            detector_timeout: Duration::from_secs(30),
        }
    }
}

impl WorkflowConfig {
    pub fn max_attempts(&self) -> usize {
        self.max_retries as usize + 1
    }

    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.max_retries > MAX_RETRIES_CEILING {
            return Err(WorkflowError::Config(format!(
                "max_retries must be <= {}, got {}",
                MAX_RETRIES_CEILING, self.max_retries
            )));
        }
        if self.producer_timeout.is_zero() {
            return Err(WorkflowError::Config(
                "producer timeout must be greater than zero".into(),
            ));
        }
        if self.detector_timeout.is_zero() {
            return Err(WorkflowError::Config(
                "detector timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl From<&crate::infra::config::WorkflowSection> for WorkflowConfig {
    fn from(cfg: &crate::infra::config::WorkflowSection) -> Self {
        Self {
            max_retries: cfg.max_retries,
            warning_threshold: cfg.warning_threshold,
            producer_timeout: Duration::from_secs(cfg.producer_timeout_secs),
            detector_timeout: Duration::from_secs(cfg.detector_timeout_secs),
        }
    }
}

/// Real-time lifecycle events for progress display.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    AttemptStart {
        attempt: usize,
        max_attempts: usize,
    },
    AttemptEnd {
        attempt: usize,
        verdict: Verdict,
        critical: usize,
        warnings: usize,
        elapsed: Duration,
    },
    Complete {
        outcome: Outcome,
        attempts: usize,
        total_cost: u64,
        total_duration: Duration,
    },
}
