// src/core/gate.rs — Accept/reject decision after each check pass

use super::types::{FindingsSummary, Verdict, VerdictReason};

/// Quality gate. Total and deterministic: no I/O, no hidden state.
///
/// Rules in priority order:
/// 1. any critical finding rejects with `critical_issues`
/// 2. more warnings than `warning_threshold` rejects with `warning_threshold_exceeded`
/// 3. anything else is approved (an empty summary included)
pub fn evaluate(summary: &FindingsSummary, warning_threshold: u32) -> Verdict {
    if summary.critical_count > 0 {
        return Verdict::rejected(VerdictReason::CriticalIssues);
    }
    if summary.warning_count > warning_threshold as usize {
        return Verdict::rejected(VerdictReason::WarningThresholdExceeded);
    }
    Verdict::approved()
}

/// One-line human explanation of a verdict, for logs and progress output.
pub fn explain(verdict: &Verdict, summary: Option<&FindingsSummary>, warning_threshold: u32) -> String {
    match (verdict.reason, summary) {
        (VerdictReason::Approved, Some(s)) => format!(
            "approved with {} warning(s) (threshold {})",
            s.warning_count, warning_threshold
        ),
        (VerdictReason::CriticalIssues, Some(s)) => {
            format!("rejected: {} critical issue(s)", s.critical_count)
        }
        (VerdictReason::WarningThresholdExceeded, Some(s)) => format!(
            "rejected: {} warnings exceed threshold of {}",
            s.warning_count, warning_threshold
        ),
        (reason, _) => format!("rejected: {}", reason),
    }
}
