// src/cli/progress.rs — Terminal progress renderer for real-time run feedback

use crate::core::types::ProgressEvent;

/// Format one progress event as a single terminal line.
pub fn format_event(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::AttemptStart {
            attempt,
            max_attempts,
        } => format!("[attempt {}/{}] generating...", attempt, max_attempts),
        ProgressEvent::AttemptEnd {
            attempt,
            verdict,
            critical,
            warnings,
            elapsed,
        } => format!(
            "[attempt {}] {:<26} critical={} warnings={} ({:.1}s)",
            attempt,
            verdict.reason.to_string(),
            critical,
            warnings,
            elapsed.as_secs_f64(),
        ),
        ProgressEvent::Complete {
            outcome,
            attempts,
            total_cost,
            total_duration,
        } => format!(
            "[done] outcome={} attempts={} cost={} time={:.1}s",
            outcome,
            attempts,
            total_cost,
            total_duration.as_secs_f64(),
        ),
    }
}

/// Build a progress callback that writes formatted output to stderr.
///
/// All progress output goes to stderr so stdout remains clean for results.
/// Returns a closure suitable for `RetryOrchestrator::with_progress()`.
pub fn terminal_progress() -> impl Fn(ProgressEvent) + Send + Sync + 'static {
    move |event| eprintln!("{}", format_event(&event))
}

/// Same as `terminal_progress`, with every line prefixed by a task label.
pub fn labelled_progress(label: String) -> impl Fn(ProgressEvent) + Send + Sync + 'static {
    move |event| eprintln!("[{}] {}", label, format_event(&event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Outcome, Verdict, VerdictReason};
    use std::time::Duration;

    #[test]
    fn test_attempt_start_format() {
        let line = format_event(&ProgressEvent::AttemptStart {
            attempt: 2,
            max_attempts: 6,
        });
        assert_eq!(line, "[attempt 2/6] generating...");
    }

    #[test]
    fn test_attempt_end_format() {
        let line = format_event(&ProgressEvent::AttemptEnd {
            attempt: 1,
            verdict: Verdict::rejected(VerdictReason::CriticalIssues),
            critical: 2,
            warnings: 3,
            elapsed: Duration::from_millis(2500),
        });
        assert!(line.starts_with("[attempt 1] critical_issues"));
        assert!(line.ends_with("critical=2 warnings=3 (2.5s)"));
    }

    #[test]
    fn test_complete_format() {
        let line = format_event(&ProgressEvent::Complete {
            outcome: Outcome::Partial,
            attempts: 6,
            total_cost: 4200,
            total_duration: Duration::from_secs(12),
        });
        assert_eq!(line, "[done] outcome=partial attempts=6 cost=4200 time=12.0s");
    }
}
