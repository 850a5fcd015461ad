// src/core/metrics.rs — Attempt latency and cost accounting

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// External call sites whose latency and cost are tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Generate,
    Check,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Generate => write!(f, "generate"),
            Phase::Check => write!(f, "check"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseStats {
    pub calls: u64,
    pub total_duration: Duration,
    pub total_cost: u64,
    pub mean_duration: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_attempts: usize,
    pub total_duration: Duration,
    pub total_cost: u64,
    pub mean_duration: Duration,
    #[serde(default)]
    pub by_phase: BTreeMap<Phase, PhaseStats>,
}

impl MetricsSummary {
    pub fn total_calls(&self) -> u64 {
        self.by_phase.values().map(|p| p.calls).sum()
    }

    /// Cost per attempt; zero when nothing ran.
    pub fn cost_per_attempt(&self) -> f64 {
        if self.total_attempts == 0 {
            return 0.0;
        }
        self.total_cost as f64 / self.total_attempts as f64
    }
}

/// Append-only accumulator owned by one orchestrator run.
///
/// Nothing recorded here is ever revised.
#[derive(Debug, Default)]
pub struct MetricsTracker {
    attempts: Vec<(Duration, u64)>,
    by_phase: BTreeMap<Phase, (u64, Duration, u64)>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(&mut self, duration: Duration, cost_units: u64) {
        self.attempts.push((duration, cost_units));
    }

    /// Record one external call (producer or detector), timed-out calls included.
    pub fn record_call(&mut self, phase: Phase, duration: Duration, cost_units: u64) {
        let entry = self
            .by_phase
            .entry(phase)
            .or_insert((0, Duration::ZERO, 0));
        entry.0 += 1;
        entry.1 += duration;
        entry.2 += cost_units;
    }

    pub fn total_attempts(&self) -> usize {
        self.attempts.len()
    }

    pub fn total_cost(&self) -> u64 {
        self.attempts.iter().map(|(_, c)| c).sum()
    }

    pub fn summary(&self) -> MetricsSummary {
        let total_attempts = self.attempts.len();
        let total_duration: Duration = self.attempts.iter().map(|(d, _)| *d).sum();
        let total_cost = self.total_cost();

        let by_phase = self
            .by_phase
            .iter()
            .map(|(phase, (calls, duration, cost))| {
                (
                    *phase,
                    PhaseStats {
                        calls: *calls,
                        total_duration: *duration,
                        total_cost: *cost,
                        mean_duration: mean(*duration, *calls as usize),
                    },
                )
            })
            .collect();

        MetricsSummary {
            total_attempts,
            total_duration,
            total_cost,
            mean_duration: mean(total_duration, total_attempts),
            by_phase,
        }
    }
}

fn mean(total: Duration, count: usize) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    total / count as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_before_any_attempt() {
        let t = MetricsTracker::new();
        let s = t.summary();
        assert_eq!(s.total_attempts, 0);
        assert_eq!(s.total_duration, Duration::ZERO);
        assert_eq!(s.mean_duration, Duration::ZERO);
        assert_eq!(s.total_cost, 0);
        assert_eq!(s.cost_per_attempt(), 0.0);
        assert!(s.by_phase.is_empty());
    }

    #[test]
    fn test_record_attempts_accumulate() {
        let mut t = MetricsTracker::new();
        t.record_attempt(Duration::from_millis(100), 40);
        t.record_attempt(Duration::from_millis(300), 60);
        let s = t.summary();
        assert_eq!(s.total_attempts, 2);
        assert_eq!(s.total_duration, Duration::from_millis(400));
        assert_eq!(s.mean_duration, Duration::from_millis(200));
        assert_eq!(s.total_cost, 100);
        assert!((s.cost_per_attempt() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_earlier_records_unchanged_by_later_ones() {
        let mut t = MetricsTracker::new();
        t.record_attempt(Duration::from_millis(10), 5);
        let first = t.summary();
        t.record_attempt(Duration::from_millis(20), 7);
        let second = t.summary();
        assert_eq!(first.total_cost, 5);
        assert_eq!(second.total_cost, 12);
        assert!(second.total_duration >= first.total_duration);
    }

    #[test]
    fn test_phase_breakdown() {
        let mut t = MetricsTracker::new();
        t.record_call(Phase::Generate, Duration::from_millis(900), 1200);
        t.record_call(Phase::Generate, Duration::from_millis(1100), 1500);
        t.record_call(Phase::Check, Duration::from_millis(20), 0);
        let s = t.summary();
        let gen = &s.by_phase[&Phase::Generate];
        assert_eq!(gen.calls, 2);
        assert_eq!(gen.total_cost, 2700);
        assert_eq!(gen.mean_duration, Duration::from_millis(1000));
        assert_eq!(s.by_phase[&Phase::Check].calls, 1);
        assert_eq!(s.total_calls(), 3);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Generate.to_string(), "generate");
        assert_eq!(Phase::Check.to_string(), "check");
    }
}
