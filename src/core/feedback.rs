// src/core/feedback.rs — Findings aggregation and retry directive rendering
//
// Findings come in already structured from the detector, so the directive is
// built from typed data rather than by re-parsing rendered check output.

use std::collections::HashSet;
use std::fmt::Write;

use super::types::{Category, Finding, FindingsSummary, Severity};
use crate::infra::config::FeedbackSection;

/// Groups raw findings into a summary and renders retry directives.
///
/// Both operations are pure: the same input always yields the same output.
/// The attempt number printed in a directive header is supplied by the caller.
#[derive(Debug, Clone)]
pub struct FeedbackAggregator {
    /// Cap on listed warnings. `None` lists all of them.
    max_warnings: Option<usize>,
    include_info: bool,
    warning_threshold: u32,
}

impl FeedbackAggregator {
    pub fn new(warning_threshold: u32) -> Self {
        Self {
            max_warnings: None,
            include_info: true,
            warning_threshold,
        }
    }

    pub fn from_config(section: &FeedbackSection, warning_threshold: u32) -> Self {
        Self {
            max_warnings: section.max_warnings,
            include_info: section.include_info,
            warning_threshold,
        }
    }

    pub fn with_max_warnings(mut self, cap: Option<usize>) -> Self {
        self.max_warnings = cap;
        self
    }

    pub fn with_info(mut self, include: bool) -> Self {
        self.include_info = include;
        self
    }

    /// Group findings by category (categories ordered by first appearance,
    /// first-seen order kept within each), dropping exact duplicates.
    pub fn aggregate(&self, findings: impl IntoIterator<Item = Finding>) -> FindingsSummary {
        let mut groups: Vec<(Category, Vec<Finding>)> = Vec::new();
        let mut seen: HashSet<(Category, Severity, String)> = HashSet::new();

        for finding in findings {
            let key = (finding.category, finding.severity, finding.message.clone());
            if !seen.insert(key) {
                continue;
            }
            match groups.iter_mut().find(|(cat, _)| *cat == finding.category) {
                Some((_, group)) => group.push(finding),
                None => groups.push((finding.category, vec![finding])),
            }
        }

        let findings: Vec<Finding> = groups.into_iter().flat_map(|(_, g)| g).collect();
        let critical_count = findings
            .iter()
            .filter(|f| f.severity == Severity::Critical)
            .count();
        let warning_count = findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
            .count();

        FindingsSummary {
            critical_count,
            warning_count,
            findings,
            scores: Default::default(),
        }
    }

    /// Render the numbered feedback list handed to the next generation attempt.
    ///
    /// Order: every critical finding, then warnings up to the cap, then
    /// advisory items (advisory warnings and, if enabled, info findings).
    pub fn build_retry_directive(&self, summary: &FindingsSummary, attempt: Option<usize>) -> String {
        let mut out = String::new();

        let subject = match attempt {
            Some(n) => format!("Attempt {}", n),
            None => "The previous attempt".to_string(),
        };
        let _ = writeln!(
            out,
            "{} did not pass the quality gate: {} critical issue(s), {} warning(s).",
            subject, summary.critical_count, summary.warning_count
        );

        let critical: Vec<&Finding> = summary
            .findings
            .iter()
            .filter(|f| f.severity == Severity::Critical)
            .collect();
        let warnings: Vec<&Finding> = summary
            .findings
            .iter()
            .filter(|f| f.severity == Severity::Warning && f.category != Category::Advisory)
            .collect();
        let advisory: Vec<&Finding> = summary
            .findings
            .iter()
            .filter(|f| match f.severity {
                Severity::Warning => f.category == Category::Advisory,
                Severity::Info => self.include_info,
                Severity::Critical => false,
            })
            .collect();

        let warning_cap = self
            .max_warnings
            .unwrap_or(warnings.len())
            .min(warnings.len());
        let omitted = warnings.len() - warning_cap;

        if !critical.is_empty() || !warnings.is_empty() || !advisory.is_empty() {
            out.push_str("Address every item below.\n\n");
        }

        let mut n = 0;
        for finding in critical.iter().chain(warnings.iter().take(warning_cap)) {
            n += 1;
            push_item(&mut out, n, finding);
        }
        if omitted > 0 {
            let _ = writeln!(out, "   ... and {} more warning(s) not listed.", omitted);
        }
        for finding in &advisory {
            n += 1;
            push_item(&mut out, n, finding);
        }

        let _ = write!(
            out,
            "\nTarget: zero critical issues and at most {} warning(s).",
            self.warning_threshold
        );
        out
    }
}

fn push_item(out: &mut String, n: usize, finding: &Finding) {
    let _ = writeln!(
        out,
        "{}. [{}] ({}) {}",
        n, finding.severity, finding.category, finding.message
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_findings() -> Vec<Finding> {
        vec![
            Finding::warning(Category::Style, "Missing return type hint"),
            Finding::critical(Category::Security, "eval() function detected"),
            Finding::warning(Category::Documentation, "Missing docstring"),
            Finding::warning(Category::Style, "Wildcard import"),
            Finding::info(Category::Advisory, "Consider memoization"),
            Finding::critical(Category::Testing, "No test code provided"),
        ]
    }

    // ─── aggregate ──────────────────────────────────────────────

    #[test]
    fn test_aggregate_counts() {
        let s = FeedbackAggregator::new(5).aggregate(sample_findings());
        assert_eq!(s.critical_count, 2);
        assert_eq!(s.warning_count, 3);
        assert_eq!(s.info_count(), 1);
        assert_eq!(s.findings.len(), 6);
    }

    #[test]
    fn test_aggregate_groups_by_first_seen_category() {
        let s = FeedbackAggregator::new(5).aggregate(sample_findings());
        let order: Vec<&str> = s.findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "Missing return type hint",
                "Wildcard import",
                "eval() function detected",
                "Missing docstring",
                "Consider memoization",
                "No test code provided",
            ]
        );
    }

    #[test]
    fn test_aggregate_deduplicates_identical_messages() {
        let findings = vec![
            Finding::warning(Category::Style, "Global variables detected"),
            Finding::warning(Category::Style, "Global variables detected"),
            Finding::critical(Category::Security, "exec() detected"),
            Finding::critical(Category::Security, "exec() detected"),
        ];
        let s = FeedbackAggregator::new(5).aggregate(findings);
        assert_eq!(s.warning_count, 1);
        assert_eq!(s.critical_count, 1);
        assert_eq!(s.findings.len(), 2);
    }

    #[test]
    fn test_aggregate_keeps_same_message_across_categories() {
        let findings = vec![
            Finding::warning(Category::Style, "Too long"),
            Finding::warning(Category::Documentation, "Too long"),
        ];
        let s = FeedbackAggregator::new(5).aggregate(findings);
        assert_eq!(s.warning_count, 2);
    }

    #[test]
    fn test_aggregate_empty() {
        let s = FeedbackAggregator::new(5).aggregate(Vec::new());
        assert_eq!(s, FindingsSummary::default());
    }

    // ─── build_retry_directive ──────────────────────────────────

    #[test]
    fn test_directive_orders_critical_first_info_last() {
        let agg = FeedbackAggregator::new(5);
        let s = agg.aggregate(sample_findings());
        let d = agg.build_retry_directive(&s, Some(2));

        let expected = "\
Attempt 2 did not pass the quality gate: 2 critical issue(s), 3 warning(s).
Address every item below.

1. [CRITICAL] (security) eval() function detected
2. [CRITICAL] (testing) No test code provided
3. [WARNING] (style) Missing return type hint
4. [WARNING] (style) Wildcard import
5. [WARNING] (documentation) Missing docstring
6. [INFO] (advisory) Consider memoization

Target: zero critical issues and at most 5 warning(s).";
        assert_eq!(d, expected);
    }

    #[test]
    fn test_directive_warning_cap() {
        let agg = FeedbackAggregator::new(1).with_max_warnings(Some(1));
        let s = agg.aggregate(sample_findings());
        let d = agg.build_retry_directive(&s, None);
        assert!(d.starts_with("The previous attempt did not pass"));
        assert!(d.contains("3. [WARNING] (style) Missing return type hint"));
        assert!(!d.contains("Wildcard import"));
        assert!(d.contains("... and 2 more warning(s) not listed."));
        assert!(d.contains("4. [INFO] (advisory) Consider memoization"));
    }

    #[test]
    fn test_directive_cap_larger_than_warning_count() {
        let agg = FeedbackAggregator::new(5).with_max_warnings(Some(100));
        let s = agg.aggregate(sample_findings());
        let d = agg.build_retry_directive(&s, Some(1));
        assert!(!d.contains("not listed"));
        assert!(d.contains("Missing docstring"));
    }

    #[test]
    fn test_directive_never_drops_critical() {
        let agg = FeedbackAggregator::new(0)
            .with_max_warnings(Some(0))
            .with_info(false);
        let findings: Vec<Finding> = (0..20)
            .map(|i| Finding::critical(Category::Syntax, format!("Unbalanced delimiter #{i}")))
            .chain((0..20).map(|i| Finding::warning(Category::Style, format!("style {i}"))))
            .collect();
        let s = agg.aggregate(findings.clone());
        let d = agg.build_retry_directive(&s, Some(3));
        for f in findings.iter().filter(|f| f.severity == Severity::Critical) {
            assert!(d.contains(&f.message), "missing {}", f.message);
        }
        assert!(!d.contains("style 0"));
    }

    #[test]
    fn test_directive_excludes_info_when_disabled() {
        let agg = FeedbackAggregator::new(5).with_info(false);
        let s = agg.aggregate(sample_findings());
        let d = agg.build_retry_directive(&s, None);
        assert!(!d.contains("Consider memoization"));
    }

    #[test]
    fn test_advisory_warnings_listed_after_regular_warnings() {
        let agg = FeedbackAggregator::new(5);
        let s = agg.aggregate(vec![
            Finding::warning(Category::Advisory, "Respect robots.txt"),
            Finding::warning(Category::Style, "Infinite loop detected"),
        ]);
        let d = agg.build_retry_directive(&s, None);
        let regular = d.find("Infinite loop").unwrap();
        let advisory = d.find("robots.txt").unwrap();
        assert!(regular < advisory);
    }

    #[test]
    fn test_directive_is_pure() {
        let agg = FeedbackAggregator::new(5).with_max_warnings(Some(2));
        let s = agg.aggregate(sample_findings());
        assert_eq!(
            agg.build_retry_directive(&s, Some(4)),
            agg.build_retry_directive(&s, Some(4))
        );
    }

    #[test]
    fn test_directive_for_empty_summary() {
        let agg = FeedbackAggregator::new(3);
        let d = agg.build_retry_directive(&FindingsSummary::default(), Some(1));
        assert_eq!(
            d,
            "Attempt 1 did not pass the quality gate: 0 critical issue(s), 0 warning(s).\n\
             \nTarget: zero critical issues and at most 3 warning(s)."
        );
    }
}
