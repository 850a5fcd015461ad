// src/evaluator/static_analysis.rs — Built-in heuristic detector
//
// Pattern checks over the candidate's text: a delimiter-balance syntax proxy,
// dangerous calls, risky idioms, missing annotations/docs/tests, naming.
// No code is executed.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::{Inspection, IssueDetector};
use crate::core::types::{CandidateArtifact, Category, Finding, Severity};
use crate::infra::config::DetectorSection;
use crate::infra::errors::WorkflowError;

const SECURITY_RISKS: &[(&str, &str)] = &[
    ("eval(", "eval() function detected - major security vulnerability"),
    ("exec(", "exec() function detected - major security vulnerability"),
    ("os.system(", "os.system() detected - use subprocess instead"),
    (
        "subprocess.call(",
        "subprocess.call() without shell=False - potential security risk",
    ),
    ("__import__", "__import__ detected - use proper import statements"),
    ("pickle.load", "pickle.load detected - potential code execution vulnerability"),
    ("input(", "input() without validation detected - potential security risk"),
];

const RISKY_PATTERNS: &[(&str, &str)] = &[
    ("global ", "Global variables detected - consider encapsulation"),
    ("while True:", "Infinite loop detected - ensure proper exit conditions"),
    ("import *", "Wildcard imports detected - use specific imports"),
    ("time.sleep(", "time.sleep() in main logic - consider async alternatives"),
];

const SCRAPING_ADVISORIES: &[(&str, &str)] = &[
    (
        "requests.get(",
        "HTTP requests detected - ensure proper error handling and timeouts",
    ),
    ("BeautifulSoup", "Web scraping detected - ensure robots.txt compliance"),
    ("selenium", "Browser automation detected - ensure proper resource cleanup"),
    (
        "threading",
        "Threading detected - ensure thread safety and proper synchronization",
    ),
];

const COMMON_LIBRARIES: &[&str] = &[
    "requests",
    "pandas",
    "numpy",
    "matplotlib",
    "bs4",
    "selenium",
    "threading",
    "json",
    "csv",
    "os",
    "sys",
];

/// Heuristic detector configured from the `[detector]` section.
pub struct HeuristicDetector {
    config: DetectorSection,
    /// Lower-cased task text, used to enable task-specific advisories.
    task_hint: Option<String>,
}

impl HeuristicDetector {
    pub fn new(config: DetectorSection) -> Self {
        Self {
            config,
            task_hint: None,
        }
    }

    pub fn with_task_hint(mut self, task: &str) -> Self {
        self.task_hint = Some(task.to_lowercase());
        self
    }

    /// Run every enabled check. Pure; exposed for the `check` subcommand and tests.
    pub fn analyze(&self, candidate: &CandidateArtifact) -> Vec<Finding> {
        let mut findings = Vec::new();
        let code = candidate.code.as_str();

        if let Err(detail) = check_delimiters(code) {
            findings.push(Finding::critical(
                Category::Syntax,
                format!("Syntax error - {}", detail),
            ));
        }

        if self.config.check_style {
            self.check_dependencies(candidate, &mut findings);
            check_code_quality(code, &mut findings);
            check_risky_patterns(code, &mut findings);
            check_function_name(&candidate.function_name, &mut findings);
        }

        if self.config.check_security {
            for (pattern, message) in SECURITY_RISKS {
                if code.contains(pattern) {
                    findings.push(Finding::critical(Category::Security, *message));
                }
            }
        }

        if self.is_scraping_task() {
            for (pattern, message) in SCRAPING_ADVISORIES {
                if code.contains(pattern) {
                    findings.push(Finding::warning(Category::Advisory, *message));
                }
            }
        }

        if self.config.check_testing {
            check_tests(&candidate.test_code, &mut findings);
        }

        if self.config.check_documentation {
            self.check_documentation(candidate, &mut findings);
        }

        findings
    }

    fn is_scraping_task(&self) -> bool {
        self.task_hint
            .as_deref()
            .is_some_and(|t| t.contains("scraper") || t.contains("scraping"))
    }

    fn check_dependencies(&self, candidate: &CandidateArtifact, findings: &mut Vec<Finding>) {
        if !candidate.dependencies.is_empty() {
            for dep in &candidate.dependencies {
                let dep = dep.trim();
                if !(dep.starts_with("import ") || dep.starts_with("from ")) {
                    findings.push(Finding::warning(
                        Category::Style,
                        format!("Dependency '{}' should be a proper import statement", dep),
                    ));
                }
            }
            return;
        }

        let missing: Vec<&str> = COMMON_LIBRARIES
            .iter()
            .copied()
            .filter(|lib| uses_library(&candidate.code, lib))
            .collect();
        if !missing.is_empty() {
            findings.push(Finding::warning(
                Category::Style,
                format!(
                    "Code uses libraries but dependencies not declared: {}",
                    missing.join(", ")
                ),
            ));
        }
    }

    fn check_documentation(&self, candidate: &CandidateArtifact, findings: &mut Vec<Finding>) {
        if candidate.explanation.trim().chars().count() < self.config.min_explanation_chars {
            findings.push(Finding::warning(
                Category::Documentation,
                "Explanation is too brief",
            ));
        }

        let examples = candidate
            .usage_examples
            .iter()
            .filter(|e| !e.trim().is_empty())
            .count();
        if examples == 0 {
            findings.push(Finding::warning(
                Category::Documentation,
                "No usage examples provided",
            ));
        } else if examples < self.config.min_usage_examples {
            findings.push(Finding::warning(
                Category::Documentation,
                "Should provide multiple usage examples",
            ));
        }
    }
}

#[async_trait]
impl IssueDetector for HeuristicDetector {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn inspect(&self, candidate: &CandidateArtifact) -> Result<Inspection, WorkflowError> {
        let findings = self.analyze(candidate);
        let mut scores = BTreeMap::new();
        scores.insert("heuristic_quality".to_string(), heuristic_score(&findings));
        Ok(Inspection {
            findings,
            scores,
            cost_units: 0,
        })
    }
}

/// 10 minus 3 per critical and 1 per warning, floored at 0.
fn heuristic_score(findings: &[Finding]) -> f64 {
    let penalty: u32 = findings
        .iter()
        .map(|f| match f.severity {
            Severity::Critical => 3,
            Severity::Warning => 1,
            Severity::Info => 0,
        })
        .sum();
    10.0 - f64::from(penalty.min(10))
}

fn check_code_quality(code: &str, findings: &mut Vec<Finding>) {
    if code.contains("def ") && !code.contains("->") {
        findings.push(Finding::warning(
            Category::Style,
            "Function missing return type hint",
        ));
    }

    if !code.contains("\"\"\"") && !code.contains("'''") {
        findings.push(Finding::warning(Category::Documentation, "Missing docstring"));
    }

    let handles_errors = (code.contains("try:") && code.contains("except")) || code.contains("raise");
    if !handles_errors {
        findings.push(Finding::warning(
            Category::Style,
            "No error handling detected",
        ));
    }

    if code.contains("print(") {
        findings.push(Finding::info(
            Category::Advisory,
            "print() calls detected - consider the logging module",
        ));
    }
}

fn check_risky_patterns(code: &str, findings: &mut Vec<Finding>) {
    for (pattern, message) in RISKY_PATTERNS {
        if code.contains(pattern) {
            findings.push(Finding::warning(Category::Style, *message));
        }
    }

    if code.contains("requests.get(") && !code.contains("timeout") {
        findings.push(Finding::warning(
            Category::Style,
            "requests.get() without timeout - add timeout parameter",
        ));
    }

    if code.matches("open(").count() > code.matches("with open(").count() {
        findings.push(Finding::warning(
            Category::Style,
            "File operations without context manager - use 'with open()'",
        ));
    }
}

fn check_function_name(name: &str, findings: &mut Vec<Finding>) {
    if name.trim().is_empty() {
        findings.push(Finding::warning(Category::Style, "Function name is missing"));
        return;
    }
    if !is_snake_case(name) {
        findings.push(Finding::warning(
            Category::Style,
            "Function name should follow snake_case convention",
        ));
    }
}

fn check_tests(test_code: &str, findings: &mut Vec<Finding>) {
    if test_code.trim().is_empty() {
        findings.push(Finding::critical(Category::Testing, "No test code provided"));
        return;
    }
    if check_delimiters(test_code).is_err() {
        findings.push(Finding::critical(
            Category::Testing,
            "Test code has syntax errors",
        ));
        return;
    }
    if !test_code.contains("def test_") {
        findings.push(Finding::warning(
            Category::Testing,
            "Test functions should start with 'test_'",
        ));
    }
    if !test_code.contains("assert") {
        findings.push(Finding::warning(
            Category::Testing,
            "No test assertions found",
        ));
    }
}

fn is_snake_case(name: &str) -> bool {
    let stripped: String = name.chars().filter(|c| *c != '_').collect();
    !stripped.is_empty()
        && stripped.chars().all(|c| c.is_ascii_alphanumeric())
        && !name.chars().any(|c| c.is_ascii_uppercase())
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

/// `lib` imported or referenced as `lib.` at a word boundary.
fn uses_library(code: &str, lib: &str) -> bool {
    let imported = code.lines().any(|line| {
        let line = line.trim_start();
        line.strip_prefix("import ")
            .or_else(|| line.strip_prefix("from "))
            .is_some_and(|rest| {
                rest.split(|c: char| c == '.' || c == ',' || c.is_whitespace())
                    .next()
                    == Some(lib)
            })
    });
    if imported {
        return true;
    }
    let needle = format!("{}.", lib);
    code.match_indices(&needle).any(|(idx, _)| {
        code[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_' || c == '.'))
    })
}

/// Check that (), [] and {} balance outside string literals and comments.
fn check_delimiters(code: &str) -> Result<(), String> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    let chars: Vec<char> = code.chars().collect();
    let mut line = 1;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => line += 1,
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '"' | '\'' => {
                let triple = i + 2 < chars.len() && chars[i + 1] == c && chars[i + 2] == c;
                let start_line = line;
                i += if triple { 3 } else { 1 };
                loop {
                    if i >= chars.len() {
                        return Err(format!("unterminated string starting on line {}", start_line));
                    }
                    let ch = chars[i];
                    if ch == '\\' {
                        i += 2;
                        continue;
                    }
                    if ch == '\n' {
                        if !triple {
                            return Err(format!("unterminated string on line {}", start_line));
                        }
                        line += 1;
                    }
                    if ch == c {
                        if !triple {
                            i += 1;
                            break;
                        }
                        if i + 2 < chars.len() && chars[i + 1] == c && chars[i + 2] == c {
                            i += 3;
                            break;
                        }
                    }
                    i += 1;
                }
                continue;
            }
            '(' | '[' | '{' => stack.push((c, line)),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((open, open_line)) => {
                        return Err(format!(
                            "'{}' on line {} does not match '{}' opened on line {}",
                            c, line, open, open_line
                        ))
                    }
                    None => return Err(format!("unexpected '{}' on line {}", c, line)),
                }
            }
            _ => {}
        }
        i += 1;
    }

    match stack.pop() {
        Some((open, open_line)) => Err(format!("'{}' opened on line {} is never closed", open, open_line)),
        None => Ok(()),
    }
}
