use crate::error::ValidationError;
use crate::patterns;
use crate::rules::{self, RuleFn};
use chrono::Utc;
use flowtrace_model::{
    BusinessRuleTrace, FlowValidationResult, IssueType, Severity, ValidationIssue,
};
use serde::Serialize;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error, info};

// Completeness deductions (per step).
const MISSING_FILE_PATH_PENALTY: f64 = 0.1;
const MISSING_LOGIC_PENALTY: f64 = 0.05;
const NO_DEPENDENCIES_PENALTY: f64 = 0.02;

// Completeness deductions (per issue).
const MISSING_LINK_PENALTY: f64 = 0.2;
const INCOMPLETE_TRACE_PENALTY: f64 = 0.15;
const TECHNOLOGY_GAP_PENALTY: f64 = 0.1;

/// Step count at which the confidence multiplier stops rewarding
/// longer traces.
const FULL_WEIGHT_STEPS: f64 = 5.0;

/// Confidence floor below which manual review is recommended.
const REVIEW_THRESHOLD: f64 = 0.7;

/// Aggregate statistics over a set of validation results.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationStatistics {
    pub total_flows: usize,
    pub valid_flows: usize,
    pub invalid_flows: usize,
    pub avg_confidence: f64,
    pub avg_completeness: f64,
    /// Top-5 most frequent issue types, most frequent first.
    pub top_issue_types: Vec<(IssueType, usize)>,
}

/// Validates business rule traces against the rule battery and the
/// architectural-pattern catalogue. Pure: validation reads an
/// immutable trace snapshot and holds no mutable state.
#[derive(Debug, Default)]
pub struct FlowValidator;

impl FlowValidator {
    pub fn new() -> Self {
        Self
    }

    /// Run every rule plus the pattern check over one trace and score
    /// the outcome.
    pub fn validate_flow(&self, trace: &BusinessRuleTrace) -> FlowValidationResult {
        debug!(
            "Validating trace {} ({} steps)",
            trace.trace_id,
            trace.flow_steps.len()
        );

        let mut issues = self.run_rules(trace, rules::all_rules());
        issues.extend(patterns::check_pattern(trace));

        let completeness_score = completeness_score(trace, &issues);
        let overall_confidence = overall_confidence(trace, &issues);
        let is_valid = !issues.iter().any(|i| i.severity == Severity::Critical);
        let recommendations = recommendations(trace, &issues, overall_confidence);

        info!(
            "Trace {}: valid={}, confidence={:.2}, completeness={:.2}, {} issues",
            trace.trace_id,
            is_valid,
            overall_confidence,
            completeness_score,
            issues.len()
        );

        FlowValidationResult {
            is_valid,
            overall_confidence,
            completeness_score,
            issues,
            recommendations,
            timestamp: Utc::now(),
        }
    }

    /// Validate a batch. A panic while validating one trace is
    /// converted into a single critical issue for that trace and never
    /// aborts the rest of the batch.
    pub fn validate_multiple_flows(
        &self,
        traces: &[BusinessRuleTrace],
    ) -> HashMap<String, FlowValidationResult> {
        let mut results = HashMap::with_capacity(traces.len());

        for trace in traces {
            let outcome = catch_unwind(AssertUnwindSafe(|| self.validate_flow(trace)));
            let result = match outcome {
                Ok(result) => result,
                Err(panic) => {
                    let message = panic_message(panic);
                    let err = ValidationError::BatchFailure {
                        trace_id: trace.trace_id.clone(),
                        message,
                    };
                    error!("{err}");

                    FlowValidationResult {
                        is_valid: false,
                        overall_confidence: 0.0,
                        completeness_score: 0.0,
                        issues: vec![ValidationIssue::new(
                            IssueType::IncompleteTrace,
                            Severity::Critical,
                            err.to_string(),
                        )
                        .with_impact(-1.0)],
                        recommendations: vec![
                            "Validation aborted for this trace; inspect the trace data".to_string(),
                        ],
                        timestamp: Utc::now(),
                    }
                }
            };
            results.insert(trace.trace_id.clone(), result);
        }

        results
    }

    /// Counts, averages, and the most frequent issue types across a
    /// result set.
    pub fn validation_statistics(
        &self,
        results: &HashMap<String, FlowValidationResult>,
    ) -> ValidationStatistics {
        if results.is_empty() {
            return ValidationStatistics::default();
        }

        let total_flows = results.len();
        let valid_flows = results.values().filter(|r| r.is_valid).count();

        let mut counts: HashMap<IssueType, usize> = HashMap::new();
        for result in results.values() {
            for issue in &result.issues {
                *counts.entry(issue.issue_type).or_insert(0) += 1;
            }
        }
        let mut top_issue_types: Vec<(IssueType, usize)> = counts.into_iter().collect();
        top_issue_types.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.as_str().cmp(b.0.as_str())));
        top_issue_types.truncate(5);

        ValidationStatistics {
            total_flows,
            valid_flows,
            invalid_flows: total_flows - valid_flows,
            avg_confidence: results.values().map(|r| r.overall_confidence).sum::<f64>()
                / total_flows as f64,
            avg_completeness: results.values().map(|r| r.completeness_score).sum::<f64>()
                / total_flows as f64,
            top_issue_types,
        }
    }

    /// Dispatch the named rules, converting a failing rule into a HIGH
    /// incomplete-trace issue naming it, so one broken rule never
    /// suppresses the rest of the battery.
    fn run_rules(
        &self,
        trace: &BusinessRuleTrace,
        rule_table: &[(&'static str, RuleFn)],
    ) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for (name, rule) in rule_table {
            match rule(trace) {
                Ok(found) => issues.extend(found),
                Err(e) => {
                    error!("Rule '{name}' failed on trace {}: {e}", trace.trace_id);
                    issues.push(
                        ValidationIssue::new(
                            IssueType::IncompleteTrace,
                            Severity::High,
                            format!("validation rule '{name}' failed: {e}"),
                        )
                        .with_impact(-0.1),
                    );
                }
            }
        }
        issues
    }
}

fn completeness_score(trace: &BusinessRuleTrace, issues: &[ValidationIssue]) -> f64 {
    let mut score = 1.0;

    for step in &trace.flow_steps {
        if step.file_path.trim().is_empty() {
            score -= MISSING_FILE_PATH_PENALTY;
        }
        if step.business_logic.trim().is_empty() {
            score -= MISSING_LOGIC_PENALTY;
        }
        if step.dependencies.is_empty() {
            score -= NO_DEPENDENCIES_PENALTY;
        }
    }

    for issue in issues {
        score -= match issue.issue_type {
            IssueType::MissingLink => MISSING_LINK_PENALTY,
            IssueType::IncompleteTrace => INCOMPLETE_TRACE_PENALTY,
            IssueType::TechnologyGap => TECHNOLOGY_GAP_PENALTY,
            _ => 0.0,
        };
    }

    score.clamp(0.0, 1.0)
}

fn overall_confidence(trace: &BusinessRuleTrace, issues: &[ValidationIssue]) -> f64 {
    let mut confidence = trace.extraction_confidence;
    confidence += issues.iter().map(|i| i.confidence_impact).sum::<f64>();

    // Longer traces carry more corroborating evidence.
    let step_factor =
        0.8 + 0.2 * (trace.flow_steps.len() as f64 / FULL_WEIGHT_STEPS).min(1.0);
    (confidence * step_factor).clamp(0.0, 1.0)
}

fn recommendations(
    trace: &BusinessRuleTrace,
    issues: &[ValidationIssue],
    overall_confidence: f64,
) -> Vec<String> {
    let mut recs = Vec::new();

    if issues.iter().any(|i| i.severity == Severity::Critical) {
        recs.push("Resolve critical issues before using this trace for modernization planning".to_string());
    }
    if issues.iter().any(|i| i.severity == Severity::High) {
        recs.push("Review high severity issues; key flow links may be missing".to_string());
    }
    if !trace.flow_steps.is_empty() && trace.flow_steps.len() < 3 {
        recs.push("Trace has fewer than 3 steps; re-run extraction to capture intermediate layers".to_string());
    }
    if overall_confidence < REVIEW_THRESHOLD {
        recs.push(format!(
            "Overall confidence {overall_confidence:.2} is below {REVIEW_THRESHOLD}; manual review recommended"
        ));
    }
    if !trace
        .flow_steps
        .iter()
        .any(|s| s.technology.to_lowercase().contains("database"))
    {
        recs.push("No database layer found; verify the flow reaches persistence".to_string());
    }

    if recs.is_empty() {
        recs.push("Trace validated cleanly; no action required".to_string());
    }
    recs
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use flowtrace_model::FlowStep;

    fn step(order: usize, technology: &str, component: &str, file: &str) -> FlowStep {
        FlowStep::new(order, "step", technology, component, file)
            .with_business_logic("carries out part of the business flow")
            .with_confidence(0.8)
    }

    /// 4 contiguous, fully described steps matching web_mvc.
    fn clean_web_mvc_trace() -> BusinessRuleTrace {
        BusinessRuleTrace::new("login", "auth", "/login.do").with_steps(vec![
            step(1, "JSP", "login.jsp", "web/login.jsp")
                .with_dependencies(vec!["HttpRequest".to_string()]),
            step(2, "Struts Action", "LoginAction", "src/LoginAction.java")
                .with_dependencies(vec!["login.jsp".to_string()]),
            step(3, "Java", "AuthService", "src/AuthService.java")
                .with_dependencies(vec!["LoginAction".to_string()]),
            step(4, "Database", "USERS", "db/users.sql")
                .with_dependencies(vec!["AuthService".to_string()]),
        ])
    }

    #[test]
    fn test_clean_trace_is_fully_complete_and_valid() {
        let validator = FlowValidator::new();
        let result = validator.validate_flow(&clean_web_mvc_trace());

        assert!(result.is_valid);
        assert!((result.completeness_score - 1.0).abs() < f64::EPSILON);
        assert!(result.issues_of_type(IssueType::MissingLink).is_empty());
    }

    #[test]
    fn test_empty_trace_is_invalid_with_one_critical() {
        let validator = FlowValidator::new();
        let trace = BusinessRuleTrace::new("empty", "none", "/");
        let result = validator.validate_flow(&trace);

        assert!(!result.is_valid);
        let critical = result.issues_with_severity(Severity::Critical);
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].issue_type, IssueType::IncompleteTrace);
        assert!((critical[0].confidence_impact + 1.0).abs() < f64::EPSILON);
        assert_eq!(result.overall_confidence, 0.0);
    }

    #[test]
    fn test_missing_database_yields_one_high_missing_link() {
        let validator = FlowValidator::new();
        let trace = BusinessRuleTrace::new("login", "auth", "/login.do").with_steps(vec![
            step(1, "JSP", "login.jsp", "web/login.jsp"),
            step(2, "Struts Action", "LoginAction", "src/LoginAction.java")
                .with_dependencies(vec!["login.jsp".to_string()]),
            step(3, "Java", "AuthService", "src/AuthService.java")
                .with_dependencies(vec!["LoginAction".to_string()]),
        ]);
        let result = validator.validate_flow(&trace);

        let missing = result.issues_of_type(IssueType::MissingLink);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].severity, Severity::High);
        assert!(missing[0].description.contains("Database"));
    }

    #[test]
    fn test_confidence_rewards_longer_traces() {
        let short = BusinessRuleTrace::new("r", "d", "/")
            .with_steps(vec![step(1, "JSP", "a.jsp", "a.jsp")
                .with_dependencies(vec!["x".to_string()])]);
        let issues: Vec<ValidationIssue> = vec![];

        let short_confidence = overall_confidence(&short, &issues);
        let long_confidence = overall_confidence(&clean_web_mvc_trace(), &issues);

        // Same base, but 1 step scales by 0.84 and 4 steps by 0.96.
        assert!((short_confidence - 0.84).abs() < 1e-9);
        assert!((long_confidence - 0.96).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let mut trace = clean_web_mvc_trace();
        trace.extraction_confidence = 2.0;
        assert_eq!(overall_confidence(&trace, &[]), 1.0);

        let heavy_issue = vec![ValidationIssue::new(
            IssueType::LowConfidence,
            Severity::Critical,
            "x",
        )
        .with_impact(-5.0)];
        assert_eq!(overall_confidence(&trace, &heavy_issue), 0.0);
    }

    #[test]
    fn test_completeness_deductions_for_missing_metadata() {
        let trace = BusinessRuleTrace::new("r", "d", "/").with_steps(vec![
            // No file path, no business logic, no dependencies.
            FlowStep::new(1, "step", "Java", "A", "").with_confidence(0.8),
        ]);
        // Per-step deductions plus the issues the rules raise for the
        // same defects.
        let validator = FlowValidator::new();
        let result = validator.validate_flow(&trace);

        assert!(result.completeness_score < 1.0 - 0.1 - 0.05 - 0.02 + 1e-9);
    }

    #[test]
    fn test_failing_rule_becomes_high_incomplete_trace() {
        fn exploding_rule(_: &BusinessRuleTrace) -> Result<Vec<ValidationIssue>> {
            Err(ValidationError::rule("lookup table corrupted"))
        }

        let validator = FlowValidator::new();
        let issues = validator.run_rules(
            &clean_web_mvc_trace(),
            &[("exploding_rule", exploding_rule as RuleFn)],
        );

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::High);
        assert_eq!(issues[0].issue_type, IssueType::IncompleteTrace);
        assert!(issues[0].description.contains("exploding_rule"));
    }

    #[test]
    fn test_batch_validates_every_trace() {
        let validator = FlowValidator::new();
        let traces = vec![
            clean_web_mvc_trace(),
            BusinessRuleTrace::new("empty", "none", "/"),
        ];
        let results = validator.validate_multiple_flows(&traces);

        assert_eq!(results.len(), 2);
        assert!(results[&traces[0].trace_id].is_valid);
        assert!(!results[&traces[1].trace_id].is_valid);
    }

    #[test]
    fn test_statistics_over_batch() {
        let validator = FlowValidator::new();
        let traces = vec![
            clean_web_mvc_trace(),
            BusinessRuleTrace::new("empty-1", "none", "/"),
            BusinessRuleTrace::new("empty-2", "none", "/"),
        ];
        let results = validator.validate_multiple_flows(&traces);
        let stats = validator.validation_statistics(&results);

        assert_eq!(stats.total_flows, 3);
        assert_eq!(stats.valid_flows, 1);
        assert_eq!(stats.invalid_flows, 2);
        assert!(stats.avg_confidence > 0.0);
        assert!(!stats.top_issue_types.is_empty());
        // Both empty traces raise incomplete-trace issues, making it
        // the most frequent type.
        assert_eq!(stats.top_issue_types[0].0, IssueType::IncompleteTrace);
    }

    #[test]
    fn test_statistics_empty_result_set() {
        let validator = FlowValidator::new();
        let stats = validator.validation_statistics(&HashMap::new());
        assert_eq!(stats.total_flows, 0);
        assert!(stats.top_issue_types.is_empty());
    }

    #[test]
    fn test_recommendations_for_short_low_confidence_trace() {
        let validator = FlowValidator::new();
        let trace = BusinessRuleTrace::new("r", "d", "/")
            .with_extraction_confidence(0.5)
            .with_steps(vec![
                step(1, "JSP", "a.jsp", "a.jsp"),
                step(2, "Java", "B", "B.java").with_dependencies(vec!["a.jsp".to_string()]),
            ]);
        let result = validator.validate_flow(&trace);

        assert!(result
            .recommendations
            .iter()
            .any(|r| r.contains("fewer than 3 steps")));
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.contains("manual review")));
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.contains("database")));
    }

    #[test]
    fn test_clean_trace_gets_clean_recommendation() {
        let validator = FlowValidator::new();
        let result = validator.validate_flow(&clean_web_mvc_trace());
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.contains("no action required")));
    }
}
