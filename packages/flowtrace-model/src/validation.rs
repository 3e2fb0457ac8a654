use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Issue severity. A trace is valid iff it has zero `Critical` issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Issue category reported by the validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    /// A hop the trace should contain but does not (step-order gap or
    /// a missing architectural layer).
    MissingLink,
    /// A declared dependency not satisfied by any earlier step.
    BrokenDependency,
    /// A step extracted with confidence below the acceptance floor.
    LowConfidence,
    /// A technology transition outside the known allow-list, or a
    /// trace matching no known architectural pattern.
    TechnologyGap,
    /// Missing or implausible step metadata, an empty trace, or a
    /// validation rule that itself failed.
    IncompleteTrace,
    /// Components depending on each other in a cycle.
    CircularReference,
    /// Two steps carrying the same (technology, component, file) key.
    DuplicateStep,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::MissingLink => "missing_link",
            IssueType::BrokenDependency => "broken_dependency",
            IssueType::LowConfidence => "low_confidence",
            IssueType::TechnologyGap => "technology_gap",
            IssueType::IncompleteTrace => "incomplete_trace",
            IssueType::CircularReference => "circular_reference",
            IssueType::DuplicateStep => "duplicate_step",
        }
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single actionable finding produced by a validation rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub issue_type: IssueType,
    pub severity: Severity,
    pub description: String,
    /// Step orders of the affected steps, when the issue is local.
    pub affected_steps: Vec<usize>,
    pub suggested_fix: Option<String>,
    /// Contribution to the overall confidence score, usually <= 0.
    pub confidence_impact: f64,
}

impl ValidationIssue {
    pub fn new(
        issue_type: IssueType,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            issue_type,
            severity,
            description: description.into(),
            affected_steps: Vec::new(),
            suggested_fix: None,
            confidence_impact: 0.0,
        }
    }

    pub fn affecting(mut self, affected_steps: Vec<usize>) -> Self {
        self.affected_steps = affected_steps;
        self
    }

    pub fn with_fix(mut self, suggested_fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(suggested_fix.into());
        self
    }

    pub fn with_impact(mut self, confidence_impact: f64) -> Self {
        self.confidence_impact = confidence_impact;
        self
    }
}

/// Outcome of validating one business rule trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowValidationResult {
    /// True iff no `Critical` issue was found.
    pub is_valid: bool,
    /// Extraction confidence adjusted by issue impacts, in [0, 1].
    pub overall_confidence: f64,
    /// How complete the trace metadata is, in [0, 1].
    pub completeness_score: f64,
    pub issues: Vec<ValidationIssue>,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl FlowValidationResult {
    /// Issues at the given severity.
    pub fn issues_with_severity(&self, severity: Severity) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == severity)
            .collect()
    }

    /// Issues of the given type.
    pub fn issues_of_type(&self, issue_type: IssueType) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.issue_type == issue_type)
            .collect()
    }
}
