/*
 * Flowtrace Validation - Business Rule Trace Validation
 *
 * Scores reconstructed business rule traces for plausibility:
 * - Rule battery (sequence, dependencies, confidence, transitions,
 *   metadata sanity, cycles, duplicates)
 * - Architectural-pattern matcher against a fixed catalogue
 * - Completeness/confidence scoring and recommendations
 *
 * Validation is a pure function of its input: a failing rule becomes
 * an issue, a panicking trace becomes a critical issue, and a batch
 * always returns one result per trace.
 */

// Public modules
pub mod engine;
pub mod error;
pub mod patterns;
pub mod rules;

// Re-exports
pub use engine::{FlowValidator, ValidationStatistics};
pub use error::{Result, ValidationError};
pub use patterns::{best_match, ArchitecturalPattern, MATCH_THRESHOLD, PATTERN_CATALOGUE};
pub use rules::all_rules;

// Model types callers usually need alongside the validator.
pub use flowtrace_model::{
    BusinessRuleTrace, FlowStep, FlowValidationResult, IssueType, Severity, ValidationIssue,
};
