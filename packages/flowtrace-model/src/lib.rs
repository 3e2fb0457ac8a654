/*
 * Flowtrace Model - Shared Data Model
 *
 * Types shared between the parser orchestration and flow validation
 * subsystems:
 * - Business rule traces (ordered flow steps through architectural layers)
 * - Validation issues, severities, and validation results
 *
 * Both subsystems consume these types; neither owns them.
 */

// Public modules
pub mod trace;
pub mod validation;

// Re-exports
pub use trace::{BusinessRuleTrace, FlowStep};
pub use validation::{FlowValidationResult, IssueType, Severity, ValidationIssue};
