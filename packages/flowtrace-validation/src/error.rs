use thiserror::Error;

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Failures internal to the validation engine. Neither variant ever
/// reaches a caller as an error: rule failures become HIGH
/// incomplete-trace issues, batch failures become a CRITICAL issue on
/// the affected trace.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("rule execution failed: {0}")]
    RuleFailure(String),

    #[error("validation of trace {trace_id} aborted: {message}")]
    BatchFailure { trace_id: String, message: String },
}

impl ValidationError {
    pub fn rule<E: std::fmt::Display>(e: E) -> Self {
        Self::RuleFailure(e.to_string())
    }
}
