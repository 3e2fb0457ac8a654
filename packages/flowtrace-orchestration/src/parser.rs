use crate::error::Result;
use crate::registry::ParserType;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Key a parser may set in its output to report extraction confidence.
pub const CONFIDENCE_KEY: &str = "confidence_score";

/// Confidence assumed for successful parses that report none.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Parser plugin contract. One implementation per technology; the
/// orchestrator treats every plugin identically through this trait.
#[async_trait]
pub trait Parser: Send + Sync {
    /// Technology this plugin handles.
    fn parser_type(&self) -> ParserType;

    /// Analyze one file and return the extracted findings. The output
    /// map may contain a numeric [`CONFIDENCE_KEY`] field.
    async fn analyze(&self, file_path: &Path) -> Result<Map<String, Value>>;
}

/// Outcome of one (parser, file) execution. Owned by the phase
/// executor until merged into the per-file result map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserResult {
    pub parser_type: ParserType,
    pub file_path: PathBuf,
    pub success: bool,
    pub data: Map<String, Value>,
    pub error_message: Option<String>,
    pub execution_time: Duration,
    pub confidence_score: f64,
}

impl ParserResult {
    /// Successful result. Confidence comes from the data map's
    /// [`CONFIDENCE_KEY`] if present and numeric, else
    /// [`DEFAULT_CONFIDENCE`].
    pub fn success(
        parser_type: ParserType,
        file_path: PathBuf,
        data: Map<String, Value>,
        execution_time: Duration,
    ) -> Self {
        let confidence_score = data
            .get(CONFIDENCE_KEY)
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_CONFIDENCE);

        Self {
            parser_type,
            file_path,
            success: true,
            data,
            error_message: None,
            execution_time,
            confidence_score,
        }
    }

    /// Failed result (execution error, timeout, or panic).
    pub fn failure(
        parser_type: ParserType,
        file_path: PathBuf,
        error_message: impl Into<String>,
        execution_time: Duration,
    ) -> Self {
        Self {
            parser_type,
            file_path,
            success: false,
            data: Map::new(),
            error_message: Some(error_message.into()),
            execution_time,
            confidence_score: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_reads_reported_confidence() {
        let mut data = Map::new();
        data.insert(CONFIDENCE_KEY.to_string(), json!(0.85));

        let result = ParserResult::success(
            ParserType::Jsp,
            PathBuf::from("web/login.jsp"),
            data,
            Duration::from_millis(12),
        );

        assert!(result.success);
        assert!((result.confidence_score - 0.85).abs() < f64::EPSILON);
    }

    #[test]
    fn test_success_defaults_confidence() {
        let result = ParserResult::success(
            ParserType::Java,
            PathBuf::from("src/AuthService.java"),
            Map::new(),
            Duration::from_millis(5),
        );

        assert!((result.confidence_score - DEFAULT_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_non_numeric_confidence_falls_back_to_default() {
        let mut data = Map::new();
        data.insert(CONFIDENCE_KEY.to_string(), json!("high"));

        let result = ParserResult::success(
            ParserType::Sql,
            PathBuf::from("db/schema.sql"),
            data,
            Duration::from_millis(1),
        );

        assert!((result.confidence_score - DEFAULT_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_failure_has_zero_confidence_and_message() {
        let result = ParserResult::failure(
            ParserType::Corba,
            PathBuf::from("idl/orders.idl"),
            "timed out after 45s",
            Duration::from_secs(45),
        );

        assert!(!result.success);
        assert_eq!(result.confidence_score, 0.0);
        assert!(result.error_message.unwrap().contains("timed out"));
    }
}
