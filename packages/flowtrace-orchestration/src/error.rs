use crate::registry::ParserType;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// File-system walk failure. The only error fatal to a whole
    /// repository analysis; everything else degrades to a failed
    /// per-pair result.
    #[error("discovery failed: {0}")]
    Discovery(String),

    #[error("parser {parser} timed out after {timeout_secs}s")]
    ParserTimeout {
        parser: ParserType,
        timeout_secs: u64,
    },

    #[error("parser {parser} failed: {message}")]
    ParserExecution { parser: ParserType, message: String },

    #[error("unknown parser type: {0}")]
    UnknownParserType(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OrchestratorError {
    pub fn discovery<E: std::fmt::Display>(e: E) -> Self {
        Self::Discovery(e.to_string())
    }

    pub fn execution<E: std::fmt::Display>(parser: ParserType, e: E) -> Self {
        Self::ParserExecution {
            parser,
            message: e.to_string(),
        }
    }
}
