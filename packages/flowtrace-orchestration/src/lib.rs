/*
 * Flowtrace Orchestration - Parser Scheduling & Execution
 *
 * Coordinates technology-specific parser plugins over a legacy
 * codebase:
 * - Parser Registry (descriptors: patterns, dependencies, budgets)
 * - File Discovery (pattern-based repository scan)
 * - Execution Planner (dependency-aware phase computation)
 * - Phase Executor (concurrent per-file execution with timeouts)
 *
 * A failing parser never aborts the analysis; only discovery-level
 * I/O failures are fatal.
 */

// Public modules
pub mod discovery;
pub mod error;
pub mod executor;
pub mod parser;
pub mod planner;
pub mod registry;

// Re-exports
pub use discovery::{discover_files, match_files, FileMap};
pub use error::{OrchestratorError, Result};
pub use executor::{
    AnalysisResults, ExecutionStatistics, OrchestratorConfig, ParserOrchestrator, PhaseRecord,
};
pub use parser::{Parser, ParserResult, CONFIDENCE_KEY, DEFAULT_CONFIDENCE};
pub use planner::{build_plan, ExecutionPlan};
pub use registry::{ParserDescriptor, ParserRegistry, ParserType, Priority};
