use crate::discovery::{self, FileMap};
use crate::error::{OrchestratorError, Result};
use crate::parser::{Parser, ParserResult};
use crate::planner::{self, ExecutionPlan};
use crate::registry::{ParserDescriptor, ParserRegistry, ParserType};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Per-file analysis output: every parser result accumulated for that
/// file across all phases.
pub type AnalysisResults = HashMap<PathBuf, Vec<ParserResult>>;

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Most-recent-N phase records kept for statistics.
    pub history_limit: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { history_limit: 100 }
    }
}

/// One phase execution, recorded in the bounded history.
#[derive(Debug, Clone)]
pub struct PhaseRecord {
    pub phase_index: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_time: Duration,
    pub files_processed: usize,
    pub recorded_at: DateTime<Utc>,
}

/// Aggregate statistics over the recorded history.
#[derive(Debug, Clone, Default)]
pub struct ExecutionStatistics {
    pub total_executions: usize,
    pub avg_success_rate: f64,
    pub avg_execution_time: Duration,
    pub total_files_processed: usize,
}

/// Drives repository analysis: discovery, phase planning, and
/// concurrent per-(parser, file) execution with a barrier between
/// phases. Execution history is owned by the instance, not global
/// state.
pub struct ParserOrchestrator {
    registry: ParserRegistry,
    parsers: HashMap<ParserType, Arc<dyn Parser>>,
    config: OrchestratorConfig,
    history: VecDeque<PhaseRecord>,
}

impl ParserOrchestrator {
    pub fn new(registry: ParserRegistry, config: OrchestratorConfig) -> Self {
        Self {
            registry,
            parsers: HashMap::new(),
            config,
            history: VecDeque::new(),
        }
    }

    /// Register a parser plugin for its declared type.
    pub fn register_parser(&mut self, parser: Arc<dyn Parser>) {
        self.parsers.insert(parser.parser_type(), parser);
    }

    pub fn registry(&self) -> &ParserRegistry {
        &self.registry
    }

    /// Analyze every matching file under `root`. Only discovery
    /// failures are fatal; parser failures are recorded per pair.
    pub async fn analyze_repository(&mut self, root: &Path) -> Result<AnalysisResults> {
        let file_map = discovery::discover_files(&self.registry, root)?;
        self.run(file_map).await
    }

    /// Analyze an explicit file list. Relative paths are resolved
    /// against `root`; files matching no registered pattern are
    /// skipped.
    pub async fn analyze_files(&mut self, root: &Path, files: &[PathBuf]) -> Result<AnalysisResults> {
        let resolved: Vec<PathBuf> = files
            .iter()
            .map(|f| if f.is_absolute() { f.clone() } else { root.join(f) })
            .collect();

        let file_map = discovery::match_files(&self.registry, &resolved);
        self.run(file_map).await
    }

    /// Aggregate statistics over the bounded phase history.
    pub fn statistics(&self) -> ExecutionStatistics {
        let total_executions: usize = self.history.iter().map(|r| r.attempted).sum();
        if total_executions == 0 {
            return ExecutionStatistics::default();
        }

        let succeeded: usize = self.history.iter().map(|r| r.succeeded).sum();
        let total_time: Duration = self.history.iter().map(|r| r.total_time).sum();

        ExecutionStatistics {
            total_executions,
            avg_success_rate: succeeded as f64 / total_executions as f64,
            avg_execution_time: total_time / total_executions as u32,
            total_files_processed: self.history.iter().map(|r| r.files_processed).sum(),
        }
    }

    async fn run(&mut self, file_map: FileMap) -> Result<AnalysisResults> {
        let candidates: HashSet<ParserType> = file_map.keys().copied().collect();
        let plan = planner::build_plan(&self.registry, &candidates);

        if plan.phases.is_empty() {
            info!("No parser has matching files; nothing to execute");
            return Ok(AnalysisResults::new());
        }

        info!("Execution plan:\n{}", plan.describe());
        if plan.forced_phase {
            warn!("Plan contains a forced phase; dependency ordering is not guaranteed for it");
        }

        self.run_phases(&plan, &file_map).await
    }

    /// Execute phases strictly in order; within a phase every
    /// (parser, file) pair runs concurrently and the phase is joined
    /// before the next one starts.
    async fn run_phases(&mut self, plan: &ExecutionPlan, file_map: &FileMap) -> Result<AnalysisResults> {
        let mut merged = AnalysisResults::new();

        for (phase_idx, phase) in plan.phases.iter().enumerate() {
            let phase_start = Instant::now();
            let mut pairs: Vec<(ParserDescriptor, PathBuf)> = Vec::new();
            let mut results: Vec<ParserResult> = Vec::new();

            for descriptor in phase {
                let files = match file_map.get(&descriptor.parser_type) {
                    Some(files) => files,
                    None => continue,
                };

                match self.parsers.get(&descriptor.parser_type) {
                    Some(_) => {
                        for file in files {
                            pairs.push((descriptor.clone(), file.clone()));
                        }
                    }
                    None => {
                        // No plugin registered: record failures instead
                        // of aborting the analysis.
                        warn!(
                            "No parser registered for {}; marking {} files failed",
                            descriptor.parser_type,
                            files.len()
                        );
                        for file in files {
                            results.push(ParserResult::failure(
                                descriptor.parser_type,
                                file.clone(),
                                format!("no parser registered for {}", descriptor.parser_type),
                                Duration::ZERO,
                            ));
                        }
                    }
                }
            }

            info!(
                "Phase {}: {} parser/file pairs",
                phase_idx + 1,
                pairs.len()
            );

            let mut tasks = Vec::with_capacity(pairs.len());
            for (descriptor, file) in &pairs {
                let parser = self.parsers[&descriptor.parser_type].clone();
                let descriptor = descriptor.clone();
                let file = file.clone();
                tasks.push(tokio::spawn(async move {
                    Self::execute_pair(parser, descriptor, file).await
                }));
            }

            // Phase barrier: every pair finishes (success, failure, or
            // timeout) before the next phase starts.
            let joined = futures::future::join_all(tasks).await;
            for (i, task_result) in joined.into_iter().enumerate() {
                match task_result {
                    Ok(result) => results.push(result),
                    Err(join_err) => {
                        let (descriptor, file) = &pairs[i];
                        warn!(
                            "Parser {} panicked on {}: {}",
                            descriptor.parser_type,
                            file.display(),
                            join_err
                        );
                        results.push(ParserResult::failure(
                            descriptor.parser_type,
                            file.clone(),
                            format!("parser panicked: {join_err}"),
                            Duration::ZERO,
                        ));
                    }
                }
            }

            self.record_phase(phase_idx, &results, phase_start.elapsed());

            // Single-writer merge at the phase boundary.
            for result in results {
                merged.entry(result.file_path.clone()).or_default().push(result);
            }
        }

        info!(
            "Analysis complete: {} files, {} phases",
            merged.len(),
            plan.phases.len()
        );
        Ok(merged)
    }

    /// Run one (parser, file) pair under its timeout. Execution errors
    /// consume the descriptor's retry budget; a timeout is recorded
    /// immediately so siblings are never blocked longer than the
    /// declared budget.
    async fn execute_pair(
        parser: Arc<dyn Parser>,
        descriptor: ParserDescriptor,
        file: PathBuf,
    ) -> ParserResult {
        let parser_type = descriptor.parser_type;
        let start = Instant::now();
        let mut attempt = 0u32;

        loop {
            match tokio::time::timeout(descriptor.timeout(), parser.analyze(&file)).await {
                Ok(Ok(data)) => {
                    return ParserResult::success(parser_type, file, data, start.elapsed());
                }
                Ok(Err(e)) => {
                    if attempt < descriptor.max_retries {
                        attempt += 1;
                        debug!(
                            "Parser {} failed on {} (attempt {}/{}): {}",
                            parser_type,
                            file.display(),
                            attempt,
                            descriptor.max_retries,
                            e
                        );
                        continue;
                    }
                    warn!("Parser {} failed on {}: {}", parser_type, file.display(), e);
                    return ParserResult::failure(parser_type, file, e.to_string(), start.elapsed());
                }
                Err(_) => {
                    let err = OrchestratorError::ParserTimeout {
                        parser: parser_type,
                        timeout_secs: descriptor.timeout_secs,
                    };
                    warn!("{} on {}", err, file.display());
                    return ParserResult::failure(parser_type, file, err.to_string(), start.elapsed());
                }
            }
        }
    }

    fn record_phase(&mut self, phase_index: usize, results: &[ParserResult], elapsed: Duration) {
        let succeeded = results.iter().filter(|r| r.success).count();
        let files: HashSet<&PathBuf> = results.iter().map(|r| &r.file_path).collect();

        self.history.push_back(PhaseRecord {
            phase_index,
            attempted: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            total_time: elapsed,
            files_processed: files.len(),
            recorded_at: Utc::now(),
        });

        while self.history.len() > self.config.history_limit {
            self.history.pop_front();
        }
    }
}
