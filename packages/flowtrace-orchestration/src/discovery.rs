use crate::error::{OrchestratorError, Result};
use crate::registry::{ParserRegistry, ParserType};
use glob::Pattern;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Mapping from parser type to the files it should process. Types
/// with no matching files are absent.
pub type FileMap = HashMap<ParserType, Vec<PathBuf>>;

/// Walk a repository root and map each registered parser type to its
/// matching files. Pure scan: no file contents are read. Walk errors
/// are fatal to the whole analysis.
pub fn discover_files(registry: &ParserRegistry, root: &Path) -> Result<FileMap> {
    if !root.is_dir() {
        return Err(OrchestratorError::Discovery(format!(
            "repository root not found: {}",
            root.display()
        )));
    }

    let mut files = Vec::new();
    // Depth 0 is the root itself; only descendants can be hidden.
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));

    for entry in walker {
        let entry = entry.map_err(OrchestratorError::discovery)?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();

    let map = match_files(registry, &files);
    info!(
        "Discovered {} files under {} ({} parser types have work)",
        files.len(),
        root.display(),
        map.len()
    );
    Ok(map)
}

/// Map an explicit file list to parser types by pattern. Backs the
/// targeted `analyze_files` entry point; unmatched files are simply
/// absent from every list.
pub fn match_files(registry: &ParserRegistry, files: &[PathBuf]) -> FileMap {
    let mut map: FileMap = HashMap::new();

    for descriptor in registry.descriptors() {
        let mut matched: Vec<PathBuf> = files
            .iter()
            .filter(|f| matches_any(&descriptor.file_patterns, f))
            .cloned()
            .collect();

        if !matched.is_empty() {
            matched.sort();
            debug!(
                "{}: {} matching files",
                descriptor.parser_type,
                matched.len()
            );
            map.insert(descriptor.parser_type, matched);
        }
    }

    map
}

fn matches_any(patterns: &[String], file: &Path) -> bool {
    let file_name = match file.file_name() {
        Some(name) => name.to_string_lossy(),
        None => return false,
    };

    patterns.iter().any(|pattern| {
        if is_glob(pattern) {
            Pattern::new(pattern)
                .map(|p| p.matches(&file_name))
                .unwrap_or(false)
        } else {
            // Config-style patterns (struts.xml, web.xml) match the
            // exact basename.
            file_name == pattern.as_str()
        }
    })
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}
