/// Session-file discovery
///
/// Walks the out-of-scanner data directory: one folder per subject
/// (names start with "s"), one CSV per task run inside. The task name is
/// recovered from the filename by longest match against the configured
/// taxonomy, so "stop_signal_with_flanker" wins over "stop_signal".

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

/// One discovered (subject, task) session log.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionFile {
    pub subject_id: String,
    pub task_name: String,
    pub path: PathBuf,
}

/// Older loggers wrote this task under a differently-underscored name.
const GO_NOGO_ALIAS: &str = "stop_signal_with_go_no_go";
const GO_NOGO_CANONICAL: &str = "stop_signal_with_go_nogo";

/// Infer the task name from a session filename. Longest taxonomy match
/// wins; None when no known task name appears.
pub fn infer_task_name(filename: &str, taxonomy: &[String]) -> Option<String> {
    if filename.contains(GO_NOGO_ALIAS) {
        return Some(GO_NOGO_CANONICAL.to_string());
    }
    taxonomy
        .iter()
        .filter(|task| filename.contains(task.as_str()))
        .max_by_key(|task| task.len())
        .cloned()
}

/// Scan the data directory for subject session files, in deterministic
/// (sorted subject, sorted filename) order. Files that match no known
/// task are skipped with a warning.
pub fn discover_units(root: &Path, taxonomy: &[String]) -> Result<Vec<SessionFile>> {
    let mut subject_dirs: Vec<(String, PathBuf)> = Vec::new();
    let entries = std::fs::read_dir(root)
        .with_context(|| format!("Failed to read data directory {:?}", root))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read entry in {:?}", root))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.path().is_dir() && name.starts_with('s') {
            subject_dirs.push((name, entry.path()));
        }
    }
    subject_dirs.sort();

    let mut units = Vec::new();
    for (subject_id, dir) in subject_dirs {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
            .with_context(|| format!("Failed to read subject directory {:?}", dir))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map_or(false, |ext| ext == "csv"))
            .collect();
        files.sort();

        for path in files {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            match infer_task_name(&filename, taxonomy) {
                Some(task_name) => units.push(SessionFile {
                    subject_id: subject_id.clone(),
                    task_name,
                    path,
                }),
                None => warn!("Skipping {} for {}: unknown task", filename, subject_id),
            }
        }
    }
    Ok(units)
}
