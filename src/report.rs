/// Output-table writers
///
/// Persists the row-oriented result tables as CSV: per-task QC tables,
/// the flat and aggregated violation tables, one SSD × subject matrix
/// per task, and the exclusion report. Writers create their output
/// directory and overwrite any previous run's tables.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::aggregate::ViolationMatrix;
use crate::types::{AggregatedViolation, ExclusionRecord, QcRow, ViolationRecord};

// The header is written explicitly so an empty table still carries one;
// the exclusion step reads every per-task QC table back.
fn write_rows<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {:?}", parent))?;
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;
    writer
        .write_record(header)
        .with_context(|| format!("Failed to write header to {:?}", path))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write row to {:?}", path))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {:?}", path))?;
    Ok(())
}

/// Write one task's QC summary table ({task}_qc.csv).
pub fn write_qc_table(qc_dir: &Path, task_name: &str, rows: &[QcRow]) -> Result<PathBuf> {
    let path = qc_dir.join(format!("{}_qc.csv", task_name));
    write_rows(&path, &["subject_id", "task_name", "metric", "metric_value"], rows)?;
    info!("📝 Wrote {} QC rows to {:?}", rows.len(), path);
    Ok(path)
}

/// Write the flat violations table (violations_data.csv).
pub fn write_violations(violations_dir: &Path, records: &[ViolationRecord]) -> Result<PathBuf> {
    let path = violations_dir.join("violations_data.csv");
    write_rows(&path, &["subject_id", "task_name", "ssd", "difference"], records)?;
    info!("📝 Wrote {} violations to {:?}", records.len(), path);
    Ok(path)
}

/// Write the grouped violations table (aggregated_violations_data.csv).
pub fn write_aggregated_violations(
    violations_dir: &Path,
    rows: &[AggregatedViolation],
) -> Result<PathBuf> {
    let path = violations_dir.join("aggregated_violations_data.csv");
    write_rows(
        &path,
        &["subject_id", "task_name", "ssd", "mean_difference", "num_violations"],
        rows,
    )?;
    info!("📝 Wrote {} aggregated violation groups to {:?}", rows.len(), path);
    Ok(path)
}

/// Write one SSD × subject matrix per task
/// ({task}_violations_matrix.csv). First column is the SSD; one column
/// per subject; a combination without data stays an empty cell.
pub fn write_matrices(
    violations_dir: &Path,
    matrices: &BTreeMap<String, ViolationMatrix>,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(violations_dir)
        .with_context(|| format!("Failed to create output directory {:?}", violations_dir))?;

    let mut paths = Vec::new();
    for (task_name, matrix) in matrices {
        let path = violations_dir.join(format!("{}_violations_matrix.csv", task_name));
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create {:?}", path))?;

        let mut header = vec!["ssd".to_string()];
        header.extend(matrix.subjects.iter().cloned());
        writer
            .write_record(&header)
            .with_context(|| format!("Failed to write header to {:?}", path))?;

        for (row_idx, ssd) in matrix.ssds.iter().enumerate() {
            let mut row = vec![ssd.to_string()];
            for cell in &matrix.cells[row_idx] {
                row.push(cell.map(|v| v.to_string()).unwrap_or_default());
            }
            writer
                .write_record(&row)
                .with_context(|| format!("Failed to write row to {:?}", path))?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to flush {:?}", path))?;
        info!(
            "📝 Wrote {}x{} violations matrix to {:?}",
            matrix.ssds.len(),
            matrix.subjects.len(),
            path
        );
        paths.push(path);
    }
    Ok(paths)
}

/// Write the exclusion report (exclusion_data.csv).
pub fn write_exclusions(exclusions_dir: &Path, records: &[ExclusionRecord]) -> Result<PathBuf> {
    let path = exclusions_dir.join("exclusion_data.csv");
    write_rows(
        &path,
        &["subject_id", "task_name", "metric", "metric_value", "threshold"],
        records,
    )?;
    info!("📝 Wrote {} exclusion rows to {:?}", records.len(), path);
    Ok(path)
}
