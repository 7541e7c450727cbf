// Out-of-Scanner Behavioral QC
// Batch run over one data directory: tail-cutoff QC per session file,
// stop-signal violation scan, exclusion evaluation against the
// configured threshold registry.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use behavior_qc::config::{is_stop_signal_task, Config};
use behavior_qc::discovery::{discover_units, SessionFile};
use behavior_qc::types::{ExclusionRecord, QcRow, ViolationRecord};
use behavior_qc::{aggregate, exclusions, parser, report, tail_cutoff, violations};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    init_logging();

    info!("🚀 Out-of-Scanner Behavioral QC Starting...");

    let config = Config::load_or_default()?;
    info!("⚙️  Configuration loaded");

    let taxonomy = config.tasks.all();
    let registry = config.criteria_registry();

    let units = discover_units(&config.paths.data_dir, &taxonomy)
        .context("Session-file discovery failed")?;
    info!("📋 Discovered {} session files in {:?}", units.len(), config.paths.data_dir);

    // Map phase: each (subject, task) unit is processed independently; a
    // failure is logged and skipped, never fatal to the batch.
    let mut qc_rows_by_task: BTreeMap<String, Vec<QcRow>> = BTreeMap::new();
    let mut all_violations: Vec<ViolationRecord> = Vec::new();
    let mut processed = 0usize;
    let mut failed = 0usize;

    for unit in &units {
        match process_unit(unit, &config) {
            Ok(output) => {
                qc_rows_by_task
                    .entry(unit.task_name.clone())
                    .or_default()
                    .extend(output.qc_rows);
                all_violations.extend(output.violations);
                processed += 1;
            }
            Err(e) => {
                warn!(
                    "⚠️  Skipping {} {}: {:#}",
                    unit.subject_id, unit.task_name, e
                );
                failed += 1;
            }
        }
    }

    // Reduce phase: per-task tables, violation aggregates, exclusions.
    for task_name in &taxonomy {
        let rows = qc_rows_by_task
            .get(task_name)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        report::write_qc_table(&config.paths.qc_dir, task_name, rows)?;
    }

    report::write_violations(&config.paths.violations_dir, &all_violations)?;
    let aggregated = aggregate::aggregate(&all_violations);
    report::write_aggregated_violations(&config.paths.violations_dir, &aggregated)?;
    let matrices = aggregate::matrices(&aggregated);
    report::write_matrices(&config.paths.violations_dir, &matrices)?;

    let mut exclusion_records: Vec<ExclusionRecord> = Vec::new();
    for task_name in &taxonomy {
        let rows = qc_rows_by_task
            .get(task_name)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        exclusions::evaluate(task_name, rows, &registry, &mut exclusion_records);
    }
    // Documented report order: subject, then task, then metric.
    exclusion_records.sort_by(|a, b| {
        (&a.subject_id, &a.task_name, &a.metric).cmp(&(&b.subject_id, &b.task_name, &b.metric))
    });
    report::write_exclusions(&config.paths.exclusions_dir, &exclusion_records)?;

    info!(
        "✅ QC complete: {} units processed, {} failed, {} violations, {} exclusion rows",
        processed,
        failed,
        all_violations.len(),
        exclusion_records.len()
    );

    Ok(())
}

struct UnitOutput {
    qc_rows: Vec<QcRow>,
    violations: Vec<ViolationRecord>,
}

/// Process one (subject, task) session file: load, trim, summarize, and
/// for stop-signal tasks scan for violations.
fn process_unit(unit: &SessionFile, config: &Config) -> Result<UnitOutput> {
    let sequence = parser::load_trial_sequence(&unit.path)?;
    let outcome = tail_cutoff::detect(&sequence, config.qc.last_n_test_trials);

    if let Some(position) = outcome.cutoff_position {
        info!(
            "✂️  {} {}: trimmed to {} rows (proportion_blank: {:.3})",
            unit.subject_id, unit.task_name, position, outcome.proportion_blank
        );
    }

    let qc_rows = tail_cutoff::summarize_run(&unit.subject_id, &unit.task_name, &outcome);

    // The violation scan is independent of the trim and runs over the
    // raw sequence.
    let violations = if is_stop_signal_task(&unit.task_name) {
        violations::detect(&unit.subject_id, &sequence, &unit.task_name)
    } else {
        Vec::new()
    };

    Ok(UnitOutput { qc_rows, violations })
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();
}
