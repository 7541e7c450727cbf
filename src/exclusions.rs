/// Exclusion evaluation
///
/// Compares per-subject QC metrics against the task's registered
/// threshold rules and emits one record per failed criterion. Missing
/// metric policy: a configured metric absent (or NaN) in a subject's QC
/// rows is itself exclusion-worthy and is reported with a NaN
/// metric_value rather than silently skipped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ExclusionRecord, QcRow};

/// Which side of the threshold fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Fail when metric_value > threshold (e.g. proportion_blank).
    GreaterThan,
    /// Fail when metric_value < threshold (e.g. accuracy).
    LessThan,
}

/// One threshold rule for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub metric: String,
    pub threshold: f64,
    pub direction: Direction,
}

impl Criterion {
    fn fails(&self, value: f64) -> bool {
        match self.direction {
            Direction::GreaterThan => value > self.threshold,
            Direction::LessThan => value < self.threshold,
        }
    }
}

/// Task-to-criteria registry, built once from configuration and
/// read-only afterwards. Criteria keep their configured order.
#[derive(Debug, Clone, Default)]
pub struct CriteriaRegistry {
    rules: BTreeMap<String, Vec<Criterion>>,
}

impl CriteriaRegistry {
    pub fn new(rules: BTreeMap<String, Vec<Criterion>>) -> Self {
        Self { rules }
    }

    pub fn criteria_for(&self, task_name: &str) -> &[Criterion] {
        self.rules.get(task_name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Evaluate one task's QC rows against the registry, appending failing
/// (subject, task, metric) records to the accumulator.
///
/// Subjects passing every criterion contribute no rows. Appended rows
/// are ordered by subject then metric, so evaluating tasks in a fixed
/// order yields a byte-identical table run to run.
pub fn evaluate(
    task_name: &str,
    qc_rows: &[QcRow],
    registry: &CriteriaRegistry,
    exclusions: &mut Vec<ExclusionRecord>,
) {
    let criteria = registry.criteria_for(task_name);
    if criteria.is_empty() {
        return;
    }

    // (subject -> metric -> value) for this task's rows
    let mut by_subject: BTreeMap<&str, BTreeMap<&str, f64>> = BTreeMap::new();
    for row in qc_rows.iter().filter(|r| r.task_name == task_name) {
        by_subject
            .entry(row.subject_id.as_str())
            .or_default()
            .insert(row.metric.as_str(), row.metric_value);
    }

    for (subject_id, metrics) in &by_subject {
        let mut failed: Vec<ExclusionRecord> = Vec::new();
        for criterion in criteria {
            match metrics.get(criterion.metric.as_str()) {
                Some(value) if !value.is_nan() => {
                    if criterion.fails(*value) {
                        failed.push(ExclusionRecord {
                            subject_id: subject_id.to_string(),
                            task_name: task_name.to_string(),
                            metric: criterion.metric.clone(),
                            metric_value: *value,
                            threshold: criterion.threshold,
                        });
                    }
                }
                // Missing or NaN metric: automatic exclusion.
                _ => failed.push(ExclusionRecord {
                    subject_id: subject_id.to_string(),
                    task_name: task_name.to_string(),
                    metric: criterion.metric.clone(),
                    metric_value: f64::NAN,
                    threshold: criterion.threshold,
                }),
            }
        }
        failed.sort_by(|a, b| a.metric.cmp(&b.metric));
        exclusions.extend(failed);
    }
}
