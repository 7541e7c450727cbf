/// Violation aggregation
///
/// Groups flat violation records by (subject, task, ssd) and pivots the
/// grouped means into one SSD × subject matrix per task for downstream
/// reporting. Grouping is BTreeMap-based so output order is
/// deterministic: subject, then task, then ascending SSD.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::types::{AggregatedViolation, ViolationRecord};

/// f64 grouping key ordered by total_cmp. SSDs never reach here as NaN
/// (NaN SSDs are dropped before grouping).
#[derive(Debug, Clone, Copy, PartialEq)]
struct SsdKey(f64);

impl Eq for SsdKey {}

impl PartialOrd for SsdKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SsdKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Mean RT difference per (subject, task, ssd) group.
///
/// Records without an SSD value are excluded from grouping; they remain
/// visible in the flat violations table.
pub fn aggregate(records: &[ViolationRecord]) -> Vec<AggregatedViolation> {
    let mut groups: BTreeMap<(String, String, SsdKey), (f64, u64)> = BTreeMap::new();

    for record in records {
        let ssd = match record.ssd {
            Some(ssd) if !ssd.is_nan() => ssd,
            _ => continue,
        };
        let key = (record.subject_id.clone(), record.task_name.clone(), SsdKey(ssd));
        let entry = groups.entry(key).or_insert((0.0, 0));
        entry.0 += record.difference;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|((subject_id, task_name, ssd), (sum, n))| AggregatedViolation {
            subject_id,
            task_name,
            ssd: ssd.0,
            mean_difference: sum / n as f64,
            num_violations: n,
        })
        .collect()
}

/// Dense SSD × subject grid of mean differences for one task. Absent
/// combinations are explicit no-data cells, never zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ViolationMatrix {
    /// Row labels, ascending.
    pub ssds: Vec<f64>,
    /// Column labels, sorted.
    pub subjects: Vec<String>,
    /// cells[row][col] = mean difference, or None for no data.
    pub cells: Vec<Vec<Option<f64>>>,
}

/// Pivot aggregated violations into one matrix per task.
pub fn matrices(aggregated: &[AggregatedViolation]) -> BTreeMap<String, ViolationMatrix> {
    let mut by_task: BTreeMap<String, Vec<&AggregatedViolation>> = BTreeMap::new();
    for row in aggregated {
        by_task.entry(row.task_name.clone()).or_default().push(row);
    }

    by_task
        .into_iter()
        .map(|(task, rows)| {
            let mut ssds: Vec<SsdKey> = Vec::new();
            let mut subjects: Vec<String> = Vec::new();
            for row in &rows {
                if !ssds.contains(&SsdKey(row.ssd)) {
                    ssds.push(SsdKey(row.ssd));
                }
                if !subjects.contains(&row.subject_id) {
                    subjects.push(row.subject_id.clone());
                }
            }
            ssds.sort();
            subjects.sort();

            let cells = ssds
                .iter()
                .map(|ssd| {
                    subjects
                        .iter()
                        .map(|subject| {
                            rows.iter()
                                .find(|r| SsdKey(r.ssd) == *ssd && r.subject_id == *subject)
                                .map(|r| r.mean_difference)
                        })
                        .collect()
                })
                .collect();

            let matrix = ViolationMatrix {
                ssds: ssds.into_iter().map(|k| k.0).collect(),
                subjects,
                cells,
            };
            (task, matrix)
        })
        .collect()
}
