/// Session-log CSV parsing
///
/// Loads one behavioral CSV into a typed TrialSequence. Column names
/// vary across tasks and logger versions, so headers are resolved
/// against known aliases and absent columns degrade to safe defaults
/// (no-response RTs, non-test trial kinds) instead of failing the load.
/// Only real I/O and CSV syntax problems surface as errors, and those
/// are isolated at the per-unit boundary by the caller.

use std::path::{Path, PathBuf};

use csv::StringRecord;
use thiserror::Error;

use crate::types::{Response, StopCondition, TrialRecord, TrialSequence};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Header indices for the columns the pipeline consumes. Every column
/// is optional; aliases cover the logger variants seen in the field.
struct Columns {
    kind: Option<usize>,
    rt: Option<usize>,
    correct: Option<usize>,
    stop_condition: Option<usize>,
    ssd: Option<usize>,
    task_condition: Option<usize>,
    cue_condition: Option<usize>,
    flanker_condition: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Self {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.contains(&h.trim()))
        };
        Self {
            kind: find(&["trial_id"]),
            rt: find(&["rt"]),
            correct: find(&["correct_trial"]),
            stop_condition: find(&["stop_signal_condition", "SS_trial_type"]),
            ssd: find(&["SS_delay", "stop_signal_delay"]),
            task_condition: find(&["task_condition"]),
            cue_condition: find(&["cue_condition"]),
            flanker_condition: find(&["flanker_condition"]),
        }
    }
}

/// Load one session CSV into an ordered trial sequence.
pub fn load_trial_sequence(path: &Path) -> Result<TrialSequence, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|source| ParseError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let headers = reader
        .headers()
        .map_err(|source| ParseError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    let columns = Columns::resolve(&headers);

    let mut sequence = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|source| ParseError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        sequence.push(parse_trial(&row, &columns));
    }
    Ok(sequence)
}

fn parse_trial(row: &StringRecord, columns: &Columns) -> TrialRecord {
    let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).map(str::trim);

    let kind = cell(columns.kind).unwrap_or("").to_string();
    let response = Response::from_raw(cell(columns.rt).and_then(parse_float));
    let correct = cell(columns.correct)
        .and_then(parse_float)
        .map(|v| v != 0.0);
    let stop_condition = cell(columns.stop_condition).and_then(StopCondition::parse);
    let stop_signal_delay = cell(columns.ssd).and_then(parse_float).filter(|v| !v.is_nan());
    let label = |idx: Option<usize>| cell(idx).filter(|s| !s.is_empty()).map(str::to_string);

    TrialRecord {
        kind,
        response,
        correct,
        stop_condition,
        stop_signal_delay,
        task_condition: label(columns.task_condition),
        cue_condition: label(columns.cue_condition),
        flanker_condition: cell(columns.flanker_condition)
            .filter(|s| !s.is_empty())
            .map(|s| normalize_flanker_condition(s).to_string()),
    }
}

/// Flanker logs prefix the condition with the stimulus letter
/// (H_congruent, F_incongruent); grouping only cares about congruency.
pub fn normalize_flanker_condition(label: &str) -> &str {
    label
        .strip_prefix("H_")
        .or_else(|| label.strip_prefix("F_"))
        .unwrap_or(label)
}

fn parse_float(cell: &str) -> Option<f64> {
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return None;
    }
    cell.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_csv(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", contents).unwrap();
        path
    }

    #[test]
    fn test_load_typical_log() {
        let dir = tempdir().unwrap();
        let path = write_csv(
            &dir,
            "s01_flanker.csv",
            "trial_id,rt,correct_trial,flanker_condition\n\
             fixation,,,\n\
             test_trial,0.512,1,H_congruent\n\
             test_trial,-1,0,F_incongruent\n\
             test_trial,nan,0,H_incongruent\n",
        );

        let sequence = load_trial_sequence(&path).unwrap();
        assert_eq!(sequence.len(), 4);

        assert_eq!(sequence[0].kind, "fixation");
        assert_eq!(sequence[0].response, Response::NoResponse);

        assert_eq!(sequence[1].response, Response::Responded(0.512));
        assert_eq!(sequence[1].correct, Some(true));
        assert_eq!(sequence[1].flanker_condition.as_deref(), Some("congruent"));

        // -1 and nan both normalize to NoResponse
        assert_eq!(sequence[2].response, Response::NoResponse);
        assert_eq!(sequence[2].correct, Some(false));
        assert_eq!(sequence[3].response, Response::NoResponse);
        assert_eq!(sequence[3].flanker_condition.as_deref(), Some("incongruent"));
    }

    #[test]
    fn test_stop_signal_columns_with_aliases() {
        let dir = tempdir().unwrap();
        let path = write_csv(
            &dir,
            "s01_stop_signal.csv",
            "trial_id,rt,SS_trial_type,SS_delay\n\
             test_trial,0.5,go,\n\
             test_trial,0.7,stop,0.2\n\
             test_trial,-1,stop,nan\n",
        );

        let sequence = load_trial_sequence(&path).unwrap();
        assert_eq!(sequence[0].stop_condition, Some(StopCondition::Go));
        assert_eq!(sequence[1].stop_condition, Some(StopCondition::Stop));
        assert_eq!(sequence[1].stop_signal_delay, Some(0.2));
        assert_eq!(sequence[2].stop_signal_delay, None);
    }

    #[test]
    fn test_missing_columns_degrade() {
        // No rt / trial_id columns: rows load as non-test no-response
        // trials, so downstream stages take their safe defaults.
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, "odd.csv", "onset,duration\n0.0,1.0\n1.0,1.0\n");

        let sequence = load_trial_sequence(&path).unwrap();
        assert_eq!(sequence.len(), 2);
        assert!(!sequence[0].is_test_trial());
        assert_eq!(sequence[0].response, Response::NoResponse);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_trial_sequence(Path::new("/nonexistent/s01_flanker.csv"));
        assert!(err.is_err());
    }

    #[test]
    fn test_normalize_flanker_condition() {
        assert_eq!(normalize_flanker_condition("H_incongruent"), "incongruent");
        assert_eq!(normalize_flanker_condition("H_congruent"), "congruent");
        assert_eq!(normalize_flanker_condition("F_incongruent"), "incongruent");
        assert_eq!(normalize_flanker_condition("F_congruent"), "congruent");
        assert_eq!(normalize_flanker_condition("other"), "other");
    }
}
