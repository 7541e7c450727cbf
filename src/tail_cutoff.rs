/// Early-termination (tail-cutoff) detector
///
/// A session that was aborted early leaves a run of no-response rows at
/// the end of the log. The detector trims that tail back to the last row
/// with a real response, but only when the evidence is unambiguous:
/// every ambiguous case resolves to "no trim", because an over-eager
/// trim silently discards valid data.

use tracing::debug;

use crate::types::{QcOutcome, QcRow, TrialRecord};

/// Run the tail-cutoff pass over one run.
///
/// `last_n_test_trials` is the minimum number of trailing blank test
/// trials required before a trim decision is trusted (deployment default
/// is 10). The input sequence is never mutated; the trimmed copy is
/// returned in the outcome.
pub fn detect(sequence: &[TrialRecord], last_n_test_trials: usize) -> QcOutcome {
    let proportion_blank = proportion_blank(sequence);

    let no_trim = QcOutcome {
        trimmed: sequence.to_vec(),
        cutoff_position: None,
        cutoff_before_halfway: false,
        proportion_blank,
    };

    // Last row across ALL rows (fixations included) with a real response.
    let last_valid = match sequence.iter().rposition(|t| !t.response.is_blank()) {
        Some(idx) => idx,
        None => return no_trim,
    };

    // Already ends on a response: there is no trailing blank segment.
    if last_valid == sequence.len() - 1 {
        return no_trim;
    }

    // Mixed tail: any response after the located row aborts the trim.
    if sequence[last_valid + 1..].iter().any(|t| !t.response.is_blank()) {
        return no_trim;
    }

    // Confidence guard: the final last_n_test_trials test-trial
    // responses must all be blank, and there must be at least that many
    // test trials to check.
    let test_responses: Vec<bool> = sequence
        .iter()
        .filter(|t| t.is_test_trial())
        .map(|t| t.response.is_blank())
        .collect();
    if test_responses.len() < last_n_test_trials {
        return no_trim;
    }
    if !test_responses[test_responses.len() - last_n_test_trials..]
        .iter()
        .all(|blank| *blank)
    {
        return no_trim;
    }

    // Trim keeps rows up to and including the last valid response.
    let trimmed = sequence[..=last_valid].to_vec();
    let cutoff_position = last_valid + 1;

    let total_test = test_responses.len();
    let cutoff_before_halfway = if total_test > 0 {
        let retained_test = trimmed.iter().filter(|t| t.is_test_trial()).count();
        (retained_test as f64) < (total_test as f64 / 2.0)
    } else {
        (cutoff_position as f64) < (sequence.len() as f64 / 2.0)
    };

    debug!(
        "Tail cutoff: kept {}/{} rows (before_halfway: {})",
        cutoff_position,
        sequence.len(),
        cutoff_before_halfway
    );

    QcOutcome {
        trimmed,
        cutoff_position: Some(cutoff_position),
        cutoff_before_halfway,
        proportion_blank,
    }
}

/// Fraction of test trials without a response. 0.0 when the run has no
/// test trials at all.
fn proportion_blank(sequence: &[TrialRecord]) -> f64 {
    let mut test = 0usize;
    let mut blank = 0usize;
    for trial in sequence.iter().filter(|t| t.is_test_trial()) {
        test += 1;
        if trial.response.is_blank() {
            blank += 1;
        }
    }
    if test == 0 {
        0.0
    } else {
        blank as f64 / test as f64
    }
}

/// Flatten one run's outcome into QC summary rows.
///
/// `accuracy` and `mean_rt` are computed over the trimmed run's test
/// trials and only emitted when the run carries the data for them;
/// `proportion_blank` and the cutoff flags always refer to the untrimmed
/// run.
pub fn summarize_run(subject_id: &str, task_name: &str, outcome: &QcOutcome) -> Vec<QcRow> {
    let mut rows = Vec::new();
    let mut push = |metric: &str, value: f64| {
        rows.push(QcRow {
            subject_id: subject_id.to_string(),
            task_name: task_name.to_string(),
            metric: metric.to_string(),
            metric_value: value,
        });
    };

    push("proportion_blank", outcome.proportion_blank);
    push("trimmed", if outcome.cutoff_position.is_some() { 1.0 } else { 0.0 });
    push(
        "cutoff_before_halfway",
        if outcome.cutoff_before_halfway { 1.0 } else { 0.0 },
    );
    if let Some(pos) = outcome.cutoff_position {
        push("cutoff_position", pos as f64);
    }

    let test_trials: Vec<&TrialRecord> = outcome
        .trimmed
        .iter()
        .filter(|t| t.is_test_trial())
        .collect();

    let scored: Vec<bool> = test_trials.iter().filter_map(|t| t.correct).collect();
    if !scored.is_empty() {
        let hits = scored.iter().filter(|c| **c).count();
        push("accuracy", hits as f64 / scored.len() as f64);
    }

    let rts: Vec<f64> = test_trials.iter().filter_map(|t| t.response.rt()).collect();
    if !rts.is_empty() {
        push("mean_rt", rts.iter().sum::<f64>() / rts.len() as f64);
    }

    rows
}
