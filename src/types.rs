use serde::{Deserialize, Serialize};

/// Outcome of one presented trial: a reaction time (seconds) or no key
/// press. The legacy logs encode "no response" as `-1` or an empty/NaN
/// cell; the parser folds all of those into `NoResponse` so no sentinel
/// value survives into the analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Response {
    Responded(f64),
    NoResponse,
}

impl Response {
    /// Normalize a raw RT cell. Missing, NaN and the `-1` sentinel all
    /// mean "no response".
    pub fn from_raw(raw: Option<f64>) -> Self {
        match raw {
            Some(rt) if rt.is_finite() && rt != -1.0 => Response::Responded(rt),
            _ => Response::NoResponse,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Response::NoResponse)
    }

    pub fn rt(&self) -> Option<f64> {
        match self {
            Response::Responded(rt) => Some(*rt),
            Response::NoResponse => None,
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Response::NoResponse
    }
}

/// Stop-signal trial condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCondition {
    Go,
    Stop,
}

impl StopCondition {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim() {
            "go" => Some(StopCondition::Go),
            "stop" => Some(StopCondition::Stop),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StopCondition::Go => "go",
            StopCondition::Stop => "stop",
        }
    }
}

/// One row of a behavioral session log.
///
/// Only `test_trial` rows count toward response-based metrics; fixations
/// and practice markers are carried along so row positions stay aligned
/// with the source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrialRecord {
    pub kind: String,
    pub response: Response,
    pub correct: Option<bool>,
    pub stop_condition: Option<StopCondition>,
    pub stop_signal_delay: Option<f64>,
    pub task_condition: Option<String>,
    pub cue_condition: Option<String>,
    pub flanker_condition: Option<String>,
}

impl TrialRecord {
    pub fn is_test_trial(&self) -> bool {
        self.kind == "test_trial"
    }
}

/// Ordered trial log for one (subject, task) run. Presentation order is
/// preserved by every stage.
pub type TrialSequence = Vec<TrialRecord>;

/// Result of the tail-cutoff pass over one run.
#[derive(Debug, Clone)]
pub struct QcOutcome {
    /// The run with any trailing no-response segment removed. Identical
    /// to the input when no trim happened.
    pub trimmed: TrialSequence,
    /// Number of rows retained, or None when no trim happened.
    pub cutoff_position: Option<usize>,
    /// True when the trim discarded more than half of the test trials.
    pub cutoff_before_halfway: bool,
    /// Fraction of test trials without a response, over the untrimmed
    /// run. Always in [0, 1].
    pub proportion_blank: f64,
}

/// One QC summary metric for one (subject, task).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcRow {
    pub subject_id: String,
    pub task_name: String,
    pub metric: String,
    pub metric_value: f64,
}

/// One detected stop-signal violation: a stop trial, immediately after a
/// go trial, that received a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViolationRecord {
    pub subject_id: String,
    pub task_name: String,
    pub ssd: Option<f64>,
    pub difference: f64,
}

/// Violations grouped by (subject, task, ssd).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedViolation {
    pub subject_id: String,
    pub task_name: String,
    pub ssd: f64,
    pub mean_difference: f64,
    pub num_violations: u64,
}

/// One failed exclusion criterion. `metric_value` is NaN when the metric
/// was missing from the subject's QC rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExclusionRecord {
    pub subject_id: String,
    pub task_name: String,
    pub metric: String,
    pub metric_value: f64,
    pub threshold: f64,
}
