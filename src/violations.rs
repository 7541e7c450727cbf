/// Stop-signal violation detector
///
/// A violation is a stop trial, immediately following a go trial, that
/// received a response: either the subject failed to inhibit, or a
/// response leaked across the trial boundary. The scan is over adjacent
/// pairs in presentation order; because the leading trial must be a go
/// trial, a stop trial consumed by one violation can never start the
/// next one.

use crate::types::{StopCondition, TrialRecord, ViolationRecord};

/// Scan one run for go→stop violations. Pure; returns an empty vec for
/// runs without stop-signal conditions.
pub fn detect(subject_id: &str, sequence: &[TrialRecord], task_name: &str) -> Vec<ViolationRecord> {
    let mut violations = Vec::new();

    for pair in sequence.windows(2) {
        let (go, stop) = (&pair[0], &pair[1]);
        if go.stop_condition != Some(StopCondition::Go)
            || stop.stop_condition != Some(StopCondition::Stop)
        {
            continue;
        }
        // Both trials must carry a real response; a no-response go trial
        // has no RT to difference against.
        if let (Some(go_rt), Some(stop_rt)) = (go.response.rt(), stop.response.rt()) {
            violations.push(ViolationRecord {
                subject_id: subject_id.to_string(),
                task_name: task_name.to_string(),
                ssd: stop.stop_signal_delay,
                difference: stop_rt - go_rt,
            });
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Response;

    fn trial(condition: &str, rt: f64, ssd: Option<f64>) -> TrialRecord {
        TrialRecord {
            kind: "test_trial".to_string(),
            response: Response::from_raw(Some(rt)),
            stop_condition: StopCondition::parse(condition),
            stop_signal_delay: ssd,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_violation() {
        // go(0.5), stop(0.7, ssd 0.2), go(0.6), stop(-1, ssd 0.3):
        // only the first stop trial was responded to.
        let sequence = vec![
            trial("go", 0.5, None),
            trial("stop", 0.7, Some(0.2)),
            trial("go", 0.6, None),
            trial("stop", -1.0, Some(0.3)),
        ];

        let violations = detect("s01", &sequence, "stop_signal");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].ssd, Some(0.2));
        assert!((violations[0].difference - 0.2).abs() < 1e-12);
        assert_eq!(violations[0].subject_id, "s01");
        assert_eq!(violations[0].task_name, "stop_signal");
    }

    #[test]
    fn test_no_double_counting() {
        // stop at index 1 closes a violation; the stop at index 2 cannot
        // open a new pair because index 1 is not a go trial.
        let sequence = vec![
            trial("go", 0.5, None),
            trial("stop", 0.7, Some(0.2)),
            trial("stop", 0.8, Some(0.25)),
            trial("go", 0.6, None),
            trial("stop", 0.9, Some(0.3)),
        ];

        let violations = detect("s01", &sequence, "stop_signal");
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].ssd, Some(0.2));
        assert_eq!(violations[1].ssd, Some(0.3));
    }

    #[test]
    fn test_unresponded_go_trial_is_not_an_anchor() {
        let sequence = vec![trial("go", -1.0, None), trial("stop", 0.7, Some(0.2))];
        let violations = detect("s01", &sequence, "stop_signal");
        assert!(violations.is_empty());
    }

    #[test]
    fn test_missing_ssd_is_preserved() {
        let sequence = vec![trial("go", 0.5, None), trial("stop", 0.7, None)];
        let violations = detect("s01", &sequence, "stop_signal");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].ssd, None);
    }

    #[test]
    fn test_run_without_stop_conditions() {
        let sequence = vec![
            TrialRecord {
                kind: "test_trial".to_string(),
                response: Response::Responded(0.5),
                ..Default::default()
            };
            4
        ];
        assert!(detect("s01", &sequence, "flanker").is_empty());
    }
}
