// src/batch.rs
//
// What a run produced: one `BatchItem` per request, in request order.

use std::fmt;

use crate::error::FailureKind;
use crate::record::ActivityRecord;
use crate::request::ActivityRequest;

#[derive(Clone, Debug, PartialEq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn cancelled(reason: HaltReason) -> Self {
        Self::new(FailureKind::Cancelled, format!("not attempted: {reason}"))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Recorded(ActivityRecord),
    Failed(Failure),
}

#[derive(Clone, Debug, PartialEq)]
pub struct BatchItem {
    pub request: ActivityRequest,
    pub outcome: Outcome,
    /// Navigate/extract attempts made; 0 when the item never reached the page.
    pub attempts: u32,
}

impl BatchItem {
    pub fn record(&self) -> Option<&ActivityRecord> {
        match &self.outcome {
            Outcome::Recorded(r) => Some(r),
            Outcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match &self.outcome {
            Outcome::Failed(f) => Some(f),
            Outcome::Recorded(_) => None,
        }
    }
}

/// Why a run stopped before attempting every request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HaltReason {
    Cancelled,
    LoggedOut,
    Disconnected,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HaltReason::Cancelled => "run cancelled",
            HaltReason::LoggedOut => "browser session logged out",
            HaltReason::Disconnected => "browser connection lost",
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchResult {
    pub items: Vec<BatchItem>,
    pub halted: Option<HaltReason>,
}

impl BatchResult {
    /// Successful records in request order.
    pub fn records(&self) -> impl Iterator<Item = &ActivityRecord> {
        self.items.iter().filter_map(BatchItem::record)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&BatchItem, &Failure)> {
        self.items.iter().filter_map(|i| i.failure().map(|f| (i, f)))
    }

    pub fn summary(&self) -> Summary {
        let failed: Vec<(String, FailureKind)> = self
            .failures()
            .map(|(item, f)| (item.request.id().to_string(), f.kind))
            .collect();
        Summary {
            total: self.items.len(),
            recorded: self.items.len() - failed.len(),
            failed,
            halted: self.halted,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub recorded: usize,
    /// (activity id, kind) per failed item, request order.
    pub failed: Vec<(String, FailureKind)>,
    pub halted: Option<HaltReason>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} activities recorded, {} failed", self.recorded, self.total, self.failed.len())?;
        if let Some(reason) = self.halted {
            write!(f, " (stopped early: {reason})")?;
        }
        Ok(())
    }
}

/// Sets and reps per (activity, exercise), first-seen order.
#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseSummary {
    pub activity_id: String,
    pub exercise: String,
    pub sets: usize,
    pub reps: f64,
}

pub fn exercise_summary(batch: &BatchResult) -> Vec<ExerciseSummary> {
    let mut out: Vec<ExerciseSummary> = Vec::new();
    for rec in batch.records() {
        for set in rec.sets() {
            let reps = set.reps.as_f64().unwrap_or(0.0);
            match out.iter_mut().find(|e| e.activity_id == rec.id() && e.exercise == set.exercise) {
                Some(e) => {
                    e.sets += 1;
                    e.reps += reps;
                }
                None => out.push(ExerciseSummary {
                    activity_id: rec.id().to_string(),
                    exercise: set.exercise.clone(),
                    sets: 1,
                    reps,
                }),
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RecordBuilder, Value, WorkoutSet};

    fn set(exercise: &str, reps: Value) -> WorkoutSet {
        WorkoutSet {
            set: Value::Number(1.0),
            exercise: s!(exercise),
            time: s!(),
            rest: s!(),
            reps,
            weight: s!(),
            volume: s!(),
            weight_value: Value::Empty,
            volume_value: Value::Empty,
            time_sec: Value::Empty,
            rest_sec: Value::Empty,
        }
    }

    fn recorded(id: &str, sets: Vec<WorkoutSet>) -> BatchItem {
        let req = ActivityRequest::new(id, None);
        let rec = RecordBuilder::for_request(&req).sets(sets).build();
        BatchItem { request: req, outcome: Outcome::Recorded(rec), attempts: 1 }
    }

    fn failed(id: &str, kind: FailureKind) -> BatchItem {
        BatchItem {
            request: ActivityRequest::new(id, None),
            outcome: Outcome::Failed(Failure::new(kind, "x")),
            attempts: 1,
        }
    }

    #[test]
    fn summary_counts_and_lists_failures() {
        let batch = BatchResult {
            items: vec![
                recorded("1", vec![]),
                failed("", FailureKind::InvalidRequest),
                failed("3", FailureKind::ActivityNotFound),
            ],
            halted: None,
        };
        let s = batch.summary();
        assert_eq!((s.total, s.recorded), (3, 1));
        assert_eq!(s.failed, vec![
            (s!(""), FailureKind::InvalidRequest),
            (s!("3"), FailureKind::ActivityNotFound),
        ]);
        assert_eq!(s.to_string(), "1 of 3 activities recorded, 2 failed");
    }

    #[test]
    fn exercises_grouped_per_activity() {
        let batch = BatchResult {
            items: vec![
                recorded("1", vec![
                    set("Squat", Value::Number(5.0)),
                    set("Bench", Value::Number(8.0)),
                    set("Squat", Value::Number(5.0)),
                ]),
                recorded("2", vec![set("Squat", Value::Text(s!("AMRAP")))]),
            ],
            halted: None,
        };
        let ex = exercise_summary(&batch);
        assert_eq!(ex.len(), 3);
        assert_eq!((ex[0].exercise.as_str(), ex[0].sets, ex[0].reps), ("Squat", 2, 10.0));
        assert_eq!((ex[1].exercise.as_str(), ex[1].sets), ("Bench", 1));
        assert_eq!((ex[2].activity_id.as_str(), ex[2].reps), ("2", 0.0));
    }
}
