// src/record.rs
//
// Normalized workout data: the primitive `Value` cells, the per-activity
// `ActivityRecord` (ordered metric → value) and strength-workout `WorkoutSet`s.

use crate::request::ActivityRequest;

pub const ID_FIELD: &str = "activity_id";
pub const DATE_FIELD: &str = "date";

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    /// Seconds.
    Duration(f64),
    /// Explicit "absent" marker; keeps the column in the schema.
    Empty,
}

impl Value {
    pub fn is_empty(&self) -> bool { matches!(self, Value::Empty) }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) | Value::Duration(n) => Some(*n),
            _ => None,
        }
    }

    /// Cell text for tabular export. Numbers print without trailing zeros.
    pub fn to_cell(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) | Value::Duration(n) => fmt_number(*n),
            Value::Empty => s!(),
        }
    }
}

fn fmt_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        // round away float noise like 64.80000000000001
        let s = format!("{:.6}", n);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// One extracted activity. Built once through `RecordBuilder`; read-only after.
#[derive(Clone, Debug, PartialEq)]
pub struct ActivityRecord {
    fields: Vec<(String, Value)>,
    sets: Vec<WorkoutSet>,
}

impl ActivityRecord {
    pub fn id(&self) -> &str {
        match self.get(ID_FIELD) {
            Some(Value::Text(id)) => id,
            _ => "",
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn fields(&self) -> &[(String, Value)] { &self.fields }
    pub fn columns(&self) -> impl Iterator<Item = &str> { self.fields.iter().map(|(k, _)| k.as_str()) }
    pub fn sets(&self) -> &[WorkoutSet] { &self.sets }
}

pub struct RecordBuilder {
    fields: Vec<(String, Value)>,
    sets: Vec<WorkoutSet>,
}

impl RecordBuilder {
    /// Seeds `activity_id` and `date` from the request so every record stays traceable.
    pub fn for_request(req: &ActivityRequest) -> Self {
        let date = match req.date() {
            Some(d) => Value::Text(d.format("%Y-%m-%d").to_string()),
            None => Value::Empty,
        };
        Self {
            fields: vec![
                (s!(ID_FIELD), Value::Text(req.id().to_string())),
                (s!(DATE_FIELD), date),
            ],
            sets: Vec::new(),
        }
    }

    /// Later pushes of an existing name replace the value in place.
    pub fn field(mut self, name: &str, value: Value) -> Self {
        match self.fields.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((s!(name), value)),
        }
        self
    }

    pub fn sets(mut self, sets: Vec<WorkoutSet>) -> Self {
        self.sets = sets;
        self
    }

    pub fn build(self) -> ActivityRecord {
        ActivityRecord { fields: self.fields, sets: self.sets }
    }
}

/// One row of a strength workout's sets table.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkoutSet {
    pub set: Value,
    pub exercise: String,
    pub time: String,
    pub rest: String,
    pub reps: Value,
    pub weight: String,
    pub volume: String,
    pub weight_value: Value,
    pub volume_value: Value,
    pub time_sec: Value,
    pub rest_sec: Value,
}

impl WorkoutSet {
    pub const COLUMNS: [&'static str; 12] = [
        ID_FIELD, "set", "exercise", "time", "rest", "reps", "weight", "volume",
        "weight_value", "volume_value", "time_sec", "rest_sec",
    ];

    pub fn to_row(&self, activity_id: &str) -> Vec<String> {
        vec![
            s!(activity_id),
            self.set.to_cell(),
            self.exercise.clone(),
            self.time.clone(),
            self.rest.clone(),
            self.reps.to_cell(),
            self.weight.clone(),
            self.volume.clone(),
            self.weight_value.to_cell(),
            self.volume_value.to_cell(),
            self.time_sec.to_cell(),
            self.rest_sec.to_cell(),
        ]
    }
}
