//! Trial Records & Data Sinks
//!
//! A record is a flat key/value map plus the task and trial it belongs to.
//! Column layout beyond that is left to whatever consumes the sink.

use super::collaborator::DataSink;
use crate::schedule::{ConditionCode, Schedule};
use crate::trial::TrialResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Current record format version
pub const CURRENT_FORMAT_VERSION: &str = "1.0";

/// Experiment name written into session metadata.
pub const EXPERIMENT_NAME: &str = "tworatesteps";

/// A value stored in a record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bools(Vec<bool>),
    Ints(Vec<i64>),
    /// `None` entries stand for `NaN`
    Floats(Vec<Option<f64>>),
    Nested(Vec<Vec<Option<f64>>>),
}

impl FieldValue {
    /// Float that encodes `NaN` as null.
    pub fn float(value: f64) -> Self {
        if value.is_nan() {
            FieldValue::Null
        } else {
            FieldValue::Float(value)
        }
    }

    pub fn floats(values: &[f64]) -> Self {
        FieldValue::Floats(values.iter().map(|v| (!v.is_nan()).then_some(*v)).collect())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<usize> for FieldValue {
    fn from(v: usize) -> Self {
        FieldValue::Int(v as i64)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<Vec<bool>> for FieldValue {
    fn from(v: Vec<bool>) -> Self {
        FieldValue::Bools(v)
    }
}

/// One row handed to the data sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Task position, `None` for configuration records
    pub task_index: Option<usize>,
    /// Trial within the task, `None` for configuration records
    pub trial_index: Option<usize>,
    pub fields: BTreeMap<String, FieldValue>,
}

impl TrialRecord {
    pub fn new(task_index: Option<usize>, trial_index: Option<usize>) -> Self {
        Self {
            task_index,
            trial_index,
            fields: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<FieldValue>) -> &mut Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn is_configuration(&self) -> bool {
        self.task_index.is_none()
    }

    /// Record written once before the first trial.
    pub fn configuration(schedule: &Schedule, metadata: &SessionMetadata) -> Self {
        let cb = &schedule.counterbalance;
        let mut record = Self::new(None, None);
        record
            .set("session_id", metadata.id.to_string())
            .set("expName", metadata.experiment.as_str())
            .set("date", metadata.started_at.to_rfc3339())
            .set("taskVer", cb.code.value() as i64)
            .set("orderChoice", cb.order_choice)
            .set("targetChoice", cb.target_choice)
            .set("rotationChoice", cb.rotation_choice)
            .set(
                "order",
                FieldValue::Ints(cb.order.ids().iter().map(|&i| i as i64).collect()),
            )
            .set(
                "rotation",
                FieldValue::floats(&cb.sign.as_pair()),
            )
            .set(
                "rotations_deg",
                FieldValue::Nested(
                    schedule
                        .rotations_deg()
                        .iter()
                        .map(|task| task.iter().map(|v| (!v.is_nan()).then_some(*v)).collect())
                        .collect(),
                ),
            )
            .set(
                "targetangle_deg",
                FieldValue::Nested(
                    schedule
                        .target_angles()
                        .iter()
                        .map(|task| task.iter().map(|v| Some(*v)).collect())
                        .collect(),
                ),
            );
        record
    }

    /// Record for a finished trial.
    pub fn from_result(result: &TrialResult) -> Self {
        let trial = &result.trial;
        let log = &result.log;
        let mut record = Self::new(Some(trial.task_index), Some(trial.trial_index));
        record
            .set("trialMouse.x", FieldValue::floats(&log.xs()))
            .set("trialMouse.y", FieldValue::floats(&log.ys()))
            .set("trialMouse.leftButton", log.left_buttons())
            .set("trialMouse.midButton", log.middle_buttons())
            .set("trialMouse.rightButton", log.right_buttons())
            .set("trialMouse.time", FieldValue::floats(&log.times()))
            .set(
                "step",
                FieldValue::Ints(log.steps().iter().map(|&s| s as i64).collect()),
            )
            .set("cursorx_rel", FieldValue::floats(&log.relative_xs()))
            .set("cursory_rel", FieldValue::floats(&log.relative_ys()))
            .set("targetangle_deg", FieldValue::float(trial.target_angle_deg))
            .set("rotation_deg", FieldValue::float(trial.rotation.degrees()))
            .set("task", trial.task_index)
            .set("task_type", trial.task_type.id() as i64)
            .set("trialNum", trial.trial_index)
            .set("completed", result.completed)
            .set("skipped", result.skipped.is_some());
        match &result.skipped {
            Some(key) => {
                record
                    .set("skip_key", key.name.as_str())
                    .set("skip_rt", FieldValue::float(key.rt));
            }
            None => {
                record
                    .set("skip_key", FieldValue::Null)
                    .set("skip_rt", FieldValue::Null);
            }
        }
        record
    }
}

/// Session bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub id: Uuid,
    pub experiment: String,
    pub condition: ConditionCode,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub trials_recorded: usize,
    /// `false` when the participant quit early
    pub completed: bool,
    pub format_version: String,
}

impl SessionMetadata {
    pub fn new(condition: ConditionCode) -> Self {
        Self {
            id: Uuid::new_v4(),
            experiment: EXPERIMENT_NAME.to_string(),
            condition,
            started_at: Utc::now(),
            ended_at: None,
            trials_recorded: 0,
            completed: false,
            format_version: CURRENT_FORMAT_VERSION.to_string(),
        }
    }

    pub fn finalize(&mut self, trials_recorded: usize, completed: bool) {
        self.ended_at = Some(Utc::now());
        self.trials_recorded = trials_recorded;
        self.completed = completed;
    }

    /// Default data file name, e.g. `tworatesteps_c13_2026-01-31_104500.jsonl`.
    pub fn file_name(&self) -> String {
        format!(
            "{}_c{}_{}.jsonl",
            self.experiment,
            self.condition,
            self.started_at.format("%Y-%m-%d_%H%M%S")
        )
    }
}

/// Sink that keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<TrialRecord>,
    pub flushes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records of finished trials, without the configuration record.
    pub fn trial_records(&self) -> impl Iterator<Item = &TrialRecord> {
        self.records.iter().filter(|r| !r.is_configuration())
    }
}

impl DataSink for MemorySink {
    fn record(&mut self, record: &TrialRecord) -> crate::Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn flush(&mut self) -> crate::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// Sink writing one JSON object per line.
///
/// Each record is flushed as soon as it is written, so an aborted session
/// leaves every completed trial on disk.
pub struct JsonLinesSink {
    path: PathBuf,
    writer: BufWriter<File>,
    written: usize,
}

impl JsonLinesSink {
    /// Create (or truncate) the file, creating parent directories.
    pub fn create(path: &Path) -> crate::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Read back a file written by this sink.
    pub fn load(path: &Path) -> crate::Result<Vec<TrialRecord>> {
        let content = std::fs::read_to_string(path)?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(crate::Error::from))
            .collect()
    }
}

impl DataSink for JsonLinesSink {
    fn record(&mut self, record: &TrialRecord) -> crate::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> crate::Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
