use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ExerciseKey, LogType, Multiplier};

/// The numeric payload of one recorded attempt. Absent fields mean "not
/// provided"; a literal zero is preserved as an entered value. Only fields
/// the user populated are serialized.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<Multiplier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reps: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpe: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_miles: Option<f32>,
}

impl SetValues {
    /// A set with nothing entered is never emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weight.is_none()
            && self.multiplier.is_none()
            && self.reps.is_none()
            && self.rpe.is_none()
            && self.time_seconds.is_none()
            && self.hold_seconds.is_none()
            && self.distance_miles.is_none()
    }

    /// Contribution to an exercise's total volume, defined only when both
    /// weight and reps were recorded. Bodyweight sets contribute zero.
    #[must_use]
    pub fn volume(&self) -> Option<f32> {
        match (self.weight, self.reps) {
            (Some(weight), Some(reps)) => {
                Some(weight * self.multiplier.map_or(1.0, Multiplier::factor) * reps)
            }
            _ => None,
        }
    }
}

/// One recorded set of a standalone exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSet {
    pub set: u32,
    #[serde(flatten)]
    pub values: SetValues,
}

/// One exercise's entry within a round of a superset or circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundEntry {
    pub key: ExerciseKey,
    pub name: String,
    #[serde(flatten)]
    pub values: SetValues,
}

/// One complete pass through a superset or circuit. Round numbering is
/// contiguous from 1; empty rounds are dropped before numbering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub round: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescribed_rest_seconds: Option<u32>,
    pub exercises: Vec<RoundEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PerformanceItem {
    Exercise {
        key: ExerciseKey,
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
        sets: Vec<PerformanceSet>,
    },
    Superset {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
        rounds: Vec<Round>,
    },
    Circuit {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
        rounds: Vec<Round>,
    },
}

impl PerformanceItem {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            PerformanceItem::Exercise { name, .. }
            | PerformanceItem::Superset { name, .. }
            | PerformanceItem::Circuit { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSection {
    #[serde(rename = "type")]
    pub section_type: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub items: Vec<PerformanceItem>,
}

/// One exercise of the legacy flat schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformedExercise {
    pub name: String,
    pub log_type: LogType,
    pub sets: Vec<PerformanceSet>,
}

/// Derived per-exercise aggregate over every occurrence of a key, however
/// nested. Recomputed in full on every export, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseIndexEntry {
    pub name: String,
    pub section_path: String,
    pub total_sets: u32,
    pub total_volume: f32,
    #[serde(rename = "avgRPE", skip_serializing_if = "Option::is_none")]
    pub avg_rpe: Option<f32>,
}

/// The legacy flat performance log (`version = "perf-1"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatLog {
    pub workout_file: String,
    pub timestamp: String,
    pub exercises: BTreeMap<ExerciseKey, PerformedExercise>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<String>,
}

/// The nested performance log (`version = "perf-2"`), mirroring the
/// session's section/item structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedLog {
    pub workout_file: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub sections: Vec<PerformanceSection>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub exercise_index: BTreeMap<ExerciseKey, ExerciseIndexEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<String>,
}

/// The two coexisting schema generations, discriminated by the `version`
/// wire field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum PerformanceLog {
    #[serde(rename = "perf-1")]
    Flat(FlatLog),
    #[serde(rename = "perf-2")]
    Nested(NestedLog),
}

impl PerformanceLog {
    #[must_use]
    pub fn workout_file(&self) -> &str {
        match self {
            PerformanceLog::Flat(log) => &log.workout_file,
            PerformanceLog::Nested(log) => &log.workout_file,
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> &str {
        match self {
            PerformanceLog::Flat(log) => &log.timestamp,
            PerformanceLog::Nested(log) => &log.timestamp,
        }
    }

    #[must_use]
    pub fn validation_errors(&self) -> &[String] {
        match self {
            PerformanceLog::Flat(log) => &log.validation_errors,
            PerformanceLog::Nested(log) => &log.validation_errors,
        }
    }

    /// Attach advisory findings for audit. Diagnostics never block export.
    pub fn attach_validation_errors(&mut self, errors: Vec<String>) {
        match self {
            PerformanceLog::Flat(log) => log.validation_errors = errors,
            PerformanceLog::Nested(log) => log.validation_errors = errors,
        }
    }
}
