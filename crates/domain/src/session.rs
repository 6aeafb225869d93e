use std::collections::BTreeMap;

use derive_more::{AsRef, Display, Into};
use serde::{Deserialize, Serialize};

use crate::{Multiplier, Reps};

/// Canonical exercise identifier: the slugified display name. This is the
/// join key between parsed prescriptions, collected performance data and the
/// exercise index. Two items with the same display name intentionally
/// collapse to the same key so repeated exercises aggregate together.
#[derive(AsRef, Debug, Display, Into, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[as_ref(forward)]
#[serde(into = "String", try_from = "String")]
pub struct ExerciseKey(String);

impl ExerciseKey {
    /// Derive the key from a display name: lowercase, runs of
    /// non-alphanumeric characters collapsed to single dashes.
    pub fn from_name(name: &str) -> Result<Self, ExerciseKeyError> {
        let mut slug = String::with_capacity(name.len());
        let mut pending_dash = false;
        for c in name.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(c.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }
        if slug.is_empty() {
            return Err(ExerciseKeyError::Empty);
        }
        Ok(ExerciseKey(slug))
    }
}

impl TryFrom<String> for ExerciseKey {
    type Error = ExerciseKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ExerciseKey::from_name(&value)
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ExerciseKeyError {
    #[error("Exercise name must contain at least one alphanumeric character")]
    Empty,
}

/// Closed set of logging disciplines. These strings are public wire
/// vocabulary; renaming any of them requires a schema version bump.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogType {
    Strength,
    Endurance,
    Carry,
    Mobility,
    Stretch,
}

/// Whether a section produces loggable sets or is display-only
/// (warm-up, cool-down, mobility and recovery work).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Log,
    Reference,
}

impl DisplayMode {
    const REFERENCE_KEYWORDS: [&'static str; 4] = ["warm", "cool", "mobility", "recovery"];

    /// Deterministic inference from section type and title. Stable for a
    /// given input; an explicitly set mode always takes precedence.
    #[must_use]
    pub fn infer(section_type: &str, title: &str) -> Self {
        let haystack = format!("{section_type} {title}").to_lowercase();
        if Self::REFERENCE_KEYWORDS
            .iter()
            .any(|keyword| haystack.contains(keyword))
        {
            DisplayMode::Reference
        } else {
            DisplayMode::Log
        }
    }
}

/// Planned parameters for one exercise occurrence, with every free-form
/// source field already narrowed to canonical numerics. Immutable once
/// produced by the parser.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Prescription {
    pub sets: Option<u32>,
    pub reps: Option<Reps>,
    pub weight: Option<f32>,
    pub multiplier: Option<Multiplier>,
    pub rpe: Option<f32>,
    pub time_seconds: Option<u32>,
    pub hold_seconds: Option<u32>,
    pub distance_miles: Option<f32>,
    pub distance_meters: Option<f32>,
    pub rest_seconds: Option<u32>,
}

impl Prescription {
    /// A prescription with no meaningful work parameters produces no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reps.is_none()
            && self.weight.is_none()
            && self.rpe.is_none()
            && self.time_seconds.is_none()
            && self.hold_seconds.is_none()
            && self.distance_miles.is_none()
            && self.distance_meters.is_none()
    }

    /// Infer the logging discipline from which parameters are prescribed.
    #[must_use]
    pub fn inferred_log_type(&self) -> LogType {
        let has_reps = self.reps.is_some();
        let has_weight = self.weight.is_some();
        let has_time = self.time_seconds.is_some();
        let has_hold = self.hold_seconds.is_some();
        let has_distance = self.distance_miles.is_some() || self.distance_meters.is_some();

        if has_hold && !has_reps && !has_weight {
            LogType::Mobility
        } else if has_hold {
            LogType::Stretch
        } else if has_distance || (has_time && !has_weight && !has_reps) {
            LogType::Endurance
        } else if has_time && has_weight && !has_reps {
            LogType::Carry
        } else {
            LogType::Strength
        }
    }
}

/// One exercise occurrence in a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseEntry {
    pub name: String,
    pub key: ExerciseKey,
    pub link: Option<String>,
    pub prescription: Prescription,
    pub cues: Vec<String>,
    pub notes: Option<String>,
    pub log_type: Option<LogType>,
    pub loggable: bool,
}

impl ExerciseEntry {
    /// Explicit log-type hint wins over inference from the prescription.
    #[must_use]
    pub fn log_type(&self) -> LogType {
        self.log_type
            .unwrap_or_else(|| self.prescription.inferred_log_type())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GroupKind {
    Superset,
    Circuit,
}

/// A superset or circuit: ordered child exercises performed in rounds.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupEntry {
    pub kind: GroupKind,
    pub name: String,
    pub notes: Option<String>,
    pub children: Vec<ExerciseEntry>,
    pub rounds: Option<u32>,
    pub rest_between_rounds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionItem {
    Exercise(ExerciseEntry),
    Group(GroupEntry),
    Note(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub section_type: String,
    pub title: String,
    pub notes: Option<String>,
    pub display_mode: DisplayMode,
    pub items: Vec<SessionItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    Structured,
    LegacyText,
}

/// An exercise reference in source order, used by the rendering layer to
/// lay out input rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseRef {
    pub name: String,
    pub key: ExerciseKey,
    pub link: Option<String>,
}

/// The canonical result of parsing a session definition. Legacy text
/// sources have no section tree; their structure is the flat exercise list.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSession {
    pub source: SessionSource,
    pub title: Option<String>,
    pub sections: Vec<Section>,
    pub exercises: Vec<ExerciseRef>,
    pub prescriptions: BTreeMap<ExerciseKey, Vec<Prescription>>,
}

impl ParsedSession {
    #[must_use]
    pub fn empty(source: SessionSource) -> Self {
        ParsedSession {
            source,
            title: None,
            sections: Vec::new(),
            exercises: Vec::new(),
            prescriptions: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.exercises.is_empty()
    }

    /// Number of prescription rows (rendered input rows) for an exercise.
    #[must_use]
    pub fn num_rows(&self, key: &ExerciseKey) -> u32 {
        self.prescriptions
            .get(key)
            .map_or(0, |rows| u32::try_from(rows.len()).unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Bench Press", Ok("bench-press"))]
    #[case("  Goblet  Squat!  ", Ok("goblet-squat"))]
    #[case("90/90 Hip Switch", Ok("90-90-hip-switch"))]
    #[case("Farmer's Carry", Ok("farmer-s-carry"))]
    #[case("---", Err(ExerciseKeyError::Empty))]
    #[case("", Err(ExerciseKeyError::Empty))]
    fn test_exercise_key_from_name(
        #[case] name: &str,
        #[case] expected: Result<&str, ExerciseKeyError>,
    ) {
        assert_eq!(
            ExerciseKey::from_name(name),
            expected.map(|slug| ExerciseKey(slug.to_string()))
        );
    }

    #[rstest]
    #[case("Warm-up", "Prep", DisplayMode::Reference)]
    #[case("Cooldown/Recovery", "Finish", DisplayMode::Reference)]
    #[case("Mobility", "Hips", DisplayMode::Reference)]
    #[case("Main Work", "Cool-down stretches", DisplayMode::Reference)]
    #[case("Strength", "Lower Body", DisplayMode::Log)]
    #[case("Conditioning", "Intervals", DisplayMode::Log)]
    fn test_display_mode_infer(
        #[case] section_type: &str,
        #[case] title: &str,
        #[case] expected: DisplayMode,
    ) {
        assert_eq!(DisplayMode::infer(section_type, title), expected);
    }

    #[rstest]
    #[case(Prescription { hold_seconds: Some(30), ..Prescription::default() }, LogType::Mobility)]
    #[case(
        Prescription {
            hold_seconds: Some(30),
            weight: Some(10.0),
            ..Prescription::default()
        },
        LogType::Stretch
    )]
    #[case(
        Prescription { distance_miles: Some(3.0), ..Prescription::default() },
        LogType::Endurance
    )]
    #[case(
        Prescription { time_seconds: Some(1200), ..Prescription::default() },
        LogType::Endurance
    )]
    #[case(
        Prescription {
            time_seconds: Some(60),
            weight: Some(70.0),
            ..Prescription::default()
        },
        LogType::Carry
    )]
    #[case(
        Prescription {
            weight: Some(50.0),
            reps: Some(crate::Reps::Single { value: 5, display: "5".to_string() }),
            ..Prescription::default()
        },
        LogType::Strength
    )]
    #[case(Prescription::default(), LogType::Strength)]
    fn test_inferred_log_type(#[case] prescription: Prescription, #[case] expected: LogType) {
        assert_eq!(prescription.inferred_log_type(), expected);
    }

    #[test]
    fn test_explicit_log_type_wins() {
        let entry = ExerciseEntry {
            name: "Suitcase Carry".to_string(),
            key: ExerciseKey::from_name("Suitcase Carry").unwrap(),
            link: None,
            prescription: Prescription::default(),
            cues: Vec::new(),
            notes: None,
            log_type: Some(LogType::Carry),
            loggable: true,
        };
        assert_eq!(entry.log_type(), LogType::Carry);
    }

    #[test]
    fn test_log_type_strings() {
        assert_eq!(LogType::Strength.to_string(), "strength");
        assert_eq!("endurance".parse::<LogType>(), Ok(LogType::Endurance));
        assert!("cardio".parse::<LogType>().is_err());
    }
}
