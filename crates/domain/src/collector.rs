use std::collections::BTreeMap;

use crate::{
    ExerciseEntry, ExerciseKey, FlatLog, GroupEntry, NestedLog, ParsedSession, PerformanceItem,
    PerformanceLog, PerformanceSection, PerformanceSet, PerformedExercise, Round, RoundEntry,
    Scalar, SessionItem, SessionSource, SetValues, build_index, parse_time_to_sec,
    session::{DisplayMode, GroupKind, LogType},
    units::Multiplier,
};

/// Raw field values entered for one set/round position, exactly as typed.
/// Narrowing to numerics happens here, at collection time: unparsable text
/// becomes absence, a literal `0` stays a zero.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RawSetInput {
    pub weight: Option<String>,
    pub multiplier: Option<String>,
    pub reps: Option<String>,
    pub rpe: Option<String>,
    pub time_seconds: Option<String>,
    pub hold_seconds: Option<String>,
    pub distance_miles: Option<String>,
    pub distance_meters: Option<String>,
}

impl RawSetInput {
    fn narrow(&self) -> SetValues {
        SetValues {
            weight: parse_plain(self.weight.as_deref()),
            multiplier: parse_plain(self.multiplier.as_deref())
                .and_then(|n| Multiplier::from_number(f64::from(n))),
            reps: parse_plain(self.reps.as_deref()),
            rpe: parse_plain(self.rpe.as_deref()),
            time_seconds: parse_entered_time(self.time_seconds.as_deref()),
            hold_seconds: parse_entered_time(self.hold_seconds.as_deref()),
            // Distance is stored in miles regardless of which field was used.
            distance_miles: parse_plain(self.distance_miles.as_deref())
                .or_else(|| parse_plain(self.distance_meters.as_deref())),
        }
    }
}

fn parse_plain(raw: Option<&str>) -> Option<f32> {
    raw.and_then(|s| s.trim().parse::<f32>().ok())
}

fn parse_entered_time(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            parse_time_to_sec(&Scalar::from(trimmed))
        }
    })
}

/// Everything the user entered, keyed by exercise and 1-based set/round
/// position. This is the raw hand-off from the rendering layer.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnteredValues {
    entries: BTreeMap<ExerciseKey, BTreeMap<u32, RawSetInput>>,
}

impl EnteredValues {
    #[must_use]
    pub fn new() -> Self {
        EnteredValues::default()
    }

    pub fn insert(&mut self, key: ExerciseKey, position: u32, input: RawSetInput) {
        self.entries.entry(key).or_default().insert(position, input);
    }

    #[must_use]
    pub fn get(&self, key: &ExerciseKey, position: u32) -> Option<&RawSetInput> {
        self.entries.get(key).and_then(|rows| rows.get(&position))
    }

    fn max_position(&self, key: &ExerciseKey) -> u32 {
        self.entries
            .get(key)
            .and_then(|rows| rows.keys().next_back().copied())
            .unwrap_or(0)
    }
}

/// Strip relative prefixes and keep the `workouts/…` suffix when present,
/// so stored logs are keyed consistently regardless of the page's path.
#[must_use]
pub fn normalize_workout_file(path: &str) -> String {
    let mut s = path;
    while let Some(rest) = s.strip_prefix("../") {
        s = rest;
    }
    s = s.strip_prefix("./").unwrap_or(s);
    match s.find("workouts/") {
        Some(pos) => s[pos..].to_string(),
        None => s.to_string(),
    }
}

/// Reconstruct a performance log from the canonical session structure and
/// the entered values. Produces the nested schema whenever the session tree
/// is available, the flat schema for legacy text sources.
#[must_use]
pub fn collect(
    session: &ParsedSession,
    entered: &EnteredValues,
    workout_file: &str,
    timestamp: &str,
) -> PerformanceLog {
    let workout_file = normalize_workout_file(workout_file);
    match session.source {
        SessionSource::Structured if !session.sections.is_empty() => {
            PerformanceLog::Nested(collect_nested(session, entered, workout_file, timestamp))
        }
        _ => PerformanceLog::Flat(collect_flat(session, entered, workout_file, timestamp)),
    }
}

fn collect_nested(
    session: &ParsedSession,
    entered: &EnteredValues,
    workout_file: String,
    timestamp: &str,
) -> NestedLog {
    let mut sections = Vec::new();
    for section in &session.sections {
        // Reference sections are displayed but never produce sets.
        if section.display_mode == DisplayMode::Reference {
            continue;
        }
        let mut items = Vec::new();
        for item in &section.items {
            match item {
                SessionItem::Exercise(entry) => {
                    if !entry.loggable {
                        continue;
                    }
                    let sets = collect_sets(session, entered, entry);
                    if sets.is_empty() {
                        continue;
                    }
                    items.push(PerformanceItem::Exercise {
                        key: entry.key.clone(),
                        name: entry.name.clone(),
                        notes: entry.notes.clone(),
                        sets,
                    });
                }
                SessionItem::Group(group) => {
                    let rounds = collect_rounds(session, entered, group);
                    if rounds.is_empty() {
                        continue;
                    }
                    items.push(match group.kind {
                        GroupKind::Superset => PerformanceItem::Superset {
                            name: group.name.clone(),
                            notes: group.notes.clone(),
                            rounds,
                        },
                        GroupKind::Circuit => PerformanceItem::Circuit {
                            name: group.name.clone(),
                            notes: group.notes.clone(),
                            rounds,
                        },
                    });
                }
                SessionItem::Note(_) => {}
            }
        }
        if !items.is_empty() {
            sections.push(PerformanceSection {
                section_type: section.section_type.clone(),
                title: section.title.clone(),
                notes: section.notes.clone(),
                items,
            });
        }
    }

    let mut log = NestedLog {
        workout_file,
        timestamp: timestamp.to_string(),
        title: session.title.clone(),
        sections,
        exercise_index: BTreeMap::new(),
        validation_errors: Vec::new(),
    };
    if !log.sections.is_empty() {
        let snapshot = PerformanceLog::Nested(log.clone());
        log.exercise_index = build_index(&snapshot);
    }
    log
}

/// Sets for a standalone exercise. Positions where nothing was entered are
/// discarded; kept sets retain their rendered row position as the index.
fn collect_sets(
    session: &ParsedSession,
    entered: &EnteredValues,
    entry: &ExerciseEntry,
) -> Vec<PerformanceSet> {
    let positions = session
        .num_rows(&entry.key)
        .max(entered.max_position(&entry.key));
    let mut sets = Vec::new();
    for position in 1..=positions {
        let Some(input) = entered.get(&entry.key, position) else {
            continue;
        };
        let values = input.narrow();
        if values.is_empty() {
            continue;
        }
        sets.push(PerformanceSet {
            set: position,
            values,
        });
    }
    sets
}

/// Rounds of a superset/circuit. A round is kept only if at least one child
/// has a non-empty entry; kept rounds are renumbered contiguously from 1.
fn collect_rounds(
    session: &ParsedSession,
    entered: &EnteredValues,
    group: &GroupEntry,
) -> Vec<Round> {
    let positions = group
        .children
        .iter()
        .map(|child| {
            session
                .num_rows(&child.key)
                .max(entered.max_position(&child.key))
        })
        .max()
        .unwrap_or(0);

    let mut rounds = Vec::new();
    for position in 1..=positions {
        let mut exercises = Vec::new();
        for child in &group.children {
            let Some(input) = entered.get(&child.key, position) else {
                continue;
            };
            let values = input.narrow();
            if values.is_empty() {
                continue;
            }
            exercises.push(RoundEntry {
                key: child.key.clone(),
                name: child.name.clone(),
                values,
            });
        }
        if exercises.is_empty() {
            continue;
        }
        rounds.push(Round {
            round: u32::try_from(rounds.len()).unwrap_or(u32::MAX) + 1,
            prescribed_rest_seconds: group.rest_between_rounds,
            exercises,
        });
    }
    rounds
}

fn collect_flat(
    session: &ParsedSession,
    entered: &EnteredValues,
    workout_file: String,
    timestamp: &str,
) -> FlatLog {
    let mut exercises = BTreeMap::new();
    for reference in &session.exercises {
        let positions = session
            .num_rows(&reference.key)
            .max(entered.max_position(&reference.key));
        let mut sets = Vec::new();
        for position in 1..=positions {
            let Some(input) = entered.get(&reference.key, position) else {
                continue;
            };
            let values = input.narrow();
            if values.is_empty() {
                continue;
            }
            sets.push(PerformanceSet {
                set: position,
                values,
            });
        }
        if sets.is_empty() {
            continue;
        }
        let log_type = session
            .prescriptions
            .get(&reference.key)
            .and_then(|rows| rows.first())
            .map_or(LogType::Strength, |row| row.inferred_log_type());
        exercises.insert(
            reference.key.clone(),
            PerformedExercise {
                name: reference.name.clone(),
                log_type,
                sets,
            },
        );
    }

    FlatLog {
        workout_file,
        timestamp: timestamp.to_string(),
        exercises,
        validation_errors: Vec::new(),
    }
}
