use std::collections::BTreeMap;

use crate::{
    ExerciseIndexEntry, ExerciseKey, PerformanceItem, PerformanceLog, SetValues,
};

struct Accumulator {
    name: String,
    section_path: String,
    total_sets: u32,
    total_volume: f32,
    rpe_sum: f32,
    rpe_count: u32,
}

impl Accumulator {
    fn new(name: &str, section_path: String) -> Self {
        Accumulator {
            name: name.to_string(),
            section_path,
            total_sets: 0,
            total_volume: 0.0,
            rpe_sum: 0.0,
            rpe_count: 0,
        }
    }

    fn add(&mut self, values: &SetValues) {
        self.total_sets += 1;
        if let Some(volume) = values.volume() {
            self.total_volume += volume;
        }
        // Absent RPE entries do not count toward the average's denominator.
        if let Some(rpe) = values.rpe {
            self.rpe_sum += rpe;
            self.rpe_count += 1;
        }
    }

    fn finish(self) -> ExerciseIndexEntry {
        #[allow(clippy::cast_precision_loss)]
        let avg_rpe = (self.rpe_count > 0).then(|| self.rpe_sum / self.rpe_count as f32);
        ExerciseIndexEntry {
            name: self.name,
            section_path: self.section_path,
            total_sets: self.total_sets,
            total_volume: self.total_volume,
            avg_rpe,
        }
    }
}

/// Build the per-exercise aggregate index from a performance log: a single
/// depth-first walk, always a full rebuild. Every occurrence of a key
/// accumulates into one entry; the first occurrence determines the entry's
/// name and section path.
#[must_use]
pub fn build_index(log: &PerformanceLog) -> BTreeMap<ExerciseKey, ExerciseIndexEntry> {
    let mut accumulators: BTreeMap<ExerciseKey, Accumulator> = BTreeMap::new();

    match log {
        PerformanceLog::Flat(flat) => {
            for (key, exercise) in &flat.exercises {
                let acc = accumulators.entry(key.clone()).or_insert_with(|| {
                    Accumulator::new(&exercise.name, format!("exercises.{key}.sets[*]"))
                });
                for set in &exercise.sets {
                    acc.add(&set.values);
                }
            }
        }
        PerformanceLog::Nested(nested) => {
            for (section_index, section) in nested.sections.iter().enumerate() {
                for (item_index, item) in section.items.iter().enumerate() {
                    match item {
                        PerformanceItem::Exercise {
                            key, name, sets, ..
                        } => {
                            let acc = accumulators.entry(key.clone()).or_insert_with(|| {
                                Accumulator::new(
                                    name,
                                    format!("sections[{section_index}].items[{item_index}].sets[*]"),
                                )
                            });
                            for set in sets {
                                acc.add(&set.values);
                            }
                        }
                        PerformanceItem::Superset { rounds, .. }
                        | PerformanceItem::Circuit { rounds, .. } => {
                            for round in rounds {
                                for (entry_index, entry) in round.exercises.iter().enumerate() {
                                    let acc = accumulators
                                        .entry(entry.key.clone())
                                        .or_insert_with(|| {
                                            Accumulator::new(
                                                &entry.name,
                                                format!(
                                                    "sections[{section_index}].items[{item_index}].rounds[*].exercises[{entry_index}]"
                                                ),
                                            )
                                        });
                                    acc.add(&entry.values);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    accumulators
        .into_iter()
        .map(|(key, acc)| (key, acc.finish()))
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use pretty_assertions::assert_eq;

    use crate::{
        FlatLog, LogType, NestedLog, PerformanceSection, PerformanceSet, PerformedExercise, Round,
        RoundEntry,
    };

    use super::*;

    fn key(name: &str) -> ExerciseKey {
        ExerciseKey::from_name(name).unwrap()
    }

    fn set(index: u32, values: SetValues) -> PerformanceSet {
        PerformanceSet { set: index, values }
    }

    fn weighted(weight: f32, reps: f32, rpe: Option<f32>) -> SetValues {
        SetValues {
            weight: Some(weight),
            reps: Some(reps),
            rpe,
            ..SetValues::default()
        }
    }

    fn nested_fixture() -> PerformanceLog {
        PerformanceLog::Nested(NestedLog {
            workout_file: "workouts/lower_a.json".to_string(),
            timestamp: "2025-11-03T18:30:00-05:00".to_string(),
            title: None,
            sections: vec![PerformanceSection {
                section_type: "Strength".to_string(),
                title: "Main Work".to_string(),
                notes: None,
                items: vec![
                    PerformanceItem::Exercise {
                        key: key("Goblet Squat"),
                        name: "Goblet Squat".to_string(),
                        notes: None,
                        sets: vec![
                            set(
                                1,
                                SetValues {
                                    weight: Some(50.0),
                                    multiplier: Some(crate::Multiplier::PerSide),
                                    reps: Some(10.0),
                                    rpe: Some(8.0),
                                    ..SetValues::default()
                                },
                            ),
                            set(2, weighted(50.0, 8.0, None)),
                        ],
                    },
                    PerformanceItem::Superset {
                        name: "Pull Pair".to_string(),
                        notes: None,
                        rounds: vec![
                            Round {
                                round: 1,
                                prescribed_rest_seconds: None,
                                exercises: vec![
                                    RoundEntry {
                                        key: key("Goblet Squat"),
                                        name: "Goblet Squat".to_string(),
                                        values: weighted(50.0, 5.0, Some(9.0)),
                                    },
                                    RoundEntry {
                                        key: key("Band Pull-Apart"),
                                        name: "Band Pull-Apart".to_string(),
                                        values: SetValues {
                                            reps: Some(15.0),
                                            ..SetValues::default()
                                        },
                                    },
                                ],
                            },
                            Round {
                                round: 2,
                                prescribed_rest_seconds: None,
                                exercises: vec![RoundEntry {
                                    key: key("Band Pull-Apart"),
                                    name: "Band Pull-Apart".to_string(),
                                    values: SetValues {
                                        reps: Some(15.0),
                                        ..SetValues::default()
                                    },
                                }],
                            },
                        ],
                    },
                ],
            }],
            exercise_index: BTreeMap::new(),
            validation_errors: Vec::new(),
        })
    }

    #[test]
    fn test_occurrences_merge_under_one_key() {
        let index = build_index(&nested_fixture());
        let entry = &index[&key("Goblet Squat")];

        // Two standalone sets plus one round entry.
        assert_eq!(entry.total_sets, 3);
        // 50*2*10 + 50*1*8 (no multiplier defaults to total) + 50*1*5.
        assert_approx_eq!(entry.total_volume, 1000.0 + 400.0 + 250.0);
        // Only two of the three sets carried an RPE.
        assert_approx_eq!(entry.avg_rpe.unwrap(), 8.5);
        // First occurrence wins the path.
        assert_eq!(entry.section_path, "sections[0].items[0].sets[*]");
    }

    #[test]
    fn test_entry_without_rpe_has_no_average() {
        let index = build_index(&nested_fixture());
        let entry = &index[&key("Band Pull-Apart")];
        assert_eq!(entry.avg_rpe, None);
        assert_eq!(entry.total_sets, 2);
        assert_approx_eq!(entry.total_volume, 0.0);
        assert_eq!(
            entry.section_path,
            "sections[0].items[1].rounds[*].exercises[1]"
        );
    }

    #[test]
    fn test_rebuild_is_identical() {
        let log = nested_fixture();
        assert_eq!(build_index(&log), build_index(&log));
    }

    #[test]
    fn test_flat_log_index() {
        let log = PerformanceLog::Flat(FlatLog {
            workout_file: "workouts/upper_a.md".to_string(),
            timestamp: "2025-11-03T18:30:00-05:00".to_string(),
            exercises: BTreeMap::from([(
                key("Bench Press"),
                PerformedExercise {
                    name: "Bench Press".to_string(),
                    log_type: LogType::Strength,
                    sets: vec![
                        set(1, weighted(45.0, 12.0, Some(7.0))),
                        set(2, weighted(45.0, 10.0, Some(8.0))),
                    ],
                },
            )]),
            validation_errors: Vec::new(),
        });

        let index = build_index(&log);
        let entry = &index[&key("Bench Press")];
        assert_eq!(entry.total_sets, 2);
        assert_approx_eq!(entry.total_volume, 45.0 * 12.0 + 45.0 * 10.0);
        assert_approx_eq!(entry.avg_rpe.unwrap(), 7.5);
        assert_eq!(entry.section_path, "exercises.bench-press.sets[*]");
    }

    #[test]
    fn test_bodyweight_sets_contribute_zero_volume() {
        let log = PerformanceLog::Flat(FlatLog {
            workout_file: "workouts/upper_a.md".to_string(),
            timestamp: "2025-11-03T18:30:00-05:00".to_string(),
            exercises: BTreeMap::from([(
                key("Chin-Up"),
                PerformedExercise {
                    name: "Chin-Up".to_string(),
                    log_type: LogType::Strength,
                    sets: vec![set(
                        1,
                        SetValues {
                            weight: Some(180.0),
                            multiplier: Some(crate::Multiplier::Bodyweight),
                            reps: Some(8.0),
                            ..SetValues::default()
                        },
                    )],
                },
            )]),
            validation_errors: Vec::new(),
        });

        let index = build_index(&log);
        assert_approx_eq!(index[&key("Chin-Up")].total_volume, 0.0);
    }
}
