use crate::{FlatLog, NestedLog, PerformanceItem, PerformanceLog, PerformanceSet, SetValues};

/// Check a performance log against the structural rules of its schema
/// generation. Advisory only: findings are returned as a list (empty means
/// valid) and never abort an export.
#[must_use]
pub fn validate(log: &PerformanceLog) -> Vec<String> {
    match log {
        PerformanceLog::Flat(flat) => validate_flat(flat),
        PerformanceLog::Nested(nested) => validate_nested(nested),
    }
}

fn validate_flat(log: &FlatLog) -> Vec<String> {
    let mut errors = Vec::new();
    validate_metadata(&log.workout_file, &log.timestamp, &mut errors);

    for (key, exercise) in &log.exercises {
        if exercise.name.trim().is_empty() {
            errors.push(format!("{key}: name missing"));
        }
        if exercise.sets.is_empty() {
            errors.push(format!("{key}: sets missing"));
        }
        for set in &exercise.sets {
            validate_set(&format!("{key} set {}", set.set), set, &mut errors);
        }
    }

    errors
}

fn validate_nested(log: &NestedLog) -> Vec<String> {
    let mut errors = Vec::new();
    validate_metadata(&log.workout_file, &log.timestamp, &mut errors);

    for (section_index, section) in log.sections.iter().enumerate() {
        if section.section_type.trim().is_empty() {
            errors.push(format!("section {section_index}: type missing"));
        }
        if section.items.is_empty() {
            errors.push(format!("section {section_index}: items empty"));
        }
        for (item_index, item) in section.items.iter().enumerate() {
            let path = format!("section {section_index} item {item_index}");
            if item.name().trim().is_empty() {
                errors.push(format!("{path}: name missing"));
            }
            match item {
                PerformanceItem::Exercise { sets, .. } => {
                    if sets.is_empty() {
                        errors.push(format!("{path}: sets empty"));
                    }
                    for set in sets {
                        validate_set(&format!("{path} set {}", set.set), set, &mut errors);
                    }
                }
                PerformanceItem::Superset { rounds, .. }
                | PerformanceItem::Circuit { rounds, .. } => {
                    if rounds.is_empty() {
                        errors.push(format!("{path}: rounds empty"));
                    }
                    for (round_index, round) in rounds.iter().enumerate() {
                        let expected = u32::try_from(round_index).unwrap_or(u32::MAX) + 1;
                        if round.round == 0 {
                            errors.push(format!("{path} round {round_index}: invalid round number"));
                        } else if round.round != expected {
                            errors.push(format!(
                                "{path}: non-sequential round number {} (expected {expected})",
                                round.round
                            ));
                        }
                        if round.exercises.is_empty() {
                            errors.push(format!(
                                "{path} round {}: exercises empty",
                                round.round
                            ));
                        }
                        for entry in &round.exercises {
                            validate_values(
                                &format!("{path} round {} {}", round.round, entry.key),
                                &entry.values,
                                &mut errors,
                            );
                        }
                    }
                }
            }
        }
    }

    errors
}

fn validate_metadata(workout_file: &str, timestamp: &str, errors: &mut Vec<String>) {
    if workout_file.trim().is_empty() {
        errors.push("workoutFile missing".to_string());
    }
    if timestamp.trim().is_empty() {
        errors.push("timestamp missing".to_string());
    }
}

fn validate_set(path: &str, set: &PerformanceSet, errors: &mut Vec<String>) {
    if set.set == 0 {
        errors.push(format!("{path}: invalid set index"));
    }
    validate_values(path, &set.values, errors);
}

fn validate_values(path: &str, values: &SetValues, errors: &mut Vec<String>) {
    if let Some(rpe) = values.rpe {
        if !(0.0..=10.0).contains(&rpe) {
            errors.push(format!("{path}: rpe out of range"));
        }
    }
}
