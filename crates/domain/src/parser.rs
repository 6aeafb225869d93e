use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::{
    DisplayMode, ExerciseEntry, ExerciseKey, ExerciseRef, GroupEntry, GroupKind, LogType,
    Multiplier, ParsedSession, Prescription, Reps, Scalar, Section, SessionItem, SessionSource,
    first_number, parse_distance, parse_time_to_sec, parse_weight_spec, units,
};

static NUMBERING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+[).\-]\s*").expect("valid numbering pattern"));
static NAME_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[([^\]]+)\]\(([^)]+)\)").expect("valid name link pattern"));
static EXERCISE_SLUG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)exercises/([\w\-]+)\.(?:json|md)").expect("valid slug pattern")
});
static EXERCISE_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]*)\]\(((?:https?://[^)\s]+/)?(?:\.\./|\./)?exercises/[\w\-]+\.(?:md|json))\)")
        .expect("valid exercise link pattern")
});
static SETS_X_REPS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d{1,2})\s*[x×]\s*(\d{1,3})").expect("valid sets pattern"));
static SETS_OF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,2})\s*sets?\s*(?:of|x)?\s*(\d{1,3})").expect("valid sets-of pattern")
});
static REPS_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d{1,3})\s*reps?").expect("valid reps pattern"));
static WEIGHT_UNIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,3}(?:\.\d+)?)\s*(?:lbs?|kg)").expect("valid weight pattern")
});
static RPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)RPE\s*(\d{1,2}(?:\.\d+)?)").expect("valid rpe pattern"));
static ROUNDS_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*[–\-]\s*(\d+)\s*rounds?").expect("valid rounds range pattern")
});
static ROUNDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*rounds?").expect("valid rounds pattern"));
static FENCED_JSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json[^\n]*\n(.*?)\n```").expect("valid fenced json pattern")
});
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#\s+(.+)$").expect("valid heading pattern"));
static ENDURANCE_DOC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:run|jog|walk|tempo|bike|cycle|ride|rower|rowing|erg|swim)\b")
        .expect("valid endurance pattern")
});
static DISTANCE_MILES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:mi|miles?)\b").expect("valid distance pattern")
});
static TIME_COLON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2}):(\d{2})(?::(\d{2}))?\b").expect("valid colon time pattern")
});
static TIME_MINUTES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3})\s*(?:min|minutes)\b").expect("valid minutes pattern")
});

/// Parse a session definition in either encoding. Total: malformed input
/// degrades to an empty session; the caller decides how to surface that.
#[must_use]
pub fn parse_session(raw: &str) -> ParsedSession {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        if is_structured_session(&value) {
            return parse_structured(&value);
        }
        return ParsedSession::empty(SessionSource::Structured);
    }
    parse_legacy(raw)
}

/// The ordered exercise references of a session definition.
#[must_use]
pub fn extract_exercises(raw: &str) -> Vec<ExerciseRef> {
    parse_session(raw).exercises
}

/// Prescriptions by exercise key, expanded to one row per set.
#[must_use]
pub fn parse_prescriptions(raw: &str) -> BTreeMap<ExerciseKey, Vec<Prescription>> {
    parse_session(raw).prescriptions
}

fn is_structured_session(value: &Value) -> bool {
    value.get("sections").is_some_and(Value::is_array)
}

// ---------------------------------------------------------------------------
// Structured encoding
// ---------------------------------------------------------------------------

fn parse_structured(root: &Value) -> ParsedSession {
    let mut session = ParsedSession::empty(SessionSource::Structured);
    session.title = text_field(root, "title");

    let Some(raw_sections) = root.get("sections").and_then(Value::as_array) else {
        return session;
    };

    for raw_section in raw_sections {
        let section_type = text_field(raw_section, "type").unwrap_or_default();
        let title = text_field(raw_section, "title").unwrap_or_default();
        let notes = text_field(raw_section, "notes");
        let display_mode = match text_field(raw_section, "displayMode").as_deref() {
            Some("log") => DisplayMode::Log,
            Some("reference") => DisplayMode::Reference,
            _ => DisplayMode::infer(&section_type, &title),
        };
        let rounds_hint = raw_section
            .get("rounds")
            .and_then(Value::as_f64)
            .map(floor_u32)
            .filter(|&n| n > 0)
            .or_else(|| parse_rounds_hint(&title))
            .or_else(|| notes.as_deref().and_then(parse_rounds_hint));

        let mut items = Vec::new();
        for raw_item in raw_section
            .get("items")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            if let Some(item) = parse_item(raw_item, rounds_hint, &mut session) {
                items.push(item);
            }
        }

        session.sections.push(Section {
            section_type,
            title,
            notes,
            display_mode,
            items,
        });
    }

    session
}

fn parse_item(
    raw_item: &Value,
    rounds_hint: Option<u32>,
    session: &mut ParsedSession,
) -> Option<SessionItem> {
    match text_field(raw_item, "kind").as_deref() {
        Some("superset") => parse_group(raw_item, GroupKind::Superset, rounds_hint, session)
            .map(SessionItem::Group),
        Some("circuit") => {
            parse_group(raw_item, GroupKind::Circuit, rounds_hint, session).map(SessionItem::Group)
        }
        Some("note") => {
            let text = text_field(raw_item, "text").or_else(|| text_field(raw_item, "name"))?;
            Some(SessionItem::Note(text))
        }
        // Exercises may be declared explicitly or as a bare named record.
        _ => parse_exercise(raw_item, rounds_hint, session).map(SessionItem::Exercise),
    }
}

fn parse_group(
    raw_item: &Value,
    kind: GroupKind,
    rounds_hint: Option<u32>,
    session: &mut ParsedSession,
) -> Option<GroupEntry> {
    let name = text_field(raw_item, "name").unwrap_or_else(|| {
        match kind {
            GroupKind::Superset => "Superset",
            GroupKind::Circuit => "Circuit",
        }
        .to_string()
    });
    let notes = text_field(raw_item, "notes");
    let rounds = raw_item
        .get("rounds")
        .and_then(Value::as_f64)
        .map(floor_u32)
        .filter(|&n| n > 0)
        .or_else(|| notes.as_deref().and_then(parse_rounds_hint))
        .or(rounds_hint);

    let mut children = Vec::new();
    for raw_child in raw_item
        .get("children")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        if let Some(child) = parse_exercise(raw_child, rounds, session) {
            children.push(child);
        }
    }
    if children.is_empty() {
        return None;
    }

    let rest_between_rounds = children
        .last()
        .and_then(|child| child.prescription.rest_seconds);

    Some(GroupEntry {
        kind,
        name,
        notes,
        children,
        rounds,
        rest_between_rounds,
    })
}

fn parse_exercise(
    raw_item: &Value,
    rounds_hint: Option<u32>,
    session: &mut ParsedSession,
) -> Option<ExerciseEntry> {
    let raw_name = text_field(raw_item, "name").or_else(|| text_field(raw_item, "exercise"))?;
    let (name, derived_key, name_link) = clean_name(&raw_name)?;
    // An explicitly declared stable key wins over slug derivation.
    let key = text_field(raw_item, "key")
        .and_then(|k| ExerciseKey::from_name(&k).ok())
        .unwrap_or(derived_key);
    let link = text_field(raw_item, "link").or(name_link);

    let cfg = raw_item.get("prescription").unwrap_or(raw_item);
    let (prescription, reps_per_set) = parse_prescription_fields(cfg);

    let cues = raw_item
        .get("cues")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let notes = text_field(raw_item, "notes");
    let log_type = text_field(raw_item, "logType").and_then(|s| s.parse::<LogType>().ok());
    let loggable = raw_item
        .get("loggable")
        .and_then(Value::as_bool)
        .unwrap_or(true);

    let rows = expand_rows(&prescription, reps_per_set.as_deref(), rounds_hint);
    if !rows.is_empty() {
        session.prescriptions.insert(key.clone(), rows);
    }
    if !session.exercises.iter().any(|e| e.key == key) {
        session.exercises.push(ExerciseRef {
            name: name.clone(),
            key: key.clone(),
            link: link.clone(),
        });
    }

    Some(ExerciseEntry {
        name,
        key,
        link,
        prescription,
        cues,
        notes,
        log_type,
        loggable,
    })
}

/// Extract the canonical prescription from a raw record, honoring the
/// original schema's alias fields. A per-set reps array is returned
/// separately since it expands to differing rows.
fn parse_prescription_fields(cfg: &Value) -> (Prescription, Option<Vec<u32>>) {
    let mut prescription = Prescription::default();
    let mut reps_per_set = None;

    prescription.sets = match cfg.get("sets") {
        Some(Value::Number(n)) => n.as_f64().map(floor_u32),
        Some(Value::String(s)) => first_number(s).map(floor_u32),
        _ => None,
    };

    match cfg.get("reps") {
        Some(Value::Array(values)) => {
            let list: Vec<u32> = values
                .iter()
                .filter_map(|v| match v {
                    Value::Number(n) => n.as_f64().map(floor_u32),
                    Value::String(s) => first_number(s).map(floor_u32),
                    _ => None,
                })
                .map(|r| r.max(1))
                .collect();
            if !list.is_empty() {
                reps_per_set = Some(list);
            }
        }
        Some(value) => {
            if let Some(scalar) = Scalar::from_json(value) {
                prescription.reps = Some(Reps::parse(&scalar));
            }
        }
        None => {}
    }

    for field in ["weight", "load"] {
        if let Some(scalar) = scalar_field(cfg, field) {
            let spec = parse_weight_spec(&scalar);
            if spec.weight.is_some() || spec.multiplier == Some(Multiplier::Bodyweight) {
                prescription.weight = spec.weight;
            }
            if prescription.multiplier.is_none() {
                prescription.multiplier = spec.multiplier;
            }
        }
    }

    prescription.rpe = scalar_field(cfg, "rpe").as_ref().and_then(parse_rpe);
    prescription.time_seconds = scalar_field(cfg, "timeSeconds")
        .or_else(|| scalar_field(cfg, "time"))
        .as_ref()
        .and_then(parse_time_to_sec);
    prescription.hold_seconds = scalar_field(cfg, "holdSeconds")
        .or_else(|| scalar_field(cfg, "hold"))
        .as_ref()
        .and_then(parse_time_to_sec);
    prescription.rest_seconds = scalar_field(cfg, "restSeconds")
        .or_else(|| scalar_field(cfg, "restSec"))
        .as_ref()
        .and_then(parse_time_to_sec);

    if let Some(scalar) = scalar_field(cfg, "distanceMiles") {
        prescription.distance_miles = parse_distance(&scalar).miles;
    }
    if let Some(scalar) = scalar_field(cfg, "distanceMeters") {
        prescription.distance_meters = parse_distance(&scalar).meters;
    }
    if let Some(scalar) = scalar_field(cfg, "distance") {
        let distance = parse_distance(&scalar);
        if prescription.distance_miles.is_none() {
            prescription.distance_miles = distance.miles;
        }
        if prescription.distance_meters.is_none() {
            prescription.distance_meters = distance.meters;
        }
    }

    (prescription, reps_per_set)
}

/// One row per set: an explicit per-set reps list wins, then the declared
/// set count (an enclosing round count takes precedence when larger), then
/// a single row if any meaningful parameter is prescribed.
fn expand_rows(
    base: &Prescription,
    reps_per_set: Option<&[u32]>,
    rounds_hint: Option<u32>,
) -> Vec<Prescription> {
    if let Some(list) = reps_per_set {
        return list
            .iter()
            .map(|&value| Prescription {
                reps: Some(Reps::Single {
                    value,
                    display: value.to_string(),
                }),
                ..base.clone()
            })
            .collect();
    }

    let mut count = base.sets.unwrap_or(0);
    if let Some(rounds) = rounds_hint {
        count = count.max(rounds);
    }
    if count == 0 && !base.is_empty() {
        count = 1;
    }
    vec![base.clone(); count as usize]
}

/// Strip leading numbering (`1)`, `2.`, `3 -`) and resolve markdown-style
/// link names, preferring the exercise slug embedded in the URL as the key.
fn clean_name(raw: &str) -> Option<(String, ExerciseKey, Option<String>)> {
    let stripped = NUMBERING_RE.replace(raw, "");
    if let Some(captures) = NAME_LINK_RE.captures(&stripped) {
        let label = captures[1].trim().to_string();
        let url = captures[2].to_string();
        let key_source = EXERCISE_SLUG_RE
            .captures(&url)
            .map_or_else(|| label.clone(), |slug| slug[1].replace('_', "-"));
        let key = ExerciseKey::from_name(&key_source).ok()?;
        return Some((label, key, Some(url)));
    }
    let name = stripped.trim().to_string();
    let key = ExerciseKey::from_name(&name).ok()?;
    Some((name, key, None))
}

fn parse_rounds_hint(text: &str) -> Option<u32> {
    if let Some(captures) = ROUNDS_RANGE_RE.captures(text) {
        let a = captures[1].parse::<u32>().ok()?;
        let b = captures[2].parse::<u32>().ok()?;
        return Some(a.max(b));
    }
    ROUNDS_RE
        .captures(text)
        .and_then(|captures| captures[1].parse::<u32>().ok())
}

fn text_field(value: &Value, name: &str) -> Option<String> {
    value
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

fn scalar_field(value: &Value, name: &str) -> Option<Scalar> {
    value.get(name).and_then(Scalar::from_json)
}

fn parse_rpe(raw: &Scalar) -> Option<f32> {
    #[allow(clippy::cast_possible_truncation)]
    match raw {
        Scalar::Number(n) => Some(*n as f32),
        Scalar::Text(s) => first_number(s).map(|n| n as f32),
    }
}

fn floor_u32(value: f64) -> u32 {
    if value < 0.0 {
        0
    } else {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            value.floor() as u32
        }
    }
}

// ---------------------------------------------------------------------------
// Legacy link-annotated text encoding
// ---------------------------------------------------------------------------

fn parse_legacy(text: &str) -> ParsedSession {
    let mut session = ParsedSession::empty(SessionSource::LegacyText);
    session.title = HEADING_RE
        .captures(text)
        .map(|captures| captures[1].trim().to_string());

    for captures in EXERCISE_LINK_RE.captures_iter(text) {
        let title = captures[1].trim().to_string();
        let Ok(key) = ExerciseKey::from_name(&title) else {
            continue;
        };
        if !session.exercises.iter().any(|e| e.key == key) {
            session.exercises.push(ExerciseRef {
                name: title,
                key,
                link: Some(captures[2].to_string()),
            });
        }
    }

    // A trailing fenced JSON block is authoritative when it parses.
    if let Some(inner) = last_fenced_json(text) {
        if let Ok(value) = serde_json::from_str::<Value>(&inner) {
            let nested = parse_structured(&value);
            if !nested.prescriptions.is_empty() {
                session.prescriptions = nested.prescriptions;
                for exercise in nested.exercises {
                    if !session.exercises.iter().any(|e| e.key == exercise.key) {
                        session.exercises.push(exercise);
                    }
                }
                return session;
            }
        }
    }

    parse_legacy_lines(text, &mut session);
    parse_endurance_fallback(text, &mut session);
    session
}

fn parse_legacy_lines(text: &str, session: &mut ParsedSession) {
    let lines: Vec<&str> = text.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        let Some(captures) = EXERCISE_LINK_RE.captures(line) else {
            continue;
        };
        let title = captures[1].trim();
        let Ok(key) = ExerciseKey::from_name(title) else {
            continue;
        };

        // Quantity phrases may continue on the following two lines.
        let ctx = format!(
            "{} {} {}",
            line,
            lines.get(i + 1).copied().unwrap_or(""),
            lines.get(i + 2).copied().unwrap_or("")
        );

        let prescription = parse_line_prescription(&ctx);
        let count = prescription
            .sets
            .unwrap_or(u32::from(prescription.reps.is_some()));
        if count > 0 {
            session
                .prescriptions
                .insert(key, vec![prescription; count as usize]);
        }
    }
}

fn parse_line_prescription(ctx: &str) -> Prescription {
    let mut prescription = Prescription::default();

    if let Some(captures) = SETS_X_REPS_RE
        .captures(ctx)
        .or_else(|| SETS_OF_RE.captures(ctx))
    {
        prescription.sets = captures[1].parse::<u32>().ok();
        prescription.reps = captures[2].parse::<u32>().ok().map(|value| Reps::Single {
            value: value.max(1),
            display: captures[2].to_string(),
        });
    } else if let Some(captures) = REPS_ONLY_RE.captures(ctx) {
        prescription.reps = captures[1].parse::<u32>().ok().map(|value| Reps::Single {
            value: value.max(1),
            display: captures[1].to_string(),
        });
    }

    if let Some(captures) = WEIGHT_UNIT_RE.captures(ctx) {
        prescription.weight = captures[1].parse::<f32>().ok();
    }

    let lowered = ctx.to_lowercase();
    if units::bilateral_hint(&lowered) {
        prescription.multiplier = Some(Multiplier::PerSide);
    } else if lowered.contains("bodyweight") {
        prescription.multiplier = Some(Multiplier::Bodyweight);
        prescription.weight = None;
    }

    #[allow(clippy::cast_possible_truncation)]
    if let Some(captures) = RPE_RE.captures(ctx) {
        prescription.rpe = captures[1].parse::<f64>().ok().map(|n| n as f32);
    }

    prescription
}

/// Endurance documents (runs, rides, rows, swims) often carry a single
/// document-level prescription instead of per-exercise lines.
fn parse_endurance_fallback(text: &str, session: &mut ParsedSession) {
    if !ENDURANCE_DOC_RE.is_match(text) {
        return;
    }

    let name = session.title.clone().unwrap_or_else(|| "Run".to_string());
    let Ok(key) = ExerciseKey::from_name(&name) else {
        return;
    };
    if session.prescriptions.contains_key(&key) {
        return;
    }

    let mut prescription = Prescription::default();
    if let Some(captures) = DISTANCE_MILES_RE.captures(text) {
        prescription.distance_miles = captures[1].parse::<f32>().ok();
    }
    #[allow(clippy::cast_possible_truncation)]
    if let Some(captures) = RPE_RE.captures(text) {
        prescription.rpe = captures[1].parse::<f64>().ok().map(|n| n as f32);
    }
    prescription.time_seconds = parse_doc_time(text);

    if prescription.is_empty() {
        return;
    }
    session.prescriptions.insert(key.clone(), vec![prescription]);
    if !session.exercises.iter().any(|e| e.key == key) {
        session.exercises.push(ExerciseRef {
            name,
            key,
            link: None,
        });
    }
}

fn parse_doc_time(text: &str) -> Option<u32> {
    if let Some(captures) = TIME_COLON_RE.captures(text) {
        let a = captures[1].parse::<u32>().ok()?;
        let b = captures[2].parse::<u32>().ok()?;
        return match captures.get(3) {
            Some(s) => {
                let c = s.as_str().parse::<u32>().ok()?;
                Some(a * 3600 + b * 60 + c)
            }
            None => Some(a * 60 + b),
        };
    }
    TIME_MINUTES_RE
        .captures(text)
        .and_then(|captures| captures[1].parse::<u32>().ok())
        .map(|minutes| minutes * 60)
}

fn last_fenced_json(text: &str) -> Option<String> {
    FENCED_JSON_RE
        .captures_iter(text)
        .last()
        .map(|captures| captures[1].to_string())
}
