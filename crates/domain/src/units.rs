use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("valid number pattern"));
static BILATERAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"per\s*hand|each|per\s*side|x2|×2").expect("valid bilateral pattern")
});
static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*[–-]\s*(\d+)$").expect("valid range pattern"));
static MINUTES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3})\s*(?:min|minutes?)").expect("valid minutes pattern"));
static SECONDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3})\s*(?:sec|seconds?)").expect("valid seconds pattern"));
static MILES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*(?:mi|miles?)\b").expect("valid miles pattern"));
static METERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*(?:m|meters?)\b").expect("valid meters pattern")
});

/// Free-form scalar accepted at the ingestion boundary. Prescription fields
/// arrive as JSON numbers or human-authored phrases; everything is narrowed
/// to canonical numeric types before leaving this module.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_f64().map(Scalar::Number),
            serde_json::Value::String(s) => Some(Scalar::Text(s.clone())),
            _ => None,
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

/// How a prescribed weight relates to the load actually moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Multiplier {
    Bodyweight,
    Total,
    PerSide,
}

impl Multiplier {
    #[must_use]
    pub fn factor(self) -> f32 {
        match self {
            Multiplier::Bodyweight => 0.0,
            Multiplier::Total => 1.0,
            Multiplier::PerSide => 2.0,
        }
    }

    /// Narrow a user-entered number to the closed multiplier set.
    #[must_use]
    pub fn from_number(value: f64) -> Option<Self> {
        if value.fract() != 0.0 || !(0.0..=2.0).contains(&value) {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Self::try_from(value as u8).ok()
    }
}

impl From<Multiplier> for u8 {
    fn from(value: Multiplier) -> Self {
        match value {
            Multiplier::Bodyweight => 0,
            Multiplier::Total => 1,
            Multiplier::PerSide => 2,
        }
    }
}

impl TryFrom<u8> for Multiplier {
    type Error = MultiplierError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Multiplier::Bodyweight),
            1 => Ok(Multiplier::Total),
            2 => Ok(Multiplier::PerSide),
            _ => Err(MultiplierError::OutOfRange(value)),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum MultiplierError {
    #[error("Multiplier must be 0 (bodyweight), 1 (total) or 2 (per side), got {0}")]
    OutOfRange(u8),
}

/// Weight magnitude and multiplier extracted from a prescription field.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WeightSpec {
    pub weight: Option<f32>,
    pub multiplier: Option<Multiplier>,
}

/// Parse a weight prescription such as `27.5 lb per hand`, `40 lb`,
/// `bodyweight`, `50 total` or `25 x2`. Numbers pass through unchanged with
/// no multiplier inference; `bodyweight` forces the weight itself absent.
#[must_use]
pub fn parse_weight_spec(raw: &Scalar) -> WeightSpec {
    match raw {
        #[allow(clippy::cast_possible_truncation)]
        Scalar::Number(n) => WeightSpec {
            weight: Some(*n as f32),
            multiplier: None,
        },
        Scalar::Text(text) => {
            let s = text.to_lowercase();
            #[allow(clippy::cast_possible_truncation)]
            let mut weight = first_number(&s).map(|n| n as f32);
            let multiplier = if bilateral_hint(&s) {
                Some(Multiplier::PerSide)
            } else if s.contains("total") {
                Some(Multiplier::Total)
            } else if s.contains("bodyweight") {
                weight = None;
                Some(Multiplier::Bodyweight)
            } else {
                None
            };
            WeightSpec { weight, multiplier }
        }
    }
}

/// Normalized rep prescription. Unparsable input keeps the original text
/// for audit instead of being dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reps {
    Single { value: u32, display: String },
    Range { low: u32, high: u32, display: String },
    Invalid { display: String },
}

impl Reps {
    /// Normalize a rep prescription: numbers are floored and clamped to at
    /// least 1, `low-high` ranges (hyphen or en-dash) get their bounds
    /// swapped when inverted.
    #[must_use]
    pub fn parse(raw: &Scalar) -> Self {
        match raw {
            Scalar::Number(n) => Reps::Single {
                value: floor_min_one(*n),
                display: format_number(*n),
            },
            Scalar::Text(text) => {
                let trimmed = text.trim();
                if let Some(captures) = RANGE_RE.captures(trimmed) {
                    let (Ok(a), Ok(b)) = (captures[1].parse::<u32>(), captures[2].parse::<u32>())
                    else {
                        return Reps::Invalid {
                            display: text.clone(),
                        };
                    };
                    let low = a.min(b).max(1);
                    let high = a.max(b).max(1);
                    if low == high {
                        return Reps::Single {
                            value: low,
                            display: text.clone(),
                        };
                    }
                    return Reps::Range {
                        low,
                        high,
                        display: text.clone(),
                    };
                }
                match trimmed.parse::<u32>() {
                    Ok(value) => Reps::Single {
                        value: value.max(1),
                        display: text.clone(),
                    },
                    Err(_) => Reps::Invalid {
                        display: text.clone(),
                    },
                }
            }
        }
    }

    #[must_use]
    pub fn low(&self) -> Option<u32> {
        match self {
            Reps::Single { value, .. } => Some(*value),
            Reps::Range { low, .. } => Some(*low),
            Reps::Invalid { .. } => None,
        }
    }

    #[must_use]
    pub fn high(&self) -> Option<u32> {
        match self {
            Reps::Single { value, .. } => Some(*value),
            Reps::Range { high, .. } => Some(*high),
            Reps::Invalid { .. } => None,
        }
    }

    #[must_use]
    pub fn is_range(&self) -> bool {
        matches!(self, Reps::Range { .. })
    }

    #[must_use]
    pub fn display(&self) -> &str {
        match self {
            Reps::Single { display, .. }
            | Reps::Range { display, .. }
            | Reps::Invalid { display } => display,
        }
    }
}

/// Parse a duration to whole seconds: plain numbers, `h:mm:ss`/`mm:ss`,
/// `N min`/`N sec` phrasing, or a leading number as a last resort.
#[must_use]
pub fn parse_time_to_sec(raw: &Scalar) -> Option<u32> {
    match raw {
        Scalar::Number(n) => seconds_from_f64(*n),
        Scalar::Text(text) => {
            let s = text.trim().to_lowercase();
            if s.is_empty() {
                return None;
            }
            if let Some(sec) = parse_hms(&s) {
                return Some(sec);
            }
            if let Some(captures) = MINUTES_RE.captures(&s) {
                if let Ok(minutes) = captures[1].parse::<u32>() {
                    return Some(minutes * 60);
                }
            }
            if let Some(captures) = SECONDS_RE.captures(&s) {
                if let Ok(seconds) = captures[1].parse::<u32>() {
                    return Some(seconds);
                }
            }
            first_number(&s).and_then(seconds_from_f64)
        }
    }
}

/// Parse colon-delimited time: `ss`, `mm:ss` or `hh:mm:ss`. Extra leading
/// colon groups are forgiven by using the last three parts.
#[must_use]
pub fn parse_hms(text: &str) -> Option<u32> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }
    if !s.contains(':') {
        return s.parse::<u32>().ok();
    }
    let parts: Vec<&str> = s.split(':').collect();
    match parts.len() {
        2 => {
            let m = parts[0].parse::<u32>().ok()?;
            let sec = parts[1].parse::<u32>().ok()?;
            Some(m * 60 + sec)
        }
        n if n >= 3 => {
            let h = parts[n - 3].parse::<u32>().ok()?;
            let m = parts[n - 2].parse::<u32>().ok()?;
            let sec = parts[n - 1].parse::<u32>().ok()?;
            Some(h * 3600 + m * 60 + sec)
        }
        _ => None,
    }
}

/// Format whole seconds as zero-padded `hh:mm:ss`.
#[must_use]
pub fn seconds_to_display(total_seconds: u32) -> String {
    let h = total_seconds / 3600;
    let m = total_seconds % 3600 / 60;
    let s = total_seconds % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

/// Distance with the unit that actually matched. The other unit is never
/// guessed; a bare number is treated as miles.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Distance {
    pub miles: Option<f32>,
    pub meters: Option<f32>,
}

#[must_use]
pub fn parse_distance(raw: &Scalar) -> Distance {
    match raw {
        #[allow(clippy::cast_possible_truncation)]
        Scalar::Number(n) => Distance {
            miles: Some(*n as f32),
            meters: None,
        },
        Scalar::Text(text) => {
            let s = text.to_lowercase();
            #[allow(clippy::cast_possible_truncation)]
            if let Some(captures) = MILES_RE.captures(&s) {
                Distance {
                    miles: captures[1].parse::<f32>().ok(),
                    meters: None,
                }
            } else if let Some(captures) = METERS_RE.captures(&s) {
                Distance {
                    miles: None,
                    meters: captures[1].parse::<f32>().ok(),
                }
            } else {
                Distance {
                    miles: first_number(&s).map(|n| n as f32),
                    meters: None,
                }
            }
        }
    }
}

/// Bilateral phrasing (`per hand`, `each`, `per side`, `x2`) in a
/// lowercased phrase.
pub(crate) fn bilateral_hint(text: &str) -> bool {
    BILATERAL_RE.is_match(text)
}

/// First numeric token in a phrase, e.g. `27.5` in `27.5 lb per hand`.
#[must_use]
pub fn first_number(text: &str) -> Option<f64> {
    NUMBER_RE
        .captures(text)
        .and_then(|captures| captures[1].parse::<f64>().ok())
}

fn floor_min_one(value: f64) -> u32 {
    let floored = value.floor();
    if floored < 1.0 {
        1
    } else {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            floored as u32
        }
    }
}

fn seconds_from_f64(value: f64) -> Option<u32> {
    if value < 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some(value.floor() as u32)
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        #[allow(clippy::cast_possible_truncation)]
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("50 lb per hand", Some(50.0), Some(Multiplier::PerSide))]
    #[case("27.5 lb each", Some(27.5), Some(Multiplier::PerSide))]
    #[case("30 per side", Some(30.0), Some(Multiplier::PerSide))]
    #[case("25 x2", Some(25.0), Some(Multiplier::PerSide))]
    #[case("25 ×2", Some(25.0), Some(Multiplier::PerSide))]
    #[case("135 total", Some(135.0), Some(Multiplier::Total))]
    #[case("bodyweight", None, Some(Multiplier::Bodyweight))]
    #[case("bodyweight (add 10 if easy)", None, Some(Multiplier::Bodyweight))]
    #[case("40 lb", Some(40.0), None)]
    #[case("heavy", None, None)]
    fn test_parse_weight_spec_text(
        #[case] raw: &str,
        #[case] weight: Option<f32>,
        #[case] multiplier: Option<Multiplier>,
    ) {
        assert_eq!(
            parse_weight_spec(&Scalar::from(raw)),
            WeightSpec { weight, multiplier }
        );
    }

    #[test]
    fn test_parse_weight_spec_number() {
        assert_eq!(
            parse_weight_spec(&Scalar::from(45.0)),
            WeightSpec {
                weight: Some(45.0),
                multiplier: None,
            }
        );
    }

    #[rstest]
    #[case("8-12", Some(8), Some(12), true)]
    #[case("12-8", Some(8), Some(12), true)]
    #[case("8–12", Some(8), Some(12), true)]
    #[case("10-10", Some(10), Some(10), false)]
    #[case("0-0", Some(1), Some(1), false)]
    #[case("15", Some(15), Some(15), false)]
    #[case(" 15 ", Some(15), Some(15), false)]
    #[case("AMRAP", None, None, false)]
    #[case("8 to 12", None, None, false)]
    fn test_reps_parse_text(
        #[case] raw: &str,
        #[case] low: Option<u32>,
        #[case] high: Option<u32>,
        #[case] is_range: bool,
    ) {
        let reps = Reps::parse(&Scalar::from(raw));
        assert_eq!(reps.low(), low);
        assert_eq!(reps.high(), high);
        assert_eq!(reps.is_range(), is_range);
        assert_eq!(reps.display(), raw);
    }

    #[rstest]
    #[case(8.0, 8)]
    #[case(8.7, 8)]
    #[case(0.0, 1)]
    #[case(-3.0, 1)]
    fn test_reps_parse_number(#[case] raw: f64, #[case] expected: u32) {
        let reps = Reps::parse(&Scalar::from(raw));
        assert_eq!(reps.low(), Some(expected));
        assert!(!reps.is_range());
    }

    #[rstest]
    #[case(Scalar::from(90.0), Some(90))]
    #[case(Scalar::from("90"), Some(90))]
    #[case(Scalar::from("1:30"), Some(90))]
    #[case(Scalar::from("1:02:03"), Some(3723))]
    #[case(Scalar::from("0:1:02:03"), Some(3723))]
    #[case(Scalar::from("5 min"), Some(300))]
    #[case(Scalar::from("12 minutes"), Some(720))]
    #[case(Scalar::from("45 sec"), Some(45))]
    #[case(Scalar::from("rest 30 seconds"), Some(30))]
    #[case(Scalar::from("90.5"), Some(90))]
    #[case(Scalar::from("soon"), None)]
    #[case(Scalar::from(""), None)]
    #[case(Scalar::from(-5.0), None)]
    fn test_parse_time_to_sec(#[case] raw: Scalar, #[case] expected: Option<u32>) {
        assert_eq!(parse_time_to_sec(&raw), expected);
    }

    #[rstest]
    #[case(0, "00:00:00")]
    #[case(90, "00:01:30")]
    #[case(3723, "01:02:03")]
    fn test_seconds_to_display(#[case] seconds: u32, #[case] expected: &str) {
        assert_eq!(seconds_to_display(seconds), expected);
    }

    #[test]
    fn test_time_display_round_trip() {
        for raw in ["00:45:00", "01:02:03", "10:00:00"] {
            let seconds = parse_hms(raw).unwrap();
            assert_eq!(seconds_to_display(seconds), raw);
        }
    }

    #[rstest]
    #[case(Scalar::from("3 mi"), Some(3.0), None)]
    #[case(Scalar::from("3.1 miles"), Some(3.1), None)]
    #[case(Scalar::from("400 m"), None, Some(400.0))]
    #[case(Scalar::from("800 meters"), None, Some(800.0))]
    #[case(Scalar::from(2.5), Some(2.5), None)]
    #[case(Scalar::from("5"), Some(5.0), None)]
    #[case(Scalar::from("around the block"), None, None)]
    fn test_parse_distance(
        #[case] raw: Scalar,
        #[case] miles: Option<f32>,
        #[case] meters: Option<f32>,
    ) {
        assert_eq!(parse_distance(&raw), Distance { miles, meters });
    }

    #[rstest]
    #[case(0.0, Some(Multiplier::Bodyweight))]
    #[case(1.0, Some(Multiplier::Total))]
    #[case(2.0, Some(Multiplier::PerSide))]
    #[case(3.0, None)]
    #[case(1.5, None)]
    fn test_multiplier_from_number(#[case] raw: f64, #[case] expected: Option<Multiplier>) {
        assert_eq!(Multiplier::from_number(raw), expected);
    }
}
