#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod collector;
mod error;
mod index;
mod parser;
mod performance;
mod service;
mod session;
mod units;
mod validator;

pub use collector::{EnteredValues, RawSetInput, collect, normalize_workout_file};
pub use error::{ReadError, StorageError, WriteError};
pub use index::build_index;
pub use parser::{extract_exercises, parse_prescriptions, parse_session};
pub use performance::{
    ExerciseIndexEntry, FlatLog, NestedLog, PerformanceItem, PerformanceLog, PerformanceSection,
    PerformanceSet, PerformedExercise, Round, RoundEntry, SetValues,
};
pub use service::{LogRepository, Service};
pub use session::{
    DisplayMode, ExerciseEntry, ExerciseKey, ExerciseKeyError, ExerciseRef, GroupEntry, GroupKind,
    LogType, ParsedSession, Prescription, Section, SessionItem, SessionSource,
};
pub use units::{
    Distance, Multiplier, MultiplierError, Reps, Scalar, WeightSpec, first_number, parse_distance,
    parse_hms, parse_time_to_sec, parse_weight_spec, seconds_to_display,
};
pub use validator::validate;
