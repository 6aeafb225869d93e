use chrono::Local;
use log::{error, warn};

use crate::{
    EnteredValues, ParsedSession, PerformanceLog, ReadError, WriteError, collect, validate,
};

/// Persistence seam for performance logs. Implementations store the log
/// verbatim, keyed by the session's workout file identifier, and return it
/// unchanged on read.
pub trait LogRepository {
    fn read_log(&self, workout_file: &str) -> Result<Option<PerformanceLog>, ReadError>;
    fn write_log(&self, workout_file: &str, log: &PerformanceLog) -> Result<(), WriteError>;
}

pub struct Service<R> {
    repository: R,
}

impl<R> Service<R>
where
    R: LogRepository,
{
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// Collect a performance log, validate it, and store it. Validation
    /// findings are attached to the exported log and logged as warnings;
    /// neither they nor a storage failure block returning the log.
    pub fn export_log(
        &self,
        session: &ParsedSession,
        entered: &EnteredValues,
        workout_file: &str,
    ) -> PerformanceLog {
        let timestamp = Local::now().to_rfc3339();
        let mut log = collect(session, entered, workout_file, &timestamp);

        let errors = validate(&log);
        if !errors.is_empty() {
            for finding in &errors {
                warn!("performance log validation: {finding}");
            }
            log.attach_validation_errors(errors);
        }

        if let Err(err) = self.repository.write_log(log.workout_file(), &log) {
            error!(
                "failed to store performance log for {}: {err}",
                log.workout_file()
            );
        }

        log
    }

    pub fn read_log(&self, workout_file: &str) -> Result<Option<PerformanceLog>, ReadError> {
        self.repository.read_log(workout_file)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::BTreeMap};

    use pretty_assertions::assert_eq;

    use crate::{ExerciseKey, RawSetInput, StorageError, parse_session};

    use super::*;

    #[derive(Default)]
    struct InMemoryRepository {
        logs: RefCell<BTreeMap<String, PerformanceLog>>,
        fail_writes: bool,
    }

    impl LogRepository for InMemoryRepository {
        fn read_log(&self, workout_file: &str) -> Result<Option<PerformanceLog>, ReadError> {
            Ok(self.logs.borrow().get(workout_file).cloned())
        }

        fn write_log(&self, workout_file: &str, log: &PerformanceLog) -> Result<(), WriteError> {
            if self.fail_writes {
                return Err(StorageError::NoConnection.into());
            }
            self.logs
                .borrow_mut()
                .insert(workout_file.to_string(), log.clone());
            Ok(())
        }
    }

    fn session_and_entries() -> (ParsedSession, EnteredValues) {
        let session = parse_session(
            r#"{
              "sections": [
                {
                  "type": "Strength",
                  "title": "Main",
                  "items": [
                    { "kind": "exercise", "name": "Goblet Squat", "prescription": { "sets": 2, "reps": 10 } }
                  ]
                }
              ]
            }"#,
        );
        let mut entered = EnteredValues::new();
        entered.insert(
            ExerciseKey::from_name("Goblet Squat").unwrap(),
            1,
            RawSetInput {
                weight: Some("50".to_string()),
                reps: Some("10".to_string()),
                ..RawSetInput::default()
            },
        );
        (session, entered)
    }

    #[test]
    fn test_export_log_stores_and_returns() {
        let service = Service::new(InMemoryRepository::default());
        let (session, entered) = session_and_entries();

        let log = service.export_log(&session, &entered, "../workouts/lower_a.json");
        assert_eq!(log.workout_file(), "workouts/lower_a.json");
        assert!(log.validation_errors().is_empty());
        assert!(!log.timestamp().is_empty());

        let stored = service.read_log("workouts/lower_a.json").unwrap();
        assert_eq!(stored, Some(log));
    }

    #[test]
    fn test_storage_failure_does_not_block_export() {
        let repository = InMemoryRepository {
            fail_writes: true,
            ..InMemoryRepository::default()
        };
        let service = Service::new(repository);
        let (session, entered) = session_and_entries();

        let log = service.export_log(&session, &entered, "workouts/lower_a.json");
        assert_eq!(log.workout_file(), "workouts/lower_a.json");
        assert_eq!(service.read_log("workouts/lower_a.json").unwrap(), None);
    }
}
