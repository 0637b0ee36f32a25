//! A single consultation: cast, optionally interpret, optionally save.
//!
//! `Consultation` owns the reading in progress together with its
//! interpretation status and whether it has reached the journal yet.

use crate::error::APOLOGY_MESSAGE;
use crate::interpret::{InterpretationRequest, Interpreter};
use crate::journal::JournalStore;
use crate::table::ReferenceTable;
use crate::types::Reading;
use crate::{Error, Result};
use rand::Rng;

/// Outcome of asking for an interpretation of the current reading
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum InterpretationStatus {
    #[default]
    NotRequested,
    Ready,
    /// The service failed; holds the message shown instead
    Failed(String),
}

/// State of one consultation with the oracle
pub struct Consultation<'t> {
    table: &'t ReferenceTable,
    reading: Option<Reading>,
    status: InterpretationStatus,
    saved: bool,
}

impl<'t> Consultation<'t> {
    pub fn new(table: &'t ReferenceTable) -> Self {
        Self {
            table,
            reading: None,
            status: InterpretationStatus::NotRequested,
            saved: false,
        }
    }

    /// Cast a new reading, replacing any previous one
    ///
    /// On error the previous reading is kept untouched.
    pub fn cast<R: Rng + ?Sized>(&mut self, question: &str, rng: &mut R) -> Result<&Reading> {
        let reading = Reading::build(question, self.table, rng)?;
        Ok(self.replace(reading))
    }

    /// Adopt an already assembled reading as the current one
    pub fn replace(&mut self, reading: Reading) -> &Reading {
        self.status = InterpretationStatus::NotRequested;
        self.saved = false;
        self.reading.insert(reading)
    }

    pub fn reading(&self) -> Option<&Reading> {
        self.reading.as_ref()
    }

    pub fn status(&self) -> &InterpretationStatus {
        &self.status
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    /// Ask `interpreter` about the current reading
    ///
    /// A failing service is not an error here: the reading stays intact and
    /// the status records the apology message.
    pub fn interpret(&mut self, interpreter: &dyn Interpreter) -> Result<&InterpretationStatus> {
        let reading = self
            .reading
            .as_mut()
            .ok_or_else(|| Error::InvalidInput("no reading has been cast yet".into()))?;

        let request = InterpretationRequest::from(&*reading);
        let outcome = interpreter
            .interpret(&request)
            .and_then(|text| reading.attach_interpretation(text));
        self.status = match outcome {
            Ok(()) => InterpretationStatus::Ready,
            Err(e) => {
                tracing::warn!("Interpretation failed: {}", e);
                InterpretationStatus::Failed(APOLOGY_MESSAGE.to_string())
            }
        };
        Ok(&self.status)
    }

    /// Append the current reading to `store`
    ///
    /// Returns `Ok(false)` when this reading was already saved.
    pub fn save(&mut self, store: &mut dyn JournalStore) -> Result<bool> {
        let reading = self
            .reading
            .as_ref()
            .ok_or_else(|| Error::InvalidInput("no reading has been cast yet".into()))?;

        if self.saved {
            tracing::debug!("Reading already saved, skipping");
            return Ok(false);
        }

        store.append(reading)?;
        self.saved = true;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_journal::CsvJournal;
    use crate::journal::load_readings;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::Cell;
    use tempfile::TempDir;

    struct StubInterpreter {
        reply: Option<&'static str>,
        calls: Cell<usize>,
    }

    impl StubInterpreter {
        fn answering(reply: &'static str) -> Self {
            Self {
                reply: Some(reply),
                calls: Cell::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                calls: Cell::new(0),
            }
        }
    }

    impl Interpreter for StubInterpreter {
        fn interpret(&self, request: &InterpretationRequest) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            assert!(!request.question.is_empty());
            self.reply
                .map(str::to_string)
                .ok_or_else(|| Error::Interpretation("service unavailable".into()))
        }
    }

    fn table() -> &'static ReferenceTable {
        ReferenceTable::bundled().unwrap()
    }

    #[test]
    fn test_new_consultation_is_empty() {
        let consultation = Consultation::new(table());
        assert!(consultation.reading().is_none());
        assert_eq!(consultation.status(), &InterpretationStatus::NotRequested);
        assert!(!consultation.is_saved());
    }

    #[test]
    fn test_empty_question_keeps_previous_reading() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut consultation = Consultation::new(table());
        consultation.cast("First question", &mut rng).unwrap();

        let result = consultation.cast("   ", &mut rng);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(consultation.reading().unwrap().question, "First question");
    }

    #[test]
    fn test_interpretation_success_attaches_text() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut consultation = Consultation::new(table());
        consultation.cast("Where am I headed?", &mut rng).unwrap();

        let stub = StubInterpreter::answering("Patience.");
        let status = consultation.interpret(&stub).unwrap();
        assert_eq!(status, &InterpretationStatus::Ready);
        assert_eq!(
            consultation.reading().unwrap().interpretation.as_deref(),
            Some("Patience.")
        );
        assert_eq!(stub.calls.get(), 1);
    }

    #[test]
    fn test_interpretation_failure_keeps_reading() {
        crate::logging::init_test();
        let mut rng = StdRng::seed_from_u64(5);
        let mut consultation = Consultation::new(table());
        let cast = consultation.cast("Where am I headed?", &mut rng).unwrap().cast;

        let status = consultation.interpret(&StubInterpreter::failing()).unwrap();
        assert_eq!(
            status,
            &InterpretationStatus::Failed(APOLOGY_MESSAGE.to_string())
        );

        let reading = consultation.reading().unwrap();
        assert_eq!(reading.cast, cast);
        assert!(reading.interpretation.is_none());
    }

    #[test]
    fn test_blank_interpretation_counts_as_failure() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut consultation = Consultation::new(table());
        consultation.cast("Anything to add?", &mut rng).unwrap();

        let status = consultation
            .interpret(&StubInterpreter::answering("  \n "))
            .unwrap();
        assert_eq!(
            status,
            &InterpretationStatus::Failed(APOLOGY_MESSAGE.to_string())
        );
        assert!(consultation.reading().unwrap().interpretation.is_none());
    }

    #[test]
    fn test_interpret_without_reading_is_invalid() {
        let mut consultation = Consultation::new(table());
        let stub = StubInterpreter::answering("unused");
        assert!(matches!(
            consultation.interpret(&stub),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(stub.calls.get(), 0);
    }

    #[test]
    fn test_save_once_then_noop() {
        let dir = TempDir::new().unwrap();
        let mut journal = CsvJournal::new(dir.path().join("journal.csv"));
        let mut rng = StdRng::seed_from_u64(11);
        let mut consultation = Consultation::new(table());
        consultation.cast("Should I move?", &mut rng).unwrap();
        consultation
            .interpret(&StubInterpreter::answering("Go gently."))
            .unwrap();

        assert!(consultation.save(&mut journal).unwrap());
        assert!(consultation.is_saved());
        assert!(!consultation.save(&mut journal).unwrap());

        let view = load_readings(&journal, table()).unwrap();
        assert_eq!(view.readings.len(), 1);
        let (_, saved) = &view.readings[0];
        assert_eq!(saved.question, "Should I move?");
        assert_eq!(saved.interpretation.as_deref(), Some("Go gently."));
    }

    #[test]
    fn test_new_cast_resets_state() {
        let dir = TempDir::new().unwrap();
        let mut journal = CsvJournal::new(dir.path().join("journal.csv"));
        let mut rng = StdRng::seed_from_u64(13);
        let mut consultation = Consultation::new(table());

        consultation.cast("One", &mut rng).unwrap();
        consultation
            .interpret(&StubInterpreter::answering("text"))
            .unwrap();
        consultation.save(&mut journal).unwrap();

        consultation.cast("Two", &mut rng).unwrap();
        assert_eq!(consultation.status(), &InterpretationStatus::NotRequested);
        assert!(!consultation.is_saved());
        assert!(consultation.reading().unwrap().interpretation.is_none());

        assert!(consultation.save(&mut journal).unwrap());
        assert_eq!(load_readings(&journal, table()).unwrap().readings.len(), 2);
    }

    #[test]
    fn test_failed_save_can_be_retried() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let mut broken = CsvJournal::new(blocker.join("journal.csv"));

        let mut rng = StdRng::seed_from_u64(17);
        let mut consultation = Consultation::new(table());
        consultation.cast("Will it keep?", &mut rng).unwrap();

        assert!(matches!(
            consultation.save(&mut broken),
            Err(Error::Persistence(_))
        ));
        assert!(!consultation.is_saved());

        let mut journal = CsvJournal::new(dir.path().join("journal.csv"));
        assert!(consultation.save(&mut journal).unwrap());
    }
}
