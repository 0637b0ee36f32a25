//! Assembling a reading from a question and a cast.

use crate::casting::{cast_lines, resolve_hexagram_numbers, resolve_signatures};
use crate::table::ReferenceTable;
use crate::types::{Cast, HexagramRecord, LineText, Reading};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rand::Rng;

impl Reading {
    /// Cast six lines for `question` and resolve them against `table`
    ///
    /// Empty (or whitespace-only) questions are rejected before any lines
    /// are cast.
    pub fn build<R: Rng + ?Sized>(
        question: &str,
        table: &ReferenceTable,
        rng: &mut R,
    ) -> Result<Self> {
        let question = validate_question(question)?;
        let cast = cast_lines(rng);
        let reading = Self::from_cast(question, cast, table, Utc::now())?;

        tracing::info!(
            "Cast {} for question, primary {} secondary {:?}",
            reading.cast,
            reading.primary.number,
            reading.secondary.as_ref().map(|h| h.number)
        );
        Ok(reading)
    }

    /// Resolve a known cast into a reading
    pub fn from_cast(
        question: &str,
        cast: Cast,
        table: &ReferenceTable,
        cast_at: DateTime<Utc>,
    ) -> Result<Self> {
        let signatures = resolve_signatures(&cast);
        let pair = resolve_hexagram_numbers(&signatures, table.signature_index())?;

        let primary = record_for(table, pair.primary)?;
        let secondary = pair
            .secondary
            .map(|number| record_for(table, number))
            .transpose()?;

        Ok(Reading {
            question: question.to_string(),
            cast,
            primary,
            secondary,
            changing_lines: signatures.changing_lines,
            cast_at,
            interpretation: None,
        })
    }

    /// Set (or replace) the interpretation text
    ///
    /// Blank text is rejected as `InvalidInput` and leaves the field as it was.
    pub fn attach_interpretation(&mut self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("interpretation text is empty".into()));
        }
        if self.interpretation.is_some() {
            tracing::debug!("Replacing existing interpretation");
        }
        self.interpretation = Some(text);
        Ok(())
    }

    /// The cast after its changing lines have settled
    pub fn secondary_cast(&self) -> Option<Cast> {
        self.cast.secondary()
    }

    /// Primary-hexagram texts of the changing lines, with their positions
    pub fn changing_line_texts(&self) -> Vec<(usize, &LineText)> {
        self.changing_lines
            .iter()
            .filter_map(|&i| self.primary.line(i).map(|text| (i, text)))
            .collect()
    }
}

/// Trim a question and reject it when nothing is left
pub fn validate_question(question: &str) -> Result<&str> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("question must not be empty".into()));
    }
    Ok(trimmed)
}

fn record_for(table: &ReferenceTable, number: u8) -> Result<HexagramRecord> {
    table.get(number).cloned().ok_or_else(|| {
        Error::Reconstruction(format!("hexagram {} is not in the reference table", number))
    })
}
