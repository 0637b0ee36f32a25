//! Journal of past readings.
//!
//! A journal is an append-only log. Each reading is flattened to a
//! `JournalEntry` that stores only the raw cast and the hexagram numbers;
//! the texts are looked up again from the reference table when an entry is
//! expanded back into a `Reading`.

use crate::table::ReferenceTable;
use crate::types::{Cast, Reading};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Lazily read journal entries, oldest first
pub type JournalEntries = Box<dyn Iterator<Item = Result<JournalEntry>>>;

/// A reading flattened for storage
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    pub question: String,
    pub lines: Cast,
    pub primary: u8,
    pub secondary: Option<u8>,
    pub interpretation: Option<String>,
}

impl From<&Reading> for JournalEntry {
    fn from(reading: &Reading) -> Self {
        JournalEntry {
            timestamp: reading.cast_at,
            question: reading.question.clone(),
            lines: reading.cast,
            primary: reading.primary.number,
            secondary: reading.secondary.as_ref().map(|h| h.number),
            interpretation: reading.interpretation.clone(),
        }
    }
}

/// Append-only persistence for readings
pub trait JournalStore {
    /// Append one reading; earlier entries are never rewritten
    fn append(&mut self, reading: &Reading) -> Result<()>;

    /// All entries in storage order; empty if the journal does not exist yet
    fn list_all(&self) -> Result<JournalEntries>;

    /// Where the journal lives
    fn path(&self) -> &Path;
}

/// On-disk format of the journal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JournalFormat {
    #[default]
    Csv,
    Jsonl,
}

impl JournalFormat {
    /// Default journal file name for this format
    pub fn file_name(self) -> &'static str {
        match self {
            JournalFormat::Csv => "i_ching_journal.csv",
            JournalFormat::Jsonl => "i_ching_journal.jsonl",
        }
    }
}

/// Open the journal store for a format at the given path
pub fn open_journal(format: JournalFormat, path: impl Into<PathBuf>) -> Box<dyn JournalStore> {
    match format {
        JournalFormat::Csv => Box::new(crate::csv_journal::CsvJournal::new(path)),
        JournalFormat::Jsonl => Box::new(crate::jsonl_journal::JsonlJournal::new(path)),
    }
}

/// Expand a stored entry back into a full reading
///
/// Changing lines are re-derived from the stored cast. A hexagram number the
/// table does not know is a `Reconstruction` error.
pub fn reconstruct(entry: &JournalEntry, table: &ReferenceTable) -> Result<Reading> {
    let primary = table.get(entry.primary).cloned().ok_or_else(|| {
        Error::Reconstruction(format!(
            "primary hexagram {} is not in the reference table",
            entry.primary
        ))
    })?;

    let secondary = match entry.secondary {
        Some(number) => Some(table.get(number).cloned().ok_or_else(|| {
            Error::Reconstruction(format!(
                "evolving hexagram {} is not in the reference table",
                number
            ))
        })?),
        None => None,
    };

    if table.number_for_signature(&entry.lines.signature()) != Some(entry.primary) {
        tracing::warn!(
            "Journal entry from {} stores hexagram {} but its lines {} resolve differently",
            entry.timestamp,
            entry.primary,
            entry.lines
        );
    }
    if entry.lines.has_changing_lines() != entry.secondary.is_some() {
        tracing::warn!(
            "Journal entry from {} has lines {} but evolving hexagram {:?}",
            entry.timestamp,
            entry.lines,
            entry.secondary
        );
    }

    Ok(Reading {
        question: entry.question.clone(),
        cast: entry.lines,
        primary,
        secondary,
        changing_lines: entry.lines.changing_positions(),
        cast_at: entry.timestamp,
        interpretation: entry.interpretation.clone(),
    })
}

/// A journal entry that could not be shown
#[derive(Debug)]
pub struct SkippedEntry {
    /// 1-based position in the journal
    pub position: usize,
    pub error: Error,
}

/// Every readable journal entry, plus the ones that were skipped
#[derive(Debug, Default)]
pub struct JournalView {
    /// (1-based position, reading), oldest first
    pub readings: Vec<(usize, Reading)>,
    pub skipped: Vec<SkippedEntry>,
}

/// Read and reconstruct the whole journal
///
/// Bad rows and entries that no longer match the table are collected in
/// `skipped` instead of failing the listing.
pub fn load_readings(store: &dyn JournalStore, table: &ReferenceTable) -> Result<JournalView> {
    let mut view = JournalView::default();

    for (index, entry) in store.list_all()?.enumerate() {
        let position = index + 1;
        match entry.and_then(|entry| reconstruct(&entry, table)) {
            Ok(reading) => view.readings.push((position, reading)),
            Err(error) => {
                tracing::warn!("Skipping journal entry {}: {}", position, error);
                view.skipped.push(SkippedEntry { position, error });
            }
        }
    }

    tracing::info!(
        "Loaded {} readings from journal ({} skipped)",
        view.readings.len(),
        view.skipped.len()
    );
    Ok(view)
}

/// Parse a stored timestamp: RFC 3339, or a naive `YYYY-MM-DD HH:MM:SS`
/// (optionally with fractional seconds) taken as UTC
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::Persistence(format!("invalid date {:?}: {}", raw, e)))
}

/// Parse a stored hexagram number, accepting `38` as well as `38.0`
pub(crate) fn parse_hexagram_number(raw: &str) -> Result<u8> {
    let raw = raw.trim();
    if let Ok(number) = raw.parse::<u8>() {
        return Ok(number);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 && (0.0..=255.0).contains(&value) => Ok(value as u8),
        _ => Err(Error::Persistence(format!(
            "invalid hexagram number {:?}",
            raw
        ))),
    }
}
