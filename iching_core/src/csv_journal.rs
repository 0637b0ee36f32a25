//! CSV journal store.
//!
//! One row per reading, with the column names the journal has always used so
//! that existing journal files stay readable. The header is written only when
//! the file is empty.

use crate::journal::{
    parse_hexagram_number, parse_timestamp, JournalEntries, JournalEntry, JournalStore,
};
use crate::types::Reading;
use crate::{Error, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A row in the CSV journal
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Question")]
    question: String,
    #[serde(rename = "Lines")]
    lines: String,
    #[serde(rename = "Primary Hexagram Number")]
    primary: String,
    #[serde(rename = "Evolving Hexagram Number")]
    evolving: Option<String>,
    #[serde(rename = "AI Interpretation")]
    interpretation: Option<String>,
}

impl From<&JournalEntry> for CsvRow {
    fn from(entry: &JournalEntry) -> Self {
        CsvRow {
            date: entry.timestamp.to_rfc3339(),
            question: entry.question.clone(),
            lines: entry.lines.to_string(),
            primary: entry.primary.to_string(),
            evolving: entry.secondary.map(|n| n.to_string()),
            interpretation: entry.interpretation.clone(),
        }
    }
}

impl TryFrom<CsvRow> for JournalEntry {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let timestamp = parse_timestamp(&row.date)?;
        let lines = row
            .lines
            .parse()
            .map_err(|e| Error::Persistence(format!("invalid lines {:?}: {}", row.lines, e)))?;
        let primary = parse_hexagram_number(&row.primary)?;
        let secondary = row
            .evolving
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(parse_hexagram_number)
            .transpose()?;

        Ok(JournalEntry {
            timestamp,
            question: row.question,
            lines,
            primary,
            secondary,
            interpretation: row.interpretation.filter(|s| !s.is_empty()),
        })
    }
}

/// CSV-backed journal with file locking
pub struct CsvJournal {
    path: PathBuf,
}

impl CsvJournal {
    /// Create a CSV journal at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn write_entry(&self, entry: &JournalEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // Exclusive lock so concurrent writers cannot interleave rows
        file.lock_exclusive()?;

        // Checked under the lock so only one writer emits the header
        let needs_headers = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_headers)
            .from_writer(Vec::new());
        writer.serialize(CsvRow::from(entry))?;
        let bytes = writer
            .into_inner()
            .map_err(|e| Error::Persistence(e.to_string()))?;

        // Whole record in one write, then onto disk
        file.write_all(&bytes)?;
        file.flush()?;
        file.sync_all()?;

        file.unlock()?;
        Ok(())
    }
}

impl JournalStore for CsvJournal {
    fn append(&mut self, reading: &Reading) -> Result<()> {
        let entry = JournalEntry::from(reading);
        self.write_entry(&entry)
            .map_err(|e| Error::Persistence(format!("{:?}: {}", self.path, e)))?;

        tracing::debug!("Appended reading from {} to {:?}", entry.timestamp, self.path);
        Ok(())
    }

    fn list_all(&self) -> Result<JournalEntries> {
        if !self.path.exists() {
            tracing::debug!("No journal at {:?}", self.path);
            return Ok(Box::new(std::iter::empty()));
        }

        let file = File::open(&self.path)
            .map_err(|e| Error::Persistence(format!("{:?}: {}", self.path, e)))?;
        // Shared lock lives as long as the reader owns the file
        file.lock_shared()
            .map_err(|e| Error::Persistence(format!("{:?}: {}", self.path, e)))?;

        let rows = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file)
            .into_deserialize::<CsvRow>()
            .map(|row| {
                row.map_err(|e| Error::Persistence(format!("unreadable row: {}", e)))
                    .and_then(JournalEntry::try_from)
            });

        Ok(Box::new(rows))
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
