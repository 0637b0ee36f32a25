//! JSON Lines journal store.
//!
//! Readings are appended to a JSONL (JSON Lines) file with file locking
//! to ensure safe concurrent access.

use crate::journal::{JournalEntries, JournalEntry, JournalStore};
use crate::types::Reading;
use crate::{Error, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// JSONL-based journal with file locking
pub struct JsonlJournal {
    path: PathBuf,
}

impl JsonlJournal {
    /// Create a new JSONL journal for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    fn write_entry(&self, entry: &JournalEntry) -> Result<()> {
        self.ensure_parent_dir()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        file.flush()?;
        file.sync_all()?;

        file.unlock()?;
        Ok(())
    }
}

impl JournalStore for JsonlJournal {
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
        file.lock_shared()
            .map_err(|e| Error::Persistence(format!("{:?}: {}", self.path, e)))?;

        let entries = BufReader::new(file)
            .lines()
            .enumerate()
            .filter(|(_, line)| !matches!(line, Ok(text) if text.trim().is_empty()))
            .map(|(line_num, line)| {
                let line = line.map_err(|e| {
                    Error::Persistence(format!("line {}: {}", line_num + 1, e))
                })?;
                serde_json::from_str::<JournalEntry>(&line).map_err(|e| {
                    Error::Persistence(format!("line {}: {}", line_num + 1, e))
                })
            });

        Ok(Box::new(entries))
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
