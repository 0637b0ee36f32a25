//! Reference table of the 64 hexagrams.
//!
//! The corpus ships inside the library and can be replaced by a JSON file of
//! the same shape. Loading builds a signature → hexagram number index so that
//! resolution is a single map lookup.

use crate::error::TableError;
use crate::types::{HexagramRecord, LINE_COUNT};
use crate::Result;
use once_cell::sync::OnceCell;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Number of hexagrams in a complete table
pub const HEXAGRAM_COUNT: usize = 64;

const BUNDLED_SOURCE: &str = include_str!("../data/i_ching_data.json");

/// Bundled table - parsed once and reused for the life of the process
static BUNDLED_TABLE: OnceCell<ReferenceTable> = OnceCell::new();

/// The loaded hexagram corpus plus its signature index
#[derive(Clone, Debug)]
pub struct ReferenceTable {
    hexagrams: BTreeMap<u8, HexagramRecord>,
    by_signature: HashMap<String, u8>,
    /// Problems found while building, reported by `validate()`
    problems: Vec<String>,
}

impl ReferenceTable {
    /// Get a reference to the bundled table, parsing it on first use
    pub fn bundled() -> Result<&'static ReferenceTable> {
        BUNDLED_TABLE.get_or_try_init(|| Self::from_json_str(BUNDLED_SOURCE, "bundled table"))
    }

    /// Load a table from a JSON file
    ///
    /// A missing file and an unparseable file are reported as different
    /// `TableError` kinds.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TableError::NotFound(path.to_path_buf()).into());
            }
            Err(e) => {
                return Err(TableError::Malformed {
                    source_name: path.display().to_string(),
                    reason: e.to_string(),
                }
                .into());
            }
        };

        let table = Self::from_json_str(&contents, &path.display().to_string())?;
        tracing::info!("Loaded reference table from {:?}", path);
        Ok(table)
    }

    /// Parse a table from JSON text keyed by hexagram number
    ///
    /// A key that disagrees with its record's `number` is kept as a problem
    /// for `validate()` to report.
    pub fn from_json_str(contents: &str, source_name: &str) -> Result<Self> {
        let raw: BTreeMap<String, HexagramRecord> =
            serde_json::from_str(contents).map_err(|e| TableError::Malformed {
                source_name: source_name.to_string(),
                reason: e.to_string(),
            })?;

        let mut key_problems = Vec::new();
        for (key, record) in &raw {
            if key.trim().parse::<u8>().ok() != Some(record.number) {
                key_problems.push(format!(
                    "Key {:?} holds hexagram number {}",
                    key, record.number
                ));
            }
        }

        let mut table = Self::from_records(raw.into_values());
        table.problems.extend(key_problems);
        Ok(table)
    }

    /// Build a table and its index from already-parsed records
    ///
    /// Records without a valid signature stay in the table but are left out
    /// of the signature index. A repeated number keeps the first record and
    /// is reported by `validate()`.
    pub fn from_records(records: impl IntoIterator<Item = HexagramRecord>) -> Self {
        let mut hexagrams = BTreeMap::new();
        let mut by_signature = HashMap::new();
        let mut problems = Vec::new();

        for record in records {
            if hexagrams.contains_key(&record.number) {
                tracing::warn!(
                    "Hexagram number {} appears twice, ignoring repeat",
                    record.number
                );
                problems.push(format!(
                    "Hexagram number {} appears more than once",
                    record.number
                ));
                continue;
            }

            match record.binary_code.as_deref() {
                Some(code) if is_signature(code) => {
                    by_signature.insert(code.to_string(), record.number);
                }
                Some(code) => {
                    tracing::warn!(
                        "Hexagram {} has a malformed signature {:?}, not indexed",
                        record.number,
                        code
                    );
                }
                None => {
                    tracing::warn!("Hexagram {} has no signature, not indexed", record.number);
                }
            }
            hexagrams.insert(record.number, record);
        }

        tracing::debug!(
            "Indexed {} signatures for {} hexagrams",
            by_signature.len(),
            hexagrams.len()
        );

        Self {
            hexagrams,
            by_signature,
            problems,
        }
    }

    /// Look up a hexagram by its number (1-64)
    pub fn get(&self, number: u8) -> Option<&HexagramRecord> {
        self.hexagrams.get(&number)
    }

    /// Look up the hexagram number for a signature
    pub fn number_for_signature(&self, signature: &str) -> Option<u8> {
        self.by_signature.get(signature).copied()
    }

    /// The signature → number index
    pub fn signature_index(&self) -> &HashMap<String, u8> {
        &self.by_signature
    }

    /// All hexagrams in number order
    pub fn iter(&self) -> impl Iterator<Item = &HexagramRecord> {
        self.hexagrams.values()
    }

    pub fn len(&self) -> usize {
        self.hexagrams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hexagrams.is_empty()
    }

    /// Check the table for internal consistency
    ///
    /// Returns a list of problems; an empty list means the table is complete
    /// and every signature maps to exactly one hexagram.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.problems.clone();

        if self.hexagrams.len() != HEXAGRAM_COUNT {
            errors.push(format!(
                "Expected {} hexagrams, found {}",
                HEXAGRAM_COUNT,
                self.hexagrams.len()
            ));
        }

        let mut seen: HashMap<&str, u8> = HashMap::new();
        for (number, record) in &self.hexagrams {
            if !(1..=HEXAGRAM_COUNT as u8).contains(number) {
                errors.push(format!("Hexagram number {} is out of range", number));
            }

            if record.lines.len() != LINE_COUNT {
                errors.push(format!(
                    "Hexagram {}: expected {} lines, found {}",
                    number,
                    LINE_COUNT,
                    record.lines.len()
                ));
            }

            match record.binary_code.as_deref() {
                None => errors.push(format!("Hexagram {}: missing binary_code", number)),
                Some(code) => {
                    if !is_signature(code) {
                        errors.push(format!(
                            "Hexagram {}: binary_code {:?} is not six 0/1 characters",
                            number, code
                        ));
                    } else if let Some(other) = seen.insert(code, *number) {
                        errors.push(format!(
                            "Hexagrams {} and {} share binary_code {}",
                            other, number, code
                        ));
                    }
                }
            }
        }

        errors
    }
}

/// Six characters, each `0` or `1`
fn is_signature(code: &str) -> bool {
    code.len() == LINE_COUNT && code.chars().all(|c| c == '0' || c == '1')
}
