//! Core domain types for the I Ching companion.
//!
//! This module defines the fundamental types used throughout the system:
//! - Line values and six-line casts
//! - Hexagram records from the reference table
//! - Readings produced by a consultation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Number of lines in a hexagram
pub const LINE_COUNT: usize = 6;

// ============================================================================
// Line Types
// ============================================================================

/// One cast line, named after its traditional coin total
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum LineValue {
    /// 6: broken, changing
    OldYin,
    /// 7: solid, stable
    YoungYang,
    /// 8: broken, stable
    YoungYin,
    /// 9: solid, changing
    OldYang,
}

impl LineValue {
    /// All four values in numeric order
    pub const ALL: [LineValue; 4] = [
        LineValue::OldYin,
        LineValue::YoungYang,
        LineValue::YoungYin,
        LineValue::OldYang,
    ];

    /// The traditional numeric value (6, 7, 8 or 9)
    pub fn value(self) -> u8 {
        match self {
            LineValue::OldYin => 6,
            LineValue::YoungYang => 7,
            LineValue::YoungYin => 8,
            LineValue::OldYang => 9,
        }
    }

    /// Solid line (7 or 9)
    pub fn is_yang(self) -> bool {
        matches!(self, LineValue::YoungYang | LineValue::OldYang)
    }

    /// Unstable line (6 or 9)
    pub fn is_changing(self) -> bool {
        matches!(self, LineValue::OldYin | LineValue::OldYang)
    }

    /// The line after change: changing lines flip polarity and come to rest,
    /// stable lines stay as they are.
    pub fn settled(self) -> LineValue {
        match self {
            LineValue::OldYin => LineValue::YoungYang,
            LineValue::OldYang => LineValue::YoungYin,
            stable => stable,
        }
    }

    /// Signature bit for this line
    pub fn bit(self) -> char {
        if self.is_yang() {
            '1'
        } else {
            '0'
        }
    }
}

impl TryFrom<u8> for LineValue {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            6 => Ok(LineValue::OldYin),
            7 => Ok(LineValue::YoungYang),
            8 => Ok(LineValue::YoungYin),
            9 => Ok(LineValue::OldYang),
            other => Err(Error::InvalidInput(format!(
                "line value must be 6, 7, 8 or 9, got {}",
                other
            ))),
        }
    }
}

impl From<LineValue> for u8 {
    fn from(line: LineValue) -> u8 {
        line.value()
    }
}

impl fmt::Display for LineValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Six line values, bottom line first
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cast([LineValue; LINE_COUNT]);

impl Cast {
    pub fn new(lines: [LineValue; LINE_COUNT]) -> Self {
        Self(lines)
    }

    pub fn lines(&self) -> &[LineValue; LINE_COUNT] {
        &self.0
    }

    /// Build a cast from raw numbers, bottom line first
    pub fn from_values(values: &[u8]) -> Result<Self> {
        if values.len() != LINE_COUNT {
            return Err(Error::InvalidInput(format!(
                "a cast needs exactly {} lines, got {}",
                LINE_COUNT,
                values.len()
            )));
        }

        let mut lines = [LineValue::YoungYang; LINE_COUNT];
        for (slot, value) in lines.iter_mut().zip(values) {
            *slot = LineValue::try_from(*value)?;
        }
        Ok(Self(lines))
    }

    /// 0-indexed positions (bottom = 0) of the changing lines, ascending
    pub fn changing_positions(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, line)| line.is_changing())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn has_changing_lines(&self) -> bool {
        self.0.iter().any(|line| line.is_changing())
    }

    /// The cast after all changing lines have settled, if any were changing
    pub fn secondary(&self) -> Option<Cast> {
        if !self.has_changing_lines() {
            return None;
        }
        Some(Cast(self.0.map(LineValue::settled)))
    }

    /// Binary signature, topmost line first
    pub fn signature(&self) -> String {
        self.0.iter().rev().map(|line| line.bit()).collect()
    }
}

impl fmt::Display for Cast {
    /// Comma-delimited, bottom line first: `6,7,8,7,8,7`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.0.iter().map(|l| l.to_string()).collect();
        write!(f, "{}", values.join(","))
    }
}

impl FromStr for Cast {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let values = s
            .split(',')
            .map(|part| {
                part.trim().parse::<u8>().map_err(|e| {
                    Error::InvalidInput(format!("bad line value {:?}: {}", part, e))
                })
            })
            .collect::<Result<Vec<u8>>>()?;
        Self::from_values(&values)
    }
}

// ============================================================================
// Reference Table Types
// ============================================================================

/// Bilingual text of one line of a hexagram
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineText {
    pub line_zh: String,
    pub line_en: String,
}

/// One of the 64 hexagrams as stored in the reference table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HexagramRecord {
    pub number: u8,
    pub name_zh: String,
    pub name_en: String,
    /// Six `0`/`1` characters, topmost line first
    #[serde(default)]
    pub binary_code: Option<String>,
    pub judgment_zh: String,
    pub judgment_en: String,
    pub image_zh: String,
    pub image_en: String,
    /// Indexed 0-5, bottom line first
    pub lines: Vec<LineText>,
}

impl HexagramRecord {
    /// `"64. Before Completion (未濟)"`
    pub fn title(&self) -> String {
        format!("{}. {} ({})", self.number, self.name_en, self.name_zh)
    }

    /// Text for a 0-indexed line position
    pub fn line(&self, position: usize) -> Option<&LineText> {
        self.lines.get(position)
    }
}

// ============================================================================
// Resolution Types
// ============================================================================

/// Output of signature resolution for a cast
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signatures {
    pub primary: String,
    /// Present only when at least one line is changing
    pub secondary: Option<String>,
    pub changing_lines: Vec<usize>,
}

/// Hexagram numbers resolved from a pair of signatures
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HexagramPair {
    pub primary: u8,
    pub secondary: Option<u8>,
}

// ============================================================================
// Reading Type
// ============================================================================

/// The result of one consultation
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    pub question: String,
    pub cast: Cast,
    pub primary: HexagramRecord,
    pub secondary: Option<HexagramRecord>,
    pub changing_lines: Vec<usize>,
    pub cast_at: DateTime<Utc>,
    pub interpretation: Option<String>,
}
