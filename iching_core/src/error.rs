//! Error types for the iching_core library.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Shown to the user whenever the interpretation service fails.
pub const APOLOGY_MESSAGE: &str =
    "Sorry, an interpretation could not be generated at this time.";

/// Which of the two hexagrams of a reading a lookup was for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HexagramRole {
    Primary,
    Secondary,
}

impl fmt::Display for HexagramRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HexagramRole::Primary => write!(f, "primary"),
            HexagramRole::Secondary => write!(f, "evolving"),
        }
    }
}

/// Why the reference table could not be made available
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// The table source does not exist
    #[error("reference table not found at {0:?}")]
    NotFound(PathBuf),

    /// The table source exists but could not be read or parsed
    #[error("reference table {source_name} is malformed: {reason}")]
    Malformed { source_name: String, reason: String },

    /// The table parsed but failed consistency checks
    #[error("reference table failed validation: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Core error type for iching_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reference table missing or corrupt (fatal at startup)
    #[error("Data unavailable: {0}")]
    DataUnavailable(#[from] TableError),

    /// Caller supplied unusable input, e.g. an empty question
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A resolved signature has no entry in the reference table
    #[error("No {role} hexagram found for signature {signature}")]
    HexagramNotFound {
        role: HexagramRole,
        signature: String,
    },

    /// Journal could not be written or read
    #[error("Journal error: {0}")]
    Persistence(String),

    /// A journal entry cannot be expanded against the current table
    #[error("Cannot reconstruct journal entry: {0}")]
    Reconstruction(String),

    /// The interpretation service call failed
    #[error("Interpretation service error: {0}")]
    Interpretation(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Message suitable for showing to the person consulting the oracle.
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidInput(_) => {
                "Please enter a question before casting a reading.".to_string()
            }
            Error::HexagramNotFound { role, .. } => format!(
                "The {} hexagram could not be determined from the reference table. \
                 Please cast again.",
                role
            ),
            Error::Persistence(reason) => {
                format!("The journal could not be accessed ({}).", reason)
            }
            Error::Reconstruction(reason) => {
                format!("A journal entry could not be shown ({}).", reason)
            }
            Error::Interpretation(_) => APOLOGY_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Errors that must stop the program before any casting happens
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::DataUnavailable(_))
    }
}
