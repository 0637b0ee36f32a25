#![forbid(unsafe_code)]

//! Core domain model and logic for the I Ching oracle.
//!
//! This crate provides:
//! - Domain types (line values, casts, hexagrams, readings)
//! - The bundled hexagram reference table
//! - Casting and hexagram resolution
//! - Journal persistence (CSV, JSONL) and Markdown export
//! - The interpretation service client
//! - Consultation session state

pub mod types;
pub mod error;
pub mod table;
pub mod casting;
pub mod reading;
pub mod config;
pub mod logging;
pub mod journal;
pub mod csv_journal;
pub mod jsonl_journal;
pub mod export;
pub mod interpret;
pub mod session;

// Re-export commonly used types
pub use error::{Error, HexagramRole, Result, TableError, APOLOGY_MESSAGE};
pub use types::*;
pub use table::ReferenceTable;
pub use casting::{cast_lines, resolve_hexagram_numbers, resolve_signatures};
pub use reading::validate_question;
pub use config::Config;
pub use journal::{
    load_readings, open_journal, reconstruct, JournalEntry, JournalFormat, JournalStore,
    JournalView, SkippedEntry,
};
pub use csv_journal::CsvJournal;
pub use jsonl_journal::JsonlJournal;
pub use export::export_markdown;
pub use interpret::{InterpretationRequest, Interpreter, OpenAiInterpreter};
pub use session::{Consultation, InterpretationStatus};
