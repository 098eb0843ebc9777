//! `gradelink-core`: shared record types exchanged with the data collectors.
//!
//! The scrapers and spreadsheet converters produce these records; the recon
//! engine consumes them. Nothing here performs I/O.

pub mod records;

pub use records::{GradeRow, RmpProfile, Section};
