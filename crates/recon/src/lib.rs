//! `gradelink-recon`: instructor identity reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded section rosters, grade rows, and
//! rating-site profiles, returns the matched professor maps plus enriched
//! grade rows. No file or network I/O.

pub mod aggregate;
pub mod config;
pub mod courses;
pub mod engine;
pub mod error;
pub mod lookup;
pub mod mapper;
pub mod matcher;
pub mod model;
pub mod name;
pub mod report;

pub use config::ReconConfig;
pub use engine::{load_grade_rows, run};
pub use error::ReconError;
pub use model::{ReconInput, ReconResult};
