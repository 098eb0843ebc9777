//! Inverts the name-keyed match map into an id-keyed lookup.

use std::collections::BTreeMap;

use log::warn;

use crate::model::{InstructorRecord, MatchedProfessor};

/// Re-key matched professors by instructor id.
///
/// The normalized name each entry was keyed by moves into the record.
/// Entries without an id are dropped. Two names claiming the same id is a
/// documented, non-fatal ambiguity: the later entry overwrites the earlier.
pub fn build_instructor_lookup(
    matched: &BTreeMap<String, Vec<MatchedProfessor>>,
) -> BTreeMap<String, InstructorRecord> {
    let mut lookup: BTreeMap<String, InstructorRecord> = BTreeMap::new();

    for (name, entries) in matched {
        for entry in entries {
            if entry.instructor_id.is_empty() {
                continue;
            }
            let record = InstructorRecord {
                normalized_name: name.clone(),
                professor: entry.clone(),
            };
            if let Some(previous) = lookup.insert(entry.instructor_id.clone(), record) {
                if previous.normalized_name != *name {
                    warn!(
                        "instructor id '{}' claimed by both '{}' and '{}'",
                        entry.instructor_id, previous.normalized_name, name
                    );
                }
            }
        }
    }

    lookup
}
