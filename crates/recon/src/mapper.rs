//! Joins grade rows back to sections to stamp stable instructor ids onto
//! each row, with a normalized-name fallback when the section join fails.

use std::collections::BTreeMap;

use log::debug;

use gradelink_core::{GradeRow, Section};

use crate::model::{EnrichedGradeRow, InstructorRecord, MapStats, MatchedProfessor};
use crate::name::normalize_name;

/// Result of the section-address instructor-id lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdLookup {
    Found(String),
    Missing,
}

/// Sorted index of lowercase section addresses to first instructor ids.
pub struct SectionIndex {
    addresses: BTreeMap<String, String>,
}

impl SectionIndex {
    pub fn build(sections: &[Section]) -> Self {
        let mut addresses = BTreeMap::new();
        for section in sections {
            let address = section.section_address.trim().to_lowercase();
            if address.is_empty() {
                continue;
            }
            let id = section
                .instructor_ids
                .first()
                .map(|id| id.trim().to_string())
                .unwrap_or_default();
            addresses.entry(address).or_insert(id);
        }
        Self { addresses }
    }

    /// First instructor id of the section whose address starts with
    /// `<subject><catalog>.<section>`, case-insensitively.
    ///
    /// Addresses carry a term suffix the grade rows lack, so this is a
    /// prefix scan over the sorted index rather than an exact get.
    pub fn instructor_id(&self, subject: &str, catalog_nbr: &str, section: &str) -> IdLookup {
        let key = format!(
            "{}{}.{}",
            subject.trim(),
            catalog_nbr.trim(),
            section.trim()
        )
        .to_lowercase();
        if key == "." {
            return IdLookup::Missing;
        }

        match self.addresses.range(key.clone()..).next() {
            Some((address, id)) if address.starts_with(&key) && !id.is_empty() => {
                IdLookup::Found(id.clone())
            }
            _ => IdLookup::Missing,
        }
    }
}

pub struct MappedGrades {
    /// Every input row, enriched, in input order.
    pub grades: Vec<EnrichedGradeRow>,
    pub stats: MapStats,
}

/// Stamp instructor ids onto grade rows.
///
/// Section-address join first; normalized-name fallback against the matched
/// map second; an empty id when neither succeeds. Rows are never dropped.
pub fn map_grades_to_instructors(
    grade_rows: &[GradeRow],
    sections: &[Section],
    matched: &BTreeMap<String, Vec<MatchedProfessor>>,
    lookup: &BTreeMap<String, InstructorRecord>,
) -> MappedGrades {
    let index = SectionIndex::build(sections);
    let mut stats = MapStats::default();
    let mut grades = Vec::with_capacity(grade_rows.len());

    for row in grade_rows {
        stats.processed += 1;
        let mut enriched = EnrichedGradeRow {
            row: row.clone(),
            instructor_id: String::new(),
            instructor_name_normalized: String::new(),
            has_rmp_data: false,
        };

        match index.instructor_id(&row.subject, &row.catalog_nbr, &row.section) {
            IdLookup::Found(id) => {
                enriched.instructor_id = id.clone();
                match lookup.get(&id) {
                    Some(record) => {
                        stats.section_matches += 1;
                        enriched.instructor_name_normalized = record
                            .professor
                            .original_rmp_format
                            .as_deref()
                            .map(normalize_name)
                            .unwrap_or_else(|| record.normalized_name.clone());
                        enriched.has_rmp_data = record.professor.has_rmp_data();
                    }
                    None => {
                        // A roster id with no matched profile behind it.
                        stats.no_matches += 1;
                        enriched.instructor_name_normalized = normalize_name(&row.instructor_1);
                    }
                }
            }
            IdLookup::Missing => {
                let raw = row.instructor_1.trim();
                if raw.is_empty() {
                    stats.no_matches += 1;
                } else {
                    let normalized = normalize_name(raw);
                    enriched.instructor_name_normalized = normalized.clone();
                    match matched.get(&normalized).and_then(|entries| entries.first()) {
                        Some(entry) => {
                            stats.fallback_matches += 1;
                            enriched.instructor_id = entry.instructor_id.clone();
                            enriched.has_rmp_data = entry.has_rmp_data();
                        }
                        None => {
                            stats.no_matches += 1;
                        }
                    }
                }
            }
        }

        grades.push(enriched);
    }
    debug!(
        "mapped {} grade rows: {} by section, {} by name, {} unmatched",
        stats.processed, stats.section_matches, stats.fallback_matches, stats.no_matches
    );

    MappedGrades { grades, stats }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{GradeRating, RatingProfile};

    fn section(address: &str, id: &str) -> Section {
        Section {
            section_address: address.into(),
            instructor_ids: vec![id.into()],
            instructor_names: vec!["Someone".into()],
            ..Default::default()
        }
    }

    fn row(subject: &str, catalog: &str, section: &str, instructor: &str) -> GradeRow {
        GradeRow {
            subject: subject.into(),
            catalog_nbr: catalog.into(),
            section: section.into(),
            instructor_1: instructor.into(),
            grades: BTreeMap::from([("A".into(), 1)]),
            ..Default::default()
        }
    }

    fn matched_entry(id: &str) -> MatchedProfessor {
        MatchedProfessor::residue(RatingProfile {
            instructor_id: id.into(),
            overall_grade_rating: GradeRating::Score(4.0),
            total_grade_count: 1,
            course_ratings: BTreeMap::new(),
        })
    }

    #[test]
    fn section_index_prefix_scan() {
        let index = SectionIndex::build(&[
            section("acct2301.002.24f", "aturner"),
            section("cs1337.001.24f", "jcole"),
        ]);
        assert_eq!(
            index.instructor_id("CS", "1337", "001"),
            IdLookup::Found("jcole".into())
        );
        assert_eq!(index.instructor_id("CS", "1337", "002"), IdLookup::Missing);
        assert_eq!(index.instructor_id("", "", ""), IdLookup::Missing);
    }

    #[test]
    fn section_match_attaches_lookup_metadata() {
        let sections = vec![section("cs1337.001.24f", "jcole")];
        let mut entry = matched_entry("jcole");
        entry.rmp_id = Some("42".into());
        entry.original_rmp_format = Some("John Cole".into());
        let matched = BTreeMap::from([("john cole".to_string(), vec![entry])]);
        let lookup = crate::lookup::build_instructor_lookup(&matched);

        let rows = vec![row("CS", "1337", "001", "Cole, John")];
        let mapped = map_grades_to_instructors(&rows, &sections, &matched, &lookup);

        assert_eq!(mapped.stats.section_matches, 1);
        assert_eq!(mapped.grades[0].instructor_id, "jcole");
        assert_eq!(mapped.grades[0].instructor_name_normalized, "john cole");
        assert!(mapped.grades[0].has_rmp_data);
    }

    #[test]
    fn name_fallback_when_section_missing() {
        let matched = BTreeMap::from([("john cole".to_string(), vec![matched_entry("jcole")])]);
        let lookup = crate::lookup::build_instructor_lookup(&matched);

        let rows = vec![row("CS", "1337", "001", "Cole, John")];
        let mapped = map_grades_to_instructors(&rows, &[], &matched, &lookup);

        assert_eq!(mapped.stats.fallback_matches, 1);
        assert_eq!(mapped.grades[0].instructor_id, "jcole");
        assert_eq!(mapped.grades[0].instructor_name_normalized, "john cole");
    }

    #[test]
    fn unmatched_rows_survive_with_empty_id() {
        let rows = vec![
            row("CS", "1337", "001", "Stranger, Total"),
            row("CS", "1337", "002", ""),
        ];
        let mapped = map_grades_to_instructors(&rows, &[], &BTreeMap::new(), &BTreeMap::new());

        assert_eq!(mapped.grades.len(), 2);
        assert_eq!(mapped.stats.no_matches, 2);
        assert_eq!(mapped.grades[0].instructor_id, "");
        assert_eq!(
            mapped.grades[0].instructor_name_normalized,
            "total stranger"
        );
        assert_eq!(mapped.grades[1].instructor_name_normalized, "");
    }

    #[test]
    fn roster_id_without_profile_counts_as_no_match() {
        let sections = vec![section("cs1337.001.24f", "mystery")];
        let rows = vec![row("CS", "1337", "001", "Body, Some")];
        let mapped = map_grades_to_instructors(&rows, &sections, &BTreeMap::new(), &BTreeMap::new());

        assert_eq!(mapped.stats.no_matches, 1);
        // The roster id still gets stamped even without a matched profile.
        assert_eq!(mapped.grades[0].instructor_id, "mystery");
        assert_eq!(mapped.grades[0].instructor_name_normalized, "some body");
    }
}
