use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// One course section for one term, as collected from the roster source.
///
/// `instructor_names` and `instructor_ids` are parallel arrays: index `i` of
/// one describes index `i` of the other. Either may contain empty strings
/// when the roster had no value for that slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Section {
    /// Unique per-term id: `"<prefix><number>.<section><term>"`.
    pub section_address: String,
    pub course_prefix: String,
    pub course_number: String,
    pub section_number: String,
    pub term: String,
    #[serde(default)]
    pub title: String,
    pub instructor_names: Vec<String>,
    pub instructor_ids: Vec<String>,

    // Schedule metadata, carried through untouched.
    #[serde(default)]
    pub days: String,
    #[serde(default)]
    pub times: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub enrolled_max: String,
}

impl Section {
    /// Course key in `PREFIX` + number form, e.g. `"CS2305"`.
    pub fn course_key(&self) -> String {
        format!(
            "{}{}",
            self.course_prefix.trim().to_uppercase(),
            self.course_number.trim()
        )
    }

    /// First listed (name, id) instructor pair, if the section has any.
    /// The id may be empty even when the name is present.
    pub fn first_instructor(&self) -> Option<(&str, &str)> {
        let name = self.instructor_names.first().map(String::as_str)?;
        let id = self
            .instructor_ids
            .first()
            .map(String::as_str)
            .unwrap_or("");
        Some((name, id))
    }
}

// ---------------------------------------------------------------------------
// Grade rows
// ---------------------------------------------------------------------------

/// One grade-distribution row: a (subject, catalog number, section, term,
/// instructor) tuple with letter-grade counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GradeRow {
    pub subject: String,
    pub catalog_nbr: String,
    pub section: String,
    #[serde(default)]
    pub term: String,
    pub instructor_1: String,
    /// Letter grade symbol -> student count.
    pub grades: BTreeMap<String, u32>,
}

impl GradeRow {
    /// Course key in `SUBJECT` + catalog-number form, e.g. `"CS1337"`.
    pub fn course_key(&self) -> String {
        format!(
            "{}{}",
            self.subject.trim().to_uppercase(),
            self.catalog_nbr.trim()
        )
    }

    /// Total students counted across all grade symbols.
    pub fn total_count(&self) -> u32 {
        self.grades.values().sum()
    }
}

// ---------------------------------------------------------------------------
// Rating-site profiles
// ---------------------------------------------------------------------------

/// One public rating-site profile variant.
///
/// Several variants can normalize to the same name (homonyms); each keeps
/// its own stable `rmp_id` and scraped course list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RmpProfile {
    /// Display name exactly as scraped.
    pub original_display_name: String,
    pub rmp_id: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub quality_rating: f64,
    #[serde(default)]
    pub difficulty_rating: f64,
    /// Percentage, or -1 when the site reports none.
    #[serde(default)]
    pub would_take_again: i64,
    #[serde(default)]
    pub ratings_count: u32,
    /// Course codes as scraped; normalized only when compared.
    #[serde(default)]
    pub courses: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_course_key_uppercases_prefix() {
        let section = Section {
            course_prefix: "cs".into(),
            course_number: "2305".into(),
            ..Default::default()
        };
        assert_eq!(section.course_key(), "CS2305");
    }

    #[test]
    fn first_instructor_tolerates_missing_id() {
        let section = Section {
            instructor_names: vec!["John Cole".into()],
            instructor_ids: vec![],
            ..Default::default()
        };
        assert_eq!(section.first_instructor(), Some(("John Cole", "")));
    }

    #[test]
    fn first_instructor_none_without_names() {
        assert_eq!(Section::default().first_instructor(), None);
    }

    #[test]
    fn grade_row_totals() {
        let row = GradeRow {
            grades: BTreeMap::from([("A".into(), 10), ("B".into(), 5)]),
            ..Default::default()
        };
        assert_eq!(row.total_count(), 15);
    }
}
