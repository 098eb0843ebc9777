use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use gradelink_core::{GradeRow, RmpProfile, Section};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Pre-loaded snapshots for one reconciliation run. Everything is rebuilt
/// from scratch per run; nothing is persisted between batches.
#[derive(Debug, Default)]
pub struct ReconInput {
    pub sections: Vec<Section>,
    pub grade_rows: Vec<GradeRow>,
    /// Rating-site profile variants keyed by scraped display name.
    pub rmp_profiles: BTreeMap<String, Vec<RmpProfile>>,
}

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

/// A 0-5 rating derived from grade points, or `NotAvailable` when nothing
/// was counted. Serializes as a JSON number or the string `"N/A"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradeRating {
    Score(f64),
    NotAvailable,
}

impl GradeRating {
    /// `(points / count) / 4.0 * 5`, rounded to 2 decimals.
    pub fn from_points(points: f64, count: u32) -> Self {
        if count == 0 {
            return Self::NotAvailable;
        }
        let rating = points / f64::from(count) / 4.0 * 5.0;
        Self::Score((rating * 100.0).round() / 100.0)
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            Self::Score(score) => Some(*score),
            Self::NotAvailable => None,
        }
    }
}

impl Serialize for GradeRating {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Score(score) => serializer.serialize_f64(*score),
            Self::NotAvailable => serializer.serialize_str("N/A"),
        }
    }
}

impl std::fmt::Display for GradeRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Score(score) => write!(f, "{score}"),
            Self::NotAvailable => write!(f, "N/A"),
        }
    }
}

/// Per-instructor profile aggregated from grade distributions.
#[derive(Debug, Clone, Serialize)]
pub struct RatingProfile {
    /// Stable roster id; empty when no section join resolved one.
    pub instructor_id: String,
    pub overall_grade_rating: GradeRating,
    pub total_grade_count: u32,
    /// Course key -> rating over that course's grades alone.
    pub course_ratings: BTreeMap<String, GradeRating>,
}

// ---------------------------------------------------------------------------
// Matching pools
// ---------------------------------------------------------------------------

/// Rating-site profile prepared for matching: the normalized course set is
/// computed once up front.
#[derive(Debug, Clone)]
pub struct RmpCandidate {
    pub profile: RmpProfile,
    pub courses: BTreeSet<String>,
}

/// Grade-derived candidates, keyed by normalized name. Vec order within a
/// name is first-seen order and drives tie-breaking.
pub type RatingsPool = BTreeMap<String, Vec<RatingProfile>>;

/// Rating-site candidates, keyed by normalized name.
pub type RmpPool = BTreeMap<String, Vec<RmpCandidate>>;

// ---------------------------------------------------------------------------
// Matched output
// ---------------------------------------------------------------------------

/// Merge of one grade-derived profile and at most one rating-site profile.
///
/// Rating-site fields are `None` for residue entries. The scraped course
/// list never carries over; grade-derived fields win on any overlap.
#[derive(Debug, Clone, Serialize)]
pub struct MatchedProfessor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rmp_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_rmp_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub would_take_again: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    pub instructor_id: String,
    pub overall_grade_rating: GradeRating,
    pub total_grade_count: u32,
    pub course_ratings: BTreeMap<String, GradeRating>,
}

impl MatchedProfessor {
    /// Merge a paired rating-site profile into a grade-derived profile.
    pub fn merged(rating: RatingProfile, rmp: &RmpProfile) -> Self {
        Self {
            rmp_id: Some(rmp.rmp_id.clone()),
            original_rmp_format: Some(rmp.original_display_name.clone()),
            department: Some(rmp.department.clone()),
            url: Some(rmp.url.clone()),
            quality_rating: Some(rmp.quality_rating),
            difficulty_rating: Some(rmp.difficulty_rating),
            would_take_again: Some(rmp.would_take_again),
            ratings_count: Some(rmp.ratings_count),
            tags: Some(rmp.tags.clone()),
            instructor_id: rating.instructor_id,
            overall_grade_rating: rating.overall_grade_rating,
            total_grade_count: rating.total_grade_count,
            course_ratings: rating.course_ratings,
        }
    }

    /// An unpaired grade-derived profile, emitted as-is.
    pub fn residue(rating: RatingProfile) -> Self {
        Self {
            rmp_id: None,
            original_rmp_format: None,
            department: None,
            url: None,
            quality_rating: None,
            difficulty_rating: None,
            would_take_again: None,
            ratings_count: None,
            tags: None,
            instructor_id: rating.instructor_id,
            overall_grade_rating: rating.overall_grade_rating,
            total_grade_count: rating.total_grade_count,
            course_ratings: rating.course_ratings,
        }
    }

    pub fn has_rmp_data(&self) -> bool {
        self.rmp_id.is_some()
    }
}

/// Id-keyed view of a matched professor; the name moves into the record
/// once the instructor id becomes the key.
#[derive(Debug, Clone, Serialize)]
pub struct InstructorRecord {
    pub normalized_name: String,
    #[serde(flatten)]
    pub professor: MatchedProfessor,
}

/// A grade row with the instructor identity stamped on.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedGradeRow {
    #[serde(flatten)]
    pub row: GradeRow,
    pub instructor_id: String,
    pub instructor_name_normalized: String,
    pub has_rmp_data: bool,
}

// ---------------------------------------------------------------------------
// Counters + Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateStats {
    pub rows: usize,
    /// Rows missing instructor/subject/catalog number or with zero counts.
    pub skipped_rows: usize,
    /// Names that resolved to more than one instructor id.
    pub ambiguous_names: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchSummary {
    pub ratings_entries: usize,
    pub rmp_entries: usize,
    pub direct_matches: usize,
    pub fuzzy_matches: usize,
    pub residue: usize,
    pub unmatched_rmp: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MapStats {
    pub processed: usize,
    pub section_matches: usize,
    pub fallback_matches: usize,
    pub no_matches: usize,
}

/// Whole-run summary. Percentage rates are omitted when no grade rows were
/// processed, so an empty snapshot yields a diagnostic summary instead of a
/// division by zero.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconSummary {
    pub aggregation: AggregateStats,
    pub matching: MatchSummary,
    pub mapping: MapStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_match_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_match_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unmatched_rate: Option<f64>,
}

// ---------------------------------------------------------------------------
// Result envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub fuzzy_threshold: f64,
}

#[derive(Debug, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    /// Normalized name -> matched or residue professor entries.
    pub matched: BTreeMap<String, Vec<MatchedProfessor>>,
    /// Instructor id -> matched professor record.
    pub instructor_lookup: BTreeMap<String, InstructorRecord>,
    /// Every input grade row, enriched, in input order.
    pub grades: Vec<EnrichedGradeRow>,
}

impl ReconResult {
    pub fn to_json(&self) -> Result<String, ReconError> {
        serde_json::to_string_pretty(self).map_err(|e| ReconError::Serialize(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_from_points() {
        // 30 A's at 4.0: (120 / 30) / 4 * 5 = 5.0
        assert_eq!(GradeRating::from_points(120.0, 30), GradeRating::Score(5.0));
        // (3.0 / 1) / 4 * 5 = 3.75
        assert_eq!(GradeRating::from_points(3.0, 1), GradeRating::Score(3.75));
        assert_eq!(GradeRating::from_points(0.0, 0), GradeRating::NotAvailable);
    }

    #[test]
    fn rating_rounds_to_two_decimals() {
        // (3.67 / 1) / 4 * 5 = 4.5875 -> 4.59
        assert_eq!(GradeRating::from_points(3.67, 1), GradeRating::Score(4.59));
    }

    #[test]
    fn rating_serializes_as_number_or_na() {
        assert_eq!(
            serde_json::to_string(&GradeRating::Score(4.59)).unwrap(),
            "4.59"
        );
        assert_eq!(
            serde_json::to_string(&GradeRating::NotAvailable).unwrap(),
            "\"N/A\""
        );
    }

    #[test]
    fn residue_has_no_rmp_fields() {
        let residue = MatchedProfessor::residue(RatingProfile {
            instructor_id: "jdoe".into(),
            overall_grade_rating: GradeRating::Score(4.0),
            total_grade_count: 12,
            course_ratings: BTreeMap::new(),
        });
        assert!(!residue.has_rmp_data());
        let json = serde_json::to_value(&residue).unwrap();
        assert!(json.get("rmp_id").is_none());
        assert_eq!(json["instructor_id"], "jdoe");
    }
}
