//! Grade aggregation: raw grade rows + section rosters in, per-instructor
//! rating profiles out.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use gradelink_core::{GradeRow, Section};

use crate::model::{AggregateStats, GradeRating, RatingProfile, RatingsPool};
use crate::name::normalize_name;

/// Grade-point weight per recognized symbol. `W` carries 0.67.
pub const GRADE_POINTS: &[(&str, f64)] = &[
    ("A+", 4.0),
    ("A", 4.0),
    ("A-", 3.67),
    ("B+", 3.33),
    ("B", 3.0),
    ("B-", 2.67),
    ("C+", 2.33),
    ("C", 2.0),
    ("C-", 1.67),
    ("D+", 1.33),
    ("D", 1.0),
    ("D-", 0.67),
    ("F", 0.0),
    ("W", 0.67),
    ("P", 4.0),
    ("NP", 0.0),
];

/// Grade points for a recognized symbol.
pub fn grade_points(symbol: &str) -> Option<f64> {
    GRADE_POINTS
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, points)| *points)
}

/// Which ids a normalized name maps to, and which courses that id taught.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionInstructor {
    pub instructor_id: String,
    pub courses: BTreeSet<String>,
}

/// Index the first instructor of every section by normalized name.
pub fn index_section_instructors(
    sections: &[Section],
) -> BTreeMap<String, Vec<SectionInstructor>> {
    let mut index: BTreeMap<String, Vec<SectionInstructor>> = BTreeMap::new();

    for section in sections {
        let Some((name, id)) = section.first_instructor() else {
            continue;
        };
        let name = normalize_name(name);
        if name.is_empty() {
            continue;
        }
        let id = id.trim();
        let course = section.course_key();
        let entries = index.entry(name).or_default();
        match entries.iter_mut().find(|e| e.instructor_id == id) {
            Some(entry) => {
                entry.courses.insert(course);
            }
            None => entries.push(SectionInstructor {
                instructor_id: id.to_string(),
                courses: BTreeSet::from([course]),
            }),
        }
    }

    index
}

/// Pick the roster id for a (name, course) pair.
///
/// An unambiguous name keeps its single id. Homonyms are discriminated by
/// taught course; when the course discriminates nothing, the profile keeps
/// an empty id rather than guessing.
fn resolve_instructor_id(
    index: &BTreeMap<String, Vec<SectionInstructor>>,
    name: &str,
    course: &str,
) -> String {
    let Some(entries) = index.get(name) else {
        return String::new();
    };
    if entries.len() == 1 {
        return entries[0].instructor_id.clone();
    }
    entries
        .iter()
        .find(|e| e.courses.contains(course))
        .map(|e| e.instructor_id.clone())
        .unwrap_or_default()
}

/// Aggregate grade rows into per-name rating profiles.
///
/// Rows missing instructor/subject/catalog number, or whose grade counts sum
/// to zero, are skipped and counted. A name yields one profile per distinct
/// resolved instructor id; names the section join cannot resolve keep an
/// empty id. No row is ever fatal.
pub fn build_ratings_pool(
    grade_rows: &[GradeRow],
    sections: &[Section],
) -> (RatingsPool, AggregateStats) {
    let index = index_section_instructors(sections);
    let mut stats = AggregateStats::default();

    // (name, id) -> course -> symbol -> count
    let mut acc: BTreeMap<(String, String), BTreeMap<String, BTreeMap<String, u32>>> =
        BTreeMap::new();

    for row in grade_rows {
        stats.rows += 1;
        let name = normalize_name(&row.instructor_1);
        if name.is_empty()
            || row.subject.trim().is_empty()
            || row.catalog_nbr.trim().is_empty()
            || row.total_count() == 0
        {
            stats.skipped_rows += 1;
            continue;
        }

        let course = row.course_key();
        let id = resolve_instructor_id(&index, &name, &course);
        let counts = acc
            .entry((name, id))
            .or_default()
            .entry(course)
            .or_default();
        for (symbol, count) in &row.grades {
            if grade_points(symbol).is_some() {
                *counts.entry(symbol.clone()).or_insert(0) += count;
            }
        }
    }
    debug!(
        "aggregated {} grade rows ({} skipped)",
        stats.rows, stats.skipped_rows
    );

    let mut pool: RatingsPool = BTreeMap::new();
    for ((name, id), courses) in acc {
        let mut course_ratings = BTreeMap::new();
        let mut total_points = 0.0;
        let mut total_count = 0u32;

        for (course, counts) in &courses {
            let mut points = 0.0;
            let mut count = 0u32;
            for (symbol, n) in counts {
                if let Some(p) = grade_points(symbol) {
                    points += p * f64::from(*n);
                    count += n;
                }
            }
            course_ratings.insert(course.clone(), GradeRating::from_points(points, count));
            total_points += points;
            total_count += count;
        }

        pool.entry(name).or_default().push(RatingProfile {
            instructor_id: id,
            overall_grade_rating: GradeRating::from_points(total_points, total_count),
            total_grade_count: total_count,
            course_ratings,
        });
    }

    for (name, profiles) in &pool {
        if profiles.len() > 1 {
            stats.ambiguous_names += 1;
            warn!(
                "instructor name '{name}' maps to {} distinct ids",
                profiles.len()
            );
        }
    }

    (pool, stats)
}
