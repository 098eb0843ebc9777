//! Pipeline orchestration: aggregate, match, invert, map, summarize.

use std::collections::BTreeMap;

use log::{info, warn};

use gradelink_core::GradeRow;

use crate::aggregate::{build_ratings_pool, GRADE_POINTS};
use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::lookup::build_instructor_lookup;
use crate::mapper::map_grades_to_instructors;
use crate::matcher::{build_rmp_pool, match_professors};
use crate::model::{ReconInput, ReconMeta, ReconResult};
use crate::report::compute_summary;

/// Run the full reconciliation batch over one set of snapshots.
///
/// Single-threaded and synchronous; all inputs are fully materialized before
/// matching starts, and the run always completes with a (possibly partial)
/// mapping. Row-level problems are absorbed and counted, never fatal.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconResult, ReconError> {
    config.validate()?;

    let (mut ratings, aggregation) = build_ratings_pool(&input.grade_rows, &input.sections);
    let mut rmp = build_rmp_pool(&input.rmp_profiles);
    if rmp.is_empty() {
        warn!("no rating-site profiles loaded; every instructor will be residue");
    }

    let outcome = match_professors(&mut ratings, &mut rmp, &config.matching);
    let instructor_lookup = build_instructor_lookup(&outcome.matched);
    let mapped = map_grades_to_instructors(
        &input.grade_rows,
        &input.sections,
        &outcome.matched,
        &instructor_lookup,
    );
    if mapped.stats.processed == 0 {
        warn!("zero grade rows processed; summary rates omitted");
    }

    let summary = compute_summary(aggregation, outcome.summary, mapped.stats);
    info!(
        "reconciliation complete: {} matched names, {} instructor ids",
        outcome.matched.len(),
        instructor_lookup.len()
    );

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            fuzzy_threshold: config.matching.fuzzy_threshold,
        },
        summary,
        matched: outcome.matched,
        instructor_lookup,
        grades: mapped.grades,
    })
}

/// Parse one grade-snapshot CSV, already in memory, into typed rows.
///
/// Recognized columns: `Subject`, `Catalog Nbr` (the upstream export's
/// quoted `"Catalog Nbr"` header is tolerated), `Section`, `Instructor 1`,
/// an optional `Term`, and one column per grade symbol. Unknown columns are
/// ignored. Counts written as floats (`"12.0"`) are accepted.
pub fn load_grade_rows(csv_data: &str) -> Result<Vec<GradeRow>, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::CsvParse(e.to_string()))?
        .iter()
        .map(|header| header.trim_matches('"').trim().to_string())
        .collect();

    let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let require = |name: &str| {
        find(name).ok_or_else(|| ReconError::MissingColumn {
            column: name.to_string(),
        })
    };

    let subject_idx = require("Subject")?;
    let catalog_idx = require("Catalog Nbr")?;
    let section_idx = require("Section")?;
    let instructor_idx = require("Instructor 1")?;
    let term_idx = find("Term");
    let grade_columns: Vec<(usize, &str)> = GRADE_POINTS
        .iter()
        .filter_map(|(symbol, _)| {
            headers
                .iter()
                .position(|h| h == symbol)
                .map(|idx| (idx, *symbol))
        })
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::CsvParse(e.to_string()))?;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim().to_string();

        let mut grades = BTreeMap::new();
        for (idx, symbol) in &grade_columns {
            let raw = record.get(*idx).unwrap_or("").trim();
            if raw.is_empty() {
                continue;
            }
            let count = raw.parse::<f64>().unwrap_or(0.0) as u32;
            if count > 0 {
                grades.insert((*symbol).to_string(), count);
            }
        }

        rows.push(GradeRow {
            subject: field(subject_idx),
            catalog_nbr: field(catalog_idx),
            section: field(section_idx),
            term: term_idx.map(field).unwrap_or_default(),
            instructor_1: field(instructor_idx),
            grades,
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    use gradelink_core::{RmpProfile, Section};

    fn section(prefix: &str, number: &str, sec: &str, name: &str, id: &str) -> Section {
        Section {
            section_address: format!("{}{number}.{sec}24f", prefix.to_lowercase()),
            course_prefix: prefix.into(),
            course_number: number.into(),
            section_number: sec.into(),
            term: "24f".into(),
            instructor_names: vec![name.into()],
            instructor_ids: vec![id.into()],
            ..Default::default()
        }
    }

    fn rmp(display: &str, rmp_id: &str, courses: &[&str], count: u32) -> RmpProfile {
        RmpProfile {
            original_display_name: display.into(),
            rmp_id: rmp_id.into(),
            department: "Computer Science".into(),
            quality_rating: 4.2,
            difficulty_rating: 2.9,
            would_take_again: 87,
            ratings_count: count,
            courses: courses.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    const GRADES_CSV: &str = "\
Subject,Catalog Nbr,Section,Instructor 1,A+,A,A-,B+,B,W
CS,1337,001,\"Cole, John\",2,20,5,1,2,1
CS,1337,002,\"Cole, John\",0,15,5,3,1,0
ACCT,2301,001,\"Smith, John\",1,8,4,2,5,2
";

    #[test]
    fn load_grade_rows_basic() {
        let rows = load_grade_rows(GRADES_CSV).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].subject, "CS");
        assert_eq!(rows[0].catalog_nbr, "1337");
        assert_eq!(rows[0].instructor_1, "Cole, John");
        assert_eq!(rows[0].grades["A"], 20);
        assert_eq!(rows[0].total_count(), 31);
        // Zero cells never materialize as entries.
        assert!(!rows[1].grades.contains_key("A+"));
    }

    #[test]
    fn load_grade_rows_quoted_catalog_header() {
        let csv = "Subject,\"Catalog Nbr\",Section,Instructor 1,A\nCS,1337,001,\"Cole, John\",12.0\n";
        let rows = load_grade_rows(csv).unwrap();
        assert_eq!(rows[0].catalog_nbr, "1337");
        assert_eq!(rows[0].grades["A"], 12);
    }

    #[test]
    fn load_grade_rows_missing_column() {
        let err = load_grade_rows("Subject,Section,Instructor 1,A\nCS,001,X,1\n").unwrap_err();
        assert!(err.to_string().contains("Catalog Nbr"));
    }

    fn test_input() -> ReconInput {
        ReconInput {
            sections: vec![
                section("CS", "1337", "001.", "Cole, John", "jcole"),
                section("CS", "1337", "002.", "Cole, John", "jcole"),
                section("ACCT", "2301", "001.", "Smith, John", "jsmith"),
            ],
            grade_rows: load_grade_rows(GRADES_CSV).unwrap(),
            rmp_profiles: BTreeMap::from([
                (
                    "John Cole".to_string(),
                    vec![rmp("John Cole", "100", &["CS1337"], 25)],
                ),
                (
                    "Jon Smith".to_string(),
                    vec![rmp("Jon Smith", "200", &["ACCT2301"], 9)],
                ),
            ]),
        }
    }

    #[test]
    fn full_pipeline() {
        let result = run(&ReconConfig::default(), &test_input()).unwrap();

        // Direct match for Cole, fuzzy for Smith ("john smith" vs "jon smith").
        assert_eq!(result.summary.matching.direct_matches, 1);
        assert_eq!(result.summary.matching.fuzzy_matches, 1);
        assert_eq!(result.summary.matching.residue, 0);

        let cole = &result.matched["john cole"][0];
        assert_eq!(cole.rmp_id.as_deref(), Some("100"));
        assert_eq!(cole.instructor_id, "jcole");
        // Two sections of CS1337 aggregate into one profile.
        assert_eq!(cole.total_grade_count, 55);

        assert_eq!(result.instructor_lookup["jcole"].normalized_name, "john cole");
        assert_eq!(
            result.instructor_lookup["jsmith"].professor.rmp_id.as_deref(),
            Some("200")
        );

        // Every grade row got an id via the section join.
        assert_eq!(result.summary.mapping.processed, 3);
        assert_eq!(result.summary.mapping.section_matches, 3);
        assert_eq!(result.summary.mapping.no_matches, 0);
        assert_eq!(result.summary.section_match_rate, Some(100.0));
        for grade in &result.grades {
            assert!(!grade.instructor_id.is_empty());
            assert!(grade.has_rmp_data);
        }
    }

    #[test]
    fn pipeline_without_rmp_is_all_residue() {
        let mut input = test_input();
        input.rmp_profiles.clear();
        let result = run(&ReconConfig::default(), &input).unwrap();

        assert_eq!(result.summary.matching.direct_matches, 0);
        assert_eq!(result.summary.matching.residue, 2);
        // Names still resolve to ids through the section join.
        assert_eq!(result.summary.mapping.section_matches, 3);
        for entries in result.matched.values() {
            assert!(entries.iter().all(|e| e.rmp_id.is_none()));
        }
    }

    #[test]
    fn pipeline_empty_input_is_diagnostic_not_fatal() {
        let result = run(&ReconConfig::default(), &ReconInput::default()).unwrap();
        assert_eq!(result.summary.mapping.processed, 0);
        assert_eq!(result.summary.section_match_rate, None);
        assert!(result.matched.is_empty());
        assert!(result.grades.is_empty());
    }

    #[test]
    fn result_serializes_to_json() {
        let result = run(&ReconConfig::default(), &test_input()).unwrap();
        let json = result.to_json().unwrap();
        assert!(json.contains("\"instructor_lookup\""));
        assert!(json.contains("\"jcole\""));
    }

    #[test]
    fn repeated_runs_are_identical_modulo_meta() {
        let first = run(&ReconConfig::default(), &test_input()).unwrap();
        let second = run(&ReconConfig::default(), &test_input()).unwrap();
        assert_eq!(
            serde_json::to_value(&first.matched).unwrap(),
            serde_json::to_value(&second.matched).unwrap()
        );
        assert_eq!(
            serde_json::to_value(&first.instructor_lookup).unwrap(),
            serde_json::to_value(&second.instructor_lookup).unwrap()
        );
    }
}
