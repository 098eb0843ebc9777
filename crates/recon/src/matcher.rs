//! The resolution core: pairs grade-derived rating profiles with
//! rating-site profiles, consuming each candidate at most once.
//!
//! Phase 1 pairs exact normalized-name matches. Phase 2 fuzzy-matches
//! whatever phase 1 left behind, comparing name variations with a
//! similarity threshold. Phase 3 emits the never-consumed remainder so no
//! instructor is silently dropped. Phase order is a correctness contract:
//! fuzzy matching must only ever see the residue of direct matching.

use std::collections::BTreeMap;

use log::{debug, info};

use gradelink_core::RmpProfile;

use crate::config::MatchingConfig;
use crate::courses::{course_overlap, normalize_course_set};
use crate::model::{
    MatchSummary, MatchedProfessor, RatingProfile, RatingsPool, RmpCandidate, RmpPool,
};
use crate::name::{name_variations, normalize_name, similarity};

/// Seed the rating-site pool from display-name-keyed profile variants.
pub fn build_rmp_pool(profiles: &BTreeMap<String, Vec<RmpProfile>>) -> RmpPool {
    let mut pool: RmpPool = BTreeMap::new();
    for (name, variants) in profiles {
        let key = normalize_name(name);
        if key.is_empty() {
            continue;
        }
        let entry = pool.entry(key).or_default();
        for profile in variants {
            entry.push(RmpCandidate {
                courses: normalize_course_set(&profile.courses),
                profile: profile.clone(),
            });
        }
    }
    pool
}

pub struct MatchOutcome {
    /// Normalized name -> matched and residue entries.
    pub matched: BTreeMap<String, Vec<MatchedProfessor>>,
    pub summary: MatchSummary,
}

/// Resolve rating profiles against rating-site profiles.
///
/// Both pools are mutated destructively: once a (rating, rmp) pair is
/// consumed, both profiles leave their pools and can never pair again.
/// Residue entries stay in `ratings` but are also emitted in the result, so
/// callers can inspect what went unmatched. Deterministic for identical
/// input: keys iterate in sorted order and ties break by highest
/// `ratings_count`, then first-seen.
pub fn match_professors(
    ratings: &mut RatingsPool,
    rmp: &mut RmpPool,
    config: &MatchingConfig,
) -> MatchOutcome {
    let mut summary = MatchSummary {
        ratings_entries: ratings.values().map(Vec::len).sum(),
        rmp_entries: rmp.values().map(Vec::len).sum(),
        ..Default::default()
    };
    info!(
        "matching {} rating profiles against {} rating-site profiles",
        summary.ratings_entries, summary.rmp_entries
    );

    let mut matched: BTreeMap<String, Vec<MatchedProfessor>> = BTreeMap::new();

    // Phase 1: direct normalized-name equality.
    let direct_keys: Vec<String> = rmp
        .keys()
        .filter(|key| ratings.contains_key(*key))
        .cloned()
        .collect();
    for key in direct_keys {
        let (Some(rating_list), Some(rmp_list)) = (ratings.get(&key), rmp.get(&key)) else {
            continue;
        };
        let Some((rating_idx, rmp_idx)) = select_direct_pair(rating_list, rmp_list) else {
            continue;
        };
        let Some(rating) = take_profile(ratings, &key, rating_idx) else {
            continue;
        };
        let Some(candidate) = take_profile(rmp, &key, rmp_idx) else {
            continue;
        };
        matched
            .entry(key)
            .or_default()
            .push(MatchedProfessor::merged(rating, &candidate.profile));
        summary.direct_matches += 1;
    }
    info!(
        "direct matches: {}; {} names left for fuzzy matching",
        summary.direct_matches,
        ratings.len()
    );

    // Phase 2: fuzzy matching over the remainder.
    let fuzzy_keys: Vec<String> = ratings.keys().cloned().collect();
    for key in fuzzy_keys {
        let Some(best_key) = best_fuzzy_key(&key, rmp, config.fuzzy_threshold) else {
            continue;
        };
        let Some(rating_list) = ratings.get(&key) else {
            continue;
        };
        let Some(rmp_list) = rmp.get(&best_key) else {
            continue;
        };
        // Disambiguate within the winning key against this name's first
        // remaining profile; the overlap gate always applies here.
        let Some(rmp_idx) = select_candidate(&rating_list[0], rmp_list) else {
            continue;
        };
        debug!("fuzzy match: '{key}' -> '{best_key}'");
        let Some(rating) = take_profile(ratings, &key, 0) else {
            continue;
        };
        let Some(candidate) = take_profile(rmp, &best_key, rmp_idx) else {
            continue;
        };
        matched
            .entry(key)
            .or_default()
            .push(MatchedProfessor::merged(rating, &candidate.profile));
        summary.fuzzy_matches += 1;
    }

    // Phase 3: emit whatever was never consumed.
    for (key, profiles) in ratings.iter() {
        let entry = matched.entry(key.clone()).or_default();
        for profile in profiles {
            entry.push(MatchedProfessor::residue(profile.clone()));
            summary.residue += 1;
        }
    }
    summary.unmatched_rmp = rmp.values().map(Vec::len).sum();
    info!(
        "fuzzy matches: {}; residue: {}; unmatched rating-site profiles: {}",
        summary.fuzzy_matches, summary.residue, summary.unmatched_rmp
    );

    MatchOutcome { matched, summary }
}

/// Remove one profile from a pool, dropping the key once its list empties.
fn take_profile<T>(pool: &mut BTreeMap<String, Vec<T>>, key: &str, index: usize) -> Option<T> {
    let list = pool.get_mut(key)?;
    if index >= list.len() {
        return None;
    }
    let item = list.remove(index);
    if list.is_empty() {
        pool.remove(key);
    }
    Some(item)
}

/// Pick the (rating, candidate) indices to consume for one directly-matched
/// name.
///
/// A lone profile on both sides pairs unconditionally. Otherwise the pair
/// must pass the course-overlap gate, and the highest `ratings_count` wins;
/// strict comparison keeps the first-seen pair on ties.
fn select_direct_pair(
    rating_list: &[RatingProfile],
    rmp_list: &[RmpCandidate],
) -> Option<(usize, usize)> {
    if rating_list.len() == 1 && rmp_list.len() == 1 {
        return Some((0, 0));
    }

    let mut best: Option<(usize, usize, u32)> = None;
    for (rating_idx, rating) in rating_list.iter().enumerate() {
        for (rmp_idx, candidate) in rmp_list.iter().enumerate() {
            if !course_overlap(&candidate.courses, rating.course_ratings.keys()) {
                continue;
            }
            let count = candidate.profile.ratings_count;
            if best.map_or(true, |(_, _, b)| count > b) {
                best = Some((rating_idx, rmp_idx, count));
            }
        }
    }
    best.map(|(rating_idx, rmp_idx, _)| (rating_idx, rmp_idx))
}

/// Overlap-gated, highest-`ratings_count` candidate within one rmp key.
fn select_candidate(rating: &RatingProfile, rmp_list: &[RmpCandidate]) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (rmp_idx, candidate) in rmp_list.iter().enumerate() {
        if !course_overlap(&candidate.courses, rating.course_ratings.keys()) {
            continue;
        }
        let count = candidate.profile.ratings_count;
        if best.map_or(true, |(_, b)| count > b) {
            best = Some((rmp_idx, count));
        }
    }
    best.map(|(rmp_idx, _)| rmp_idx)
}

/// Highest-scoring rmp key at or above the threshold, comparing every
/// variation of `key` against every variation of every rmp key. Strict
/// improvement keeps the first-seen (sorted-order) key on score ties.
fn best_fuzzy_key(key: &str, rmp: &RmpPool, threshold: f64) -> Option<String> {
    let variations = name_variations(key);
    let mut best: Option<(String, f64)> = None;

    for rmp_key in rmp.keys() {
        for rmp_variation in name_variations(rmp_key) {
            for variation in &variations {
                let score = similarity(variation, &rmp_variation);
                if score >= threshold && best.as_ref().map_or(true, |(_, b)| score > *b) {
                    best = Some((rmp_key.clone(), score));
                }
            }
        }
    }

    best.map(|(rmp_key, _)| rmp_key)
}
