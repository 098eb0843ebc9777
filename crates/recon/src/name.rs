//! Name canonicalization and variation generation.
//!
//! Instructor names arrive in inconsistent shapes across the three sources:
//! `"Last, First M."` from rosters, `"First Middle Last"` from the rating
//! site, hyphenated and accented forms from grade exports. Everything funnels
//! through [`normalize_name`] before any comparison.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Trailing middle initial(s): `" A"`, `" A."`, `" A.B"` at end of string.
static TRAILING_INITIALS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+[A-Z](\.[A-Z])*\.?\s*$").unwrap());

/// Apostrophe variants, including the mis-encoded UTF-8 sequence some
/// exports carry for the right single quote and the okina.
static APOSTROPHES: Lazy<Regex> = Lazy::new(|| Regex::new("['’ʻ`]|â€™|Ê»").unwrap());

/// Canonicalize a raw instructor name to lowercase `"first … last"` form.
///
/// Comma form is swapped to first-last order, trailing middle initials are
/// stripped, periods and apostrophes are removed (splitting glued initials
/// like `"J.D."`), hyphens become spaces, and whitespace is collapsed.
/// Idempotent, and never fails: the worst case is a best-effort cleaned
/// string.
pub fn normalize_name(raw: &str) -> String {
    let name = raw.trim();
    let name = TRAILING_INITIALS.replace(name, "");
    let name = APOSTROPHES.replace_all(&name, "");
    let name = name.replace('-', " ").replace('.', " ").to_lowercase();

    // "Last, First" -> "First Last". Any comma past the first is noise.
    let reordered = match name.split_once(',') {
        Some((last, first)) => format!("{} {}", first.replace(',', " "), last),
        None => name,
    };

    reordered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Alternate token orderings and subsets of a normalized name.
///
/// Bridges recording differences between sources: full name vs first+last,
/// swapped order, dropped middle tokens. Always contains the input itself.
pub fn name_variations(name: &str) -> BTreeSet<String> {
    let parts: Vec<&str> = name.split_whitespace().collect();
    let n = parts.len();

    let mut variations = BTreeSet::new();
    variations.insert(name.to_string());

    if n >= 2 {
        variations.insert(format!("{} {}", parts[1], parts[0]));
    }
    if n >= 3 {
        variations.insert(format!("{} {}", parts[0], parts[n - 1]));
        variations.insert(format!("{} {}", parts[0], parts[1]));
        variations.insert(format!("{} {}", parts[n - 1], parts[0]));
        variations.insert(parts[1..].join(" "));
        variations.insert(parts[..n - 1].join(" "));
    }
    if n >= 4 {
        variations.insert(format!("{} {}", parts[0], parts[2]));
        variations.insert(format!("{} {} {}", parts[0], parts[n - 2], parts[n - 1]));
        variations.insert(format!("{} {} {}", parts[0], parts[n - 3], parts[n - 2]));
        variations.insert(format!("{} {}", parts[0], parts[n - 3]));
    }

    variations
}

/// Normalized string similarity in [0, 100].
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}
