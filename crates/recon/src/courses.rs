//! Course-overlap heuristic.
//!
//! A permissive same-person signal from taught-course sets, used only as a
//! last-resort disambiguator among otherwise-tied homonym candidates, never
//! as a primary filter.

use std::collections::BTreeSet;

/// Uppercase alphanumeric form of a course code: `"cs 13-37"` -> `"CS1337"`.
pub fn normalize_course_code(code: &str) -> String {
    code.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase()
}

/// Normalize a whole collection of course codes into a comparable set.
pub fn normalize_course_set<I, S>(codes: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    codes
        .into_iter()
        .map(|code| normalize_course_code(code.as_ref()))
        .filter(|code| !code.is_empty())
        .collect()
}

/// Leading alphabetic run, e.g. `"CS1337"` -> `"CS"`.
fn department(code: &str) -> Option<&str> {
    let end = code
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(code.len());
    (end > 0).then(|| &code[..end])
}

/// Digits of the code, e.g. `"CS1337"` -> `"1337"`.
fn number(code: &str) -> Option<String> {
    let digits: String = code.chars().filter(char::is_ascii_digit).collect();
    (!digits.is_empty()).then_some(digits)
}

/// True when the two normalized course sets share a literal code, a
/// department prefix, or a numeric suffix.
///
/// Both inputs must already be in [`normalize_course_code`] form.
pub fn course_overlap<'a, L, R>(left: L, right: R) -> bool
where
    L: IntoIterator<Item = &'a String>,
    R: IntoIterator<Item = &'a String>,
{
    let left: BTreeSet<&str> = left.into_iter().map(String::as_str).collect();
    let right: BTreeSet<&str> = right.into_iter().map(String::as_str).collect();

    if left.intersection(&right).next().is_some() {
        return true;
    }

    let left_depts: BTreeSet<&str> = left.iter().filter_map(|c| department(c)).collect();
    let right_depts: BTreeSet<&str> = right.iter().filter_map(|c| department(c)).collect();
    if left_depts.intersection(&right_depts).next().is_some() {
        return true;
    }

    let left_numbers: BTreeSet<String> = left.iter().filter_map(|c| number(c)).collect();
    let right_numbers: BTreeSet<String> = right.iter().filter_map(|c| number(c)).collect();
    left_numbers.intersection(&right_numbers).next().is_some()
}
