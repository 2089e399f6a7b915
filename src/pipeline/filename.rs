//! Output naming: page title + date → file stem.
//!
//! `"Biology 101 - Spring"` on 2024-03-15 becomes
//! `Biology_101_QR_Codes_2024-03-15`. Only ASCII letters, digits and
//! whitespace survive cleaning, so the stem is safe on every filesystem.

use crate::labels::{FALLBACK_COURSE_NAME, FILE_STEM_INFIX};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9\s]").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// The course part of a page title.
///
/// Takes the text before the first `" - "`; if that is empty, the text
/// before the first `':'`; if that is empty too, `"Course"`.
pub fn course_name(title: &str) -> &str {
    let before_dash = title.split(" - ").next().unwrap_or_default();
    if !before_dash.is_empty() {
        return before_dash;
    }
    let before_colon = title.split(':').next().unwrap_or_default();
    if !before_colon.is_empty() {
        return before_colon;
    }
    FALLBACK_COURSE_NAME
}

/// Strip everything but ASCII alphanumerics and whitespace, then join the
/// remaining words with `_`.
pub fn clean_course_name(name: &str) -> String {
    let kept = RE_DISALLOWED.replace_all(name, "");
    RE_WHITESPACE.replace_all(kept.trim(), "_").into_owned()
}

/// Full file stem (no extension) for a document generated on `date`.
pub fn file_stem(title: Option<&str>, date: NaiveDate) -> String {
    let mut course = clean_course_name(course_name(title.unwrap_or_default()));
    if course.is_empty() {
        course = FALLBACK_COURSE_NAME.to_string();
    }
    format!("{}{}{}", course, FILE_STEM_INFIX, date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn dash_separated_title() {
        assert_eq!(
            file_stem(Some("Biology 101 - Spring"), d()),
            "Biology_101_QR_Codes_2024-03-15"
        );
    }

    #[test]
    fn course_name_precedence() {
        assert_eq!(course_name("People: Chem 2 - Fall"), "People: Chem 2");
        assert_eq!(course_name(" - : x"), " - ");
        assert_eq!(course_name(" - Chem: x"), " - Chem");
        assert_eq!(course_name(": rest"), "Course");
        assert_eq!(course_name(""), "Course");
        assert_eq!(course_name("Physics"), "Physics");
    }

    #[test]
    fn colon_and_punctuation_are_removed() {
        assert_eq!(
            file_stem(Some("People: Intro to C++ (Section 3)"), d()),
            "People_Intro_to_C_Section_3_QR_Codes_2024-03-15"
        );
    }

    #[test]
    fn non_ascii_letters_are_dropped() {
        assert_eq!(clean_course_name("Ökonomie  Grundkurs"), "konomie_Grundkurs");
    }

    #[test]
    fn missing_or_unusable_title_falls_back() {
        assert_eq!(file_stem(None, d()), "Course_QR_Codes_2024-03-15");
        assert_eq!(file_stem(Some("!!! - x"), d()), "Course_QR_Codes_2024-03-15");
    }
}
