//! Fixed texts printed on the QR sheet and shown to the operator.
//!
//! Keeping them in one place means a translation or a wording change
//! touches exactly one file, and tests can assert on the same constants the
//! engine uses.

use chrono::NaiveDate;

/// Default title for the first page header.
pub const DEFAULT_HEADING: &str = "Student QR Codes";

/// Suffix appended to the heading on every page after the first.
pub const CONTINUED_SUFFIX: &str = " (continued)";

/// Fallback course name when the page title yields nothing usable.
pub const FALLBACK_COURSE_NAME: &str = "Course";

/// Fixed part of every output file stem.
pub const FILE_STEM_INFIX: &str = "_QR_Codes_";

/// Heading for continuation pages.
pub fn continued_heading(heading: &str) -> String {
    format!("{heading}{CONTINUED_SUFFIX}")
}

/// Subtitle printed under the first page heading.
pub fn generated_on(date: NaiveDate) -> String {
    format!("Generated: {}", date.format("%Y-%m-%d"))
}

/// Second label line printed below each student name.
pub fn id_label(identifier: &str) -> String {
    format!("ID: {identifier}")
}

/// Status shown while capabilities are prepared.
pub const LOADING_STATUS: &str = "Loading libraries...";

/// Status shown when the layout pass begins.
pub const GENERATING_STATUS: &str = "Generating QR codes...";

/// Operator summary after extraction.
pub fn found_summary(count: usize) -> String {
    format!("Found {count} students")
}

/// Final status after a document was produced.
pub fn success_status(count: usize) -> String {
    format!("Success! Generated {count} QR codes in PDF")
}

/// Interim status while the layout engine works through the records.
pub fn processing_status(index: usize, total: usize, name: &str) -> String {
    format!("Processing {}/{}: {}", index + 1, total, name)
}
