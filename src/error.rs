//! Error types for the roster-qr library.
//!
//! Two error types reflect two layers of failure:
//!
//! * [`RosterQrError`]: **Operation-level**: the current operation cannot
//!   complete (input missing, no students found, a capability failed to
//!   load, the document could not be rendered). Returned as
//!   `Err(RosterQrError)` from the top-level entry points and converted to a
//!   human-readable [`crate::session::Status`] at the boundary.
//!
//! * [`RenderError`]: the detail of a failure *inside* the layout pass.
//!   Any render error aborts the whole document; it is wrapped into
//!   [`RosterQrError::Render`] so callers see a single error type.
//!
//! None of these are retried automatically. A failed generation leaves the
//! session open so the operator can try again.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the roster-qr library.
#[derive(Debug, Error)]
pub enum RosterQrError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Roster page not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// Extraction yielded zero records.
    #[error(
        "No students found.\n\
Make sure the input is the course People page and students are visible.\n\
Try scrolling down to load all students, save the page again, and re-run."
    )]
    NoDataFound,

    // ── Generation errors ─────────────────────────────────────────────────
    /// An external capability (symbol encoder, document builder) failed to
    /// become available.
    #[error("Failed to load required capability '{capability}': {detail}\nPlease try again.")]
    DependencyLoad { capability: String, detail: String },

    /// Symbol encoding or document assembly failed mid-pass. No partial
    /// document was saved.
    #[error("Error generating PDF: {0}\nNo file was written. Please try again.")]
    Render(#[from] RenderError),

    // ── Session errors ────────────────────────────────────────────────────
    /// Another session already holds the lock.
    #[error(
        "Another roster2qr session is already active (lock file '{lock}').\n\
If no other run is in progress, delete the lock file and retry."
    )]
    SessionActive { lock: PathBuf },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// A selector strategy is not valid CSS.
    #[error("Invalid selector '{selector}': {detail}")]
    InvalidSelector { selector: String, detail: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failure inside the layout pass.
///
/// The engine never skips a record: the first render error aborts the run.
#[derive(Debug, Clone, Error, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum RenderError {
    /// The symbol encoder could not produce an image for a record.
    #[error("QR code for record {index} ('{name}') failed: {detail}")]
    SymbolEncoding {
        index: usize,
        name: String,
        detail: String,
    },

    /// The document builder rejected an operation or could not finish.
    #[error("document assembly failed: {detail}")]
    Document { detail: String },
}

/// Failure reported by an external capability (symbol encoder, document
/// builder). The engine attaches the record context before surfacing it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct CapabilityError(pub String);

impl CapabilityError {
    pub fn new(detail: impl Into<String>) -> Self {
        CapabilityError(detail.into())
    }
}

impl RenderError {
    pub fn document(detail: impl Into<String>) -> Self {
        RenderError::Document {
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_data_found_mentions_people_page() {
        let msg = RosterQrError::NoDataFound.to_string();
        assert!(msg.contains("No students found"), "got: {msg}");
        assert!(msg.contains("People"), "got: {msg}");
    }

    #[test]
    fn render_error_wraps_symbol_failure() {
        let e: RosterQrError = RenderError::SymbolEncoding {
            index: 5,
            name: "Ada Lovelace".into(),
            detail: "data too long".into(),
        }
        .into();
        let msg = e.to_string();
        assert!(msg.contains("record 5"), "got: {msg}");
        assert!(msg.contains("Ada Lovelace"), "got: {msg}");
        assert!(msg.contains("No file was written"), "got: {msg}");
    }

    #[test]
    fn dependency_load_display() {
        let e = RosterQrError::DependencyLoad {
            capability: "qr-encoder".into(),
            detail: "probe failed".into(),
        };
        assert!(e.to_string().contains("qr-encoder"));
        assert!(e.to_string().contains("probe failed"));
    }

    #[test]
    fn session_active_names_lock_file() {
        let e = RosterQrError::SessionActive {
            lock: PathBuf::from("/tmp/out/.roster2qr.lock"),
        };
        assert!(e.to_string().contains(".roster2qr.lock"));
    }

    #[test]
    fn document_helper_builds_variant() {
        assert_eq!(
            RenderError::document("bad page"),
            RenderError::Document {
                detail: "bad page".into()
            }
        );
    }
}
