//! Operator session: exclusive ownership of an output directory plus the
//! status messages shown to the operator.
//!
//! ## Why a lock file?
//!
//! Two overlapping runs writing into the same directory would race on the
//! output file. [`Session::open`] creates `.roster2qr.lock` with
//! `create_new`, which is atomic on every platform we target, and the
//! lock is removed again when the session is dropped. A stale lock left by
//! a killed process has to be deleted by hand; the error message says so.

use crate::error::RosterQrError;
use crate::output::GeneratedDocument;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the lock file created inside the output directory.
pub const LOCK_FILE_NAME: &str = ".roster2qr.lock";

// ── Status ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Info,
    Success,
    Warning,
    Error,
}

impl StatusKind {
    pub fn label(self) -> &'static str {
        match self {
            StatusKind::Info => "info",
            StatusKind::Success => "success",
            StatusKind::Warning => "warning",
            StatusKind::Error => "error",
        }
    }
}

/// A human-readable message for the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

impl Status {
    pub fn new(kind: StatusKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(StatusKind::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(StatusKind::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(StatusKind::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(StatusKind::Error, message)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<&RosterQrError> for Status {
    fn from(err: &RosterQrError) -> Self {
        match err {
            // Nothing went wrong; there was simply nothing to do.
            RosterQrError::NoDataFound => Status::warning(err.to_string()),
            _ => Status::error(err.to_string()),
        }
    }
}

// ── Session ──────────────────────────────────────────────────────────────

/// An exclusive claim on an output directory for one operator interaction.
#[derive(Debug)]
pub struct Session {
    output_dir: PathBuf,
    lock_path: PathBuf,
}

impl Session {
    /// Claim `output_dir`, creating it if necessary.
    ///
    /// # Errors
    /// - [`RosterQrError::SessionActive`] when another session holds the lock
    /// - [`RosterQrError::OutputWriteFailed`] when the directory or the lock
    ///   file cannot be created
    pub fn open(output_dir: impl AsRef<Path>) -> Result<Self, RosterQrError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir).map_err(|e| RosterQrError::OutputWriteFailed {
            path: output_dir.clone(),
            source: e,
        })?;

        let lock_path = output_dir.join(LOCK_FILE_NAME);
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => RosterQrError::SessionActive {
                    lock: lock_path.clone(),
                },
                _ => RosterQrError::OutputWriteFailed {
                    path: lock_path.clone(),
                    source: e,
                },
            })?;

        // The pid helps the operator decide whether a lock is stale.
        if let Err(e) = writeln!(file, "{}", std::process::id()) {
            debug!("Could not write pid into {}: {}", lock_path.display(), e);
        }

        info!("Session opened in {}", output_dir.display());
        Ok(Self {
            output_dir,
            lock_path,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Where `document` would be written.
    pub fn output_path(&self, document: &GeneratedDocument) -> PathBuf {
        self.output_dir.join(document.file_name())
    }

    /// Atomically save `document` into the output directory.
    pub async fn save(&self, document: &GeneratedDocument) -> Result<PathBuf, RosterQrError> {
        let path = self.output_path(document);
        crate::generate::write_atomic(&path, &document.bytes).await?;
        info!("Saved {} ({} bytes)", path.display(), document.bytes.len());
        Ok(path)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.lock_path) {
            warn!("Failed to remove lock {}: {}", self.lock_path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_session_is_refused_until_first_drops() {
        let dir = tempfile::tempdir().unwrap();

        let first = Session::open(dir.path()).unwrap();
        assert!(first.lock_path().exists());

        let err = Session::open(dir.path()).unwrap_err();
        assert!(matches!(err, RosterQrError::SessionActive { .. }), "got {err:?}");

        drop(first);
        assert!(!dir.path().join(LOCK_FILE_NAME).exists());
        Session::open(dir.path()).expect("lock released on drop");
    }

    #[test]
    fn open_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        let session = Session::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(session.output_dir(), nested.as_path());
    }

    #[test]
    fn status_from_errors() {
        let s = Status::from(&RosterQrError::NoDataFound);
        assert_eq!(s.kind, StatusKind::Warning);
        assert!(s.message.contains("No students found"));

        let s = Status::from(&RosterQrError::Internal("x".into()));
        assert_eq!(s.kind, StatusKind::Error);
    }

    #[test]
    fn status_serialises_kind_lowercase() {
        let json = serde_json::to_string(&Status::success("done")).unwrap();
        assert_eq!(json, r#"{"kind":"success","message":"done"}"#);
    }
}
