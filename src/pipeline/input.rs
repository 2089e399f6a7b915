//! Input resolution: turn a user-supplied path or URL into page markup.
//!
//! A saved roster page is small, so both sources are read fully into
//! memory. Local files are checked up front so the operator gets a
//! "not found" or "permission denied" message instead of a bare I/O error.

use crate::error::RosterQrError;
use std::path::PathBuf;
use tracing::{debug, info};

/// Markup plus where it came from.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    pub source: InputSource,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Local(PathBuf),
    Downloaded { url: String },
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a path or URL to the HTML text of the roster page.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, RosterQrError> {
    if input.trim().is_empty() {
        return Err(RosterQrError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<ResolvedInput, RosterQrError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(RosterQrError::PermissionDenied { path });
        }
        Err(_) => return Err(RosterQrError::InputNotFound { path }),
    };

    // Saved pages are occasionally Latin-1; keep going with replacement chars.
    let html = String::from_utf8_lossy(&bytes).into_owned();
    debug!("Read {} bytes from {}", bytes.len(), path.display());

    Ok(ResolvedInput {
        source: InputSource::Local(path),
        html,
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, RosterQrError> {
    info!("Downloading roster page from: {}", url);

    let failed = |reason: String| RosterQrError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            RosterQrError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let html = response.text().await.map_err(|e| failed(e.to_string()))?;
    info!("Downloaded {} bytes", html.len());

    Ok(ResolvedInput {
        source: InputSource::Downloaded {
            url: url.to_string(),
        },
        html,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://school.example/courses/1/users"));
        assert!(is_url("http://localhost:8080/people.html"));
        assert!(!is_url("/tmp/people.html"));
        assert!(!is_url("people.html"));
        assert!(!is_url(""));
    }

    #[tokio::test]
    async fn missing_file_is_input_not_found() {
        let err = resolve_input("/definitely/not/here/people.html", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, RosterQrError::InputNotFound { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn blank_input_is_invalid() {
        let err = resolve_input("   ", 5).await.unwrap_err();
        assert!(matches!(err, RosterQrError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn reads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.html");
        std::fs::write(&path, "<title>X</title>").unwrap();

        let resolved = resolve_input(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(resolved.html, "<title>X</title>");
        assert_eq!(resolved.source, InputSource::Local(path));
    }
}
