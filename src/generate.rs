//! Top-level entry points: extract a roster, then generate the QR sheet.
//!
//! Extraction and generation are separate calls so the operator can review
//! the roster in between. Generation builds the whole PDF in memory and
//! returns it; nothing touches the disk until [`write_atomic`] (or
//! [`crate::session::Session::save`]) is called, so a failed run never
//! leaves a partial file behind.

use crate::config::{ExtractionConfig, GenerationConfig};
use crate::error::RosterQrError;
use crate::labels::{found_summary, success_status, LOADING_STATUS};
use crate::output::{GeneratedDocument, GenerationStats, RosterSnapshot};
use crate::pipeline::capabilities::load_capabilities;
use crate::pipeline::encode::{QrSymbolEncoder, SymbolEncoder};
use crate::pipeline::layout::{layout, DocumentBuilder};
use crate::pipeline::render::{PdfDocument, PdfDocumentBuilder};
use crate::pipeline::tree::HtmlDocument;
use crate::pipeline::{extract, filename, input};
use crate::session::{Session, Status};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Resolve `input` (path or URL) and extract its roster.
///
/// An empty roster is returned as `Ok`; callers that need records should
/// check [`RosterSnapshot::is_empty`] or go through [`generate`], which
/// rejects it with [`RosterQrError::NoDataFound`].
pub async fn extract_roster(
    input_str: impl AsRef<str>,
    config: &GenerationConfig,
) -> Result<RosterSnapshot, RosterQrError> {
    let input_str = input_str.as_ref();
    info!("Extracting roster from: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let snapshot = extract_from_html(&resolved.html, &config.extraction)?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_status(&if snapshot.is_empty() {
            Status::from(&RosterQrError::NoDataFound)
        } else {
            Status::info(found_summary(snapshot.len()))
        });
    }
    Ok(snapshot)
}

/// Parse `html` and run the selector chain over it.
///
/// The parsed tree is not `Send`; it is created and dropped inside this
/// synchronous call.
pub fn extract_from_html(html: &str, config: &ExtractionConfig) -> Result<RosterSnapshot, RosterQrError> {
    let document = HtmlDocument::parse(html);
    extract::extract(&document, config)
}

/// Generate the QR sheet for `snapshot`, dated today.
pub async fn generate(
    snapshot: &RosterSnapshot,
    config: &GenerationConfig,
) -> Result<GeneratedDocument, RosterQrError> {
    generate_on(snapshot, config, Local::now().date_naive()).await
}

/// Generate the QR sheet for `snapshot` with an explicit date.
pub async fn generate_on(
    snapshot: &RosterSnapshot,
    config: &GenerationConfig,
    date: NaiveDate,
) -> Result<GeneratedDocument, RosterQrError> {
    let builder = PdfDocumentBuilder::new(config.page.page_width, config.page.page_height);
    generate_with(snapshot, &QrSymbolEncoder::new(), builder, config, date).await
}

/// Generate with caller-supplied capabilities.
///
/// # Errors
/// - [`RosterQrError::NoDataFound`] for an empty snapshot
/// - [`RosterQrError::DependencyLoad`] when a capability fails to prepare
/// - [`RosterQrError::Render`] when any record fails; no document is returned
pub async fn generate_with<E, B>(
    snapshot: &RosterSnapshot,
    encoder: &E,
    builder: B,
    config: &GenerationConfig,
    date: NaiveDate,
) -> Result<GeneratedDocument, RosterQrError>
where
    E: SymbolEncoder + ?Sized,
    B: DocumentBuilder<Output = PdfDocument> + Sync,
{
    let result = run(snapshot, encoder, builder, config, date).await;

    if let Some(ref cb) = config.progress_callback {
        match &result {
            Ok(doc) => cb.on_status(&Status::success(success_status(doc.stats.record_count))),
            Err(e) => cb.on_status(&Status::from(e)),
        }
    }
    if let Err(ref e) = result {
        warn!("Generation failed: {}", e);
    }
    result
}

async fn run<E, B>(
    snapshot: &RosterSnapshot,
    encoder: &E,
    builder: B,
    config: &GenerationConfig,
    date: NaiveDate,
) -> Result<GeneratedDocument, RosterQrError>
where
    E: SymbolEncoder + ?Sized,
    B: DocumentBuilder<Output = PdfDocument> + Sync,
{
    let total_start = Instant::now();
    if snapshot.is_empty() {
        return Err(RosterQrError::NoDataFound);
    }

    // ── Step 1: Capabilities ─────────────────────────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_status(&Status::info(LOADING_STATUS));
    }
    let load_duration = load_capabilities(encoder, &builder).await?;

    // ── Step 2: Layout ───────────────────────────────────────────────────
    let layout_start = Instant::now();
    let laid_out = layout(&snapshot.records, encoder, builder, config, date).await?;
    let layout_duration_ms = layout_start.elapsed().as_millis() as u64;

    // ── Step 3: Name and stats ───────────────────────────────────────────
    let file_stem = filename::file_stem(snapshot.title.as_deref(), date);
    let pdf = laid_out.document;

    let stats = GenerationStats {
        record_count: snapshot.len(),
        page_count: pdf.page_count,
        byte_len: pdf.bytes.len(),
        load_duration_ms: load_duration.as_millis() as u64,
        layout_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Generated {} ({} records, {} pages, {} bytes) in {}ms",
        file_stem, stats.record_count, stats.page_count, stats.byte_len, stats.total_duration_ms
    );

    Ok(GeneratedDocument {
        file_stem,
        bytes: pdf.bytes,
        stats,
    })
}

/// Extract, generate and save into `output_dir` in one call.
///
/// The directory's [`Session`] lock is held for the whole run, so this fails
/// with [`RosterQrError::SessionActive`] while another run owns it.
/// Returns the path of the written PDF.
pub async fn generate_to_dir(
    input_str: impl AsRef<str>,
    output_dir: impl AsRef<Path>,
    config: &GenerationConfig,
) -> Result<(PathBuf, GenerationStats), RosterQrError> {
    let session = Session::open(output_dir)?;
    let snapshot = extract_roster(input_str, config).await?;
    let document = generate(&snapshot, config).await?;
    let path = session.save(&document).await?;
    Ok((path, document.stats))
}

/// Synchronous wrapper around [`extract_roster`] + [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    input_str: impl AsRef<str>,
    config: &GenerationConfig,
) -> Result<GeneratedDocument, RosterQrError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| RosterQrError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(async {
            let snapshot = extract_roster(input_str, config).await?;
            generate(&snapshot, config).await
        })
}

/// Write `bytes` to `path` via a temp file and rename.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RosterQrError> {
    let failed = |source| RosterQrError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(failed)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(failed)?;
    Ok(())
}
