//! # roster-qr
//!
//! Turn a course roster page into a printable sheet of QR codes, one per
//! student.
//!
//! ## Why this crate?
//!
//! Attendance and hand-in workflows often scan a code per student. The
//! roster already lives in the learning platform's People page; this crate
//! reads a saved (or downloaded) copy of that page, finds the student links,
//! and lays out a paginated PDF with a QR symbol, the name and the user ID
//! in every grid cell.
//!
//! ## Pipeline Overview
//!
//! ```text
//! HTML page
//!  │
//!  ├─ 1. Input    read a local file or download from URL
//!  ├─ 2. Extract  first matching selector wins; filter, dedup, sort by name
//!  ├─ 3. Review   operator confirms the list (CLI)
//!  ├─ 4. Load     prepare QR encoder + PDF builder concurrently
//!  ├─ 5. Layout   C × R grid per page, QR rasterised in spawn_blocking
//!  └─ 6. Save     atomic write of {Course}_QR_Codes_{date}.pdf
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roster_qr::{extract_roster, generate, GenerationConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GenerationConfig::default();
//!     let session = Session::open("output")?;
//!
//!     let roster = extract_roster("people.html", &config).await?;
//!     println!("Found {} students", roster.len());
//!
//!     let document = generate(&roster, &config).await?;
//!     let path = session.save(&document).await?;
//!     println!("Wrote {}", path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `roster2qr` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! roster-qr = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod labels;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    Color, ExtractionConfig, GenerationConfig, GenerationConfigBuilder, PageConfig, PageSize,
    SymbolStyle, DEFAULT_SELECTORS,
};
pub use error::{CapabilityError, RenderError, RosterQrError};
pub use generate::{
    extract_from_html, extract_roster, generate, generate_on, generate_sync, generate_to_dir,
    generate_with, write_atomic,
};
pub use output::{GeneratedDocument, GenerationStats, Record, RosterSnapshot};
pub use pipeline::encode::{QrSymbolEncoder, SymbolEncoder, SymbolImage};
pub use pipeline::layout::{
    layout, page_count, placement_for, DocumentBuilder, LayoutCursor, Placement, Point, Rect,
    TextAlign, TextStyle,
};
pub use pipeline::render::{PdfDocument, PdfDocumentBuilder};
pub use pipeline::tree::{DocumentTree, HtmlDocument, LinkNode};
pub use progress::{LayoutProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::{Session, Status, StatusKind};
