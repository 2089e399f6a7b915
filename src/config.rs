//! Configuration types for roster extraction and QR sheet generation.
//!
//! All behaviour is controlled through [`GenerationConfig`], built via its
//! [`GenerationConfigBuilder`]. The extraction rules, the page geometry and
//! the visual parameters of each QR symbol live in separate plain-data
//! structs so they can be serialised for logging and reused on their own.
//!
//! Every constant of the reference layout (A4 page, 2 × 6 grid, 20 mm
//! margin) is a default here rather than a hard-coded value in the engine.

use crate::error::RosterQrError;
use crate::labels::DEFAULT_HEADING;
use crate::pipeline::tree::compile_selector;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default selector strategies, most specific first, generic fallbacks last.
pub const DEFAULT_SELECTORS: &[&str] = &[
    // Current roster interface
    r#"[data-testid*="user"] a[href*="/users/"]"#,
    r#"tr[data-testid*="user"] td a[href*="/users/"]"#,
    // Classic roster interface
    r#".roster_user_name a[href*="/users/"]"#,
    r#".student_roster .student .name a[href*="/users/"]"#,
    // Generic fallbacks
    r#"a[href*="/users/"][href*="/courses/"]"#,
    r#".user_name a[href*="/users/"]"#,
];

/// Configuration for a full extract-and-generate run.
///
/// Built via [`GenerationConfig::builder()`] or using
/// [`GenerationConfig::default()`].
///
/// # Example
/// ```rust
/// use roster_qr::GenerationConfig;
///
/// let config = GenerationConfig::builder()
///     .grid(3, 8)
///     .margin(12.0)
///     .symbol_size(20.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.page.per_page(), 24);
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// How roster entries are located and filtered.
    pub extraction: ExtractionConfig,

    /// Page geometry and grid.
    pub page: PageConfig,

    /// Visual parameters passed to the symbol encoder for every record.
    pub symbol: SymbolStyle,

    /// Title printed on the first page; continuation pages append
    /// `" (continued)"`. Default: "Student QR Codes".
    pub heading: String,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Observer for per-record progress and status messages.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionConfig::default(),
            page: PageConfig::default(),
            symbol: SymbolStyle::default(),
            heading: DEFAULT_HEADING.to_string(),
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("extraction", &self.extraction)
            .field("page", &self.page)
            .field("symbol", &self.symbol)
            .field("heading", &self.heading)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn LayoutProgressCallback>"),
            )
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.extraction.selectors = selectors.into_iter().map(Into::into).collect();
        self
    }

    pub fn excluded_substring(mut self, s: impl Into<String>) -> Self {
        self.config.extraction.excluded_substring = s.into();
        self
    }

    pub fn name_length_bounds(mut self, min_exclusive: usize, max_exclusive: usize) -> Self {
        self.config.extraction.min_name_len = min_exclusive;
        self.config.extraction.max_name_len = max_exclusive;
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        let (w, h) = size.dimensions_mm();
        self.config.page.page_width = w;
        self.config.page.page_height = h;
        self
    }

    pub fn grid(mut self, columns: usize, rows: usize) -> Self {
        self.config.page.columns = columns.max(1);
        self.config.page.rows = rows.max(1);
        self
    }

    pub fn margin(mut self, mm: f32) -> Self {
        self.config.page.margin = mm.max(0.0);
        self
    }

    pub fn header_height(mut self, mm: f32) -> Self {
        self.config.page.header_height = mm.max(0.0);
        self
    }

    pub fn symbol_size(mut self, mm: f32) -> Self {
        self.config.page.symbol_size = mm.max(5.0);
        self
    }

    pub fn label_font_size(mut self, pt: f32) -> Self {
        self.config.page.label_font_size = pt.clamp(4.0, 24.0);
        self
    }

    pub fn symbol_pixels(mut self, px: u32) -> Self {
        self.config.symbol.pixel_size = px.clamp(21, 2000);
        self
    }

    pub fn quiet_zone(mut self, modules: u32) -> Self {
        self.config.symbol.quiet_zone = modules.min(10);
        self
    }

    pub fn colors(mut self, foreground: Color, background: Color) -> Self {
        self.config.symbol.foreground = foreground;
        self.config.symbol.background = background;
        self
    }

    pub fn heading(mut self, heading: impl Into<String>) -> Self {
        self.config.heading = heading.into();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, RosterQrError> {
        let c = &self.config;
        if c.extraction.selectors.is_empty() {
            return Err(RosterQrError::InvalidConfig(
                "At least one selector strategy is required".into(),
            ));
        }
        for selector in &c.extraction.selectors {
            compile_selector(selector)?;
        }
        if c.extraction.min_name_len >= c.extraction.max_name_len {
            return Err(RosterQrError::InvalidConfig(format!(
                "Name length bounds are empty: ({}, {})",
                c.extraction.min_name_len, c.extraction.max_name_len
            )));
        }
        c.page.validate()?;
        if c.symbol.foreground == c.symbol.background {
            return Err(RosterQrError::InvalidConfig(
                "QR foreground and background colours must differ".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Extraction ───────────────────────────────────────────────────────────

/// Rules for locating and filtering roster entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// CSS selector strategies tried in order; the first one matching any
    /// element wins.
    pub selectors: Vec<String>,

    /// Names must be strictly longer than this many characters. Default: 2.
    pub min_name_len: usize,

    /// Names must be strictly shorter than this many characters. Default: 100.
    pub max_name_len: usize,

    /// Names containing this substring (case-insensitive) are dropped.
    /// Default: "test user". An empty string disables the check.
    pub excluded_substring: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            selectors: DEFAULT_SELECTORS.iter().map(|s| s.to_string()).collect(),
            min_name_len: 2,
            max_name_len: 100,
            excluded_substring: "test user".to_string(),
        }
    }
}

// ── Page geometry ────────────────────────────────────────────────────────

/// Baseline-to-baseline distance in millimetres for text at `font_size` points.
pub fn line_step_mm(font_size: f32) -> f32 {
    font_size * LINE_SPACING * 25.4 / 72.0
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSize {
    /// 210 × 297 mm (default).
    #[default]
    A4,
    /// 8.5 × 11 in.
    Letter,
}

impl PageSize {
    /// Width and height in millimetres.
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::Letter => (215.9, 279.4),
        }
    }
}

/// Vertical distance from the bottom of the symbol to the name baseline.
pub const NAME_BASELINE_OFFSET_MM: f32 = 5.0;
/// Vertical distance between the last name line and the identifier baseline.
pub const LABEL_LINE_HEIGHT_MM: f32 = 4.0;
/// Names wrap onto at most this many lines; the rest is elided.
pub const NAME_MAX_LINES: usize = 2;
/// Baseline-to-baseline distance of wrapped text as a multiple of the font size.
pub const LINE_SPACING: f32 = 1.15;
/// Horizontal slack subtracted from the cell width for label wrapping.
pub const LABEL_SIDE_PADDING_MM: f32 = 5.0;

/// Page geometry for the QR grid. Lengths are in millimetres, font sizes in
/// points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageConfig {
    pub page_width: f32,
    pub page_height: f32,
    /// Outer margin on every side. Default: 20.
    pub margin: f32,
    /// Band below the top margin reserved for the page header. Default: 15.
    pub header_height: f32,
    /// Cells per row. Default: 2.
    pub columns: usize,
    /// Rows per page. Default: 6.
    pub rows: usize,
    /// Printed edge length of each QR symbol. Default: 25.
    pub symbol_size: f32,
    pub label_font_size: f32,
    pub title_font_size: f32,
    pub subtitle_font_size: f32,
}

impl Default for PageConfig {
    fn default() -> Self {
        let (page_width, page_height) = PageSize::A4.dimensions_mm();
        Self {
            page_width,
            page_height,
            margin: 20.0,
            header_height: 15.0,
            columns: 2,
            rows: 6,
            symbol_size: 25.0,
            label_font_size: 9.0,
            title_font_size: 16.0,
            subtitle_font_size: 10.0,
        }
    }
}

impl PageConfig {
    /// Number of cells on one page.
    pub fn per_page(&self) -> usize {
        self.columns * self.rows
    }

    pub fn cell_width(&self) -> f32 {
        (self.page_width - self.margin * 2.0) / self.columns as f32
    }

    /// Cells share the height left below the header band.
    pub fn cell_height(&self) -> f32 {
        (self.page_height - self.margin * 2.0 - self.header_height) / self.rows as f32
    }

    /// Maximum label width inside one cell.
    pub fn label_max_width(&self) -> f32 {
        (self.cell_width() - LABEL_SIDE_PADDING_MM).max(1.0)
    }

    /// Height needed by one cell's content: symbol, every name line, ID line.
    pub fn cell_content_height(&self) -> f32 {
        self.symbol_size
            + NAME_BASELINE_OFFSET_MM
            + (NAME_MAX_LINES - 1) as f32 * line_step_mm(self.label_font_size)
            + LABEL_LINE_HEIGHT_MM
    }

    fn validate(&self) -> Result<(), RosterQrError> {
        if self.columns == 0 || self.rows == 0 {
            return Err(RosterQrError::InvalidConfig(
                "Grid must have at least one column and one row".into(),
            ));
        }
        if self.cell_width() <= 0.0 || self.cell_height() <= 0.0 {
            return Err(RosterQrError::InvalidConfig(format!(
                "Margins ({} mm) and header ({} mm) leave no room on a {}×{} mm page",
                self.margin, self.header_height, self.page_width, self.page_height
            )));
        }
        if self.symbol_size > self.cell_width() {
            return Err(RosterQrError::InvalidConfig(format!(
                "Symbol size {:.1} mm exceeds cell width {:.1} mm",
                self.symbol_size,
                self.cell_width()
            )));
        }
        if self.cell_content_height() > self.cell_height() {
            return Err(RosterQrError::InvalidConfig(format!(
                "Symbol and labels need {:.1} mm but a cell is only {:.1} mm tall; \
                 use fewer rows or a smaller symbol",
                self.cell_content_height(),
                self.cell_height()
            )));
        }
        Ok(())
    }
}

// ── Symbol appearance ────────────────────────────────────────────────────

/// An opaque sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };

    /// Parse `#RRGGBB` (the leading `#` is optional).
    pub fn from_hex(s: &str) -> Result<Self, RosterQrError> {
        let hex = s.trim().trim_start_matches('#');
        let bad = || RosterQrError::InvalidConfig(format!("Invalid colour '{s}', expected #RRGGBB"));
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(bad());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| bad());
        Ok(Color {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Fixed visual parameters for every QR symbol in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolStyle {
    /// Target raster edge length in pixels. Default: 200.
    pub pixel_size: u32,
    /// Quiet-zone width in modules. Default: 1.
    pub quiet_zone: u32,
    pub foreground: Color,
    pub background: Color,
}

impl Default for SymbolStyle {
    fn default() -> Self {
        Self {
            pixel_size: 200,
            quiet_zone: 1,
            foreground: Color::BLACK,
            background: Color::WHITE,
        }
    }
}
