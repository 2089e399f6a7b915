//! Paginated layout engine: one QR cell per record on a fixed grid.
//!
//! ## Grid arithmetic
//!
//! For `C` columns and `R` rows per page the record at 0-based index `i`
//! lands on page `i / (C·R)`, row `(i mod C·R) / C`, column `i mod C`.
//! [`LayoutCursor`] advances through exactly that sequence one record at a
//! time; [`placement_for`] is the closed form used by previews and tests.
//!
//! ## Failure policy
//!
//! The engine never skips a record. The first encoder or builder failure
//! aborts the run with [`RenderError`] and the builder is dropped unfinished,
//! so no partial document ever reaches the caller.
//!
//! All coordinates are millimetres with the origin at the top-left corner of
//! the page and `y` growing downwards; builders convert to their own space.

use crate::config::{
    line_step_mm, GenerationConfig, PageConfig, LABEL_LINE_HEIGHT_MM, NAME_BASELINE_OFFSET_MM,
    NAME_MAX_LINES,
};
use crate::error::{CapabilityError, RenderError, RosterQrError};
use crate::labels::{continued_heading, generated_on, id_label, processing_status, GENERATING_STATUS};
use crate::output::Record;
use crate::pipeline::encode::{SymbolEncoder, SymbolImage};
use crate::progress::LayoutProgressCallback;
use crate::session::Status;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ── Geometry ─────────────────────────────────────────────────────────────

/// An axis-aligned rectangle in page millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A text anchor in page millimetres. `y` is the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
    Left,
    Center,
}

/// How a builder should set one piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Font size in points.
    pub font_size: f32,
    pub align: TextAlign,
    /// Wrap onto further lines beyond this width (mm).
    pub max_width: Option<f32>,
    /// Elide whatever does not fit in this many wrapped lines.
    pub max_lines: Option<usize>,
}

impl TextStyle {
    pub fn centered(font_size: f32) -> Self {
        Self {
            font_size,
            align: TextAlign::Center,
            max_width: None,
            max_lines: None,
        }
    }

    pub fn clamped(mut self, max_width: f32) -> Self {
        self.max_width = Some(max_width);
        self
    }

    pub fn limited(mut self, max_lines: usize) -> Self {
        self.max_lines = Some(max_lines.max(1));
        self
    }
}

// ── Document builder capability ─────────────────────────────────────────

/// Incremental multi-page document assembly.
///
/// A builder starts on page 1. `finish` consumes it, so an aborted run that
/// simply drops the builder can never leak a half-written document.
pub trait DocumentBuilder {
    type Output;

    /// Short name used in capability-load errors and logs.
    fn name(&self) -> &str {
        "document-builder"
    }

    /// Verify the builder is usable before any record is processed.
    fn prepare(&self) -> Result<(), CapabilityError> {
        Ok(())
    }

    fn add_image(&mut self, image: &SymbolImage, area: Rect) -> Result<(), CapabilityError>;

    /// Set `text` with its first baseline at `anchor`. Wrapped lines follow
    /// [`line_step_mm`] apart. Returns the number of lines drawn.
    fn add_text(&mut self, text: &str, anchor: Point, style: &TextStyle) -> Result<usize, CapabilityError>;

    fn new_page(&mut self) -> Result<(), CapabilityError>;

    fn finish(self) -> Result<Self::Output, CapabilityError>;
}

// ── Cursor ───────────────────────────────────────────────────────────────

/// Where one record was (or will be) placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub index: usize,
    pub page: usize,
    pub row: usize,
    pub column: usize,
}

/// The `(page, row, column)` position tracker for one layout pass.
///
/// Also an infinite [`Iterator`] of [`Placement`]s; use `.take(n)`.
#[derive(Debug, Clone)]
pub struct LayoutCursor {
    columns: usize,
    rows: usize,
    index: usize,
    page: usize,
    row: usize,
    column: usize,
}

impl LayoutCursor {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns: columns.max(1),
            rows: rows.max(1),
            index: 0,
            page: 0,
            row: 0,
            column: 0,
        }
    }

    pub fn current(&self) -> Placement {
        Placement {
            index: self.index,
            page: self.page,
            row: self.row,
            column: self.column,
        }
    }

    /// Move to the next cell. Returns `true` when that cell is on a new page.
    pub fn advance(&mut self) -> bool {
        self.index += 1;
        self.column += 1;
        if self.column == self.columns {
            self.column = 0;
            self.row += 1;
            if self.row == self.rows {
                self.row = 0;
                self.page += 1;
                return true;
            }
        }
        false
    }
}

impl Iterator for LayoutCursor {
    type Item = Placement;

    fn next(&mut self) -> Option<Placement> {
        let placement = self.current();
        self.advance();
        Some(placement)
    }
}

/// Closed-form placement of record `index` on a `columns × rows` grid.
pub fn placement_for(index: usize, columns: usize, rows: usize) -> Placement {
    let columns = columns.max(1);
    let per_page = columns * rows.max(1);
    let within = index % per_page;
    Placement {
        index,
        page: index / per_page,
        row: within / columns,
        column: index % columns,
    }
}

/// Pages needed for `records` entries at `per_page` cells per page.
pub fn page_count(records: usize, per_page: usize) -> usize {
    records.div_ceil(per_page.max(1))
}

/// The cell rectangle at `(row, column)`.
pub fn cell_rect(page: &PageConfig, row: usize, column: usize) -> Rect {
    let width = page.cell_width();
    let height = page.cell_height();
    Rect {
        x: page.margin + column as f32 * width,
        y: page.margin + page.header_height + row as f32 * height,
        width,
        height,
    }
}

/// The symbol rectangle: top of the cell, horizontally centered.
pub fn symbol_rect(page: &PageConfig, cell: Rect) -> Rect {
    Rect {
        x: cell.x + (cell.width - page.symbol_size) / 2.0,
        y: cell.y,
        width: page.symbol_size,
        height: page.symbol_size,
    }
}

/// Baselines of the page title and subtitle.
pub fn header_baselines(page: &PageConfig) -> (f32, f32) {
    let title = (page.margin * 0.75).max(page.title_font_size * 0.3528);
    let subtitle = (page.margin + page.header_height / 3.0).max(title + 4.0);
    (title, subtitle)
}

// ── Engine ───────────────────────────────────────────────────────────────

/// A finished layout pass.
#[derive(Debug)]
pub struct LayoutOutput<T> {
    /// Whatever the builder produced in `finish`.
    pub document: T,
    pub page_count: usize,
    /// One entry per record, in input order.
    pub placements: Vec<Placement>,
}

/// Lay out every record on the grid and finish the document.
///
/// Records are placed in input order. Each record costs exactly one
/// `encode` call; the first failure aborts the run.
///
/// # Errors
/// - [`RosterQrError::NoDataFound`] when `records` is empty
/// - [`RosterQrError::Render`] when the encoder or the builder fails
pub async fn layout<E, B>(
    records: &[Record],
    encoder: &E,
    mut builder: B,
    config: &GenerationConfig,
    date: NaiveDate,
) -> Result<LayoutOutput<B::Output>, RosterQrError>
where
    E: SymbolEncoder + ?Sized,
    B: DocumentBuilder,
{
    if records.is_empty() {
        return Err(RosterQrError::NoDataFound);
    }

    let page = &config.page;
    let total = records.len();
    let callback = config.progress_callback.as_deref();
    let label_style = TextStyle::centered(page.label_font_size)
        .clamped(page.label_max_width())
        .limited(NAME_MAX_LINES);

    if let Some(cb) = callback {
        cb.on_layout_start(total);
        cb.on_status(&Status::info(GENERATING_STATUS));
    }

    write_header(&mut builder, page, &config.heading, Some(date))
        .map_err(|e| abort(callback, 0, total, RenderError::document(e.0)))?;

    let mut cursor = LayoutCursor::new(page.columns, page.rows);
    let mut placements = Vec::with_capacity(total);

    for (index, record) in records.iter().enumerate() {
        if let Some(cb) = callback {
            cb.on_record_start(index, total, &record.name);
            cb.on_status(&Status::info(processing_status(index, total, &record.name)));
        }

        let image = encoder
            .encode(&record.display_text, &config.symbol)
            .await
            .map_err(|e| {
                abort(
                    callback,
                    index,
                    total,
                    RenderError::SymbolEncoding {
                        index,
                        name: record.name.clone(),
                        detail: e.0,
                    },
                )
            })?;

        let placement = cursor.current();
        place_record(&mut builder, page, &label_style, record, &image, placement)
            .map_err(|e| abort(callback, index, total, RenderError::document(e.0)))?;
        debug!(
            "Placed {:?} on page {} row {} col {}",
            record.name,
            placement.page + 1,
            placement.row,
            placement.column
        );
        placements.push(placement);

        if let Some(cb) = callback {
            cb.on_record_complete(index, total);
        }

        // Only open a page when another record still needs it.
        if cursor.advance() && index + 1 < total {
            builder
                .new_page()
                .and_then(|_| {
                    write_header(&mut builder, page, &continued_heading(&config.heading), None)
                })
                .map_err(|e| abort(callback, index, total, RenderError::document(e.0)))?;
        }
    }

    let pages = page_count(total, page.per_page());
    let document = builder
        .finish()
        .map_err(|e| abort(callback, total.saturating_sub(1), total, RenderError::document(e.0)))?;

    info!("Laid out {} records on {} pages", total, pages);
    if let Some(cb) = callback {
        cb.on_layout_complete(total, pages);
    }

    Ok(LayoutOutput {
        document,
        page_count: pages,
        placements,
    })
}

/// Title (and, on the first page, the generation date) centered at the top.
fn write_header<B: DocumentBuilder>(
    builder: &mut B,
    page: &PageConfig,
    heading: &str,
    date: Option<NaiveDate>,
) -> Result<(), CapabilityError> {
    let center = page.page_width / 2.0;
    let (title_y, subtitle_y) = header_baselines(page);

    builder.add_text(
        heading,
        Point {
            x: center,
            y: title_y,
        },
        &TextStyle::centered(page.title_font_size),
    )?;
    if let Some(date) = date {
        builder.add_text(
            &generated_on(date),
            Point {
                x: center,
                y: subtitle_y,
            },
            &TextStyle::centered(page.subtitle_font_size),
        )?;
    }
    Ok(())
}

/// Symbol, then the name, then the `ID:` label beneath its last line.
fn place_record<B: DocumentBuilder>(
    builder: &mut B,
    page: &PageConfig,
    label_style: &TextStyle,
    record: &Record,
    image: &SymbolImage,
    placement: Placement,
) -> Result<(), CapabilityError> {
    let cell = cell_rect(page, placement.row, placement.column);
    let symbol = symbol_rect(page, cell);
    builder.add_image(image, symbol)?;

    let center = cell.x + cell.width / 2.0;
    let name_y = symbol.y + symbol.height + NAME_BASELINE_OFFSET_MM;
    let name_lines = builder
        .add_text(&record.name, Point { x: center, y: name_y }, label_style)?
        .clamp(1, NAME_MAX_LINES);
    let last_name_y = name_y + (name_lines - 1) as f32 * line_step_mm(page.label_font_size);
    builder.add_text(
        &id_label(&record.identifier),
        Point {
            x: center,
            y: last_name_y + LABEL_LINE_HEIGHT_MM,
        },
        label_style,
    )?;
    Ok(())
}

fn abort(
    callback: Option<&dyn LayoutProgressCallback>,
    index: usize,
    total: usize,
    error: RenderError,
) -> RosterQrError {
    warn!("Layout aborted at record {}/{}: {}", index + 1, total, error);
    if let Some(cb) = callback {
        cb.on_layout_error(index, total, error.to_string());
    }
    RosterQrError::Render(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SymbolStyle;
    use async_trait::async_trait;
    use image::RgbImage;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Image(Rect),
        Text(String, Point),
        NewPage,
    }

    /// Records every call. Reports two lines for any text longer than
    /// `wrap_after` characters.
    #[derive(Default)]
    struct RecordingBuilder {
        ops: Vec<Op>,
        wrap_after: Option<usize>,
    }

    impl DocumentBuilder for RecordingBuilder {
        type Output = Vec<Op>;

        fn add_image(&mut self, _image: &SymbolImage, area: Rect) -> Result<(), CapabilityError> {
            self.ops.push(Op::Image(area));
            Ok(())
        }

        fn add_text(&mut self, text: &str, anchor: Point, _style: &TextStyle) -> Result<usize, CapabilityError> {
            self.ops.push(Op::Text(text.to_string(), anchor));
            match self.wrap_after {
                Some(limit) if text.chars().count() > limit => Ok(2),
                _ => Ok(1),
            }
        }

        fn new_page(&mut self) -> Result<(), CapabilityError> {
            self.ops.push(Op::NewPage);
            Ok(())
        }

        fn finish(self) -> Result<Vec<Op>, CapabilityError> {
            Ok(self.ops)
        }
    }

    struct BlankEncoder;

    #[async_trait]
    impl SymbolEncoder for BlankEncoder {
        async fn encode(&self, _text: &str, _style: &SymbolStyle) -> Result<SymbolImage, CapabilityError> {
            Ok(SymbolImage::new(RgbImage::new(4, 4)))
        }
    }

    struct FailingEncoder {
        fail_at: String,
    }

    #[async_trait]
    impl SymbolEncoder for FailingEncoder {
        async fn encode(&self, text: &str, _style: &SymbolStyle) -> Result<SymbolImage, CapabilityError> {
            if text == self.fail_at {
                Err(CapabilityError::new("encoder exploded"))
            } else {
                Ok(SymbolImage::new(RgbImage::new(4, 4)))
            }
        }
    }

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record::new(format!("Student {i:03}"), (1000 + i).to_string()))
            .collect()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn cursor_matches_closed_form() {
        for (columns, rows) in [(2, 6), (3, 4), (1, 1), (5, 2)] {
            let cursor = LayoutCursor::new(columns, rows);
            for p in cursor.take(50) {
                assert_eq!(p, placement_for(p.index, columns, rows));
            }
        }
    }

    #[test]
    fn thirteen_records_on_two_by_six() {
        let placements: Vec<_> = LayoutCursor::new(2, 6).take(13).collect();
        assert!(placements[..12].iter().all(|p| p.page == 0));
        assert_eq!(
            placements[12],
            Placement {
                index: 12,
                page: 1,
                row: 0,
                column: 0
            }
        );
        assert_eq!(placements[11].row, 5);
        assert_eq!(placements[11].column, 1);
        assert_eq!(page_count(13, 12), 2);
    }

    #[test]
    fn page_count_is_ceiling() {
        assert_eq!(page_count(0, 12), 0);
        assert_eq!(page_count(1, 12), 1);
        assert_eq!(page_count(12, 12), 1);
        assert_eq!(page_count(24, 12), 2);
        assert_eq!(page_count(25, 12), 3);
    }

    #[test]
    fn advance_reports_page_breaks() {
        let mut c = LayoutCursor::new(2, 2);
        assert!(!c.advance());
        assert!(!c.advance());
        assert!(!c.advance());
        assert!(c.advance());
        assert_eq!(c.current().page, 1);
    }

    #[test]
    fn symbol_is_centered_in_cell() {
        let page = PageConfig::default();
        let cell = cell_rect(&page, 1, 1);
        let sym = symbol_rect(&page, cell);
        let left = sym.x - cell.x;
        let right = (cell.x + cell.width) - (sym.x + sym.width);
        assert!((left - right).abs() < 1e-4);
        assert!((cell.x - (20.0 + 85.0)).abs() < 1e-4);
        assert!((cell.y - (20.0 + 15.0 + page.cell_height())).abs() < 1e-4);
    }

    #[test]
    fn last_row_fits_on_the_page() {
        let page = PageConfig::default();
        let cell = cell_rect(&page, page.rows - 1, 0);
        let bottom = cell.y + page.cell_content_height();
        assert!(bottom <= page.page_height - page.margin + 1e-3);
    }

    #[tokio::test]
    async fn layout_emits_header_symbol_and_labels_in_order() {
        let config = GenerationConfig::default();
        let out = layout(&records(1), &BlankEncoder, RecordingBuilder::default(), &config, date())
            .await
            .unwrap();

        let texts: Vec<_> = out
            .document
            .iter()
            .filter_map(|op| match op {
                Op::Text(t, _) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            texts,
            vec![
                "Student QR Codes",
                "Generated: 2024-03-15",
                "Student 000",
                "ID: 1000"
            ]
        );
        assert!(matches!(out.document[2], Op::Image(_)));
        assert_eq!(out.page_count, 1);
    }

    #[tokio::test]
    async fn continuation_page_only_when_needed() {
        let config = GenerationConfig::default();

        let full = layout(&records(12), &BlankEncoder, RecordingBuilder::default(), &config, date())
            .await
            .unwrap();
        assert!(!full.document.contains(&Op::NewPage));
        assert_eq!(full.page_count, 1);

        let spill = layout(&records(13), &BlankEncoder, RecordingBuilder::default(), &config, date())
            .await
            .unwrap();
        let breaks = spill.document.iter().filter(|op| **op == Op::NewPage).count();
        assert_eq!(breaks, 1);
        assert_eq!(spill.page_count, 2);
        let continued = spill
            .document
            .iter()
            .any(|op| matches!(op, Op::Text(t, _) if t == "Student QR Codes (continued)"));
        assert!(continued);
        assert_eq!(spill.placements[12], placement_for(12, 2, 6));
    }

    #[tokio::test]
    async fn encoder_failure_aborts_without_document() {
        let config = GenerationConfig::default();
        let recs = records(10);
        let encoder = FailingEncoder {
            fail_at: recs[4].display_text.clone(),
        };
        let err = layout(&recs, &encoder, RecordingBuilder::default(), &config, date())
            .await
            .unwrap_err();
        match err {
            RosterQrError::Render(RenderError::SymbolEncoding { index, name, detail }) => {
                assert_eq!(index, 4);
                assert_eq!(name, "Student 004");
                assert_eq!(detail, "encoder exploded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    fn text_baseline(ops: &[Op], wanted: &str) -> f32 {
        ops.iter()
            .find_map(|op| match op {
                Op::Text(t, p) if t == wanted => Some(p.y),
                _ => None,
            })
            .unwrap()
    }

    #[tokio::test]
    async fn identifier_sits_below_a_wrapped_name() {
        let config = GenerationConfig::default();
        let long = "Maria Magdalena Wilhelmina Josephina von Oberhausen-Schmidt";
        let recs = vec![Record::new("Ada Lovelace", "1"), Record::new(long, "2")];
        let builder = RecordingBuilder {
            wrap_after: Some(40),
            ..RecordingBuilder::default()
        };
        let out = layout(&recs, &BlankEncoder, builder, &config, date())
            .await
            .unwrap();
        let step = line_step_mm(config.page.label_font_size);

        let short_gap = text_baseline(&out.document, "ID: 1") - text_baseline(&out.document, "Ada Lovelace");
        assert!((short_gap - LABEL_LINE_HEIGHT_MM).abs() < 1e-4);

        let name_y = text_baseline(&out.document, long);
        let id_y = text_baseline(&out.document, "ID: 2");
        let second_line_y = name_y + step;
        assert!((id_y - (second_line_y + LABEL_LINE_HEIGHT_MM)).abs() < 1e-4);
        assert!(id_y - second_line_y >= step);
    }

    #[tokio::test]
    async fn empty_input_is_no_data() {
        let config = GenerationConfig::default();
        let err = layout(&[], &BlankEncoder, RecordingBuilder::default(), &config, date())
            .await
            .unwrap_err();
        assert!(matches!(err, RosterQrError::NoDataFound));
    }
}
