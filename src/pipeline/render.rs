//! PDF assembly: a [`DocumentBuilder`] backed by `pdf-writer`.
//!
//! ## Coordinates
//!
//! The layout engine speaks top-left millimetres; PDF user space is
//! bottom-left points. Every call converts with `mm × 72 / 25.4` and flips
//! `y` against the page height, so nothing upstream needs to know.
//!
//! ## Text
//!
//! Labels use the standard Helvetica Type 1 font with WinAnsi encoding, so
//! no font file is embedded. Characters outside Latin-1 are replaced with
//! `?`. Centering and wrapping use the Helvetica advance widths below.
//!
//! ## Images
//!
//! Each symbol becomes one RGB image XObject, zlib-compressed with `flate2`
//! and drawn by scaling the unit square onto the target rectangle.

use crate::config::line_step_mm;
use crate::error::CapabilityError;
use crate::pipeline::encode::SymbolImage;
use crate::pipeline::layout::{DocumentBuilder, Point, Rect, TextAlign, TextStyle};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect as PdfRect, Ref, Str};
use std::io::Write;
use tracing::debug;

const MM_TO_PT: f32 = 72.0 / 25.4;
const FONT_NAME: Name<'static> = Name(b"F1");
const ELLIPSIS: &str = "...";

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,                               // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015,                                             // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,                // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,                // 'N'..'Z'
    278, 278, 278, 469, 556, 333,                                                   // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,                // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,                // 'n'..'z'
    334, 260, 334, 584,                                                             // '{'..'~'
];
const HELVETICA_AVERAGE: u16 = 556;

/// A finished PDF.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

struct PageImage {
    name: String,
    id: Ref,
}

/// Streams pages into a `pdf_writer::Pdf` as the layout engine drives it.
pub struct PdfDocumentBuilder {
    pdf: Pdf,
    page_width: f32,
    page_height: f32,
    catalog_id: Ref,
    tree_id: Ref,
    font_id: Ref,
    next_id: i32,
    page_ids: Vec<Ref>,
    content: Content,
    images: Vec<PageImage>,
    image_count: usize,
}

impl PdfDocumentBuilder {
    /// Start a document whose pages are `page_width × page_height` mm.
    pub fn new(page_width: f32, page_height: f32) -> Self {
        let mut pdf = Pdf::new();
        let catalog_id = Ref::new(1);
        let tree_id = Ref::new(2);
        let font_id = Ref::new(3);

        pdf.catalog(catalog_id).pages(tree_id);
        pdf.type1_font(font_id)
            .base_font(Name(b"Helvetica"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));

        Self {
            pdf,
            page_width,
            page_height,
            catalog_id,
            tree_id,
            font_id,
            next_id: 4,
            page_ids: Vec::new(),
            content: Content::new(),
            images: Vec::new(),
            image_count: 0,
        }
    }

    fn alloc(&mut self) -> Ref {
        let id = Ref::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Write the current content stream and page object.
    fn close_page(&mut self) {
        let page_id = self.alloc();
        let content_id = self.alloc();
        let content = std::mem::replace(&mut self.content, Content::new());
        self.pdf.stream(content_id, &content.finish());

        let mut page = self.pdf.page(page_id);
        page.media_box(PdfRect::new(
            0.0,
            0.0,
            self.page_width * MM_TO_PT,
            self.page_height * MM_TO_PT,
        ));
        page.parent(self.tree_id);
        page.contents(content_id);

        let mut resources = page.resources();
        resources.fonts().pair(FONT_NAME, self.font_id);
        if !self.images.is_empty() {
            let mut x_objects = resources.x_objects();
            for image in &self.images {
                x_objects.pair(Name(image.name.as_bytes()), image.id);
            }
            x_objects.finish();
        }
        resources.finish();
        page.finish();

        debug!(
            "Closed page {} with {} images",
            self.page_ids.len() + 1,
            self.images.len()
        );
        self.images.clear();
        self.page_ids.push(page_id);
    }

    fn show_line(&mut self, line: &str, x_mm: f32, y_mm: f32, font_size: f32) {
        let x = x_mm * MM_TO_PT;
        let y = (self.page_height - y_mm) * MM_TO_PT;
        let encoded = win_ansi(line);
        self.content
            .begin_text()
            .set_font(FONT_NAME, font_size)
            .next_line(x, y)
            .show(Str(&encoded))
            .end_text();
    }
}

impl DocumentBuilder for PdfDocumentBuilder {
    type Output = PdfDocument;

    fn name(&self) -> &str {
        "pdf-builder"
    }

    fn prepare(&self) -> Result<(), CapabilityError> {
        if self.page_width <= 0.0 || self.page_height <= 0.0 {
            return Err(CapabilityError::new(format!(
                "page size {}×{} mm is not drawable",
                self.page_width, self.page_height
            )));
        }
        Ok(())
    }

    fn add_image(&mut self, image: &SymbolImage, area: Rect) -> Result<(), CapabilityError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CapabilityError::new("symbol image is empty"));
        }
        let compressed = deflate(image.rgb_bytes())?;

        let id = self.alloc();
        let mut xobject = self.pdf.image_xobject(id, &compressed);
        xobject.filter(Filter::FlateDecode);
        xobject.width(image.width() as i32);
        xobject.height(image.height() as i32);
        xobject.color_space().device_rgb();
        xobject.bits_per_component(8);
        xobject.finish();

        self.image_count += 1;
        let name = format!("Im{}", self.image_count);

        let w = area.width * MM_TO_PT;
        let h = area.height * MM_TO_PT;
        let x = area.x * MM_TO_PT;
        let y = (self.page_height - area.y - area.height) * MM_TO_PT;
        self.content.save_state();
        self.content.transform([w, 0.0, 0.0, h, x, y]);
        self.content.x_object(Name(name.as_bytes()));
        self.content.restore_state();

        self.images.push(PageImage { name, id });
        Ok(())
    }

    fn add_text(&mut self, text: &str, anchor: Point, style: &TextStyle) -> Result<usize, CapabilityError> {
        let lines = match style.max_width {
            Some(max) => {
                let wrapped = wrap_text(text, style.font_size, max);
                match style.max_lines {
                    Some(limit) => elide_lines(wrapped, limit, style.font_size, max),
                    None => wrapped,
                }
            }
            None => vec![text.to_string()],
        };
        let step = line_step_mm(style.font_size);

        for (i, line) in lines.iter().enumerate() {
            let x = match style.align {
                TextAlign::Left => anchor.x,
                TextAlign::Center => anchor.x - text_width_mm(line, style.font_size) / 2.0,
            };
            self.show_line(line, x, anchor.y + i as f32 * step, style.font_size);
        }
        Ok(lines.len())
    }

    fn new_page(&mut self) -> Result<(), CapabilityError> {
        self.close_page();
        Ok(())
    }

    fn finish(mut self) -> Result<PdfDocument, CapabilityError> {
        self.close_page();
        let page_count = self.page_ids.len();
        self.pdf
            .pages(self.tree_id)
            .kids(self.page_ids.iter().copied())
            .count(page_count as i32);

        let bytes = self.pdf.finish();
        debug!(
            "Finished PDF (catalog {:?}): {} pages, {} bytes",
            self.catalog_id,
            page_count,
            bytes.len()
        );
        Ok(PdfDocument { bytes, page_count })
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, CapabilityError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| CapabilityError::new(format!("image compression failed: {e}")))
}

/// Encode for a WinAnsi simple font. Latin-1 passes through; everything
/// else becomes `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn char_width(c: char) -> u16 {
    match c {
        ' '..='~' => HELVETICA_WIDTHS[c as usize - 32],
        _ => HELVETICA_AVERAGE,
    }
}

/// Rendered width of `text` in millimetres at `font_size` points.
pub fn text_width_mm(text: &str, font_size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(char_width(c))).sum();
    units as f32 / 1000.0 * font_size / MM_TO_PT
}

/// Greedy word wrap to `max_width` mm. A single word wider than the limit
/// stays on its own line rather than being split.
pub fn wrap_text(text: &str, font_size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if text_width_mm(&candidate, font_size) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Keep at most `max_lines` lines. When something is dropped, the last kept
/// line ends in `...` and is shortened until it fits `max_width`.
pub fn elide_lines(mut lines: Vec<String>, max_lines: usize, font_size: f32, max_width: f32) -> Vec<String> {
    let max_lines = max_lines.max(1);
    if lines.len() <= max_lines {
        return lines;
    }
    lines.truncate(max_lines);
    if let Some(last) = lines.last_mut() {
        let mut kept = last.trim_end().to_string();
        while !kept.is_empty() && text_width_mm(&format!("{kept}{ELLIPSIS}"), font_size) > max_width {
            kept.pop();
            kept.truncate(kept.trim_end().len());
        }
        kept.push_str(ELLIPSIS);
        *last = kept;
    }
    lines
}
