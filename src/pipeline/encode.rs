//! Symbol encoding: display text → QR raster.
//!
//! The layout engine only knows the [`SymbolEncoder`] trait. [`QrSymbolEncoder`]
//! is the production implementation: it builds the QR matrix with the
//! `qrcode` crate and rasterises it into an `image::RgbImage` itself, because
//! the quiet zone (1 module) and the colours are fixed visual parameters
//! that the crate's built-in renderer does not expose.
//!
//! Rasterising is CPU-bound, so it runs inside `spawn_blocking` and the
//! engine's per-record await point never stalls a Tokio worker.

use crate::config::{Color, SymbolStyle};
use crate::error::CapabilityError;
use async_trait::async_trait;
use image::{Rgb, RgbImage};
use qrcode::QrCode;
use tracing::debug;

/// A rendered symbol, ready to be placed on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolImage {
    image: RgbImage,
}

impl SymbolImage {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Packed 8-bit RGB samples, row-major, top row first.
    pub fn rgb_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}

/// Produces one symbol image per record.
#[async_trait]
pub trait SymbolEncoder: Send + Sync {
    /// Short name used in capability-load errors and logs.
    fn name(&self) -> &str {
        "symbol-encoder"
    }

    /// Acquire whatever the encoder needs before the first `encode` call.
    async fn prepare(&self) -> Result<(), CapabilityError> {
        Ok(())
    }

    /// Render `text` with the given visual parameters.
    async fn encode(&self, text: &str, style: &SymbolStyle) -> Result<SymbolImage, CapabilityError>;
}

/// QR Code encoder backed by the `qrcode` crate.
#[derive(Debug, Clone, Default)]
pub struct QrSymbolEncoder;

impl QrSymbolEncoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SymbolEncoder for QrSymbolEncoder {
    fn name(&self) -> &str {
        "qr-encoder"
    }

    /// Encode a probe string so that a broken encoder is detected before any
    /// page is laid out.
    async fn prepare(&self) -> Result<(), CapabilityError> {
        self.encode("roster-qr probe (0)", &SymbolStyle::default())
            .await
            .map(|_| ())
    }

    async fn encode(&self, text: &str, style: &SymbolStyle) -> Result<SymbolImage, CapabilityError> {
        let text = text.to_string();
        let style = style.clone();

        tokio::task::spawn_blocking(move || render_qr(&text, &style))
            .await
            .map_err(|e| CapabilityError::new(format!("QR task panicked: {e}")))?
    }
}

/// Blocking QR rasterisation.
///
/// The module scale is the largest integer that keeps the symbol within
/// `pixel_size`, so modules stay crisp; the result may be slightly smaller
/// than requested but is never below one pixel per module.
pub fn render_qr(text: &str, style: &SymbolStyle) -> Result<SymbolImage, CapabilityError> {
    let code = QrCode::new(text.as_bytes()).map_err(|e| CapabilityError::new(e.to_string()))?;
    let colors = code.to_colors();

    let modules = code.width() as u32;
    let quiet = style.quiet_zone;
    let total = modules + 2 * quiet;
    let scale = (style.pixel_size / total).max(1);
    let size = total * scale;

    let fg = to_rgb(style.foreground);
    let bg = to_rgb(style.background);

    let image = RgbImage::from_fn(size, size, |x, y| {
        let (mx, my) = (x / scale, y / scale);
        if mx < quiet || my < quiet || mx >= quiet + modules || my >= quiet + modules {
            return bg;
        }
        let idx = ((my - quiet) * modules + (mx - quiet)) as usize;
        match colors[idx] {
            qrcode::Color::Dark => fg,
            qrcode::Color::Light => bg,
        }
    });

    debug!(
        "Encoded {:?} → {}×{} modules, {}×{} px",
        text, modules, modules, size, size
    );
    Ok(SymbolImage::new(image))
}

fn to_rgb(c: Color) -> Rgb<u8> {
    Rgb([c.r, c.g, c.b])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_renders_within_pixel_budget() {
        let style = SymbolStyle::default();
        let img = render_qr("Ada Lovelace (1815)", &style).expect("encode should succeed");
        assert_eq!(img.width(), img.height());
        assert!(img.width() <= style.pixel_size);
        assert!(img.width() >= 21 + 2 * style.quiet_zone);
        assert_eq!(img.rgb_bytes().len(), (img.width() * img.height() * 3) as usize);
    }

    #[test]
    fn quiet_zone_uses_background_colour() {
        let style = SymbolStyle {
            quiet_zone: 2,
            ..SymbolStyle::default()
        };
        let img = render_qr("x", &style).unwrap();
        assert_eq!(*img.image().get_pixel(0, 0), Rgb([255, 255, 255]));
        let last = img.width() - 1;
        assert_eq!(*img.image().get_pixel(last, last), Rgb([255, 255, 255]));
    }

    #[test]
    fn finder_pattern_corner_is_dark() {
        let style = SymbolStyle::default();
        let img = render_qr("Grace Hopper (42)", &style).unwrap();
        // Version-2 symbol (25 modules) + 2 quiet modules → scale 7.
        let modules = img.width() / 7;
        assert_eq!(modules, 27);
        // First module inside the quiet zone is the finder pattern's corner.
        assert_eq!(*img.image().get_pixel(7, 7), Rgb([0, 0, 0]));
    }

    #[test]
    fn custom_colours_are_applied() {
        let style = SymbolStyle {
            foreground: Color { r: 10, g: 20, b: 30 },
            background: Color {
                r: 250,
                g: 240,
                b: 230,
            },
            ..SymbolStyle::default()
        };
        let img = render_qr("abc", &style).unwrap();
        let pixels: Vec<_> = img.image().pixels().copied().collect();
        assert!(pixels.contains(&Rgb([10, 20, 30])));
        assert!(pixels.contains(&Rgb([250, 240, 230])));
        assert!(pixels.iter().all(|p| *p == Rgb([10, 20, 30]) || *p == Rgb([250, 240, 230])));
    }

    #[test]
    fn oversized_payload_fails() {
        let text = "9".repeat(8000);
        assert!(render_qr(&text, &SymbolStyle::default()).is_err());
    }

    #[tokio::test]
    async fn async_encoder_and_prepare() {
        let enc = QrSymbolEncoder::new();
        enc.prepare().await.expect("probe encodes");
        let img = enc
            .encode("Bob Builder (7)", &SymbolStyle::default())
            .await
            .unwrap();
        assert!(img.width() > 0);
    }
}
