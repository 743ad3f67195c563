//! Scan verifier.
//!
//! Decodes a rendered bitmap back to text and compares it with the payload
//! it was rendered from. Decoding is best effort and runs in two passes:
//!
//! 1. the image as-is, in normal and inverted polarity;
//! 2. the image binarized at the midpoint of the luma range found in its
//!    top-left quadrant, again in both polarities.
//!
//! A centered logo never falls inside the top-left quadrant, so it cannot
//! drag the threshold around.

use image::{GrayImage, Luma, Rgb, RgbImage, RgbaImage};
use rqrr::PreparedImage;
use serde::Serialize;

use crate::style::{luma, Color};

/// Symbol contrast below 20% of full scale grades F under ISO/IEC 15415.
pub const DEFAULT_MIN_SYMBOL_CONTRAST: f32 = 51.0;

/// Pass that produced the matching decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DecodePass {
    /// The image as rendered.
    Direct,
    /// After midpoint binarization.
    Binarized,
}

/// Outcome of one verification run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    /// Pass that decoded the expected payload, if any.
    pub pass: Option<DecodePass>,
    /// Every text the decoder produced, matching or not.
    pub decoded: Vec<String>,
    /// Luma spread measured over the symbol's top-left quadrant.
    pub symbol_contrast: f32,
}

impl ScanReport {
    /// True when some pass decoded exactly the expected payload.
    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.pass.is_some()
    }
}

/// Decode-based readability check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanVerifier {
    /// Minimum luma spread a scanner can lock on to.
    pub min_symbol_contrast: f32,
}

impl Default for ScanVerifier {
    fn default() -> Self {
        Self {
            min_symbol_contrast: DEFAULT_MIN_SYMBOL_CONTRAST,
        }
    }
}

impl ScanVerifier {
    /// Checks whether `artifact` decodes to exactly `expected`.
    ///
    /// With a `simulated_background`, the artifact is placed on a surface of
    /// that color (filling transparent pixels and adding a border), so edge
    /// modules touch a realistic neighbour. Without one the surface is white
    /// and no border is added.
    ///
    /// Failure is a report, never an error.
    #[must_use]
    pub fn verify(
        &self,
        artifact: &RgbaImage,
        expected: &str,
        simulated_background: Option<Color>,
    ) -> ScanReport {
        let (surface, pad) = match simulated_background.and_then(Color::rgb) {
            Some(rgb) => (rgb, border_width(artifact)),
            None => ([255, 255, 255], 0),
        };
        let canvas = compose(artifact, surface, pad);

        let (lo, hi) = luma_range(&canvas, pad, pad, artifact.width() / 2, artifact.height() / 2);
        let symbol_contrast = hi - lo;
        let mut report = ScanReport {
            pass: None,
            decoded: Vec::new(),
            symbol_contrast,
        };
        if symbol_contrast < self.min_symbol_contrast {
            tracing::debug!(symbol_contrast, "symbol contrast below scanner floor");
            return report;
        }

        let direct = GrayImage::from_fn(canvas.width(), canvas.height(), |x, y| {
            let Rgb([r, g, b]) = *canvas.get_pixel(x, y);
            Luma([luma(r, g, b).round() as u8])
        });
        if self.attempt(&direct, expected, &mut report) {
            report.pass = Some(DecodePass::Direct);
            tracing::debug!("decoded on direct pass");
            return report;
        }

        let binarized = binarize(&canvas);
        if self.attempt(&binarized, expected, &mut report) {
            report.pass = Some(DecodePass::Binarized);
            tracing::debug!("decoded after binarization");
        }
        report
    }

    fn attempt(&self, grey: &GrayImage, expected: &str, report: &mut ScanReport) -> bool {
        for inverted in [false, true] {
            for text in decode_grids(grey, inverted) {
                tracing::trace!(inverted, %text, "decoder result");
                let hit = text == expected;
                report.decoded.push(text);
                if hit {
                    return true;
                }
            }
        }
        false
    }
}

/// Border added around the artifact when simulating a surface.
fn border_width(artifact: &RgbaImage) -> u32 {
    (artifact.width().max(artifact.height()) / 10).max(8)
}

/// Flattens `artifact` onto an opaque `surface` with `pad` pixels of border.
fn compose(artifact: &RgbaImage, surface: [u8; 3], pad: u32) -> RgbImage {
    let (w, h) = artifact.dimensions();
    let mut canvas = RgbImage::from_pixel(w + 2 * pad, h + 2 * pad, Rgb(surface));
    for (x, y, px) in artifact.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let blend = |c: u8, s: u8| {
            let a = u32::from(a);
            ((u32::from(c) * a + u32::from(s) * (255 - a) + 127) / 255) as u8
        };
        canvas.put_pixel(
            x + pad,
            y + pad,
            Rgb([blend(r, surface[0]), blend(g, surface[1]), blend(b, surface[2])]),
        );
    }
    canvas
}

/// Minimum and maximum luma over a rectangle.
fn luma_range(img: &RgbImage, x0: u32, y0: u32, w: u32, h: u32) -> (f32, f32) {
    let mut lo = 255.0f32;
    let mut hi = 0.0f32;
    for y in y0..(y0 + h).min(img.height()) {
        for x in x0..(x0 + w).min(img.width()) {
            let Rgb([r, g, b]) = *img.get_pixel(x, y);
            let l = luma(r, g, b);
            lo = lo.min(l);
            hi = hi.max(l);
        }
    }
    if lo > hi {
        (0.0, 0.0)
    } else {
        (lo, hi)
    }
}

/// Pure black below the top-left-quadrant midpoint, pure white otherwise.
fn binarize(img: &RgbImage) -> GrayImage {
    let (lo, hi) = luma_range(img, 0, 0, img.width() / 2, img.height() / 2);
    let threshold = (lo + hi) / 2.0;
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let Rgb([r, g, b]) = *img.get_pixel(x, y);
        if luma(r, g, b) < threshold {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

fn decode_grids(grey: &GrayImage, inverted: bool) -> Vec<String> {
    let (w, h) = (grey.width() as usize, grey.height() as usize);
    let mut prepared = PreparedImage::prepare_from_greyscale(w, h, |x, y| {
        let v = grey.get_pixel(x as u32, y as u32).0[0];
        if inverted {
            255 - v
        } else {
            v
        }
    });
    prepared
        .detect_grids()
        .into_iter()
        .filter_map(|grid| grid.decode().ok().map(|(_, text)| text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::ModuleMatrix;
    use crate::raster;
    use crate::style::{EcLevel, StyleConfig};
    use image::Rgba;

    const PAYLOAD: &str = "https://example.com/verify";

    fn rendered(style: &StyleConfig) -> RgbaImage {
        let matrix = ModuleMatrix::encode(PAYLOAD, EcLevel::M).unwrap();
        raster::render(&matrix, &style.clone().with_output_width(330)).unwrap()
    }

    #[test]
    fn test_plain_symbol_decodes_directly() {
        let report = ScanVerifier::default().verify(&rendered(&StyleConfig::default()), PAYLOAD, None);
        assert_eq!(report.pass, Some(DecodePass::Direct));
        assert!(report.decoded.iter().any(|t| t == PAYLOAD));
        assert!(report.symbol_contrast > 250.0);
    }

    #[test]
    fn test_wrong_payload_is_unreadable() {
        let report = ScanVerifier::default().verify(&rendered(&StyleConfig::default()), "something else", None);
        assert!(!report.is_readable());
        assert!(report.decoded.iter().any(|t| t == PAYLOAD));
    }

    #[test]
    fn test_light_on_dark_decodes() {
        let style = StyleConfig::default().with_colors(Color::WHITE, Color::BLACK);
        let report = ScanVerifier::default().verify(&rendered(&style), PAYLOAD, None);
        assert!(report.is_readable());
    }

    #[test]
    fn test_low_contrast_is_refused() {
        let style = StyleConfig::default()
            .with_colors(Color::Rgb([0x77, 0x77, 0x77]), Color::Rgb([0x99, 0x99, 0x99]));
        let report = ScanVerifier::default().verify(&rendered(&style), PAYLOAD, None);
        assert!(!report.is_readable());
        assert!(report.symbol_contrast < DEFAULT_MIN_SYMBOL_CONTRAST);
        assert!(report.decoded.is_empty());
    }

    #[test]
    fn test_blank_image_is_unreadable() {
        let blank = RgbaImage::from_pixel(64, 64, Rgba([255, 255, 255, 255]));
        let report = ScanVerifier::default().verify(&blank, PAYLOAD, None);
        assert!(!report.is_readable());
        assert_eq!(report.symbol_contrast, 0.0);
    }

    #[test]
    fn test_compose_pads_and_fills_transparency() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let canvas = compose(&img, [200, 100, 50], 2);
        assert_eq!(canvas.dimensions(), (8, 8));
        assert_eq!(canvas.get_pixel(0, 0).0, [200, 100, 50]);
        assert_eq!(canvas.get_pixel(2, 2).0, [200, 100, 50]);
        assert_eq!(canvas.get_pixel(3, 3).0, [0, 0, 0]);
    }

    #[test]
    fn test_binarize_uses_quadrant_midpoint() {
        let mut img = RgbImage::from_pixel(4, 4, Rgb([90, 90, 90]));
        img.put_pixel(0, 0, Rgb([20, 20, 20]));
        img.put_pixel(1, 1, Rgb([180, 180, 180]));
        // Outside the sampled quadrant; must not move the threshold.
        img.put_pixel(3, 3, Rgb([255, 255, 255]));
        let out = binarize(&img);
        assert_eq!(out.get_pixel(0, 0).0, [0]);
        assert_eq!(out.get_pixel(2, 2).0, [0]);
        assert_eq!(out.get_pixel(1, 1).0, [255]);
        assert_eq!(out.get_pixel(3, 3).0, [255]);
    }
}
