//! Print-ready PDF export.
//!
//! The symbol is drawn as vector polygons on an A4 page, centered and sized to
//! a fixed share of the shorter page side. Nothing is rasterized except the
//! logo, which is already a bitmap.

use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{Color, Image, ImageTransform, Mm, PdfDocument, PdfLayerReference, Point, Polygon, Rgb};

use crate::error::{QrError, QrResult};
use crate::layout::{Layout, Shape};
use crate::logo::LogoBox;
use crate::matrix::ModuleMatrix;
use crate::style::StyleConfig;

/// A4 portrait width in millimetres.
pub const PAGE_WIDTH_MM: f32 = 210.0;
/// A4 portrait height in millimetres.
pub const PAGE_HEIGHT_MM: f32 = 297.0;
/// Share of the shorter page side taken by the canvas.
pub const PAGE_FILL: f32 = 0.6;

const LOGO_DPI: f32 = 300.0;
// Edges per quarter turn when flattening circles.
const BACKDROP_SEGMENTS: usize = 32;
const DOT_SEGMENTS: usize = 4;

/// Where the canvas lands on the page, in millimetres from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePlacement {
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

impl PagePlacement {
    /// Centered box on an A4 page.
    #[must_use]
    pub fn a4() -> Self {
        let size = PAGE_WIDTH_MM.min(PAGE_HEIGHT_MM) * PAGE_FILL;
        Self {
            x: (PAGE_WIDTH_MM - size) / 2.0,
            y: (PAGE_HEIGHT_MM - size) / 2.0,
            size,
        }
    }

    /// Converts a canvas point (module units, y down) to page millimetres (y up).
    fn page_mm(&self, scale: f32, (x, y): (f64, f64)) -> (f32, f32) {
        (
            self.x + x as f32 * scale,
            PAGE_HEIGHT_MM - (self.y + y as f32 * scale),
        )
    }
}

/// Renders the styled symbol into a single-page PDF.
///
/// # Errors
///
/// Returns [`QrError::InvalidStyle`] for an out-of-range style and
/// [`QrError::Export`] if the document cannot be written.
pub fn render(matrix: &ModuleMatrix, style: &StyleConfig) -> QrResult<Vec<u8>> {
    style.validate()?;
    // printpdf embeds through its own image crate version, so decode there.
    let logo = style.logo.as_ref().and_then(|l| {
        printpdf::image_crate::load_from_memory(l.bytes())
            .map_err(|e| tracing::warn!("logo skipped in PDF export: {e}"))
            .ok()
    });
    let dims = logo.as_ref().map(|img| (img.width(), img.height()));
    let layout = Layout::new(matrix, style, dims);
    let placement = PagePlacement::a4();
    let scale = placement.size / layout.canvas as f32;

    let (doc, page, layer) = PdfDocument::new(
        "QR Code",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Symbol",
    );
    let layer = doc.get_page(page).get_layer(layer);

    if let Some((silhouette, rgb)) = &layout.backdrop {
        let ring = page_ring(&placement, scale, silhouette, BACKDROP_SEGMENTS);
        fill_rings(&layer, vec![to_points(ring)], *rgb);
    }

    let rings = layout
        .modules
        .iter()
        .map(|shape| to_points(page_ring(&placement, scale, shape, DOT_SEGMENTS)))
        .collect::<Vec<_>>();
    fill_rings(&layer, rings, layout.foreground);

    if let (Some(logo_box), Some(img)) = (layout.logo, logo) {
        let transform = logo_transform(&placement, scale, logo_box, img.width(), img.height());
        Image::from_dynamic_image(&img).add_to_layer(layer, transform);
    }

    tracing::debug!(canvas_mm = placement.size, "wrote PDF page");
    doc.save_to_bytes()
        .map_err(|e| QrError::Export(format!("PDF save failed: {e}")))
}

/// Places a logo image of `width`×`height` pixels over its box on the page.
///
/// printpdf sizes images from their pixel count at `LOGO_DPI`, so the scale
/// factors stretch that natural size onto the box.
fn logo_transform(placement: &PagePlacement, scale: f32, logo_box: LogoBox, width: u32, height: u32) -> ImageTransform {
    let natural_w = width as f32 / LOGO_DPI * 25.4;
    let natural_h = height as f32 / LOGO_DPI * 25.4;
    let target = logo_box.scaled(f64::from(scale));
    // Images are anchored at their bottom-left corner.
    let bottom = placement.y + (target.y + target.height) as f32;
    ImageTransform {
        translate_x: Some(Mm(placement.x + target.x as f32)),
        translate_y: Some(Mm(PAGE_HEIGHT_MM - bottom)),
        scale_x: Some(target.width as f32 / natural_w),
        scale_y: Some(target.height as f32 / natural_h),
        dpi: Some(LOGO_DPI),
        ..Default::default()
    }
}

/// Outline of `shape` in page millimetres.
fn page_ring(placement: &PagePlacement, scale: f32, shape: &Shape, segments: usize) -> Vec<(f32, f32)> {
    shape
        .polygon(segments)
        .into_iter()
        .map(|p| placement.page_mm(scale, p))
        .collect()
}

fn to_points(ring: Vec<(f32, f32)>) -> Vec<(Point, bool)> {
    ring.into_iter()
        .map(|(x, y)| (Point::new(Mm(x), Mm(y)), false))
        .collect()
}

fn fill_rings(layer: &PdfLayerReference, rings: Vec<Vec<(Point, bool)>>, rgb: [u8; 3]) {
    if rings.is_empty() {
        return;
    }
    let [r, g, b] = rgb.map(|c| f32::from(c) / 255.0);
    layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
    layer.add_polygon(Polygon {
        rings,
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    });
}
