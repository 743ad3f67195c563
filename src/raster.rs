//! Matrix rasterizer.
//!
//! Paints a [`Layout`] into an RGBA bitmap with `tiny-skia`, then hands the
//! result back as an `image` buffer so the verifier and PNG encoder can use it.

use std::io::Cursor;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use tiny_skia::{
    FillRule, FilterQuality, IntSize, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Transform,
};

use crate::error::{QrError, QrResult};
use crate::layout::{Layout, Shape};
use crate::matrix::ModuleMatrix;
use crate::style::StyleConfig;

/// Cubic Bézier handle length for a quarter circle of radius 1.
const KAPPA: f32 = 0.552_284_8;

/// Renders the matrix to a square bitmap `style.output_width` pixels wide.
///
/// A logo that fails to decode is skipped; the bare symbol is returned.
///
/// # Errors
///
/// Returns [`QrError::InvalidStyle`] for an out-of-range style and
/// [`QrError::Canvas`] if the pixmap cannot be allocated.
///
/// # Example
///
/// ```rust
/// use qistyle::matrix::ModuleMatrix;
/// use qistyle::raster;
/// use qistyle::style::{EcLevel, StyleConfig};
///
/// let matrix = ModuleMatrix::encode("Hello, World!", EcLevel::M).unwrap();
/// let img = raster::render(&matrix, &StyleConfig::default().with_output_width(250)).unwrap();
/// assert_eq!(img.dimensions(), (250, 250));
/// ```
pub fn render(matrix: &ModuleMatrix, style: &StyleConfig) -> QrResult<RgbaImage> {
    style.validate()?;
    let logo = style.logo.as_ref().and_then(|l| l.decode_or_skip());
    let layout = Layout::new(matrix, style, logo.as_ref().map(RgbaImage::dimensions));
    rasterize(&layout, logo.as_ref(), style.output_width)
}

/// Paints an already resolved layout at `width`×`width` pixels.
///
/// # Errors
///
/// Returns [`QrError::Canvas`] if the pixmap cannot be allocated.
pub fn rasterize(layout: &Layout, logo: Option<&RgbaImage>, width: u32) -> QrResult<RgbaImage> {
    let mut pixmap = Pixmap::new(width, width)
        .ok_or_else(|| QrError::Canvas(format!("cannot allocate {width}x{width} pixmap")))?;
    let scale = width as f32 / layout.canvas as f32;
    let transform = Transform::from_scale(scale, scale);

    if let Some((silhouette, rgb)) = &layout.backdrop {
        fill_shapes(&mut pixmap, std::slice::from_ref(silhouette), *rgb, transform);
    }
    // One path for every module so neighbouring cells do not leave seams.
    fill_shapes(&mut pixmap, &layout.modules, layout.foreground, transform);

    if let (Some(logo_box), Some(logo)) = (layout.logo, logo) {
        let target = logo_box.scaled(f64::from(scale));
        let source = premultiplied(logo)?;
        let placement = Transform::from_row(
            (target.width / f64::from(logo.width())) as f32,
            0.0,
            0.0,
            (target.height / f64::from(logo.height())) as f32,
            target.x as f32,
            target.y as f32,
        );
        let paint = PixmapPaint {
            quality: FilterQuality::Bicubic,
            ..PixmapPaint::default()
        };
        pixmap.draw_pixmap(0, 0, source.as_ref(), &paint, placement, None);
    }

    tracing::debug!(width, canvas = layout.canvas, modules = layout.modules.len(), "rasterized symbol");
    to_rgba(&pixmap)
}

/// Encodes a rendered bitmap as PNG, keeping the alpha channel.
///
/// # Errors
///
/// Returns [`QrError::Export`] if encoding fails.
pub fn encode_png(img: &RgbaImage) -> QrResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgba8)
        .map_err(|e| QrError::Export(format!("PNG encoding failed: {e}")))?;
    Ok(buf.into_inner())
}

fn fill_shapes(pixmap: &mut Pixmap, shapes: &[Shape], rgb: [u8; 3], transform: Transform) {
    let mut pb = PathBuilder::new();
    for shape in shapes {
        push_shape(&mut pb, shape);
    }
    let Some(path) = pb.finish() else {
        return;
    };
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgb[0], rgb[1], rgb[2], 255);
    paint.anti_alias = true;
    pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
}

fn push_shape(pb: &mut PathBuilder, shape: &Shape) {
    match *shape {
        Shape::Rect { x, y, w, h } => {
            if let Some(rect) = Rect::from_xywh(x as f32, y as f32, w as f32, h as f32) {
                pb.push_rect(rect);
            }
        }
        Shape::Circle { cx, cy, r } => pb.push_circle(cx as f32, cy as f32, r as f32),
        Shape::RoundedRect { x, y, w, h, radius } => {
            let (x, y, w, h) = (x as f32, y as f32, w as f32, h as f32);
            let r = (radius as f32).min(w / 2.0).min(h / 2.0);
            let k = r * KAPPA;
            let (right, bottom) = (x + w, y + h);
            pb.move_to(x + r, y);
            pb.line_to(right - r, y);
            pb.cubic_to(right - r + k, y, right, y + r - k, right, y + r);
            pb.line_to(right, bottom - r);
            pb.cubic_to(right, bottom - r + k, right - r + k, bottom, right - r, bottom);
            pb.line_to(x + r, bottom);
            pb.cubic_to(x + r - k, bottom, x, bottom - r + k, x, bottom - r);
            pb.line_to(x, y + r);
            pb.cubic_to(x, y + r - k, x + r - k, y, x + r, y);
            pb.close();
        }
    }
}

fn premultiplied(img: &RgbaImage) -> QrResult<Pixmap> {
    let mut data = Vec::with_capacity(img.as_raw().len());
    for px in img.pixels() {
        let [r, g, b, a] = px.0;
        let mul = |c: u8| ((u16::from(c) * u16::from(a) + 127) / 255) as u8;
        data.extend_from_slice(&[mul(r), mul(g), mul(b), a]);
    }
    IntSize::from_wh(img.width(), img.height())
        .and_then(|size| Pixmap::from_vec(data, size))
        .ok_or_else(|| QrError::Canvas("cannot allocate logo pixmap".into()))
}

fn to_rgba(pixmap: &Pixmap) -> QrResult<RgbaImage> {
    let mut raw = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        raw.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), raw)
        .ok_or_else(|| QrError::Canvas("pixmap size mismatch".into()))
}
