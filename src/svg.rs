//! Matrix vectorizer.
//!
//! Emits one `<svg>` root whose viewBox is the canvas in module units, so the
//! markup scales to any size without changing a single coordinate.

use std::fmt::Write;

use crate::error::QrResult;
use crate::layout::{Layout, Shape};
use crate::logo::Logo;
use crate::matrix::ModuleMatrix;
use crate::style::{Color, StyleConfig};

/// Returns SVG markup for the styled symbol.
///
/// The string always uses Unix newlines (`\n`), regardless of the platform.
/// A logo that fails to decode is left out.
///
/// # Errors
///
/// Returns [`QrError::InvalidStyle`](crate::error::QrError::InvalidStyle) for an out-of-range style.
///
/// # Example
///
/// ```rust
/// use qistyle::matrix::ModuleMatrix;
/// use qistyle::style::{EcLevel, StyleConfig};
/// use qistyle::svg;
///
/// let matrix = ModuleMatrix::encode("HELLO WORLD", EcLevel::L).unwrap();
/// let markup = svg::render(&matrix, &StyleConfig::default()).unwrap();
/// assert!(markup.contains("viewBox=\"0 0 25 25\""));
/// ```
pub fn render(matrix: &ModuleMatrix, style: &StyleConfig) -> QrResult<String> {
    style.validate()?;
    let logo = style
        .logo
        .as_ref()
        .and_then(|l| l.decode_or_skip().map(|img| (l, img.dimensions())));
    let layout = Layout::new(matrix, style, logo.map(|(_, dims)| dims));
    Ok(to_svg_string(&layout, logo.map(|(l, _)| l)))
}

/// Serializes a resolved layout.
#[must_use]
pub fn to_svg_string(layout: &Layout, logo: Option<&Logo>) -> String {
    let side = num(layout.canvas);
    let mut result = String::with_capacity(64 + layout.modules.len() * 24);
    result += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
    let _ = writeln!(
        result,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" viewBox=\"0 0 {side} {side}\" stroke=\"none\">"
    );

    if let Some((silhouette, rgb)) = &layout.backdrop {
        let _ = writeln!(result, "\t{}", shape_element(silhouette, &Color::Rgb(*rgb).to_css()));
    }

    if !layout.modules.is_empty() {
        result += "\t<path d=\"";
        for (i, shape) in layout.modules.iter().enumerate() {
            if i != 0 {
                result += " ";
            }
            push_path(&mut result, shape);
        }
        let _ = writeln!(result, "\" fill=\"{}\"/>", Color::Rgb(layout.foreground).to_css());
    }

    if let (Some(b), Some(logo)) = (layout.logo, logo) {
        let _ = writeln!(
            result,
            "\t<image x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" preserveAspectRatio=\"none\" href=\"{}\"/>",
            num(b.x),
            num(b.y),
            num(b.width),
            num(b.height),
            logo.to_data_uri()
        );
    }

    result += "</svg>\n";
    result
}

fn shape_element(shape: &Shape, fill: &str) -> String {
    match *shape {
        Shape::Rect { x, y, w, h } => format!(
            "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{fill}\"/>",
            num(x),
            num(y),
            num(w),
            num(h)
        ),
        Shape::RoundedRect { x, y, w, h, radius } => format!(
            "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"{r}\" ry=\"{r}\" fill=\"{fill}\"/>",
            num(x),
            num(y),
            num(w),
            num(h),
            r = num(radius)
        ),
        Shape::Circle { cx, cy, r } => format!(
            "<circle cx=\"{}\" cy=\"{}\" r=\"{}\" fill=\"{fill}\"/>",
            num(cx),
            num(cy),
            num(r)
        ),
    }
}

fn push_path(out: &mut String, shape: &Shape) {
    match *shape {
        Shape::Rect { x, y, w, h } => {
            let _ = write!(out, "M{},{}h{}v{}h-{}z", num(x), num(y), num(w), num(h), num(w));
        }
        Shape::Circle { cx, cy, r } => {
            // Two half-circle arcs; a single arc cannot close on itself.
            let (start, radius, d) = (num(cx - r), num(r), num(2.0 * r));
            let _ = write!(
                out,
                "M{start},{}a{radius},{radius} 0 1,0 {d},0a{radius},{radius} 0 1,0 -{d},0z",
                num(cy)
            );
        }
        Shape::RoundedRect { .. } => {
            // Modules are never rounded; fall back to the outline polygon.
            for (i, (px, py)) in shape.polygon(8).into_iter().enumerate() {
                let op = if i == 0 { 'M' } else { 'L' };
                let _ = write!(out, "{op}{},{}", num(px), num(py));
            }
            out.push('z');
        }
    }
}

/// Formats a coordinate with at most four decimals and no trailing zeros.
fn num(value: f64) -> String {
    let s = format!("{value:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" || s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}
