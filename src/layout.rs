//! Geometry shared by the raster, SVG and PDF backends.
//!
//! Everything is expressed in module units with the origin at the top-left
//! corner of the canvas. Backends only scale and serialize these shapes, so
//! all three outputs stay congruent.

use std::f64::consts::{FRAC_PI_2, SQRT_2};

use crate::logo::LogoBox;
use crate::matrix::{is_finder_module, ModuleMatrix};
use crate::style::{FrameShape, ModuleStyle, StyleConfig};

/// Dot diameter relative to the cell.
pub const DOT_SCALE: f64 = 0.8;
/// Corner radius of the rounded frame relative to the symbol side.
pub const ROUNDED_CORNER_RATIO: f64 = 0.1;
/// Extra ring around the circle frame, in modules, on each side.
pub const CIRCLE_SAFETY: f64 = 0.5;

/// A filled primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Rect { x: f64, y: f64, w: f64, h: f64 },
    RoundedRect { x: f64, y: f64, w: f64, h: f64, radius: f64 },
    Circle { cx: f64, cy: f64, r: f64 },
}

impl Shape {
    /// Flattens the outline into a closed polygon, clockwise in screen space.
    ///
    /// Curved parts get `segments` straight edges per quarter turn.
    #[must_use]
    pub fn polygon(&self, segments: usize) -> Vec<(f64, f64)> {
        let segments = segments.max(1);
        match *self {
            Shape::Rect { x, y, w, h } => vec![(x, y), (x + w, y), (x + w, y + h), (x, y + h)],
            Shape::Circle { cx, cy, r } => (0..4 * segments)
                .map(|i| {
                    let a = i as f64 * FRAC_PI_2 / segments as f64;
                    (cx + r * a.cos(), cy + r * a.sin())
                })
                .collect(),
            Shape::RoundedRect { x, y, w, h, radius } => {
                let r = radius.min(w / 2.0).min(h / 2.0);
                // Corner centers in drawing order, each sweeping a quarter turn.
                let corners = [
                    (x + w - r, y + r, -FRAC_PI_2),
                    (x + w - r, y + h - r, 0.0),
                    (x + r, y + h - r, FRAC_PI_2),
                    (x + r, y + r, 2.0 * FRAC_PI_2),
                ];
                let mut points = Vec::with_capacity(4 * (segments + 1));
                for (ccx, ccy, start) in corners {
                    for i in 0..=segments {
                        let a = start + i as f64 * FRAC_PI_2 / segments as f64;
                        points.push((ccx + r * a.cos(), ccy + r * a.sin()));
                    }
                }
                points
            }
        }
    }
}

/// Resolved drawing for one `(matrix, style)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// Side of the whole square canvas.
    pub canvas: f64,
    /// Offset of the symbol square from the canvas origin, on both axes.
    pub symbol_offset: f64,
    /// Side of the symbol square, `N + 2 * margin`.
    pub symbol_side: f64,
    /// Background silhouette and its color; `None` when transparent.
    pub backdrop: Option<(Shape, [u8; 3])>,
    /// Color of every module shape.
    pub foreground: [u8; 3],
    /// One shape per dark module.
    pub modules: Vec<Shape>,
    /// Logo placement, when a decodable logo is present.
    pub logo: Option<LogoBox>,
}

impl Layout {
    /// Resolves the drawing.
    ///
    /// `logo_dims` are the pixel dimensions of the decoded logo, if one
    /// decoded; the logo box is derived from them so the aspect ratio holds.
    #[must_use]
    pub fn new(matrix: &ModuleMatrix, style: &StyleConfig, logo_dims: Option<(u32, u32)>) -> Self {
        let n = matrix.size();
        let margin = f64::from(style.margin);
        let symbol_side = n as f64 + 2.0 * margin;

        let (canvas, silhouette) = match style.frame_shape {
            FrameShape::Square => (
                symbol_side,
                Shape::Rect { x: 0.0, y: 0.0, w: symbol_side, h: symbol_side },
            ),
            FrameShape::Rounded => (
                symbol_side,
                Shape::RoundedRect {
                    x: 0.0,
                    y: 0.0,
                    w: symbol_side,
                    h: symbol_side,
                    radius: symbol_side * ROUNDED_CORNER_RATIO,
                },
            ),
            FrameShape::Circle => {
                let canvas = symbol_side * SQRT_2 + 2.0 * CIRCLE_SAFETY;
                let c = canvas / 2.0;
                (canvas, Shape::Circle { cx: c, cy: c, r: c })
            }
        };
        let symbol_offset = (canvas - symbol_side) / 2.0;
        let origin = symbol_offset + margin;

        let modules = matrix
            .dark_modules()
            .map(|(row, col)| {
                let x = origin + col as f64;
                let y = origin + row as f64;
                if style.module_style == ModuleStyle::Square || is_finder_module(row, col, n) {
                    Shape::Rect { x, y, w: 1.0, h: 1.0 }
                } else {
                    Shape::Circle { cx: x + 0.5, cy: y + 0.5, r: DOT_SCALE / 2.0 }
                }
            })
            .collect();

        let center = canvas / 2.0;
        let logo = logo_dims.map(|(w, h)| {
            LogoBox::centered(center, center, symbol_side, style.logo_size_fraction, w, h)
        });

        Self {
            canvas,
            symbol_offset,
            symbol_side,
            backdrop: style.background.rgb().map(|rgb| (silhouette, rgb)),
            foreground: style.foreground.rgb().unwrap_or([0, 0, 0]),
            modules,
            logo,
        }
    }
}
