//! Integration tests for the render-then-verify pipeline.
//!
//! Covers determinism, decode round-trips, verdict attribution and the
//! congruence of the PNG, SVG and PDF exports.

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use qistyle::layout::Layout;
use qistyle::logo::Logo;
use qistyle::matrix::{is_finder_module, ModuleMatrix};
use qistyle::pipeline::{ExportFormat, Pipeline};
use qistyle::raster;
use qistyle::style::{Color, EcLevel, FrameShape, LogoPolicy, ModuleStyle, StyleConfig};
use qistyle::verify::ScanVerifier;
use qistyle::{QrError, Reason, Verdict};

/// Short enough for version 2 at L and version 3 at H.
const SHORT_URL: &str = "https://qr.example";

fn base_style() -> StyleConfig {
    StyleConfig::default().with_output_width(400)
}

fn solid_logo(width: u32, height: u32, rgba: [u8; 4]) -> Logo {
    let img = RgbaImage::from_pixel(width, height, Rgba(rgba));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).expect("png");
    Logo::from_bytes(out.into_inner())
}

// ==========================================================================
// Determinism and round-trip
// ==========================================================================

#[test]
fn test_identical_inputs_give_identical_artifacts() {
    let style = base_style()
        .with_module_style(ModuleStyle::Dot)
        .with_frame_shape(FrameShape::Circle)
        .with_colors(Color::Rgb([0x1a, 0x23, 0x7e]), Color::Rgb([0xff, 0xf8, 0xe1]))
        .with_logo(solid_logo(64, 32, [200, 30, 30, 255]), 0.2);
    let pipeline = Pipeline::default();
    let a = pipeline.generate("determinism", &style).expect("first run");
    let b = pipeline.generate("determinism", &style).expect("second run");

    assert_eq!(a.matrix, b.matrix);
    assert_eq!(a.raster.as_raw(), b.raster.as_raw());
    assert_eq!(a.svg, b.svg);
    assert_eq!(a.verdict(), b.verdict());
}

#[test]
fn test_default_style_round_trips_at_level_l() {
    let long = "0123456789abcdefghijklmnopqrstuvwxyz".repeat(4);
    let payloads = ["a", "Hello, World!", "31415926535897932384", long.as_str()];
    let verifier = ScanVerifier::default();
    for payload in payloads {
        let style = base_style().with_ec_level(EcLevel::L).with_output_width(600);
        let matrix = ModuleMatrix::encode(payload, EcLevel::L).expect("encode");
        let img = raster::render(&matrix, &style).expect("render");
        let report = verifier.verify(&img, payload, None);
        assert!(report.is_readable(), "payload {payload:?} did not round-trip");
    }
}

#[test]
fn test_finders_survive_every_module_style() {
    let matrix = ModuleMatrix::encode(SHORT_URL, EcLevel::M).expect("encode");
    for module_style in [ModuleStyle::Square, ModuleStyle::Dot] {
        let style = base_style().with_module_style(module_style);
        let layout = Layout::new(&matrix, &style, None);
        let n = matrix.size();
        let finders = matrix
            .dark_modules()
            .zip(&layout.modules)
            .filter(|((row, col), _)| is_finder_module(*row, *col, n));
        for ((row, col), shape) in finders {
            let square = matches!(shape, qistyle::layout::Shape::Rect { w, h, .. } if *w == 1.0 && *h == 1.0);
            assert!(square, "finder module ({row}, {col}) lost its square shape");
        }
    }
}

// ==========================================================================
// Logo compositing
// ==========================================================================

#[test]
fn test_wide_logo_keeps_aspect_ratio() {
    let matrix = ModuleMatrix::encode(SHORT_URL, EcLevel::H).expect("encode");
    let style = base_style().with_logo(solid_logo(300, 100, [220, 0, 0, 255]), 0.3);
    let layout = Layout::new(&matrix, &style, Some((300, 100)));
    let logo_box = layout.logo.expect("logo box");

    assert!((logo_box.width - 0.3 * layout.symbol_side).abs() < 1e-9);
    assert!((logo_box.width / logo_box.height - 3.0).abs() < 1e-9);

    // The painted logo has the same proportions.
    let img = raster::render(&matrix, &style).expect("render");
    let red = |p: &Rgba<u8>| p.0[0] > 200 && p.0[1] < 30 && p.0[2] < 30;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (u32::MAX, u32::MAX, 0, 0);
    for (x, y, p) in img.enumerate_pixels() {
        if red(p) {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }
    let painted_w = f64::from(max_x - min_x + 1);
    let painted_h = f64::from(max_y - min_y + 1);
    assert!((painted_w - 0.3 * 400.0).abs() <= 2.0, "width {painted_w}");
    assert!((painted_w / painted_h - 3.0).abs() < 0.15, "ratio {}", painted_w / painted_h);
}

// ==========================================================================
// Verdict attribution
// ==========================================================================

#[test]
fn test_large_logo_at_level_l_is_obstruction() {
    let style = base_style()
        .with_ec_level(EcLevel::L)
        .with_logo(solid_logo(200, 100, [255, 255, 255, 255]), 0.35)
        .with_logo_policy(LogoPolicy::Recommend);
    let generated = Pipeline::default().generate(SHORT_URL, &style).expect("generate");

    assert_eq!(generated.matrix.level(), EcLevel::L);
    assert_eq!(generated.verdict(), Verdict::Unreadable(Reason::Obstruction));
    assert!(matches!(
        generated.export(ExportFormat::Svg),
        Err(QrError::ExportBlocked(Reason::Obstruction))
    ));
}

#[test]
fn test_same_logo_at_level_h_is_readable() {
    let style = base_style()
        .with_ec_level(EcLevel::H)
        .with_logo(solid_logo(200, 100, [255, 255, 255, 255]), 0.35)
        .with_logo_policy(LogoPolicy::Recommend);
    let generated = Pipeline::default().generate(SHORT_URL, &style).expect("generate");

    assert_eq!(generated.matrix.level(), EcLevel::H);
    assert_eq!(generated.verdict(), Verdict::Readable);
    assert!(generated.warnings.is_empty());
}

#[test]
fn test_zero_margin_is_tight_margin() {
    let style = base_style().with_margin(0);
    let generated = Pipeline::default().generate(SHORT_URL, &style).expect("generate");

    assert_eq!(generated.verdict(), Verdict::Degraded(Reason::TightMargin));
    assert!(generated.verdict().is_readable());
    let backgrounds: Vec<_> = generated
        .diagnosis
        .probes
        .iter()
        .map(|p| (p.simulated_background, p.report.is_readable()))
        .collect();
    assert_eq!(
        backgrounds,
        vec![(Some(Color::BLACK), false), (Some(Color::WHITE), true), (Some(Color::WHITE), true)]
    );
    // Degraded symbols may still be exported.
    assert!(generated.export(ExportFormat::Png).is_ok());
}

#[test]
fn test_zero_margin_with_similar_greys_is_blocked() {
    let style = base_style()
        .with_margin(0)
        .with_colors(Color::Rgb([0x80, 0x80, 0x80]), Color::Rgb([0x9a, 0x9a, 0x9a]));
    let generated = Pipeline::default().generate(SHORT_URL, &style).expect("generate");

    assert_eq!(generated.verdict(), Verdict::Unreadable(Reason::LowContrast));
    assert!(matches!(
        generated.export(ExportFormat::Png),
        Err(QrError::ExportBlocked(Reason::LowContrast))
    ));
}

#[test]
fn test_similar_greys_are_low_contrast() {
    let style = base_style().with_colors(Color::Rgb([0x80, 0x80, 0x80]), Color::Rgb([0x9a, 0x9a, 0x9a]));
    let generated = Pipeline::default().generate(SHORT_URL, &style).expect("generate");
    assert_eq!(generated.verdict(), Verdict::Unreadable(Reason::LowContrast));
}

#[test]
fn test_dark_tinted_dots_stay_readable() {
    let style = base_style()
        .with_module_style(ModuleStyle::Dot)
        .with_frame_shape(FrameShape::Rounded)
        .with_colors(Color::Rgb([0x0d, 0x47, 0xa1]), Color::Rgb([0xe3, 0xf2, 0xfd]));
    let generated = Pipeline::default().generate(SHORT_URL, &style).expect("generate");
    assert_eq!(generated.verdict(), Verdict::Readable);
}

// ==========================================================================
// Format congruence
// ==========================================================================

#[test]
fn test_png_export_decodes_to_payload() {
    let generated = Pipeline::default().generate(SHORT_URL, &base_style()).expect("generate");
    let png = generated.export(ExportFormat::Png).expect("png");
    let decoded = image::load_from_memory(&png).expect("decode png").to_rgba8();

    assert_eq!(decoded.as_raw(), generated.raster.as_raw());
    assert!(ScanVerifier::default().verify(&decoded, SHORT_URL, None).is_readable());
}

#[test]
fn test_svg_export_decodes_to_payload() {
    for frame in [FrameShape::Square, FrameShape::Circle] {
        let style = base_style().with_frame_shape(frame);
        let generated = Pipeline::default().generate(SHORT_URL, &style).expect("generate");
        let svg = generated.export(ExportFormat::Svg).expect("svg");
        let svg = String::from_utf8(svg).expect("utf8");

        let opt = resvg::usvg::Options::default();
        let tree = resvg::usvg::Tree::from_str(&svg, &opt).expect("parse svg");
        let mut pixmap = resvg::tiny_skia::Pixmap::new(400, 400).expect("pixmap");
        let scale = 400.0 / tree.size().width();
        resvg::render(&tree, resvg::tiny_skia::Transform::from_scale(scale, scale), &mut pixmap.as_mut());
        let img = RgbaImage::from_raw(400, 400, pixmap.data().to_vec()).expect("image");

        let report = ScanVerifier::default().verify(&img, SHORT_URL, Some(Color::WHITE));
        assert!(report.is_readable(), "{frame:?} SVG did not decode");
    }
}

#[test]
fn test_pdf_export_is_a_document() {
    let style = base_style().with_frame_shape(FrameShape::Circle).with_module_style(ModuleStyle::Dot);
    let generated = Pipeline::default().generate(SHORT_URL, &style).expect("generate");
    let pdf = generated.export(ExportFormat::Pdf).expect("pdf");
    assert_eq!(&pdf[0..5], b"%PDF-");
    assert_eq!(ExportFormat::Pdf.mime_type(), "application/pdf");
}

#[test]
fn test_style_document_drives_pipeline() {
    let style = StyleConfig::from_json(
        r##"{"outputWidth": 400, "foreground": "#2e7d32", "moduleStyle": "dot", "frameShape": "rounded"}"##,
    )
    .expect("style");
    let generated = Pipeline::default().generate(SHORT_URL, &style).expect("generate");
    assert_eq!(generated.raster.dimensions(), (400, 400));
    assert!(generated.verdict().is_readable());
}
