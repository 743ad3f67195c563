//! # qistyle
//!
//! Styled QR codes that are checked before they are handed out.
//!
//! `qistyle` encodes a payload into a QR module matrix, draws it as a raster
//! and as SVG with configurable colors, module shapes, frames and a centered
//! logo, then decodes its own output to decide whether a phone will still be
//! able to read it. When it cannot, the verdict names the likely cause so the
//! style can be fixed.
//!
//! ## Features
//!
//! - Square or dot modules. Finder patterns always stay solid squares.
//! - Square, rounded or circular frames, and transparent backgrounds.
//! - Centered logos, with error correction raised to H automatically.
//! - Two-pass decode verification with reason attribution: obstruction, low
//!   contrast or tight margin.
//! - PNG, SVG and print-ready PDF exports.
//!
//! ## Example
//!
//! ```rust
//! use qistyle::pipeline::{ExportFormat, Pipeline};
//! use qistyle::style::{Color, ModuleStyle, StyleConfig};
//!
//! let style = StyleConfig::default()
//!     .with_output_width(400)
//!     .with_colors(Color::parse("#1a237e").unwrap(), Color::WHITE)
//!     .with_module_style(ModuleStyle::Dot);
//!
//! let generated = Pipeline::default().generate("https://example.com", &style).unwrap();
//! assert!(generated.verdict().is_readable());
//! let png = generated.export(ExportFormat::Png).unwrap();
//! assert_eq!(&png[1..4], b"PNG");
//! ```
//!
//! Styles can also be read from JSON:
//!
//! ```rust
//! use qistyle::style::StyleConfig;
//!
//! let style = StyleConfig::from_json(r##"{"foreground": "#222", "moduleStyle": "dot"}"##).unwrap();
//! assert_eq!(style.margin, 2);
//! ```
//!
//! ## Modules
//!
//! - [`matrix`]: payload to module grid.
//! - [`style`]: colors, shapes and the style document.
//! - [`raster`], [`svg`], [`pdf`]: the three renderers.
//! - [`verify`]: decode-based readability check.
//! - [`diagnose`]: verdicts and their reasons.
//! - [`pipeline`]: everything above in one call.

pub mod diagnose;
pub mod error;
pub mod layout;
pub mod logo;
pub mod matrix;
pub mod pdf;
pub mod pipeline;
pub mod raster;
pub mod style;
pub mod svg;
pub mod verify;

pub use diagnose::{Reason, Verdict};
pub use error::{QrError, QrResult};
pub use pipeline::{ExportFormat, Generated, Pipeline, VerifyPolicy};
pub use style::StyleConfig;
