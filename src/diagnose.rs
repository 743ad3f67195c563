//! Failure attribution.
//!
//! A bare verification only says "decodes" or "does not decode". To tell the
//! user what to change, the symbol is re-verified under controlled variants:
//!
//! - a geometry probe (same margin, logo and frame, but black-on-white square
//!   modules) on a black surface. If that fails, color is not the problem.
//!   A zero-margin symbol that still decodes on a white surface is only
//!   fragile at its edges, provided the real rendering decodes too.
//! - the real rendering.
//! - when the real rendering fails, a neutral variant without logo on a
//!   surface of the foreground color. If that decodes, it is contrast.

use std::fmt;

use image::RgbaImage;
use serde::Serialize;

use crate::error::QrResult;
use crate::matrix::ModuleMatrix;
use crate::raster;
use crate::style::{Color, StyleConfig};
use crate::verify::{ScanReport, ScanVerifier};

/// Why a symbol is degraded or unreadable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Reason {
    /// The logo or missing quiet zone hides too much of the symbol.
    Obstruction,
    /// Foreground and background are too close in brightness.
    LowContrast,
    /// Only decodes when the surrounding surface happens to be light.
    TightMargin,
}

impl Reason {
    /// Message telling the user how to fix it.
    #[must_use]
    pub fn remediation(self) -> &'static str {
        match self {
            Self::Obstruction => {
                "The logo covers too much of the code. Reduce the logo size or set error correction to H."
            }
            Self::LowContrast => {
                "Foreground and background are too similar. Use a darker foreground or a lighter background."
            }
            Self::TightMargin => {
                "The code touches its surroundings. Increase the margin so it scans on dark surfaces too."
            }
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Obstruction => "obstruction",
            Self::LowContrast => "low contrast",
            Self::TightMargin => "tight margin",
        })
    }
}

/// Readability verdict shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Readable,
    Degraded(Reason),
    Unreadable(Reason),
}

/// Flat `{readable, reason}` form of a [`Verdict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerdictSummary {
    pub readable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
}

impl Verdict {
    /// Degraded symbols still decode.
    #[must_use]
    pub fn is_readable(self) -> bool {
        !matches!(self, Self::Unreadable(_))
    }

    #[must_use]
    pub fn reason(self) -> Option<Reason> {
        match self {
            Self::Readable => None,
            Self::Degraded(reason) | Self::Unreadable(reason) => Some(reason),
        }
    }

    /// Whether downloads should be offered.
    #[must_use]
    pub fn allows_export(self) -> bool {
        self.is_readable()
    }

    #[must_use]
    pub fn summary(self) -> VerdictSummary {
        VerdictSummary {
            readable: self.is_readable(),
            reason: self.reason(),
        }
    }
}

impl Serialize for Verdict {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.summary().serialize(serializer)
    }
}

/// Which variant a probe decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProbeKind {
    /// Black-on-white square modules, real margin and logo.
    Geometry,
    /// The rendering as the user styled it.
    Rendered,
    /// Black-on-white, no logo, against the real foreground color.
    Neutral,
}

/// One verification run made while diagnosing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Probe {
    pub kind: ProbeKind,
    pub simulated_background: Option<Color>,
    pub report: ScanReport,
}

/// Verdict plus the evidence it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnosis {
    pub verdict: Verdict,
    pub probes: Vec<Probe>,
}

impl Diagnosis {
    /// Verdict for a style known to be safe, with no probes run.
    #[must_use]
    pub fn assumed_readable() -> Self {
        Self {
            verdict: Verdict::Readable,
            probes: Vec::new(),
        }
    }
}

/// Attributes a readability verdict to `rendered`, the raster of `matrix`
/// under `style`.
///
/// # Errors
///
/// Only fails if a probe variant cannot be rasterized.
pub fn diagnose(
    verifier: &ScanVerifier,
    matrix: &ModuleMatrix,
    payload: &str,
    style: &StyleConfig,
    rendered: &RgbaImage,
) -> QrResult<Diagnosis> {
    let mut probes = Vec::new();
    let mut run = |kind, image: &RgbaImage, background: Option<Color>| {
        let report = verifier.verify(image, payload, background);
        let readable = report.is_readable();
        tracing::debug!(?kind, ?background, readable, "verification probe");
        probes.push(Probe {
            kind,
            simulated_background: background,
            report,
        });
        readable
    };

    let geometry = raster::render(matrix, &style.geometry_probe())?;
    let sturdy = run(ProbeKind::Geometry, &geometry, Some(Color::BLACK));
    if !sturdy {
        let on_light = run(ProbeKind::Geometry, &geometry, Some(Color::WHITE));
        if !on_light || style.margin > 0 {
            return Ok(Diagnosis {
                verdict: Verdict::Unreadable(Reason::Obstruction),
                probes,
            });
        }
    }

    // A symbol without quiet zone is only judged on the light surface it needs.
    let surface = if sturdy { None } else { Some(Color::WHITE) };
    if run(ProbeKind::Rendered, rendered, surface) {
        let verdict = if sturdy {
            Verdict::Readable
        } else {
            Verdict::Degraded(Reason::TightMargin)
        };
        return Ok(Diagnosis { verdict, probes });
    }

    let neutral = raster::render(matrix, &style.geometry_probe().without_logo())?;
    let neutral_readable = run(ProbeKind::Neutral, &neutral, Some(style.foreground));
    Ok(Diagnosis {
        verdict: Verdict::Unreadable(color_failure_reason(neutral_readable, style.margin)),
        probes,
    })
}

/// Reason for a rendering whose geometry decodes but whose colors do not.
///
/// The neutral variant sits on a surface of the real foreground color. If it
/// still decodes, the colors are to blame; otherwise the quiet zone does not
/// separate the symbol from its own ink.
fn color_failure_reason(neutral_readable: bool, margin: u32) -> Reason {
    match (neutral_readable, margin) {
        (true, _) => Reason::LowContrast,
        (false, 0) => Reason::TightMargin,
        (false, _) => Reason::Obstruction,
    }
}
