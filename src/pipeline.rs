//! Render-then-verify pipeline.
//!
//! One call encodes the payload, draws the raster and vector artifacts and
//! attaches a readability diagnosis. Each call is independent: nothing is
//! cached between runs, so any edit to payload or style means a fresh run.

use image::RgbaImage;

use crate::diagnose::{self, Diagnosis, Verdict};
use crate::error::{QrError, QrResult};
use crate::matrix::ModuleMatrix;
use crate::style::StyleConfig;
use crate::verify::ScanVerifier;
use crate::{pdf, raster, svg};

/// When to run the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyPolicy {
    /// On every run.
    #[default]
    Always,
    /// Only when the style departs from plain black-on-white squares.
    WhenCustomized,
}

/// Downloadable output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Svg,
    Pdf,
}

impl ExportFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Pdf => "pdf",
        }
    }

    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Svg => "image/svg+xml",
            Self::Pdf => "application/pdf",
        }
    }
}

/// Configured pipeline. Cheap to copy and safe to share.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pipeline {
    verifier: ScanVerifier,
    policy: VerifyPolicy,
}

impl Pipeline {
    #[must_use]
    pub fn new(verifier: ScanVerifier, policy: VerifyPolicy) -> Self {
        Self { verifier, policy }
    }

    /// Runs the whole pipeline for one payload and style.
    ///
    /// # Errors
    ///
    /// Returns [`QrError::EmptyPayload`], [`QrError::PayloadTooLong`] or
    /// [`QrError::InvalidStyle`] for bad input, and [`QrError::Canvas`] if
    /// the raster cannot be allocated. An unreadable symbol is not an error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use qistyle::pipeline::Pipeline;
    /// use qistyle::style::StyleConfig;
    ///
    /// let style = StyleConfig::default().with_output_width(400);
    /// let generated = Pipeline::default().generate("https://example.com", &style).unwrap();
    /// assert!(generated.verdict().is_readable());
    /// assert!(generated.svg.starts_with("<?xml"));
    /// ```
    pub fn generate(&self, payload: &str, style: &StyleConfig) -> QrResult<Generated> {
        self.generate_sequenced(0, payload, style)
    }

    /// Like [`generate`](Self::generate), tagging the result with `sequence`
    /// so overlapping runs can be told apart by the caller.
    ///
    /// # Errors
    ///
    /// Same as [`generate`](Self::generate).
    pub fn generate_sequenced(&self, sequence: u64, payload: &str, style: &StyleConfig) -> QrResult<Generated> {
        if payload.is_empty() {
            return Err(QrError::EmptyPayload);
        }
        style.validate()?;

        let level = style.effective_ec_level();
        let mut warnings = Vec::new();
        if level != style.error_correction_level {
            tracing::warn!(requested = %style.error_correction_level, %level, "logo present, raising error correction");
        }
        if style.logo_needs_higher_level() {
            warnings.push(format!(
                "A logo hides part of the code; error correction {level} restores only about {:.0}% of it, H is recommended.",
                level.redundancy() * 100.0
            ));
        }

        let matrix = ModuleMatrix::encode(payload, level)?;
        let raster = raster::render(&matrix, style)?;
        let svg = svg::render(&matrix, style)?;

        let diagnosis = match self.policy {
            VerifyPolicy::WhenCustomized if style.is_plain() => Diagnosis::assumed_readable(),
            _ => diagnose::diagnose(&self.verifier, &matrix, payload, style, &raster)?,
        };
        if let Some(reason) = diagnosis.verdict.reason() {
            warnings.push(reason.remediation().to_string());
        }
        tracing::debug!(sequence, verdict = ?diagnosis.verdict, "pipeline run finished");

        Ok(Generated {
            sequence,
            payload: payload.to_string(),
            style: style.clone(),
            matrix,
            raster,
            svg,
            diagnosis,
            warnings,
        })
    }
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone)]
pub struct Generated {
    /// Caller-supplied run number.
    pub sequence: u64,
    pub payload: String,
    pub style: StyleConfig,
    pub matrix: ModuleMatrix,
    /// Raster artifact, `style.output_width` pixels square.
    pub raster: RgbaImage,
    /// Vector artifact.
    pub svg: String,
    pub diagnosis: Diagnosis,
    /// Human-readable advice, most important last.
    pub warnings: Vec<String>,
}

impl Generated {
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        self.diagnosis.verdict
    }

    /// True if `self` came from a later run than `other`.
    #[must_use]
    pub fn supersedes(&self, other: &Generated) -> bool {
        self.sequence > other.sequence
    }

    /// Serializes the artifact, refusing when the symbol is unreadable.
    ///
    /// # Errors
    ///
    /// Returns [`QrError::ExportBlocked`] for an unreadable verdict, or any
    /// error from [`export_unchecked`](Self::export_unchecked).
    pub fn export(&self, format: ExportFormat) -> QrResult<Vec<u8>> {
        match self.verdict() {
            Verdict::Unreadable(reason) => Err(QrError::ExportBlocked(reason)),
            _ => self.export_unchecked(format),
        }
    }

    /// Serializes the artifact regardless of the verdict.
    ///
    /// # Errors
    ///
    /// Returns [`QrError::Export`] if encoding fails.
    pub fn export_unchecked(&self, format: ExportFormat) -> QrResult<Vec<u8>> {
        match format {
            ExportFormat::Png => raster::encode_png(&self.raster),
            ExportFormat::Svg => Ok(self.svg.clone().into_bytes()),
            ExportFormat::Pdf => pdf::render(&self.matrix, &self.style),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnose::Reason;
    use crate::logo::Logo;
    use crate::style::{Color, EcLevel, LogoPolicy};

    fn small() -> StyleConfig {
        StyleConfig::default().with_output_width(400)
    }

    #[test]
    fn test_empty_payload_rejected() {
        assert!(matches!(
            Pipeline::default().generate("", &small()),
            Err(QrError::EmptyPayload)
        ));
    }

    #[test]
    fn test_payload_too_long_is_fatal() {
        let payload = "y".repeat(2000);
        let err = Pipeline::default()
            .generate(&payload, &small().with_ec_level(EcLevel::H))
            .unwrap_err();
        assert!(matches!(err, QrError::PayloadTooLong { level: EcLevel::H }));
    }

    #[test]
    fn test_plain_run_is_readable_and_exports() {
        let generated = Pipeline::default().generate("https://example.com", &small()).unwrap();
        assert_eq!(generated.verdict(), Verdict::Readable);
        assert!(generated.warnings.is_empty());
        assert_eq!(&generated.export(ExportFormat::Png).unwrap()[0..4], &[137, 80, 78, 71]);
        assert!(generated.export(ExportFormat::Svg).unwrap().starts_with(b"<?xml"));
        assert_eq!(&generated.export(ExportFormat::Pdf).unwrap()[0..5], b"%PDF-");
    }

    #[test]
    fn test_when_customized_skips_plain_styles() {
        let pipeline = Pipeline::new(ScanVerifier::default(), VerifyPolicy::WhenCustomized);
        let generated = pipeline.generate("skip me", &small()).unwrap();
        assert!(generated.diagnosis.probes.is_empty());

        let tinted = small().with_colors(Color::Rgb([20, 40, 120]), Color::WHITE);
        let generated = pipeline.generate("check me", &tinted).unwrap();
        assert!(!generated.diagnosis.probes.is_empty());
    }

    #[test]
    fn test_low_contrast_blocks_export() {
        let style = small().with_colors(Color::Rgb([0x77, 0x77, 0x77]), Color::Rgb([0x99, 0x99, 0x99]));
        let generated = Pipeline::default().generate("grey on grey", &style).unwrap();
        assert_eq!(generated.verdict(), Verdict::Unreadable(Reason::LowContrast));
        assert!(matches!(
            generated.export(ExportFormat::Png),
            Err(QrError::ExportBlocked(Reason::LowContrast))
        ));
        assert!(generated.export_unchecked(ExportFormat::Png).is_ok());
        assert_eq!(generated.warnings.last().map(String::as_str), Some(Reason::LowContrast.remediation()));
    }

    #[test]
    fn test_logo_policy_warning() {
        let logo = Logo::from_bytes(vec![0u8; 4]);
        let flagged = small().with_logo(logo.clone(), 0.2).with_logo_policy(LogoPolicy::Recommend);
        let generated = Pipeline::default().generate("logo policy", &flagged).unwrap();
        assert_eq!(generated.matrix.level(), EcLevel::M);
        assert!(generated.warnings.iter().any(|w| w.contains("about 15% of it, H is recommended")));

        let forced = small().with_logo(logo, 0.2);
        let generated = Pipeline::default().generate("logo policy", &forced).unwrap();
        assert_eq!(generated.matrix.level(), EcLevel::H);
    }

    #[test]
    fn test_sequence_ordering() {
        let pipeline = Pipeline::default();
        let first = pipeline.generate_sequenced(1, "a", &small()).unwrap();
        let second = pipeline.generate_sequenced(2, "ab", &small()).unwrap();
        assert!(second.supersedes(&first));
        assert!(!first.supersedes(&second));
    }
}
