//! Style configuration for rendering a symbol.
//!
//! A [`StyleConfig`] is a plain value: every render, export and verification
//! call receives one explicitly. Nothing here is global.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{QrError, QrResult};
use crate::logo::Logo;

/// Smallest accepted logo size, as a fraction of the symbol width.
pub const MIN_LOGO_FRACTION: f64 = 0.1;
/// Largest accepted logo size, as a fraction of the symbol width.
pub const MAX_LOGO_FRACTION: f64 = 0.35;

/// An opaque sRGB color, or the transparent sentinel used for backgrounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Color {
    /// Opaque color as `[r, g, b]`.
    Rgb([u8; 3]),
    /// No paint at all.
    Transparent,
}

impl Color {
    /// Pure black.
    pub const BLACK: Color = Color::Rgb([0, 0, 0]);
    /// Pure white.
    pub const WHITE: Color = Color::Rgb([255, 255, 255]);

    /// Parses `#rgb`, `#rrggbb` or `transparent`.
    ///
    /// # Errors
    ///
    /// Returns [`QrError::InvalidStyle`] for anything else.
    ///
    /// # Example
    ///
    /// ```rust
    /// use qistyle::style::Color;
    ///
    /// assert_eq!(Color::parse("#f80").unwrap(), Color::Rgb([255, 136, 0]));
    /// assert_eq!(Color::parse("Transparent").unwrap(), Color::Transparent);
    /// ```
    pub fn parse(input: &str) -> QrResult<Self> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("transparent") {
            return Ok(Self::Transparent);
        }
        let invalid = || QrError::InvalidStyle(format!("unrecognized color {input:?}"));
        let hex = trimmed.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
        match hex.len() {
            3 => {
                let mut rgb = [0u8; 3];
                for (slot, i) in rgb.iter_mut().zip(0..3) {
                    let nibble = channel(&hex[i..=i])?;
                    *slot = nibble * 17;
                }
                Ok(Self::Rgb(rgb))
            }
            6 => Ok(Self::Rgb([
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            ])),
            _ => Err(invalid()),
        }
    }

    /// The RGB triple, or `None` for the transparent sentinel.
    #[must_use]
    pub fn rgb(self) -> Option<[u8; 3]> {
        match self {
            Self::Rgb(rgb) => Some(rgb),
            Self::Transparent => None,
        }
    }

    /// Rec. 601 luma of this color, `None` when transparent.
    #[must_use]
    pub fn luma(self) -> Option<f32> {
        self.rgb().map(|[r, g, b]| luma(r, g, b))
    }

    /// CSS representation used in SVG attributes.
    #[must_use]
    pub fn to_css(self) -> String {
        self.to_string()
    }
}

/// Rec. 601 luma, the brightness measure used for every contrast decision.
#[must_use]
pub fn luma(r: u8, g: u8, b: u8) -> f32 {
    0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b)
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgb([r, g, b]) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
            Self::Transparent => f.write_str("transparent"),
        }
    }
}

impl FromStr for Color {
    type Err = QrError;

    fn from_str(s: &str) -> QrResult<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Color {
    type Error = QrError;

    fn try_from(value: String) -> QrResult<Self> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Error-correction level, ordered from least to most redundancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EcLevel {
    /// Recovers about 7% of codewords.
    L,
    /// Recovers about 15% of codewords.
    M,
    /// Recovers about 25% of codewords.
    Q,
    /// Recovers about 30% of codewords.
    H,
}

impl EcLevel {
    /// Approximate fraction of codewords this level can restore.
    #[must_use]
    pub fn redundancy(self) -> f64 {
        match self {
            Self::L => 0.07,
            Self::M => 0.15,
            Self::Q => 0.25,
            Self::H => 0.30,
        }
    }

    pub(crate) fn to_encoder(self) -> qrcode::EcLevel {
        match self {
            Self::L => qrcode::EcLevel::L,
            Self::M => qrcode::EcLevel::M,
            Self::Q => qrcode::EcLevel::Q,
            Self::H => qrcode::EcLevel::H,
        }
    }
}

impl fmt::Display for EcLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::L => "L",
            Self::M => "M",
            Self::Q => "Q",
            Self::H => "H",
        };
        f.write_str(letter)
    }
}

/// Shape used for dark data modules. Finder patterns ignore this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStyle {
    /// Full cell.
    #[default]
    Square,
    /// Circle at 80% of the cell, centered.
    Dot,
}

/// Silhouette of the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameShape {
    /// Plain square.
    #[default]
    Square,
    /// Square with corners rounded at 10% of the side.
    Rounded,
    /// Circle enlarged to contain the whole square symbol.
    Circle,
}

/// What to do with the error-correction level when a logo is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoPolicy {
    /// Render at level H regardless of the requested level.
    #[default]
    ForceHighest,
    /// Keep the requested level and report a warning instead.
    Recommend,
}

/// Every option that affects how a symbol looks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleConfig {
    /// Empty border around the matrix, in modules.
    pub margin: u32,
    /// Raster output width in pixels.
    pub output_width: u32,
    /// Color of dark modules.
    pub foreground: Color,
    /// Color of light modules and margin, or transparent.
    pub background: Color,
    /// Requested error-correction level.
    pub error_correction_level: EcLevel,
    /// Shape of dark data modules.
    pub module_style: ModuleStyle,
    /// Background silhouette.
    pub frame_shape: FrameShape,
    /// Logo to composite over the center, if any.
    #[serde(skip)]
    pub logo: Option<Logo>,
    /// Logo size as a fraction of the symbol width.
    pub logo_size_fraction: f64,
    /// Level handling when a logo is present.
    pub logo_policy: LogoPolicy,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            margin: 2,
            output_width: 1024,
            foreground: Color::BLACK,
            background: Color::WHITE,
            error_correction_level: EcLevel::M,
            module_style: ModuleStyle::Square,
            frame_shape: FrameShape::Square,
            logo: None,
            logo_size_fraction: 0.2,
            logo_policy: LogoPolicy::ForceHighest,
        }
    }
}

impl StyleConfig {
    /// Loads a style document. The logo must be attached separately.
    ///
    /// # Errors
    ///
    /// Returns [`QrError::Config`] if the JSON is malformed and
    /// [`QrError::InvalidStyle`] if a field is out of range.
    ///
    /// # Example
    ///
    /// ```rust
    /// use qistyle::style::{FrameShape, StyleConfig};
    ///
    /// let style = StyleConfig::from_json(r##"{"margin": 4, "frameShape": "circle"}"##).unwrap();
    /// assert_eq!(style.margin, 4);
    /// assert_eq!(style.frame_shape, FrameShape::Circle);
    /// ```
    pub fn from_json(document: &str) -> QrResult<Self> {
        let style: Self = serde_json::from_str(document)?;
        style.validate()?;
        Ok(style)
    }

    /// Checks that every field is in range.
    ///
    /// # Errors
    ///
    /// Returns [`QrError::InvalidStyle`] describing the first bad field.
    pub fn validate(&self) -> QrResult<()> {
        if self.output_width == 0 {
            return Err(QrError::InvalidStyle("output width must be positive".into()));
        }
        if self.foreground == Color::Transparent {
            return Err(QrError::InvalidStyle("foreground must be opaque".into()));
        }
        if !(MIN_LOGO_FRACTION..=MAX_LOGO_FRACTION).contains(&self.logo_size_fraction) {
            return Err(QrError::InvalidStyle(format!(
                "logo size fraction {} outside [{MIN_LOGO_FRACTION}, {MAX_LOGO_FRACTION}]",
                self.logo_size_fraction
            )));
        }
        Ok(())
    }

    /// Level the symbol is actually encoded at.
    #[must_use]
    pub fn effective_ec_level(&self) -> EcLevel {
        match (&self.logo, self.logo_policy) {
            (Some(_), LogoPolicy::ForceHighest) => EcLevel::H,
            _ => self.error_correction_level,
        }
    }

    /// True when a logo is present but the level was left below H.
    #[must_use]
    pub fn logo_needs_higher_level(&self) -> bool {
        self.logo.is_some() && self.effective_ec_level() < EcLevel::H
    }

    /// True for the plain black-on-white square look with a quiet zone.
    #[must_use]
    pub fn is_plain(&self) -> bool {
        self.logo.is_none()
            && self.foreground == Color::BLACK
            && self.background == Color::WHITE
            && self.module_style == ModuleStyle::Square
            && self.frame_shape == FrameShape::Square
            && self.margin >= 1
    }

    /// Same geometry in pure black-on-white square modules.
    ///
    /// Used to tell structural failures apart from color failures.
    #[must_use]
    pub fn geometry_probe(&self) -> Self {
        Self {
            foreground: Color::BLACK,
            background: Color::WHITE,
            module_style: ModuleStyle::Square,
            ..self.clone()
        }
    }

    /// Sets the quiet zone, in modules.
    #[must_use]
    pub fn with_margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    /// Sets the raster side, in pixels.
    #[must_use]
    pub fn with_output_width(mut self, width: u32) -> Self {
        self.output_width = width;
        self
    }

    /// Sets module and background colors.
    #[must_use]
    pub fn with_colors(mut self, foreground: Color, background: Color) -> Self {
        self.foreground = foreground;
        self.background = background;
        self
    }

    /// Sets the requested error-correction level.
    #[must_use]
    pub fn with_ec_level(mut self, level: EcLevel) -> Self {
        self.error_correction_level = level;
        self
    }

    /// Sets the shape of data modules.
    #[must_use]
    pub fn with_module_style(mut self, style: ModuleStyle) -> Self {
        self.module_style = style;
        self
    }

    /// Sets the background silhouette.
    #[must_use]
    pub fn with_frame_shape(mut self, frame: FrameShape) -> Self {
        self.frame_shape = frame;
        self
    }

    /// Attaches a logo sized to `size_fraction` of the symbol width.
    #[must_use]
    pub fn with_logo(mut self, logo: Logo, size_fraction: f64) -> Self {
        self.logo = Some(logo);
        self.logo_size_fraction = size_fraction;
        self
    }

    /// Removes the logo, keeping its size fraction.
    #[must_use]
    pub fn without_logo(mut self) -> Self {
        self.logo = None;
        self
    }

    /// Sets how a logo affects the error-correction level.
    #[must_use]
    pub fn with_logo_policy(mut self, policy: LogoPolicy) -> Self {
        self.logo_policy = policy;
        self
    }
}
