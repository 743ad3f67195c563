//! Logo loading and the box math every output path shares.
//!
//! The logo is drawn as-is: no backing plate, no contrast shim. Callers who
//! want a plate must ask for one in their own artwork.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, RgbaImage};

use crate::error::{QrError, QrResult};

/// Raw, not yet decoded, logo image bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logo {
    bytes: Arc<[u8]>,
}

impl Logo {
    /// Wraps encoded image bytes (PNG, JPEG, GIF, WebP...).
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
        }
    }

    /// Parses a `data:image/...;base64,` URI.
    ///
    /// # Errors
    ///
    /// Returns [`QrError::Logo`] if the URI is not base64 image data.
    ///
    /// # Example
    ///
    /// ```rust
    /// use qistyle::logo::Logo;
    ///
    /// let logo = Logo::from_data_uri("data:image/png;base64,iVBORw0KGgo=").unwrap();
    /// assert_eq!(&logo.bytes()[1..4], b"PNG");
    /// ```
    pub fn from_data_uri(uri: &str) -> QrResult<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| QrError::Logo("not a data URI".into()))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| QrError::Logo("data URI has no payload".into()))?;
        if !meta.starts_with("image/") || !meta.ends_with(";base64") {
            return Err(QrError::Logo(format!("unsupported data URI header {meta:?}")));
        }
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| QrError::Logo(format!("invalid base64: {e}")))?;
        Ok(Self::from_bytes(bytes))
    }

    /// The encoded bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// MIME type sniffed from the magic bytes.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        match image::guess_format(&self.bytes) {
            Ok(ImageFormat::Png) => "image/png",
            Ok(ImageFormat::Jpeg) => "image/jpeg",
            Ok(ImageFormat::Gif) => "image/gif",
            Ok(ImageFormat::WebP) => "image/webp",
            Ok(ImageFormat::Bmp) => "image/bmp",
            _ => "application/octet-stream",
        }
    }

    /// Re-encodes the original bytes as a data URI.
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), STANDARD.encode(&self.bytes))
    }

    /// Decodes the image to RGBA.
    ///
    /// # Errors
    ///
    /// Returns [`QrError::Logo`] if the bytes are not a decodable image or
    /// the image is empty.
    pub fn decode(&self) -> QrResult<RgbaImage> {
        let img = image::load_from_memory(&self.bytes)
            .map_err(|e| QrError::Logo(e.to_string()))?
            .to_rgba8();
        if img.width() == 0 || img.height() == 0 {
            return Err(QrError::Logo("image has no pixels".into()));
        }
        Ok(img)
    }

    /// Decodes the logo, or logs and drops it.
    ///
    /// A logo that fails to load never aborts a render.
    pub(crate) fn decode_or_skip(&self) -> Option<RgbaImage> {
        match self.decode() {
            Ok(img) => Some(img),
            Err(err) => {
                tracing::warn!("logo skipped, rendering without it: {err}");
                None
            }
        }
    }
}

/// Where the logo lands, in the same units as the surrounding drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogoBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LogoBox {
    /// Centers an image of `image_w`×`image_h` on `(center_x, center_y)`,
    /// sized so its longer side equals `fraction × symbol_side`.
    ///
    /// The shorter side shrinks proportionally; the image is never stretched.
    #[must_use]
    pub fn centered(
        center_x: f64,
        center_y: f64,
        symbol_side: f64,
        fraction: f64,
        image_w: u32,
        image_h: u32,
    ) -> Self {
        let target = symbol_side * fraction;
        let (w, h) = (f64::from(image_w), f64::from(image_h));
        let (width, height) = if w >= h {
            (target, target * h / w)
        } else {
            (target * w / h, target)
        };
        Self {
            x: center_x - width / 2.0,
            y: center_y - height / 2.0,
            width,
            height,
        }
    }

    /// Same box with every coordinate multiplied by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            width: self.width * factor,
            height: self.height * factor,
        }
    }
}
