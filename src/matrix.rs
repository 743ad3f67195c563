//! The module matrix: the encoder's output and every renderer's input.
//!
//! Symbol encoding itself (segmenting, Reed-Solomon, masking) is done by the
//! `qrcode` crate. This module only freezes its result into an immutable grid.

use crate::error::{QrError, QrResult};
use crate::style::EcLevel;

/// Side length of a finder pattern, in modules.
pub const FINDER_SIZE: usize = 7;

/// An immutable square grid of dark (`true`) and light (`false`) modules.
///
/// # Example
///
/// ```rust
/// use qistyle::matrix::ModuleMatrix;
/// use qistyle::style::EcLevel;
///
/// let matrix = ModuleMatrix::encode("Hello, World!", EcLevel::L).unwrap();
/// assert_eq!(matrix.size(), 21);
/// assert!(matrix.is_dark(0, 0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleMatrix {
    size: usize,
    level: EcLevel,
    modules: Vec<bool>,
}

impl ModuleMatrix {
    /// Encodes `payload` at exactly `level`, picking the smallest version that fits.
    ///
    /// # Errors
    ///
    /// Returns [`QrError::PayloadTooLong`] if no version holds the payload.
    /// The caller decides what to do; nothing is retried here.
    pub fn encode(payload: &str, level: EcLevel) -> QrResult<Self> {
        let code = qrcode::QrCode::with_error_correction_level(payload.as_bytes(), level.to_encoder())
            .map_err(|e| QrError::from_encoder(e, level))?;
        let size = code.width();
        let modules = code
            .to_colors()
            .into_iter()
            .map(|c| c == qrcode::Color::Dark)
            .collect();
        tracing::debug!(size, %level, bytes = payload.len(), "encoded module matrix");
        Ok(Self { size, level, modules })
    }

    /// Side length `N` in modules.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Level the matrix was encoded at.
    #[must_use]
    pub fn level(&self) -> EcLevel {
        self.level
    }

    /// Whether the module at `(row, col)` is dark. Outside the grid is light.
    #[must_use]
    pub fn is_dark(&self, row: usize, col: usize) -> bool {
        row < self.size && col < self.size && self.modules[row * self.size + col]
    }

    /// Iterates `(row, col)` of every dark module in row-major order.
    pub fn dark_modules(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let size = self.size;
        self.modules
            .iter()
            .enumerate()
            .filter(|(_, dark)| **dark)
            .map(move |(i, _)| (i / size, i % size))
    }

    /// Block-character preview with `border` light modules around it.
    ///
    /// Each module is two characters wide so the output looks square in a terminal.
    #[must_use]
    pub fn to_text(&self, border: usize) -> String {
        let side = self.size + 2 * border;
        let mut out = String::with_capacity(side * (side * 2 * 3 + 1));
        for y in 0..side {
            for x in 0..side {
                let dark = y >= border
                    && x >= border
                    && self.is_dark(y - border, x - border);
                let c = if dark { '█' } else { ' ' };
                out.push(c);
                out.push(c);
            }
            out.push('\n');
        }
        out
    }
}

/// Whether `(row, col)` lies inside one of the three 7×7 finder patterns
/// of a symbol of side `size`.
#[must_use]
pub fn is_finder_module(row: usize, col: usize, size: usize) -> bool {
    let near = |i: usize| i < FINDER_SIZE;
    let far = |i: usize| i + FINDER_SIZE >= size;
    (near(row) && near(col)) || (near(row) && far(col)) || (far(row) && near(col))
}
