//! The box a measurement has to fit in

use crate::error::{Result, TextLayoutError};
use crate::types::Size;

/// Minimum and maximum size for a measured layout
///
/// `max` may be infinite in either direction; `min` must be finite. Both must be
/// non-negative and `min <= max` component-wise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConstraints {
    pub min: Size,
    pub max: Size,
}

impl LayoutConstraints {
    /// Build constraints, rejecting malformed boxes right away
    pub fn new(min: Size, max: Size) -> Result<Self> {
        let constraints = Self { min, max };
        constraints.validate()?;
        Ok(constraints)
    }

    /// Anything from zero to `max`
    pub fn loose(max: Size) -> Self {
        Self {
            min: Size::ZERO,
            max,
        }
    }

    /// Exactly `size`
    pub fn tight(size: Size) -> Self {
        Self {
            min: size,
            max: size,
        }
    }

    /// No limits at all
    pub fn unbounded() -> Self {
        Self::loose(Size::INFINITE)
    }

    pub fn validate(&self) -> Result<()> {
        let Self { min, max } = self;
        if min.width.is_nan() || min.height.is_nan() || max.width.is_nan() || max.height.is_nan()
        {
            return Err(TextLayoutError::InvalidConstraints(format!(
                "NaN in constraints {self:?}"
            )));
        }
        if !min.width.is_finite() || !min.height.is_finite() {
            return Err(TextLayoutError::InvalidConstraints(format!(
                "minimum size must be finite, got {}x{}",
                min.width, min.height
            )));
        }
        if !min.is_non_negative() {
            return Err(TextLayoutError::InvalidConstraints(format!(
                "minimum size must be non-negative, got {}x{}",
                min.width, min.height
            )));
        }
        if min.width > max.width || min.height > max.height {
            return Err(TextLayoutError::InvalidConstraints(format!(
                "minimum {}x{} exceeds maximum {}x{}",
                min.width, min.height, max.width, max.height
            )));
        }
        Ok(())
    }

    /// Pull `size` into `[min, max]` component-wise
    pub fn clamp(&self, size: Size) -> Size {
        Size::new(
            size.width.max(self.min.width).min(self.max.width),
            size.height.max(self.min.height).min(self.max.height),
        )
    }
}

impl Default for LayoutConstraints {
    fn default() -> Self {
        Self::unbounded()
    }
}
