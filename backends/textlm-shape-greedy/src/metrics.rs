//! Deterministic font metrics for tests, tools, and benchmarks

use textlm_core::traits::FontResolver;
use textlm_core::types::{FontMetrics, GlyphId};
use textlm_core::TextStyle;

/// Every glyph shares one em-relative advance
///
/// With the defaults a 10px font gives 5px per character and a 10px line
/// (8 ascent, 2 descent). Bold text is a little wider. Control characters
/// have no glyph, which lets tests exercise missing-glyph handling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedMetrics {
    pub advance_em: f32,
    pub ascent_em: f32,
    pub descent_em: f32,
    pub leading_em: f32,
    /// Added to the advance of bold text
    pub bold_extra_em: f32,
}

impl FixedMetrics {
    pub const fn new(advance_em: f32, ascent_em: f32, descent_em: f32) -> Self {
        Self {
            advance_em,
            ascent_em,
            descent_em,
            leading_em: 0.0,
            bold_extra_em: 0.1,
        }
    }

    pub fn with_leading(mut self, leading_em: f32) -> Self {
        self.leading_em = leading_em;
        self
    }
}

impl Default for FixedMetrics {
    fn default() -> Self {
        Self::new(0.5, 0.8, 0.2)
    }
}

impl FontResolver for FixedMetrics {
    fn metrics(&self, style: &TextStyle) -> FontMetrics {
        FontMetrics {
            ascent: self.ascent_em * style.font_size,
            descent: self.descent_em * style.font_size,
            leading: self.leading_em * style.font_size,
        }
    }

    fn glyph_id(&self, ch: char, _style: &TextStyle) -> Option<GlyphId> {
        (!ch.is_control()).then_some(ch as GlyphId)
    }

    fn advance(&self, _glyph_id: GlyphId, style: &TextStyle) -> f32 {
        let em = if style.font_weight.is_bold() {
            self.advance_em + self.bold_extra_em
        } else {
            self.advance_em
        };
        em * style.font_size
    }
}
