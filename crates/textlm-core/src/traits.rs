//! The contracts that bind backends to the layout manager
//!
//! Each trait is one capability the engine consumes. Hosts pick the
//! implementations when they build a [`TextLayoutManager`](crate::TextLayoutManager);
//! nothing in the core knows which platform it is running on.
//!
//! ## The Players
//!
//! - [`ShapingBackend`] - Where text becomes lines of glyph runs
//! - [`DrawingSurface`] - Where glyph runs become paint
//! - [`AttachmentRenderer`] - Where inline objects get drawn
//! - [`FontResolver`] - Where styles turn into metrics and advances

use crate::attributed::{Attachment, AttributedString, TextStyle};
use crate::error::ShapingError;
use crate::layout::{GlyphRun, LayoutResult, PositionedRun};
use crate::types::{FontMetrics, GlyphId, Point, Rect, Size};
use crate::{Color, ParagraphAttributes};

/// Where characters learn their positions
///
/// A backend owns line breaking, glyph selection and alignment. It does not
/// apply `max_lines`; the manager truncates the result afterwards, so every
/// backend gets identical truncation behaviour.
///
/// Whatever the backend does internally (bidi, kerning, ligatures), its output
/// has to pass [`LayoutResult::validate`].
pub trait ShapingBackend: Send + Sync {
    /// Identify yourself in logs and cache keys
    fn name(&self) -> &'static str;

    /// Lay the text out inside `bounds`
    ///
    /// `bounds.width` may be infinite, meaning lines only break where the
    /// text says so.
    fn shape(
        &self,
        text: &AttributedString,
        bounds: Size,
        paragraph: &ParagraphAttributes,
    ) -> Result<LayoutResult, ShapingError>;

    /// Shape the elision indicator in `style`
    ///
    /// Glyph positions are relative to the start of the indicator.
    fn shape_ellipsis(&self, ellipsis: &str, style: &TextStyle) -> Result<GlyphRun, ShapingError>;

    /// Flush any cached shaping data
    fn clear_cache(&self) {}
}

/// Where glyph runs become visible
pub trait DrawingSurface {
    /// Fill a rectangle, used for backgrounds and decorations
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Paint a run with its baseline origin at `origin`
    fn draw_glyph_run(&mut self, run: &PositionedRun, origin: Point, style: &TextStyle);
}

/// Draws inline attachments
///
/// The manager only knows an attachment's frame; what goes inside is up to
/// the host.
pub trait AttachmentRenderer: Send + Sync {
    fn render_attachment(
        &self,
        attachment: &Attachment,
        frame: Rect,
        surface: &mut dyn DrawingSurface,
    );
}

/// Your window into font metrics
///
/// Shaping backends that do not bring their own font stack ask this trait
/// for glyphs, advances and line metrics.
pub trait FontResolver: Send + Sync {
    /// Vertical metrics for `style`, already scaled to its font size
    fn metrics(&self, style: &TextStyle) -> FontMetrics;

    /// Find the glyph that represents this character
    ///
    /// Returns None when no font for `style` covers the character.
    fn glyph_id(&self, ch: char, style: &TextStyle) -> Option<GlyphId>;

    /// How far to move after this glyph, already scaled to the font size
    fn advance(&self, glyph_id: GlyphId, style: &TextStyle) -> f32;

    /// Final size of an inline attachment
    fn attachment_size(&self, attachment: &Attachment) -> Size {
        attachment.size
    }
}
