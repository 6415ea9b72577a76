//! textlm core: styled text in, geometry out
//!
//! A UI layout pass asks three questions about a piece of rich text: how much
//! room does it need, what does it look like inside a frame, and which span sits
//! under the user's finger. This crate answers all three from one cached layout.
//!
//! ## The Flow
//!
//! Every request follows the same path:
//!
//! 1. **Input** - An [`AttributedString`] plus [`ParagraphAttributes`]
//! 2. **Shaping** - A [`ShapingBackend`] breaks the text into lines of positioned runs
//! 3. **Truncation** - Max lines and ellipsis get applied once, before caching
//! 4. **Use** - Measure it, draw it into a [`DrawingSurface`], or hit-test it
//!
//! ## Build Your First Manager
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use textlm_core::prelude::*;
//!
//! let manager = TextLayoutManager::builder()
//!     .backend(Arc::new(MyBackend))
//!     .cache_capacity(256)
//!     .build()?;
//!
//! let text = AttributedString::builder()
//!     .push("Hello, ", TextStyle::default())
//!     .push("world", TextStyle::default().bold())
//!     .build();
//!
//! let size = manager.measure(
//!     &text,
//!     &ParagraphAttributes::default(),
//!     &LayoutConstraints::loose(Size::new(200.0, f32::INFINITY)),
//! )?;
//! ```
//!
//! ## The Traits That Power Everything
//!
//! - [`ShapingBackend`] - Where text becomes lines of glyph runs
//! - [`DrawingSurface`] - Where glyph runs become paint
//! - [`AttachmentRenderer`] - Where inline objects get drawn
//! - [`traits::FontResolver`] - Where styles turn into metrics
//!
//! Layouts flow through the types in [`layout`]; geometry lives in [`types`].

pub mod attributed;
pub mod cache;
pub mod config;
pub mod constraints;
pub mod error;
pub mod layout;
pub mod manager;
pub mod traits;
pub mod truncation;

pub use attributed::{
    Attachment, AttributedString, AttributedStringBuilder, EventEmitterHandle, FontWeight,
    Fragment, TextDecoration, TextStyle, WritingDirection,
};
pub use cache::{CacheStats, LayoutCache, LayoutCacheKey};
pub use config::LayoutConfig;
pub use constraints::LayoutConstraints;
pub use error::{Result, ShapingError, TextLayoutError};
pub use hit_test::{HitTestResult, VerticalTieBreak};
pub use layout::{Glyph, GlyphRun, LayoutResult, Line, PositionedRun, RunKind, SourceRange};
pub use manager::{TextLayoutManager, TextLayoutManagerBuilder};
pub use traits::{AttachmentRenderer, DrawingSurface, FontResolver, ShapingBackend};

/// Everything a host needs for the usual measure/draw/hit-test calls
pub mod prelude {
    pub use crate::{
        types::{Point, Rect, Size},
        Attachment, AttributedString, Color, EventEmitterHandle, Fragment, LayoutConstraints,
        LayoutResult, ParagraphAttributes, TextAlignment, TextLayoutError, TextLayoutManager,
        TextStyle, TruncationMode,
    };
}

/// Geometry shared by constraints, frames, and layouts
///
/// One unit system throughout: whatever the host passes in constraints is what
/// comes back in sizes and what hit-testing expects in points.
pub mod types {
    /// Unique identifier for a glyph within a font
    pub type GlyphId = u32;

    /// A location in layout space
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct Point {
        pub x: f32,
        pub y: f32,
    }

    impl Point {
        pub const ZERO: Self = Self::new(0.0, 0.0);

        pub const fn new(x: f32, y: f32) -> Self {
            Self { x, y }
        }
    }

    /// A width and a height
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct Size {
        pub width: f32,
        pub height: f32,
    }

    impl Size {
        pub const ZERO: Self = Self::new(0.0, 0.0);
        pub const INFINITE: Self = Self::new(f32::INFINITY, f32::INFINITY);

        pub const fn new(width: f32, height: f32) -> Self {
            Self { width, height }
        }

        /// True when neither component is NaN and both are at least zero
        pub fn is_non_negative(&self) -> bool {
            self.width >= 0.0 && self.height >= 0.0
        }
    }

    /// An origin plus a size
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct Rect {
        pub origin: Point,
        pub size: Size,
    }

    impl Rect {
        pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
            Self {
                origin: Point::new(x, y),
                size: Size::new(width, height),
            }
        }

        pub const fn from_origin_size(origin: Point, size: Size) -> Self {
            Self { origin, size }
        }

        pub fn min_x(&self) -> f32 {
            self.origin.x
        }

        pub fn max_x(&self) -> f32 {
            self.origin.x + self.size.width
        }

        pub fn min_y(&self) -> f32 {
            self.origin.y
        }

        pub fn max_y(&self) -> f32 {
            self.origin.y + self.size.height
        }

        /// Edges are inclusive on both sides
        pub fn contains(&self, point: Point) -> bool {
            point.x >= self.min_x()
                && point.x <= self.max_x()
                && point.y >= self.min_y()
                && point.y <= self.max_y()
        }
    }

    /// Vertical font metrics for one style
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct FontMetrics {
        /// Distance from the baseline up to the top of the line box
        pub ascent: f32,
        /// Distance from the baseline down to the bottom of the line box
        pub descent: f32,
        /// Extra space the font asks for between lines
        pub leading: f32,
    }
}

/// How lines are chosen when text overflows `max_lines`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TruncationMode {
    /// Drop the overflowing lines, nothing else
    None,
    /// Drop the overflowing lines and cut the last one at the width bound
    Clip,
    /// Ellipsis at the start of the last visible line, which shows the end of the text
    Head,
    /// Ellipsis at the end of the last visible line
    #[default]
    Tail,
    /// Keep both ends, ellipsis in between
    Middle,
}

/// How eagerly lines may break
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineBreakStrategy {
    #[default]
    Normal,
    Strict,
    Loose,
    /// Break between any two characters
    Anywhere,
}

/// Where each line sits inside the available width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextAlignment {
    #[default]
    Start,
    Center,
    End,
}

/// Paragraph-level layout settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ParagraphAttributes {
    /// Maximum number of visible lines; zero means unlimited
    pub max_lines: u32,
    pub truncation: TruncationMode,
    pub line_break: LineBreakStrategy,
    pub alignment: TextAlignment,
}

impl ParagraphAttributes {
    /// Limit the paragraph to `max_lines` lines
    pub fn with_max_lines(mut self, max_lines: u32) -> Self {
        self.max_lines = max_lines;
        self
    }

    pub fn with_truncation(mut self, truncation: TruncationMode) -> Self {
        self.truncation = truncation;
        self
    }

    pub fn with_line_break(mut self, line_break: LineBreakStrategy) -> Self {
        self.line_break = line_break;
        self
    }

    pub fn with_alignment(mut self, alignment: TextAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Horizontal offset for a line of `line_width` inside `available` width
    ///
    /// Unbounded widths have nothing to align against, so they yield zero.
    pub fn alignment_offset(&self, line_width: f32, available: f32) -> f32 {
        if !available.is_finite() {
            return 0.0;
        }
        let slack = (available - line_width).max(0.0);
        match self.alignment {
            TextAlignment::Start => 0.0,
            TextAlignment::Center => slack / 2.0,
            TextAlignment::End => slack,
        }
    }
}

/// Simple RGBA color that works everywhere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::rgba(0, 0, 0, 255)
    }

    pub const fn white() -> Self {
        Self::rgba(255, 255, 255, 255)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}
