//! textlm - Attributed text layout for UI pipelines
//!
//! textlm answers the three questions a UI layout pass asks of rich text:
//! 1. How big is it? ([`TextLayoutManager::measure`])
//! 2. What does it look like in this frame? ([`TextLayoutManager::draw`])
//! 3. Which span is under this point? ([`TextLayoutManager::hit_test`])
//!
//! All three share one cached layout, so they always agree with each other.
//!
//! # Features
//!
//! - **Pluggable shaping**: Bring your own [`ShapingBackend`] or use the greedy one
//! - **Single-flight cache**: Concurrent requests for the same layout shape once
//! - **Layout-time truncation**: Head, middle, tail, clip, or plain line limits
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use textlm::prelude::*;
//!
//! let manager = TextLayoutManager::builder()
//!     .backend(Arc::new(GreedyShaper::new(Arc::new(FixedMetrics::default()))))
//!     .build()?;
//!
//! let text = AttributedString::builder()
//!     .push("Read the ", TextStyle::default())
//!     .push("docs", TextStyle::default().underline())
//!     .build();
//! let size = manager.measure(&text, &ParagraphAttributes::default(), &LayoutConstraints::unbounded())?;
//! ```
//!
//! # Feature Flags
//!
//! - `shape-greedy`: [`GreedyShaper`](shape_greedy::GreedyShaper), UAX #14 breaks over fixed metrics
//! - `render-json`: [`RecordingSurface`](render_json::RecordingSurface), paint commands as JSON
//! - `full`: Everything above

pub use textlm_core::{
    attributed, cache, config, constraints, error, hit_test, layout, traits, truncation, types,
    Attachment, AttributedString, Color, EventEmitterHandle, Fragment, LayoutConfig,
    LayoutConstraints, LayoutResult, LineBreakStrategy, ParagraphAttributes, TextAlignment,
    TextLayoutManager, TextLayoutManagerBuilder, TextStyle, TruncationMode,
};
pub use textlm_core::traits::{AttachmentRenderer, DrawingSurface, ShapingBackend};

#[cfg(feature = "shape-greedy")]
pub use textlm_shape_greedy as shape_greedy;

#[cfg(feature = "render-json")]
pub use textlm_render_json as render_json;

/// Common imports for typical usage
pub mod prelude {
    pub use textlm_core::{
        error::{Result, ShapingError, TextLayoutError},
        hit_test::{HitTestResult, VerticalTieBreak},
        traits::{AttachmentRenderer, DrawingSurface, FontResolver, ShapingBackend},
        types::{Point, Rect, Size},
        Attachment, AttributedString, Color, EventEmitterHandle, Fragment, LayoutConfig,
        LayoutConstraints, LayoutResult, LineBreakStrategy, ParagraphAttributes, TextAlignment,
        TextLayoutManager, TextStyle, TruncationMode,
    };

    #[cfg(feature = "shape-greedy")]
    pub use textlm_shape_greedy::{FixedMetrics, GreedyShaper};

    #[cfg(feature = "render-json")]
    pub use textlm_render_json::{PaintCommand, PlaceholderAttachmentRenderer, RecordingSurface};
}

/// A manager on the greedy backend with fixed metrics and settings from the environment
#[cfg(feature = "shape-greedy")]
pub fn default_manager() -> error::Result<TextLayoutManager> {
    use std::sync::Arc;

    let shaper = shape_greedy::GreedyShaper::new(Arc::new(shape_greedy::FixedMetrics::default()));
    let config = LayoutConfig::from_env()?;
    log::debug!("Building default textlm manager: {config:?}");
    TextLayoutManager::builder()
        .backend(Arc::new(shaper))
        .config(config)
        .build()
}
