//! The engine that answers measure, draw and hit-test from one layout

// this_file: crates/textlm-core/src/manager.rs

use std::sync::Arc;

use crate::{
    attributed::{AttributedString, EventEmitterHandle, TextStyle},
    cache::{CacheStats, LayoutCache, LayoutCacheKey},
    config::LayoutConfig,
    constraints::LayoutConstraints,
    error::{Result, ShapingError, TextLayoutError},
    hit_test::{self, HitTestResult, VerticalTieBreak},
    layout::{LayoutResult, Line, PositionedRun, RunKind},
    traits::{AttachmentRenderer, DrawingSurface, ShapingBackend},
    truncation,
    types::{Point, Rect, Size},
    ParagraphAttributes,
};

/// Lays out attributed text and answers questions about it
///
/// The manager is shared across threads. Its only mutable state is the layout
/// cache, which takes care of its own locking.
///
/// ```ignore
/// use textlm_core::TextLayoutManager;
///
/// let manager = TextLayoutManager::builder()
///     .backend(Arc::new(GreedyShaper::new(Arc::new(FixedMetrics::default()))))
///     .attachment_renderer(Arc::new(MyRenderer))
///     .build()?;
///
/// let size = manager.measure(&text, &attrs, &LayoutConstraints::loose(bounds))?;
/// manager.draw(&text, &attrs, Rect::from_origin_size(origin, size), &mut surface)?;
/// let handle = manager.hit_test(&text, &attrs, frame, tap)?;
/// ```
pub struct TextLayoutManager {
    backend: Arc<dyn ShapingBackend>,
    attachment_renderer: Option<Arc<dyn AttachmentRenderer>>,
    cache: Option<Arc<LayoutCache>>,
    config: LayoutConfig,
}

impl TextLayoutManager {
    /// Start building a new manager
    pub fn builder() -> TextLayoutManagerBuilder {
        TextLayoutManagerBuilder::new()
    }

    /// A manager with default configuration around `backend`
    pub fn new(backend: Arc<dyn ShapingBackend>) -> Result<Self> {
        Self::builder().backend(backend).build()
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// How much room does this text need?
    ///
    /// The layout is resolved against `constraints.max` and its size is then
    /// clamped into the constraints.
    pub fn measure(
        &self,
        text: &AttributedString,
        paragraph: &ParagraphAttributes,
        constraints: &LayoutConstraints,
    ) -> Result<Size> {
        constraints.validate()?;
        let layout = self.layout(text, paragraph, constraints.max)?;
        Ok(constraints.clamp(layout.size))
    }

    /// Paint the text into `frame` on `surface`
    ///
    /// Nothing but the surface is touched.
    pub fn draw(
        &self,
        text: &AttributedString,
        paragraph: &ParagraphAttributes,
        frame: Rect,
        surface: &mut dyn DrawingSurface,
    ) -> Result<()> {
        validate_frame(frame)?;
        let layout = self.layout(text, paragraph, frame.size)?;

        for line in &layout.lines {
            for run in &line.runs {
                self.draw_run(text, line, run, frame.origin, surface)?;
            }
        }
        Ok(())
    }

    /// Which interaction target sits under `point`?
    ///
    /// Points outside the text clamp to the nearest run. `None` means the
    /// span there has no handler, or there was nothing laid out to hit.
    pub fn hit_test(
        &self,
        text: &AttributedString,
        paragraph: &ParagraphAttributes,
        frame: Rect,
        point: Point,
    ) -> Result<Option<EventEmitterHandle>> {
        let hit = self.hit_test_detailed(text, paragraph, frame, point)?;
        Ok(hit.and_then(|hit| {
            text.fragment(hit.fragment)
                .and_then(|fragment| fragment.event_emitter.clone())
        }))
    }

    /// Full hit-test answer: line, run, fragment and source range
    pub fn hit_test_detailed(
        &self,
        text: &AttributedString,
        paragraph: &ParagraphAttributes,
        frame: Rect,
        point: Point,
    ) -> Result<Option<HitTestResult>> {
        validate_frame(frame)?;
        let layout = self.layout(text, paragraph, frame.size)?;
        let local = Point::new(point.x - frame.origin.x, point.y - frame.origin.y);

        let Some(hit) = hit_test::locate(&layout, local, self.config.vertical_tie_break) else {
            log::trace!("Hit test at {local:?} found no runs");
            return Ok(None);
        };
        let run = &layout.lines[hit.line].runs[hit.run];
        let fragment = resolve_fragment(text, run)?;

        Ok(Some(HitTestResult {
            line: hit.line,
            run: hit.run,
            fragment,
            text_range: run.source.text.clone(),
            kind: run.kind,
            inside: hit.inside,
        }))
    }

    /// The shared layout for this input, from cache or freshly shaped
    ///
    /// `bounds` may have infinite components; negative or NaN components are
    /// rejected.
    pub fn layout(
        &self,
        text: &AttributedString,
        paragraph: &ParagraphAttributes,
        bounds: Size,
    ) -> Result<Arc<LayoutResult>> {
        if !bounds.is_non_negative() {
            return Err(TextLayoutError::InvalidConstraints(format!(
                "layout bounds must be non-negative, got {}x{}",
                bounds.width, bounds.height
            )));
        }

        let layout = match &self.cache {
            Some(cache) => {
                let key = LayoutCacheKey::new(self.backend.name(), text, paragraph, bounds);
                cache.get_or_shape(&key, || self.shape(text, paragraph, bounds))?
            }
            None => Arc::new(self.shape(text, paragraph, bounds)?),
        };

        if layout.fingerprint != text.fingerprint() {
            log::error!(
                "Layout for {:016x} carries fingerprint {:?}",
                text.content_hash(),
                layout.fingerprint
            );
            return Err(TextLayoutError::CacheCorruption(format!(
                "layout fingerprint {:?} does not match the requested text {:?}",
                layout.fingerprint,
                text.fingerprint()
            )));
        }

        Ok(layout)
    }

    /// Cache counters, when caching is on
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    /// Drop cached layouts and whatever the backend keeps
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
        self.backend.clear_cache();
    }

    fn shape(
        &self,
        text: &AttributedString,
        paragraph: &ParagraphAttributes,
        bounds: Size,
    ) -> std::result::Result<LayoutResult, ShapingError> {
        log::debug!(
            "Shaping {} bytes in {} fragments with {} at {}x{}",
            text.len(),
            text.fragments().len(),
            self.backend.name(),
            bounds.width,
            bounds.height
        );

        let layout = self.backend.shape(text, bounds, paragraph)?;
        if self.config.validate_layouts {
            if let Err(err) = layout.validate(text) {
                log::warn!("{} produced an invalid layout: {err}", self.backend.name());
                return Err(err);
            }
        }

        truncation::apply(
            layout,
            text,
            paragraph,
            bounds.width,
            &self.config.ellipsis,
            |ellipsis, style| self.backend.shape_ellipsis(ellipsis, style),
        )
    }

    fn draw_run(
        &self,
        text: &AttributedString,
        line: &Line,
        run: &PositionedRun,
        origin: Point,
        surface: &mut dyn DrawingSurface,
    ) -> Result<()> {
        let fragment = text.fragment(run.source.fragment).ok_or_else(|| {
            TextLayoutError::CacheCorruption(format!(
                "run points at fragment {} of {}",
                run.source.fragment,
                text.fragments().len()
            ))
        })?;
        let style = &fragment.style;
        let baseline = Point::new(origin.x + run.origin_x, origin.y + line.baseline_y);

        if let Some(background) = style.background {
            surface.fill_rect(
                Rect::new(baseline.x, baseline.y - line.ascent, run.width, line.height()),
                background,
            );
        }

        match (run.kind, fragment.attachment) {
            (RunKind::Attachment, Some(attachment)) => match &self.attachment_renderer {
                Some(renderer) => {
                    let height = attachment.size.height;
                    let frame = Rect::new(baseline.x, baseline.y - height, run.width, height);
                    renderer.render_attachment(&attachment, frame, surface);
                }
                None => log::trace!("No attachment renderer, skipping attachment {}", attachment.id),
            },
            _ => {
                surface.draw_glyph_run(run, baseline, style);
                draw_decorations(line, run, baseline, style, surface);
            }
        }
        Ok(())
    }
}

fn draw_decorations(
    line: &Line,
    run: &PositionedRun,
    baseline: Point,
    style: &TextStyle,
    surface: &mut dyn DrawingSurface,
) {
    let decoration = style.decoration;
    if decoration.is_none() || run.width <= 0.0 {
        return;
    }
    let thickness = (style.font_size * 0.066).max(1.0);
    let color = decoration.color.unwrap_or(style.color);

    if decoration.underline {
        let y = baseline.y + (line.descent / 2.0).min(thickness * 2.0);
        surface.fill_rect(Rect::new(baseline.x, y, run.width, thickness), color);
    }
    if decoration.strikethrough {
        let y = baseline.y - line.ascent * 0.3 - thickness / 2.0;
        surface.fill_rect(Rect::new(baseline.x, y, run.width, thickness), color);
    }
}

fn validate_frame(frame: Rect) -> Result<()> {
    let origin_ok = frame.origin.x.is_finite() && frame.origin.y.is_finite();
    let size_ok = frame.size.width.is_finite()
        && frame.size.height.is_finite()
        && frame.size.is_non_negative();
    if origin_ok && size_ok {
        Ok(())
    } else {
        Err(TextLayoutError::InvalidConstraints(format!(
            "frame must be finite with a non-negative size, got {frame:?}"
        )))
    }
}

/// Map a run back to its fragment, cross-checking the layout against the text
fn resolve_fragment(text: &AttributedString, run: &PositionedRun) -> Result<usize> {
    let claimed = run.source.fragment;
    if text.fragment(claimed).is_none() {
        return Err(TextLayoutError::CacheCorruption(format!(
            "run points at fragment {claimed} of {}",
            text.fragments().len()
        )));
    }
    if run.kind == RunKind::Ellipsis || run.source.text.is_empty() {
        return Ok(claimed);
    }

    match text.fragment_index_at(run.source.text.start) {
        Some(found) if found == claimed => Ok(found),
        found => {
            log::error!(
                "Run over {:?} claims fragment {claimed} but the text says {found:?}",
                run.source.text
            );
            Err(TextLayoutError::CacheCorruption(format!(
                "run over {:?} claims fragment {claimed}, text maps it to {found:?}",
                run.source.text
            )))
        }
    }
}

/// Compose a manager from a backend and optional collaborators
///
/// ```ignore
/// let manager = TextLayoutManager::builder()
///     .backend(shaper)
///     .config(LayoutConfig::from_env()?)
///     .ellipsis("...")
///     .build()?;
/// ```
pub struct TextLayoutManagerBuilder {
    backend: Option<Arc<dyn ShapingBackend>>,
    attachment_renderer: Option<Arc<dyn AttachmentRenderer>>,
    shared_cache: Option<Arc<LayoutCache>>,
    config: LayoutConfig,
}

impl TextLayoutManagerBuilder {
    pub fn new() -> Self {
        Self {
            backend: None,
            attachment_renderer: None,
            shared_cache: None,
            config: LayoutConfig::default(),
        }
    }

    /// Choose who turns text into lines
    pub fn backend(mut self, backend: Arc<dyn ShapingBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Choose who draws inline attachments
    pub fn attachment_renderer(mut self, renderer: Arc<dyn AttachmentRenderer>) -> Self {
        self.attachment_renderer = Some(renderer);
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: LayoutConfig) -> Self {
        self.config = config;
        self
    }

    pub fn enable_cache(mut self, enabled: bool) -> Self {
        self.config.cache_enabled = enabled;
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// Share one cache between several managers
    pub fn with_cache(mut self, cache: Arc<LayoutCache>) -> Self {
        self.config.cache_enabled = true;
        self.shared_cache = Some(cache);
        self
    }

    /// Indicator inserted by truncation; empty means none
    pub fn ellipsis(mut self, ellipsis: impl Into<String>) -> Self {
        self.config.ellipsis = ellipsis.into();
        self
    }

    pub fn vertical_tie_break(mut self, tie_break: VerticalTieBreak) -> Self {
        self.config.vertical_tie_break = tie_break;
        self
    }

    pub fn validate_layouts(mut self, validate: bool) -> Self {
        self.config.validate_layouts = validate;
        self
    }

    pub fn build(self) -> Result<TextLayoutManager> {
        let backend = self
            .backend
            .ok_or_else(|| TextLayoutError::Config("No shaping backend configured".into()))?;

        let cache = if self.config.cache_enabled {
            Some(
                self.shared_cache
                    .unwrap_or_else(|| Arc::new(LayoutCache::new(self.config.cache_capacity))),
            )
        } else {
            None
        };

        log::debug!(
            "Built text layout manager on {} (cache: {})",
            backend.name(),
            cache
                .as_ref()
                .map_or_else(|| "off".to_string(), |c| c.capacity().to_string())
        );

        Ok(TextLayoutManager {
            backend,
            attachment_renderer: self.attachment_renderer,
            cache,
            config: self.config,
        })
    }
}

impl Default for TextLayoutManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
