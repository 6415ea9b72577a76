//! Greedy shaper - one glyph per character, lines filled left to right
//!
//! No kerning, no ligatures, no bidi: each character maps to one glyph
//! through a [`FontResolver`], and lines are filled greedily at the break
//! opportunities ICU4X finds. That covers Latin UI labels and gives tests a
//! backend whose output is easy to predict.

pub mod breaker;
pub mod metrics;

use std::ops::Range;
use std::sync::Arc;

use textlm_core::{
    attributed::OBJECT_REPLACEMENT_CHARACTER,
    layout::SourceRange,
    traits::{FontResolver, ShapingBackend},
    types::{GlyphId, Size},
    AttributedString, Glyph, GlyphRun, LayoutResult, Line, ParagraphAttributes, PositionedRun,
    RunKind, ShapingError, TextStyle, WritingDirection,
};

pub use metrics::FixedMetrics;

/// Float slack when deciding whether a segment still fits
const EPSILON: f32 = 1e-3;

/// Shapes attributed text with a greedy line filler
pub struct GreedyShaper {
    resolver: Arc<dyn FontResolver>,
    notdef_fallback: bool,
}

impl GreedyShaper {
    pub fn new(resolver: Arc<dyn FontResolver>) -> Self {
        Self {
            resolver,
            notdef_fallback: true,
        }
    }

    /// Use glyph 0 for uncovered characters instead of failing
    pub fn with_notdef_fallback(mut self, enabled: bool) -> Self {
        self.notdef_fallback = enabled;
        self
    }

    fn glyph_for(&self, ch: char, offset: usize, style: &TextStyle) -> Result<GlyphId, ShapingError> {
        match self.resolver.glyph_id(ch, style) {
            Some(id) => Ok(id),
            None if self.notdef_fallback => {
                log::trace!("No glyph for {ch:?} at {offset}, using .notdef");
                Ok(0)
            }
            None => Err(ShapingError::MissingGlyph { ch, offset }),
        }
    }

    /// Turn every fragment into measured items
    fn itemize(&self, text: &AttributedString) -> Result<Vec<Item>, ShapingError> {
        let mut items = Vec::with_capacity(text.len());

        for (index, fragment) in text.fragments().iter().enumerate() {
            let Some(range) = text.fragment_range(index) else {
                continue;
            };
            if range.is_empty() {
                continue;
            }
            if fragment.style.direction == WritingDirection::RightToLeft {
                return Err(ShapingError::UnsupportedScript(format!(
                    "fragment {index} is right-to-left"
                )));
            }

            if let Some(attachment) = fragment.attachment {
                let size = self.resolver.attachment_size(&attachment);
                let glyph = self
                    .resolver
                    .glyph_id(OBJECT_REPLACEMENT_CHARACTER, &fragment.style)
                    .unwrap_or(0);
                items.push(Item {
                    fragment: index,
                    range,
                    kind: ItemKind::Attachment { glyph, size },
                    advance: size.width,
                });
                continue;
            }

            let style = &fragment.style;
            for (offset, ch) in fragment.text.char_indices() {
                let start = range.start + offset;
                let end = start + ch.len_utf8();
                if breaker::is_hard_break(ch) {
                    items.push(Item {
                        fragment: index,
                        range: start..end,
                        kind: ItemKind::Newline,
                        advance: 0.0,
                    });
                    continue;
                }

                let glyph = self.glyph_for(ch, start, style)?;
                items.push(Item {
                    fragment: index,
                    range: start..end,
                    kind: ItemKind::Glyph {
                        glyph,
                        whitespace: ch.is_whitespace(),
                    },
                    advance: self.resolver.advance(glyph, style) + style.letter_spacing,
                });
            }
        }

        Ok(items)
    }

    /// Vertical metrics one item asks of its line
    fn item_metrics(&self, text: &AttributedString, item: &Item) -> (f32, f32) {
        if let ItemKind::Attachment { size, .. } = item.kind {
            return (size.height, 0.0);
        }
        let Some(fragment) = text.fragment(item.fragment) else {
            return (0.0, 0.0);
        };
        let style = &fragment.style;
        let font = self.resolver.metrics(style);
        let natural = font.ascent + font.descent;
        let extra = match style.line_height {
            Some(line_height) => line_height - natural,
            None => font.leading,
        };
        (
            (font.ascent + extra / 2.0).max(0.0),
            (font.descent + extra / 2.0).max(0.0),
        )
    }

    fn build_line(
        &self,
        text: &AttributedString,
        items: &[Item],
        top: f32,
        paragraph: &ParagraphAttributes,
        max_width: f32,
    ) -> Line {
        let (ascent, descent) = items
            .iter()
            .map(|item| self.item_metrics(text, item))
            .fold((0.0_f32, 0.0_f32), |(a, d), (ia, id)| (a.max(ia), d.max(id)));

        let width = content_width(items);
        let offset = paragraph.alignment_offset(width, max_width);

        let mut runs = Vec::new();
        let mut x = offset;
        let mut start = 0;
        while start < items.len() {
            let first = &items[start];
            let end = if matches!(first.kind, ItemKind::Attachment { .. }) {
                start + 1
            } else {
                start
                    + items[start..]
                        .iter()
                        .take_while(|item| {
                            item.fragment == first.fragment
                                && !matches!(item.kind, ItemKind::Attachment { .. })
                        })
                        .count()
            };

            if let Some(run) = make_run(&items[start..end], x) {
                x = run.end_x();
                runs.push(run);
            }
            start = end;
        }

        Line {
            baseline_y: top + ascent,
            ascent,
            descent,
            width,
            runs,
        }
    }
}

impl ShapingBackend for GreedyShaper {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn shape(
        &self,
        text: &AttributedString,
        bounds: Size,
        paragraph: &ParagraphAttributes,
    ) -> Result<LayoutResult, ShapingError> {
        log::debug!(
            "GreedyShaper: shaping {} chars at width {}",
            text.text().chars().count(),
            bounds.width
        );

        let items = self.itemize(text)?;
        let segments = breaker::segments(text.text(), paragraph.line_break);
        let ranges = fill_lines(&items, &segments, bounds.width);

        let mut lines = Vec::with_capacity(ranges.len());
        let mut top = 0.0;
        for range in ranges {
            let line = self.build_line(text, &items[range], top, paragraph, bounds.width);
            top = line.bottom();
            lines.push(line);
        }

        Ok(LayoutResult::new(lines, text.fingerprint()))
    }

    fn shape_ellipsis(&self, ellipsis: &str, style: &TextStyle) -> Result<GlyphRun, ShapingError> {
        let mut glyphs = Vec::with_capacity(ellipsis.len());
        let mut x = 0.0;
        for (offset, ch) in ellipsis.char_indices() {
            let id = self.glyph_for(ch, offset, style)?;
            let advance = self.resolver.advance(id, style) + style.letter_spacing;
            glyphs.push(Glyph {
                id,
                x,
                y: 0.0,
                advance,
                cluster: offset as u32,
            });
            x += advance;
        }
        Ok(GlyphRun::new(glyphs))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ItemKind {
    Glyph { glyph: GlyphId, whitespace: bool },
    Attachment { glyph: GlyphId, size: Size },
    /// Hard break; part of the text range but never drawn
    Newline,
}

/// The smallest unit the filler moves around
#[derive(Debug, Clone, PartialEq)]
struct Item {
    fragment: usize,
    range: Range<usize>,
    kind: ItemKind,
    advance: f32,
}

impl Item {
    fn is_blank(&self) -> bool {
        matches!(
            self.kind,
            ItemKind::Newline | ItemKind::Glyph { whitespace: true, .. }
        )
    }
}

/// Width up to the end of the last visible item
fn content_width(items: &[Item]) -> f32 {
    let visible = items
        .iter()
        .rposition(|item| !item.is_blank())
        .map_or(0, |last| last + 1);
    items[..visible].iter().map(|item| item.advance).sum()
}

/// Greedily assign items to lines, returning item index ranges
fn fill_lines(items: &[Item], segments: &[breaker::Segment], max_width: f32) -> Vec<Range<usize>> {
    let limit = max_width + EPSILON;
    let mut lines = Vec::new();
    let mut line_start = 0;
    let mut width = 0.0_f32;
    let mut next = 0;

    for segment in segments {
        let first = next;
        while next < items.len() && items[next].range.start < segment.range.end {
            next += 1;
        }
        let segment_items = &items[first..next];
        if segment_items.is_empty() {
            continue;
        }

        let content = content_width(segment_items);
        if line_start < first && width + content > limit {
            lines.push(line_start..first);
            line_start = first;
            width = 0.0;
        }

        if line_start == first && content > limit {
            // Nothing else on the line and still too wide: split by character
            for (index, item) in (first..next).zip(segment_items) {
                if line_start < index && !item.is_blank() && width + item.advance > limit {
                    lines.push(line_start..index);
                    line_start = index;
                    width = 0.0;
                }
                width += item.advance;
            }
        } else {
            width += segment_items.iter().map(|item| item.advance).sum::<f32>();
        }

        if segment.mandatory {
            lines.push(line_start..next);
            line_start = next;
            width = 0.0;
        }
    }

    if line_start < items.len() {
        lines.push(line_start..items.len());
    }
    lines
}

/// One positioned run over items from a single fragment
///
/// Runs that would only hold hard breaks are dropped.
fn make_run(items: &[Item], origin_x: f32) -> Option<PositionedRun> {
    let first = items.first()?;
    if items.iter().all(|item| item.kind == ItemKind::Newline) {
        return None;
    }

    let mut glyphs = Vec::with_capacity(items.len());
    let mut x = 0.0;
    for item in items {
        let id = match item.kind {
            ItemKind::Glyph { glyph, .. } | ItemKind::Attachment { glyph, .. } => glyph,
            ItemKind::Newline => continue,
        };
        glyphs.push(Glyph {
            id,
            x,
            y: 0.0,
            advance: item.advance,
            cluster: item.range.start as u32,
        });
        x += item.advance;
    }

    let start = first.range.start;
    let end = items.last().map_or(start, |item| item.range.end);
    let kind = match first.kind {
        ItemKind::Attachment { .. } => RunKind::Attachment,
        _ => RunKind::Text,
    };

    Some(PositionedRun {
        source: SourceRange {
            fragment: first.fragment,
            text: start..end,
        },
        origin_x,
        width: x,
        kind,
        glyphs: GlyphRun::new(glyphs),
    })
}
