//! What shaping produces: lines of positioned runs
//!
//! A [`LayoutResult`] is built once and then only read. Measuring, drawing,
//! and hit-testing all work from the same value, which is why truncation is
//! baked in before a layout is ever handed out.

use std::ops::Range;
use std::sync::Arc;

use crate::attributed::AttributedString;
use crate::error::ShapingError;
use crate::types::{GlyphId, Size};

/// Slack allowed when checking run order; shapers accumulate float error
const OVERLAP_TOLERANCE: f32 = 1e-3;

/// A glyph that knows exactly where it belongs
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub id: GlyphId,
    /// Offset from the run origin
    pub x: f32,
    /// Offset from the baseline, positive down
    pub y: f32,
    pub advance: f32,
    /// Byte offset of the cluster in the full attributed string
    pub cluster: u32,
}

/// Shaping output for one run
///
/// Owned by the layout and never mutated; clones share the glyph storage.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GlyphRun {
    glyphs: Arc<[Glyph]>,
}

impl GlyphRun {
    pub fn new(glyphs: Vec<Glyph>) -> Self {
        Self {
            glyphs: glyphs.into(),
        }
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Sum of glyph advances
    pub fn advance(&self) -> f32 {
        self.glyphs.iter().map(|g| g.advance).sum()
    }
}

impl From<Vec<Glyph>> for GlyphRun {
    fn from(glyphs: Vec<Glyph>) -> Self {
        Self::new(glyphs)
    }
}

/// What a run stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunKind {
    Text,
    Attachment,
    /// Inserted by truncation; its source range is the hidden text
    Ellipsis,
}

/// Where a run's content came from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRange {
    /// Index into [`AttributedString::fragments`]
    pub fragment: usize,
    /// Byte range in the full string
    pub text: Range<usize>,
}

/// A glyph run placed on a line
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedRun {
    pub source: SourceRange,
    /// Left edge relative to the layout origin
    pub origin_x: f32,
    pub width: f32,
    pub kind: RunKind,
    pub glyphs: GlyphRun,
}

impl PositionedRun {
    pub fn end_x(&self) -> f32 {
        self.origin_x + self.width
    }
}

/// One laid-out line
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Baseline position relative to the layout origin, positive down
    pub baseline_y: f32,
    pub ascent: f32,
    pub descent: f32,
    /// Content width, trailing whitespace excluded
    pub width: f32,
    pub runs: Vec<PositionedRun>,
}

impl Line {
    pub fn top(&self) -> f32 {
        self.baseline_y - self.ascent
    }

    pub fn bottom(&self) -> f32 {
        self.baseline_y + self.descent
    }

    pub fn height(&self) -> f32 {
        self.ascent + self.descent
    }

    /// Byte range covered by the line's text runs
    pub fn text_range(&self) -> Option<Range<usize>> {
        let mut sources = self
            .runs
            .iter()
            .filter(|run| run.kind != RunKind::Ellipsis)
            .map(|run| &run.source.text);
        let first = sources.next()?;
        let (start, end) = sources.fold((first.start, first.end), |(start, end), range| {
            (start.min(range.start), end.max(range.end))
        });
        Some(start..end)
    }
}

/// Identifies the attributed string a layout was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceFingerprint {
    pub content_hash: u64,
    pub text_len: usize,
    pub fragment_count: usize,
}

/// A complete paragraph layout
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult {
    pub lines: Vec<Line>,
    /// Width of the widest line by the bottom of the last one
    pub size: Size,
    /// Whether `max_lines` hid part of the text
    pub truncated: bool,
    pub fingerprint: SourceFingerprint,
}

impl LayoutResult {
    /// Wrap lines, computing the overall size from them
    pub fn new(lines: Vec<Line>, fingerprint: SourceFingerprint) -> Self {
        let size = Self::measure_lines(&lines);
        Self {
            lines,
            size,
            truncated: false,
            fingerprint,
        }
    }

    pub fn with_truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }

    pub fn measure_lines(lines: &[Line]) -> Size {
        let width = lines.iter().map(|line| line.width).fold(0.0_f32, f32::max);
        let height = lines.iter().map(Line::bottom).fold(0.0_f32, f32::max);
        Size::new(width, height)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Check the structural guarantees everything downstream relies on
    ///
    /// Runs must stay inside their fragment, never overlap, and go left to
    /// right; lines must go top to bottom with sane metrics.
    pub fn validate(&self, text: &AttributedString) -> Result<(), ShapingError> {
        if self.fingerprint != text.fingerprint() {
            return Err(ShapingError::InvalidLayout(format!(
                "layout fingerprint {:?} does not match the text {:?}",
                self.fingerprint,
                text.fingerprint()
            )));
        }

        let mut previous_baseline = f32::NEG_INFINITY;
        for (line_index, line) in self.lines.iter().enumerate() {
            let metrics_ok = line.baseline_y.is_finite()
                && line.ascent.is_finite()
                && line.descent.is_finite()
                && line.ascent >= 0.0
                && line.descent >= 0.0;
            if !metrics_ok {
                return Err(ShapingError::InvalidLayout(format!(
                    "line {line_index} has bad metrics (baseline {}, ascent {}, descent {})",
                    line.baseline_y, line.ascent, line.descent
                )));
            }
            if line.baseline_y < previous_baseline {
                return Err(ShapingError::InvalidLayout(format!(
                    "line {line_index} sits above the line before it"
                )));
            }
            previous_baseline = line.baseline_y;

            let mut previous_end = f32::NEG_INFINITY;
            for (run_index, run) in line.runs.iter().enumerate() {
                if !(run.origin_x.is_finite() && run.width.is_finite() && run.width >= 0.0) {
                    return Err(ShapingError::InvalidLayout(format!(
                        "run {run_index} on line {line_index} has bad extent {}+{}",
                        run.origin_x, run.width
                    )));
                }
                if run.origin_x + OVERLAP_TOLERANCE < previous_end {
                    return Err(ShapingError::InvalidLayout(format!(
                        "run {run_index} on line {line_index} overlaps the run before it"
                    )));
                }
                previous_end = run.end_x();

                let fragment_range = text.fragment_range(run.source.fragment).ok_or_else(|| {
                    ShapingError::InvalidLayout(format!(
                        "run {run_index} on line {line_index} points at missing fragment {}",
                        run.source.fragment
                    ))
                })?;
                let source = &run.source.text;
                let contained = source.start <= source.end
                    && if run.kind == RunKind::Ellipsis {
                        source.end <= text.len()
                    } else {
                        fragment_range.start <= source.start && source.end <= fragment_range.end
                    };
                if !contained {
                    return Err(ShapingError::InvalidLayout(format!(
                        "run {run_index} on line {line_index} covers {source:?}, outside fragment {} at {fragment_range:?}",
                        run.source.fragment
                    )));
                }
            }
        }

        Ok(())
    }
}
