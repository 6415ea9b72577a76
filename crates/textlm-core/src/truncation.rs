//! Max lines and elision, applied once at layout time
//!
//! Backends lay out every line they can. This pass cuts the result down to
//! `max_lines` and rebuilds the last visible line according to the paragraph's
//! [`TruncationMode`]. Because it runs before a layout is cached, measuring and
//! drawing always see the same truncated lines.

// this_file: crates/textlm-core/src/truncation.rs

use std::ops::Range;

use crate::attributed::{AttributedString, TextStyle};
use crate::error::ShapingError;
use crate::layout::{Glyph, GlyphRun, LayoutResult, Line, PositionedRun, RunKind, SourceRange};
use crate::{ParagraphAttributes, TruncationMode};

/// Float slack when deciding whether glyphs still fit
const EPSILON: f32 = 1e-3;

/// Enforce `paragraph.max_lines` on a freshly shaped layout
///
/// `shape_ellipsis` shapes the indicator in the style of the fragment it sits
/// next to. Layouts that already fit come back untouched.
pub fn apply<F>(
    layout: LayoutResult,
    text: &AttributedString,
    paragraph: &ParagraphAttributes,
    max_width: f32,
    ellipsis: &str,
    shape_ellipsis: F,
) -> Result<LayoutResult, ShapingError>
where
    F: Fn(&str, &TextStyle) -> Result<GlyphRun, ShapingError>,
{
    let limit = paragraph.max_lines as usize;
    if limit == 0 || layout.lines.len() <= limit {
        return Ok(layout);
    }

    let fingerprint = layout.fingerprint;
    let spans = line_spans(&layout.lines, text.len());
    let mut lines = layout.lines;
    let hidden = lines.split_off(limit);
    log::debug!(
        "Truncating {} lines to {limit} ({:?})",
        limit + hidden.len(),
        paragraph.truncation
    );

    let elider = Elider {
        text,
        paragraph,
        max_width,
        ellipsis,
        shape_ellipsis: &shape_ellipsis,
    };

    if let (Some(last), Some(final_line)) = (lines.pop(), hidden.last()) {
        let last = Span {
            line: &last,
            bytes: spans[limit - 1].clone(),
        };
        let final_line = Span {
            line: final_line,
            bytes: spans[spans.len() - 1].clone(),
        };
        let rebuilt = match paragraph.truncation {
            TruncationMode::None => last.line.clone(),
            TruncationMode::Clip => elider.clip(last.line.clone()),
            TruncationMode::Tail => elider.tail(&last)?,
            TruncationMode::Head => elider.head(&last, &final_line)?,
            TruncationMode::Middle => elider.middle(&last, &final_line)?,
        };
        lines.push(rebuilt);
    }

    Ok(LayoutResult::new(lines, fingerprint).with_truncated(true))
}

/// Byte range owned by each line
///
/// Lines without runs (a lone hard break) own the gap between their
/// neighbours, so every span sits between the lines around it.
fn line_spans(lines: &[Line], text_len: usize) -> Vec<Range<usize>> {
    let ranges: Vec<Option<Range<usize>>> = lines.iter().map(Line::text_range).collect();

    let mut starts = Vec::with_capacity(ranges.len());
    let mut previous_end = 0;
    for range in &ranges {
        match range {
            Some(range) => {
                starts.push(range.start);
                previous_end = range.end;
            }
            None => starts.push(previous_end),
        }
    }

    let mut ends = vec![0; ranges.len()];
    let mut next_start = text_len;
    for (index, range) in ranges.iter().enumerate().rev() {
        match range {
            Some(range) => {
                ends[index] = range.end;
                next_start = range.start;
            }
            None => ends[index] = next_start,
        }
    }

    starts
        .into_iter()
        .zip(ends)
        .map(|(start, end)| start..end.max(start))
        .collect()
}

/// A line together with the bytes it owns
struct Span<'a> {
    line: &'a Line,
    bytes: Range<usize>,
}

/// One glyph together with what it came from
#[derive(Debug, Clone)]
struct Cell {
    fragment: usize,
    kind: RunKind,
    glyph: Glyph,
    text: Range<usize>,
}

/// Flatten a line into cells, left to right
fn cells(line: &Line) -> Vec<Cell> {
    let mut out = Vec::new();
    for run in &line.runs {
        if run.kind == RunKind::Ellipsis {
            continue;
        }
        let source = &run.source.text;
        let glyphs = run.glyphs.glyphs();
        if glyphs.is_empty() {
            if run.width > 0.0 {
                out.push(Cell {
                    fragment: run.source.fragment,
                    kind: run.kind,
                    glyph: Glyph {
                        id: 0,
                        x: 0.0,
                        y: 0.0,
                        advance: run.width,
                        cluster: source.start as u32,
                    },
                    text: source.clone(),
                });
            }
            continue;
        }

        for (index, glyph) in glyphs.iter().enumerate() {
            let start = (glyph.cluster as usize).max(source.start).min(source.end);
            let end = glyphs
                .get(index + 1)
                .map_or(source.end, |next| next.cluster as usize)
                .max(start)
                .min(source.end);
            out.push(Cell {
                fragment: run.source.fragment,
                kind: run.kind,
                glyph: glyph.clone(),
                text: start..end,
            });
        }
    }
    out
}

fn width_of(cells: &[Cell]) -> f32 {
    cells.iter().map(|cell| cell.glyph.advance).sum()
}

/// Longest prefix whose advances fit in `budget`
fn take_prefix(mut cells: Vec<Cell>, budget: f32) -> Vec<Cell> {
    let mut used = 0.0;
    let keep = cells
        .iter()
        .take_while(|cell| {
            used += cell.glyph.advance;
            used <= budget + EPSILON
        })
        .count();
    cells.truncate(keep);
    cells
}

/// Longest suffix whose advances fit in `budget`
fn take_suffix(mut cells: Vec<Cell>, budget: f32) -> Vec<Cell> {
    let mut used = 0.0;
    let keep = cells
        .iter()
        .rev()
        .take_while(|cell| {
            used += cell.glyph.advance;
            used <= budget + EPSILON
        })
        .count();
    cells.split_off(cells.len() - keep)
}

struct Elider<'a, F> {
    text: &'a AttributedString,
    paragraph: &'a ParagraphAttributes,
    max_width: f32,
    ellipsis: &'a str,
    shape_ellipsis: &'a F,
}

impl<F> Elider<'_, F>
where
    F: Fn(&str, &TextStyle) -> Result<GlyphRun, ShapingError>,
{
    fn is_blank(&self, cell: &Cell) -> bool {
        cell.kind == RunKind::Text
            && self
                .text
                .text()
                .get(cell.text.clone())
                .is_some_and(|s| !s.is_empty() && s.chars().all(char::is_whitespace))
    }

    fn trim_end(&self, cells: &mut Vec<Cell>) {
        while cells.last().is_some_and(|cell| self.is_blank(cell)) {
            cells.pop();
        }
    }

    fn trim_start(&self, cells: &mut Vec<Cell>) {
        let blank = cells.iter().take_while(|cell| self.is_blank(cell)).count();
        cells.drain(..blank);
    }

    /// Ellipsis glyphs in the style of `fragment`, empty when no indicator is configured
    fn indicator(&self, fragment: usize) -> Result<GlyphRun, ShapingError> {
        if self.ellipsis.is_empty() {
            return Ok(GlyphRun::default());
        }
        let fallback = TextStyle::default();
        let style = self
            .text
            .fragment(fragment)
            .map_or(&fallback, |fragment| &fragment.style);
        (self.shape_ellipsis)(self.ellipsis, style)
    }

    /// Width left for text once the indicator is placed
    fn budget(&self, indicator: &GlyphRun) -> f32 {
        if self.max_width.is_finite() {
            (self.max_width - indicator.advance()).max(0.0)
        } else {
            f32::INFINITY
        }
    }

    fn clip(&self, line: Line) -> Line {
        if !self.max_width.is_finite() || line.width <= self.max_width + EPSILON {
            return line;
        }
        let kept = take_prefix(cells(&line), self.max_width);
        let mut builder = RunBuilder::default();
        builder.extend(kept);
        self.finish(builder, &line, None)
    }

    fn tail(&self, last: &Span<'_>) -> Result<Line, ShapingError> {
        let all = cells(last.line);
        let anchor = all
            .last()
            .map_or_else(|| self.anchor(last, last.bytes.start), |c| c.fragment);
        let indicator = self.indicator(anchor)?;

        let mut prefix = take_prefix(all, self.budget(&indicator));
        self.trim_end(&mut prefix);
        let elided_start = prefix
            .last()
            .map_or(last.bytes.start, |cell| cell.text.end);

        let mut builder = RunBuilder::default();
        builder.extend(prefix);
        builder.push_ellipsis(anchor, elided_start..self.text.len(), &indicator);
        Ok(self.finish(builder, last.line, None))
    }

    fn head(&self, last: &Span<'_>, final_line: &Span<'_>) -> Result<Line, ShapingError> {
        let all = cells(final_line.line);
        let anchor = all.first().map_or_else(
            || self.anchor(final_line, final_line.bytes.start),
            |c| c.fragment,
        );
        let indicator = self.indicator(anchor)?;

        let mut suffix = take_suffix(all, self.budget(&indicator));
        self.trim_start(&mut suffix);
        let elided_end = suffix
            .first()
            .map_or(final_line.bytes.end, |cell| cell.text.start);

        let mut builder = RunBuilder::default();
        builder.push_ellipsis(anchor, last.bytes.start..elided_end, &indicator);
        builder.extend(suffix);
        Ok(self.finish(builder, last.line, Some(final_line.line)))
    }

    fn middle(&self, last: &Span<'_>, final_line: &Span<'_>) -> Result<Line, ShapingError> {
        let leading = cells(last.line);
        let anchor = leading
            .last()
            .map_or_else(|| self.anchor(last, last.bytes.start), |c| c.fragment);
        let indicator = self.indicator(anchor)?;
        let budget = self.budget(&indicator);

        let mut prefix = take_prefix(leading, budget / 2.0);
        self.trim_end(&mut prefix);
        let remaining = (budget - width_of(&prefix)).max(0.0);
        let mut suffix = take_suffix(cells(final_line.line), remaining);
        self.trim_start(&mut suffix);

        let elided_start = prefix
            .last()
            .map_or(last.bytes.start, |cell| cell.text.end);
        let elided_end = suffix
            .first()
            .map_or(final_line.bytes.end, |cell| cell.text.start);

        let mut builder = RunBuilder::default();
        builder.extend(prefix);
        builder.push_ellipsis(anchor, elided_start..elided_end, &indicator);
        builder.extend(suffix);
        Ok(self.finish(builder, last.line, Some(final_line.line)))
    }

    /// Fragment an indicator takes its style from when the line has no glyphs
    fn anchor(&self, span: &Span<'_>, boundary: usize) -> usize {
        span.line
            .runs
            .first()
            .map(|run| run.source.fragment)
            .or_else(|| self.text.fragment_index_at(boundary))
            .unwrap_or_else(|| self.text.fragments().len().saturating_sub(1))
    }

    /// Turn rebuilt runs into a line sitting where `template` was
    fn finish(&self, builder: RunBuilder, template: &Line, borrowed: Option<&Line>) -> Line {
        let (mut runs, width) = builder.finish();
        let (ascent, descent) = borrowed.map_or((template.ascent, template.descent), |other| {
            (
                template.ascent.max(other.ascent),
                template.descent.max(other.descent),
            )
        });

        let offset = self.paragraph.alignment_offset(width, self.max_width);
        for run in &mut runs {
            run.origin_x += offset;
        }

        Line {
            baseline_y: template.top() + ascent,
            ascent,
            descent,
            width,
            runs,
        }
    }
}

struct PendingRun {
    fragment: usize,
    kind: RunKind,
    text: Range<usize>,
    origin_x: f32,
    glyphs: Vec<Glyph>,
}

/// Regroups cells into runs laid out from x = 0
#[derive(Default)]
struct RunBuilder {
    runs: Vec<PositionedRun>,
    pending: Option<PendingRun>,
    x: f32,
}

impl RunBuilder {
    fn extend(&mut self, cells: Vec<Cell>) {
        for cell in cells {
            self.push(cell);
        }
    }

    fn push(&mut self, cell: Cell) {
        let continues = self
            .pending
            .as_ref()
            .is_some_and(|run| run.fragment == cell.fragment && run.kind == cell.kind);
        if !continues {
            self.flush();
            self.pending = Some(PendingRun {
                fragment: cell.fragment,
                kind: cell.kind,
                text: cell.text.clone(),
                origin_x: self.x,
                glyphs: Vec::new(),
            });
        }

        if let Some(run) = self.pending.as_mut() {
            run.text.start = run.text.start.min(cell.text.start);
            run.text.end = run.text.end.max(cell.text.end);
            let advance = cell.glyph.advance;
            run.glyphs.push(Glyph {
                x: self.x - run.origin_x,
                ..cell.glyph
            });
            self.x += advance;
        }
    }

    fn push_ellipsis(&mut self, fragment: usize, elided: Range<usize>, indicator: &GlyphRun) {
        self.flush();
        if indicator.is_empty() {
            return;
        }
        let elided = elided.start..elided.end.max(elided.start);
        let glyphs: Vec<Glyph> = indicator
            .glyphs()
            .iter()
            .map(|glyph| Glyph {
                cluster: elided.start as u32,
                ..glyph.clone()
            })
            .collect();
        let width = indicator.advance();
        self.runs.push(PositionedRun {
            source: SourceRange {
                fragment,
                text: elided,
            },
            origin_x: self.x,
            width,
            kind: RunKind::Ellipsis,
            glyphs: GlyphRun::new(glyphs),
        });
        self.x += width;
    }

    fn flush(&mut self) {
        if let Some(run) = self.pending.take() {
            self.runs.push(PositionedRun {
                source: SourceRange {
                    fragment: run.fragment,
                    text: run.text,
                },
                origin_x: run.origin_x,
                width: self.x - run.origin_x,
                kind: run.kind,
                glyphs: GlyphRun::new(run.glyphs),
            });
        }
    }

    fn finish(mut self) -> (Vec<PositionedRun>, f32) {
        self.flush();
        (self.runs, self.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TextAlignment;

    const ADVANCE: f32 = 10.0;

    fn style() -> TextStyle {
        TextStyle::default().with_size(10.0)
    }

    /// One run per line, one glyph per byte, ten units wide each
    fn shaped(text: &AttributedString, line_texts: &[Range<usize>]) -> LayoutResult {
        let lines = line_texts
            .iter()
            .enumerate()
            .map(|(index, range)| {
                let glyphs: Vec<Glyph> = range
                    .clone()
                    .enumerate()
                    .map(|(i, byte)| Glyph {
                        id: 1,
                        x: i as f32 * ADVANCE,
                        y: 0.0,
                        advance: ADVANCE,
                        cluster: byte as u32,
                    })
                    .collect();
                let width = glyphs.len() as f32 * ADVANCE;
                Line {
                    baseline_y: 8.0 + 10.0 * index as f32,
                    ascent: 8.0,
                    descent: 2.0,
                    width,
                    runs: vec![PositionedRun {
                        source: SourceRange {
                            fragment: text.fragment_index_at(range.start).unwrap_or(0),
                            text: range.clone(),
                        },
                        origin_x: 0.0,
                        width,
                        kind: RunKind::Text,
                        glyphs: GlyphRun::new(glyphs),
                    }],
                }
            })
            .collect();
        LayoutResult::new(lines, text.fingerprint())
    }

    fn dot(ellipsis: &str, _: &TextStyle) -> Result<GlyphRun, ShapingError> {
        Ok(GlyphRun::new(
            ellipsis
                .char_indices()
                .map(|(i, _)| Glyph {
                    id: 99,
                    x: i as f32 * ADVANCE,
                    y: 0.0,
                    advance: ADVANCE,
                    cluster: i as u32,
                })
                .collect(),
        ))
    }

    /// "aaaa bbbb cccc" broken after each word
    fn three_lines() -> (AttributedString, LayoutResult) {
        let text = AttributedString::plain("aaaa bbbb cccc", style());
        let layout = shaped(&text, &[0..5, 5..10, 10..14]);
        (text, layout)
    }

    fn visible(text: &AttributedString, line: &Line) -> String {
        line.runs
            .iter()
            .map(|run| match run.kind {
                RunKind::Ellipsis => "~".to_string(),
                _ => text.text()[run.source.text.clone()].to_string(),
            })
            .collect()
    }

    fn truncate(mode: TruncationMode, width: f32) -> (AttributedString, LayoutResult) {
        let (text, layout) = three_lines();
        let attrs = ParagraphAttributes::default()
            .with_max_lines(1)
            .with_truncation(mode);
        let out = apply(layout, &text, &attrs, width, "~", dot).unwrap();
        (text, out)
    }

    #[test]
    fn fitting_layouts_pass_through() {
        let (text, layout) = three_lines();
        let attrs = ParagraphAttributes::default().with_max_lines(3);
        let out = apply(layout.clone(), &text, &attrs, 50.0, "~", dot).unwrap();
        assert_eq!(out, layout);
        assert!(!out.truncated);
    }

    #[test]
    fn none_keeps_the_first_lines() {
        let (text, out) = truncate(TruncationMode::None, 50.0);
        assert_eq!(out.line_count(), 1);
        assert!(out.truncated);
        assert_eq!(visible(&text, &out.lines[0]), "aaaa ");
        assert_eq!(out.size.height, 10.0);
    }

    #[test]
    fn tail_replaces_the_end_of_the_last_line() {
        let (text, out) = truncate(TruncationMode::Tail, 50.0);
        let line = &out.lines[0];
        assert_eq!(visible(&text, line), "aaaa~");
        let ellipsis = &line.runs[1];
        assert_eq!(ellipsis.kind, RunKind::Ellipsis);
        assert_eq!(ellipsis.source.text, 4..14);
        assert_eq!(ellipsis.origin_x, 40.0);
        assert!(out.size.width <= 50.0);
        assert!(out.validate(&text).is_ok());
    }

    #[test]
    fn tail_gives_up_letters_to_make_room() {
        let (text, out) = truncate(TruncationMode::Tail, 30.0);
        assert_eq!(visible(&text, &out.lines[0]), "aa~");
        assert_eq!(out.lines[0].runs[1].source.text, 2..14);
    }

    #[test]
    fn head_shows_the_end_of_the_text() {
        let (text, out) = truncate(TruncationMode::Head, 50.0);
        let line = &out.lines[0];
        assert_eq!(visible(&text, line), "~cccc");
        assert_eq!(line.runs[0].kind, RunKind::Ellipsis);
        assert_eq!(line.runs[0].source.text, 0..10);
        assert_eq!(line.baseline_y, 8.0);
        assert!(out.validate(&text).is_ok());
    }

    #[test]
    fn middle_keeps_both_ends() {
        let (text, out) = truncate(TruncationMode::Middle, 50.0);
        let line = &out.lines[0];
        assert_eq!(visible(&text, line), "aa~cc");
        assert_eq!(line.runs[1].source.text, 2..12);
        assert!(out.validate(&text).is_ok());
    }

    #[test]
    fn clip_cuts_at_the_width() {
        let text = AttributedString::plain("abcdefgh ij", style());
        let layout = shaped(&text, &[0..9, 9..11]);
        let attrs = ParagraphAttributes::default()
            .with_max_lines(1)
            .with_truncation(TruncationMode::Clip);
        let out = apply(layout, &text, &attrs, 45.0, "~", dot).unwrap();
        assert_eq!(visible(&text, &out.lines[0]), "abcd");
        assert_eq!(out.size.width, 40.0);
    }

    #[test]
    fn empty_ellipsis_inserts_nothing() {
        let (text, layout) = three_lines();
        let attrs = ParagraphAttributes::default().with_max_lines(1);
        let out = apply(layout, &text, &attrs, 30.0, "", dot).unwrap();
        let line = &out.lines[0];
        assert!(line.runs.iter().all(|run| run.kind != RunKind::Ellipsis));
        assert_eq!(visible(&text, line), "aaa");
    }

    #[test]
    fn rebuilt_line_is_realigned() {
        let (text, layout) = three_lines();
        let attrs = ParagraphAttributes::default()
            .with_max_lines(1)
            .with_alignment(TextAlignment::End);
        let out = apply(layout, &text, &attrs, 100.0, "~", dot).unwrap();
        let line = &out.lines[0];
        assert_eq!(line.width, 50.0);
        assert_eq!(line.runs[0].origin_x, 50.0);
    }

    #[test]
    fn ellipsis_takes_the_neighbouring_fragment() {
        let text = AttributedString::builder()
            .push("aaaa ", style())
            .push("bbbb", style().bold())
            .build();
        let layout = shaped(&text, &[0..5, 5..9]);
        let attrs = ParagraphAttributes::default()
            .with_max_lines(1)
            .with_truncation(TruncationMode::Head);
        let out = apply(layout, &text, &attrs, 50.0, "~", dot).unwrap();
        assert_eq!(out.lines[0].runs[0].source.fragment, 1);
    }

    /// Empty the runs of line `index`, the way a backend lays out a lone hard break
    fn blank(mut layout: LayoutResult, index: usize) -> LayoutResult {
        layout.lines[index].runs.clear();
        layout.lines[index].width = 0.0;
        layout
    }

    fn ellipsis_run(line: &Line) -> &PositionedRun {
        line.runs
            .iter()
            .find(|run| run.kind == RunKind::Ellipsis)
            .unwrap()
    }

    fn blank_final_line() -> (AttributedString, LayoutResult) {
        let text = AttributedString::plain("aa\nbb\n\n", style());
        let layout = blank(shaped(&text, &[0..3, 3..6, 6..7]), 2);
        (text, layout)
    }

    #[test]
    fn head_over_a_blank_final_line_hides_everything_after_the_kept_lines() {
        let (text, layout) = blank_final_line();
        let attrs = ParagraphAttributes::default()
            .with_max_lines(2)
            .with_truncation(TruncationMode::Head);
        let out = apply(layout, &text, &attrs, 50.0, "~", dot).unwrap();

        let line = &out.lines[1];
        assert_eq!(visible(&text, line), "~");
        assert_eq!(ellipsis_run(line).source.text, 3..7);
        assert_eq!(ellipsis_run(line).source.fragment, 0);
        assert!(out.validate(&text).is_ok());
    }

    #[test]
    fn middle_over_a_blank_final_line_keeps_an_ordered_range() {
        let (text, layout) = blank_final_line();
        let attrs = ParagraphAttributes::default()
            .with_max_lines(2)
            .with_truncation(TruncationMode::Middle);
        let out = apply(layout, &text, &attrs, 50.0, "~", dot).unwrap();

        let line = &out.lines[1];
        assert_eq!(visible(&text, line), "bb~");
        assert_eq!(ellipsis_run(line).source.text, 5..7);
        assert!(out.validate(&text).is_ok());
    }

    #[test]
    fn tail_on_a_blank_last_line_spares_the_lines_above() {
        let text = AttributedString::builder()
            .push("a\n", style())
            .push("\n", style().with_size(20.0))
            .push("b\nc", style())
            .build();
        let layout = blank(shaped(&text, &[0..2, 2..3, 3..5, 5..6]), 1);
        let attrs = ParagraphAttributes::default()
            .with_max_lines(2)
            .with_truncation(TruncationMode::Tail);
        let out = apply(layout, &text, &attrs, 50.0, "~", dot).unwrap();

        assert_eq!(visible(&text, &out.lines[0]), "a\n");
        let ellipsis = ellipsis_run(&out.lines[1]);
        assert_eq!(ellipsis.source.text, 2..6);
        assert_eq!(ellipsis.source.fragment, 1);
        assert!(out.validate(&text).is_ok());
    }

    #[test]
    fn blank_lines_own_the_gap_between_their_neighbours() {
        let (text, layout) = blank_final_line();
        assert_eq!(line_spans(&layout.lines, text.len()), vec![0..3, 3..6, 6..7]);

        let text = AttributedString::plain("\n\nab", style());
        let layout = blank(blank(shaped(&text, &[0..1, 1..2, 2..4]), 0), 1);
        assert_eq!(line_spans(&layout.lines, text.len()), vec![0..2, 0..2, 2..4]);
    }

    #[test]
    fn shaping_errors_propagate() {
        let (text, layout) = three_lines();
        let attrs = ParagraphAttributes::default().with_max_lines(1);
        let out = apply(layout, &text, &attrs, 50.0, "~", |_, _| {
            Err(ShapingError::Backend("no glyphs".into()))
        });
        assert_eq!(out, Err(ShapingError::Backend("no glyphs".into())));
    }
}
