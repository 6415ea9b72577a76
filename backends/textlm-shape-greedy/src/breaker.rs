//! Line break opportunities from ICU4X (UAX #14)

use std::ops::Range;

use icu_segmenter::options::{LineBreakOptions, LineBreakStrictness};
use icu_segmenter::LineSegmenter;
use textlm_core::LineBreakStrategy;

/// Text between two break opportunities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub range: Range<usize>,
    /// The line has to end after this segment
    pub mandatory: bool,
}

/// Characters that force a line break after themselves (UAX #14 classes BK, CR, LF, NL)
pub fn is_hard_break(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}'
    )
}

fn strictness(strategy: LineBreakStrategy) -> LineBreakStrictness {
    match strategy {
        LineBreakStrategy::Normal => LineBreakStrictness::Normal,
        LineBreakStrategy::Strict => LineBreakStrictness::Strict,
        LineBreakStrategy::Loose => LineBreakStrictness::Loose,
        LineBreakStrategy::Anywhere => LineBreakStrictness::Anywhere,
    }
}

/// Split `text` at every break opportunity the strategy allows
///
/// Segments cover the whole text in order. `\r\n` stays in one segment.
pub fn segments(text: &str, strategy: LineBreakStrategy) -> Vec<Segment> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut options = LineBreakOptions::default();
    options.strictness = Some(strictness(strategy));
    let segmenter = LineSegmenter::new_auto(options);

    let mut out = Vec::new();
    let mut start = 0;
    for offset in segmenter.segment_str(text) {
        if offset <= start {
            continue;
        }
        out.push(segment(text, start..offset));
        start = offset;
    }
    if start < text.len() {
        out.push(segment(text, start..text.len()));
    }
    out
}

fn segment(text: &str, range: Range<usize>) -> Segment {
    let mandatory = text[range.clone()]
        .chars()
        .next_back()
        .is_some_and(is_hard_break);
    Segment { range, mandatory }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pieces(text: &str, strategy: LineBreakStrategy) -> Vec<&str> {
        segments(text, strategy)
            .into_iter()
            .map(|segment| &text[segment.range])
            .collect()
    }

    #[test]
    fn breaks_after_spaces() {
        assert_eq!(
            pieces("Hello big world", LineBreakStrategy::Normal),
            vec!["Hello ", "big ", "world"]
        );
    }

    #[test]
    fn newlines_are_mandatory() {
        let text = "one\r\ntwo\u{2028}three";
        let segments = segments(text, LineBreakStrategy::Normal);
        let flags: Vec<(&str, bool)> = segments
            .iter()
            .map(|s| (&text[s.range.clone()], s.mandatory))
            .collect();
        assert_eq!(
            flags,
            vec![("one\r\n", true), ("two\u{2028}", true), ("three", false)]
        );
    }

    #[test]
    fn control_separators_are_mandatory() {
        let text = "a\u{000B}b\u{000C}c\u{0085}d";
        let flags: Vec<(&str, bool)> = segments(text, LineBreakStrategy::Normal)
            .iter()
            .map(|s| (&text[s.range.clone()], s.mandatory))
            .collect();
        assert_eq!(
            flags,
            vec![
                ("a\u{000B}", true),
                ("b\u{000C}", true),
                ("c\u{0085}", true),
                ("d", false)
            ]
        );
    }

    #[test]
    fn anywhere_breaks_inside_words() {
        assert_eq!(
            pieces("abc", LineBreakStrategy::Anywhere),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn empty_text_has_no_segments() {
        assert!(segments("", LineBreakStrategy::Normal).is_empty());
    }
}
