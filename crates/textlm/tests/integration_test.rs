//! End-to-end tests: greedy shaping, cached layouts, recorded drawing

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use textlm::layout::GlyphRun;
use textlm::prelude::*;
use textlm::render_json::PaintCommand;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 10px text: 5px per character, 10px per line
fn style() -> TextStyle {
    TextStyle::default().with_size(10.0)
}

fn shaper() -> GreedyShaper {
    GreedyShaper::new(Arc::new(FixedMetrics::default()))
}

fn manager() -> TextLayoutManager {
    TextLayoutManager::new(Arc::new(shaper())).unwrap()
}

/// Wraps the greedy shaper and counts how often it runs
struct Counting {
    inner: GreedyShaper,
    calls: AtomicUsize,
}

impl Counting {
    fn new() -> Self {
        Self {
            inner: shaper(),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ShapingBackend for Counting {
    fn name(&self) -> &'static str {
        "counting-greedy"
    }

    fn shape(
        &self,
        text: &AttributedString,
        bounds: Size,
        paragraph: &ParagraphAttributes,
    ) -> std::result::Result<LayoutResult, ShapingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(std::time::Duration::from_millis(20));
        self.inner.shape(text, bounds, paragraph)
    }

    fn shape_ellipsis(
        &self,
        ellipsis: &str,
        style: &TextStyle,
    ) -> std::result::Result<GlyphRun, ShapingError> {
        self.inner.shape_ellipsis(ellipsis, style)
    }
}

/// Kinds of the glyph runs drawn, in paint order
fn glyph_kinds(commands: &[PaintCommand]) -> Vec<String> {
    commands
        .iter()
        .filter_map(|command| match command {
            PaintCommand::Glyphs { kind, .. } => Some(kind.clone()),
            PaintCommand::FillRect { .. } => None,
        })
        .collect()
}

#[test]
fn measure_stays_within_constraints() {
    let manager = manager();
    let text = AttributedString::plain("The quick brown fox jumps over the lazy dog", style());
    let attrs = ParagraphAttributes::default();

    let loose = LayoutConstraints::loose(Size::new(100.0, 1000.0));
    let size = manager.measure(&text, &attrs, &loose).unwrap();
    assert!(size.width <= 100.0);
    assert_eq!(size.height, 30.0);

    let constraints = LayoutConstraints::new(Size::new(120.0, 5.0), Size::new(200.0, 8.0)).unwrap();
    let clamped = manager.measure(&text, &attrs, &constraints).unwrap();
    assert!(clamped.width >= 120.0 && clamped.width <= 200.0);
    assert_eq!(clamped.height, 8.0);
}

#[test]
fn malformed_constraints_fail_fast() {
    let manager = manager();
    let text = AttributedString::plain("abc", style());
    let bad = LayoutConstraints {
        min: Size::new(50.0, 0.0),
        max: Size::new(10.0, 10.0),
    };
    let result = manager.measure(&text, &ParagraphAttributes::default(), &bad);
    assert!(matches!(result, Err(TextLayoutError::InvalidConstraints(_))));
}

#[test]
fn measuring_twice_is_idempotent_and_cached() {
    let backend = Arc::new(Counting::new());
    let manager = TextLayoutManager::new(backend.clone()).unwrap();
    let text = AttributedString::plain("Hello world", style());
    let attrs = ParagraphAttributes::default();
    let constraints = LayoutConstraints::loose(Size::new(40.0, 100.0));

    let first = manager.measure(&text, &attrs, &constraints).unwrap();
    let second = manager.measure(&text, &attrs, &constraints).unwrap();

    assert_eq!(first, second);
    assert_eq!(backend.calls(), 1);
    let stats = manager.cache_stats().unwrap();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[test]
fn hit_test_finds_the_fragment_under_the_point() {
    let manager = manager();
    let hello = Arc::new("hello-link");
    let world = Arc::new("world-link");
    let text = AttributedString::new(vec![
        Fragment::new("Hello ", style()).with_event_emitter(EventEmitterHandle::new(&hello)),
        Fragment::new("world", style()).with_event_emitter(EventEmitterHandle::new(&world)),
        Fragment::new(" plain", style()),
    ]);
    let attrs = ParagraphAttributes::default();
    let frame = Rect::new(10.0, 20.0, 200.0, 50.0);

    // "world" spans x = 30..55 inside the frame
    let hit = manager
        .hit_test(&text, &attrs, frame, Point::new(10.0 + 40.0, 25.0))
        .unwrap()
        .unwrap();
    assert_eq!(
        hit.downcast::<&str>().map(|target| *target),
        Some("world-link")
    );

    let detailed = manager
        .hit_test_detailed(&text, &attrs, frame, Point::new(10.0 + 40.0, 25.0))
        .unwrap()
        .unwrap();
    assert_eq!(detailed.fragment, 1);
    assert_eq!(detailed.text_range, 6..11);
    assert!(detailed.inside);

    // A span without a handler
    let plain = manager
        .hit_test(&text, &attrs, frame, Point::new(10.0 + 70.0, 25.0))
        .unwrap();
    assert!(plain.is_none());
}

#[test]
fn points_outside_the_frame_clamp_to_the_nearest_run() {
    let manager = manager();
    let first = Arc::new(1_u8);
    let last = Arc::new(2_u8);
    let text = AttributedString::new(vec![
        Fragment::new("first ", style()).with_event_emitter(EventEmitterHandle::new(&first)),
        Fragment::new("last", style()).with_event_emitter(EventEmitterHandle::new(&last)),
    ]);
    let attrs = ParagraphAttributes::default();
    let frame = Rect::new(0.0, 0.0, 100.0, 100.0);

    let above = manager
        .hit_test(&text, &attrs, frame, Point::new(-500.0, -500.0))
        .unwrap()
        .unwrap();
    assert!(above.ptr_eq(&EventEmitterHandle::new(&first)));

    let below = manager
        .hit_test(&text, &attrs, frame, Point::new(500.0, 500.0))
        .unwrap()
        .unwrap();
    assert!(below.ptr_eq(&EventEmitterHandle::new(&last)));

    let detailed = manager
        .hit_test_detailed(&text, &attrs, frame, Point::new(500.0, 500.0))
        .unwrap()
        .unwrap();
    assert!(!detailed.inside);
}

#[test]
fn empty_text_hits_nothing() {
    let manager = manager();
    let text = AttributedString::plain("", style());
    let hit = manager
        .hit_test(
            &text,
            &ParagraphAttributes::default(),
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Point::new(1.0, 1.0),
        )
        .unwrap();
    assert!(hit.is_none());
}

/// Three lines at width 30: "aaaa ", "bbbb ", "cccc"
fn three_lines() -> AttributedString {
    AttributedString::plain("aaaa bbbb cccc", style())
}

#[test]
fn max_lines_one_measures_one_line() {
    let manager = manager();
    let text = three_lines();
    let bounds = LayoutConstraints::loose(Size::new(30.0, 1000.0));

    let full = manager
        .measure(&text, &ParagraphAttributes::default(), &bounds)
        .unwrap();
    assert_eq!(full.height, 30.0);

    let attrs = ParagraphAttributes::default().with_max_lines(1);
    let truncated = manager.measure(&text, &attrs, &bounds).unwrap();
    assert_eq!(truncated.height, 10.0);
    assert!(truncated.width <= 30.0);

    let layout = manager.layout(&text, &attrs, bounds.max).unwrap();
    assert!(layout.truncated);
    assert_eq!(layout.line_count(), 1);
}

#[test]
fn draw_places_the_ellipsis_where_the_mode_says() {
    let manager = manager();
    let text = three_lines();
    let frame = Rect::new(0.0, 0.0, 30.0, 1000.0);

    let cases = [
        (TruncationMode::Tail, vec!["text", "ellipsis"]),
        (TruncationMode::Head, vec!["ellipsis", "text"]),
        (TruncationMode::Middle, vec!["text", "ellipsis", "text"]),
    ];
    for (mode, expected) in cases {
        let attrs = ParagraphAttributes::default()
            .with_max_lines(1)
            .with_truncation(mode);
        let mut surface = RecordingSurface::new();
        manager.draw(&text, &attrs, frame, &mut surface).unwrap();

        assert_eq!(glyph_kinds(surface.commands()), expected, "mode {mode:?}");
    }
}

#[test]
fn tail_ellipsis_replaces_the_hidden_text() {
    let manager = manager();
    let text = three_lines();
    let attrs = ParagraphAttributes::default().with_max_lines(1);
    let layout = manager.layout(&text, &attrs, Size::new(30.0, 1000.0)).unwrap();

    let line = &layout.lines[0];
    let ellipsis = line.runs.last().unwrap();
    assert_eq!(ellipsis.source.text, 4..text.len());
    assert_eq!(ellipsis.origin_x, 20.0);
    assert_eq!(line.width, 25.0);
}

#[test]
fn truncation_modes_without_ellipsis() {
    let manager = manager();
    let text = three_lines();
    let frame = Rect::new(0.0, 0.0, 30.0, 1000.0);

    for mode in [TruncationMode::None, TruncationMode::Clip] {
        let attrs = ParagraphAttributes::default()
            .with_max_lines(2)
            .with_truncation(mode);
        let mut surface = RecordingSurface::new();
        manager.draw(&text, &attrs, frame, &mut surface).unwrap();
        assert_eq!(glyph_kinds(surface.commands()), vec!["text", "text"]);
    }
}

#[test]
fn draw_translates_runs_into_the_frame() {
    let manager = manager();
    let text = AttributedString::builder()
        .push("ab", style().with_background(Color::white()))
        .push("cd", style().underline())
        .build();
    let mut surface = RecordingSurface::new();
    manager
        .draw(
            &text,
            &ParagraphAttributes::default(),
            Rect::new(100.0, 50.0, 200.0, 20.0),
            &mut surface,
        )
        .unwrap();

    let commands = surface.commands();
    assert_eq!(commands.len(), 4);
    match &commands[0] {
        PaintCommand::FillRect { frame, color } => {
            assert_eq!((frame.x, frame.y, frame.width, frame.height), (100.0, 50.0, 10.0, 10.0));
            assert_eq!(color, "#ffffffff");
        }
        other => panic!("expected background, got {other:?}"),
    }
    match &commands[2] {
        PaintCommand::Glyphs { x, y, fragment, .. } => {
            assert_eq!((*x, *y, *fragment), (110.0, 58.0, 1));
        }
        other => panic!("expected glyphs, got {other:?}"),
    }
    assert!(matches!(&commands[3], PaintCommand::FillRect { frame, .. } if frame.y > 58.0));
}

#[test]
fn attachments_go_to_the_renderer() {
    let renderer = Arc::new(PlaceholderAttachmentRenderer::default());
    let manager = TextLayoutManager::builder()
        .backend(Arc::new(shaper()))
        .attachment_renderer(renderer.clone())
        .build()
        .unwrap();
    let text = AttributedString::builder()
        .push("ab", style())
        .attachment(Attachment::new(7, Size::new(12.0, 14.0)), style())
        .build();

    let mut surface = RecordingSurface::new();
    manager
        .draw(
            &text,
            &ParagraphAttributes::default(),
            Rect::new(0.0, 0.0, 100.0, 100.0),
            &mut surface,
        )
        .unwrap();

    // Baseline sits at the attachment height
    assert_eq!(renderer.rendered(), vec![(7, Rect::new(10.0, 0.0, 12.0, 14.0))]);
    assert_eq!(glyph_kinds(surface.commands()), vec!["text"]);
}

#[test]
fn concurrent_draws_shape_once() {
    init_logging();
    const THREADS: usize = 6;

    let backend = Arc::new(Counting::new());
    let manager = Arc::new(TextLayoutManager::new(backend.clone()).unwrap());
    let barrier = Arc::new(Barrier::new(THREADS));
    let text = AttributedString::plain("shared label", style());

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let barrier = Arc::clone(&barrier);
            let text = text.clone();
            thread::spawn(move || {
                barrier.wait();
                manager
                    .layout(&text, &ParagraphAttributes::default(), Size::new(100.0, 100.0))
                    .unwrap()
            })
        })
        .collect();
    let layouts: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(backend.calls(), 1);
    assert!(layouts.iter().all(|layout| Arc::ptr_eq(layout, &layouts[0])));
}

#[test]
fn evicted_layouts_are_shaped_again() {
    let backend = Arc::new(Counting::new());
    let manager = TextLayoutManager::builder()
        .backend(backend.clone())
        .cache_capacity(2)
        .build()
        .unwrap();
    let attrs = ParagraphAttributes::default();
    let constraints = LayoutConstraints::unbounded();
    let measure = |s: &str| {
        manager
            .measure(&AttributedString::plain(s, style()), &attrs, &constraints)
            .unwrap()
    };

    measure("one");
    measure("two");
    measure("three");
    assert_eq!(backend.calls(), 3);

    // "three" and "two" are still cached, "one" is gone
    measure("three");
    measure("two");
    assert_eq!(backend.calls(), 3);
    measure("one");
    assert_eq!(backend.calls(), 4);
    assert_eq!(manager.cache_stats().unwrap().evictions, 2);
}

#[test]
fn backend_failures_surface_as_shaping_errors() {
    let strict = shaper().with_notdef_fallback(false);
    let manager = TextLayoutManager::new(Arc::new(strict)).unwrap();
    let text = AttributedString::plain("bell\u{7}", style());

    let err = manager
        .measure(&text, &ParagraphAttributes::default(), &LayoutConstraints::unbounded())
        .unwrap_err();
    assert!(err.is_recoverable());
    assert!(matches!(
        err,
        TextLayoutError::Shaping(ShapingError::MissingGlyph { ch: '\u{7}', .. })
    ));
}

#[test]
fn default_manager_uses_the_greedy_backend() {
    let manager = textlm::default_manager().unwrap();
    assert_eq!(manager.backend_name(), "greedy");

    let size = manager
        .measure(
            &AttributedString::plain("abcd", style()),
            &ParagraphAttributes::default(),
            &LayoutConstraints::unbounded(),
        )
        .unwrap();
    assert_eq!(size, Size::new(20.0, 10.0));
}
