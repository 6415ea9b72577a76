//! Styled text as an ordered list of fragments
//!
//! An [`AttributedString`] is built once and never changes afterwards. Cloning
//! it is cheap, and its identity for caching comes from a content hash, so two
//! strings built separately from the same pieces share cached layouts.

use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Range;
use std::sync::{Arc, Weak};

use crate::layout::SourceFingerprint;
use crate::types::Size;
use crate::Color;

/// Stand-in character for inline attachments
pub const OBJECT_REPLACEMENT_CHARACTER: char = '\u{FFFC}';

/// Which way a fragment's text flows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WritingDirection {
    #[default]
    Natural,
    LeftToRight,
    RightToLeft,
}

/// CSS-style numeric font weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FontWeight(pub u16);

impl FontWeight {
    pub const NORMAL: Self = Self(400);
    pub const BOLD: Self = Self(700);

    pub fn is_bold(self) -> bool {
        self.0 >= 600
    }
}

impl Default for FontWeight {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Lines drawn through or under the text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextDecoration {
    pub underline: bool,
    pub strikethrough: bool,
    /// Falls back to the text color
    pub color: Option<Color>,
}

impl TextDecoration {
    pub const NONE: Self = Self {
        underline: false,
        strikethrough: false,
        color: None,
    };

    pub fn is_none(&self) -> bool {
        !self.underline && !self.strikethrough
    }
}

/// Visual attributes of one fragment
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_family: Option<String>,
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub italic: bool,
    pub color: Color,
    pub background: Option<Color>,
    pub decoration: TextDecoration,
    /// Extra advance after every character, may be negative
    pub letter_spacing: f32,
    /// Fixed line box height; `None` uses the font's own metrics
    pub line_height: Option<f32>,
    pub direction: WritingDirection,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: None,
            font_size: 14.0,
            font_weight: FontWeight::NORMAL,
            italic: false,
            color: Color::black(),
            background: None,
            decoration: TextDecoration::NONE,
            letter_spacing: 0.0,
            line_height: None,
            direction: WritingDirection::Natural,
        }
    }
}

impl TextStyle {
    pub fn with_size(mut self, font_size: f32) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = Some(family.into());
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn with_line_height(mut self, line_height: f32) -> Self {
        self.line_height = Some(line_height);
        self
    }

    pub fn with_letter_spacing(mut self, spacing: f32) -> Self {
        self.letter_spacing = spacing;
        self
    }

    pub fn bold(mut self) -> Self {
        self.font_weight = FontWeight::BOLD;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn underline(mut self) -> Self {
        self.decoration.underline = true;
        self
    }

    pub fn strikethrough(mut self) -> Self {
        self.decoration.strikethrough = true;
        self
    }
}

impl Hash for TextStyle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.font_family.hash(state);
        self.font_size.to_bits().hash(state);
        self.font_weight.hash(state);
        self.italic.hash(state);
        self.color.hash(state);
        self.background.hash(state);
        self.decoration.hash(state);
        self.letter_spacing.to_bits().hash(state);
        self.line_height.map(f32::to_bits).hash(state);
        self.direction.hash(state);
    }
}

/// An inline object embedded in the text, laid out as a single box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attachment {
    /// Opaque handle the host uses to find what to draw
    pub id: u64,
    pub size: Size,
}

impl Attachment {
    pub const fn new(id: u64, size: Size) -> Self {
        Self { id, size }
    }
}

impl Hash for Attachment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.size.width.to_bits().hash(state);
        self.size.height.to_bits().hash(state);
    }
}

/// Weak reference to whatever should receive interactions on a span
///
/// The owning UI component keeps the target alive; the layout manager only
/// hands this handle back from hit-testing and never upgrades it itself.
#[derive(Clone)]
pub struct EventEmitterHandle {
    target: Weak<dyn Any + Send + Sync>,
}

impl EventEmitterHandle {
    pub fn new<T: Any + Send + Sync>(target: &Arc<T>) -> Self {
        let target: Weak<T> = Arc::downgrade(target);
        Self { target }
    }

    /// Get the target back, if its owner still holds it
    pub fn upgrade(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.target.upgrade()
    }

    /// Upgrade and downcast in one go
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.upgrade()?.downcast::<T>().ok()
    }

    pub fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }

    /// Do both handles point at the same target?
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.target, &other.target)
    }
}

impl fmt::Debug for EventEmitterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitterHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// A contiguous styled piece of an attributed string
#[derive(Debug, Clone)]
pub struct Fragment {
    pub text: String,
    pub style: TextStyle,
    pub attachment: Option<Attachment>,
    pub event_emitter: Option<EventEmitterHandle>,
}

impl Fragment {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
            attachment: None,
            event_emitter: None,
        }
    }

    /// An inline object, represented in the text by U+FFFC
    pub fn attachment(attachment: Attachment, style: TextStyle) -> Self {
        Self {
            text: OBJECT_REPLACEMENT_CHARACTER.to_string(),
            style,
            attachment: Some(attachment),
            event_emitter: None,
        }
    }

    pub fn with_event_emitter(mut self, handle: EventEmitterHandle) -> Self {
        self.event_emitter = Some(handle);
        self
    }

    pub fn is_attachment(&self) -> bool {
        self.attachment.is_some()
    }

    /// Equality over everything that can change geometry or paint
    fn same_content(&self, other: &Self) -> bool {
        self.text == other.text && self.style == other.style && self.attachment == other.attachment
    }

    fn hash_content<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
        self.style.hash(state);
        self.attachment.hash(state);
    }
}

struct Inner {
    fragments: Vec<Fragment>,
    text: String,
    /// `offsets[i]..offsets[i + 1]` is fragment `i`'s byte range
    offsets: Vec<usize>,
    content_hash: u64,
}

/// Immutable styled text
#[derive(Clone)]
pub struct AttributedString {
    inner: Arc<Inner>,
}

impl AttributedString {
    pub fn new(fragments: Vec<Fragment>) -> Self {
        let mut text = String::with_capacity(fragments.iter().map(|f| f.text.len()).sum());
        let mut offsets = Vec::with_capacity(fragments.len() + 1);
        let mut hasher = DefaultHasher::new();

        offsets.push(0);
        fragments.len().hash(&mut hasher);
        for fragment in &fragments {
            text.push_str(&fragment.text);
            offsets.push(text.len());
            fragment.hash_content(&mut hasher);
        }

        Self {
            inner: Arc::new(Inner {
                fragments,
                text,
                offsets,
                content_hash: hasher.finish(),
            }),
        }
    }

    /// One fragment, one style
    pub fn plain(text: impl Into<String>, style: TextStyle) -> Self {
        Self::new(vec![Fragment::new(text, style)])
    }

    pub fn builder() -> AttributedStringBuilder {
        AttributedStringBuilder::default()
    }

    /// The whole string, fragments concatenated
    pub fn text(&self) -> &str {
        &self.inner.text
    }

    pub fn len(&self) -> usize {
        self.inner.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.text.is_empty()
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.inner.fragments
    }

    pub fn fragment(&self, index: usize) -> Option<&Fragment> {
        self.inner.fragments.get(index)
    }

    /// Byte range of fragment `index` within [`text`](Self::text)
    pub fn fragment_range(&self, index: usize) -> Option<Range<usize>> {
        let start = *self.inner.offsets.get(index)?;
        let end = *self.inner.offsets.get(index + 1)?;
        Some(start..end)
    }

    /// Which fragment owns the byte at `offset`?
    ///
    /// Empty fragments own nothing; offsets at or past the end own nothing.
    pub fn fragment_index_at(&self, offset: usize) -> Option<usize> {
        if offset >= self.len() {
            return None;
        }
        let ends = &self.inner.offsets[1..];
        let index = ends.partition_point(|&end| end <= offset);
        (index < self.inner.fragments.len()).then_some(index)
    }

    /// Interaction target of the fragment owning `offset`
    pub fn event_emitter_at(&self, offset: usize) -> Option<&EventEmitterHandle> {
        let index = self.fragment_index_at(offset)?;
        self.inner.fragments[index].event_emitter.as_ref()
    }

    /// Value-based hash of text, styles and attachments
    ///
    /// Event emitters are left out: they never change geometry.
    pub fn content_hash(&self) -> u64 {
        self.inner.content_hash
    }

    /// What a layout records about the string it was built from
    pub fn fingerprint(&self) -> SourceFingerprint {
        SourceFingerprint {
            content_hash: self.inner.content_hash,
            text_len: self.len(),
            fragment_count: self.inner.fragments.len(),
        }
    }
}

impl PartialEq for AttributedString {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.content_hash == other.inner.content_hash
                && self.inner.fragments.len() == other.inner.fragments.len()
                && self
                    .inner
                    .fragments
                    .iter()
                    .zip(&other.inner.fragments)
                    .all(|(a, b)| a.same_content(b)))
    }
}

impl fmt::Debug for AttributedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributedString")
            .field("text", &self.inner.text)
            .field("fragments", &self.inner.fragments.len())
            .finish()
    }
}

impl FromIterator<Fragment> for AttributedString {
    fn from_iter<I: IntoIterator<Item = Fragment>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Collects fragments in order, then freezes them
#[derive(Debug, Default)]
pub struct AttributedStringBuilder {
    fragments: Vec<Fragment>,
}

impl AttributedStringBuilder {
    pub fn push(mut self, text: impl Into<String>, style: TextStyle) -> Self {
        self.fragments.push(Fragment::new(text, style));
        self
    }

    pub fn attachment(mut self, attachment: Attachment, style: TextStyle) -> Self {
        self.fragments.push(Fragment::attachment(attachment, style));
        self
    }

    pub fn fragment(mut self, fragment: Fragment) -> Self {
        self.fragments.push(fragment);
        self
    }

    pub fn build(self) -> AttributedString {
        AttributedString::new(self.fragments)
    }
}
