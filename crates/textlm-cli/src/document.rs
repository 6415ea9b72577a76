//! Input documents
//!
//! A document is a paragraph description plus a list of styled fragments:
//!
//! ```json
//! {
//!   "paragraph": { "max_lines": 2, "truncation": "tail" },
//!   "fragments": [
//!     { "text": "Read the ", "font_size": 14 },
//!     { "text": "docs", "color": "#0366d6", "link": "https://example.com/docs" },
//!     { "attachment": { "id": 7, "width": 16, "height": 16 } }
//!   ]
//! }
//! ```

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use textlm::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Document {
    #[serde(default)]
    pub paragraph: ParagraphSpec,
    pub fragments: Vec<FragmentSpec>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParagraphSpec {
    pub max_lines: u32,
    pub truncation: TruncationSpec,
    pub line_break: LineBreakSpec,
    pub alignment: AlignmentSpec,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncationSpec {
    None,
    Clip,
    Head,
    #[default]
    Tail,
    Middle,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineBreakSpec {
    #[default]
    Normal,
    Strict,
    Loose,
    Anywhere,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentSpec {
    #[default]
    Start,
    Center,
    End,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FragmentSpec {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub strikethrough: bool,
    /// `#rrggbb` or `#rrggbbaa`
    pub color: Option<String>,
    pub background: Option<String>,
    pub line_height: Option<f32>,
    /// Makes the fragment a hit-test target
    pub link: Option<String>,
    pub attachment: Option<AttachmentSpec>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttachmentSpec {
    pub id: u64,
    pub width: f32,
    pub height: f32,
}

fn default_font_size() -> f32 {
    16.0
}

/// A document turned into layout input
///
/// Owns the link targets, so the event emitter handles in `text` stay alive
/// for as long as this value does.
#[derive(Debug)]
pub struct LoadedDocument {
    pub text: AttributedString,
    pub paragraph: ParagraphAttributes,
    links: Vec<Arc<String>>,
}

impl LoadedDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        let document: Document = serde_json::from_str(json).context("Invalid input document")?;
        Self::from_document(document)
    }

    pub fn from_document(document: Document) -> Result<Self> {
        let mut links = Vec::new();
        let mut fragments = Vec::with_capacity(document.fragments.len());

        for (index, spec) in document.fragments.into_iter().enumerate() {
            let style = spec
                .style()
                .with_context(|| format!("Fragment {index} has an invalid style"))?;
            let mut fragment = match spec.attachment {
                Some(attachment) => {
                    if !spec.text.is_empty() {
                        bail!("Fragment {index} has both text and an attachment");
                    }
                    if !(attachment.width >= 0.0 && attachment.height >= 0.0) {
                        bail!("Fragment {index} has a negative attachment size");
                    }
                    Fragment::attachment(
                        Attachment::new(
                            attachment.id,
                            Size::new(attachment.width, attachment.height),
                        ),
                        style,
                    )
                },
                None => Fragment::new(spec.text, style),
            };
            if let Some(link) = spec.link {
                let target = Arc::new(link);
                fragment = fragment.with_event_emitter(EventEmitterHandle::new(&target));
                links.push(target);
            }
            fragments.push(fragment);
        }

        log::debug!(
            "Loaded document: {} fragments, {} links",
            fragments.len(),
            links.len()
        );
        Ok(Self {
            text: AttributedString::new(fragments),
            paragraph: document.paragraph.into(),
            links,
        })
    }

    /// The link a hit-test handle points at
    pub fn link_for(&self, handle: &EventEmitterHandle) -> Option<String> {
        handle.downcast::<String>().map(|link| link.as_str().to_owned())
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

impl FragmentSpec {
    fn style(&self) -> Result<TextStyle> {
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            bail!("font_size must be positive, got {}", self.font_size);
        }
        let mut style = TextStyle::default().with_size(self.font_size);
        if self.bold {
            style = style.bold();
        }
        if self.italic {
            style = style.italic();
        }
        if self.underline {
            style = style.underline();
        }
        if self.strikethrough {
            style = style.strikethrough();
        }
        if let Some(color) = &self.color {
            style = style.with_color(parse_color(color)?);
        }
        if let Some(background) = &self.background {
            style = style.with_background(parse_color(background)?);
        }
        if let Some(line_height) = self.line_height {
            style = style.with_line_height(line_height);
        }
        Ok(style)
    }
}

impl From<ParagraphSpec> for ParagraphAttributes {
    fn from(spec: ParagraphSpec) -> Self {
        let truncation = match spec.truncation {
            TruncationSpec::None => TruncationMode::None,
            TruncationSpec::Clip => TruncationMode::Clip,
            TruncationSpec::Head => TruncationMode::Head,
            TruncationSpec::Tail => TruncationMode::Tail,
            TruncationSpec::Middle => TruncationMode::Middle,
        };
        let line_break = match spec.line_break {
            LineBreakSpec::Normal => LineBreakStrategy::Normal,
            LineBreakSpec::Strict => LineBreakStrategy::Strict,
            LineBreakSpec::Loose => LineBreakStrategy::Loose,
            LineBreakSpec::Anywhere => LineBreakStrategy::Anywhere,
        };
        let alignment = match spec.alignment {
            AlignmentSpec::Start => TextAlignment::Start,
            AlignmentSpec::Center => TextAlignment::Center,
            AlignmentSpec::End => TextAlignment::End,
        };
        ParagraphAttributes::default()
            .with_max_lines(spec.max_lines)
            .with_truncation(truncation)
            .with_line_break(line_break)
            .with_alignment(alignment)
    }
}

/// Parse `#rrggbb` or `#rrggbbaa`
pub fn parse_color(value: &str) -> Result<Color> {
    let hex = value.strip_prefix('#').unwrap_or(value);
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        bail!("Expected #rrggbb or #rrggbbaa, got '{value}'");
    }
    let channel = |at: usize| {
        u8::from_str_radix(&hex[at..at + 2], 16)
            .with_context(|| format!("Invalid colour '{value}'"))
    };
    let alpha = if hex.len() == 8 { channel(6)? } else { 0xff };
    Ok(Color::rgba(channel(0)?, channel(2)?, channel(4)?, alpha))
}
