//! JSON surface - When you need to see what the layout really painted
//!
//! Pixels are hard to assert on. This surface records every paint call the
//! layout manager makes and exports them as JSON, which makes it the natural
//! target for tests, snapshot tooling, and the command line.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use textlm_core::{
    traits::{AttachmentRenderer, DrawingSurface},
    types::{Point, Rect},
    Attachment, Color, PositionedRun, RunKind, TextStyle,
};

/// Schema version for JSON output format
pub const JSON_SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, thiserror::Error)]
pub enum JsonExportError {
    #[error("Failed to serialize paint commands: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Rectangle in surface coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl From<Rect> for Frame {
    fn from(rect: Rect) -> Self {
        Self {
            x: rect.origin.x,
            y: rect.origin.y,
            width: rect.size.width,
            height: rect.size.height,
        }
    }
}

/// One glyph, short field names in the spirit of `hb-shape` output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlyphInfo {
    pub g: u32,  // Glyph identifier
    pub cl: u32, // Cluster, a byte offset into the source text
    pub x: f32,  // Offset from the run origin
    pub y: f32,
    pub ax: f32, // Horizontal advance
}

/// Everything a surface was asked to paint, in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PaintCommand {
    FillRect {
        frame: Frame,
        color: String,
    },
    Glyphs {
        /// Baseline origin of the run
        x: f32,
        y: f32,
        kind: String,
        fragment: usize,
        text: [usize; 2],
        color: String,
        font_size: f32,
        glyphs: Vec<GlyphInfo>,
    },
}

impl PaintCommand {
    pub fn is_ellipsis(&self) -> bool {
        matches!(self, Self::Glyphs { kind, .. } if kind == "ellipsis")
    }
}

/// Serialized form of a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaintDocument {
    pub schema_version: String,
    pub commands: Vec<PaintCommand>,
}

/// `#rrggbbaa`
pub fn color_hex(color: Color) -> String {
    format!(
        "#{:02x}{:02x}{:02x}{:02x}",
        color.r, color.g, color.b, color.a
    )
}

fn kind_name(kind: RunKind) -> &'static str {
    match kind {
        RunKind::Text => "text",
        RunKind::Attachment => "attachment",
        RunKind::Ellipsis => "ellipsis",
    }
}

/// A drawing surface that only takes notes
#[derive(Debug, Default)]
pub struct RecordingSurface {
    commands: Vec<PaintCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[PaintCommand] {
        &self.commands
    }

    /// Hand over the recording, leaving the surface empty
    pub fn take(&mut self) -> Vec<PaintCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn to_document(&self) -> PaintDocument {
        PaintDocument {
            schema_version: JSON_SCHEMA_VERSION.to_string(),
            commands: self.commands.clone(),
        }
    }

    /// Pretty JSON of everything recorded so far
    pub fn to_json(&self) -> Result<String, JsonExportError> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }
}

impl DrawingSurface for RecordingSurface {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(PaintCommand::FillRect {
            frame: rect.into(),
            color: color_hex(color),
        });
    }

    fn draw_glyph_run(&mut self, run: &PositionedRun, origin: Point, style: &TextStyle) {
        log::trace!(
            "Recording {} glyphs at ({}, {})",
            run.glyphs.len(),
            origin.x,
            origin.y
        );
        let glyphs = run
            .glyphs
            .glyphs()
            .iter()
            .map(|glyph| GlyphInfo {
                g: glyph.id,
                cl: glyph.cluster,
                x: glyph.x,
                y: glyph.y,
                ax: glyph.advance,
            })
            .collect();

        self.commands.push(PaintCommand::Glyphs {
            x: origin.x,
            y: origin.y,
            kind: kind_name(run.kind).to_string(),
            fragment: run.source.fragment,
            text: [run.source.text.start, run.source.text.end],
            color: color_hex(style.color),
            font_size: style.font_size,
            glyphs,
        });
    }
}

/// Paints every attachment as a solid box
///
/// Keeps the ids it was asked to draw so callers can check which
/// attachments actually made it on screen.
#[derive(Debug)]
pub struct PlaceholderAttachmentRenderer {
    color: Color,
    rendered: Mutex<Vec<(u64, Rect)>>,
}

impl PlaceholderAttachmentRenderer {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            rendered: Mutex::new(Vec::new()),
        }
    }

    /// Attachment ids and frames drawn so far
    pub fn rendered(&self) -> Vec<(u64, Rect)> {
        self.rendered.lock().clone()
    }
}

impl Default for PlaceholderAttachmentRenderer {
    fn default() -> Self {
        Self::new(Color::rgba(0x99, 0x99, 0x99, 0xff))
    }
}

impl AttachmentRenderer for PlaceholderAttachmentRenderer {
    fn render_attachment(
        &self,
        attachment: &Attachment,
        frame: Rect,
        surface: &mut dyn DrawingSurface,
    ) {
        surface.fill_rect(frame, self.color);
        self.rendered.lock().push((attachment.id, frame));
    }
}
