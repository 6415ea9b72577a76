// this_file: crates/textlm-cli/src/main.rs

//! textlm CLI: measure, draw and hit-test attributed text.
//!
//! Layout runs on the greedy backend with fixed metrics, so results are
//! reproducible across machines.

mod document;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::json;
use textlm::prelude::*;

use document::LoadedDocument;

#[derive(Parser, Debug)]
#[command(name = "textlm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// More logging (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Text inserted where truncation hides content
    #[arg(long, global = true)]
    ellipsis: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the size the text needs within the given bounds
    #[command(alias = "m")]
    Measure {
        #[command(flatten)]
        input: InputArgs,

        /// Smallest acceptable width
        #[arg(long, default_value_t = 0.0)]
        min_width: f32,

        /// Smallest acceptable height
        #[arg(long, default_value_t = 0.0)]
        min_height: f32,
    },

    /// Print the paint commands for the text in a frame, as JSON
    #[command(alias = "d")]
    Draw {
        #[command(flatten)]
        input: InputArgs,

        /// Frame origin
        #[arg(long, default_value_t = 0.0)]
        x: f32,
        #[arg(long, default_value_t = 0.0)]
        y: f32,
    },

    /// Print which fragment sits under a point
    #[command(alias = "h")]
    HitTest {
        #[command(flatten)]
        input: InputArgs,

        /// Point to test, in the same space as the frame
        #[arg(long, allow_negative_numbers = true)]
        x: f32,
        #[arg(long, allow_negative_numbers = true)]
        y: f32,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Input document (JSON); reads stdin if omitted or '-'
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Available width (unbounded if omitted)
    #[arg(short = 'W', long)]
    width: Option<f32>,

    /// Available height (unbounded if omitted)
    #[arg(short = 'H', long)]
    height: Option<f32>,
}

impl InputArgs {
    fn load(&self) -> Result<LoadedDocument> {
        let json = read_input(self.input.as_deref())?;
        LoadedDocument::from_json(&json)
    }

    fn bounds(&self) -> Size {
        Size::new(
            self.width.unwrap_or(f32::INFINITY),
            self.height.unwrap_or(f32::INFINITY),
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let manager = build_manager(cli.ellipsis.as_deref())?;
    let output = match &cli.command {
        Commands::Measure {
            input,
            min_width,
            min_height,
        } => run_measure(&manager, input, Size::new(*min_width, *min_height))?,
        Commands::Draw { input, x, y } => run_draw(&manager, input, Point::new(*x, *y))?,
        Commands::HitTest { input, x, y } => run_hit_test(&manager, input, Point::new(*x, *y))?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_logger(verbose: u8) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    });
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn build_manager(ellipsis: Option<&str>) -> Result<TextLayoutManager> {
    let config = LayoutConfig::from_env().context("Invalid TEXTLM_* environment")?;
    let mut builder = TextLayoutManager::builder()
        .backend(Arc::new(GreedyShaper::new(Arc::new(FixedMetrics::default()))))
        .attachment_renderer(Arc::new(PlaceholderAttachmentRenderer::default()))
        .config(config);
    if let Some(ellipsis) = ellipsis {
        builder = builder.ellipsis(ellipsis);
    }
    Ok(builder.build()?)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut json = String::new();
            io::stdin()
                .read_to_string(&mut json)
                .context("Failed to read stdin")?;
            Ok(json)
        },
    }
}

fn run_measure(
    manager: &TextLayoutManager,
    input: &InputArgs,
    min: Size,
) -> Result<serde_json::Value> {
    let document = input.load()?;
    let constraints = LayoutConstraints::new(min, input.bounds())?;
    let size = manager.measure(&document.text, &document.paragraph, &constraints)?;
    let layout = manager.layout(&document.text, &document.paragraph, constraints.max)?;

    Ok(json!({
        "width": size.width,
        "height": size.height,
        "lines": layout.line_count(),
        "truncated": layout.truncated,
    }))
}

fn run_draw(
    manager: &TextLayoutManager,
    input: &InputArgs,
    origin: Point,
) -> Result<serde_json::Value> {
    let document = input.load()?;
    let frame = Rect {
        origin,
        size: frame_size(manager, &document, input)?,
    };

    let mut surface = RecordingSurface::new();
    manager.draw(&document.text, &document.paragraph, frame, &mut surface)?;
    log::debug!("Recorded {} paint commands", surface.commands().len());
    Ok(serde_json::to_value(surface.to_document())?)
}

fn run_hit_test(
    manager: &TextLayoutManager,
    input: &InputArgs,
    point: Point,
) -> Result<serde_json::Value> {
    let document = input.load()?;
    let frame = Rect {
        origin: Point::ZERO,
        size: frame_size(manager, &document, input)?,
    };

    let Some(hit) =
        manager.hit_test_detailed(&document.text, &document.paragraph, frame, point)?
    else {
        return Ok(json!({ "hit": null }));
    };
    let link = manager
        .hit_test(&document.text, &document.paragraph, frame, point)?
        .and_then(|handle| document.link_for(&handle));

    Ok(json!({
        "hit": {
            "line": hit.line,
            "run": hit.run,
            "fragment": hit.fragment,
            "text": [hit.text_range.start, hit.text_range.end],
            "kind": format!("{:?}", hit.kind).to_lowercase(),
            "inside": hit.inside,
            "link": link,
        }
    }))
}

/// Frames need a finite size; unbounded sides take the measured size
fn frame_size(
    manager: &TextLayoutManager,
    document: &LoadedDocument,
    input: &InputArgs,
) -> Result<Size> {
    let bounds = input.bounds();
    if bounds.width.is_finite() && bounds.height.is_finite() {
        return Ok(bounds);
    }
    let measured = manager.measure(
        &document.text,
        &document.paragraph,
        &LayoutConstraints::loose(bounds),
    )?;
    Ok(Size::new(
        if bounds.width.is_finite() { bounds.width } else { measured.width },
        if bounds.height.is_finite() { bounds.height } else { measured.height },
    ))
}
