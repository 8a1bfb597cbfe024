//! Renders a view progressively and writes the result as PNG.
//!
//! Each positional argument is a settings query (`x=-3/4&y=1/10&mag=40&numeric=exact`);
//! later queries are applied on top of the history, like zooming in step by step,
//! and `--undo` steps back through them before rendering.

use std::path::{Path, PathBuf};

use clap::Parser;
use fr_core::{config::parse_settings, history::SettingsHistory, image::hue_gradient, Size};
use fr_render::{PassOutcome, ProgressiveRenderer, RenderEvent};
use image::RgbImage;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
struct Args {
    /// Settings queries, applied in order.
    queries: Vec<String>,

    #[arg(long, default_value_t = 800)]
    width: usize,
    #[arg(long, default_value_t = 600)]
    height: usize,

    /// Steps to undo after applying the queries.
    #[arg(long, default_value_t = 0)]
    undo: usize,

    /// Stop after this many passes, even if refinement isn't done.
    #[arg(long, default_value_t = 10_000)]
    passes: usize,

    #[arg(long, default_value_t = 64)]
    palette_size: usize,

    /// Refine every cell on each pass instead of one cell at a time.
    #[arg(long)]
    full: bool,

    /// Write every finished pass, not just the last.
    #[arg(long)]
    every_frame: bool,

    #[arg(long, default_value = "fractal.png")]
    out: PathBuf,
}

fn frame_path(out: &Path, pass: usize) -> PathBuf {
    let stem = out.file_stem().unwrap_or_default().to_string_lossy();
    out.with_file_name(format!("{}_{:05}.png", stem, pass))
}

fn save(image: &RgbImage, path: &Path) {
    if let Err(e) = image.save(path) {
        tracing::error!("could not write {}: {}", path.display(), e);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let mut queries = args.queries.iter();
    let first = queries.next().map(String::as_str).unwrap_or("");
    let mut history =
        SettingsHistory::new(parse_settings(first).expect("invalid settings query"));
    for query in queries {
        history.push(parse_settings(query).expect("invalid settings query"));
    }
    for _ in 0..args.undo {
        if history.undo().is_none() {
            tracing::info!("nothing left to undo");
            break;
        }
    }

    let (mut renderer, events) = ProgressiveRenderer::new();
    renderer
        .initialize(
            Size {
                width: args.width,
                height: args.height,
            },
            hue_gradient(args.palette_size),
        )
        .expect("could not initialize renderer");
    let mut settings = history.current().clone();
    if args.full {
        settings.gradual = false;
    }
    renderer
        .configure(settings)
        .expect("could not configure renderer");

    let mut last = None;
    for pass in 0..args.passes {
        match renderer.render_frame().expect("render failed") {
            PassOutcome::Finished(image) => {
                if args.every_frame {
                    save(&image, &frame_path(&args.out, pass));
                }
                last = Some(image);
            }
            PassOutcome::Halted => break,
            PassOutcome::Settled => break,
        }
        for event in events.try_iter() {
            match event {
                RenderEvent::FrameFinished(_) => tracing::debug!("pass {} finished", pass),
                RenderEvent::RenderHalted => tracing::info!("render halted after pass {}", pass),
                RenderEvent::FrameStarted => {}
            }
        }
    }
    tracing::info!(
        "{} sweeps; chunk sizes {:?}",
        renderer.sweeps(),
        renderer.chunk_sizes()
    );

    match last.or_else(|| renderer.snapshot()) {
        Some(image) => save(&image, &args.out),
        None => tracing::error!("nothing rendered"),
    }
}
