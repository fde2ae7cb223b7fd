#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice
)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use kflow::{
    export::{self, GifWriter},
    EmptyClusterRule, Flow, FlowOptions, Frame, ImageRef,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Renders the k-means convergence of an image's colors as an animation.
#[derive(Parser)]
#[command(name = "kflow", version)]
struct Options {
    /// The image to quantize.
    input: PathBuf,

    /// The output GIF file, or a directory for the PNG sequence with `--png-dir`.
    output: PathBuf,

    /// Number of clusters (colors).
    #[arg(short, long, default_value_t = 8)]
    k: u32,

    /// Number of iterations (frames).
    #[arg(long, default_value_t = 300)]
    iterations: u32,

    /// Start new perturbations every this many frames.
    #[arg(long, default_value_t = 30)]
    interval: u32,

    /// Number of clusters perturbed at each checkpoint.
    #[arg(long, default_value_t = 3)]
    batch: u32,

    /// Number of frames a perturbation lasts (defaults to the interval).
    #[arg(long)]
    steps: Option<u32>,

    /// Blend factor towards each cluster's average color.
    #[arg(long, default_value_t = 0.04)]
    pull: f32,

    /// Blend factor towards a perturbation target.
    #[arg(long, default_value_t = 0.08)]
    perturb: f32,

    /// Frame rate of the output animation.
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Sync the checkpoint interval to this tempo (overrides `--interval`).
    #[arg(long)]
    bpm: Option<f32>,

    /// Seed for the random number generator.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Treat clusters whose average is pure black as empty.
    #[arg(long)]
    black_sentinel: bool,

    /// Number of threads (0 = all cores, 1 = single threaded).
    #[arg(short, long, default_value_t = 0)]
    threads: u8,

    /// Write numbered PNG files into the output directory instead of a GIF.
    #[arg(long)]
    png_dir: bool,

    /// Log every frame.
    #[arg(short, long)]
    verbose: bool,
}

impl Options {
    fn flow_options(&self) -> FlowOptions {
        let mut options = FlowOptions::new()
            .clusters(self.k)
            .iterations(self.iterations)
            .checkpoint_interval(self.interval)
            .perturbation_batch(self.batch)
            .pull_factor(self.pull)
            .perturbation_factor(self.perturb)
            .fps(self.fps)
            .seed(self.seed);

        if let Some(bpm) = self.bpm {
            options = options.sync_to_bpm(bpm);
        }
        if let Some(steps) = self.steps {
            options = options.perturbation_steps(steps);
        }
        if self.black_sentinel {
            options = options.empty_cluster_rule(EmptyClusterRule::BlackSentinel);
        }

        options
    }
}

fn write_frames(
    frames: impl Iterator<Item = Frame>,
    options: &Options,
    flow_options: &FlowOptions,
) -> Result<()> {
    if options.png_dir {
        export::write_png_sequence(frames, &options.output)
            .with_context(|| format!("failed to write {}", options.output.display()))?;
    } else {
        let mut gif = GifWriter::create(&options.output, flow_options.frame_rate())
            .with_context(|| format!("failed to create {}", options.output.display()))?;
        for frame in frames {
            gif.push(&frame)
                .with_context(|| format!("failed to write {}", options.output.display()))?;
        }
        gif.finish()
            .with_context(|| format!("failed to write {}", options.output.display()))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let options = Options::parse();

    let default_level = if options.verbose { "kflow=debug" } else { "kflow=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let image = image::open(&options.input)
        .with_context(|| format!("failed to read {}", options.input.display()))?
        .into_rgb8();
    info!(path = %options.input.display(), "image loaded");

    let flow_options = options.flow_options();
    let mut flow = Flow::new(ImageRef::try_from(&image)?, flow_options.clone())?;

    match options.threads {
        1 => write_frames(flow.frames(), &options, &flow_options)?,
        0 => write_frames(flow.frames_par(), &options, &flow_options)?,
        t => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(t.into())
                .build()
                .context("failed to build thread pool")?;

            pool.install(|| write_frames(flow.frames_par(), &options, &flow_options))?;
        }
    }

    info!(path = %options.output.display(), "done");
    Ok(())
}
