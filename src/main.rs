//! Binary entrypoint for the slideshow.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use rust_slideshow::config::Configuration;
use rust_slideshow::engine::{ImageRef, ManualTimer, NavigationController, Renderer};
use rust_slideshow::error::Error;
use rust_slideshow::scan;
use rust_slideshow::tasks::viewer;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(name = "slideshow", version, about = "Fullscreen shuffled image slideshow")]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Override the directory scanned for images
    #[arg(long, value_name = "DIR")]
    image_path: Option<PathBuf>,

    /// Override the time each image stays up (e.g. "10s", "1m 30s")
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    interval: Option<Duration>,

    /// Deterministic RNG seed for the shuffle
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Run in a normal window instead of fullscreen
    #[arg(long)]
    windowed: bool,

    /// Print the first ITERATIONS timer-driven images without opening a window
    #[arg(long = "dry-run", value_name = "ITERATIONS")]
    dry_run: Option<usize>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("rust_slideshow={level}").parse()?)
        .add_directive(format!("slideshow={level}").parse()?)
        .add_directive("winit=warn".parse()?)
        .add_directive("softbuffer=warn".parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Configuration> {
    let mut cfg = if cli.config.exists() {
        Configuration::from_yaml_file(&cli.config)
            .with_context(|| format!("loading config from {}", cli.config.display()))?
    } else {
        info!(path = %cli.config.display(), "config file not found; using defaults");
        Configuration::default()
    };

    if let Some(path) = &cli.image_path {
        cfg.screen.image_path = path.clone();
    }
    if let Some(interval) = cli.interval {
        cfg.slideshow.interval = interval;
    }
    if cli.seed.is_some() {
        cfg.slideshow.shuffle_seed = cli.seed;
    }
    if cli.windowed {
        cfg.slideshow.fullscreen = false;
        cfg.slideshow.topmost = false;
    }

    cfg.validated().context("validating configuration")
}

/// Prints each displayed image instead of drawing it.
struct PrintRenderer;

impl Renderer for PrintRenderer {
    fn display(&mut self, image: &ImageRef) -> Result<()> {
        println!("{image}");
        Ok(())
    }
}

fn run_dry_run(cfg: &Configuration, files: Vec<ImageRef>, iterations: usize) -> Result<()> {
    let mut controller =
        NavigationController::new(cfg.playback_settings(), PrintRenderer, ManualTimer::new())?;
    controller.start(files)?;
    for _ in 0..iterations {
        let Some(tick) = controller.scheduler_mut().backend_mut().fire() else {
            break;
        };
        controller.on_tick(tick)?;
    }
    controller.stop();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = load_config(&cli)?;
    info!(
        image_path = %cfg.screen.image_path.display(),
        interval = %humantime::format_duration(cfg.slideshow.interval),
        history = cfg.slideshow.effective_history_length(),
        "configuration loaded"
    );

    let files = scan::list_images(
        &cfg.screen.image_path,
        &cfg.normalized_extensions(),
        cfg.screen.recursive,
    )
    .context("listing images")?;
    info!(count = files.len(), "scanned images");
    if files.is_empty() {
        return Err(Error::EmptyPool).with_context(|| {
            format!(
                "no images with extensions {:?} under {}",
                cfg.normalized_extensions(),
                cfg.screen.image_path.display()
            )
        });
    }

    if let Some(iterations) = cli.dry_run {
        return run_dry_run(&cfg, files, iterations);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    viewer::run(&cfg, files, &runtime)
}
