//! SLA Slicer CLI - Command-line interface for the sla-slicer library
//!
//! Usage:
//!   sla-slicer slice <job.json> [--png-dir <DIR>] [--capacity N] [--driver SLA]
//!   sla-slicer info <job.json>
//!   sla-slicer formats

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn, LevelFilter};
use sla_slicer::export::OutputFormat;
use sla_slicer::slice::{PrismEngine, SliceEngine, SlicingParams};
use sla_slicer::{
    worker, DriverRegistry, ExportSummary, FillRule, JobFile, Phase, PrintJob, PrintOutput,
    SlaDriver, WorkerMessage,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Layer refinement, rasterization and streaming for SLA printers
#[derive(Parser, Debug)]
#[command(name = "sla-slicer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Slice a job and stream its layer masks
    Slice {
        /// Job file (JSON)
        #[arg(value_name = "JOB")]
        input: PathBuf,

        /// Write each layer mask as a PNG into this directory
        #[arg(long, value_name = "DIR")]
        png_dir: Option<PathBuf>,

        /// Maximum number of undelivered worker messages
        #[arg(long, default_value = "4")]
        capacity: usize,

        /// Driver to run the job with
        #[arg(long, default_value = "SLA")]
        driver: String,

        /// Output format (raw, photon, photons, pws)
        #[arg(long, default_value = "raw")]
        format: String,

        /// Layer height override
        #[arg(long)]
        layer_height: Option<f64>,

        /// Solid layer span override
        #[arg(long)]
        solid_layer_span: Option<usize>,

        /// Fill rule override (non-zero, even-odd)
        #[arg(long)]
        fill_rule: Option<String>,
    },

    /// Display information about a job file
    Info {
        /// Job file (JSON)
        #[arg(value_name = "JOB")]
        input: PathBuf,
    },

    /// List output formats
    Formats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.debug {
        LevelFilter::Debug
    } else if cli.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Slice {
            input,
            png_dir,
            capacity,
            driver,
            format,
            layer_height,
            solid_layer_span,
            fill_rule,
        } => cmd_slice(
            input,
            png_dir,
            capacity,
            driver,
            format,
            layer_height,
            solid_layer_span,
            fill_rule,
        ),
        Commands::Info { input } => cmd_info(input),
        Commands::Formats => cmd_formats(),
    }
}

fn load_job(input: &Path) -> Result<JobFile> {
    info!("Loading job file: {}", input.display());
    JobFile::from_file(input).with_context(|| format!("Failed to load job file {}", input.display()))
}

fn parse_fill_rule(value: &str) -> Result<FillRule> {
    match value.to_lowercase().as_str() {
        "non-zero" | "nonzero" => Ok(FillRule::NonZero),
        "even-odd" | "evenodd" => Ok(FillRule::EvenOdd),
        _ => bail!("Unknown fill rule '{}'", value),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_slice(
    input: PathBuf,
    png_dir: Option<PathBuf>,
    capacity: usize,
    driver_name: String,
    format: String,
    layer_height: Option<f64>,
    solid_layer_span: Option<usize>,
    fill_rule: Option<String>,
) -> Result<()> {
    let mut file = load_job(&input)?;

    if let Some(height) = layer_height {
        file.settings = file.settings.with_layer_height(height);
    }
    if let Some(span) = solid_layer_span {
        file.settings = file.settings.with_solid_layer_span(span);
    }
    if let Some(rule) = fill_rule {
        file.raster = file.raster.fill_rule(parse_fill_rule(&rule)?);
    }
    file.settings.validate().context("Invalid settings")?;

    let format: OutputFormat = format.parse().context("Invalid output format")?;
    if !format.is_implemented() {
        warn!("Output format {} is not implemented yet", format);
    }

    let mut job = PrintJob::new(file.settings.clone()).with_raster(file.raster.clone());
    for model in file.build_models().context("Invalid model in job file")? {
        job.add_model(model);
    }

    info!("Configuration:");
    info!("  Settings: {}", job.settings);
    info!("  Mask: {}", job.raster);
    info!("  Models: {}", job.models.len());

    if let Some(dir) = &png_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let mut registry = DriverRegistry::new();
    registry.register(Arc::new(SlaDriver::default().with_format(format)));
    let driver = registry.get(&driver_name)?;

    // Create progress bar
    let progress = ProgressBar::new(100);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")?
            .progress_chars("#>-"),
    );
    progress.set_message("Slicing...");

    let handle = worker::spawn(job, driver.clone(), Arc::new(PrismEngine::new()), capacity)?;

    // Slicing fills the first half of the bar, masks the second
    let mut summary: Option<ExportSummary> = None;
    let mut bytes = 0usize;
    for message in handle.messages() {
        match message {
            WorkerMessage::Progress {
                phase,
                fraction,
                message,
            } => {
                let pos = match phase {
                    Phase::Slice => fraction * 50.0,
                    Phase::Print => 50.0 + fraction * 50.0,
                };
                progress.set_position(pos.round() as u64);
                match (phase, message) {
                    (_, Some(text)) if text.contains("degraded") => {
                        progress.println(format!("warning: {text}"))
                    }
                    (Phase::Slice, Some(text)) => progress.set_message(format!("Slicing ({text})")),
                    (Phase::Print, _) => progress.set_message("Rasterizing layers..."),
                    _ => {}
                }
            }
            WorkerMessage::Layer(layer) => {
                bytes += layer.as_raw().len();
                if let Some(dir) = &png_dir {
                    let path = dir.join(format!("layer-{:05}.png", layer.index));
                    layer
                        .image
                        .save(&path)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                }
            }
            WorkerMessage::Complete(done) => summary = Some(done),
        }
    }

    let mut job = handle.join().context("Print job failed")?;
    progress.finish_with_message("Done!");

    let summary = summary.context("Worker finished without a completion message")?;
    let preview_layers = driver.render(&mut job);
    if let Some(PrintOutput::Preview(layers)) = &job.output {
        let outlines: usize = layers.iter().map(|layer| layer.len()).sum();
        info!("Preview: {} layers, {} outlines", layers.len(), outlines);
    }

    println!();
    println!("Slicing complete!");
    println!("  Driver: {}", driver.name());
    println!("  Layers: {}", summary.layers);
    println!("  Mask size: {}x{}", summary.width, summary.height);
    println!("  Streamed: {:.1} MB", bytes as f64 / (1024.0 * 1024.0));
    println!("  Preview layers: {}", preview_layers);
    if let Some(dir) = &png_dir {
        println!("  PNG masks: {}", dir.display());
    }

    Ok(())
}

fn cmd_info(input: PathBuf) -> Result<()> {
    let file = load_job(&input)?;
    let models = file.build_models().context("Invalid model in job file")?;
    let params = SlicingParams::from_settings(&file.settings);
    let engine = PrismEngine::new();

    println!("Job Information:");
    println!("  File: {}", input.display());
    println!("  Settings: {}", file.settings);
    println!("  Mask: {}", file.raster);
    match file.raster.buffer_len() {
        Some(len) => println!(
            "  Layer buffer: {:.1} MB",
            len as f64 / (1024.0 * 1024.0)
        ),
        None => println!("  Layer buffer: too large to allocate"),
    }
    println!("  Models: {}", models.len());

    let mut layer_max = 0;
    for model in &models {
        let layers = engine
            .slice_model(model, &params, &mut |_| {})
            .with_context(|| format!("Failed to slice model '{}'", model.name))?;
        let area = layers
            .first()
            .map(|layer| sla_slicer::geometry::total_area_unscaled(layer.boundary()))
            .unwrap_or(0.0);
        println!(
            "    {}: {} layers, first layer area {:.2}",
            model.name,
            layers.len(),
            area
        );
        layer_max = layer_max.max(layers.len());
    }
    println!("  Layer count: {}", layer_max);

    Ok(())
}

fn cmd_formats() -> Result<()> {
    println!("Output formats:");
    for format in OutputFormat::ALL {
        println!(
            "  {:<8} .{:<8} {}",
            format.name(),
            format.extension(),
            if format.is_implemented() {
                "available"
            } else {
                "not implemented"
            }
        );
    }
    Ok(())
}
