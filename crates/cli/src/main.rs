mod settings;

use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread::JoinHandle;

use clap::Parser;
use crossbeam_channel::Receiver;
use serde::Serialize;

use coinspot_core::capture::capture_session::{CaptureSession, Pacing};
use coinspot_core::capture::domain::frame_source::FrameSource;
use coinspot_core::capture::infrastructure::image_sequence_source::ImageSequenceSource;
use coinspot_core::capture::infrastructure::synthetic_source::{Disc, SyntheticCoinSource};
use coinspot_core::detection::infrastructure::radial_symmetry_detector::{
    RadialSymmetryConfig, RadialSymmetryDetector,
};
use coinspot_core::mapping::coordinate_mapper::FillMode;
use coinspot_core::pipeline::frame_fault::FaultKind;
use coinspot_core::pipeline::infrastructure::channel_result_sink::ChannelResultSink;
use coinspot_core::pipeline::pipeline_logger::LogPipelineLogger;
use coinspot_core::pipeline::processing_pipeline::ProcessingPipeline;
use coinspot_core::pipeline::result_sink::{DetectionBatch, ResultSink};
use coinspot_core::processing::processor_config::ProcessorConfig;

use settings::Settings;

const SYNTHETIC_WIDTH: u32 = 640;
const SYNTHETIC_HEIGHT: u32 = 480;

/// Detect coins in a stream of frames and print their on-screen rectangles.
#[derive(Parser)]
#[command(name = "coinspot")]
struct Cli {
    /// Image files or directories replayed as the camera feed.
    images: Vec<PathBuf>,

    /// Generate N synthetic frames with moving coins instead of reading images.
    #[arg(long, conflicts_with = "images")]
    synthetic: Option<u64>,

    /// Nominal rate of the incoming feed, in frames per second.
    #[arg(long)]
    capture_fps: Option<f64>,

    /// Target processing rate; 0 pauses processing.
    #[arg(long)]
    fps: Option<f32>,

    /// Convert frames to grayscale before detection.
    #[arg(long)]
    grayscale: bool,

    /// Presentation surface size in points, e.g. 390x844.
    #[arg(long, value_parser = parse_surface)]
    surface: Option<(f64, f64)>,

    /// stretch, aspect-fit or aspect-fill.
    #[arg(long)]
    fill_mode: Option<FillMode>,

    /// Longest side of the detector's working image.
    #[arg(long)]
    search_resolution: Option<u32>,

    /// Replay the image sequence this many times.
    #[arg(long)]
    loops: Option<u32>,

    /// Pace frames at their capture timestamps instead of as fast as possible.
    #[arg(long)]
    realtime: bool,

    /// JSON settings file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Settings after command-line overrides.
#[derive(Debug, Clone, PartialEq)]
struct RunOptions {
    processor: ProcessorConfig,
    capture_fps: f64,
    surface: (f64, f64),
    fill_mode: FillMode,
    search_resolution: u32,
    loops: u32,
    pacing: Pacing,
    log_every: u64,
}

#[derive(Serialize)]
struct BatchRecord {
    frame: u64,
    timestamp_ms: f64,
    surface: [f64; 2],
    fill_mode: String,
    coins: Vec<CoinRecord>,
}

#[derive(Serialize)]
struct CoinRecord {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl From<&DetectionBatch> for BatchRecord {
    fn from(batch: &DetectionBatch) -> Self {
        Self {
            frame: batch.frame_index,
            timestamp_ms: batch.timestamp.as_secs_f64() * 1000.0,
            surface: [batch.context.surface_width, batch.context.surface_height],
            fill_mode: batch.context.fill_mode.to_string(),
            coins: batch
                .regions
                .iter()
                .map(|r| CoinRecord {
                    x: r.x,
                    y: r.y,
                    width: r.width,
                    height: r.height,
                })
                .collect(),
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let options = resolve_options(&cli, settings)?;
    validate(&cli, &options)?;

    let source = build_source(&cli, &options)?;
    let detector = RadialSymmetryDetector::new(RadialSymmetryConfig {
        search_resolution: options.search_resolution,
        ..RadialSymmetryConfig::default()
    })?;

    let (sink, batch_rx) =
        ChannelResultSink::new(options.surface.0, options.surface.1, options.fill_mode);
    let sink: Arc<dyn ResultSink> = Arc::new(sink);
    let printer = spawn_printer(batch_rx);

    let pipeline = ProcessingPipeline::new(Box::new(detector), &sink, options.processor)
        .with_logger(Box::new(LogPipelineLogger::new(options.log_every)));
    log::info!(
        "Processing at {} fps (grayscale {}), surface {}x{} {}",
        options.processor.target_fps,
        options.processor.grayscale,
        options.surface.0,
        options.surface.1,
        options.fill_mode
    );

    let session = CaptureSession::spawn(source, pipeline, options.pacing);
    let pipeline = session.join()?;

    // Last strong reference: closes the channel so the printer drains and exits.
    drop(sink);
    let printed = printer
        .join()
        .map_err(|_| "output thread panicked")??;

    pipeline.logger().summary();
    let diag = pipeline.control().diagnostics();
    log::info!(
        "Frames: {} received, {} dropped, {} delivered, {} undeliverable ({} batches printed)",
        diag.received,
        diag.dropped,
        diag.delivered,
        diag.undeliverable,
        printed
    );
    for kind in FaultKind::ALL {
        let count = diag.faults(*kind);
        if count > 0 {
            log::warn!("{count} frames skipped: {kind}");
        }
    }
    Ok(())
}

fn resolve_options(cli: &Cli, settings: Settings) -> Result<RunOptions, Box<dyn std::error::Error>> {
    let fill_mode = match cli.fill_mode {
        Some(mode) => mode,
        None => settings.fill_mode.parse::<FillMode>()?,
    };
    let pacing = if cli.realtime || settings.realtime {
        Pacing::Realtime
    } else {
        Pacing::AsFastAsPossible
    };
    Ok(RunOptions {
        processor: ProcessorConfig {
            target_fps: cli.fps.unwrap_or(settings.target_fps),
            grayscale: cli.grayscale || settings.grayscale,
        },
        capture_fps: cli.capture_fps.unwrap_or(settings.capture_fps),
        surface: cli
            .surface
            .unwrap_or((settings.surface_width, settings.surface_height)),
        fill_mode,
        search_resolution: cli.search_resolution.unwrap_or(settings.search_resolution),
        loops: cli.loops.unwrap_or(settings.loops),
        pacing,
        log_every: settings.log_every,
    })
}

fn validate(cli: &Cli, options: &RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    if cli.images.is_empty() && cli.synthetic.is_none() {
        return Err("Provide image paths or --synthetic N".into());
    }
    for path in &cli.images {
        if !path.exists() {
            return Err(format!("Input not found: {}", path.display()).into());
        }
    }
    if !options.capture_fps.is_finite() || options.capture_fps <= 0.0 {
        return Err(format!("Capture fps must be positive, got {}", options.capture_fps).into());
    }
    let fps = options.processor.target_fps;
    if !fps.is_finite() || fps < 0.0 {
        return Err(format!("Target fps must be zero or positive, got {fps}").into());
    }
    if fps == 0.0 {
        log::warn!("Target fps is 0: every frame will be dropped");
    }
    let (w, h) = options.surface;
    if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
        return Err(format!("Surface size must be positive, got {w}x{h}").into());
    }
    if options.search_resolution < 16 {
        return Err(format!(
            "Search resolution must be at least 16, got {}",
            options.search_resolution
        )
        .into());
    }
    Ok(())
}

fn build_source(
    cli: &Cli,
    options: &RunOptions,
) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    if let Some(frame_count) = cli.synthetic {
        let source = SyntheticCoinSource::new(
            SYNTHETIC_WIDTH,
            SYNTHETIC_HEIGHT,
            frame_count,
            options.capture_fps,
        )?
        .with_discs(demo_discs());
        return Ok(Box::new(source));
    }

    let paths = ImageSequenceSource::collect_paths(&cli.images)?;
    if paths.is_empty() {
        return Err("No image files found in the given inputs".into());
    }
    log::info!("Replaying {} images", paths.len());
    let source = ImageSequenceSource::new(paths, options.capture_fps)?.with_loops(options.loops);
    Ok(Box::new(source))
}

fn demo_discs() -> Vec<Disc> {
    vec![
        Disc {
            cx: 160.0,
            cy: 240.0,
            radius: 48.0,
            vx: 1.5,
            vy: 0.0,
        },
        Disc {
            cx: 460.0,
            cy: 180.0,
            radius: 36.0,
            vx: -1.0,
            vy: 0.8,
        },
    ]
}

fn spawn_printer(batch_rx: Receiver<DetectionBatch>) -> JoinHandle<std::io::Result<u64>> {
    std::thread::spawn(move || {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        let mut printed = 0;
        for batch in batch_rx {
            serde_json::to_writer(&mut out, &BatchRecord::from(&batch))?;
            writeln!(out)?;
            printed += 1;
        }
        out.flush()?;
        Ok(printed)
    })
}

fn parse_surface(s: &str) -> Result<(f64, f64), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid surface dimension '{v}': {e}"))
    };
    Ok((parse(w)?, parse(h)?))
}
