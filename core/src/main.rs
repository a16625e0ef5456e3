use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use phobz_keypoints::pipeline::config::{parse_codec, parse_plots};
use phobz_keypoints::pipeline::{analyze_audio_file, load_config, render_video, PipelineConfig};
use phobz_keypoints::AnalysisConfig;

/// Audio keypoint analysis and synchronized feature videos.
#[derive(Parser, Debug)]
#[command(name = "phobz-keypoints", version, about, long_about = None)]
struct Cli {
    /// Log level: error, warn, info, debug, trace. RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract features, onsets, beats and the tempogram from an audio file.
    Analyze(AnalyzeArgs),
    /// Render the four-panel keypoint video with the source audio.
    Render(RenderArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    audio: PathBuf,

    /// Analysis sample rate in Hz; 0 keeps the file's rate.
    #[arg(long, default_value_t = phobz_keypoints::audio::DEFAULT_SAMPLE_RATE)]
    sr: u32,

    /// Print the full analysis as JSON instead of the summary.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Write the output to a file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    audio: PathBuf,

    /// Output video file.
    #[arg(short, long)]
    output: PathBuf,

    /// TOML file with [render] and [analysis] tables.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    #[arg(long)]
    fps: Option<u32>,

    /// h264, prores4444 or vp9.
    #[arg(long)]
    codec: Option<String>,

    /// Comma-separated panels, top to bottom.
    #[arg(long, value_delimiter = ',')]
    plots: Option<Vec<String>>,

    /// Write PNG frames here, then mux them with the audio.
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// ffmpeg executable.
    #[arg(long)]
    ffmpeg: Option<PathBuf>,
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();
}

fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

fn analyze(args: AnalyzeArgs) -> Result<()> {
    let config = AnalysisConfig {
        target_sample_rate: (args.sr > 0).then_some(args.sr),
        ..Default::default()
    };
    let (analysis, _) = analyze_audio_file(&args.audio, &config)
        .with_context(|| format!("Failed to analyze {}", args.audio.display()))?;

    let text = if args.json {
        analysis.to_json().context("Failed to serialize analysis")?
    } else {
        analysis.summary()
    };
    write_output(args.output.as_deref(), &text)
}

fn render_config(args: &RenderArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(v) = args.width {
        config.width = v;
    }
    if let Some(v) = args.height {
        config.height = v;
    }
    if let Some(v) = args.fps {
        config.fps = v;
    }
    if let Some(v) = &args.codec {
        config.codec = parse_codec(v)?;
    }
    if let Some(v) = &args.plots {
        config.plots = parse_plots(v)?;
    }
    if let Some(v) = &args.frames_dir {
        config.frames_dir = Some(v.clone());
    }
    if let Some(v) = &args.ffmpeg {
        config.ffmpeg = v.clone();
    }

    if config.plots.is_empty() {
        bail!("At least one plot is required");
    }
    Ok(config)
}

fn render(args: RenderArgs) -> Result<()> {
    let config = render_config(&args)?;
    let stats = render_video(&args.audio, &args.output, &config, None)
        .with_context(|| format!("Failed to render {}", args.output.display()))?;

    log::info!(
        "Done: {} frames, {:.2}s, {:.1} BPM -> {}",
        stats.frames,
        stats.duration,
        stats.tempo,
        args.output.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Command::Analyze(args) => analyze(args),
        Command::Render(args) => render(args),
    }
}
