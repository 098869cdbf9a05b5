use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use cliplane::{
    AudioBed, AudioPacing, ClipDoc, Compositor, CompositorOpts, ExportFormat, ExportOpts,
    ExportStrategy, FfmpegSink, FfmpegSinkOpts, Fps, MediaSource, ProjectDoc,
};

#[derive(Parser, Debug)]
#[command(name = "cliplane", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite a project at one point in time and write a PNG.
    Frame(FrameArgs),
    /// Export a project to `animation.mp4` / `animation.webm` (requires `ffmpeg` on PATH).
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct CanvasArgs {
    /// Output width in pixels.
    #[arg(long, default_value_t = 720)]
    width: u32,

    /// Output height in pixels.
    #[arg(long, default_value_t = 420)]
    height: u32,

    /// Frames per second.
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Length given to still images, in milliseconds.
    #[arg(long, default_value_t = 5000.0)]
    image_duration_ms: f64,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Timeline position in milliseconds.
    #[arg(long, default_value_t = 0)]
    at: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    canvas: CanvasArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    Main,
    Worker,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Directory the artifact is written to.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Container: MP4 or WEBM.
    #[arg(long, default_value = "MP4", value_parser = ExportFormat::parse)]
    format: ExportFormat,

    /// Where frames are composited.
    #[arg(long, value_enum, default_value_t = StrategyArg::Main)]
    strategy: StrategyArg,

    /// Audio file muxed under the video.
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Release audio at playback speed instead of as fast as possible.
    #[arg(long, default_value_t = false)]
    realtime_audio: bool,

    #[command(flatten)]
    canvas: CanvasArgs,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Export(args) => cmd_export(args),
    }
}

fn load_compositor(in_path: &Path, canvas: &CanvasArgs) -> anyhow::Result<Compositor> {
    let doc = ProjectDoc::from_path(in_path)?;
    let root = in_path.parent().unwrap_or_else(|| Path::new("."));

    let mut comp = Compositor::new(CompositorOpts {
        width: canvas.width,
        height: canvas.height,
        fps: Fps::whole(canvas.fps)?,
        ..CompositorOpts::default()
    })?;
    let image_duration_ms = canvas.image_duration_ms;
    let restored = comp.import_project(&doc, |clip: &ClipDoc| {
        let uri = clip.source.as_deref().ok_or_else(|| {
            cliplane::CliplaneError::load(format!("clip '{}' has no source", clip.name))
        })?;
        let path = root.join(uri);
        let source: Box<dyn MediaSource> = cliplane::open_media(&path, image_duration_ms)?;
        Ok(source)
    })?;
    tracing::info!(clips = restored, duration_ms = comp.duration_ms(), "project loaded");
    Ok(comp)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let mut comp = load_compositor(&args.in_path, &args.canvas)?;
    let frame = comp.render_at(args.at)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    frame
        .to_rgba_image()?
        .save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let mut comp = load_compositor(&args.in_path, &args.canvas)?;

    let audio = args
        .audio
        .as_deref()
        .map(AudioBed::decode)
        .transpose()
        .context("decode audio bed")?;
    let opts = ExportOpts {
        format: Some(args.format),
        strategy: match args.strategy {
            StrategyArg::Main => ExportStrategy::MainThread,
            StrategyArg::Worker => ExportStrategy::IsolatedWorker,
        },
        audio,
        audio_pacing: if args.realtime_audio {
            AudioPacing::Realtime
        } else {
            AudioPacing::Unpaced
        },
    };
    let sink = FfmpegSink::new(FfmpegSinkOpts {
        bg_rgba: comp.opts().background.to_rgba8_straight(),
        ..FfmpegSinkOpts::new(args.format)
    });

    let artifact = comp.export(&opts, Box::new(sink))?;
    let out = args.out_dir.join(&artifact.file_name);
    cliplane::encode::ffmpeg::ensure_parent_dir(&out)?;
    std::fs::write(&out, &artifact.bytes)
        .with_context(|| format!("write '{}'", out.display()))?;

    eprintln!("wrote {} ({} frames)", out.display(), artifact.frames);
    Ok(())
}
