//! imgstage: load, resize, rotate and write images from the command line.

mod ops;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use imgstage_core::encode::{DEFAULT_JPEG_QUALITY, DEFAULT_PNG_COMPRESSION};
use imgstage_core::{ImageFormat, ImageMetadata, OutputFormat, StageConfig, StageImage, StreamResponse};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::ops::Operation;

#[derive(Parser)]
#[command(name = "imgstage")]
#[command(about = "Resize, rotate and convert JPEG, PNG and GIF images")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print metadata of an image
    Info {
        /// Path to image file
        path: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply operations and write the result
    Process(ProcessArgs),
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// Source image
    input: PathBuf,

    /// Operation to apply, in order (e.g. `fit:400x400:255,255,255`, `rotate:30`, `cw`)
    #[arg(long = "op", value_name = "OP")]
    ops: Vec<Operation>,

    /// Write the result to this file
    #[arg(short, long, conflicts_with = "stdout", required_unless_present = "stdout")]
    output: Option<PathBuf>,

    /// Stream a CGI-style response to stdout
    #[arg(long)]
    stdout: bool,

    /// Output format (default: from the output extension, then the source)
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// JPEG quality 0-100
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    quality: Option<u8>,

    /// PNG compression level 0-9
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=9))]
    compression: Option<u8>,

    /// TOML file with stage settings
    #[arg(long, env = "IMGSTAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Octal permission bits for the saved file (overrides the config)
    #[arg(long, value_parser = parse_mode)]
    mode: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    #[value(alias = "jpg")]
    Jpeg,
    Png,
    Gif,
}

impl From<FormatArg> for ImageFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Jpeg => ImageFormat::Jpeg,
            FormatArg::Png => ImageFormat::Png,
            FormatArg::Gif => ImageFormat::Gif,
        }
    }
}

#[derive(Serialize)]
struct InfoReport<'a> {
    path: &'a Path,
    #[serde(flatten)]
    metadata: &'a ImageMetadata,
    aspect_ratio: f64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Info { path, json } => {
            let stage = StageImage::open_with(&path, StageConfig::default().silent())?;
            let meta = stage.metadata();
            if json {
                let report = InfoReport {
                    path: &path,
                    metadata: meta,
                    aspect_ratio: meta.aspect_ratio(),
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Format: {:?}", meta.format);
                println!("MIME: {}", meta.mime);
                println!("Dimensions: {}x{}", meta.width, meta.height);
                println!("Bits: {}", meta.bits);
                println!("Channels: {}", meta.channels);
                println!("Aspect Ratio: {:.2}", meta.aspect_ratio());
                println!(
                    "Orientation: {}",
                    if meta.is_landscape() {
                        "Landscape"
                    } else if meta.is_portrait() {
                        "Portrait"
                    } else {
                        "Square"
                    }
                );
            }
        }

        Commands::Process(args) => {
            let stdout = io::stdout();
            run_process(&args, stdout.lock())?;
        }
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise `warn`, or `debug` with `-v`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(io::stderr)
        .init();
}

fn run_process<W: Write>(args: &ProcessArgs, out: W) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref(), args.mode)?;
    let mut stage = StageImage::open_with(&args.input, config)?;

    for op in &args.ops {
        op.apply(&mut stage)
            .with_context(|| format!("Failed to apply {op:?}"))?;
    }

    let format = resolve_format(args, stage.metadata().format);
    debug!(?format, ops = args.ops.len(), "Writing result");

    match &args.output {
        Some(path) => {
            stage.save(path, format)?;
            info!(path = %path.display(), size = ?stage.dimensions(), "Saved");
        }
        None => {
            let mut sink = StreamResponse::new(out);
            stage.output(format, &mut sink)?;
        }
    }

    Ok(())
}

/// Stage settings for `process`.
///
/// Open failures come back through `main`, so the stage never logs them itself.
fn load_config(path: Option<&Path>, mode: Option<u32>) -> anyhow::Result<StageConfig> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config `{}`", path.display()))?;
            toml::from_str::<StageConfig>(&text)
                .with_context(|| format!("Invalid config `{}`", path.display()))?
        }
        None => StageConfig::default(),
    };
    if let Some(mode) = mode {
        config.file_mode = mode;
    }
    Ok(config.silent())
}

/// Explicit `--format`, else the output extension, else the source format.
fn resolve_format(args: &ProcessArgs, source: ImageFormat) -> OutputFormat {
    let format = args
        .format
        .map(ImageFormat::from)
        .or_else(|| {
            args.output
                .as_deref()
                .and_then(Path::extension)
                .and_then(|ext| ext.to_str())
                .and_then(ImageFormat::from_extension)
        })
        .unwrap_or(source);

    match format {
        ImageFormat::Jpeg => OutputFormat::Jpeg {
            quality: args.quality.unwrap_or(DEFAULT_JPEG_QUALITY),
        },
        ImageFormat::Png => OutputFormat::Png {
            compression: args.compression.unwrap_or(DEFAULT_PNG_COMPRESSION),
        },
        ImageFormat::Gif => OutputFormat::Gif,
    }
}

/// Parse permission bits written in octal, with or without a `0o` / `0` prefix.
fn parse_mode(s: &str) -> Result<u32, String> {
    let digits = s.strip_prefix("0o").unwrap_or(s);
    let mode = u32::from_str_radix(digits, 8).map_err(|_| format!("`{s}` is not an octal mode"))?;
    if mode > 0o7777 {
        return Err(format!("mode `{s}` is out of range"));
    }
    Ok(mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};
    use imgstage_core::ErrorReporting;
    use tempfile::TempDir;

    fn write_fixture(dir: &TempDir, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.path().join(name);
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 255])))
            .save(&path)
            .unwrap();
        path
    }

    fn args(input: PathBuf) -> ProcessArgs {
        ProcessArgs {
            input,
            ops: Vec::new(),
            output: None,
            stdout: true,
            format: None,
            quality: None,
            compression: None,
            config: None,
            mode: None,
        }
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parses_process() {
        let cli = Cli::try_parse_from([
            "imgstage", "process", "in.png", "--op", "fit:40x40", "--op", "cw", "-o", "out.jpg",
            "--quality", "80", "--mode", "644",
        ])
        .unwrap();
        let Commands::Process(args) = cli.command else {
            panic!("expected process");
        };
        assert_eq!(args.ops.len(), 2);
        assert_eq!(args.output.as_deref(), Some(Path::new("out.jpg")));
        assert_eq!(args.quality, Some(80));
        assert_eq!(args.mode, Some(0o644));
    }

    #[test]
    fn test_cli_requires_a_destination() {
        assert!(Cli::try_parse_from(["imgstage", "process", "in.png"]).is_err());
        assert!(Cli::try_parse_from(["imgstage", "process", "in.png", "-o", "a.png", "--stdout"]).is_err());
        assert!(Cli::try_parse_from(["imgstage", "process", "in.png", "--op", "spin", "--stdout"]).is_err());
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("755"), Ok(0o755));
        assert_eq!(parse_mode("0644"), Ok(0o644));
        assert_eq!(parse_mode("0o600"), Ok(0o600));
        assert!(parse_mode("9").is_err());
        assert!(parse_mode("77777").is_err());
    }

    #[test]
    fn test_resolve_format_precedence() {
        let mut a = args(PathBuf::from("in.png"));
        assert_eq!(
            resolve_format(&a, ImageFormat::Gif),
            OutputFormat::Gif,
            "falls back to the source format"
        );

        a.output = Some(PathBuf::from("out.JPG"));
        a.quality = Some(70);
        assert_eq!(
            resolve_format(&a, ImageFormat::Gif),
            OutputFormat::Jpeg { quality: 70 }
        );

        a.format = Some(FormatArg::Png);
        assert_eq!(
            resolve_format(&a, ImageFormat::Gif),
            OutputFormat::Png { compression: 0 }
        );
    }

    #[test]
    fn test_load_config_with_mode_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stage.toml");
        fs::write(&path, "on_error = \"silent\"\nfile_mode = 0o700\n").unwrap();

        let config = load_config(Some(&path), None).unwrap();
        assert_eq!(config.file_mode, 0o700);

        let config = load_config(Some(&path), Some(0o640)).unwrap();
        assert_eq!(config.file_mode, 0o640);

        assert!(load_config(Some(&dir.path().join("missing.toml")), None).is_err());
    }

    #[test]
    fn test_open_failures_are_not_logged_by_the_stage() {
        assert_eq!(load_config(None, None).unwrap().on_error, ErrorReporting::Silent);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stage.toml");
        fs::write(&path, "on_error = \"report\"\n").unwrap();
        let config = load_config(Some(&path), None).unwrap();
        assert_eq!(config.on_error, ErrorReporting::Silent);
        assert_eq!(config.file_mode, imgstage_core::DEFAULT_FILE_MODE);
    }

    #[test]
    fn test_process_to_stdout() {
        let dir = TempDir::new().unwrap();
        let input = write_fixture(&dir, "src.png", 80, 60);

        let mut a = args(input);
        a.ops = vec!["long-edge:40".parse().unwrap(), "cw".parse().unwrap()];

        let mut out = Vec::new();
        run_process(&a, &mut out).unwrap();

        let header = b"Content-Type: image/png\r\n";
        assert_eq!(&out[..header.len()], header);
        let body_start = out.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
        let decoded = image::load_from_memory(&out[body_start..]).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (30, 40));
    }

    #[test]
    fn test_process_to_file() {
        let dir = TempDir::new().unwrap();
        let input = write_fixture(&dir, "src.png", 80, 60);
        let output = dir.path().join("out.gif");

        let mut a = args(input);
        a.stdout = false;
        a.output = Some(output.clone());
        a.ops = vec!["fill:20x20".parse().unwrap()];
        a.mode = Some(0o600);

        let mut out = Vec::new();
        run_process(&a, &mut out).unwrap();
        assert!(out.is_empty());

        let (image, meta) = imgstage_core::decode::load_image(&output).unwrap();
        assert_eq!(meta.format, ImageFormat::Gif);
        assert_eq!((image.width(), image.height()), (20, 20));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&output).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_process_failed_op_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let input = write_fixture(&dir, "src.png", 10, 10);

        let mut a = args(input);
        a.ops = vec!["scale:0".parse().unwrap()];

        let mut out = Vec::new();
        assert!(run_process(&a, &mut out).is_err());
        assert!(out.is_empty());
    }
}
