use clap::{Parser, Subcommand};
use rayon::prelude::*;
use roast_scan::camera::replay::ReplayPlatform;
use roast_scan::camera::{CameraPlatform, Frame, FrameSink, SinkError, StreamInfo};
use roast_scan::device::{list_video_devices, select_preferred};
use roast_scan::generator::{CodeGenerator, HtmlFilePrintTarget};
use roast_scan::tools::dataset_iter;
use roast_scan::{
    DecodeError, ImageScanError, ImageScanner, QrFrameDecoder, ResolvedRecord, ScanConfig,
    Scanner, resolve,
};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "roastscan", version, about = "Scan, resolve and generate roastery QR labels")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode the first QR code in an image file
    Decode {
        image: PathBuf,
        /// Also resolve the decoded text into a record
        #[arg(long)]
        resolve: bool,
    },
    /// Resolve decoded text into a record and print it as JSON
    Resolve { text: String },
    /// Generate a QR image for a JSON record
    Generate {
        /// Record as JSON text
        #[arg(long, conflicts_with = "file")]
        json: Option<String>,
        /// Read the record from a JSON file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// File name for the image (sanitized)
        #[arg(long, default_value = "qr-code")]
        name: String,
        /// Also write a printable HTML page to this path
        #[arg(long)]
        print: Option<PathBuf>,
    },
    /// List video devices
    Devices {
        /// Enumerate a replay directory instead of real cameras
        #[arg(long)]
        replay: Option<PathBuf>,
    },
    /// Run a capture session over a directory of frames
    Replay {
        root: PathBuf,
        /// Stop after the first decoded code
        #[arg(long)]
        once: bool,
        /// Request a stop after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Run a capture session on the preferred native camera
    #[cfg(feature = "webcam")]
    Scan {
        /// Stop after the first decoded code
        #[arg(long)]
        once: bool,
        /// Request a stop after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Decode every image under a directory in parallel and report the read rate
    Batch {
        root: PathBuf,
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn init_tracing() {
    let default = if std::env::var_os("QR_DEBUG").is_some() {
        "roast_scan=debug,roastscan=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let config = ScanConfig::from_env();

    let result = match cli.command {
        Command::Decode { image, resolve } => decode_cmd(&config, &image, resolve).await,
        Command::Resolve { text } => resolve_cmd(&text),
        Command::Generate {
            json,
            file,
            out,
            name,
            print,
        } => generate_cmd(&config, json, file, &out, &name, print).await,
        Command::Devices { replay } => match replay {
            Some(root) => match replay_platform(&root) {
                Ok(platform) => devices_cmd(&platform).await,
                Err(err) => Err(err),
            },
            None => native_devices_cmd().await,
        },
        Command::Replay {
            root,
            once,
            timeout_secs,
        } => match replay_platform(&root) {
            Ok(platform) => scan_cmd(platform, config, once, timeout_secs).await,
            Err(err) => Err(err),
        },
        #[cfg(feature = "webcam")]
        Command::Scan { once, timeout_secs } => {
            let platform = roast_scan::camera::webcam::WebcamPlatform::new();
            scan_cmd(platform, config, once, timeout_secs).await
        }
        Command::Batch { root, limit } => batch_cmd(&config, &root, limit),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.code {
                Some(code) => eprintln!("error [{code}]: {}", err.message),
                None => eprintln!("{}", err.message),
            }
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), DecodeError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| DecodeError::uncoded(format!("failed to render JSON: {e}")))?;
    println!("{text}");
    Ok(())
}

fn replay_platform(root: &Path) -> Result<ReplayPlatform, DecodeError> {
    ReplayPlatform::from_dir(root).map_err(|e| {
        DecodeError::new(
            roast_scan::ErrorCode::FileReadError,
            format!("failed to load frames from {}: {e}", root.display()),
        )
    })
}

async fn decode_cmd(config: &ScanConfig, image: &Path, with_record: bool) -> Result<(), DecodeError> {
    let scanner = ImageScanner::new(config.clone());
    let result = scanner.decode_file(image).await?;
    println!("{} ({})", result.text, result.format);
    if with_record {
        print_json(&resolve(&result.text))?;
    }
    Ok(())
}

fn resolve_cmd(text: &str) -> Result<(), DecodeError> {
    let record = resolve(text);
    print_json(&record)?;
    if let Some(key) = record.lookup_key() {
        eprintln!("lookup key: {key}");
    }
    Ok(())
}

async fn generate_cmd(
    config: &ScanConfig,
    json: Option<String>,
    file: Option<PathBuf>,
    out: &Path,
    name: &str,
    print: Option<PathBuf>,
) -> Result<(), DecodeError> {
    let text = match (json, file) {
        (Some(text), _) => text,
        (None, Some(path)) => tokio::fs::read_to_string(&path).await.map_err(|e| {
            DecodeError::new(
                roast_scan::ErrorCode::FileReadError,
                format!("{}: {e}", path.display()),
            )
        })?,
        (None, None) => return Err(DecodeError::uncoded("pass --json or --file")),
    };
    let record: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| DecodeError::uncoded(format!("record is not valid JSON: {e}")))?;

    let generator = CodeGenerator::from_config(config)
        .map_err(|e| DecodeError::uncoded(e.to_string()))?;
    let handle = generator.generate(&record).await?;

    let path = handle
        .download(out, name)
        .await
        .map_err(|e| DecodeError::uncoded(e.to_string()))?;
    println!("saved {}", path.display());

    if let Some(print_path) = print {
        let mut target = HtmlFilePrintTarget::new(print_path);
        handle
            .print(&mut target, name)
            .await
            .map_err(|e| DecodeError::uncoded(e.to_string()))?;
        println!("printable page {}", target.path().display());
    }
    Ok(())
}

async fn devices_cmd<P: CameraPlatform>(platform: &P) -> Result<(), DecodeError> {
    let devices = list_video_devices(platform).await?;
    if devices.is_empty() {
        println!("No video devices");
        return Ok(());
    }
    let preferred = select_preferred(&devices).map(|d| d.id.clone());
    for device in &devices {
        let marker = if Some(&device.id) == preferred.as_ref() { "*" } else { " " };
        println!("{marker} {}\t{}", device.id, device.label);
    }
    Ok(())
}

#[cfg(feature = "webcam")]
async fn native_devices_cmd() -> Result<(), DecodeError> {
    devices_cmd(&roast_scan::camera::webcam::WebcamPlatform::new()).await
}

#[cfg(not(feature = "webcam"))]
async fn native_devices_cmd() -> Result<(), DecodeError> {
    Err(DecodeError::new(
        roast_scan::ErrorCode::NotSupported,
        "built without native camera support; rebuild with --features webcam or pass --replay",
    ))
}

/// Counts frames and logs stream binding
#[derive(Default)]
struct ConsoleSink {
    frames: AtomicU64,
}

impl FrameSink for ConsoleSink {
    fn attach(&self, stream: &StreamInfo) -> Result<(), SinkError> {
        tracing::info!(device = %stream.label, width = stream.width, height = stream.height, "preview attached");
        Ok(())
    }

    fn present(&self, _frame: &Frame) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    fn detach(&self) {
        tracing::info!(frames = self.frames.load(Ordering::Relaxed), "preview detached");
    }
}

async fn scan_cmd<P: CameraPlatform>(
    platform: P,
    config: ScanConfig,
    once: bool,
    timeout_secs: Option<u64>,
) -> Result<(), DecodeError> {
    let sink = Arc::new(ConsoleSink::default());
    let mut scanner = Scanner::with_decoder(platform, QrFrameDecoder::new(), config);

    if once {
        let result = scanner.scan_once(sink).await.map_err(into_decode_error)?;
        println!("{}", result.text);
        return print_json(&resolve(&result.text));
    }

    scanner.start(sink.clone()).await.map_err(into_decode_error)?;
    if let (Some(secs), Some(handle)) = (timeout_secs, scanner.stop_handle()) {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            handle.stop();
        });
    }

    let mut decoded = 0usize;
    let mut last_error = None;
    scanner
        .run(
            |result| {
                decoded += 1;
                let record = resolve(&result.text);
                let kind = match &record {
                    ResolvedRecord::Structured(_) => "record",
                    ResolvedRecord::Fallback(f) => f.kind.as_str(),
                };
                println!("[{kind}] {}", result.text);
                ControlFlow::Continue(())
            },
            |err| {
                eprintln!("warning: {err}");
                last_error = Some(err);
                ControlFlow::Continue(())
            },
        )
        .await;

    println!(
        "decoded {decoded} code(s) over {} frame(s)",
        sink.frames.load(Ordering::Relaxed)
    );
    match last_error {
        Some(err) if err.is(roast_scan::ErrorCode::CameraError) => Err(err),
        _ => Ok(()),
    }
}

fn into_decode_error(err: roast_scan::ScanError) -> DecodeError {
    match err {
        roast_scan::ScanError::Capture(inner) => inner,
        other => DecodeError::uncoded(other.to_string()),
    }
}

fn batch_cmd(config: &ScanConfig, root: &Path, limit: Option<usize>) -> Result<(), DecodeError> {
    let images: Vec<PathBuf> = dataset_iter(root, limit).collect();
    if images.is_empty() {
        return Err(DecodeError::uncoded(format!(
            "no images under {}",
            root.display()
        )));
    }

    let scanner = ImageScanner::new(config.clone());
    let start = Instant::now();
    let outcomes: Vec<(PathBuf, Result<String, ImageScanError>)> = images
        .par_iter()
        .map(|path| {
            let result = std::fs::read(path)
                .map_err(|e| ImageScanError::FileRead(e.to_string()))
                .and_then(|bytes| scanner.decode_bytes(&bytes))
                .map(|r| r.text);
            (path.clone(), result)
        })
        .collect();
    let elapsed = start.elapsed();

    let mut decoded = 0usize;
    for (path, result) in &outcomes {
        match result {
            Ok(text) => {
                decoded += 1;
                println!("ok    {}: {}", path.display(), text);
            }
            Err(err) => println!("miss  {}: {}", path.display(), err),
        }
    }

    let total = outcomes.len();
    println!();
    println!(
        "decoded {decoded}/{total} = {:.2}% in {:.2?} ({:.1} ms/image)",
        decoded as f64 / total as f64 * 100.0,
        elapsed,
        elapsed.as_secs_f64() * 1000.0 / total as f64
    );
    Ok(())
}
