use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use handstream_core::capture::infrastructure::ffmpeg_camera::{
    default_device, default_input_format, CameraConfig, FfmpegCamera,
};
use handstream_core::detection::infrastructure::mediapipe_hand_detector::{
    DetectorConfig, MediapipeHandDetector,
};
use handstream_core::display::domain::frame_display::FrameDisplay;
use handstream_core::display::infrastructure::null_display::NullDisplay;
use handstream_core::pipeline::pipeline_logger::LogPipelineLogger;
use handstream_core::pipeline::stream_hands_use_case::{StreamConfig, StreamHandsUseCase};
use handstream_core::shared::constants::{
    DEFAULT_CAMERA_INDEX, DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH,
    DEFAULT_DETECTION_CONFIDENCE, DEFAULT_DEST_HOST, DEFAULT_DEST_PORT, DEFAULT_DISPLAY_SCALE,
    DEFAULT_MAX_CONSECUTIVE_FAILURES, DEFAULT_MAX_HANDS, DEFAULT_TRACKING_CONFIDENCE,
    DEFAULT_WINDOW_TITLE, LANDMARK_MODEL_NAME, PALM_MODEL_NAME,
};
use handstream_core::shared::model_resolver;
use handstream_core::transport::infrastructure::udp_packet_sender::UdpPacketSender;

/// Progress lines are logged every this many frames.
const PROGRESS_EVERY: usize = 300;

/// Stream webcam hand landmarks to a UDP receiver.
#[derive(Parser)]
#[command(name = "handstream")]
struct Cli {
    /// Camera index, used when --device is not given.
    #[arg(long, default_value_t = DEFAULT_CAMERA_INDEX)]
    camera: u32,

    /// Capture device path or name (overrides --camera).
    #[arg(long)]
    device: Option<String>,

    /// libavdevice input format (v4l2, avfoundation, dshow).
    #[arg(long)]
    input_format: Option<String>,

    /// Requested capture width.
    #[arg(long, default_value_t = DEFAULT_CAPTURE_WIDTH)]
    width: u32,

    /// Requested capture height; also the height used to invert landmark y.
    #[arg(long, default_value_t = DEFAULT_CAPTURE_HEIGHT)]
    height: u32,

    /// Requested capture frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Destination host for landmark packets.
    #[arg(long, default_value = DEFAULT_DEST_HOST)]
    host: String,

    /// Destination UDP port.
    #[arg(long, default_value_t = DEFAULT_DEST_PORT)]
    port: u16,

    /// Palm detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_DETECTION_CONFIDENCE)]
    detection_confidence: f32,

    /// Landmark presence threshold for keeping a tracked hand (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_TRACKING_CONFIDENCE)]
    tracking_confidence: f32,

    /// Maximum hands to detect. Only the first is sent.
    #[arg(long, default_value_t = DEFAULT_MAX_HANDS)]
    max_hands: usize,

    /// Keep the model's mirrored handedness labels.
    #[arg(long)]
    no_flip_handedness: bool,

    /// Preview scale factor (0.0-1.0].
    #[arg(long, default_value_t = DEFAULT_DISPLAY_SCALE)]
    display_scale: f64,

    /// Preview window title.
    #[arg(long, default_value = DEFAULT_WINDOW_TITLE)]
    window_title: String,

    /// Run without a preview window.
    #[arg(long)]
    no_display: bool,

    /// Do not stop on Esc or q in the preview window.
    #[arg(long)]
    ignore_keys: bool,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// Consecutive failed reads tolerated before giving up.
    #[arg(long, default_value_t = DEFAULT_MAX_CONSECUTIVE_FAILURES)]
    max_capture_failures: usize,

    /// Palm detection ONNX model (skips model lookup).
    #[arg(long)]
    palm_model: Option<PathBuf>,

    /// Hand landmark ONNX model (skips model lookup).
    #[arg(long)]
    landmark_model: Option<PathBuf>,

    /// Directory searched for models after the cache.
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// URL to download the palm model from when it is not found locally.
    #[arg(long)]
    palm_model_url: Option<String>,

    /// URL to download the landmark model from when it is not found locally.
    #[arg(long)]
    landmark_model_url: Option<String>,
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
    validate(&cli)?;

    let dest = resolve_dest(&cli.host, cli.port)?;
    let camera = FfmpegCamera::new(camera_config(&cli));
    log::info!(
        "Capturing from {} ({}) at {}x{}, sending to {dest}",
        camera.config().device,
        camera.config().input_format,
        cli.width,
        cli.height
    );

    let detector = build_detector(&cli)?;
    let sender = UdpPacketSender::new(dest)?;
    let display = build_display(&cli);

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })?;

    let config = StreamConfig {
        flip_height: i32::try_from(cli.height)?,
        display_scale: cli.display_scale,
        max_consecutive_failures: cli.max_capture_failures,
        max_frames: cli.max_frames,
        quit_on_key: !cli.ignore_keys,
    };

    let mut use_case = StreamHandsUseCase::new(
        Box::new(camera),
        Box::new(detector),
        Box::new(sender),
        display,
        Box::new(LogPipelineLogger::new(PROGRESS_EVERY)),
        config,
        cancel,
    );
    use_case.execute()?;

    Ok(())
}

fn camera_config(cli: &Cli) -> CameraConfig {
    CameraConfig {
        device: cli
            .device
            .clone()
            .unwrap_or_else(|| default_device(cli.camera)),
        input_format: cli
            .input_format
            .clone()
            .unwrap_or_else(|| default_input_format().to_string()),
        width: cli.width,
        height: cli.height,
        fps: cli.fps,
    }
}

fn resolve_dest(host: &str, port: u16) -> Result<SocketAddr, Box<dyn std::error::Error>> {
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| format!("Could not resolve destination host '{host}'").into())
}

fn build_detector(cli: &Cli) -> Result<MediapipeHandDetector, Box<dyn std::error::Error>> {
    let palm_model = model_path(
        cli.palm_model.as_deref(),
        PALM_MODEL_NAME,
        cli.palm_model_url.as_deref(),
        cli.models_dir.as_deref(),
    )?;
    let landmark_model = model_path(
        cli.landmark_model.as_deref(),
        LANDMARK_MODEL_NAME,
        cli.landmark_model_url.as_deref(),
        cli.models_dir.as_deref(),
    )?;

    let config = DetectorConfig {
        detection_confidence: cli.detection_confidence,
        tracking_confidence: cli.tracking_confidence,
        max_hands: cli.max_hands,
        flip_handedness: !cli.no_flip_handedness,
    };
    MediapipeHandDetector::from_models(&palm_model, &landmark_model, config)
}

fn model_path(
    explicit: Option<&Path>,
    name: &str,
    url: Option<&str>,
    models_dir: Option<&Path>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(format!("Model file not found: {}", path.display()).into());
        }
        return Ok(path.to_path_buf());
    }

    log::info!("Resolving model: {name}");
    let label = name.to_string();
    let progress: model_resolver::ProgressFn =
        Box::new(move |downloaded, total| download_progress(&label, downloaded, total));
    let path = model_resolver::resolve(name, url, models_dir, Some(progress))?;
    log::debug!("Using {name} at {}", path.display());
    Ok(path)
}

fn build_display(cli: &Cli) -> Box<dyn FrameDisplay> {
    if cli.no_display {
        return Box::new(NullDisplay::new());
    }
    window_display(&cli.window_title)
}

#[cfg(feature = "window")]
fn window_display(title: &str) -> Box<dyn FrameDisplay> {
    use handstream_core::display::infrastructure::opencv_window::OpencvWindow;
    Box::new(OpencvWindow::new(title))
}

#[cfg(not(feature = "window"))]
fn window_display(_title: &str) -> Box<dyn FrameDisplay> {
    log::warn!("Built without the `window` feature; running headless");
    Box::new(NullDisplay::new())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.width == 0 || cli.height == 0 {
        return Err(format!(
            "Capture size must be non-zero, got {}x{}",
            cli.width, cli.height
        )
        .into());
    }
    if i32::try_from(cli.width).is_err() || i32::try_from(cli.height).is_err() {
        return Err(format!(
            "Capture size must fit in a signed 32-bit pixel coordinate, got {}x{}",
            cli.width, cli.height
        )
        .into());
    }
    if cli.fps == Some(0) {
        return Err("Frame rate must be positive".into());
    }
    if cli.port == 0 {
        return Err("Destination port must be non-zero".into());
    }
    if !(0.0..=1.0).contains(&cli.detection_confidence) {
        return Err(format!(
            "Detection confidence must be between 0.0 and 1.0, got {}",
            cli.detection_confidence
        )
        .into());
    }
    if !(0.0..=1.0).contains(&cli.tracking_confidence) {
        return Err(format!(
            "Tracking confidence must be between 0.0 and 1.0, got {}",
            cli.tracking_confidence
        )
        .into());
    }
    if cli.max_hands == 0 {
        return Err("Max hands must be at least 1".into());
    }
    if !(cli.display_scale > 0.0 && cli.display_scale <= 1.0) {
        return Err(format!(
            "Display scale must be in (0.0, 1.0], got {}",
            cli.display_scale
        )
        .into());
    }
    if cli.max_frames == Some(0) {
        return Err("Max frames must be at least 1".into());
    }
    if cli.max_capture_failures == 0 {
        return Err("Max capture failures must be at least 1".into());
    }
    Ok(())
}

fn download_progress(name: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {name}... {pct}%");
    } else {
        eprint!("\rDownloading {name}... {downloaded} bytes");
    }
    if total > 0 && downloaded >= total {
        eprintln!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["handstream"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_defaults_match_constants() {
        let cli = parse(&[]);
        assert_eq!(cli.camera, 0);
        assert_eq!(cli.width, 1280);
        assert_eq!(cli.height, 720);
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.port, 5053);
        assert_eq!(cli.detection_confidence, 0.8);
        assert_eq!(cli.tracking_confidence, 0.5);
        assert_eq!(cli.max_hands, 1);
        assert_eq!(cli.display_scale, 0.5);
        assert_eq!(cli.window_title, "Image");
        assert!(!cli.no_display);
        assert!(validate(&cli).is_ok());
    }

    #[test]
    fn test_device_overrides_camera_index() {
        let cli = parse(&["--camera", "3", "--device", "/dev/video9"]);
        assert_eq!(camera_config(&cli).device, "/dev/video9");

        let cli = parse(&["--camera", "3"]);
        assert_eq!(camera_config(&cli).device, default_device(3));
    }

    #[test]
    fn test_validate_rejects_bad_confidence() {
        let cli = parse(&["--detection-confidence", "1.5"]);
        assert!(validate(&cli).is_err());
        let cli = parse(&["--tracking-confidence", "-0.1"]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_scale() {
        assert!(validate(&parse(&["--display-scale", "0"])).is_err());
        assert!(validate(&parse(&["--display-scale", "1.5"])).is_err());
        assert!(validate(&parse(&["--display-scale", "1.0"])).is_ok());
    }

    #[test]
    fn test_validate_rejects_sizes_beyond_i32() {
        assert!(validate(&parse(&["--height", "3000000000"])).is_err());
        assert!(validate(&parse(&["--width", "2147483648"])).is_err());
        assert!(validate(&parse(&["--height", "2147483647"])).is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_sizes_and_limits() {
        assert!(validate(&parse(&["--height", "0"])).is_err());
        assert!(validate(&parse(&["--max-hands", "0"])).is_err());
        assert!(validate(&parse(&["--max-frames", "0"])).is_err());
        assert!(validate(&parse(&["--port", "0"])).is_err());
    }

    #[test]
    fn test_resolve_dest_loopback() {
        let addr = resolve_dest("127.0.0.1", 5053).unwrap();
        assert_eq!(addr, "127.0.0.1:5053".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_missing_explicit_model_is_an_error() {
        let result = model_path(
            Some(Path::new("/nonexistent/palm.onnx")),
            PALM_MODEL_NAME,
            None,
            None,
        );
        assert!(result.is_err());
    }
}
