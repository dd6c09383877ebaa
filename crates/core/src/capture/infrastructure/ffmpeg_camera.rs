use crate::capture::domain::capture_metadata::CaptureMetadata;
use crate::capture::domain::frame_source::FrameSource;
use crate::shared::constants::{DEFAULT_CAMERA_INDEX, DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH};
use crate::shared::frame::Frame;

/// Pause before polling again when a non-blocking device has no packet.
const RETRY_DELAY: std::time::Duration = std::time::Duration::from_millis(2);

/// Webcam settings. The requested size is a hint; drivers may grant another.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    /// Device path or name as understood by `input_format`.
    pub device: String,
    /// libavdevice demuxer name (`v4l2`, `avfoundation`, `dshow`).
    pub input_format: String,
    pub width: u32,
    pub height: u32,
    pub fps: Option<u32>,
}

impl CameraConfig {
    /// Config for the platform camera at `index`.
    pub fn for_index(index: u32) -> Self {
        Self {
            device: default_device(index),
            input_format: default_input_format().to_string(),
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            fps: None,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self::for_index(DEFAULT_CAMERA_INDEX)
    }
}

/// Platform device name for a numeric camera index.
pub fn default_device(index: u32) -> String {
    #[cfg(target_os = "macos")]
    {
        index.to_string()
    }
    #[cfg(target_os = "windows")]
    {
        format!("video={index}")
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        format!("/dev/video{index}")
    }
}

pub fn default_input_format() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "avfoundation"
    }
    #[cfg(target_os = "windows")]
    {
        "dshow"
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        "v4l2"
    }
}

/// Captures webcam frames through libavdevice and converts them to RGB24.
pub struct FfmpegCamera {
    config: CameraConfig,
    state: Option<CaptureState>,
    frame_index: usize,
}

struct CaptureState {
    input: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
    eof: bool,
}

// Safety: FfmpegCamera is only used from the pipeline thread.
// The raw pointers inside ffmpeg types are never shared across threads.
unsafe impl Send for FfmpegCamera {}

impl FfmpegCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            state: None,
            frame_index: 0,
        }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    fn find_input_format(
        name: &str,
    ) -> Result<ffmpeg_next::format::Input, Box<dyn std::error::Error>> {
        ffmpeg_next::device::input::video()
            .find(|fmt| fmt.name() == name)
            .ok_or_else(|| format!("Capture input format '{name}' is not available").into())
    }

    fn capture_options(&self) -> ffmpeg_next::Dictionary<'static> {
        let mut opts = ffmpeg_next::Dictionary::new();
        opts.set(
            "video_size",
            &format!("{}x{}", self.config.width, self.config.height),
        );
        if let Some(fps) = self.config.fps {
            opts.set("framerate", &fps.to_string());
        }
        opts
    }
}

impl FrameSource for FfmpegCamera {
    fn open(&mut self) -> Result<CaptureMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        ffmpeg_next::device::register_all();

        let format = Self::find_input_format(&self.config.input_format)?;
        let ctx = ffmpeg_next::format::open_with(
            &self.config.device,
            &ffmpeg_next::format::Format::Input(format),
            self.capture_options(),
        )?;
        let input = match ctx {
            ffmpeg_next::format::context::Context::Input(input) => input,
            _ => return Err(format!("{} did not open as an input", self.config.device).into()),
        };

        let stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let stream_index = stream.index();
        let rate = stream.avg_frame_rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;
        let width = decoder.width();
        let height = decoder.height();
        let pixel_format = format!("{:?}", decoder.format()).to_lowercase();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        let metadata = CaptureMetadata {
            width,
            height,
            fps,
            pixel_format,
            device: self.config.device.clone(),
        };
        if !metadata.matches_resolution(self.config.width, self.config.height) {
            log::warn!(
                "Requested {}x{} but {} granted {width}x{height}",
                self.config.width,
                self.config.height,
                self.config.device
            );
        }

        self.state = Some(CaptureState {
            input,
            decoder,
            scaler,
            stream_index,
            width,
            height,
            eof: false,
        });
        self.frame_index = 0;

        Ok(metadata)
    }

    fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let Some(state) = self.state.as_mut() else {
            return Err("FfmpegCamera: not opened".into());
        };

        loop {
            if let Some(pixels) = state.try_receive()? {
                let frame = Frame::new(pixels, state.width, state.height, 3, self.frame_index);
                self.frame_index += 1;
                return Ok(Some(frame));
            }
            if state.eof {
                return Ok(None);
            }

            let mut packet = ffmpeg_next::Packet::empty();
            match packet_status(packet.read(&mut state.input))? {
                PacketStatus::Ready => {
                    if packet.stream() != state.stream_index {
                        continue;
                    }
                    state.decoder.send_packet(&packet)?;
                }
                PacketStatus::Retry => {
                    std::thread::sleep(RETRY_DELAY);
                }
                PacketStatus::Eof => {
                    if let Err(e) = state.decoder.send_eof() {
                        log::debug!("Decoder flush on {}: {e}", self.config.device);
                    }
                    state.eof = true;
                }
            }
        }
    }

    fn close(&mut self) {
        if self.state.take().is_some() {
            log::debug!("Closed capture device {}", self.config.device);
        }
    }
}

impl CaptureState {
    /// Pulls one decoded frame if the decoder has one ready.
    fn try_receive(&mut self) -> Result<Option<Vec<u8>>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if !frame_received(self.decoder.receive_frame(&mut decoded))? {
            return Ok(None);
        }
        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&decoded, &mut rgb_frame)?;
        Ok(Some(extract_rgb_pixels(
            rgb_frame.data(0),
            rgb_frame.stride(0),
            self.width,
            self.height,
        )))
    }
}

#[derive(Debug, PartialEq, Eq)]
enum PacketStatus {
    Ready,
    /// Device had nothing to deliver yet.
    Retry,
    Eof,
}

/// Classifies the result of one packet read. Device errors such as an
/// unplugged camera are passed up so the caller can count them.
fn packet_status(
    result: Result<(), ffmpeg_next::Error>,
) -> Result<PacketStatus, ffmpeg_next::Error> {
    match result {
        Ok(()) => Ok(PacketStatus::Ready),
        Err(ffmpeg_next::Error::Eof) => Ok(PacketStatus::Eof),
        Err(e) if is_again(&e) => Ok(PacketStatus::Retry),
        Err(e) => Err(e),
    }
}

/// `Ok(false)` when the decoder needs more input or is drained.
fn frame_received(result: Result<(), ffmpeg_next::Error>) -> Result<bool, ffmpeg_next::Error> {
    match result {
        Ok(()) => Ok(true),
        Err(ffmpeg_next::Error::Eof) => Ok(false),
        Err(e) if is_again(&e) => Ok(false),
        Err(e) => Err(e),
    }
}

fn is_again(e: &ffmpeg_next::Error) -> bool {
    matches!(e, ffmpeg_next::Error::Other { errno } if *errno == ffmpeg_next::util::error::EAGAIN)
}

/// Copies an RGB24 plane into a tightly-packed buffer.
///
/// ffmpeg rows may carry padding (stride > width * 3); the padding is dropped.
fn extract_rgb_pixels(data: &[u8], stride: usize, width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_requests_720p() {
        let config = CameraConfig::default();
        assert_eq!(config.width, 1280);
        assert_eq!(config.height, 720);
        assert_eq!(config.fps, None);
        assert_eq!(config.device, default_device(0));
        assert_eq!(config.input_format, default_input_format());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_linux_device_path_from_index() {
        assert_eq!(default_device(2), "/dev/video2");
        assert_eq!(default_input_format(), "v4l2");
    }

    #[test]
    fn test_extract_rgb_pixels_strips_stride_padding() {
        // 2x2 RGB with 2 bytes of padding per row
        let stride = 8;
        let data = vec![
            1, 2, 3, 4, 5, 6, 0xAA, 0xAA, //
            7, 8, 9, 10, 11, 12, 0xAA, 0xAA,
        ];
        let pixels = extract_rgb_pixels(&data, stride, 2, 2);
        assert_eq!(pixels, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn test_extract_rgb_pixels_tight_rows() {
        let data: Vec<u8> = (0..18).collect();
        let pixels = extract_rgb_pixels(&data, 6, 2, 3);
        assert_eq!(pixels, data);
    }

    #[test]
    fn test_packet_status_ready_and_eof() {
        assert_eq!(packet_status(Ok(())).unwrap(), PacketStatus::Ready);
        assert_eq!(
            packet_status(Err(ffmpeg_next::Error::Eof)).unwrap(),
            PacketStatus::Eof
        );
    }

    #[test]
    fn test_packet_status_again_is_retry() {
        let again = ffmpeg_next::Error::Other {
            errno: ffmpeg_next::util::error::EAGAIN,
        };
        assert_eq!(packet_status(Err(again)).unwrap(), PacketStatus::Retry);
    }

    #[test]
    fn test_packet_status_device_error_is_reported() {
        assert!(packet_status(Err(ffmpeg_next::Error::External)).is_err());
        assert!(packet_status(Err(ffmpeg_next::Error::InvalidData)).is_err());
    }

    #[test]
    fn test_frame_received_only_swallows_again_and_eof() {
        assert!(frame_received(Ok(())).unwrap());
        assert!(!frame_received(Err(ffmpeg_next::Error::Eof)).unwrap());
        let again = ffmpeg_next::Error::Other {
            errno: ffmpeg_next::util::error::EAGAIN,
        };
        assert!(!frame_received(Err(again)).unwrap());
        assert!(frame_received(Err(ffmpeg_next::Error::InvalidData)).is_err());
    }

    #[test]
    fn test_read_before_open_fails() {
        let mut camera = FfmpegCamera::new(CameraConfig::default());
        assert!(camera.read().is_err());
    }

    #[test]
    fn test_close_without_open_is_noop() {
        let mut camera = FfmpegCamera::new(CameraConfig::default());
        camera.close();
        camera.close();
    }

    #[test]
    fn test_open_missing_device_fails() {
        let mut config = CameraConfig::default();
        config.device = "/nonexistent/handstream-camera".to_string();
        let mut camera = FfmpegCamera::new(config);
        assert!(camera.open().is_err());
    }
}
