use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::capture::domain::frame_source::FrameSource;
use crate::detection::domain::hand_detector::HandDetector;
use crate::display::domain::frame_display::FrameDisplay;
use crate::display::domain::hand_annotator::annotate_hands;
use crate::packet::landmark_flattener::flatten_hand;
use crate::packet::packet_codec::encode_packet;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::stream_error::StreamError;
use crate::shared::constants::{
    DEFAULT_CAPTURE_HEIGHT, DEFAULT_DISPLAY_SCALE, DEFAULT_MAX_CONSECUTIVE_FAILURES,
};
use crate::transport::domain::packet_sender::PacketSender;

const KEY_ESC: i32 = 27;
const KEY_Q: i32 = b'q' as i32;

#[derive(Clone, Debug, PartialEq)]
pub struct StreamConfig {
    /// Height used to invert landmark y before sending.
    pub flip_height: i32,
    /// Factor applied to the annotated frame before display.
    pub display_scale: f64,
    /// Failed reads in a row before the stream gives up.
    pub max_consecutive_failures: usize,
    /// Stop after this many frames have been read.
    pub max_frames: Option<usize>,
    /// Stop when Esc or `q` is pressed in the display.
    pub quit_on_key: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            flip_height: DEFAULT_CAPTURE_HEIGHT as i32,
            display_scale: DEFAULT_DISPLAY_SCALE,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            max_frames: None,
            quit_on_key: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub frames_read: usize,
    /// Reads that failed and were skipped.
    pub frames_skipped: usize,
    pub frames_with_hand: usize,
    pub packets_sent: usize,
}

/// Streams hand landmarks from a live source to a packet receiver.
///
/// Each iteration reads a frame, detects hands, sends the first hand as one
/// packet, then shows the annotated frame. The source and display are closed
/// on every exit path; the sender is released on drop.
pub struct StreamHandsUseCase {
    source: Box<dyn FrameSource>,
    detector: Box<dyn HandDetector>,
    sender: Box<dyn PacketSender>,
    display: Box<dyn FrameDisplay>,
    logger: Box<dyn PipelineLogger>,
    config: StreamConfig,
    cancel: Arc<AtomicBool>,
}

impl StreamHandsUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn HandDetector>,
        sender: Box<dyn PacketSender>,
        display: Box<dyn FrameDisplay>,
        logger: Box<dyn PipelineLogger>,
        config: StreamConfig,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            source,
            detector,
            sender,
            display,
            logger,
            config,
            cancel,
        }
    }

    pub fn execute(&mut self) -> Result<StreamStats, StreamError> {
        let metadata = match self.source.open() {
            Ok(metadata) => metadata,
            Err(e) => {
                self.source.close();
                self.display.close();
                return Err(StreamError::Open(e));
            }
        };
        self.logger.info(&format!(
            "Capturing {}x{} @ {:.1} fps ({}) from {}",
            metadata.width, metadata.height, metadata.fps, metadata.pixel_format, metadata.device
        ));

        let result = self.run();

        self.source.close();
        self.display.close();
        self.logger.summary();

        if let Ok(stats) = &result {
            log::info!(
                "Stream ended: {} frames read, {} skipped, {} with a hand, {} packets sent",
                stats.frames_read,
                stats.frames_skipped,
                stats.frames_with_hand,
                stats.packets_sent
            );
        }
        result
    }

    fn run(&mut self) -> Result<StreamStats, StreamError> {
        let mut stats = StreamStats::default();
        let mut failures = 0usize;
        let max_failures = self.config.max_consecutive_failures.max(1);
        let mut height_warned = false;

        while !self.cancel.load(Ordering::SeqCst) {
            if self
                .config
                .max_frames
                .is_some_and(|max| stats.frames_read >= max)
            {
                break;
            }

            let t0 = Instant::now();
            let mut frame = match self.source.read() {
                Ok(Some(frame)) => {
                    failures = 0;
                    frame
                }
                Ok(None) => {
                    self.logger.info("Capture source ended");
                    break;
                }
                Err(e) => {
                    failures += 1;
                    stats.frames_skipped += 1;
                    if failures >= max_failures {
                        return Err(StreamError::CaptureFailed { failures, last: e });
                    }
                    log::warn!("Skipping frame ({failures}/{max_failures}): {e}");
                    continue;
                }
            };
            self.logger.timing("capture", elapsed_ms(t0));
            stats.frames_read += 1;

            if !height_warned && frame.height() as i32 != self.config.flip_height {
                log::warn!(
                    "Frame height {} differs from flip height {}",
                    frame.height(),
                    self.config.flip_height
                );
                height_warned = true;
            }

            let t0 = Instant::now();
            let hands = self.detector.detect(&frame).map_err(StreamError::Detect)?;
            self.logger.timing("detect", elapsed_ms(t0));
            self.logger.metric("hands", hands.len() as f64);

            if let Some(hand) = hands.first() {
                let t0 = Instant::now();
                let payload = encode_packet(&flatten_hand(hand, self.config.flip_height));
                self.sender.send(&payload).map_err(StreamError::Send)?;
                self.logger.timing("send", elapsed_ms(t0));
                stats.frames_with_hand += 1;
                stats.packets_sent += 1;
            }

            let t0 = Instant::now();
            annotate_hands(&mut frame, &hands);
            let shown = if self.config.display_scale == 1.0 {
                frame
            } else {
                frame
                    .scaled(self.config.display_scale)
                    .map_err(StreamError::Display)?
            };
            let key = self.display.show(&shown).map_err(StreamError::Display)?;
            self.logger.timing("display", elapsed_ms(t0));

            self.logger.progress(stats.frames_read);

            if self.config.quit_on_key && key.is_some_and(is_quit_key) {
                self.logger.info("Quit key pressed");
                break;
            }
        }

        Ok(stats)
    }
}

fn is_quit_key(key: i32) -> bool {
    matches!(key & 0xFF, KEY_ESC | KEY_Q)
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
