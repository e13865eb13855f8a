//! Camera Capture Library for the Drowsiness Monitor
//!
//! Provides the frame type and capture sources consumed by the monitoring loop:
//! - `ImageSequenceSource` replays a directory of still images as a video stream
//! - `FrameQueueSource` feeds pre-built frames (tests, simulations)
//! - `LowLightEnhancer` brightens dark frames ahead of landmark extraction

pub mod enhance;
pub mod frame;
pub mod sequence;

pub use enhance::{FrameEnhancer, LowLightEnhancer, PassThrough};
pub use frame::VideoFrame;
pub use sequence::{FrameQueueSource, ImageSequenceSource};

use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("Capture timeout")]
    Timeout,

    #[error("Camera not initialized")]
    NotInitialized,
}

/// A source of video frames with an explicit open/close lifecycle.
///
/// `next_frame` returns `Ok(None)` at end of stream. Any `Err` means the
/// frame could not be produced this time; callers skip the tick and retry
/// on the next one.
pub trait CaptureSource: Send {
    /// Acquire the underlying device or stream
    fn open(&mut self) -> Result<(), CameraError>;

    /// Read the next frame
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;

    /// Release the underlying device or stream. Idempotent.
    fn close(&mut self);

    /// Whether the source is currently open
    fn is_open(&self) -> bool;
}

impl<S: CaptureSource + ?Sized> CaptureSource for Box<S> {
    fn open(&mut self) -> Result<(), CameraError> {
        (**self).open()
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        (**self).next_frame()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

/// Camera configuration
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Frame source location (directory of images for replay)
    pub source: String,
    /// Mirror frames horizontally (webcam feeds arrive mirrored)
    pub flip_horizontal: bool,
    /// Restart from the first frame at end of stream
    pub loop_playback: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: "frames".to_string(),
            flip_horizontal: true,
            loop_playback: false,
        }
    }
}

impl CameraConfig {
    /// Replay config for a directory of recorded frames
    pub fn replay(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            flip_horizontal: false,
            ..Default::default()
        }
    }
}
