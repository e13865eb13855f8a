//! Low-light pre-processing ahead of landmark extraction

use std::borrow::Cow;

use image::{GrayImage, Luma};
use imageproc::contrast::equalize_histogram;
use tracing::{debug, warn};

use crate::VideoFrame;

/// A swappable pre-processing stage. Returns a frame suitable for landmark
/// extraction, borrowing the input when no change is needed.
pub trait FrameEnhancer: Send {
    fn enhance<'a>(&self, frame: &'a VideoFrame) -> Cow<'a, VideoFrame>;
}

/// No-op stage
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl FrameEnhancer for PassThrough {
    fn enhance<'a>(&self, frame: &'a VideoFrame) -> Cow<'a, VideoFrame> {
        Cow::Borrowed(frame)
    }
}

/// Histogram equalization plus gamma lift for dark frames.
#[derive(Debug, Clone)]
pub struct LowLightEnhancer {
    brightness_threshold: f32,
    gamma: f32,
    lut: [u8; 256],
}

impl LowLightEnhancer {
    /// Default luminance below which enhancement kicks in
    pub const DEFAULT_BRIGHTNESS_THRESHOLD: f32 = 50.0;
    /// Default gamma
    pub const DEFAULT_GAMMA: f32 = 1.5;

    pub fn new(brightness_threshold: f32, gamma: f32) -> Self {
        Self {
            brightness_threshold,
            gamma,
            lut: gamma_lut(gamma),
        }
    }

    pub fn brightness_threshold(&self) -> f32 {
        self.brightness_threshold
    }

    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    fn brighten(&self, frame: &VideoFrame) -> Option<VideoFrame> {
        let gray = GrayImage::from_raw(frame.width, frame.height, frame.to_grayscale())?;
        let mut equalized = equalize_histogram(&gray);
        for Luma([v]) in equalized.pixels_mut() {
            *v = self.lut[*v as usize];
        }

        let mut data = Vec::with_capacity(frame.data.len());
        for Luma([v]) in equalized.pixels() {
            data.extend_from_slice(&[*v, *v, *v]);
        }

        Some(VideoFrame::new(
            data,
            frame.width,
            frame.height,
            frame.timestamp_ns,
            frame.sequence,
        ))
    }
}

impl Default for LowLightEnhancer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BRIGHTNESS_THRESHOLD, Self::DEFAULT_GAMMA)
    }
}

impl FrameEnhancer for LowLightEnhancer {
    fn enhance<'a>(&self, frame: &'a VideoFrame) -> Cow<'a, VideoFrame> {
        let brightness = frame.mean_brightness();
        if brightness >= self.brightness_threshold {
            return Cow::Borrowed(frame);
        }

        debug!(brightness, sequence = frame.sequence, "Applying low-light enhancement");
        match self.brighten(frame) {
            Some(enhanced) => Cow::Owned(enhanced),
            None => {
                warn!(
                    "Frame {} has {} bytes for {}x{}, skipping enhancement",
                    frame.sequence,
                    frame.data.len(),
                    frame.width,
                    frame.height
                );
                Cow::Borrowed(frame)
            }
        }
    }
}

fn gamma_lut(gamma: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    let inv = 1.0 / gamma;
    for (i, slot) in lut.iter_mut().enumerate() {
        *slot = ((i as f32 / 255.0).powf(inv) * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    lut
}
