//! Frame sources backed by recorded images or in-memory queues

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::{CameraConfig, CameraError, CaptureSource, VideoFrame};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "tif"];

/// Replays a directory of still images, in file-name order, as a video stream.
pub struct ImageSequenceSource {
    config: CameraConfig,
    frames: Vec<PathBuf>,
    cursor: usize,
    sequence: u32,
    opened_at: Option<Instant>,
}

impl ImageSequenceSource {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            frames: Vec::new(),
            cursor: 0,
            sequence: 0,
            opened_at: None,
        }
    }

    /// Number of frames discovered at open
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn scan(dir: &Path) -> Result<Vec<PathBuf>, CameraError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| CameraError::Open(format!("{}: {}", dir.display(), e)))?;

        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        frames.sort();
        Ok(frames)
    }
}

impl CaptureSource for ImageSequenceSource {
    fn open(&mut self) -> Result<(), CameraError> {
        let frames = Self::scan(Path::new(&self.config.source))?;
        if frames.is_empty() {
            return Err(CameraError::Open(format!(
                "no image frames found in {}",
                self.config.source
            )));
        }

        info!("Opened image sequence {} ({} frames)", self.config.source, frames.len());
        self.frames = frames;
        self.cursor = 0;
        self.sequence = 0;
        self.opened_at = Some(Instant::now());
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        let opened_at = self.opened_at.ok_or(CameraError::NotInitialized)?;

        if self.cursor >= self.frames.len() {
            if !self.config.loop_playback {
                return Ok(None);
            }
            debug!("Image sequence exhausted, looping");
            self.cursor = 0;
        }

        let path = &self.frames[self.cursor];
        self.cursor += 1;

        let img = image::open(path)
            .map_err(|e| CameraError::Format(format!("{}: {}", path.display(), e)))?
            .to_rgb8();

        let timestamp_ns = opened_at.elapsed().as_nanos() as u64;
        let frame = VideoFrame::from_rgb_image(img, timestamp_ns, self.sequence);
        self.sequence = self.sequence.wrapping_add(1);

        if self.config.flip_horizontal {
            Ok(Some(frame.flip_horizontal()))
        } else {
            Ok(Some(frame))
        }
    }

    fn close(&mut self) {
        if self.opened_at.take().is_some() {
            info!("Closed image sequence {}", self.config.source);
        }
        self.frames.clear();
        self.cursor = 0;
    }

    fn is_open(&self) -> bool {
        self.opened_at.is_some()
    }
}

/// Serves a fixed queue of capture results. Useful for simulations where
/// frames, read failures and end of stream must be scripted.
#[derive(Debug, Default)]
pub struct FrameQueueSource {
    queue: VecDeque<Result<VideoFrame, CameraError>>,
    open: bool,
    opens: usize,
}

impl FrameQueueSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a frame
    pub fn push_frame(&mut self, frame: VideoFrame) {
        self.queue.push_back(Ok(frame));
    }

    /// Queue a capture failure
    pub fn push_error(&mut self, error: CameraError) {
        self.queue.push_back(Err(error));
    }

    /// Frames left before end of stream
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// How many times `open` succeeded
    pub fn open_count(&self) -> usize {
        self.opens
    }
}

impl CaptureSource for FrameQueueSource {
    fn open(&mut self) -> Result<(), CameraError> {
        self.open = true;
        self.opens += 1;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if !self.open {
            return Err(CameraError::NotInitialized);
        }
        match self.queue.pop_front() {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(e)) => {
                warn!("Queued capture failure: {}", e);
                Err(e)
            }
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_frames(dir: &Path, count: u32) {
        for i in 0..count {
            let img = RgbImage::from_pixel(4, 2, Rgb([i as u8 * 10, 0, 0]));
            img.save(dir.join(format!("frame_{:03}.png", i))).unwrap();
        }
        std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();
    }

    #[test]
    fn test_sequence_reads_in_order_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 3);

        let mut source = ImageSequenceSource::new(CameraConfig::replay(dir.path().to_string_lossy()));
        source.open().unwrap();
        assert_eq!(source.len(), 3);

        for expected in 0..3u32 {
            let frame = source.next_frame().unwrap().unwrap();
            assert_eq!(frame.sequence, expected);
            assert_eq!(frame.get_pixel(0, 0), Some([expected as u8 * 10, 0, 0]));
        }
        assert!(source.next_frame().unwrap().is_none());

        source.close();
        assert!(!source.is_open());
    }

    #[test]
    fn test_sequence_loops_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 2);

        let mut config = CameraConfig::replay(dir.path().to_string_lossy());
        config.loop_playback = true;
        let mut source = ImageSequenceSource::new(config);
        source.open().unwrap();

        for _ in 0..5 {
            assert!(source.next_frame().unwrap().is_some());
        }
    }

    #[test]
    fn test_empty_directory_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = ImageSequenceSource::new(CameraConfig::replay(dir.path().to_string_lossy()));
        assert!(matches!(source.open(), Err(CameraError::Open(_))));
    }

    #[test]
    fn test_read_before_open() {
        let mut source = ImageSequenceSource::new(CameraConfig::default());
        assert!(matches!(source.next_frame(), Err(CameraError::NotInitialized)));
    }

    #[test]
    fn test_queue_source_scripted_results() {
        let mut source = FrameQueueSource::new();
        source.push_frame(VideoFrame::solid(2, 2, [1, 2, 3]));
        source.push_error(CameraError::Timeout);
        assert_eq!(source.remaining(), 2);

        source.open().unwrap();
        assert!(source.next_frame().unwrap().is_some());
        assert_eq!(source.remaining(), 1);
        assert!(matches!(source.next_frame(), Err(CameraError::Timeout)));
        assert!(source.next_frame().unwrap().is_none());
        assert_eq!(source.remaining(), 0);
        assert_eq!(source.open_count(), 1);
    }
}
