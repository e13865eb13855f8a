//! Driver Monitoring System (DMS)
//!
//! Drowsiness detection from facial landmarks:
//! - Eye aspect ratio (eye closure)
//! - Head tilt from the forehead-to-chin line
//! - Face presence
//!
//! Each condition must hold continuously for a configured time before an
//! alert is raised; see [`TemporalDebouncer`].

pub mod analysis;
pub mod config;
pub mod debounce;
pub mod detector;
pub mod landmarks;
pub mod machine;
pub mod session;
pub mod signals;
pub mod state;
pub mod testing;

pub use analysis::{DmsAnalysis, MonitorEvent};
pub use config::DmsConfig;
pub use debounce::TemporalDebouncer;
pub use detector::{Detection, FaceMeshExtractor, GeometryExtractor};
pub use landmarks::{CoordinateSpace, LandmarkLayout, LandmarkSet, Point2};
pub use machine::{AlertStateMachine, Evaluation};
pub use session::MonitoringSession;
pub use signals::{eye_aspect_ratio, head_tilt_degrees, FrameSignals, SignalComputer};
pub use state::{AlertState, DmsAlert, DrowsinessCause, MONITORING_OFF, MONITORING_ON};

use std::time::Instant;

use camera_capture::{FrameEnhancer, VideoFrame};
use thiserror::Error;
use tracing::info;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Landmark index {index} out of range for {len} landmarks")]
    InvalidLandmarkIndex { index: usize, len: usize },

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Landmark extractor is not open")]
    ExtractorClosed,
}

/// Driver monitoring module: enhancement, landmark extraction and alert
/// evaluation for one frame at a time.
pub struct DmsModule {
    extractor: Box<dyn GeometryExtractor>,
    enhancer: Box<dyn FrameEnhancer>,
    session: MonitoringSession,
}

impl DmsModule {
    /// Create a new DMS module; opens the extractor
    pub fn new(
        config: DmsConfig,
        mut extractor: Box<dyn GeometryExtractor>,
        enhancer: Box<dyn FrameEnhancer>,
    ) -> Result<Self, DmsError> {
        config.validate()?;
        extractor.open()?;
        info!(
            ear_threshold = config.ear_threshold,
            tilt_threshold = config.tilt_threshold_degrees,
            beep = config.beep_enabled,
            "DMS ready"
        );

        Ok(Self {
            extractor,
            enhancer,
            session: MonitoringSession::new(&config),
        })
    }

    /// Analyze a single frame for driver state.
    ///
    /// Extraction errors are not returned: they count as "no face" for this
    /// tick so a broken model ends in a face-not-visible alert.
    pub fn analyze(&mut self, frame: &VideoFrame, now: Instant) -> DmsAnalysis {
        let enhanced = self.enhancer.enhance(frame);
        let detection = Detection::from_result(self.extractor.detect(&enhanced));
        self.session
            .evaluate(&detection, enhanced.width, enhanced.height, now)
    }

    pub fn session(&self) -> &MonitoringSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut MonitoringSession {
        &mut self.session
    }

    /// Reset driver state (on driver change)
    pub fn reset_state(&mut self) {
        self.session.reset();
    }

    /// Release the extractor
    pub fn shutdown(&mut self) {
        if self.extractor.is_open() {
            self.extractor.close();
            info!("DMS shut down");
        }
    }
}

impl Drop for DmsModule {
    fn drop(&mut self) {
        self.shutdown();
    }
}
