//! Monitor settings: `drowsiness.toml` overlaid with `DROWSY_*` environment variables

use std::path::{Path, PathBuf};
use std::time::Duration;

use alerting::BeepPolicy;
use camera_capture::{CameraConfig, FrameEnhancer, LowLightEnhancer, PassThrough};
use config::{Config, Environment, File};
use dms::DmsConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::MonitorError;

/// Settings file stem, looked up in the working directory
pub const SETTINGS_FILE: &str = "drowsiness";
/// Environment variable prefix
pub const ENV_PREFIX: &str = "DROWSY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub ear_threshold: f32,
    pub tilt_threshold_degrees: f32,
    pub eyes_closed_sustain_seconds: f64,
    pub head_tilt_sustain_seconds: f64,
    pub face_absent_sustain_seconds: f64,
    pub tick_rate_hz: f64,
    pub beep_enabled: bool,
    /// Beep repeat interval while an alert stays active; 0 beeps on entry only
    pub beep_repeat_ms: u64,
    /// Mean luminance (0-255) below which frames are enhanced
    pub brightness_threshold: f32,
    pub low_light_enhancement: bool,
    pub flip_horizontal: bool,
    /// Directory of frames to replay
    pub frames_dir: String,
    /// Face-mesh ONNX model
    pub model_path: String,
    pub face_confidence: f32,
    pub alert_log_path: PathBuf,
    /// Alert records shown at startup
    pub history_size: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            ear_threshold: 0.25,
            tilt_threshold_degrees: 15.0,
            eyes_closed_sustain_seconds: 3.0,
            head_tilt_sustain_seconds: 3.0,
            face_absent_sustain_seconds: 3.0,
            tick_rate_hz: 30.0,
            beep_enabled: false,
            beep_repeat_ms: 1000,
            brightness_threshold: LowLightEnhancer::DEFAULT_BRIGHTNESS_THRESHOLD,
            low_light_enhancement: true,
            flip_horizontal: true,
            frames_dir: "frames".to_string(),
            model_path: "models/face_mesh.onnx".to_string(),
            face_confidence: 0.5,
            alert_log_path: PathBuf::from("alerts.log"),
            history_size: storage::DEFAULT_HISTORY_SIZE,
        }
    }
}

fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds * 1000.0).round() as u64
}

impl MonitorSettings {
    /// Load from `drowsiness.{toml,yaml,json,...}` if present, then `DROWSY_*`
    pub fn load() -> Result<Self, MonitorError> {
        Self::load_with(None, ENV_PREFIX)
    }

    /// Load from an explicit file (required when given) and environment prefix
    pub fn load_with(file: Option<&Path>, env_prefix: &str) -> Result<Self, MonitorError> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(SETTINGS_FILE).required(false),
        };

        let settings: MonitorSettings = Config::builder()
            .add_source(file_source)
            .add_source(Environment::with_prefix(env_prefix).try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| MonitorError::Settings(e.to_string()))?;

        settings.validate()?;
        info!(
            tick_rate_hz = settings.tick_rate_hz,
            beep = settings.beep_enabled,
            frames = %settings.frames_dir,
            "Settings loaded"
        );
        Ok(settings)
    }

    /// Reject values the monitor cannot run with
    pub fn validate(&self) -> Result<(), MonitorError> {
        if !(self.tick_rate_hz.is_finite() && self.tick_rate_hz > 0.0) {
            return Err(MonitorError::Settings(format!(
                "tick_rate_hz must be positive, got {}",
                self.tick_rate_hz
            )));
        }
        if self.tick_interval().is_zero() {
            return Err(MonitorError::Settings(format!(
                "tick_rate_hz {} is too high for a non-zero tick interval",
                self.tick_rate_hz
            )));
        }

        for (name, value) in [
            ("eyes_closed_sustain_seconds", self.eyes_closed_sustain_seconds),
            ("head_tilt_sustain_seconds", self.head_tilt_sustain_seconds),
            ("face_absent_sustain_seconds", self.face_absent_sustain_seconds),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(MonitorError::Settings(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        if !(0.0..=255.0).contains(&self.brightness_threshold) {
            return Err(MonitorError::Settings(format!(
                "brightness_threshold must be in [0, 255], got {}",
                self.brightness_threshold
            )));
        }

        self.dms_config()
            .validate()
            .map_err(|e| MonitorError::Settings(e.to_string()))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz)
    }

    pub fn beep_policy(&self) -> BeepPolicy {
        BeepPolicy::from_repeat_ms(self.beep_repeat_ms)
    }

    pub fn dms_config(&self) -> DmsConfig {
        DmsConfig {
            ear_threshold: self.ear_threshold,
            tilt_threshold_degrees: self.tilt_threshold_degrees,
            eyes_closed_threshold_ms: seconds_to_ms(self.eyes_closed_sustain_seconds),
            head_tilt_threshold_ms: seconds_to_ms(self.head_tilt_sustain_seconds),
            face_absent_threshold_ms: seconds_to_ms(self.face_absent_sustain_seconds),
            beep_enabled: self.beep_enabled,
            beep_policy: self.beep_policy(),
            face_confidence: self.face_confidence,
            face_model_path: Some(self.model_path.clone()),
            ..Default::default()
        }
    }

    pub fn camera_config(&self) -> CameraConfig {
        CameraConfig {
            source: self.frames_dir.clone(),
            flip_horizontal: self.flip_horizontal,
            loop_playback: false,
        }
    }

    /// Pre-processing stage selected by `low_light_enhancement`
    pub fn enhancer(&self) -> Box<dyn FrameEnhancer> {
        if self.low_light_enhancement {
            Box::new(LowLightEnhancer::new(
                self.brightness_threshold,
                LowLightEnhancer::DEFAULT_GAMMA,
            ))
        } else {
            Box::new(PassThrough)
        }
    }
}
