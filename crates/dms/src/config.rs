//! DMS configuration

use std::time::Duration;

use alerting::{BeepPolicy, BeepTone};
use serde::{Deserialize, Serialize};

use crate::landmarks::LandmarkLayout;
use crate::DmsError;

/// DMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmsConfig {
    /// Average EAR below which the eyes count as closed
    pub ear_threshold: f32,

    /// Head lean (degrees from vertical) above which the head counts as tilted
    pub tilt_threshold_degrees: f32,

    /// Eyes closed threshold for drowsiness alert (milliseconds)
    pub eyes_closed_threshold_ms: u64,

    /// Head tilted threshold for drowsiness alert (milliseconds)
    pub head_tilt_threshold_ms: u64,

    /// Face absent threshold for face-not-visible alert (milliseconds)
    pub face_absent_threshold_ms: u64,

    /// Sound alerts
    pub beep_enabled: bool,

    /// When an active alert re-sounds
    pub beep_policy: BeepPolicy,

    pub drowsiness_tone: BeepTone,
    pub face_absent_tone: BeepTone,

    /// Face presence score required from the landmark model
    pub face_confidence: f32,

    /// Landmark model path
    pub face_model_path: Option<String>,

    /// Landmark indices for EAR and tilt
    pub layout: LandmarkLayout,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.25,
            tilt_threshold_degrees: 15.0,
            eyes_closed_threshold_ms: 3000,
            head_tilt_threshold_ms: 3000,
            face_absent_threshold_ms: 3000,
            beep_enabled: false,
            beep_policy: BeepPolicy::default(),
            drowsiness_tone: BeepTone::DROWSINESS,
            face_absent_tone: BeepTone::FACE_ABSENT,
            face_confidence: 0.5,
            face_model_path: None,
            layout: LandmarkLayout::face_mesh(),
        }
    }
}

impl DmsConfig {
    /// Create strict config (lower thresholds)
    pub fn strict() -> Self {
        Self {
            eyes_closed_threshold_ms: 2500,
            head_tilt_threshold_ms: 2500,
            face_absent_threshold_ms: 2500,
            ..Default::default()
        }
    }

    /// Create lenient config (higher thresholds)
    pub fn lenient() -> Self {
        Self {
            eyes_closed_threshold_ms: 5000,
            head_tilt_threshold_ms: 5000,
            face_absent_threshold_ms: 3000,
            ..Default::default()
        }
    }

    pub fn eyes_closed_threshold(&self) -> Duration {
        Duration::from_millis(self.eyes_closed_threshold_ms)
    }

    pub fn head_tilt_threshold(&self) -> Duration {
        Duration::from_millis(self.head_tilt_threshold_ms)
    }

    pub fn face_absent_threshold(&self) -> Duration {
        Duration::from_millis(self.face_absent_threshold_ms)
    }

    /// Reject values the state machine cannot work with
    pub fn validate(&self) -> Result<(), DmsError> {
        if !(self.ear_threshold.is_finite() && self.ear_threshold > 0.0) {
            return Err(DmsError::Config(format!(
                "ear_threshold must be positive, got {}",
                self.ear_threshold
            )));
        }
        if !(self.tilt_threshold_degrees.is_finite()
            && self.tilt_threshold_degrees > 0.0
            && self.tilt_threshold_degrees < 180.0)
        {
            return Err(DmsError::Config(format!(
                "tilt_threshold_degrees must be in (0, 180), got {}",
                self.tilt_threshold_degrees
            )));
        }
        if !(0.0..=1.0).contains(&self.face_confidence) {
            return Err(DmsError::Config(format!(
                "face_confidence must be in [0, 1], got {}",
                self.face_confidence
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = DmsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.eyes_closed_threshold(), Duration::from_secs(3));
        assert!(!config.beep_enabled);
    }

    #[test]
    fn test_presets_bracket_default() {
        let strict = DmsConfig::strict();
        let lenient = DmsConfig::lenient();
        assert!(strict.eyes_closed_threshold_ms < DmsConfig::default().eyes_closed_threshold_ms);
        assert!(lenient.eyes_closed_threshold_ms > DmsConfig::default().eyes_closed_threshold_ms);
    }

    #[test]
    fn test_invalid_thresholds() {
        let config = DmsConfig {
            ear_threshold: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DmsError::Config(_))));

        let config = DmsConfig {
            tilt_threshold_degrees: 200.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
