//! Alert state machine: debounced conditions to a per-tick alert decision

use std::time::Instant;

use tracing::{debug, warn};

use crate::debounce::TemporalDebouncer;
use crate::detector::Detection;
use crate::signals::{FrameSignals, SignalComputer};
use crate::state::{AlertState, DmsAlert, DrowsinessCause};
use crate::DmsConfig;

/// Decision for one tick
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub previous: AlertState,
    pub state: AlertState,
    pub face_present: bool,
    pub signals: Option<FrameSignals>,
    pub cause: Option<DrowsinessCause>,
    /// Set when the landmarks could not be turned into signals
    pub skipped: Option<String>,
}

impl Evaluation {
    pub fn changed(&self) -> bool {
        self.previous != self.state
    }
}

/// One debouncer per monitored condition plus the current alert state.
///
/// Face absence is evaluated first; when the face is missing, eye and tilt
/// timers restart (unobserved time never counts toward a sustained condition)
/// and the alert state is held until absence is sustained.
#[derive(Debug, Clone)]
pub struct AlertStateMachine {
    computer: SignalComputer,
    ear_threshold: f32,
    tilt_threshold_degrees: f32,
    eyes_closed: TemporalDebouncer,
    head_tilt: TemporalDebouncer,
    face_absent: TemporalDebouncer,
    state: AlertState,
}

impl AlertStateMachine {
    pub fn new(config: &DmsConfig) -> Self {
        Self {
            computer: SignalComputer::new(config.layout),
            ear_threshold: config.ear_threshold,
            tilt_threshold_degrees: config.tilt_threshold_degrees,
            eyes_closed: TemporalDebouncer::new(config.eyes_closed_threshold()),
            head_tilt: TemporalDebouncer::new(config.head_tilt_threshold()),
            face_absent: TemporalDebouncer::new(config.face_absent_threshold()),
            state: AlertState::Clear,
        }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    /// Timers, for inspection
    pub fn eyes_closed(&self) -> &TemporalDebouncer {
        &self.eyes_closed
    }

    pub fn head_tilt(&self) -> &TemporalDebouncer {
        &self.head_tilt
    }

    pub fn face_absent(&self) -> &TemporalDebouncer {
        &self.face_absent
    }

    pub fn evaluate(
        &mut self,
        detection: &Detection,
        frame_width: u32,
        frame_height: u32,
        now: Instant,
    ) -> Evaluation {
        let previous = self.state;

        let landmarks = match detection {
            Detection::Face(landmarks) => landmarks,
            Detection::NoFace | Detection::Failed(_) => {
                if let Detection::Failed(reason) = detection {
                    debug!("Extraction failed, counting as face absent: {}", reason);
                }
                self.eyes_closed.reset();
                self.head_tilt.reset();
                if self.face_absent.update(true, now) {
                    self.state = AlertState::Alert(DmsAlert::FaceNotVisible);
                }
                return Evaluation {
                    previous,
                    state: self.state,
                    face_present: false,
                    signals: None,
                    cause: None,
                    skipped: None,
                };
            }
        };

        self.face_absent.update(false, now);

        let signals = match self.computer.compute_signals(landmarks, frame_width, frame_height) {
            Ok(signals) => signals,
            Err(e) => {
                warn!("Skipping frame evaluation: {}", e);
                return Evaluation {
                    previous,
                    state: self.state,
                    face_present: true,
                    signals: None,
                    cause: None,
                    skipped: Some(e.to_string()),
                };
            }
        };

        let eyes_closed = self
            .eyes_closed
            .update(signals.avg_ear < self.ear_threshold, now);
        let head_tilted = self
            .head_tilt
            .update(signals.tilt_angle_degrees.abs() > self.tilt_threshold_degrees, now);

        let cause = DrowsinessCause::from_flags(eyes_closed, head_tilted);
        self.state = if cause.is_some() {
            AlertState::Alert(DmsAlert::Drowsiness)
        } else {
            AlertState::Clear
        };

        debug!(
            avg_ear = signals.avg_ear,
            tilt = signals.tilt_angle_degrees,
            eyes_closed,
            head_tilted,
            "Evaluated frame"
        );

        Evaluation {
            previous,
            state: self.state,
            face_present: true,
            signals: Some(signals),
            cause,
            skipped: None,
        }
    }

    /// All timers back to unobserved, state back to clear
    pub fn reset(&mut self) {
        self.eyes_closed.reset();
        self.head_tilt.reset();
        self.face_absent.reset();
        self.state = AlertState::Clear;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::LandmarkSet;
    use crate::testing::{compact_layout, synthetic_face as face};
    use std::time::Duration;

    const TICK: Duration = Duration::from_nanos(33_333_333);

    fn config() -> DmsConfig {
        DmsConfig {
            layout: compact_layout(),
            eyes_closed_threshold_ms: 2500,
            head_tilt_threshold_ms: 2500,
            face_absent_threshold_ms: 3000,
            ..Default::default()
        }
    }

    fn closed() -> Detection {
        // EAR 0.1
        Detection::Face(face(2.0, 0.0))
    }

    fn open() -> Detection {
        // EAR 0.3
        Detection::Face(face(6.0, 0.0))
    }

    fn tilted() -> Detection {
        // chin 80 px right over 160 px: ~26.6 degrees
        Detection::Face(face(6.0, 80.0))
    }

    #[test]
    fn test_open_eyes_stay_clear() {
        let mut machine = AlertStateMachine::new(&config());
        let t0 = Instant::now();
        for i in 0..200u32 {
            let eval = machine.evaluate(&open(), 640, 480, t0 + TICK * i);
            assert_eq!(eval.state, AlertState::Clear);
        }
    }

    #[test]
    fn test_closed_eyes_raise_drowsiness() {
        let mut machine = AlertStateMachine::new(&config());
        let t0 = Instant::now();
        let mut transitions = 0;

        for i in 0..90u32 {
            let elapsed = TICK * i;
            let eval = machine.evaluate(&closed(), 640, 480, t0 + elapsed);
            let expected = elapsed >= Duration::from_millis(2500);
            assert_eq!(eval.state.is_alert(), expected, "tick {}", i);
            if eval.changed() {
                transitions += 1;
                assert_eq!(eval.previous, AlertState::Clear);
                assert_eq!(eval.cause, Some(DrowsinessCause::EyesClosed));
            }
        }
        assert_eq!(transitions, 1);
    }

    #[test]
    fn test_head_tilt_raises_drowsiness() {
        let mut machine = AlertStateMachine::new(&config());
        let t0 = Instant::now();
        machine.evaluate(&tilted(), 640, 480, t0);
        let eval = machine.evaluate(&tilted(), 640, 480, t0 + Duration::from_millis(2500));

        assert_eq!(eval.state, AlertState::Alert(DmsAlert::Drowsiness));
        assert_eq!(eval.cause, Some(DrowsinessCause::HeadTilted));
    }

    #[test]
    fn test_opening_eyes_clears_alert() {
        let mut machine = AlertStateMachine::new(&config());
        let t0 = Instant::now();
        machine.evaluate(&closed(), 640, 480, t0);
        machine.evaluate(&closed(), 640, 480, t0 + Duration::from_secs(3));
        assert!(machine.state().is_alert());

        let eval = machine.evaluate(&open(), 640, 480, t0 + Duration::from_millis(3033));
        assert!(eval.changed());
        assert_eq!(eval.state, AlertState::Clear);
        assert!(!machine.eyes_closed().is_armed());
    }

    #[test]
    fn test_failed_extraction_becomes_face_absent_alert() {
        let mut machine = AlertStateMachine::new(&config());
        let t0 = Instant::now();
        let failed = Detection::Failed("model error".to_string());
        let mut transitions = 0;

        for i in 0..100u32 {
            let elapsed = TICK * i;
            let eval = machine.evaluate(&failed, 640, 480, t0 + elapsed);
            assert!(!eval.face_present);
            assert_eq!(
                eval.state == AlertState::Alert(DmsAlert::FaceNotVisible),
                elapsed >= Duration::from_millis(3000),
                "tick {}",
                i
            );
            if eval.changed() {
                transitions += 1;
            }
        }
        assert_eq!(transitions, 1);
    }

    #[test]
    fn test_face_absent_skips_eye_and_tilt_evaluation() {
        let mut machine = AlertStateMachine::new(&config());
        let t0 = Instant::now();

        // Eyes closing with the head tilted, then the face leaves the frame.
        let drooping = Detection::Face(face(2.0, 80.0));
        machine.evaluate(&drooping, 640, 480, t0);
        assert!(machine.eyes_closed().is_armed());
        assert!(machine.head_tilt().is_armed());

        let mut last = None;
        for i in 1..=100u32 {
            last = Some(machine.evaluate(&Detection::NoFace, 640, 480, t0 + TICK * i));
        }

        let eval = last.unwrap();
        assert_eq!(eval.state, AlertState::Alert(DmsAlert::FaceNotVisible));
        assert_eq!(eval.signals, None);
        assert_eq!(eval.cause, None);
        assert!(!machine.eyes_closed().is_armed());
        assert!(!machine.head_tilt().is_armed());
    }

    #[test]
    fn test_face_gap_restarts_eye_countdown() {
        let mut machine = AlertStateMachine::new(&config());
        let t0 = Instant::now();
        machine.evaluate(&closed(), 640, 480, t0);
        for i in 1..=86u32 {
            let eval = machine.evaluate(&Detection::NoFace, 640, 480, t0 + TICK * i);
            assert_eq!(eval.state, AlertState::Clear);
        }

        // Face back with eyes still closed: the gap is not credited as closed time.
        let back = t0 + Duration::from_millis(2900);
        let eval = machine.evaluate(&closed(), 640, 480, back);
        assert_eq!(eval.state, AlertState::Clear);
        assert_eq!(machine.eyes_closed().elapsed(back), Some(Duration::ZERO));

        let eval = machine.evaluate(&closed(), 640, 480, back + Duration::from_millis(2400));
        assert_eq!(eval.state, AlertState::Clear);
        let eval = machine.evaluate(&closed(), 640, 480, back + Duration::from_millis(2500));
        assert_eq!(eval.state, AlertState::Alert(DmsAlert::Drowsiness));
    }

    #[test]
    fn test_momentary_face_loss_holds_state() {
        let mut machine = AlertStateMachine::new(&config());
        let t0 = Instant::now();
        machine.evaluate(&closed(), 640, 480, t0);
        machine.evaluate(&closed(), 640, 480, t0 + Duration::from_secs(3));
        assert!(machine.state().is_alert());

        let eval = machine.evaluate(&Detection::NoFace, 640, 480, t0 + Duration::from_millis(3033));
        assert!(!eval.changed());
        assert_eq!(eval.state, AlertState::Alert(DmsAlert::Drowsiness));
    }

    #[test]
    fn test_face_return_resets_absence_timer() {
        let mut machine = AlertStateMachine::new(&config());
        let t0 = Instant::now();
        machine.evaluate(&Detection::NoFace, 640, 480, t0);
        machine.evaluate(&Detection::NoFace, 640, 480, t0 + Duration::from_millis(2900));
        machine.evaluate(&open(), 640, 480, t0 + Duration::from_millis(2933));
        assert!(!machine.face_absent().is_armed());

        let eval = machine.evaluate(&Detection::NoFace, 640, 480, t0 + Duration::from_millis(3100));
        assert_eq!(eval.state, AlertState::Clear);
    }

    #[test]
    fn test_bad_landmarks_skip_frame_without_state_change() {
        let mut machine = AlertStateMachine::new(&config());
        let t0 = Instant::now();
        machine.evaluate(&closed(), 640, 480, t0);

        let short = Detection::Face(LandmarkSet::pixel(Vec::new()));
        let eval = machine.evaluate(&short, 640, 480, t0 + TICK);
        assert!(eval.skipped.is_some());
        assert!(!eval.changed());
        assert!(machine.eyes_closed().is_armed());
    }

    #[test]
    fn test_reset() {
        let mut machine = AlertStateMachine::new(&config());
        let t0 = Instant::now();
        machine.evaluate(&closed(), 640, 480, t0);
        machine.evaluate(&closed(), 640, 480, t0 + Duration::from_secs(3));
        machine.reset();

        assert_eq!(machine.state(), AlertState::Clear);
        assert!(!machine.eyes_closed().is_armed());
    }
}
