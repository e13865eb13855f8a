//! Per-frame geometric signals: eye aspect ratio and head tilt

use serde::{Deserialize, Serialize};

use crate::landmarks::{LandmarkLayout, LandmarkSet, Point2};
use crate::DmsError;

/// Signals derived from one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSignals {
    pub left_ear: f32,
    pub right_ear: f32,
    /// Mean of left and right EAR
    pub avg_ear: f32,
    /// Lateral lean, 0 = upright, in (-180, 180]
    pub tilt_angle_degrees: f32,
    pub face_present: bool,
}

/// EAR = (|p1-p5| + |p2-p4|) / (2 |p0-p3|)
pub fn eye_aspect_ratio(eye: &[Point2; 6]) -> Result<f32, DmsError> {
    let horizontal = eye[0].distance(&eye[3]);
    if horizontal <= f32::EPSILON {
        return Err(DmsError::InvalidInput("eye corners coincide".to_string()));
    }

    let vertical = eye[1].distance(&eye[5]) + eye[2].distance(&eye[4]);
    Ok(vertical / (2.0 * horizontal))
}

/// Angle of the forehead-to-chin line from vertical, in degrees
pub fn head_tilt_degrees(top: Point2, bottom: Point2) -> f32 {
    (bottom.x - top.x).atan2(bottom.y - top.y).to_degrees()
}

/// Computes `FrameSignals` from a landmark set using a fixed index layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalComputer {
    layout: LandmarkLayout,
}

impl SignalComputer {
    pub fn new(layout: LandmarkLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &LandmarkLayout {
        &self.layout
    }

    pub fn compute_signals(
        &self,
        landmarks: &LandmarkSet,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<FrameSignals, DmsError> {
        if landmarks.is_empty() {
            return Err(DmsError::InvalidInput("empty landmark set".to_string()));
        }

        let eye = |indices: &[usize; 6]| -> Result<[Point2; 6], DmsError> {
            let mut points = [Point2::default(); 6];
            for (slot, &index) in points.iter_mut().zip(indices) {
                *slot = landmarks.pixel_point(index, frame_width, frame_height)?;
            }
            Ok(points)
        };

        let left_ear = eye_aspect_ratio(&eye(&self.layout.eyes.left)?)?;
        let right_ear = eye_aspect_ratio(&eye(&self.layout.eyes.right)?)?;

        let top = landmarks.pixel_point(self.layout.tilt.forehead, frame_width, frame_height)?;
        let bottom = landmarks.pixel_point(self.layout.tilt.chin, frame_width, frame_height)?;

        Ok(FrameSignals {
            left_ear,
            right_ear,
            avg_ear: (left_ear + right_ear) / 2.0,
            tilt_angle_degrees: head_tilt_degrees(top, bottom),
            face_present: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{compact_layout, eye, synthetic_face as face};
    use proptest::prelude::*;

    #[test]
    fn test_open_eye_ear() {
        // opening 6 px over a 20 px eye: (6 + 6) / 40
        let ear = eye_aspect_ratio(&eye(0.0, 0.0, 6.0)).unwrap();
        assert!((ear - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_eye_is_rejected() {
        let points = [Point2::new(1.0, 1.0); 6];
        assert!(matches!(eye_aspect_ratio(&points), Err(DmsError::InvalidInput(_))));
    }

    #[test]
    fn test_compute_signals() {
        let computer = SignalComputer::new(compact_layout());
        let signals = computer.compute_signals(&face(4.0, 0.0), 640, 480).unwrap();

        assert!((signals.avg_ear - 0.2).abs() < 1e-6);
        assert_eq!(signals.tilt_angle_degrees, 0.0);
        assert!(signals.face_present);
    }

    #[test]
    fn test_normalized_landmarks_use_frame_size() {
        let mut points = Vec::new();
        for p in face(6.0, 0.0).points() {
            points.push(Point2::new(p.x / 200.0, p.y / 400.0));
        }
        let normalized = LandmarkSet::normalized(points);

        let computer = SignalComputer::new(compact_layout());
        let signals = computer.compute_signals(&normalized, 200, 400).unwrap();
        assert!((signals.avg_ear - 0.3).abs() < 1e-4);
    }

    #[test]
    fn test_empty_landmarks_fail() {
        let computer = SignalComputer::default();
        let result = computer.compute_signals(&LandmarkSet::pixel(Vec::new()), 640, 480);
        assert!(matches!(result, Err(DmsError::InvalidInput(_))));
    }

    #[test]
    fn test_short_landmark_set_fails_with_index_error() {
        // Face-mesh layout reads index 387; a 14-point set cannot satisfy it.
        let computer = SignalComputer::new(LandmarkLayout::face_mesh());
        let result = computer.compute_signals(&face(6.0, 0.0), 640, 480);
        assert!(matches!(result, Err(DmsError::InvalidLandmarkIndex { len: 14, .. })));
    }

    #[test]
    fn test_inputs_not_mutated() {
        let landmarks = face(6.0, 12.0);
        let before = landmarks.clone();
        SignalComputer::new(compact_layout())
            .compute_signals(&landmarks, 640, 480)
            .unwrap();
        assert_eq!(landmarks, before);
    }

    #[test]
    fn test_tilt_sign_follows_lean() {
        let top = Point2::new(100.0, 0.0);
        assert!(head_tilt_degrees(top, Point2::new(130.0, 100.0)) > 0.0);
        assert!(head_tilt_degrees(top, Point2::new(70.0, 100.0)) < 0.0);
        assert_eq!(head_tilt_degrees(top, Point2::new(100.0, 100.0)), 0.0);
    }

    proptest! {
        #[test]
        fn ear_is_mirror_symmetric(
            opening_l in 0.0f32..12.0,
            opening_r in 0.0f32..12.0,
            cx in 50.0f32..150.0,
        ) {
            let computer = SignalComputer::new(compact_layout());
            let build = |left: [Point2; 6], right: [Point2; 6]| {
                let mut points = Vec::new();
                points.extend_from_slice(&left);
                points.extend_from_slice(&right);
                points.push(Point2::new(cx, 0.0));
                points.push(Point2::new(cx, 100.0));
                LandmarkSet::pixel(points)
            };
            // mirror about x = cx
            let mirror = |eye: [Point2; 6]| eye.map(|p| Point2::new(2.0 * cx - p.x, p.y));

            let left = eye(cx - 30.0, 50.0, opening_l);
            let right = eye(cx + 30.0, 50.0, opening_r);

            let a = computer.compute_signals(&build(left, right), 300, 300).unwrap();
            let b = computer.compute_signals(&build(mirror(right), mirror(left)), 300, 300).unwrap();
            prop_assert!((a.avg_ear - b.avg_ear).abs() < 1e-5);
        }

        #[test]
        fn tilt_magnitude_grows_with_offset(dy in 10.0f32..500.0, dx in 0.0f32..400.0, step in 0.5f32..50.0) {
            let top = Point2::new(0.0, 0.0);
            let a = head_tilt_degrees(top, Point2::new(dx, dy)).abs();
            let b = head_tilt_degrees(top, Point2::new(dx + step, dy)).abs();
            let mirrored = head_tilt_degrees(top, Point2::new(-(dx + step), dy)).abs();
            prop_assert!(b > a);
            prop_assert!((b - mirrored).abs() < 1e-4);
        }
    }
}
