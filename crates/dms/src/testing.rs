//! Synthetic faces and a scripted extractor for tests and simulations

use std::collections::VecDeque;

use camera_capture::VideoFrame;

use crate::detector::GeometryExtractor;
use crate::landmarks::{EyeLandmarkIndices, LandmarkLayout, LandmarkSet, Point2, TiltLandmarkIndices};
use crate::DmsError;

/// Layout over a 14-point synthetic face: 0-5 left eye, 6-11 right eye,
/// 12 forehead, 13 chin.
pub fn compact_layout() -> LandmarkLayout {
    LandmarkLayout {
        eyes: EyeLandmarkIndices {
            left: [0, 1, 2, 3, 4, 5],
            right: [6, 7, 8, 9, 10, 11],
        },
        tilt: TiltLandmarkIndices {
            forehead: 12,
            chin: 13,
        },
    }
}

/// Eye centred at (cx, cy), 20 px wide, with the given lid opening.
/// Its EAR is `opening / 20`.
pub fn eye(cx: f32, cy: f32, opening: f32) -> [Point2; 6] {
    let h = opening / 2.0;
    [
        Point2::new(cx - 10.0, cy),
        Point2::new(cx - 4.0, cy - h),
        Point2::new(cx + 4.0, cy - h),
        Point2::new(cx + 10.0, cy),
        Point2::new(cx + 4.0, cy + h),
        Point2::new(cx - 4.0, cy + h),
    ]
}

/// Face in `compact_layout` with both eyes at `opening` px and the chin
/// offset `lean` px sideways over a 160 px face height.
pub fn synthetic_face(opening: f32, lean: f32) -> LandmarkSet {
    let mut points = Vec::with_capacity(14);
    points.extend_from_slice(&eye(80.0, 100.0, opening));
    points.extend_from_slice(&eye(140.0, 100.0, opening));
    points.push(Point2::new(110.0, 40.0));
    points.push(Point2::new(110.0 + lean, 200.0));
    LandmarkSet::pixel(points)
}

/// Extractor replaying a script of results, one per `detect` call. Once the
/// script runs out the last entry repeats (or no face, if empty).
#[derive(Debug, Default)]
pub struct ScriptedExtractor {
    script: VecDeque<Result<Vec<LandmarkSet>, String>>,
    last: Option<Result<Vec<LandmarkSet>, String>>,
    open: bool,
    fail_open: bool,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same face on every frame
    pub fn constant(face: LandmarkSet) -> Self {
        let mut extractor = Self::new();
        extractor.push_face(face);
        extractor
    }

    /// Extractor whose `open` fails
    pub fn unavailable() -> Self {
        Self {
            fail_open: true,
            ..Default::default()
        }
    }

    pub fn push_face(&mut self, face: LandmarkSet) -> &mut Self {
        self.script.push_back(Ok(vec![face]));
        self
    }

    pub fn push_no_face(&mut self) -> &mut Self {
        self.script.push_back(Ok(Vec::new()));
        self
    }

    pub fn push_failure(&mut self, reason: &str) -> &mut Self {
        self.script.push_back(Err(reason.to_string()));
        self
    }
}

impl GeometryExtractor for ScriptedExtractor {
    fn open(&mut self) -> Result<(), DmsError> {
        if self.fail_open {
            return Err(DmsError::ModelLoad("scripted model unavailable".to_string()));
        }
        self.open = true;
        Ok(())
    }

    fn detect(&mut self, _frame: &VideoFrame) -> Result<Vec<LandmarkSet>, DmsError> {
        if !self.open {
            return Err(DmsError::ExtractorClosed);
        }

        if let Some(next) = self.script.pop_front() {
            self.last = Some(next);
        }
        match &self.last {
            Some(Ok(faces)) => Ok(faces.clone()),
            Some(Err(reason)) => Err(DmsError::Inference(reason.clone())),
            None => Ok(Vec::new()),
        }
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
