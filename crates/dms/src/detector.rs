//! Facial landmark extraction

use camera_capture::VideoFrame;
use crate::landmarks::{LandmarkSet, Point2, FACE_MESH_LANDMARKS};
use crate::{DmsConfig, DmsError};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ndarray::Array4;
use tracing::{debug, info, error};

/// Face-mesh model input edge (pixels)
const MESH_INPUT_SIZE: u32 = 192;

/// Result of running the extractor on one frame
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// First detected face
    Face(LandmarkSet),
    /// Frame processed, no face in it
    NoFace,
    /// The extractor errored on this frame
    Failed(String),
}

impl Detection {
    /// Keep only the first face of an extractor result
    pub fn from_result(result: Result<Vec<LandmarkSet>, DmsError>) -> Self {
        match result {
            Ok(faces) => faces.into_iter().next().map_or(Detection::NoFace, Detection::Face),
            Err(e) => Detection::Failed(e.to_string()),
        }
    }

    pub fn face_present(&self) -> bool {
        matches!(self, Detection::Face(_))
    }
}

/// Produces landmark sets from frames. Heavy state (models) is acquired once
/// in `open` and released in `close`; `detect` is called every tick.
pub trait GeometryExtractor: Send {
    fn open(&mut self) -> Result<(), DmsError>;

    /// Zero or more faces, in pixel or normalized coordinates
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<LandmarkSet>, DmsError>;

    fn close(&mut self);

    fn is_open(&self) -> bool;
}

impl<E: GeometryExtractor + ?Sized> GeometryExtractor for Box<E> {
    fn open(&mut self) -> Result<(), DmsError> {
        (**self).open()
    }

    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<LandmarkSet>, DmsError> {
        (**self).detect(frame)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

/// 468-point face-mesh landmark model run through ONNX Runtime.
///
/// Expects a `1x3x192x192` float input scaled to 0..1 and produces
/// `468 * 3` landmark coordinates in input pixels as the first output, with
/// a face presence logit as the second output.
pub struct FaceMeshExtractor {
    model_path: String,
    face_confidence: f32,
    session: Option<Session>,
}

impl FaceMeshExtractor {
    pub fn new(config: &DmsConfig) -> Result<Self, DmsError> {
        let model_path = config
            .face_model_path
            .clone()
            .ok_or_else(|| DmsError::Config("no face mesh model path configured".to_string()))?;

        Ok(Self {
            model_path,
            face_confidence: config.face_confidence,
            session: None,
        })
    }

    fn preprocess(frame: &VideoFrame) -> Result<Array4<f32>, DmsError> {
        let img = image::ImageBuffer::<image::Rgb<u8>, _>::from_raw(
            frame.width,
            frame.height,
            frame.data.as_slice(),
        )
        .ok_or_else(|| DmsError::ImageProcessing("Failed to create image buffer".into()))?;

        let resized = image::imageops::resize(
            &img,
            MESH_INPUT_SIZE,
            MESH_INPUT_SIZE,
            image::imageops::FilterType::Triangle,
        );

        let size = MESH_INPUT_SIZE as usize;
        let mut input = Array4::<f32>::zeros((1, 3, size, size));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                input[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
            }
        }
        Ok(input)
    }

    fn decode(raw: &[f32]) -> Result<LandmarkSet, DmsError> {
        if raw.len() < FACE_MESH_LANDMARKS * 3 {
            return Err(DmsError::Inference(format!(
                "expected {} landmark values, got {}",
                FACE_MESH_LANDMARKS * 3,
                raw.len()
            )));
        }

        let scale = MESH_INPUT_SIZE as f32;
        let points = raw
            .chunks_exact(3)
            .take(FACE_MESH_LANDMARKS)
            .map(|xyz| Point2::new(xyz[0] / scale, xyz[1] / scale))
            .collect();
        Ok(LandmarkSet::normalized(points))
    }
}

impl GeometryExtractor for FaceMeshExtractor {
    fn open(&mut self) -> Result<(), DmsError> {
        if self.session.is_some() {
            return Ok(());
        }

        info!("Loading face mesh model from {}", self.model_path);
        let session = Session::builder()
            .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|builder| builder.commit_from_file(&self.model_path))
            .map_err(|e| {
                error!("Failed to load face mesh model: {}", e);
                DmsError::ModelLoad(e.to_string())
            })?;

        self.session = Some(session);
        Ok(())
    }

    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<LandmarkSet>, DmsError> {
        let session = self.session.as_ref().ok_or(DmsError::ExtractorClosed)?;
        let input = Self::preprocess(frame)?;

        let outputs = session
            .run(ort::inputs![input].map_err(|e| DmsError::Inference(e.to_string()))?)
            .map_err(|e| DmsError::Inference(e.to_string()))?;

        if outputs.len() > 1 {
            let logit = outputs[1]
                .try_extract_tensor::<f32>()
                .map_err(|e| DmsError::Inference(e.to_string()))?
                .iter()
                .next()
                .copied()
                .unwrap_or(f32::NEG_INFINITY);
            let score = 1.0 / (1.0 + (-logit).exp());
            if score < self.face_confidence {
                debug!("Face score {:.3} below {:.3}", score, self.face_confidence);
                return Ok(Vec::new());
            }
        }

        let raw: Vec<f32> = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DmsError::Inference(e.to_string()))?
            .iter()
            .copied()
            .collect();

        Ok(vec![Self::decode(&raw)?])
    }

    fn close(&mut self) {
        if self.session.take().is_some() {
            info!("Released face mesh model");
        }
    }

    fn is_open(&self) -> bool {
        self.session.is_some()
    }
}
