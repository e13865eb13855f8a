//! Facial landmark sets and the index layout used to read them

use serde::{Deserialize, Serialize};

use crate::DmsError;

/// Cardinality of the face-mesh landmark model
pub const FACE_MESH_LANDMARKS: usize = 468;

/// 2-D point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance
    pub fn distance(&self, other: &Point2) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Units of the points in a `LandmarkSet`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateSpace {
    /// Pixel coordinates of the source frame
    Pixel,
    /// 0..1 relative to frame width and height
    Normalized,
}

/// Landmarks of one detected face. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Point2>,
    space: CoordinateSpace,
}

impl LandmarkSet {
    /// Landmarks already in pixel units
    pub fn pixel(points: Vec<Point2>) -> Self {
        Self {
            points,
            space: CoordinateSpace::Pixel,
        }
    }

    /// Landmarks relative to frame size
    pub fn normalized(points: Vec<Point2>) -> Self {
        Self {
            points,
            space: CoordinateSpace::Normalized,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn space(&self) -> CoordinateSpace {
        self.space
    }

    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    /// Point at `index` projected into pixel space
    pub fn pixel_point(&self, index: usize, frame_width: u32, frame_height: u32) -> Result<Point2, DmsError> {
        let p = self.points.get(index).ok_or(DmsError::InvalidLandmarkIndex {
            index,
            len: self.points.len(),
        })?;
        if !p.is_finite() {
            return Err(DmsError::InvalidInput(format!("landmark {} is not finite", index)));
        }

        match self.space {
            CoordinateSpace::Pixel => Ok(*p),
            CoordinateSpace::Normalized => {
                if frame_width == 0 || frame_height == 0 {
                    return Err(DmsError::InvalidInput(format!(
                        "cannot project normalized landmarks onto a {}x{} frame",
                        frame_width, frame_height
                    )));
                }
                Ok(Point2::new(p.x * frame_width as f32, p.y * frame_height as f32))
            }
        }
    }
}

/// Six ordered contour points per eye: one corner, two upper lid points, the
/// opposite corner, then the two lower lid points facing the upper ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeLandmarkIndices {
    pub left: [usize; 6],
    pub right: [usize; 6],
}

/// Forehead and chin points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TiltLandmarkIndices {
    pub forehead: usize,
    pub chin: usize,
}

/// Which landmark indices feed the signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandmarkLayout {
    pub eyes: EyeLandmarkIndices,
    pub tilt: TiltLandmarkIndices,
}

impl LandmarkLayout {
    /// Face-mesh (468 point) layout
    pub const fn face_mesh() -> Self {
        Self {
            eyes: EyeLandmarkIndices {
                left: [362, 385, 387, 263, 373, 380],
                right: [33, 160, 158, 133, 153, 144],
            },
            tilt: TiltLandmarkIndices {
                forehead: 10,
                chin: 152,
            },
        }
    }

    /// Smallest landmark count this layout can read
    pub fn required_len(&self) -> usize {
        self.eyes
            .left
            .iter()
            .chain(self.eyes.right.iter())
            .chain([self.tilt.forehead, self.tilt.chin].iter())
            .max()
            .map_or(0, |max| max + 1)
    }
}

impl Default for LandmarkLayout {
    fn default() -> Self {
        Self::face_mesh()
    }
}
