//! Landmark topologies, validation and face selection.
//!
//! Landmark detection itself is external: anything that can turn an image into
//! candidate landmark sets implements [`LandmarkProvider`]. This module only
//! decides whether a candidate is usable and which one to keep.

use serde::Serialize;

use crate::buffer::ImageBuffer;
use crate::error::{Error, Result};
use crate::types::{BoundingBox, Landmark};

/// MediaPipe Face Mesh indices used as visibility anchors.
pub mod face_indices {
    pub const LEFT_EYE_OUTER: usize = 33;
    pub const LEFT_EYE_INNER: usize = 133;
    pub const RIGHT_EYE_INNER: usize = 362;
    pub const RIGHT_EYE_OUTER: usize = 263;
    pub const NOSE_TIP: usize = 1;
    pub const LEFT_MOUTH_CORNER: usize = 61;
    pub const RIGHT_MOUTH_CORNER: usize = 291;
    pub const FOREHEAD: usize = 10;
    pub const CHIN: usize = 152;
    pub const LEFT_CHEEK: usize = 234;
    pub const RIGHT_CHEEK: usize = 454;
}

/// MediaPipe/BlazePose indices.
pub mod pose_indices {
    pub const NOSE: usize = 0;
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
    pub const LEFT_ELBOW: usize = 13;
    pub const RIGHT_ELBOW: usize = 14;
    pub const LEFT_WRIST: usize = 15;
    pub const RIGHT_WRIST: usize = 16;
    pub const LEFT_HIP: usize = 23;
    pub const RIGHT_HIP: usize = 24;
    pub const LEFT_KNEE: usize = 25;
    pub const RIGHT_KNEE: usize = 26;
    pub const LEFT_ANKLE: usize = 27;
    pub const RIGHT_ANKLE: usize = 28;
}

/// A fixed landmark layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Topology {
    /// 468-point face mesh.
    FaceMesh,
    /// 33-point body pose.
    Pose,
}

impl Topology {
    pub const fn landmark_count(self) -> usize {
        match self {
            Topology::FaceMesh => 468,
            Topology::Pose => 33,
        }
    }

    /// Landmarks that must all clear the visibility floor.
    pub fn key_points(self) -> &'static [usize] {
        use face_indices as f;
        use pose_indices as p;
        match self {
            Topology::FaceMesh => &[
                f::LEFT_EYE_OUTER,
                f::LEFT_EYE_INNER,
                f::RIGHT_EYE_INNER,
                f::RIGHT_EYE_OUTER,
                f::NOSE_TIP,
                f::LEFT_MOUTH_CORNER,
                f::RIGHT_MOUTH_CORNER,
            ],
            Topology::Pose => &[
                p::LEFT_SHOULDER,
                p::RIGHT_SHOULDER,
                p::LEFT_HIP,
                p::RIGHT_HIP,
                p::LEFT_ANKLE,
                p::RIGHT_ANKLE,
            ],
        }
    }
}

/// Capability to produce candidate landmark sets for an image.
///
/// Implementations may wrap a native detector, a WASM model or a remote
/// service; the pipeline never inspects which.
pub trait LandmarkProvider {
    /// Zero or more candidate landmark sets, in normalized coordinates.
    fn detect(&self, image: &ImageBuffer) -> Vec<Vec<Landmark>>;
}

/// Candidates that were already computed.
impl LandmarkProvider for [Vec<Landmark>] {
    fn detect(&self, _image: &ImageBuffer) -> Vec<Vec<Landmark>> {
        self.to_vec()
    }
}

/// A validated face.
#[derive(Debug, Clone, Serialize)]
pub struct DetectedFace {
    #[serde(skip)]
    pub landmarks: Vec<Landmark>,
    pub bounding_box: BoundingBox,
    pub confidence: f32,
    pub is_fallback: bool,
}

/// Visibility summary of a single candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateScore {
    pub bbox: BoundingBox,
    pub mean_visibility: f32,
    pub key_mean_visibility: f32,
}

impl CandidateScore {
    /// Detection confidence: key-point and overall visibility, equally weighted.
    pub fn confidence(&self) -> f32 {
        (0.5 * self.key_mean_visibility + 0.5 * self.mean_visibility).clamp(0.0, 1.0)
    }
}

/// Validates landmark sets against a topology.
#[derive(Debug, Clone)]
pub struct LandmarkValidator {
    topology: Topology,
    visibility_floor: f32,
}

impl LandmarkValidator {
    pub fn new(topology: Topology, visibility_floor: f32) -> Self {
        Self {
            topology,
            visibility_floor,
        }
    }

    /// Whether the candidate has the topology's landmark count and a non-degenerate extent.
    fn matches_topology(&self, landmarks: &[Landmark]) -> Option<BoundingBox> {
        if landmarks.len() != self.topology.landmark_count() {
            return None;
        }
        BoundingBox::enclosing(landmarks).filter(|b| b.is_valid())
    }

    /// Score one normalized candidate.
    ///
    /// Fails with [`Error::NoFaceDetected`] for a topology mismatch and with
    /// [`Error::LowVisibilityLandmarks`] naming the first key point under the floor.
    pub fn score(&self, landmarks: &[Landmark]) -> Result<CandidateScore> {
        let bbox = self.matches_topology(landmarks).ok_or(Error::NoFaceDetected {
            candidates: 1,
            expected: self.topology.landmark_count(),
        })?;

        let keys = self.topology.key_points();
        if let Some(&index) = keys
            .iter()
            .find(|&&i| landmarks[i].visibility < self.visibility_floor)
        {
            return Err(Error::LowVisibilityLandmarks {
                index,
                visibility: landmarks[index].visibility,
                floor: self.visibility_floor,
            });
        }

        let mean_visibility =
            landmarks.iter().map(|l| l.visibility).sum::<f32>() / landmarks.len() as f32;
        let key_mean_visibility =
            keys.iter().map(|&i| landmarks[i].visibility).sum::<f32>() / keys.len() as f32;

        Ok(CandidateScore {
            bbox,
            mean_visibility,
            key_mean_visibility,
        })
    }

    /// Pick the best face among raw candidates.
    ///
    /// Candidates are normalized first. Among those passing validation the one
    /// with the largest box wins, ties going to the higher mean visibility.
    /// With no topology match the error is [`Error::NoFaceDetected`]; when
    /// candidates match but none clears the floor, the visibility error of the
    /// largest one is returned.
    pub fn select_best(&self, candidates: &[Vec<Landmark>]) -> Result<DetectedFace> {
        let mut best: Option<(CandidateScore, Vec<Landmark>)> = None;
        let mut largest_rejection: Option<(f32, Error)> = None;

        for raw in candidates {
            let landmarks: Vec<Landmark> = raw.iter().map(Landmark::normalized).collect();
            match self.score(&landmarks) {
                Ok(score) => {
                    let better = match &best {
                        None => true,
                        Some((current, _)) => {
                            let (a, b) = (score.bbox.area(), current.bbox.area());
                            a > b || (a == b && score.mean_visibility > current.mean_visibility)
                        }
                    };
                    if better {
                        best = Some((score, landmarks));
                    }
                }
                Err(err @ Error::LowVisibilityLandmarks { .. }) => {
                    let area = self
                        .matches_topology(&landmarks)
                        .map(|b| b.area())
                        .unwrap_or(0.0);
                    if largest_rejection.as_ref().map_or(true, |(a, _)| area > *a) {
                        largest_rejection = Some((area, err));
                    }
                }
                Err(_) => {}
            }
        }

        match (best, largest_rejection) {
            (Some((score, landmarks)), _) => Ok(DetectedFace {
                landmarks,
                bounding_box: score.bbox,
                confidence: score.confidence(),
                is_fallback: false,
            }),
            (None, Some((_, err))) => Err(err),
            (None, None) => Err(Error::NoFaceDetected {
                candidates: candidates.len(),
                expected: self.topology.landmark_count(),
            }),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::synthetic_face;
    use super::*;

    fn validator() -> LandmarkValidator {
        LandmarkValidator::new(Topology::FaceMesh, 0.5)
    }

    #[test]
    fn topology_sizes() {
        assert_eq!(Topology::FaceMesh.landmark_count(), 468);
        assert_eq!(Topology::Pose.landmark_count(), 33);
        assert_eq!(Topology::Pose.key_points().len(), 6);
    }

    #[test]
    fn empty_input_is_no_face() {
        let err = validator().select_best(&[]).unwrap_err();
        assert!(matches!(err, Error::NoFaceDetected { candidates: 0, .. }));

        let err = validator().select_best(&[vec![]]).unwrap_err();
        assert!(matches!(err, Error::NoFaceDetected { candidates: 1, .. }));
    }

    #[test]
    fn wrong_count_is_no_face() {
        let mut face = synthetic_face(BoundingBox::new(0.2, 0.2, 0.8, 0.8), 0.9);
        face.truncate(400);
        assert!(matches!(
            validator().select_best(&[face]),
            Err(Error::NoFaceDetected { .. })
        ));
    }

    #[test]
    fn occluded_key_point_is_low_visibility() {
        let mut face = synthetic_face(BoundingBox::new(0.2, 0.2, 0.8, 0.8), 0.9);
        face[face_indices::NOSE_TIP].visibility = 0.2;
        match validator().select_best(&[face]) {
            Err(Error::LowVisibilityLandmarks { index, .. }) => {
                assert_eq!(index, face_indices::NOSE_TIP)
            }
            other => panic!("expected LowVisibilityLandmarks, got {other:?}"),
        }
    }

    #[test]
    fn largest_face_wins() {
        let small = synthetic_face(BoundingBox::new(0.1, 0.1, 0.3, 0.3), 0.99);
        let large = synthetic_face(BoundingBox::new(0.4, 0.3, 0.9, 0.9), 0.7);
        let face = validator().select_best(&[small, large]).unwrap();
        assert!(face.bounding_box.x_min > 0.35);
        assert!(!face.is_fallback);
    }

    #[test]
    fn equal_area_tie_goes_to_visibility() {
        let bbox = BoundingBox::new(0.2, 0.2, 0.6, 0.6);
        let dim = synthetic_face(bbox, 0.6);
        let bright = synthetic_face(bbox, 0.95);
        let face = validator().select_best(&[dim, bright]).unwrap();
        assert!((face.confidence - 0.95).abs() < 1e-4);
    }

    #[test]
    fn visible_face_beats_larger_occluded_one() {
        let mut occluded = synthetic_face(BoundingBox::new(0.0, 0.0, 1.0, 1.0), 0.9);
        occluded[face_indices::LEFT_EYE_OUTER].visibility = 0.1;
        let ok = synthetic_face(BoundingBox::new(0.3, 0.3, 0.6, 0.6), 0.9);
        let face = validator().select_best(&[occluded, ok]).unwrap();
        assert!(face.bounding_box.x_max < 0.7);
    }

    #[test]
    fn high_visibility_gives_high_confidence() {
        let face = synthetic_face(BoundingBox::new(0.25, 0.2, 0.75, 0.8), 0.92);
        let detected = validator().select_best(&[face]).unwrap();
        assert!(detected.confidence > 0.8);
    }

    #[test]
    fn slice_provider_returns_candidates() {
        let candidates = vec![synthetic_face(BoundingBox::new(0.2, 0.2, 0.8, 0.8), 0.9)];
        let image = ImageBuffer::from_fn(4, 4, |_, _| [0, 0, 0]).unwrap();
        assert_eq!(candidates.as_slice().detect(&image).len(), 1);
    }
}
