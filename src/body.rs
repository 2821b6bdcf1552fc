//! Body proportions from 33 pose landmarks.
//!
//! All lengths are Euclidean distances between landmarks (or midpoints of
//! landmark pairs). Ratios are dimensionless, so the normalized coordinate
//! scale cancels out once x is scaled by the image aspect ratio, which
//! [`BodyRatioCalculator::with_aspect_ratio`] sets.

use serde::Serialize;

use crate::config::BodyConfig;
use crate::error::{Error, Result};
use crate::landmarks::{pose_indices as p, Topology};
use crate::types::{Landmark, Point};

/// Frame classification by shoulder/hip balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BodyType {
    Straight,
    Wave,
    Natural,
}

#[derive(Debug, Clone, Serialize)]
pub struct BodyRatios {
    /// Shoulder width / hip width.
    pub shoulder_to_hip: f32,
    /// Waist proxy width / hip width.
    pub waist_to_hip: f32,
    /// Mean leg length / torso length.
    pub leg_to_torso: f32,
    /// Mean arm length / torso length.
    pub arm_to_torso: f32,
    /// Left/right agreement, 1.0 for a perfectly mirrored pose.
    pub symmetry_score: f32,
    pub body_type: BodyType,
    /// Mean visibility of the key landmarks.
    pub confidence: f32,
    pub is_fallback: bool,
}

#[derive(Debug, Clone)]
pub struct BodyRatioCalculator {
    config: BodyConfig,
    aspect_ratio: f32,
}

impl BodyRatioCalculator {
    pub fn new(config: BodyConfig) -> Self {
        Self {
            config,
            aspect_ratio: 1.0,
        }
    }

    /// Image width / height, so horizontal and vertical distances share a unit.
    pub fn with_aspect_ratio(mut self, aspect_ratio: f32) -> Self {
        if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
            self.aspect_ratio = aspect_ratio;
        }
        self
    }

    /// Compute ratios, symmetry and body type.
    ///
    /// Fails with [`Error::IncompletePoseLandmarks`] unless there are exactly 33
    /// landmarks and every key landmark (shoulders, hips, ankles) clears the
    /// visibility floor.
    pub fn calculate(&self, landmarks: &[Landmark]) -> Result<BodyRatios> {
        let expected = Topology::Pose.landmark_count();
        if landmarks.len() != expected {
            return Err(Error::IncompletePoseLandmarks {
                reason: format!("expected {expected} landmarks, got {}", landmarks.len()),
            });
        }

        let landmarks: Vec<Landmark> = landmarks.iter().map(Landmark::normalized).collect();
        let key = Topology::Pose.key_points();
        for &index in key {
            let visibility = landmarks[index].visibility;
            if visibility < self.config.visibility_floor {
                return Err(Error::IncompletePoseLandmarks {
                    reason: format!(
                        "key landmark {index} has visibility {visibility:.2} (floor {:.2})",
                        self.config.visibility_floor
                    ),
                });
            }
        }
        let confidence =
            key.iter().map(|&i| landmarks[i].visibility).sum::<f32>() / key.len() as f32;

        let at = |index: usize| {
            let lm = landmarks[index];
            Point::new(lm.x * self.aspect_ratio, lm.y)
        };

        let (ls, rs) = (at(p::LEFT_SHOULDER), at(p::RIGHT_SHOULDER));
        let (lh, rh) = (at(p::LEFT_HIP), at(p::RIGHT_HIP));
        let (le, re) = (at(p::LEFT_ELBOW), at(p::RIGHT_ELBOW));
        let (lw, rw) = (at(p::LEFT_WRIST), at(p::RIGHT_WRIST));
        let (lk, rk) = (at(p::LEFT_KNEE), at(p::RIGHT_KNEE));
        let (la, ra) = (at(p::LEFT_ANKLE), at(p::RIGHT_ANKLE));

        let shoulder_width = ls.distance(&rs);
        let hip_width = lh.distance(&rh);
        let waist_width = ls
            .lerp(&lh, self.config.waist_fraction)
            .distance(&rs.lerp(&rh, self.config.waist_fraction));
        let shoulder_mid = ls.midpoint(&rs);
        let hip_mid = lh.midpoint(&rh);
        let torso = shoulder_mid.distance(&hip_mid);

        let left_leg = lh.distance(&lk) + lk.distance(&la);
        let right_leg = rh.distance(&rk) + rk.distance(&ra);
        let left_arm = ls.distance(&le) + le.distance(&lw);
        let right_arm = rs.distance(&re) + re.distance(&rw);

        let shoulder_to_hip = ratio(shoulder_width, hip_width);
        let leg_to_torso = ratio((left_leg + right_leg) / 2.0, torso);

        let midline = Midline::new(at(p::NOSE), hip_mid);
        let pairs = [
            (midline.distance(&ls), midline.distance(&rs)),
            (ls.distance(&lh), rs.distance(&rh)),
            (left_leg, right_leg),
            (left_arm, right_arm),
        ];
        let symmetry_score =
            pairs.iter().map(|&(l, r)| pair_symmetry(l, r)).sum::<f32>() / pairs.len() as f32;

        let body_type = self.body_type(shoulder_to_hip, leg_to_torso);
        tracing::debug!(
            shoulder_to_hip,
            leg_to_torso,
            symmetry_score,
            ?body_type,
            "body ratios computed"
        );

        Ok(BodyRatios {
            shoulder_to_hip,
            waist_to_hip: ratio(waist_width, hip_width),
            leg_to_torso,
            arm_to_torso: ratio((left_arm + right_arm) / 2.0, torso),
            symmetry_score,
            body_type,
            confidence,
            is_fallback: false,
        })
    }

    /// Threshold rules on shoulder/hip; within `tie_margin` of a threshold the
    /// leg/torso ratio decides.
    pub fn body_type(&self, shoulder_to_hip: f32, leg_to_torso: f32) -> BodyType {
        let c = &self.config;
        if (shoulder_to_hip - c.natural_threshold).abs() < c.tie_margin {
            return if leg_to_torso >= c.natural_leg_ratio {
                BodyType::Natural
            } else {
                BodyType::Straight
            };
        }
        if (shoulder_to_hip - c.wave_threshold).abs() < c.tie_margin {
            return if leg_to_torso < c.wave_leg_ratio {
                BodyType::Wave
            } else {
                BodyType::Straight
            };
        }
        if shoulder_to_hip >= c.natural_threshold {
            BodyType::Natural
        } else if shoulder_to_hip <= c.wave_threshold {
            BodyType::Wave
        } else {
            BodyType::Straight
        }
    }
}

/// Body axis through the nose and the hip midpoint.
struct Midline {
    origin: Point,
    direction: Point,
}

impl Midline {
    fn new(top: Point, bottom: Point) -> Self {
        let d = bottom - top;
        let len = d.x.hypot(d.y);
        // Degenerate axis: fall back to the vertical through the hips.
        let direction = if len > f32::EPSILON {
            d * (1.0 / len)
        } else {
            Point::new(0.0, 1.0)
        };
        Self {
            origin: bottom,
            direction,
        }
    }

    /// Perpendicular distance from `point` to the axis.
    fn distance(&self, point: &Point) -> f32 {
        let v = *point - self.origin;
        (v.x * self.direction.y - v.y * self.direction.x).abs()
    }
}

/// `1 - |l - r| / max(l, r)`; two zero lengths are symmetric.
fn pair_symmetry(left: f32, right: f32) -> f32 {
    let max = left.max(right);
    if max > 0.0 {
        (1.0 - (left - right).abs() / max).clamp(0.0, 1.0)
    } else {
        1.0
    }
}

fn ratio(numerator: f32, denominator: f32) -> f32 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
