//! Deterministic substitutes for stages that fail recoverably.
//!
//! Every stage has one [`FallbackProducer`]. The orchestrator routes each
//! stage result through [`recover`], which logs the error and swaps in the
//! producer's output; substituted results always carry `is_fallback = true`.

use crate::body::{BodyRatios, BodyType};
use crate::buffer::ImageBuffer;
use crate::classifier::{Season, ToneClassification};
use crate::confidence::Stage;
use crate::error::Result;
use crate::landmarks::{DetectedFace, Topology};
use crate::lighting::{LightingAnalysis, LightingType, ZoneReading, Zone};
use crate::types::{BoundingBox, Landmark};
use crate::white_balance::{CorrectionGains, WhiteBalanceMethod, WhiteBalanceResult};

/// Confidence reported by every substituted result unless configured otherwise.
pub const FALLBACK_CONFIDENCE: f32 = 0.5;

/// Produces a stand-in result for one stage.
pub trait FallbackProducer {
    type Input: ?Sized;
    type Output;

    fn produce(&self, input: &Self::Input) -> Self::Output;
}

/// Return `result`, or the producer's output if the error is recoverable.
///
/// Unrecoverable errors pass through untouched.
pub fn recover<P: FallbackProducer + ?Sized>(
    stage: Stage,
    result: Result<P::Output>,
    producer: &P,
    input: &P::Input,
) -> Result<P::Output> {
    match result {
        Ok(value) => Ok(value),
        Err(err) if err.is_recoverable() => {
            tracing::warn!(%stage, error = %err, "substituting fallback result");
            Ok(producer.produce(input))
        }
        Err(err) => Err(err),
    }
}

/// A centred face-mesh that always passes validation.
#[derive(Debug, Clone)]
pub struct FaceFallback {
    pub bounding_box: BoundingBox,
    pub confidence: f32,
}

impl Default for FaceFallback {
    fn default() -> Self {
        Self {
            bounding_box: BoundingBox::new(0.3, 0.2, 0.7, 0.8),
            confidence: FALLBACK_CONFIDENCE,
        }
    }
}

impl FallbackProducer for FaceFallback {
    type Input = ();
    type Output = DetectedFace;

    fn produce(&self, _: &()) -> DetectedFace {
        let b = self.bounding_box;
        let n = Topology::FaceMesh.landmark_count();
        // 18 x 26 lattice spanning the box corner to corner.
        let (cols, rows) = (18usize, 26usize);
        let landmarks = (0..n)
            .map(|i| {
                let u = (i % cols) as f32 / (cols - 1) as f32;
                let v = (i / cols) as f32 / (rows - 1) as f32;
                Landmark::new(b.x_min + u * b.width(), b.y_min + v * b.height(), 0.0, 1.0)
            })
            .collect();
        DetectedFace {
            landmarks,
            bounding_box: b,
            confidence: self.confidence,
            is_fallback: true,
        }
    }
}

/// Leaves the region uncorrected.
#[derive(Debug, Clone)]
pub struct WhiteBalanceFallback {
    pub confidence: f32,
}

impl Default for WhiteBalanceFallback {
    fn default() -> Self {
        Self {
            confidence: FALLBACK_CONFIDENCE,
        }
    }
}

impl FallbackProducer for WhiteBalanceFallback {
    type Input = ImageBuffer;
    type Output = WhiteBalanceResult;

    fn produce(&self, region: &ImageBuffer) -> WhiteBalanceResult {
        WhiteBalanceResult {
            corrected: region.clone(),
            gains: CorrectionGains::IDENTITY,
            method: WhiteBalanceMethod::Identity,
            confidence: self.confidence,
            is_fallback: true,
        }
    }
}

/// Daylight, evenly lit.
#[derive(Debug, Clone)]
pub struct LightingFallback {
    pub cct_kelvin: f32,
    pub confidence: f32,
}

impl Default for LightingFallback {
    fn default() -> Self {
        Self {
            cct_kelvin: 6500.0,
            confidence: FALLBACK_CONFIDENCE,
        }
    }
}

impl FallbackProducer for LightingFallback {
    type Input = ();
    type Output = LightingAnalysis;

    fn produce(&self, _: &()) -> LightingAnalysis {
        LightingAnalysis {
            cct_kelvin: self.cct_kelvin,
            lighting_type: LightingType::NeutralCool,
            zone_uniformity: 1.0,
            shadow_score: 1.0,
            suitable: true,
            zones: Zone::ALL
                .iter()
                .map(|&zone| ZoneReading {
                    zone,
                    mean_rgb: [0.0; 3],
                    luminance: 0.0,
                    cct_kelvin: None,
                    shadowed: false,
                })
                .collect(),
            issues: Vec::new(),
            confidence: self.confidence,
            is_fallback: true,
        }
    }
}

/// A fixed season, reported at its own centroid.
#[derive(Debug, Clone)]
pub struct ToneFallback {
    pub season: Season,
    pub confidence: f32,
}

impl Default for ToneFallback {
    fn default() -> Self {
        Self {
            season: Season::BrightSpring,
            confidence: FALLBACK_CONFIDENCE,
        }
    }
}

impl FallbackProducer for ToneFallback {
    type Input = ();
    type Output = ToneClassification;

    fn produce(&self, _: &()) -> ToneClassification {
        ToneClassification::unmeasured(self.season, self.confidence)
    }
}

/// Average proportions, perfectly symmetric.
#[derive(Debug, Clone)]
pub struct BodyFallback {
    pub confidence: f32,
}

impl Default for BodyFallback {
    fn default() -> Self {
        Self {
            confidence: FALLBACK_CONFIDENCE,
        }
    }
}

impl FallbackProducer for BodyFallback {
    type Input = ();
    type Output = BodyRatios;

    fn produce(&self, _: &()) -> BodyRatios {
        BodyRatios {
            shoulder_to_hip: 1.45,
            waist_to_hip: 1.2,
            leg_to_torso: 1.45,
            arm_to_torso: 1.0,
            symmetry_score: 1.0,
            body_type: BodyType::Straight,
            confidence: self.confidence,
            is_fallback: true,
        }
    }
}

/// One producer per stage.
#[derive(Debug, Clone, Default)]
pub struct Fallbacks {
    pub face: FaceFallback,
    pub white_balance: WhiteBalanceFallback,
    pub lighting: LightingFallback,
    pub tone: ToneFallback,
    pub body: BodyFallback,
}

impl Fallbacks {
    /// Producers that all report `confidence`.
    pub fn with_confidence(confidence: f32) -> Self {
        Self {
            face: FaceFallback {
                confidence,
                ..FaceFallback::default()
            },
            white_balance: WhiteBalanceFallback { confidence },
            lighting: LightingFallback {
                confidence,
                ..LightingFallback::default()
            },
            tone: ToneFallback {
                confidence,
                ..ToneFallback::default()
            },
            body: BodyFallback { confidence },
        }
    }
}
