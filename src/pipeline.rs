//! Stage orchestration.
//!
//! The face branch runs validation, region extraction, skin detection, white
//! balance, lighting analysis and tone classification in order. Recoverable
//! stage failures are replaced by the stage's fallback, so a run only fails on
//! a malformed image buffer.

use rayon::prelude::*;
use serde::Serialize;

use crate::body::{BodyRatioCalculator, BodyRatios};
use crate::buffer::{ImageAccess, ImageBuffer, PixelFormat};
use crate::classifier::{PersonalColorClassifier, ToneClassification};
use crate::color::LabColor;
use crate::confidence::{propagate, OverallConfidence, Stage, StageReport};
use crate::config::{CalibrationConfig, WhiteBalancePolicy};
use crate::error::{Error, Result};
use crate::fallback::{recover, FallbackProducer, Fallbacks};
use crate::landmarks::{DetectedFace, LandmarkProvider, LandmarkValidator, Topology};
use crate::lighting::{LightingAnalysis, LightingAnalyzer};
use crate::region::extract_region;
use crate::skin::{SkinDetector, SkinMask};
use crate::types::{BoundingBox, Landmark};
use crate::white_balance::{WhiteBalanceCorrector, WhiteBalanceResult};

/// Everything the face branch produced.
#[derive(Debug, Clone, Serialize)]
pub struct FaceAnalysis {
    pub face: DetectedFace,
    /// The padded region that was analyzed, in normalized image coordinates.
    pub region: BoundingBox,
    pub skin: SkinMask,
    pub white_balance: WhiteBalanceResult,
    pub lighting: LightingAnalysis,
    pub tone: ToneClassification,
    pub overall: OverallConfidence,
}

#[derive(Debug, Clone, Serialize)]
pub struct BodyAnalysis {
    pub ratios: BodyRatios,
    pub overall: OverallConfidence,
}

/// One image and its candidate landmark sets, for batch analysis.
#[derive(Debug, Clone)]
pub struct FaceJob {
    pub image: ImageBuffer,
    pub candidates: Vec<Vec<Landmark>>,
}

#[derive(Debug, Clone)]
pub struct CalibrationPipeline {
    config: CalibrationConfig,
    fallbacks: Fallbacks,
    validator: LandmarkValidator,
    skin: SkinDetector,
    white_balance: WhiteBalanceCorrector,
    lighting: LightingAnalyzer,
    classifier: PersonalColorClassifier,
    body: BodyRatioCalculator,
}

impl Default for CalibrationPipeline {
    fn default() -> Self {
        Self::build(CalibrationConfig::default())
    }
}

impl CalibrationPipeline {
    /// Validate `config` and build every stage from it.
    pub fn new(config: CalibrationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: CalibrationConfig) -> Self {
        Self {
            fallbacks: Fallbacks::with_confidence(config.validation.fallback_confidence),
            validator: LandmarkValidator::new(
                Topology::FaceMesh,
                config.validation.visibility_floor,
            ),
            skin: SkinDetector::new(config.skin.clone()),
            white_balance: WhiteBalanceCorrector::new(config.white_balance.clone()),
            lighting: LightingAnalyzer::new(config.lighting.clone()),
            classifier: PersonalColorClassifier::new(config.classifier.clone()),
            body: BodyRatioCalculator::new(config.body.clone()),
            config,
        }
    }

    /// Replace the fallback producers.
    pub fn with_fallbacks(mut self, fallbacks: Fallbacks) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Analyze raw interleaved pixels.
    ///
    /// The only entry point that can fail: a buffer whose length does not
    /// match its dimensions is reported as [`Error::MalformedImageBuffer`].
    pub fn analyze_raw(
        &self,
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        candidates: &[Vec<Landmark>],
    ) -> Result<FaceAnalysis> {
        let image = ImageBuffer::new(data, width, height, format)?;
        self.analyze_face(&image, candidates)
    }

    /// Ask `provider` for candidates, then analyze.
    pub fn analyze_with_provider<P: LandmarkProvider + ?Sized>(
        &self,
        image: &ImageBuffer,
        provider: &P,
    ) -> Result<FaceAnalysis> {
        let candidates = provider.detect(image);
        self.analyze_face(image, &candidates)
    }

    /// Run the face branch over already-detected candidates.
    pub fn analyze_face(
        &self,
        image: &ImageBuffer,
        candidates: &[Vec<Landmark>],
    ) -> Result<FaceAnalysis> {
        let face = recover(
            Stage::Face,
            self.validator.select_best(candidates),
            &self.fallbacks.face,
            &(),
        )?;
        tracing::debug!(
            confidence = face.confidence,
            is_fallback = face.is_fallback,
            "face selected"
        );

        let crop = extract_region(image, &face.bounding_box, self.config.region.padding_ratio);
        let skin = self.skin.detect(&crop.image);
        tracing::debug!(
            coverage_percent = skin.coverage_percent,
            width = crop.image.width(),
            height = crop.image.height(),
            "skin mask computed"
        );

        let white_balance = recover(
            Stage::WhiteBalance,
            self.correct(image, &crop.image, &skin),
            &self.fallbacks.white_balance,
            &crop.image,
        )?;
        tracing::debug!(
            r = white_balance.gains.r,
            g = white_balance.gains.g,
            b = white_balance.gains.b,
            method = ?white_balance.method,
            "white balance applied"
        );

        let lighting = match self.lighting.analyze(&white_balance.corrected, &crop.face_in_crop) {
            Some(lighting) => lighting,
            None => {
                tracing::warn!(stage = %Stage::Lighting, "no measurable zones, substituting fallback result");
                self.fallbacks.lighting.produce(&())
            }
        };

        let tone = recover(
            Stage::Tone,
            self.measure_tone(&skin, &white_balance.corrected),
            &self.fallbacks.tone,
            &(),
        )?;

        let overall = propagate(&[
            StageReport::new(Stage::Face, face.confidence, face.is_fallback),
            StageReport::new(
                Stage::WhiteBalance,
                white_balance.confidence,
                white_balance.is_fallback,
            ),
            StageReport::new(Stage::Lighting, lighting.confidence, lighting.is_fallback),
            StageReport::new(Stage::Tone, tone.confidence, tone.is_fallback),
        ]);

        Ok(FaceAnalysis {
            face,
            region: crop.bbox,
            skin,
            white_balance,
            lighting,
            tone,
            overall,
        })
    }

    /// Classify the corrected skin colour. Below the minimum skin coverage the
    /// sample is too small to trust and the tone fallback takes over.
    fn measure_tone(&self, skin: &SkinMask, corrected: &ImageBuffer) -> Result<ToneClassification> {
        let minimum = self.config.skin.min_coverage_percent;
        let mean = skin
            .require_coverage(minimum)?
            .masked_mean(corrected)
            .ok_or(Error::InsufficientSkinCoverage {
                coverage_percent: skin.coverage_percent,
                minimum_percent: minimum,
            })?;
        Ok(self.classifier.classify(LabColor::from_rgb(mean)))
    }

    /// Pick and apply the white-balance estimator for `region`, cropped from `scene`.
    ///
    /// `Auto` uses skin-aware correction when skin coverage meets the minimum
    /// and gray-world otherwise; `SkinAware` reports low coverage as an error.
    fn correct(
        &self,
        scene: &ImageBuffer,
        region: &ImageBuffer,
        skin: &SkinMask,
    ) -> Result<WhiteBalanceResult> {
        let minimum = self.config.skin.min_coverage_percent;
        let skin_mean = skin.require_coverage(minimum).and_then(|mask| {
            mask.skin_mean.ok_or(Error::InsufficientSkinCoverage {
                coverage_percent: mask.coverage_percent,
                minimum_percent: minimum,
            })
        });

        match (self.config.white_balance.policy, skin_mean) {
            (WhiteBalancePolicy::GrayWorld, _) => self.white_balance.gray_world(scene, region),
            (_, Ok(mean)) => self
                .white_balance
                .skin_aware(region, mean, skin.coverage_percent),
            (WhiteBalancePolicy::Auto, Err(err)) => {
                tracing::debug!(error = %err, "using gray-world white balance");
                self.white_balance.gray_world(scene, region)
            }
            (WhiteBalancePolicy::SkinAware, Err(err)) => Err(err),
        }
    }

    /// Run the body branch over one pose from an image of the given
    /// `aspect_ratio` (width / height).
    ///
    /// An incomplete pose is replaced by the body fallback; call
    /// [`BodyRatioCalculator::calculate`] directly to see the error instead.
    pub fn analyze_body(&self, pose: &[Landmark], aspect_ratio: f32) -> Result<BodyAnalysis> {
        let calculator = self.body.clone().with_aspect_ratio(aspect_ratio);
        let ratios = recover(
            Stage::Body,
            calculator.calculate(pose),
            &self.fallbacks.body,
            &(),
        )?;
        let overall = propagate(&[StageReport::new(
            Stage::Body,
            ratios.confidence,
            ratios.is_fallback,
        )]);
        Ok(BodyAnalysis { ratios, overall })
    }

    /// Analyze independent images in parallel. Results keep the input order.
    pub fn analyze_batch(&self, jobs: &[FaceJob]) -> Vec<Result<FaceAnalysis>> {
        jobs.par_iter()
            .map(|job| self.analyze_face(&job.image, &job.candidates))
            .collect()
    }
}
