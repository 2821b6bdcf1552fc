//! Automatic white balance.
//!
//! Two estimators produce per-channel (diagonal, von Kries) gains:
//!
//! - **gray-world**: the region's mean colour is assumed to be neutral gray;
//! - **skin-aware**: the skin mean is assumed to be the reference skin colour
//!   seen under a shifted illuminant. Only `adaptation_degree` of the full
//!   adaptation is applied, so individual skin tone is not erased.
//!
//! Gains outside the configured bounds are rejected; the caller substitutes
//! identity gains. Skin-aware bounds apply to the full adaptation, before it
//! is blended.

use serde::Serialize;

use crate::buffer::ImageBuffer;
use crate::config::WhiteBalanceConfig;
use crate::error::{Error, Result};

/// Per-channel multiplicative correction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorrectionGains {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl CorrectionGains {
    pub const IDENTITY: CorrectionGains = CorrectionGains::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn as_array(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Accept the gains only if every channel is finite and inside `[min, max]`.
    pub fn validate(self, min: f32, max: f32) -> Result<Self> {
        let ok = self
            .as_array()
            .iter()
            .all(|g| g.is_finite() && (min..=max).contains(g));
        if ok {
            Ok(self)
        } else {
            Err(Error::InvalidCorrectionGains {
                r: self.r,
                g: self.g,
                b: self.b,
                min,
                max,
            })
        }
    }

    /// Move `degree` of the way from identity towards these gains.
    ///
    /// Stays within any bounds that contain both 1.0 and `self`.
    pub fn blend(self, degree: f32) -> Self {
        let mix = |g: f32| 1.0 + degree * (g - 1.0);
        Self::new(mix(self.r), mix(self.g), mix(self.b))
    }

    /// Multiply each channel and clamp to 0-255.
    ///
    /// Clamping is lossy: channels pushed past 255 saturate and cannot be
    /// recovered by applying the inverse gains.
    pub fn apply_to_pixel(&self, rgb: [u8; 3]) -> [u8; 3] {
        let scale = |c: u8, g: f32| (c as f32 * g).round().clamp(0.0, 255.0) as u8;
        [
            scale(rgb[0], self.r),
            scale(rgb[1], self.g),
            scale(rgb[2], self.b),
        ]
    }

    /// Apply to every pixel of `image`; alpha is preserved. See
    /// [`apply_to_pixel`](Self::apply_to_pixel) for the clamping caveat.
    pub fn apply(&self, image: &ImageBuffer) -> ImageBuffer {
        image.map_rgb(|px| self.apply_to_pixel(px))
    }
}

/// Which estimator produced the gains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WhiteBalanceMethod {
    GrayWorld,
    SkinAware,
    /// No correction applied (fallback).
    Identity,
}

/// Corrected region and the gains that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct WhiteBalanceResult {
    #[serde(skip)]
    pub corrected: ImageBuffer,
    pub gains: CorrectionGains,
    pub method: WhiteBalanceMethod,
    pub confidence: f32,
    pub is_fallback: bool,
}

/// Gray-world gains: scale each channel mean onto their common average.
pub fn gray_world_gains(mean_rgb: [f32; 3]) -> CorrectionGains {
    let gray = (mean_rgb[0] + mean_rgb[1] + mean_rgb[2]) / 3.0;
    CorrectionGains::new(gray / mean_rgb[0], gray / mean_rgb[1], gray / mean_rgb[2])
}

/// Full skin-aware von Kries gains: map the skin mean onto the reference skin
/// chromaticity at the same total intensity.
pub fn skin_aware_gains(skin_mean: [f32; 3], reference: [f32; 3]) -> CorrectionGains {
    let skin_sum: f32 = skin_mean.iter().sum();
    let ref_sum: f32 = reference.iter().sum();
    let gain = |c: usize| reference[c] / ref_sum * skin_sum / skin_mean[c];
    CorrectionGains::new(gain(0), gain(1), gain(2))
}

/// White-balance corrector over a cropped region.
#[derive(Debug, Clone)]
pub struct WhiteBalanceCorrector {
    config: WhiteBalanceConfig,
}

impl WhiteBalanceCorrector {
    pub fn new(config: WhiteBalanceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WhiteBalanceConfig {
        &self.config
    }

    /// Validated gray-world correction of `region`, with gains estimated from
    /// the whole `scene` the region was cropped from.
    pub fn gray_world(&self, scene: &ImageBuffer, region: &ImageBuffer) -> Result<WhiteBalanceResult> {
        let gains = gray_world_gains(scene.mean_rgb())
            .validate(self.config.min_gain, self.config.max_gain)?;
        Ok(WhiteBalanceResult {
            corrected: gains.apply(region),
            gains,
            method: WhiteBalanceMethod::GrayWorld,
            confidence: 0.6,
            is_fallback: false,
        })
    }

    /// Validated skin-aware correction of `region`, given the mean skin colour
    /// and the coverage (percent) it was measured over.
    pub fn skin_aware(
        &self,
        region: &ImageBuffer,
        skin_mean: [f32; 3],
        coverage_percent: f32,
    ) -> Result<WhiteBalanceResult> {
        let gains = skin_aware_gains(skin_mean, self.config.reference_skin)
            .validate(self.config.min_gain, self.config.max_gain)?
            .blend(self.config.adaptation_degree);
        // More skin, more trust; saturates at 40% coverage.
        let confidence = 0.6 + 0.4 * (coverage_percent / 40.0).clamp(0.0, 1.0);
        Ok(WhiteBalanceResult {
            corrected: gains.apply(region),
            gains,
            method: WhiteBalanceMethod::SkinAware,
            confidence,
            is_fallback: false,
        })
    }
}
