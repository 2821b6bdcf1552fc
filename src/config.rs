//! Tunable constants for every pipeline stage.
//!
//! Each stage has its own section with defaults matching the product policy.
//! All sections deserialize with `#[serde(default)]`, so a JSON file only
//! needs the fields it overrides:
//!
//! ```
//! use tone_calibration::CalibrationConfig;
//!
//! let config = CalibrationConfig::from_json_str(
//!     r#"{ "skin": { "min_coverage_percent": 15.0 } }"#,
//! ).unwrap();
//! assert_eq!(config.skin.min_coverage_percent, 15.0);
//! assert_eq!(config.white_balance.min_gain, 0.3);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Complete configuration for a calibration run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub validation: ValidationConfig,
    pub region: RegionConfig,
    pub skin: SkinConfig,
    pub white_balance: WhiteBalanceConfig,
    pub lighting: LightingConfig,
    pub classifier: ClassifierConfig,
    pub body: BodyConfig,
}

impl CalibrationConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Reject combinations that would make a stage meaningless.
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: f32| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(Error::InvalidConfig(format!("{name} must be in [0, 1], got {v}")))
            }
        };

        unit("validation.visibility_floor", self.validation.visibility_floor)?;
        unit("validation.fallback_confidence", self.validation.fallback_confidence)?;
        unit("white_balance.adaptation_degree", self.white_balance.adaptation_degree)?;
        unit("lighting.shadow_ratio", self.lighting.shadow_ratio)?;
        unit("lighting.min_uniformity", self.lighting.min_uniformity)?;
        unit("lighting.min_shadow_score", self.lighting.min_shadow_score)?;
        unit("body.visibility_floor", self.body.visibility_floor)?;
        unit("body.waist_fraction", self.body.waist_fraction)?;

        if !(0.0..1.0).contains(&self.region.padding_ratio) {
            return Err(Error::InvalidConfig(format!(
                "region.padding_ratio must be in [0, 1), got {}",
                self.region.padding_ratio
            )));
        }
        if !(0.0..=100.0).contains(&self.skin.min_coverage_percent) {
            return Err(Error::InvalidConfig(format!(
                "skin.min_coverage_percent must be a percentage, got {}",
                self.skin.min_coverage_percent
            )));
        }
        if self.skin.cr_range[0] >= self.skin.cr_range[1]
            || self.skin.cb_range[0] >= self.skin.cb_range[1]
        {
            return Err(Error::InvalidConfig("skin chroma ranges must be ordered".into()));
        }
        if !(self.white_balance.min_gain > 0.0
            && self.white_balance.min_gain < 1.0
            && self.white_balance.max_gain > 1.0)
        {
            return Err(Error::InvalidConfig(format!(
                "gain bounds must satisfy 0 < min < 1 < max, got [{}, {}]",
                self.white_balance.min_gain, self.white_balance.max_gain
            )));
        }
        if self.white_balance.reference_skin.iter().any(|&c| c <= 0.0) {
            return Err(Error::InvalidConfig(
                "white_balance.reference_skin channels must be positive".into(),
            ));
        }
        let [warm, neutral, cool] = self.lighting.cct_band_edges;
        if !(warm < neutral && neutral < cool) {
            return Err(Error::InvalidConfig(format!(
                "lighting.cct_band_edges must be increasing, got {:?}",
                self.lighting.cct_band_edges
            )));
        }
        if self.body.wave_threshold >= self.body.natural_threshold {
            return Err(Error::InvalidConfig(
                "body.wave_threshold must be below body.natural_threshold".into(),
            ));
        }
        Ok(())
    }
}

/// Landmark validation (face and pose).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Minimum visibility of every key landmark.
    pub visibility_floor: f32,
    /// Confidence reported by the substituted face when validation fails.
    pub fallback_confidence: f32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            visibility_floor: 0.5,
            fallback_confidence: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Padding added on each side, as a fraction of the face box size.
    pub padding_ratio: f32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            padding_ratio: 0.15,
        }
    }
}

/// Skin classification in YCbCr (BT.601, full range).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkinConfig {
    /// Inclusive Cr band.
    pub cr_range: [f32; 2],
    /// Inclusive Cb band.
    pub cb_range: [f32; 2],
    /// Pixels darker than this luma are never skin.
    pub min_luma: f32,
    /// Coverage below which skin-aware white balance is not attempted.
    pub min_coverage_percent: f32,
}

impl Default for SkinConfig {
    fn default() -> Self {
        Self {
            cr_range: [133.0, 173.0],
            cb_range: [77.0, 127.0],
            min_luma: 40.0,
            min_coverage_percent: 10.0,
        }
    }
}

/// How the white-balance algorithm is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhiteBalancePolicy {
    /// Skin-aware when coverage allows it, gray-world otherwise.
    Auto,
    GrayWorld,
    SkinAware,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhiteBalanceConfig {
    pub policy: WhiteBalancePolicy,
    pub min_gain: f32,
    pub max_gain: f32,
    /// Expected mean skin colour under a neutral illuminant (RGB, 0-255).
    pub reference_skin: [f32; 3],
    /// Fraction of the full von Kries adaptation applied to skin-aware gains.
    /// 1.0 maps the skin mean exactly onto the reference chromaticity.
    /// Gain bounds are checked before this blend.
    pub adaptation_degree: f32,
}

impl Default for WhiteBalanceConfig {
    fn default() -> Self {
        Self {
            policy: WhiteBalancePolicy::Auto,
            min_gain: 0.3,
            max_gain: 3.0,
            reference_skin: [205.0, 155.0, 130.0],
            adaptation_degree: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Kelvin edges between warm / neutral-warm / neutral-cool / cool.
    pub cct_band_edges: [f32; 3],
    /// Standard deviation of per-zone CCT above which lighting is mixed.
    pub mixed_cct_spread: f32,
    /// A zone is shadowed below this fraction of the brightest zone.
    pub shadow_ratio: f32,
    /// `zone_uniformity` must exceed this for suitable lighting.
    pub min_uniformity: f32,
    /// `shadow_score` must exceed this for suitable lighting.
    pub min_shadow_score: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            cct_band_edges: [4000.0, 5500.0, 7000.0],
            mixed_cct_spread: 1000.0,
            shadow_ratio: 0.6,
            min_uniformity: 0.7,
            min_shadow_score: 0.75,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Per-axis weights (L*, a*, b*) of the centroid distance.
    pub weights: [f32; 3],
    /// Distances closer than this count as a tie.
    pub tie_epsilon: f32,
    /// b* above this pivot favours warm centroids in a tie.
    pub warm_b_pivot: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            weights: [0.8, 1.0, 1.2],
            tie_epsilon: 0.5,
            warm_b_pivot: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyConfig {
    pub visibility_floor: f32,
    /// Position of the waist proxy along shoulder-to-hip, from the shoulder.
    pub waist_fraction: f32,
    /// Shoulder/hip ratio at or above which the frame reads as Natural.
    pub natural_threshold: f32,
    /// Shoulder/hip ratio at or below which the frame reads as Wave.
    pub wave_threshold: f32,
    /// Distance from a threshold inside which the secondary ratio decides.
    pub tie_margin: f32,
    /// Leg/torso ratio that tips a Natural/Straight tie to Natural.
    pub natural_leg_ratio: f32,
    /// Leg/torso ratio below which a Wave/Straight tie goes to Wave.
    pub wave_leg_ratio: f32,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            visibility_floor: 0.5,
            waist_fraction: 0.62,
            natural_threshold: 1.55,
            wave_threshold: 1.35,
            tie_margin: 0.03,
            natural_leg_ratio: 1.75,
            wave_leg_ratio: 1.6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CalibrationConfig::default();
        config.validate().unwrap();
        assert_eq!(config.validation.visibility_floor, 0.5);
        assert_eq!(config.lighting.cct_band_edges, [4000.0, 5500.0, 7000.0]);
        assert_eq!(config.white_balance.policy, WhiteBalancePolicy::Auto);
    }

    #[test]
    fn partial_json_overrides() {
        let config = CalibrationConfig::from_json_str(
            r#"{
                "white_balance": { "policy": "gray_world", "max_gain": 2.5 },
                "lighting": { "shadow_ratio": 0.5 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.white_balance.policy, WhiteBalancePolicy::GrayWorld);
        assert_eq!(config.white_balance.max_gain, 2.5);
        assert_eq!(config.white_balance.min_gain, 0.3);
        assert_eq!(config.lighting.shadow_ratio, 0.5);
        assert_eq!(config.region.padding_ratio, 0.15);
    }

    #[test]
    fn rejects_inverted_bounds() {
        let err = CalibrationConfig::from_json_str(
            r#"{ "white_balance": { "min_gain": 1.5 } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = CalibrationConfig::from_json_str(
            r#"{ "lighting": { "cct_band_edges": [5500.0, 4000.0, 7000.0] } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = CalibrationConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
