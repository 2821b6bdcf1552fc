//! Lighting quality analysis.
//!
//! Estimates the correlated colour temperature (CCT) of the region, measures
//! luminance across four facial zones and flags shadowed zones. The result
//! decides whether the photo is suitable for colour analysis; unsuitable
//! lighting is reported, never blocked.

use serde::Serialize;

use crate::buffer::{luminance, ImageAccess, ImageBuffer};
use crate::color::rgb_to_xyz;
use crate::config::LightingConfig;
use crate::types::BoundingBox;

/// Named facial zones, as fractions of the face box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Zone {
    Forehead,
    LeftCheek,
    RightCheek,
    Chin,
}

impl Zone {
    pub const ALL: [Zone; 4] = [Zone::Forehead, Zone::LeftCheek, Zone::RightCheek, Zone::Chin];

    /// Zone extent relative to the face box (image left/right).
    pub fn bounds(self) -> BoundingBox {
        match self {
            Zone::Forehead => BoundingBox::new(0.30, 0.12, 0.70, 0.28),
            Zone::LeftCheek => BoundingBox::new(0.15, 0.45, 0.40, 0.65),
            Zone::RightCheek => BoundingBox::new(0.60, 0.45, 0.85, 0.65),
            Zone::Chin => BoundingBox::new(0.38, 0.78, 0.62, 0.92),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LightingType {
    Warm,
    NeutralWarm,
    NeutralCool,
    Cool,
    /// Zones disagree on colour temperature.
    Mixed,
}

impl LightingType {
    /// Band for a single CCT; never returns `Mixed`.
    pub fn from_cct(cct: f32, edges: [f32; 3]) -> Self {
        if cct < edges[0] {
            LightingType::Warm
        } else if cct < edges[1] {
            LightingType::NeutralWarm
        } else if cct <= edges[2] {
            LightingType::NeutralCool
        } else {
            LightingType::Cool
        }
    }
}

/// Reasons lighting was judged unsuitable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LightingIssue {
    Mixed,
    Uneven,
    Shadowed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ZoneReading {
    pub zone: Zone,
    pub mean_rgb: [f32; 3],
    pub luminance: f32,
    pub cct_kelvin: Option<f32>,
    pub shadowed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LightingAnalysis {
    pub cct_kelvin: f32,
    pub lighting_type: LightingType,
    pub zone_uniformity: f32,
    pub shadow_score: f32,
    pub suitable: bool,
    pub zones: Vec<ZoneReading>,
    pub issues: Vec<LightingIssue>,
    pub confidence: f32,
    pub is_fallback: bool,
}

/// McCamy's closed-form CCT from an 8-bit sRGB mean, clamped to 1000-25000 K.
///
/// Returns `None` for black input, whose chromaticity is undefined.
pub fn estimate_cct(rgb: [f32; 3]) -> Option<f32> {
    let [x, y, z] = rgb_to_xyz(rgb);
    let sum = x + y + z;
    if sum <= f32::EPSILON {
        return None;
    }
    let cx = x / sum;
    let cy = y / sum;
    let n = (cx - 0.3320) / (0.1858 - cy);
    let cct = 449.0 * n.powi(3) + 3525.0 * n.powi(2) + 6823.3 * n + 5520.33;
    cct.is_finite().then(|| cct.clamp(1000.0, 25000.0))
}

/// `1 - stddev / mean` over zone luminances, clamped to [0,1].
/// Zero mean (all black) counts as fully non-uniform.
pub fn zone_uniformity(luminances: &[f32]) -> f32 {
    if luminances.is_empty() {
        return 0.0;
    }
    let n = luminances.len() as f32;
    let mean = luminances.iter().sum::<f32>() / n;
    if mean <= 0.0 {
        return 0.0;
    }
    let var = luminances.iter().map(|l| (l - mean).powi(2)).sum::<f32>() / n;
    (1.0 - var.sqrt() / mean).clamp(0.0, 1.0)
}

/// Flags each zone darker than `ratio` of the brightest one.
pub fn shadowed_zones(luminances: &[f32], ratio: f32) -> Vec<bool> {
    let brightest = luminances.iter().cloned().fold(0.0f32, f32::max);
    luminances.iter().map(|&l| l < ratio * brightest).collect()
}

/// `1 - shadowed / total`.
pub fn shadow_score(shadowed: &[bool]) -> f32 {
    if shadowed.is_empty() {
        return 0.0;
    }
    let count = shadowed.iter().filter(|&&s| s).count();
    1.0 - count as f32 / shadowed.len() as f32
}

fn std_dev(values: &[f32]) -> f32 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n).sqrt()
}

#[derive(Debug, Clone)]
pub struct LightingAnalyzer {
    config: LightingConfig,
}

impl LightingAnalyzer {
    pub fn new(config: LightingConfig) -> Self {
        Self { config }
    }

    /// Analyze a corrected region.
    ///
    /// `face_in_crop` locates the face inside `region` (fractions of the crop).
    /// Returns `None` when no zone covers a pixel or the region is black, in
    /// which case the caller substitutes a fallback.
    pub fn analyze(&self, region: &ImageBuffer, face_in_crop: &BoundingBox) -> Option<LightingAnalysis> {
        let cct_kelvin = estimate_cct(region.mean_rgb())?;

        let mut readings = Vec::with_capacity(Zone::ALL.len());
        for zone in Zone::ALL {
            let mean_rgb = zone_mean(region, face_in_crop, zone)?;
            readings.push(ZoneReading {
                zone,
                mean_rgb,
                luminance: luminance(mean_rgb),
                cct_kelvin: estimate_cct(mean_rgb),
                shadowed: false,
            });
        }

        let lums: Vec<f32> = readings.iter().map(|r| r.luminance).collect();
        for (reading, shadowed) in readings
            .iter_mut()
            .zip(shadowed_zones(&lums, self.config.shadow_ratio))
        {
            reading.shadowed = shadowed;
        }

        let zone_ccts: Vec<f32> = readings.iter().filter_map(|r| r.cct_kelvin).collect();
        let mixed = std_dev(&zone_ccts) > self.config.mixed_cct_spread;
        Some(self.assess(cct_kelvin, mixed, readings))
    }

    /// Judge suitability from a set of zone readings.
    fn assess(&self, cct_kelvin: f32, mixed: bool, zones: Vec<ZoneReading>) -> LightingAnalysis {
        let lums: Vec<f32> = zones.iter().map(|z| z.luminance).collect();
        let flags: Vec<bool> = zones.iter().map(|z| z.shadowed).collect();
        let uniformity = zone_uniformity(&lums);
        let shadow = shadow_score(&flags);

        let lighting_type = if mixed {
            LightingType::Mixed
        } else {
            LightingType::from_cct(cct_kelvin, self.config.cct_band_edges)
        };

        let mut issues = Vec::new();
        if mixed {
            issues.push(LightingIssue::Mixed);
        }
        if uniformity <= self.config.min_uniformity {
            issues.push(LightingIssue::Uneven);
        }
        if shadow <= self.config.min_shadow_score {
            issues.push(LightingIssue::Shadowed);
        }

        tracing::debug!(
            cct_kelvin,
            ?lighting_type,
            uniformity,
            shadow_score = shadow,
            "lighting analyzed"
        );

        LightingAnalysis {
            cct_kelvin,
            lighting_type,
            zone_uniformity: uniformity,
            shadow_score: shadow,
            suitable: issues.is_empty(),
            zones,
            confidence: ((uniformity + shadow) / 2.0).clamp(0.0, 1.0),
            issues,
            is_fallback: false,
        }
    }

    /// Assess four zone luminances directly, without pixels.
    pub fn assess_luminances(&self, cct_kelvin: f32, luminances: [f32; 4]) -> LightingAnalysis {
        let flags = shadowed_zones(&luminances, self.config.shadow_ratio);
        let zones = Zone::ALL
            .iter()
            .zip(luminances)
            .zip(flags)
            .map(|((&zone, lum), shadowed)| ZoneReading {
                zone,
                mean_rgb: [lum; 3],
                luminance: lum,
                cct_kelvin: Some(cct_kelvin),
                shadowed,
            })
            .collect();
        self.assess(cct_kelvin, false, zones)
    }
}

fn zone_mean(region: &ImageBuffer, face: &BoundingBox, zone: Zone) -> Option<[f32; 3]> {
    let z = zone.bounds();
    let (w, h) = (region.width() as f32, region.height() as f32);
    let fx = |t: f32| (face.x_min + t * face.width()) * w;
    let fy = |t: f32| (face.y_min + t * face.height()) * h;

    let x0 = fx(z.x_min).floor() as u32;
    let y0 = fy(z.y_min).floor() as u32;
    let x1 = (fx(z.x_max).ceil() as u32).max(x0 + 1);
    let y1 = (fy(z.y_max).ceil() as u32).max(y0 + 1);
    region.mean_rgb_in(x0, y0, x1, y1)
}
