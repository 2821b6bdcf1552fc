//! Skin pixel classification.
//!
//! Pixels are classified in YCbCr: a pixel is skin when its Cr and Cb fall in
//! the configured bands and its luma clears a darkness floor.

use serde::Serialize;

use crate::buffer::ImageAccess;
use crate::config::SkinConfig;
use crate::error::{Error, Result};

/// BT.601 full-range (Y, Cb, Cr) of an 8-bit RGB triple.
pub fn rgb_to_ycbcr(rgb: [u8; 3]) -> (f32, f32, f32) {
    let (r, g, b) = (rgb[0] as f32, rgb[1] as f32, rgb[2] as f32);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
    let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
    (y, cb, cr)
}

/// Per-pixel skin mask over a region.
#[derive(Debug, Clone, Serialize)]
pub struct SkinMask {
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    mask: Vec<bool>,
    /// Skin pixels as a percentage of all pixels.
    pub coverage_percent: f32,
    /// Mean RGB over skin pixels, if any.
    pub skin_mean: Option<[f32; 3]>,
    /// Mean RGB over non-skin pixels, if any.
    pub non_skin_mean: Option<[f32; 3]>,
}

impl SkinMask {
    pub fn is_skin(&self, x: u32, y: u32) -> bool {
        self.mask[(y * self.width + x) as usize]
    }

    pub fn skin_pixel_count(&self) -> usize {
        self.mask.iter().filter(|&&s| s).count()
    }

    /// Fails with [`Error::InsufficientSkinCoverage`] below `minimum_percent`.
    pub fn require_coverage(&self, minimum_percent: f32) -> Result<&Self> {
        if self.coverage_percent < minimum_percent {
            return Err(Error::InsufficientSkinCoverage {
                coverage_percent: self.coverage_percent,
                minimum_percent,
            });
        }
        Ok(self)
    }

    /// Mean RGB of `image` over this mask's skin pixels.
    ///
    /// Used to re-measure skin after correction; `image` must have the
    /// dimensions the mask was built from.
    pub fn masked_mean<I: ImageAccess>(&self, image: &I) -> Option<[f32; 3]> {
        debug_assert_eq!((image.width(), image.height()), (self.width, self.height));
        let mut acc = MeanAccumulator::default();
        for y in 0..self.height {
            for x in 0..self.width {
                if self.is_skin(x, y) {
                    acc.push(image.rgb(x, y));
                }
            }
        }
        acc.mean()
    }
}

#[derive(Default)]
struct MeanAccumulator {
    sum: [f64; 3],
    count: u64,
}

impl MeanAccumulator {
    fn push(&mut self, rgb: [u8; 3]) {
        self.sum[0] += rgb[0] as f64;
        self.sum[1] += rgb[1] as f64;
        self.sum[2] += rgb[2] as f64;
        self.count += 1;
    }

    fn mean(&self) -> Option<[f32; 3]> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some([
            (self.sum[0] / n) as f32,
            (self.sum[1] / n) as f32,
            (self.sum[2] / n) as f32,
        ])
    }
}

/// Heuristic skin classifier.
#[derive(Debug, Clone)]
pub struct SkinDetector {
    config: SkinConfig,
}

impl SkinDetector {
    pub fn new(config: SkinConfig) -> Self {
        Self { config }
    }

    pub fn is_skin(&self, rgb: [u8; 3]) -> bool {
        let (y, cb, cr) = rgb_to_ycbcr(rgb);
        let [cr_lo, cr_hi] = self.config.cr_range;
        let [cb_lo, cb_hi] = self.config.cb_range;
        y >= self.config.min_luma && (cr_lo..=cr_hi).contains(&cr) && (cb_lo..=cb_hi).contains(&cb)
    }

    /// Classify every pixel of `region`.
    pub fn detect<I: ImageAccess>(&self, region: &I) -> SkinMask {
        let (width, height) = (region.width(), region.height());
        let mut mask = Vec::with_capacity((width * height) as usize);
        let mut skin = MeanAccumulator::default();
        let mut other = MeanAccumulator::default();

        for y in 0..height {
            for x in 0..width {
                let rgb = region.rgb(x, y);
                let is_skin = self.is_skin(rgb);
                if is_skin {
                    skin.push(rgb);
                } else {
                    other.push(rgb);
                }
                mask.push(is_skin);
            }
        }

        let total = mask.len().max(1) as f32;
        SkinMask {
            width,
            height,
            coverage_percent: skin.count as f32 / total * 100.0,
            skin_mean: skin.mean(),
            non_skin_mean: other.mean(),
            mask,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ImageBuffer;

    const SKIN: [u8; 3] = [205, 155, 130];
    const BACKDROP: [u8; 3] = [150, 165, 190];

    fn detector() -> SkinDetector {
        SkinDetector::new(SkinConfig::default())
    }

    #[test]
    fn classifies_typical_pixels() {
        let d = detector();
        assert!(d.is_skin(SKIN));
        assert!(d.is_skin([224, 172, 150]));
        assert!(d.is_skin([141, 85, 36]));
        assert!(!d.is_skin(BACKDROP));
        assert!(!d.is_skin([128, 128, 128]));
        assert!(!d.is_skin([30, 20, 15]));
        assert!(!d.is_skin([40, 200, 60]));
    }

    #[test]
    fn coverage_and_means() {
        // Left 3 of 10 columns are skin.
        let img = ImageBuffer::from_fn(10, 4, |x, _| if x < 3 { SKIN } else { BACKDROP }).unwrap();
        let mask = detector().detect(&img);

        assert!((mask.coverage_percent - 30.0).abs() < 1e-4);
        assert_eq!(mask.skin_pixel_count(), 12);
        assert_eq!(mask.skin_mean, Some([205.0, 155.0, 130.0]));
        assert_eq!(mask.non_skin_mean, Some([150.0, 165.0, 190.0]));
        assert!(mask.is_skin(0, 3));
        assert!(!mask.is_skin(3, 0));
    }

    #[test]
    fn insufficient_coverage() {
        let img = ImageBuffer::from_fn(20, 5, |x, y| if x == 0 && y < 5 { SKIN } else { BACKDROP }).unwrap();
        let mask = detector().detect(&img);
        assert!((mask.coverage_percent - 5.0).abs() < 1e-4);

        let err = mask.require_coverage(10.0).unwrap_err();
        assert!(matches!(err, Error::InsufficientSkinCoverage { .. }));
        assert!(mask.require_coverage(5.0).is_ok());
    }

    #[test]
    fn no_skin_has_no_skin_mean() {
        let img = ImageBuffer::from_fn(4, 4, |_, _| BACKDROP).unwrap();
        let mask = detector().detect(&img);
        assert_eq!(mask.coverage_percent, 0.0);
        assert!(mask.skin_mean.is_none());
        assert!(mask.masked_mean(&img).is_none());
    }

    #[test]
    fn masked_mean_follows_new_pixels() {
        let img = ImageBuffer::from_fn(4, 1, |x, _| if x < 2 { SKIN } else { BACKDROP }).unwrap();
        let mask = detector().detect(&img);
        let brighter = img.map_rgb(|[r, g, b]| [r.saturating_add(10), g, b]);
        assert_eq!(mask.masked_mean(&brighter), Some([215.0, 155.0, 130.0]));
    }
}
