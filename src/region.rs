//! Face region extraction.

use crate::buffer::{ImageAccess, ImageBuffer};
use crate::types::BoundingBox;

/// A cropped face region.
#[derive(Debug, Clone)]
pub struct RegionCrop {
    /// The cropped pixels.
    pub image: ImageBuffer,
    /// The padded box actually cropped, in normalized image coordinates.
    pub bbox: BoundingBox,
    /// The unpadded face box expressed relative to the crop ([0,1] spans the crop).
    pub face_in_crop: BoundingBox,
}

/// Crop `bbox` out of `image` after padding each side by `padding_ratio`.
///
/// The padded box is clamped to the image. Pixel edges are rounded outwards so
/// that the crop is never empty.
pub fn extract_region(image: &ImageBuffer, bbox: &BoundingBox, padding_ratio: f32) -> RegionCrop {
    let padded = bbox.padded(padding_ratio);
    let (w, h) = (image.width(), image.height());

    let x0 = ((padded.x_min * w as f32).floor() as u32).min(w - 1);
    let y0 = ((padded.y_min * h as f32).floor() as u32).min(h - 1);
    let x1 = ((padded.x_max * w as f32).ceil() as u32).clamp(x0 + 1, w);
    let y1 = ((padded.y_max * h as f32).ceil() as u32).clamp(y0 + 1, h);

    let cropped = image.crop(x0, y0, x1 - x0, y1 - y0);

    // The box the pixels actually cover, so zone fractions line up with pixels.
    let effective = BoundingBox::new(
        x0 as f32 / w as f32,
        y0 as f32 / h as f32,
        x1 as f32 / w as f32,
        y1 as f32 / h as f32,
    );

    RegionCrop {
        image: cropped,
        face_in_crop: effective.relative(bbox),
        bbox: effective,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> ImageBuffer {
        ImageBuffer::from_fn(w, h, |x, y| [x as u8, y as u8, 0]).unwrap()
    }

    #[test]
    fn pads_and_crops() {
        let image = gradient(100, 100);
        let bbox = BoundingBox::new(0.3, 0.3, 0.7, 0.7);
        let crop = extract_region(&image, &bbox, 0.15);

        // 0.4 * 0.15 = 0.06 on each side
        assert_eq!(crop.image.width(), 52);
        assert_eq!(crop.image.height(), 52);
        assert_eq!(crop.image.rgb(0, 0), [24, 24, 0]);
        assert!((crop.bbox.x_min - 0.24).abs() < 1e-6);
        assert!((crop.face_in_crop.x_min - 0.06 / 0.52).abs() < 1e-3);
    }

    #[test]
    fn clamps_to_image_bounds() {
        let image = gradient(50, 40);
        let bbox = BoundingBox::new(0.0, 0.0, 0.5, 1.0);
        let crop = extract_region(&image, &bbox, 0.15);

        assert_eq!(crop.bbox.x_min, 0.0);
        assert_eq!(crop.bbox.y_max, 1.0);
        assert_eq!(crop.image.height(), 40);
        assert!(crop.bbox.is_valid());
    }

    #[test]
    fn tiny_box_yields_one_pixel() {
        let image = gradient(10, 10);
        let bbox = BoundingBox::new(0.5, 0.5, 0.5, 0.5);
        let crop = extract_region(&image, &bbox, 0.0);
        assert_eq!(crop.image.num_pixels(), 1);
    }
}
