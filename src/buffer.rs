use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Trait for reading RGB pixels from an image.
pub trait ImageAccess {
    /// RGB value at (x, y). Callers stay within `width()`/`height()`.
    fn rgb(&self, x: u32, y: u32) -> [u8; 3];

    /// Image dimensions.
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Mean RGB over the pixel rectangle `[x0, x1) x [y0, y1)`.
    fn mean_rgb_in(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> Option<[f32; 3]> {
        let x1 = x1.min(self.width());
        let y1 = y1.min(self.height());
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        let mut sum = [0.0f64; 3];
        for y in y0..y1 {
            for x in x0..x1 {
                let p = self.rgb(x, y);
                sum[0] += p[0] as f64;
                sum[1] += p[1] as f64;
                sum[2] += p[2] as f64;
            }
        }
        let n = ((x1 - x0) as f64) * ((y1 - y0) as f64);
        Some([
            (sum[0] / n) as f32,
            (sum[1] / n) as f32,
            (sum[2] / n) as f32,
        ])
    }
}

/// Channel layout of an [`ImageBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub const fn channels(self) -> usize {
        match self {
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// An immutable 8-bit RGB or RGBA pixel grid.
///
/// `width * height * channels == data.len()` holds for every constructed
/// buffer; operations that change pixels return a new buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl ImageBuffer {
    /// Wrap raw interleaved pixel data.
    ///
    /// Fails with [`Error::MalformedImageBuffer`] when the length does not match
    /// the dimensions or either dimension is zero.
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        let channels = format.channels();
        let expected = width as usize * height as usize * channels;
        if width == 0 || height == 0 || data.len() != expected {
            return Err(Error::MalformedImageBuffer {
                width,
                height,
                channels,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            format,
        })
    }

    /// Build an RGB image from a per-pixel function.
    ///
    /// Zero-sized images are rejected the same way [`ImageBuffer::new`] rejects them.
    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Result<Self>
    where
        F: Fn(u32, u32) -> [u8; 3],
    {
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self::new(data, width, height, PixelFormat::Rgb)
    }

    pub fn from_rgb_image(img: &::image::RgbImage) -> Result<Self> {
        Self::new(img.as_raw().clone(), img.width(), img.height(), PixelFormat::Rgb)
    }

    pub fn from_rgba_image(img: &::image::RgbaImage) -> Result<Self> {
        Self::new(img.as_raw().clone(), img.width(), img.height(), PixelFormat::Rgba)
    }

    /// Convert to an `image` crate RGB buffer, dropping alpha.
    pub fn to_rgb_image(&self) -> ::image::RgbImage {
        ::image::RgbImage::from_fn(self.width, self.height, |x, y| ::image::Rgb(self.rgb(x, y)))
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn num_pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Iterate RGB triples in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.data
            .chunks_exact(self.format.channels())
            .map(|px| [px[0], px[1], px[2]])
    }

    /// Mean RGB over the whole image.
    pub fn mean_rgb(&self) -> [f32; 3] {
        // Non-empty by construction.
        self.mean_rgb_in(0, 0, self.width, self.height)
            .unwrap_or([0.0; 3])
    }

    /// Copy out the pixel rectangle `[x0, x0 + w) x [y0, y0 + h)`.
    /// The rectangle must lie inside the image and be non-empty.
    pub(crate) fn crop(&self, x0: u32, y0: u32, w: u32, h: u32) -> Self {
        debug_assert!(w > 0 && h > 0);
        debug_assert!(x0 + w <= self.width && y0 + h <= self.height);
        let channels = self.format.channels();
        let row_bytes = w as usize * channels;
        let mut data = Vec::with_capacity(row_bytes * h as usize);
        for y in y0..y0 + h {
            let start = (y as usize * self.width as usize + x0 as usize) * channels;
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }
        Self {
            data,
            width: w,
            height: h,
            format: self.format,
        }
    }

    /// Apply `f` to every RGB triple, keeping alpha untouched.
    pub fn map_rgb<F>(&self, f: F) -> Self
    where
        F: Fn([u8; 3]) -> [u8; 3],
    {
        let channels = self.format.channels();
        let mut data = self.data.clone();
        for px in data.chunks_exact_mut(channels) {
            let out = f([px[0], px[1], px[2]]);
            px[..3].copy_from_slice(&out);
        }
        Self {
            data,
            width: self.width,
            height: self.height,
            format: self.format,
        }
    }
}

impl ImageAccess for ImageBuffer {
    fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * self.format.channels();
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

/// Rec. 709 relative luminance of an 8-bit RGB triple, on the 0-255 scale.
pub fn luminance(rgb: [f32; 3]) -> f32 {
    0.2126 * rgb[0] + 0.7152 * rgb[1] + 0.0722 * rgb[2]
}
