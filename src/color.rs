//! sRGB <-> CIE L*a*b* conversion under the D65 white point.

use palette::color_difference::Ciede2000;
use palette::white_point::D65;
use palette::Lab;
use serde::{Deserialize, Serialize};

/// D65 reference white in XYZ (Y normalized to 1).
pub const D65_WHITE: [f32; 3] = [0.950_47, 1.0, 1.088_83];

const RGB_TO_XYZ: [[f32; 3]; 3] = [
    [0.412_456_4, 0.357_576_1, 0.180_437_5],
    [0.212_672_9, 0.715_152_2, 0.072_175_0],
    [0.019_333_9, 0.119_192_0, 0.950_304_1],
];

const XYZ_TO_RGB: [[f32; 3]; 3] = [
    [3.240_454_2, -1.537_138_5, -0.498_531_4],
    [-0.969_266_0, 1.876_010_8, 0.041_556_0],
    [0.055_643_4, -0.204_025_9, 1.057_225_2],
];

// CIE constants: delta = 6/29.
const DELTA: f32 = 6.0 / 29.0;

/// A colour in CIE L*a*b* (D65).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabColor {
    /// Lightness, [0, 100].
    pub l: f32,
    /// Green-red axis, roughly [-128, 127].
    pub a: f32,
    /// Blue-yellow axis, roughly [-128, 127].
    pub b: f32,
}

impl LabColor {
    pub const fn new(l: f32, a: f32, b: f32) -> Self {
        Self { l, a, b }
    }

    pub fn from_rgb(rgb: [f32; 3]) -> Self {
        xyz_to_lab(rgb_to_xyz(rgb))
    }

    pub fn to_rgb(&self) -> [f32; 3] {
        xyz_to_rgb(lab_to_xyz(*self))
    }

    /// Chroma, the distance from the neutral axis.
    pub fn chroma(&self) -> f32 {
        self.a.hypot(self.b)
    }

    /// CIE 1976 colour difference.
    pub fn delta_e76(&self, other: &LabColor) -> f32 {
        let dl = self.l - other.l;
        let da = self.a - other.a;
        let db = self.b - other.b;
        (dl * dl + da * da + db * db).sqrt()
    }

    /// CIEDE2000 colour difference with unit weighting factors.
    pub fn delta_e2000(&self, other: &LabColor) -> f32 {
        self.to_palette().difference(other.to_palette())
    }

    fn to_palette(self) -> Lab<D65, f32> {
        Lab::new(self.l, self.a, self.b)
    }
}

/// sRGB companding: 8-bit channel value (0-255) to linear [0,1].
pub fn srgb_to_linear(c: f32) -> f32 {
    let c = (c / 255.0).clamp(0.0, 1.0);
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Inverse companding: linear [0,1] to an 8-bit channel value (0-255, unrounded).
pub fn linear_to_srgb(c: f32) -> f32 {
    let c = c.clamp(0.0, 1.0);
    let v = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    v * 255.0
}

fn mat_mul(m: &[[f32; 3]; 3], v: [f32; 3]) -> [f32; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// 8-bit sRGB to CIE XYZ (D65).
pub fn rgb_to_xyz(rgb: [f32; 3]) -> [f32; 3] {
    mat_mul(
        &RGB_TO_XYZ,
        [
            srgb_to_linear(rgb[0]),
            srgb_to_linear(rgb[1]),
            srgb_to_linear(rgb[2]),
        ],
    )
}

/// CIE XYZ (D65) to 8-bit sRGB, clamped to gamut.
pub fn xyz_to_rgb(xyz: [f32; 3]) -> [f32; 3] {
    let lin = mat_mul(&XYZ_TO_RGB, xyz);
    [
        linear_to_srgb(lin[0]),
        linear_to_srgb(lin[1]),
        linear_to_srgb(lin[2]),
    ]
}

fn lab_f(t: f32) -> f32 {
    if t > DELTA * DELTA * DELTA {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

fn lab_f_inv(t: f32) -> f32 {
    if t > DELTA {
        t * t * t
    } else {
        3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
    }
}

pub fn xyz_to_lab(xyz: [f32; 3]) -> LabColor {
    let fx = lab_f(xyz[0] / D65_WHITE[0]);
    let fy = lab_f(xyz[1] / D65_WHITE[1]);
    let fz = lab_f(xyz[2] / D65_WHITE[2]);
    LabColor::new(116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

pub fn lab_to_xyz(lab: LabColor) -> [f32; 3] {
    let fy = (lab.l + 16.0) / 116.0;
    let fx = fy + lab.a / 500.0;
    let fz = fy - lab.b / 200.0;
    [
        D65_WHITE[0] * lab_f_inv(fx),
        D65_WHITE[1] * lab_f_inv(fy),
        D65_WHITE[2] * lab_f_inv(fz),
    ]
}

/// Round an unclamped RGB triple to 8 bits.
pub fn quantize(rgb: [f32; 3]) -> [u8; 3] {
    rgb.map(|c| c.round().clamp(0.0, 255.0) as u8)
}
