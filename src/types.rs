use serde::{Deserialize, Serialize};

/// A 2D point in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Linear interpolation towards `other`; `t = 0` is `self`, `t = 1` is `other`.
    pub fn lerp(&self, other: &Point, t: f32) -> Point {
        *self + (*other - *self) * t
    }
}

impl std::ops::Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Mul<f32> for Point {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

/// A landmark as produced by an external detector.
///
/// `x` and `y` are normalized to [0,1] relative to the image, `z` is
/// depth-relative and `visibility` is the detector's per-point confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(default = "full_visibility")]
    pub visibility: f32,
}

fn full_visibility() -> f32 {
    1.0
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    /// Clamp coordinates into the unit square and visibility into [0,1].
    /// Non-finite coordinates zero the visibility so the point can never
    /// pass a visibility floor.
    pub fn normalized(&self) -> Self {
        let finite = self.x.is_finite() && self.y.is_finite();
        let visibility = if finite && self.visibility.is_finite() {
            self.visibility.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            x: if self.x.is_finite() { self.x.clamp(0.0, 1.0) } else { 0.0 },
            y: if self.y.is_finite() { self.y.clamp(0.0, 1.0) } else { 0.0 },
            z: if self.z.is_finite() { self.z } else { 0.0 },
            visibility,
        }
    }
}

/// An axis-aligned box in normalized [0,1] image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BoundingBox {
    pub const fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// The tightest box around a set of landmarks, or `None` for an empty set.
    pub fn enclosing(landmarks: &[Landmark]) -> Option<Self> {
        let first = landmarks.first()?;
        let mut bbox = Self::new(first.x, first.y, first.x, first.y);
        for lm in &landmarks[1..] {
            bbox.x_min = bbox.x_min.min(lm.x);
            bbox.y_min = bbox.y_min.min(lm.y);
            bbox.x_max = bbox.x_max.max(lm.x);
            bbox.y_max = bbox.y_max.max(lm.y);
        }
        Some(bbox)
    }

    /// `x_min < x_max`, `y_min < y_max` and every edge inside [0,1].
    pub fn is_valid(&self) -> bool {
        self.x_min < self.x_max
            && self.y_min < self.y_max
            && self.x_min >= 0.0
            && self.y_min >= 0.0
            && self.x_max <= 1.0
            && self.y_max <= 1.0
    }

    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Grow every side by `ratio` of the box's own width/height, then clamp to
    /// the unit square.
    pub fn padded(&self, ratio: f32) -> Self {
        let dx = self.width() * ratio;
        let dy = self.height() * ratio;
        Self::new(
            (self.x_min - dx).clamp(0.0, 1.0),
            (self.y_min - dy).clamp(0.0, 1.0),
            (self.x_max + dx).clamp(0.0, 1.0),
            (self.y_max + dy).clamp(0.0, 1.0),
        )
    }

    /// Express `inner` relative to this box, so that this box spans [0,1].
    pub fn relative(&self, inner: &BoundingBox) -> BoundingBox {
        let w = self.width().max(f32::EPSILON);
        let h = self.height().max(f32::EPSILON);
        BoundingBox::new(
            ((inner.x_min - self.x_min) / w).clamp(0.0, 1.0),
            ((inner.y_min - self.y_min) / h).clamp(0.0, 1.0),
            ((inner.x_max - self.x_min) / w).clamp(0.0, 1.0),
            ((inner.y_max - self.y_min) / h).clamp(0.0, 1.0),
        )
    }
}
