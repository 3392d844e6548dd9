//! Deterministic math utilities
//!
//! Re-exports glam with the 2D rectangle used by the spatial index and a
//! deterministic random number generator.

pub use glam::*;

/// Axis-aligned rectangle in world units.
///
/// `(x, y)` is the top-left corner; the bottom-right corner is
/// `(x + width, y + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self::new(center.x - half.x, center.y - half.y, size.x, size.y)
    }

    #[inline]
    pub fn top_left(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn top_right(&self) -> Vec2 {
        Vec2::new(self.x + self.width, self.y)
    }

    #[inline]
    pub fn bottom_left(&self) -> Vec2 {
        Vec2::new(self.x, self.y + self.height)
    }

    #[inline]
    pub fn bottom_right(&self) -> Vec2 {
        Vec2::new(self.x + self.width, self.y + self.height)
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Strict overlap test: rectangles that only share an edge do not intersect.
    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        other.x < self.x + self.width
            && self.x < other.x + other.width
            && other.y < self.y + self.height
            && self.y < other.y + other.height
    }

    /// `true` when both corners are finite (no NaN, no infinity).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.top_left().is_finite() && self.bottom_right().is_finite()
    }

    pub fn translated(&self, delta: Vec2) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y, self.width, self.height)
    }
}

/// Deterministic random number generator
pub struct DeterministicRng {
    seed: u64,
    state: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self { seed, state: seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// LCG step; good enough for reproducible scenes and tests.
    pub fn next_u32(&mut self) -> u32 {
        // LCG constants
        const A: u64 = 1664525;
        const C: u64 = 1013904223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        self.state as u32
    }

    /// Uniform float in `[0, 1]`.
    pub fn next_f32(&mut self) -> f32 {
        self.next_u32() as f32 / u32::MAX as f32
    }

    /// Uniform float in `[min, max]`.
    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.next_f32()
    }
}
