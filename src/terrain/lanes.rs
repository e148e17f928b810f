//! Four-lane point batches.
//!
//! Every hot loop in the generator evaluates four sample points at once. A
//! [`Lanes3`] stores them as one `Vec4` per axis so arithmetic maps directly
//! onto SIMD registers.

use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use glam::{BVec4A, Vec3, Vec4};

/// Number of points processed per batch
pub const LANES: usize = 4;

/// Lane offsets `[0, 1, 2, 3]` used to spread a batch along a step vector
pub const LANE_OFFSETS: Vec4 = Vec4::new(0.0, 1.0, 2.0, 3.0);

/// Four 3D points in structure-of-arrays layout
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Lanes3 {
    pub x: Vec4,
    pub y: Vec4,
    pub z: Vec4,
}

impl Lanes3 {
    pub const ZERO: Self = Self::new(Vec4::ZERO, Vec4::ZERO, Vec4::ZERO);

    pub const fn new(x: Vec4, y: Vec4, z: Vec4) -> Self {
        Self { x, y, z }
    }

    /// The same point in every lane
    pub fn splat(point: Vec3) -> Self {
        Self::new(Vec4::splat(point.x), Vec4::splat(point.y), Vec4::splat(point.z))
    }

    pub fn from_points(points: [Vec3; LANES]) -> Self {
        let [a, b, c, d] = points;
        Self::new(
            Vec4::new(a.x, b.x, c.x, d.x),
            Vec4::new(a.y, b.y, c.y, d.y),
            Vec4::new(a.z, b.z, c.z, d.z),
        )
    }

    /// Four consecutive grid points: lane `i` is `origin + step * i`
    pub fn strided(origin: Vec3, step: Vec3) -> Self {
        Self::new(
            LANE_OFFSETS * step.x + origin.x,
            LANE_OFFSETS * step.y + origin.y,
            LANE_OFFSETS * step.z + origin.z,
        )
    }

    /// Loads four consecutive entries from per-axis column arrays
    ///
    /// Panics if fewer than four entries remain after `start`.
    pub fn load(x: &[f32], y: &[f32], z: &[f32], start: usize) -> Self {
        let end = start + LANES;
        Self::new(
            Vec4::from_slice(&x[start..end]),
            Vec4::from_slice(&y[start..end]),
            Vec4::from_slice(&z[start..end]),
        )
    }

    pub fn lane(&self, index: usize) -> Vec3 {
        Vec3::new(self.x[index], self.y[index], self.z[index])
    }

    pub fn to_points(&self) -> [Vec3; LANES] {
        [self.lane(0), self.lane(1), self.lane(2), self.lane(3)]
    }

    pub fn dot(&self, rhs: &Self) -> Vec4 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn cross(&self, rhs: &Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    pub fn length_squared(&self) -> Vec4 {
        self.dot(self)
    }

    pub fn length(&self) -> Vec4 {
        Vec4::from_array(self.length_squared().to_array().map(f32::sqrt))
    }

    /// Rescales each lane to the matching entry of `length`.
    ///
    /// Zero-length lanes stay at the origin instead of becoming NaN. A
    /// negative length flips the lane's direction.
    pub fn set_length(&mut self, length: Vec4) {
        let current = self.length();
        let factor = Vec4::select(current.cmpgt(Vec4::ZERO), length / current, Vec4::ZERO);
        *self = *self * factor;
    }

    pub fn normalize(&mut self) {
        self.set_length(Vec4::ONE);
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// Per-lane choice between `if_true` and `if_false`
    pub fn select(mask: BVec4A, if_true: &Self, if_false: &Self) -> Self {
        Self::new(
            Vec4::select(mask, if_true.x, if_false.x),
            Vec4::select(mask, if_true.y, if_false.y),
            Vec4::select(mask, if_true.z, if_false.z),
        )
    }
}

impl Add for Lanes3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Lanes3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Lanes3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Lanes3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<Vec4> for Lanes3 {
    type Output = Self;

    fn mul(self, rhs: Vec4) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Mul<f32> for Lanes3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        self * Vec4::splat(rhs)
    }
}
