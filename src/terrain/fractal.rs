use ::noise::NoiseFn;
use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use super::error::{Result, TerrainError};
use super::lanes::Lanes3;
use super::noise::NoiseKernel;

/// Offset subtracted from |noise| when forming a ridge signal
pub const RIDGE_OFFSET: f32 = 1.0;

/// Configuration for fractal noise composition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FractalConfig {
    /// Random seed for reproducible generation
    pub seed: u32,

    /// Scale applied to sample points before the first octave
    pub frequency: f32,

    /// Number of noise layers to combine
    /// Typical range: 1 - 12
    pub octaves: usize,

    /// Amplitude decay per octave for banded sums, ridge gain for ridged fractals
    pub persistence: f32,

    /// Frequency multiplier between octaves
    pub lacunarity: f32,
}

impl Default for FractalConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            frequency: 1.0,
            octaves: 6,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

impl FractalConfig {
    pub fn new(seed: u32, frequency: f32, octaves: usize, persistence: f32, lacunarity: f32) -> Self {
        Self {
            seed,
            frequency,
            octaves,
            persistence,
            lacunarity,
        }
    }

    /// Gentle rolling terrain, tuned for banded-sum composition
    pub fn banded() -> Self {
        Self {
            seed: 0,
            frequency: 1.0,
            octaves: 8,
            persistence: 0.6,
            lacunarity: 1.2,
        }
    }

    /// Mountain ranges, tuned for ridged composition
    pub fn ridged() -> Self {
        Self {
            seed: 0,
            frequency: 1.0,
            octaves: 8,
            persistence: 1.8,
            lacunarity: 1.2,
        }
    }

    /// Wispy cloud cover, tuned for ridged composition
    pub fn clouds() -> Self {
        Self {
            seed: 0,
            frequency: 1.0,
            octaves: 8,
            persistence: 1.6,
            lacunarity: 3.5,
        }
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_random_seed(self) -> Self {
        self.with_seed(rand::random())
    }

    pub fn validate(&self) -> Result<()> {
        if self.octaves == 0 {
            return Err(TerrainError::InvalidFractal("octave count must be at least 1".into()));
        }
        if !(self.frequency.is_finite() && self.frequency > 0.0) {
            return Err(TerrainError::InvalidFractal(format!(
                "frequency must be positive, got {}",
                self.frequency
            )));
        }
        if !(self.lacunarity.is_finite() && self.lacunarity > 0.0) {
            return Err(TerrainError::InvalidFractal(format!(
                "lacunarity must be positive, got {}",
                self.lacunarity
            )));
        }
        if !(self.persistence.is_finite() && self.persistence > 0.0) {
            return Err(TerrainError::InvalidFractal(format!(
                "persistence must be positive, got {}",
                self.persistence
            )));
        }
        Ok(())
    }
}

/// A scalar field over 3D space producing values in [0, 1]
pub trait HeightFunction {
    fn value(&self, points: &Lanes3) -> Vec4;

    /// `value` remapped to [-1, 1]
    fn signed_value(&self, points: &Lanes3) -> Vec4 {
        self.value(points) * 2.0 - Vec4::ONE
    }
}

/// Octave sum normalised by the largest possible total
#[derive(Debug, Clone)]
pub struct BandedSumFractal {
    kernel: NoiseKernel,
    config: FractalConfig,
}

impl BandedSumFractal {
    pub fn new(config: FractalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            kernel: NoiseKernel::new(config.seed),
            config,
        })
    }

    /// Applies new parameters, rebuilding the permutation table only if the seed changed
    pub fn setup(&mut self, config: FractalConfig) -> Result<()> {
        config.validate()?;
        if config.seed != self.kernel.seed() {
            self.kernel.reseed(config.seed);
        }
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &FractalConfig {
        &self.config
    }

    pub fn kernel(&self) -> &NoiseKernel {
        &self.kernel
    }
}

impl HeightFunction for BandedSumFractal {
    fn value(&self, points: &Lanes3) -> Vec4 {
        let mut p = *points * self.config.frequency;
        let mut total = Vec4::ZERO;
        let mut amplitude = 1.0f32;
        let mut max = 0.0f32;

        for _ in 0..self.config.octaves {
            total += self.kernel.evaluate_lanes(&p) * amplitude;
            max += amplitude;
            amplitude *= self.config.persistence;
            p = p * self.config.lacunarity;
        }

        ((total + max) / (2.0 * max)).clamp(Vec4::ZERO, Vec4::ONE)
    }
}

/// Ridged multifractal: each octave is weighted by the previous octave's signal
#[derive(Debug, Clone)]
pub struct RidgedFractal {
    kernel: NoiseKernel,
    config: FractalConfig,
}

impl RidgedFractal {
    pub fn new(config: FractalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            kernel: NoiseKernel::new(config.seed),
            config,
        })
    }

    /// Applies new parameters, rebuilding the permutation table only if the seed changed
    pub fn setup(&mut self, config: FractalConfig) -> Result<()> {
        config.validate()?;
        if config.seed != self.kernel.seed() {
            self.kernel.reseed(config.seed);
        }
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &FractalConfig {
        &self.config
    }

    pub fn kernel(&self) -> &NoiseKernel {
        &self.kernel
    }

    fn ridge(&self, p: &Lanes3) -> Vec4 {
        let signal = Vec4::splat(RIDGE_OFFSET) - self.kernel.evaluate_lanes(p).abs();
        signal * signal
    }
}

impl HeightFunction for RidgedFractal {
    fn value(&self, points: &Lanes3) -> Vec4 {
        let gain = self.config.persistence;
        let lacunarity = self.config.lacunarity;

        let mut p = *points * self.config.frequency;
        let mut signal = self.ridge(&p);
        let mut result = signal;
        let mut exponent = 1.0f32;
        let mut max = 1.0f32;

        for _ in 1..self.config.octaves {
            p = p * lacunarity;
            let weight = (signal * gain).clamp(Vec4::ZERO, Vec4::ONE);
            signal = self.ridge(&p) * weight;

            max += 1.0 / exponent;
            result += signal / exponent;
            exponent *= lacunarity;
        }

        (result / max).clamp(Vec4::ZERO, Vec4::ONE)
    }
}

/// The closed set of height functions a displacer can be configured with
#[derive(Debug, Clone)]
pub enum TerrainFunction {
    BandedSum(BandedSumFractal),
    Ridged(RidgedFractal),
    /// Same value everywhere
    Constant(f32),
}

impl HeightFunction for TerrainFunction {
    fn value(&self, points: &Lanes3) -> Vec4 {
        match self {
            Self::BandedSum(f) => f.value(points),
            Self::Ridged(f) => f.value(points),
            Self::Constant(v) => Vec4::splat(*v),
        }
    }
}

impl From<BandedSumFractal> for TerrainFunction {
    fn from(f: BandedSumFractal) -> Self {
        Self::BandedSum(f)
    }
}

impl From<RidgedFractal> for TerrainFunction {
    fn from(f: RidgedFractal) -> Self {
        Self::Ridged(f)
    }
}

fn sample_point(function: &impl HeightFunction, point: [f64; 3]) -> f64 {
    let p = Vec3::new(point[0] as f32, point[1] as f32, point[2] as f32);
    f64::from(function.value(&Lanes3::splat(p)).x)
}

impl NoiseFn<f64, 3> for BandedSumFractal {
    fn get(&self, point: [f64; 3]) -> f64 {
        sample_point(self, point)
    }
}

impl NoiseFn<f64, 3> for RidgedFractal {
    fn get(&self, point: [f64; 3]) -> f64 {
        sample_point(self, point)
    }
}
