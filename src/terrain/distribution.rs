use serde::{Deserialize, Serialize};

use super::error::TerrainError;

/// Number of resampled values in a [`Distribution`]
pub const DISTRIBUTION_SAMPLES: usize = 256;

/// Width of the ramp inserted before a sharp control point: a tenth of one sample
pub const SHARP_STEP_WIDTH: f32 = 0.1 / (DISTRIBUTION_SAMPLES - 1) as f32;

/// A control point of a weight curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    /// Position along the curve [0.0, 1.0]
    pub fraction: f32,
    pub value: f32,
}

impl ControlPoint {
    pub fn new(fraction: f32, value: f32) -> Self {
        Self { fraction, value }
    }
}

/// Collects control points for a piecewise-linear curve
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionBuilder {
    points: Vec<ControlPoint>,
}

impl DistributionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same value everywhere
    pub fn constant(value: f32) -> Self {
        let mut builder = Self::new();
        builder.add(0.0, value);
        builder
    }

    pub fn add(&mut self, fraction: f32, value: f32) -> &mut Self {
        self.points.push(ControlPoint::new(fraction, value));
        self.points.sort_by(|a, b| a.fraction.total_cmp(&b.fraction));
        self
    }

    /// Adds a control point reached by a near-vertical step instead of a ramp
    /// from the previous point
    pub fn add_sharp(&mut self, fraction: f32, value: f32) -> &mut Self {
        let before = fraction - SHARP_STEP_WIDTH;
        let held = self.evaluate(before);
        self.add(before, held);
        self.add(fraction, value)
    }

    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    /// Curve value at `fraction`, clamped to the end points outside them
    fn evaluate(&self, fraction: f32) -> f32 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };
        if fraction <= first.fraction {
            return first.value;
        }
        if fraction >= last.fraction {
            return last.value;
        }

        // First point past `fraction`; the one before it bounds the segment
        let upper_idx = self.points.partition_point(|p| p.fraction <= fraction);
        let lower = &self.points[upper_idx - 1];
        let upper = &self.points[upper_idx];

        let range = upper.fraction - lower.fraction;
        let t = if range > 0.0 {
            (fraction - lower.fraction) / range
        } else {
            1.0
        };
        lerp(lower.value, upper.value, t)
    }

    /// Resamples the curve at `DISTRIBUTION_SAMPLES` evenly spaced fractions
    pub fn build(&self) -> Distribution {
        let last = (DISTRIBUTION_SAMPLES - 1) as f32;
        let samples = (0..DISTRIBUTION_SAMPLES)
            .map(|i| self.evaluate(i as f32 / last))
            .collect();
        Distribution { samples }
    }
}

/// A curve resampled into a fixed lookup table.
///
/// Serialises as a bare array of exactly `DISTRIBUTION_SAMPLES` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Distribution {
    samples: Vec<f32>,
}

impl Distribution {
    /// Value at `x` in [0, 1]; out-of-range inputs read the end samples
    pub fn sample(&self, x: f32) -> f32 {
        let index = (x * DISTRIBUTION_SAMPLES as f32) as usize;
        self.samples[index.min(DISTRIBUTION_SAMPLES - 1)]
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

impl TryFrom<Vec<f32>> for Distribution {
    type Error = TerrainError;

    fn try_from(samples: Vec<f32>) -> Result<Self, Self::Error> {
        if samples.len() != DISTRIBUTION_SAMPLES || samples.iter().any(|v| !v.is_finite()) {
            return Err(TerrainError::InvalidDistribution {
                expected: DISTRIBUTION_SAMPLES,
                actual: samples.len(),
            });
        }
        Ok(Self { samples })
    }
}

impl From<Distribution> for Vec<f32> {
    fn from(distribution: Distribution) -> Self {
        distribution.samples
    }
}

impl From<&DistributionBuilder> for Distribution {
    fn from(builder: &DistributionBuilder) -> Self {
        builder.build()
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
