//! Vertical error introduced by rendering a patch at half resolution.
//!
//! The patch is resampled at twice its resolution. Every sample that the
//! coarser grid would drop is compared with the linear estimate from its kept
//! neighbours, and the largest difference is reported in world units.

use glam::Vec3;

use super::displacer::Displace;
use super::error::Result;
use super::lanes::{Lanes3, LANES};
use super::patch::PatchGrid;

/// Measures patch error using a borrowed displacer
#[derive(Debug)]
pub struct LodErrorEstimator<'a, D> {
    displacer: &'a D,
    kept: Vec<f32>,
    dropped: Vec<f32>,
    next: Vec<f32>,
}

impl<'a, D: Displace> LodErrorEstimator<'a, D> {
    pub fn new(displacer: &'a D) -> Self {
        Self {
            displacer,
            kept: Vec::new(),
            dropped: Vec::new(),
            next: Vec::new(),
        }
    }

    /// Error in world units: the normalised error scaled by the displacer's height span
    pub fn estimate(&mut self, grid: &PatchGrid) -> Result<f32> {
        let normalized = self.estimate_normalized(grid)?;
        let error = self.displacer.map_to_height_scale(normalized);
        log::debug!(
            "{}x{} patch error: {} (normalised {})",
            grid.width,
            grid.height,
            error,
            normalized
        );
        Ok(error)
    }

    /// Largest difference between an actual and an interpolated height, in
    /// normalised height units
    pub fn estimate_normalized(&mut self, grid: &PatchGrid) -> Result<f32> {
        grid.validate()?;
        let fine = grid.doubled();
        let width = fine.width;

        self.kept.resize(width, 0.0);
        self.dropped.resize(width, 0.0);
        self.next.resize(width, 0.0);

        sample_row(self.displacer, &fine, 0, &mut self.kept);
        let mut max_error = row_error(&self.kept[..width]);

        for row in (1..fine.height).step_by(2) {
            sample_row(self.displacer, &fine, row, &mut self.dropped);
            sample_row(self.displacer, &fine, row + 1, &mut self.next);

            let (above, mid, below) = (&self.kept[..width], &self.dropped[..width], &self.next[..width]);
            for col in 0..width {
                let estimate = if col % 2 == 0 {
                    (above[col] + below[col]) * 0.5
                } else {
                    (above[col - 1] + above[col + 1] + below[col - 1] + below[col + 1]) * 0.25
                };
                max_error = max_error.max((estimate - mid[col]).abs());
            }
            max_error = max_error.max(row_error(below));

            std::mem::swap(&mut self.kept, &mut self.next);
        }

        Ok(max_error)
    }
}

/// Error of the odd samples in a kept row against their row neighbours
fn row_error(row: &[f32]) -> f32 {
    row.windows(3)
        .step_by(2)
        .map(|w| ((w[0] + w[2]) * 0.5 - w[1]).abs())
        .fold(0.0, f32::max)
}

/// Normalised heights of one grid row, four samples at a time
fn sample_row<D: Displace>(displacer: &D, grid: &PatchGrid, row: usize, out: &mut [f32]) {
    for start in (0..grid.width).step_by(LANES) {
        let mut points = Lanes3::strided(grid.point(start, row), grid.x_step);
        displacer.map_to_displacement_space(&mut points);
        let heights = displacer.displace(&mut points).to_array();

        let count = LANES.min(grid.width - start);
        out[start..start + count].copy_from_slice(&heights[..count]);
    }
}

/// Convenience for a single estimate over `width x height` samples starting
/// at `origin`
pub fn patch_error<D: Displace>(
    displacer: &D,
    origin: Vec3,
    x_step: Vec3,
    z_step: Vec3,
    width: usize,
    height: usize,
) -> Result<f32> {
    LodErrorEstimator::new(displacer).estimate(&PatchGrid::new(origin, x_step, z_step, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::displacer::{DisplacerParameters, FlatDisplacer, FunctionDisplacer, Geometry};
    use crate::terrain::fractal::HeightFunction;
    use glam::Vec4;

    struct Linear;
    impl HeightFunction for Linear {
        fn value(&self, points: &Lanes3) -> Vec4 {
            points.x * 0.25 + points.z * 0.5 + Vec4::splat(0.1)
        }
    }

    struct Bowl;
    impl HeightFunction for Bowl {
        fn value(&self, points: &Lanes3) -> Vec4 {
            points.x * points.x
        }
    }

    fn plane<F: HeightFunction>(function: F, min: f32, max: f32) -> FunctionDisplacer<F> {
        let mut displacer = FunctionDisplacer::new(Geometry::Plane, function);
        displacer
            .setup(DisplacerParameters::new(1.0, min, min, max, 1.0))
            .unwrap();
        displacer
    }

    #[test]
    fn test_flat_surface_has_no_error() {
        let mut flat = FlatDisplacer::new(Geometry::Sphere);
        flat.setup(DisplacerParameters::new(1.0, 1.0, 1.0, 2.0, 1.0)).unwrap();
        let error = patch_error(&flat, Vec3::new(-0.5, 1.0, -0.5), Vec3::X * 0.1, Vec3::Z * 0.1, 9, 9).unwrap();
        assert_eq!(error, 0.0);
    }

    #[test]
    fn test_linear_function_has_no_error() {
        let displacer = plane(Linear, 0.0, 10.0);
        let error = patch_error(&displacer, Vec3::ZERO, Vec3::X * 0.125, Vec3::Z * 0.125, 5, 5).unwrap();
        assert!(error < 1e-5, "Linear surface reported error {}", error);
    }

    #[test]
    fn test_quadratic_error_matches_midpoint() {
        // x^2 over a coarse step h has midpoint error h^2 / 4
        let displacer = plane(Bowl, 0.0, 1.0);
        let h = 0.25;
        let grid = PatchGrid::new(Vec3::ZERO, Vec3::X * h, Vec3::Z * h, 5, 3);
        let error = LodErrorEstimator::new(&displacer).estimate_normalized(&grid).unwrap();
        assert!((error - h * h / 4.0).abs() < 1e-5, "Error {} for step {}", error, h);
    }

    #[test]
    fn test_error_scales_with_height_span() {
        let narrow = plane(Bowl, 0.0, 1.0);
        let wide = plane(Bowl, 5.0, 9.0);
        let grid = PatchGrid::new(Vec3::ZERO, Vec3::X * 0.25, Vec3::Z * 0.25, 5, 5);

        let a = LodErrorEstimator::new(&narrow).estimate(&grid).unwrap();
        let b = LodErrorEstimator::new(&wide).estimate(&grid).unwrap();
        assert!((b - a * 4.0).abs() < 1e-5, "Expected {} to be four times {}", b, a);
    }

    #[test]
    fn test_single_sample_patch() {
        let displacer = plane(Bowl, 0.0, 1.0);
        let error = patch_error(&displacer, Vec3::ONE, Vec3::X, Vec3::Z, 1, 1).unwrap();
        assert_eq!(error, 0.0);
    }

    #[test]
    fn test_empty_patch_rejected() {
        let displacer = plane(Bowl, 0.0, 1.0);
        assert!(patch_error(&displacer, Vec3::ZERO, Vec3::X, Vec3::Z, 0, 4).is_err());
    }
}
