//! Displacement strategies that turn a height function into a surface.
//!
//! A displacer receives points already mapped into displacement space and
//! moves them onto the terrain surface, returning the normalised height it
//! used. Sphere and plane geometry share every algorithm and differ only in
//! [`Geometry::up_vector`] and [`Geometry::map_to_displacement_space`].

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use super::error::{Result, TerrainError};
use super::fractal::{HeightFunction, TerrainFunction};
use super::lanes::Lanes3;

/// Default strength of tangential ground warping
pub const DEFAULT_GROUND_INFLUENCE: f32 = 0.1;

/// Offset between the two ground samples (x, z). Tunable.
#[allow(clippy::approx_constant)]
pub const GROUND_PHASE_OFFSET: (f32, f32) = (3.14, 6.28);

/// Shape of the surface being generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Geometry {
    #[default]
    Sphere,
    Plane,
}

impl Geometry {
    /// Reference direction slopes are measured against
    pub fn up_vector(self, points: &Lanes3) -> Lanes3 {
        match self {
            Self::Sphere => points.normalized(),
            Self::Plane => Lanes3::splat(Vec3::Y),
        }
    }

    /// Projects points onto the sphere of radius `function_scale`; planes are left alone
    pub fn map_to_displacement_space(self, points: &mut Lanes3, function_scale: f32) {
        if self == Self::Sphere {
            points.set_length(Vec4::splat(function_scale));
        }
    }
}

/// Height range and scaling shared by every displacer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplacerParameters {
    /// World size of the root patch
    pub patch_scale: f32,

    /// Radius of the sphere the height function is sampled on (plane: point multiplier)
    pub function_scale: f32,

    pub min_height: f32,
    pub sea_level: f32,
    pub max_height: f32,

    /// Multiplier applied when converting normalised errors to world units
    pub output_scale: f32,
}

impl Default for DisplacerParameters {
    fn default() -> Self {
        Self {
            patch_scale: 1.0,
            function_scale: 1.0,
            min_height: 1.0,
            sea_level: 1.005,
            max_height: 1.02,
            output_scale: 1.0,
        }
    }
}

impl DisplacerParameters {
    pub fn new(patch_scale: f32, min_height: f32, sea_level: f32, max_height: f32, function_scale: f32) -> Self {
        Self {
            patch_scale,
            function_scale,
            min_height,
            sea_level,
            max_height,
            output_scale: 1.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let heights = [self.min_height, self.sea_level, self.max_height];
        if heights.iter().any(|h| !h.is_finite())
            || self.min_height > self.sea_level
            || self.sea_level > self.max_height
        {
            return Err(TerrainError::InvalidHeightRange {
                min: self.min_height,
                sea_level: self.sea_level,
                max: self.max_height,
            });
        }
        if !(self.function_scale.is_finite() && self.function_scale > 0.0) {
            return Err(TerrainError::InvalidFunctionScale(self.function_scale));
        }
        if !(self.patch_scale.is_finite() && self.patch_scale > 0.0) {
            return Err(TerrainError::InvalidPatchScale(self.patch_scale));
        }
        if !self.output_scale.is_finite() {
            return Err(TerrainError::InvalidLayout(format!(
                "output scale must be finite, got {}",
                self.output_scale
            )));
        }
        Ok(())
    }

    pub fn height_span(&self) -> f32 {
        self.max_height - self.min_height
    }

    /// Maps normalised heights onto `[min_height, max_height]`
    pub fn map_to_height_range(&self, heights: Vec4) -> Vec4 {
        Vec4::splat(self.min_height) * (Vec4::ONE - heights) + Vec4::splat(self.max_height) * heights
    }

    /// Converts a normalised height difference into world units
    pub fn map_to_height_scale(&self, normalized: f32) -> f32 {
        normalized * self.height_span() * self.output_scale
    }

    /// Inverse of [`Self::map_to_height_range`]; a collapsed range maps everything to 0
    pub fn normalize_height(&self, world: f32) -> f32 {
        let span = self.height_span();
        if span.abs() <= f32::EPSILON {
            0.0
        } else {
            (world - self.min_height) / span
        }
    }
}

/// Moves points in displacement space onto the terrain surface
pub trait Displace {
    fn geometry(&self) -> Geometry;

    fn parameters(&self) -> &DisplacerParameters;

    fn setup(&mut self, parameters: DisplacerParameters) -> Result<()>;

    /// Displaces `points` in place and returns their normalised heights
    fn displace(&self, points: &mut Lanes3) -> Vec4;

    fn up_vector(&self, points: &Lanes3) -> Lanes3 {
        self.geometry().up_vector(points)
    }

    fn map_to_displacement_space(&self, points: &mut Lanes3) {
        self.geometry()
            .map_to_displacement_space(points, self.parameters().function_scale)
    }

    fn map_to_height_range(&self, heights: Vec4) -> Vec4 {
        self.parameters().map_to_height_range(heights)
    }

    fn map_to_height_scale(&self, normalized: f32) -> f32 {
        self.parameters().map_to_height_scale(normalized)
    }
}

/// Puts every point on the minimum-height surface
#[derive(Debug, Clone, PartialEq)]
pub struct FlatDisplacer {
    geometry: Geometry,
    parameters: DisplacerParameters,
}

impl FlatDisplacer {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            parameters: DisplacerParameters::default(),
        }
    }
}

impl Displace for FlatDisplacer {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn parameters(&self) -> &DisplacerParameters {
        &self.parameters
    }

    fn setup(&mut self, parameters: DisplacerParameters) -> Result<()> {
        parameters.validate()?;
        self.parameters = parameters;
        Ok(())
    }

    fn displace(&self, points: &mut Lanes3) -> Vec4 {
        let min = self.parameters.min_height;
        match self.geometry {
            Geometry::Sphere => *points = *points * (min / self.parameters.function_scale),
            Geometry::Plane => points.y += min,
        }
        Vec4::ONE
    }
}

/// Displaces along the up vector by a height function mapped into the height range
#[derive(Debug, Clone)]
pub struct FunctionDisplacer<F = TerrainFunction> {
    geometry: Geometry,
    parameters: DisplacerParameters,
    function: F,
}

impl<F: HeightFunction> FunctionDisplacer<F> {
    pub fn new(geometry: Geometry, function: F) -> Self {
        Self {
            geometry,
            parameters: DisplacerParameters::default(),
            function,
        }
    }

    pub fn function(&self) -> &F {
        &self.function
    }

    pub fn function_mut(&mut self) -> &mut F {
        &mut self.function
    }
}

impl<F: HeightFunction> Displace for FunctionDisplacer<F> {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn parameters(&self) -> &DisplacerParameters {
        &self.parameters
    }

    fn setup(&mut self, parameters: DisplacerParameters) -> Result<()> {
        parameters.validate()?;
        self.parameters = parameters;
        Ok(())
    }

    fn displace(&self, points: &mut Lanes3) -> Vec4 {
        let scale = self.parameters.function_scale;
        match self.geometry {
            Geometry::Sphere => {
                let heights = self.function.value(points);
                let radius = self.map_to_height_range(heights);
                *points = *points * (radius / scale);
                heights
            }
            Geometry::Plane => {
                let heights = self.function.value(&(*points * scale));
                points.y += self.map_to_height_range(heights);
                heights
            }
        }
    }
}

/// Warps points tangentially with a second function before the base displacer runs
#[derive(Debug, Clone)]
pub struct GroundDisplacer<B = FunctionDisplacer, G = TerrainFunction> {
    base: B,
    ground: G,
    influence: f32,
}

impl<B: Displace, G: HeightFunction> GroundDisplacer<B, G> {
    pub fn new(base: B, ground: G) -> Self {
        Self {
            base,
            ground,
            influence: DEFAULT_GROUND_INFLUENCE,
        }
    }

    pub fn with_influence(mut self, influence: f32) -> Self {
        self.influence = influence;
        self
    }

    pub fn influence(&self) -> f32 {
        self.influence
    }

    pub fn base(&self) -> &B {
        &self.base
    }

    pub fn ground(&self) -> &G {
        &self.ground
    }

    fn offsets(&self, points: &Lanes3) -> (Vec4, Vec4) {
        let (ox, oz) = GROUND_PHASE_OFFSET;
        let shifted = Lanes3::new(points.x + ox, points.y, points.z + oz);
        (
            self.ground.signed_value(points) * self.influence,
            self.ground.signed_value(&shifted) * self.influence,
        )
    }
}

impl<B: Displace, G: HeightFunction> Displace for GroundDisplacer<B, G> {
    fn geometry(&self) -> Geometry {
        self.base.geometry()
    }

    fn parameters(&self) -> &DisplacerParameters {
        self.base.parameters()
    }

    fn setup(&mut self, parameters: DisplacerParameters) -> Result<()> {
        self.base.setup(parameters)
    }

    fn displace(&self, points: &mut Lanes3) -> Vec4 {
        let (dx, dz) = self.offsets(points);
        match self.geometry() {
            Geometry::Sphere => {
                let primary = points.cross(&Lanes3::splat(Vec3::Y));
                let fallback = points.cross(&Lanes3::splat(Vec3::X));
                // Near the poles p x Y vanishes
                let degenerate = primary
                    .length_squared()
                    .cmplt(points.length_squared() * 1e-8);
                let mut x_axis = Lanes3::select(degenerate, &fallback, &primary);
                let mut z_axis = points.cross(&x_axis);
                x_axis.set_length(dx);
                z_axis.set_length(dz);

                *points += x_axis + z_axis;
                self.map_to_displacement_space(points);
            }
            Geometry::Plane => {
                points.x += dx;
                points.z += dz;
            }
        }
        self.base.displace(points)
    }
}

/// Runtime-selected displacer
#[derive(Debug, Clone)]
pub enum AnyDisplacer {
    Flat(FlatDisplacer),
    Function(FunctionDisplacer),
    Ground(GroundDisplacer),
}

impl Displace for AnyDisplacer {
    fn geometry(&self) -> Geometry {
        match self {
            Self::Flat(d) => d.geometry(),
            Self::Function(d) => d.geometry(),
            Self::Ground(d) => d.geometry(),
        }
    }

    fn parameters(&self) -> &DisplacerParameters {
        match self {
            Self::Flat(d) => d.parameters(),
            Self::Function(d) => d.parameters(),
            Self::Ground(d) => d.parameters(),
        }
    }

    fn setup(&mut self, parameters: DisplacerParameters) -> Result<()> {
        match self {
            Self::Flat(d) => d.setup(parameters),
            Self::Function(d) => d.setup(parameters),
            Self::Ground(d) => d.setup(parameters),
        }
    }

    fn displace(&self, points: &mut Lanes3) -> Vec4 {
        match self {
            Self::Flat(d) => d.displace(points),
            Self::Function(d) => d.displace(points),
            Self::Ground(d) => d.displace(points),
        }
    }
}

impl From<FlatDisplacer> for AnyDisplacer {
    fn from(d: FlatDisplacer) -> Self {
        Self::Flat(d)
    }
}

impl From<FunctionDisplacer> for AnyDisplacer {
    fn from(d: FunctionDisplacer) -> Self {
        Self::Function(d)
    }
}

impl From<GroundDisplacer> for AnyDisplacer {
    fn from(d: GroundDisplacer) -> Self {
        Self::Ground(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::fractal::{BandedSumFractal, FractalConfig, RidgedFractal};

    fn sphere_points() -> Vec<Lanes3> {
        let mut batches = Vec::new();
        for i in 0..8 {
            for j in 0..8 {
                let theta = i as f32 * 0.7 + 0.1;
                let phi = j as f32 * 0.39 + 0.05;
                let dir = Vec3::new(theta.cos() * phi.sin(), phi.cos(), theta.sin() * phi.sin());
                batches.push(Lanes3::from_points([dir, -dir, Vec3::new(dir.z, dir.x, dir.y), Vec3::Y]));
            }
        }
        batches
    }

    fn banded() -> TerrainFunction {
        BandedSumFractal::new(FractalConfig::banded().with_seed(21)).unwrap().into()
    }

    #[test]
    fn test_height_range_endpoints() {
        let ranges = [(0.0, 0.5, 1.0), (2.0, 2.0, 2.0), (0.1, 0.2, 0.3), (-5.0, 0.0, 12.5)];
        for (min, sea, max) in ranges {
            let mut displacer = FunctionDisplacer::new(Geometry::Sphere, banded());
            displacer
                .setup(DisplacerParameters::new(1.0, min, sea, max, 3.0))
                .unwrap();
            assert_eq!(displacer.map_to_height_range(Vec4::ZERO), Vec4::splat(min));
            assert_eq!(displacer.map_to_height_range(Vec4::ONE), Vec4::splat(max));
        }
    }

    #[test]
    fn test_flat_displacer_on_unit_sphere() {
        let mut flat = FlatDisplacer::new(Geometry::Sphere);
        flat.setup(DisplacerParameters::new(1.0, 0.8, 0.9, 1.2, 1.0)).unwrap();

        for batch in sphere_points() {
            let mut p = batch;
            let heights = flat.displace(&mut p);
            assert_eq!(heights, Vec4::ONE);
            for (i, length) in p.length().to_array().into_iter().enumerate() {
                assert!((length - 0.8).abs() < 1e-6, "Lane {} at radius {}", i, length);
            }
        }
    }

    #[test]
    fn test_function_scale_does_not_change_radius() {
        let mut small = FunctionDisplacer::new(Geometry::Sphere, TerrainFunction::Constant(0.5));
        small.setup(DisplacerParameters::new(1.0, 1.0, 1.0, 3.0, 1.0)).unwrap();
        let mut large = FunctionDisplacer::new(Geometry::Sphere, TerrainFunction::Constant(0.5));
        large.setup(DisplacerParameters::new(1.0, 1.0, 1.0, 3.0, 40.0)).unwrap();

        for batch in sphere_points() {
            let (mut a, mut b) = (batch, batch);
            small.map_to_displacement_space(&mut a);
            large.map_to_displacement_space(&mut b);
            small.displace(&mut a);
            large.displace(&mut b);
            for i in 0..4 {
                assert!((a.lane(i).length() - 2.0).abs() < 1e-5);
                assert!((b.lane(i).length() - 2.0).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_collapsed_range_is_flat() {
        let mut displacer = FunctionDisplacer::new(Geometry::Sphere, banded());
        displacer
            .setup(DisplacerParameters::new(1.0, 4.0, 4.0, 4.0, 1.0))
            .unwrap();

        for batch in sphere_points() {
            let mut p = batch;
            displacer.displace(&mut p);
            for length in p.length().to_array() {
                assert!(length.is_finite() && (length - 4.0).abs() < 1e-5);
            }
        }
        assert_eq!(displacer.parameters().normalize_height(4.0), 0.0);
    }

    #[test]
    fn test_plane_function_offsets_vertically() {
        let mut displacer = FunctionDisplacer::new(Geometry::Plane, TerrainFunction::Constant(0.25));
        displacer
            .setup(DisplacerParameters::new(1.0, 10.0, 10.0, 14.0, 1.0))
            .unwrap();

        let mut p = Lanes3::strided(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(0.5, 0.0, 0.0));
        let before = p;
        displacer.map_to_displacement_space(&mut p);
        let heights = displacer.displace(&mut p);

        assert_eq!(heights, Vec4::splat(0.25));
        assert_eq!(p.x, before.x);
        assert_eq!(p.z, before.z);
        assert_eq!(p.y, Vec4::splat(11.0));
    }

    #[test]
    fn test_ground_displacement_is_tangential() {
        let ground = RidgedFractal::new(FractalConfig::ridged().with_seed(4)).unwrap();
        let base = FunctionDisplacer::new(Geometry::Sphere, TerrainFunction::Constant(1.0));
        let mut displacer = GroundDisplacer::new(base, TerrainFunction::from(ground));
        displacer
            .setup(DisplacerParameters::new(1.0, 2.0, 2.0, 3.0, 1.0))
            .unwrap();

        let mut moved = 0;
        for batch in sphere_points() {
            let mut p = batch;
            displacer.map_to_displacement_space(&mut p);
            let heights = displacer.displace(&mut p);
            assert_eq!(heights, Vec4::ONE);
            for i in 0..4 {
                let q = p.lane(i);
                assert!(q.is_finite(), "Lane {} is not finite: {:?}", i, q);
                assert!((q.length() - 3.0).abs() < 1e-4, "Ground warp changed radius to {}", q.length());
                if q.normalize().distance(batch.lane(i).normalize()) > 1e-4 {
                    moved += 1;
                }
            }
        }
        assert!(moved > 0, "Ground function never moved a point");
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let mut flat = FlatDisplacer::new(Geometry::Sphere);
        assert!(matches!(
            flat.setup(DisplacerParameters::new(1.0, 3.0, 2.0, 4.0, 1.0)),
            Err(TerrainError::InvalidHeightRange { .. })
        ));
        assert!(matches!(
            flat.setup(DisplacerParameters::new(1.0, 1.0, 2.0, 4.0, 0.0)),
            Err(TerrainError::InvalidFunctionScale(_))
        ));
        assert!(flat.setup(DisplacerParameters::new(1.0, 1.0, 1.0, 1.0, 1.0)).is_ok());
    }

    #[test]
    fn test_any_displacer_dispatch() {
        let mut any = AnyDisplacer::from(FlatDisplacer::new(Geometry::Plane));
        any.setup(DisplacerParameters::new(1.0, 0.5, 0.5, 0.5, 1.0)).unwrap();
        assert_eq!(any.geometry(), Geometry::Plane);

        let mut p = Lanes3::ZERO;
        assert_eq!(any.displace(&mut p), Vec4::ONE);
        assert_eq!(p.y, Vec4::splat(0.5));
        assert_eq!(any.up_vector(&p).lane(2), Vec3::Y);
    }
}
