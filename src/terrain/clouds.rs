//! Cloud cover cube maps.
//!
//! Clouds are a ridged fractal sampled on a sphere of radius
//! [`CLOUD_SPHERE_RADIUS`], independent of the terrain surface. Coverage is
//! the squared fractal value. Anything at or below the cutoff is clear sky,
//! and RGBA output fades alpha in between the cutoff and the border.

use glam::{Vec3, Vec4};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::{Result, TerrainError};
use super::fractal::{FractalConfig, HeightFunction, RidgedFractal};
use super::lanes::{Lanes3, LANES, LANE_OFFSETS};
use super::texture::{pixel_step, to_byte, CubeMap, CubeMapFace, PixelBuffer, PixelFormat};

/// Radius of the sphere the cloud fractal is sampled on
pub const CLOUD_SPHERE_RADIUS: f32 = 3.0;

/// Cloud layer settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    pub fractal: FractalConfig,

    /// Noise-space shift (x, z) of the sample sphere. Animating it drifts the clouds.
    pub offset: [f32; 2],

    /// Coverage at or below this is clear sky [0.0, 1.0]
    pub cutoff: f32,

    /// Coverage above this is fully opaque [0.0, 1.0]
    pub border: f32,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            fractal: FractalConfig::clouds(),
            offset: [0.0, 0.0],
            cutoff: 0.3,
            border: 0.6,
        }
    }
}

impl CloudConfig {
    pub fn validate(&self) -> Result<()> {
        let in_range = |v: f32| (0.0..=1.0).contains(&v);
        if !(in_range(self.cutoff) && in_range(self.border) && self.cutoff < self.border) {
            return Err(TerrainError::InvalidCloudRange {
                cutoff: self.cutoff,
                border: self.border,
            });
        }
        if !(self.offset[0].is_finite() && self.offset[1].is_finite()) {
            return Err(TerrainError::InvalidLayout(format!(
                "cloud offset must be finite, got {:?}",
                self.offset
            )));
        }
        self.fractal.validate()
    }
}

/// Generates cloud cube-map faces
#[derive(Debug, Clone)]
pub struct CloudLayer {
    fractal: RidgedFractal,
    config: CloudConfig,
}

impl CloudLayer {
    pub fn new(config: CloudConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            fractal: RidgedFractal::new(config.fractal)?,
            config,
        })
    }

    /// Applies new settings, reseeding the fractal only if its seed changed
    pub fn setup(&mut self, config: CloudConfig) -> Result<()> {
        config.validate()?;
        self.fractal.setup(config.fractal)?;
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    /// Coverage in [0, 1] for face coordinates `(u, v)`
    fn coverage(&self, face: CubeMapFace, u: Vec4, v: Vec4) -> Vec4 {
        let mut points = face.position(u, v);
        points.set_length(Vec4::splat(CLOUD_SPHERE_RADIUS));
        let [ox, oz] = self.config.offset;
        let value = self.fractal.value(&(points + Lanes3::splat(Vec3::new(ox, 0.0, oz))));
        value * value
    }

    /// Grey level and alpha for one coverage value
    fn encode(&self, coverage: f32) -> (u8, u8) {
        let CloudConfig { cutoff, border, .. } = self.config;
        if coverage <= cutoff {
            return (0, 0);
        }
        let alpha = if coverage > border {
            u8::MAX
        } else {
            to_byte((coverage - cutoff) / (border - cutoff))
        };
        (to_byte(coverage), alpha)
    }

    /// Renders one face into `buffer`. RGB buffers get the grey level only.
    pub fn generate_face(&self, face: CubeMapFace, buffer: &mut PixelBuffer<'_>) -> Result<()> {
        buffer.validate()?;
        let (width, height) = (buffer.width(), buffer.height());
        log::debug!("generating {:?} cloud face ({}x{})", face, width, height);

        let u_step = pixel_step(width);
        let v_step = pixel_step(height);

        for row in 0..height {
            let v = Vec4::splat(row as f32 * v_step - 1.0);
            for start in (0..width).step_by(LANES) {
                let u = (LANE_OFFSETS + start as f32) * u_step - Vec4::ONE;
                let coverage = self.coverage(face, u, v).to_array();

                for lane in 0..LANES.min(width - start) {
                    let (grey, alpha) = self.encode(coverage[lane]);
                    buffer.put_with_alpha(start + lane, row, [grey; 3], alpha);
                }
            }
        }

        Ok(())
    }
}

/// Bakes all six cloud faces in parallel
pub fn generate_cloud_map(layer: &CloudLayer, size: usize, format: PixelFormat) -> Result<CubeMap> {
    if size == 0 {
        return Err(TerrainError::EmptyGrid { width: 0, height: 0 });
    }

    let faces = CubeMapFace::ALL[..]
        .par_iter()
        .map(|&face| {
            let mut pixels = vec![0u8; size * size * format.bytes_per_pixel()];
            layer.generate_face(face, &mut PixelBuffer::new(size, size, format, &mut pixels))?;
            Ok((face, pixels))
        })
        .collect::<Result<Vec<_>>>()?;

    log::debug!("baked {}x{} cloud map", size, size);
    Ok(CubeMap { size, format, faces })
}
