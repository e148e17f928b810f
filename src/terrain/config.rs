use serde::{Deserialize, Serialize};

use super::clouds::{CloudConfig, CloudLayer};
use super::displacer::{
    AnyDisplacer, Displace, DisplacerParameters, FlatDisplacer, FunctionDisplacer, Geometry, GroundDisplacer,
    DEFAULT_GROUND_INFLUENCE,
};
use super::error::{Result, TerrainError};
use super::fractal::{BandedSumFractal, FractalConfig, RidgedFractal, TerrainFunction};
use super::patch::{TerrainPatchGenerator, DEFAULT_SLOPE_RANGE};

/// Smallest normal step as a fraction of the patch scale, when none is configured
pub const DEFAULT_STEP_FRACTION: f32 = 1e-4;

/// Height function selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FunctionConfig {
    /// No height function: the surface sits at the minimum height
    Flat,
    BandedSum(FractalConfig),
    Ridged(FractalConfig),
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self::Ridged(FractalConfig::ridged())
    }
}

impl FunctionConfig {
    /// Builds the height function, or `None` for [`FunctionConfig::Flat`]
    pub fn build(&self) -> Result<Option<TerrainFunction>> {
        Ok(match self {
            Self::Flat => None,
            Self::BandedSum(config) => Some(BandedSumFractal::new(*config)?.into()),
            Self::Ridged(config) => Some(RidgedFractal::new(*config)?.into()),
        })
    }
}

/// Tangential ground warping layered under the height function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundConfig {
    pub function: FunctionConfig,
    #[serde(default = "default_ground_influence")]
    pub influence: f32,
}

fn default_ground_influence() -> f32 {
    DEFAULT_GROUND_INFLUENCE
}

/// Complete terrain description, loadable from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub geometry: Geometry,
    pub height: FunctionConfig,
    pub ground: Option<GroundConfig>,
    pub displacer: DisplacerParameters,
    /// Finite-difference offset (x, z) for vertex normals
    pub smallest_step: Option<[f32; 2]>,
    pub slope_range: f32,
    /// Optional cloud layer baked alongside the surface
    pub clouds: Option<CloudConfig>,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            geometry: Geometry::Sphere,
            height: FunctionConfig::default(),
            ground: None,
            displacer: DisplacerParameters::default(),
            smallest_step: None,
            slope_range: DEFAULT_SLOPE_RANGE,
            clouds: None,
        }
    }
}

impl TerrainConfig {
    /// Rolling banded-sum terrain on a sphere
    pub fn rolling_planet(seed: u32) -> Self {
        Self {
            height: FunctionConfig::BandedSum(FractalConfig::banded().with_seed(seed)),
            ..Default::default()
        }
    }

    /// Ridged mountains warped by banded-sum ground displacement
    pub fn mountainous_planet(seed: u32) -> Self {
        Self {
            height: FunctionConfig::Ridged(FractalConfig::ridged().with_seed(seed)),
            ground: Some(GroundConfig {
                function: FunctionConfig::BandedSum(FractalConfig::banded().with_seed(seed.wrapping_add(1))),
                influence: DEFAULT_GROUND_INFLUENCE,
            }),
            clouds: Some(CloudConfig {
                fractal: FractalConfig::clouds().with_seed(seed.wrapping_add(2)),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builds and sets up the configured displacer
    pub fn build_displacer(&self) -> Result<AnyDisplacer> {
        let height = self.height.build()?;
        let mut displacer: AnyDisplacer = match (height, &self.ground) {
            (None, None) => FlatDisplacer::new(self.geometry).into(),
            (Some(function), None) => FunctionDisplacer::new(self.geometry, function).into(),
            (Some(function), Some(ground)) => {
                let ground_function = ground.function.build()?.ok_or_else(|| {
                    TerrainError::Unsupported("ground displacement needs a non-flat ground function".into())
                })?;
                GroundDisplacer::new(FunctionDisplacer::new(self.geometry, function), ground_function)
                    .with_influence(ground.influence)
                    .into()
            }
            (None, Some(_)) => {
                return Err(TerrainError::Unsupported(
                    "ground displacement over a flat height function".into(),
                ))
            }
        };
        displacer.setup(self.displacer)?;
        Ok(displacer)
    }

    /// Builds the cloud layer, if one is configured
    pub fn build_clouds(&self) -> Result<Option<CloudLayer>> {
        self.clouds.map(CloudLayer::new).transpose()
    }

    /// Builds a generator with the step size and slope range applied
    pub fn build_generator(&self) -> Result<TerrainPatchGenerator<AnyDisplacer>> {
        let mut generator = TerrainPatchGenerator::new(self.build_displacer()?);
        let [x, z] = self.smallest_step.unwrap_or_else(|| {
            let step = self.displacer.patch_scale * DEFAULT_STEP_FRACTION;
            [step, step]
        });
        generator.set_smallest_step_size(x, z)?;
        generator.set_slope_range(self.slope_range)?;
        log::debug!(
            "built {:?} terrain generator (height: {:?}, ground: {})",
            self.geometry,
            self.height,
            self.ground.is_some()
        );
        Ok(generator)
    }
}
