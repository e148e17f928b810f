use serde::{Deserialize, Serialize};

use super::distribution::{Distribution, DistributionBuilder};
use super::error::{Result, TerrainError};

/// 8-bit RGB colour
pub type Colour = [u8; 3];

/// Returned when no terrain type has any weight at a sample
pub const FALLBACK_COLOUR: Colour = [0, 0, 0];

/// A named surface material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainType {
    /// Diagnostic only
    pub name: String,
    pub colour: Colour,
}

impl TerrainType {
    pub fn new(name: impl Into<String>, colour: Colour) -> Self {
        Self {
            name: name.into(),
            colour,
        }
    }
}

/// Altitude and slope weight curves for one terrain type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDistribution {
    pub altitude: Distribution,
    pub slope: Distribution,
}

impl TypeDistribution {
    pub fn new(altitude: &DistributionBuilder, slope: &DistributionBuilder) -> Self {
        Self {
            altitude: altitude.build(),
            slope: slope.build(),
        }
    }

    pub fn weight(&self, altitude: f32, slope: f32) -> f32 {
        self.altitude.sample(altitude) * self.slope.sample(slope)
    }
}

/// Weight curves for every terrain type within one latitude range
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatitudeBand {
    pub distributions: Vec<TypeDistribution>,
}

impl LatitudeBand {
    pub fn new(distributions: Vec<TypeDistribution>) -> Self {
        Self { distributions }
    }

    pub fn with(mut self, altitude: &DistributionBuilder, slope: &DistributionBuilder) -> Self {
        self.distributions.push(TypeDistribution::new(altitude, slope));
        self
    }
}

/// Blends terrain type colours by latitude, altitude and slope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SelectorData")]
pub struct TerrainTypeSelector {
    types: Vec<TerrainType>,
    bands: Vec<LatitudeBand>,
}

/// Unchecked serialised form; bands are re-added through the public API
#[derive(Deserialize)]
struct SelectorData {
    types: Vec<TerrainType>,
    #[serde(default)]
    bands: Vec<LatitudeBand>,
}

impl TryFrom<SelectorData> for TerrainTypeSelector {
    type Error = TerrainError;

    fn try_from(data: SelectorData) -> Result<Self> {
        let mut selector = Self {
            types: data.types,
            bands: Vec::with_capacity(data.bands.len()),
        };
        for band in data.bands {
            selector.add_latitude_band(band)?;
        }
        Ok(selector)
    }
}

impl TerrainTypeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a terrain type and returns its index. Types must all be added
    /// before the first latitude band.
    pub fn add_type(&mut self, name: impl Into<String>, colour: Colour) -> usize {
        self.types.push(TerrainType::new(name, colour));
        self.types.len() - 1
    }

    /// Appends the next band towards the equator. The band needs one
    /// distribution per terrain type, in type order.
    pub fn add_latitude_band(&mut self, band: LatitudeBand) -> Result<()> {
        if band.distributions.len() != self.types.len() {
            return Err(TerrainError::DistributionCountMismatch {
                expected: self.types.len(),
                actual: band.distributions.len(),
            });
        }
        self.bands.push(band);
        Ok(())
    }

    pub fn types(&self) -> &[TerrainType] {
        &self.types
    }

    pub fn bands(&self) -> &[LatitudeBand] {
        &self.bands
    }

    /// Band covering a latitude in [0, 1], where 0 is the pole
    pub fn band(&self, latitude: f32) -> Option<&LatitudeBand> {
        let count = self.bands.len();
        if count == 0 {
            return None;
        }
        let index = (latitude.clamp(0.0, 1.0) * count as f32) as usize;
        self.bands.get(index.min(count - 1))
    }

    /// Weighted blend of every type's colour. Returns [`FALLBACK_COLOUR`]
    /// when no type carries weight.
    pub fn colour(&self, latitude: f32, altitude: f32, slope: f32, weight_multiplier: f32) -> Colour {
        let Some(band) = self.band(latitude) else {
            return FALLBACK_COLOUR;
        };

        let weight = |d: &TypeDistribution| d.weight(altitude, slope) * weight_multiplier;
        let total: f32 = band.distributions.iter().map(weight).sum();
        if !total.is_finite() || total <= 0.0 {
            return FALLBACK_COLOUR;
        }

        let mut blended = [0.0f32; 3];
        for (terrain_type, distribution) in self.types.iter().zip(&band.distributions) {
            let share = weight(distribution) / total;
            for (channel, &component) in blended.iter_mut().zip(&terrain_type.colour) {
                *channel += share * f32::from(component);
            }
        }
        blended.map(|c| c.round().clamp(0.0, 255.0) as u8)
    }

    /// Sand, dirt, grass, forest, rock and snow over polar, temperate and
    /// tropical bands
    pub fn earth_like() -> Self {
        let mut selector = Self::new();
        selector.add_type("sand", [204, 190, 128]);
        selector.add_type("dirt", [120, 92, 60]);
        selector.add_type("grass", [76, 153, 64]);
        selector.add_type("forest", [40, 96, 40]);
        selector.add_type("rock", [128, 120, 112]);
        selector.add_type("snow", [242, 242, 250]);

        let flat = {
            let mut b = DistributionBuilder::new();
            b.add(0.0, 1.0).add(0.3, 1.0).add(0.6, 0.0);
            b
        };
        let steep = {
            let mut b = DistributionBuilder::new();
            b.add(0.0, 0.05).add(0.4, 0.3).add(1.0, 1.0);
            b
        };
        let any_slope = DistributionBuilder::constant(1.0);
        let none = DistributionBuilder::constant(0.0);
        let rock_altitude = DistributionBuilder::constant(0.2);
        let curve = |points: &[(f32, f32)]| {
            let mut b = DistributionBuilder::new();
            for &(fraction, value) in points {
                b.add(fraction, value);
            }
            b
        };

        // Polar: mostly snow and rock
        let polar = LatitudeBand::default()
            .with(&none, &flat)
            .with(&curve(&[(0.0, 0.6), (0.2, 0.0)]), &flat)
            .with(&none, &flat)
            .with(&none, &flat)
            .with(&rock_altitude, &steep)
            .with(&curve(&[(0.0, 0.4), (0.15, 1.0)]), &flat);

        // Temperate: beaches, grassland, forest, snow caps
        let temperate = LatitudeBand::default()
            .with(&curve(&[(0.0, 1.0), (0.08, 1.0), (0.15, 0.0)]), &flat)
            .with(&curve(&[(0.1, 0.0), (0.2, 0.5), (0.4, 0.2)]), &any_slope)
            .with(&curve(&[(0.1, 0.0), (0.2, 1.0), (0.5, 0.6), (0.7, 0.0)]), &flat)
            .with(&curve(&[(0.3, 0.0), (0.5, 1.0), (0.75, 0.0)]), &flat)
            .with(&rock_altitude, &steep)
            .with(&{
                let mut b = DistributionBuilder::new();
                b.add(0.0, 0.0).add_sharp(0.8, 1.0);
                b
            }, &flat);

        // Tropical: wide beaches and dense forest
        let tropical = LatitudeBand::default()
            .with(&curve(&[(0.0, 1.0), (0.12, 1.0), (0.2, 0.0)]), &flat)
            .with(&curve(&[(0.6, 0.0), (0.8, 0.6)]), &any_slope)
            .with(&curve(&[(0.15, 0.0), (0.25, 0.8), (0.4, 0.3)]), &flat)
            .with(&curve(&[(0.2, 0.0), (0.35, 1.0), (0.8, 0.4), (0.9, 0.0)]), &flat)
            .with(&rock_altitude, &steep)
            .with(&{
                let mut b = DistributionBuilder::new();
                b.add(0.0, 0.0).add_sharp(0.92, 1.0);
                b
            }, &flat);

        // One distribution per type in every band
        selector.bands = vec![polar, temperate, tropical];
        selector
    }
}
