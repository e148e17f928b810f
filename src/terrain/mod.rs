// Planet terrain generation

pub mod clouds;
pub mod config;
pub mod displacer;
pub mod distribution;
pub mod error;
pub mod fractal;
pub mod lanes;
pub mod lod;
pub mod noise;
pub mod patch;
pub mod scanline;
pub mod texture;
pub mod type_selector;

pub use clouds::*;
pub use config::*;
pub use displacer::*;
pub use distribution::*;
pub use error::{Result, TerrainError};
pub use fractal::*;
pub use lanes::*;
pub use lod::*;
pub use noise::*;
pub use patch::*;
pub use scanline::*;
pub use texture::*;
pub use type_selector::*;
