#![warn(clippy::all, rust_2018_idioms)]

//! Procedural planet terrain: seeded fractal noise displaced over a sphere or
//! plane, emitted as vertex patches, cube-map faces and level-of-detail errors.

pub mod terrain;
