//! Cube-map face generation.
//!
//! Each pixel of a face is mapped to a direction, displaced, and encoded as
//! grey noise, packed terrain properties or a blended terrain colour. Rows are
//! produced through a rolling three-line cache so the vertical neighbours
//! used for normals are computed once per row.

use glam::{Vec3, Vec4};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::displacer::{Displace, Geometry};
use super::error::{Result, TerrainError};
use super::lanes::{Lanes3, LANES, LANE_OFFSETS};
use super::patch::{accumulate_normal, slope_from_normal, TerrainPatchGenerator};
use super::scanline::CacheLine;
use super::type_selector::{Colour, TerrainTypeSelector};

/// One face of a cube map, named by the axis it faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CubeMapFace {
    NegativeX,
    PositiveX,
    NegativeY,
    PositiveY,
    NegativeZ,
    PositiveZ,
}

impl CubeMapFace {
    pub const ALL: [Self; 6] = [
        Self::NegativeX,
        Self::PositiveX,
        Self::NegativeY,
        Self::PositiveY,
        Self::NegativeZ,
        Self::PositiveZ,
    ];

    /// Cube-surface points for face coordinates `(u, v)` in [-1, 1]
    pub fn position(self, u: Vec4, v: Vec4) -> Lanes3 {
        let one = Vec4::ONE;
        match self {
            Self::NegativeX => Lanes3::new(-one, v, u),
            Self::PositiveX => Lanes3::new(one, v, -u),
            Self::NegativeY => Lanes3::new(-u, -one, -v),
            Self::PositiveY => Lanes3::new(-u, one, v),
            Self::NegativeZ => Lanes3::new(-u, v, -one),
            Self::PositiveZ => Lanes3::new(u, v, one),
        }
    }

    pub fn direction(self, u: f32, v: f32) -> Vec3 {
        self.position(Vec4::splat(u), Vec4::splat(v)).lane(0)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::NegativeX => "neg_x",
            Self::PositiveX => "pos_x",
            Self::NegativeY => "neg_y",
            Self::PositiveY => "pos_y",
            Self::NegativeZ => "neg_z",
            Self::PositiveZ => "pos_z",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
        }
    }
}

/// Caller-owned pixel storage with an optional padded row stride
#[derive(Debug)]
pub struct PixelBuffer<'a> {
    width: usize,
    height: usize,
    stride: usize,
    format: PixelFormat,
    pixels: &'a mut [u8],
}

impl<'a> PixelBuffer<'a> {
    /// Tightly packed rows
    pub fn new(width: usize, height: usize, format: PixelFormat, pixels: &'a mut [u8]) -> Self {
        Self::with_stride(width, height, width * format.bytes_per_pixel(), format, pixels)
    }

    pub fn with_stride(width: usize, height: usize, stride: usize, format: PixelFormat, pixels: &'a mut [u8]) -> Self {
        Self {
            width,
            height,
            stride,
            format,
            pixels,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pixels(&self) -> &[u8] {
        self.pixels
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TerrainError::EmptyGrid {
                width: self.width,
                height: self.height,
            });
        }
        let row_bytes = self.width * self.format.bytes_per_pixel();
        if self.stride < row_bytes {
            return Err(TerrainError::InvalidLayout(format!(
                "row stride {} is smaller than {} bytes per row",
                self.stride, row_bytes
            )));
        }
        let required = self.stride * (self.height - 1) + row_bytes;
        if self.pixels.len() < required {
            return Err(TerrainError::BufferTooSmall {
                required,
                actual: self.pixels.len(),
            });
        }
        Ok(())
    }

    fn put(&mut self, col: usize, row: usize, rgb: Colour) {
        self.put_with_alpha(col, row, rgb, u8::MAX);
    }

    /// Writes one pixel; `alpha` is dropped for RGB buffers
    pub(super) fn put_with_alpha(&mut self, col: usize, row: usize, rgb: Colour, alpha: u8) {
        let offset = row * self.stride + col * self.format.bytes_per_pixel();
        self.pixels[offset..offset + 3].copy_from_slice(&rgb);
        if self.format == PixelFormat::Rgba8 {
            self.pixels[offset + 3] = alpha;
        }
    }
}

/// What a generated face encodes
#[derive(Debug, Clone, Copy)]
pub enum TextureContent<'a> {
    /// Grey level from the normalised height
    Noise,
    /// Slope in red, height in green, blue reserved
    TerrainProperties,
    /// Terrain types blended by latitude, height and slope
    TerrainColour(&'a TerrainTypeSelector),
}

impl TextureContent<'_> {
    fn encode(&self, height: f32, slope: f32, latitude: f32) -> Colour {
        match self {
            Self::Noise => {
                let grey = to_byte(height);
                [grey, grey, grey]
            }
            Self::TerrainProperties => [to_byte(slope), to_byte(height), 0],
            Self::TerrainColour(selector) => selector.colour(latitude, height, slope, 1.0),
        }
    }
}

pub(super) fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Distance between neighbouring pixel centres across [-1, 1]
pub(super) fn pixel_step(count: usize) -> f32 {
    if count > 1 {
        2.0 / (count - 1) as f32
    } else {
        0.0
    }
}

/// Displaces one row of face samples into `line`. Cache column 0 is one pixel
/// left of the face edge.
fn fill_line<D: Displace>(displacer: &D, line: &mut CacheLine, face: CubeMapFace, v: f32, u_step: f32, columns: usize) {
    let v = Vec4::splat(v);
    let sphere = displacer.geometry() == Geometry::Sphere;

    for start in (0..columns).step_by(LANES) {
        let u = (LANE_OFFSETS + (start as f32 - 1.0)) * u_step - Vec4::ONE;
        let mut points = face.position(u, v);
        let direction = points.normalized();
        if sphere {
            points = direction;
        }
        let latitudes = Vec4::ONE - direction.y.abs();

        displacer.map_to_displacement_space(&mut points);
        let heights = displacer.displace(&mut points);
        line.store(start, &points, heights, latitudes);
    }
}

impl<D: Displace> TerrainPatchGenerator<D> {
    /// Renders one cube-map face into `buffer`
    pub fn generate_cube_map_face(
        &mut self,
        face: CubeMapFace,
        content: TextureContent<'_>,
        buffer: &mut PixelBuffer<'_>,
    ) -> Result<()> {
        buffer.validate()?;
        let (width, height) = (buffer.width(), buffer.height());
        log::debug!("generating {:?} face ({}x{}, {:?})", face, width, height, buffer.format());

        let u_step = pixel_step(width);
        let v_step = pixel_step(height);
        let row_v = |row: usize| (row as f32 - 1.0) * v_step - 1.0;
        // One block of border on each side of the padded row
        let columns = width.div_ceil(LANES) * LANES + 2 * LANES;

        let Self {
            displacer,
            cache,
            slope_range,
            ..
        } = self;
        let displacer = &*displacer;

        // Cache rows are offset by one: row_v(0) is the line above the face
        cache.prepare(columns);
        fill_line(displacer, cache.previous_mut(), face, row_v(0), u_step, columns);
        fill_line(displacer, cache.current_mut(), face, row_v(1), u_step, columns);
        fill_line(displacer, cache.next_mut(), face, row_v(2), u_step, columns);

        for row in 0..height {
            let (previous, current, next) = (cache.previous(), cache.current(), cache.next());
            for start in (0..width).step_by(LANES) {
                let c = start + 1;
                let centre = current.positions(c);
                let left = current.positions(c - 1) - centre;
                let right = current.positions(c + 1) - centre;
                let up = previous.positions(c) - centre;
                let down = next.positions(c) - centre;

                // Face (u, v) axes are wound inward
                let summed = -accumulate_normal(&left, &up, &right, &down);
                let surface_up = displacer.up_vector(&centre);
                // A face one pixel across has no neighbour offsets along that axis
                let spanned = summed.length_squared().cmpgt(Vec4::ZERO);
                let normals = Lanes3::select(spanned, &summed.normalized(), &surface_up);
                let slopes = slope_from_normal(&normals, &surface_up, *slope_range).to_array();
                let heights = current.heights(c).to_array();
                let latitudes = current.latitudes(c).to_array();

                for lane in 0..LANES.min(width - start) {
                    let rgb = content.encode(heights[lane], slopes[lane], latitudes[lane]);
                    buffer.put(start + lane, row, rgb);
                }
            }

            cache.rotate();
            if row + 1 < height {
                fill_line(displacer, cache.next_mut(), face, row_v(row + 3), u_step, columns);
            }
        }

        Ok(())
    }
}

/// Six baked faces in [`CubeMapFace::ALL`] order
#[derive(Debug, Clone)]
pub struct CubeMap {
    pub size: usize,
    pub format: PixelFormat,
    pub faces: Vec<(CubeMapFace, Vec<u8>)>,
}

impl CubeMap {
    pub fn face(&self, face: CubeMapFace) -> Option<&[u8]> {
        self.faces
            .iter()
            .find(|(f, _)| *f == face)
            .map(|(_, pixels)| pixels.as_slice())
    }
}

/// Bakes all six faces in parallel, each on its own copy of `generator`
pub fn generate_cube_map<D>(
    generator: &TerrainPatchGenerator<D>,
    content: TextureContent<'_>,
    size: usize,
    format: PixelFormat,
) -> Result<CubeMap>
where
    D: Displace + Clone + Send + Sync,
{
    if size == 0 {
        return Err(TerrainError::EmptyGrid { width: 0, height: 0 });
    }

    let faces = CubeMapFace::ALL[..]
        .par_iter()
        .map(|&face| {
            let mut face_generator = generator.clone();
            let mut pixels = vec![0u8; size * size * format.bytes_per_pixel()];
            face_generator.generate_cube_map_face(face, content, &mut PixelBuffer::new(size, size, format, &mut pixels))?;
            Ok((face, pixels))
        })
        .collect::<Result<Vec<_>>>()?;

    log::debug!("baked {}x{} cube map", size, size);
    Ok(CubeMap { size, format, faces })
}
