use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};

use super::displacer::Displace;
use super::error::{Result, TerrainError};
use super::lanes::{Lanes3, LANES};
use super::lod::LodErrorEstimator;
use super::scanline::ScanlineCache;

/// Normal deviation from the up vector that counts as a full slope of 1
pub const DEFAULT_SLOPE_RANGE: f32 = 0.3;

/// Fully populated terrain vertex
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    /// 0 (flat) to 1 (steep)
    pub slope: f32,
    /// Normalised height from the displacer
    pub elevation: f32,
}

/// Byte layout of a caller-owned vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: usize,
    pub position_offset: usize,
    pub normal_offset: usize,
}

const VEC3_BYTES: usize = size_of::<[f32; 3]>();

impl VertexLayout {
    pub fn new(stride: usize, position_offset: usize, normal_offset: usize) -> Self {
        Self {
            stride,
            position_offset,
            normal_offset,
        }
    }

    /// Layout of [`TerrainVertex`]
    pub fn terrain_vertex() -> Self {
        Self::new(
            size_of::<TerrainVertex>(),
            offset_of!(TerrainVertex, position),
            offset_of!(TerrainVertex, normal),
        )
    }

    pub fn validate(&self) -> Result<()> {
        for (name, offset) in [("position", self.position_offset), ("normal", self.normal_offset)] {
            if offset + VEC3_BYTES > self.stride {
                return Err(TerrainError::InvalidLayout(format!(
                    "{} at offset {} does not fit in a {} byte stride",
                    name, offset, self.stride
                )));
            }
        }
        if self.position_offset.abs_diff(self.normal_offset) < VEC3_BYTES {
            return Err(TerrainError::InvalidLayout(format!(
                "position ({}) and normal ({}) overlap",
                self.position_offset, self.normal_offset
            )));
        }
        Ok(())
    }

    /// Bytes needed to hold `count` vertices
    pub fn required_len(&self, count: usize) -> usize {
        match count {
            0 => 0,
            n => (n - 1) * self.stride + self.position_offset.max(self.normal_offset) + VEC3_BYTES,
        }
    }
}

/// A rectangular grid of sample points: vertex `(col, row)` sits at
/// `origin + x_step * col + z_step * row`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchGrid {
    pub origin: Vec3,
    pub x_step: Vec3,
    pub z_step: Vec3,
    pub width: usize,
    pub height: usize,
    pub uv_origin: Vec2,
    /// UV distance covered across the whole patch
    pub uv_resolution: f32,
}

impl PatchGrid {
    pub fn new(origin: Vec3, x_step: Vec3, z_step: Vec3, width: usize, height: usize) -> Self {
        Self {
            origin,
            x_step,
            z_step,
            width,
            height,
            uv_origin: Vec2::ZERO,
            uv_resolution: 1.0,
        }
    }

    pub fn with_uv(mut self, uv_origin: Vec2, uv_resolution: f32) -> Self {
        self.uv_origin = uv_origin;
        self.uv_resolution = uv_resolution;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TerrainError::EmptyGrid {
                width: self.width,
                height: self.height,
            });
        }
        let (x, z) = (self.x_step.length(), self.z_step.length());
        if !(x.is_finite() && z.is_finite() && x > 0.0 && z > 0.0 && self.origin.is_finite()) {
            return Err(TerrainError::InvalidStepSize { x, z });
        }
        Ok(())
    }

    pub fn vertex_count(&self) -> usize {
        self.width * self.height
    }

    pub fn point(&self, col: usize, row: usize) -> Vec3 {
        self.origin + self.x_step * col as f32 + self.z_step * row as f32
    }

    /// Same footprint sampled at twice the resolution
    pub fn doubled(&self) -> Self {
        Self {
            x_step: self.x_step * 0.5,
            z_step: self.z_step * 0.5,
            width: self.width * 2 - 1,
            height: self.height * 2 - 1,
            ..*self
        }
    }

    fn uv_increment(&self) -> Vec2 {
        let per_step = |count: usize| {
            if count > 1 {
                self.uv_resolution / (count - 1) as f32
            } else {
                0.0
            }
        };
        Vec2::new(per_step(self.width), per_step(self.height))
    }
}

/// Displaced positions, normals and slopes for four samples
pub(crate) struct SurfaceBlock {
    pub positions: Lanes3,
    pub normals: Lanes3,
    pub heights: Vec4,
    pub slopes: Vec4,
}

/// Sum of the four cross products around a sample, unnormalised.
/// Neighbour offsets are relative to the displaced centre.
pub(crate) fn accumulate_normal(left: &Lanes3, up: &Lanes3, right: &Lanes3, down: &Lanes3) -> Lanes3 {
    up.cross(left) + right.cross(up) + down.cross(right) + left.cross(down)
}

pub(crate) fn slope_from_normal(normal: &Lanes3, up: &Lanes3, slope_range: f32) -> Vec4 {
    ((Vec4::ONE - normal.dot(up)) / slope_range).clamp(Vec4::ZERO, Vec4::ONE)
}

/// Produces vertex buffers, cube-map faces and LOD errors from a displacer
#[derive(Debug, Clone)]
pub struct TerrainPatchGenerator<D> {
    pub(super) displacer: D,
    smallest_step: Option<Vec2>,
    pub(super) slope_range: f32,
    pub(super) cache: ScanlineCache,
}

impl<D: Displace> TerrainPatchGenerator<D> {
    pub fn new(displacer: D) -> Self {
        Self {
            displacer,
            smallest_step: None,
            slope_range: DEFAULT_SLOPE_RANGE,
            cache: ScanlineCache::new(),
        }
    }

    pub fn displacer(&self) -> &D {
        &self.displacer
    }

    pub fn displacer_mut(&mut self) -> &mut D {
        &mut self.displacer
    }

    /// Finite-difference offset used for vertex normals. Must be set before
    /// generating vertices.
    pub fn set_smallest_step_size(&mut self, x: f32, z: f32) -> Result<()> {
        if !(x.is_finite() && z.is_finite() && x > 0.0 && z > 0.0) {
            return Err(TerrainError::InvalidStepSize { x, z });
        }
        self.smallest_step = Some(Vec2::new(x, z));
        Ok(())
    }

    pub fn smallest_step_size(&self) -> Option<Vec2> {
        self.smallest_step
    }

    pub fn set_slope_range(&mut self, slope_range: f32) -> Result<()> {
        if !(slope_range.is_finite() && slope_range > 0.0) {
            return Err(TerrainError::InvalidSlopeRange(slope_range));
        }
        self.slope_range = slope_range;
        Ok(())
    }

    pub fn slope_range(&self) -> f32 {
        self.slope_range
    }

    /// Fills `vertices` row by row with every vertex attribute
    pub fn generate_vertices(&self, grid: &PatchGrid, vertices: &mut [TerrainVertex]) -> Result<()> {
        let count = grid.vertex_count();
        if vertices.len() < count {
            return Err(TerrainError::BufferTooSmall {
                required: count,
                actual: vertices.len(),
            });
        }
        self.visit_vertices(grid, |index, vertex| vertices[index] = vertex)
    }

    /// Writes only positions and normals into a strided byte buffer; other
    /// bytes are left untouched
    pub fn generate_vertices_strided(&self, grid: &PatchGrid, layout: &VertexLayout, buffer: &mut [u8]) -> Result<()> {
        layout.validate()?;
        let required = layout.required_len(grid.vertex_count());
        if buffer.len() < required {
            return Err(TerrainError::BufferTooSmall {
                required,
                actual: buffer.len(),
            });
        }
        self.visit_vertices(grid, |index, vertex| {
            let base = index * layout.stride;
            let position = base + layout.position_offset;
            let normal = base + layout.normal_offset;
            buffer[position..position + VEC3_BYTES].copy_from_slice(bytemuck::bytes_of(&vertex.position));
            buffer[normal..normal + VEC3_BYTES].copy_from_slice(bytemuck::bytes_of(&vertex.normal));
        })
    }

    /// Generates vertices and returns the world-space error of the patch at
    /// this resolution
    pub fn generate_vertices_with_error(&self, grid: &PatchGrid, vertices: &mut [TerrainVertex]) -> Result<f32> {
        self.generate_vertices(grid, vertices)?;
        LodErrorEstimator::new(&self.displacer).estimate(grid)
    }

    fn visit_vertices(&self, grid: &PatchGrid, mut emit: impl FnMut(usize, TerrainVertex)) -> Result<()> {
        grid.validate()?;
        let (shift_right, shift_down) = self.shift_vectors(grid)?;
        let uv_step = grid.uv_increment();
        log::debug!(
            "generating {}x{} vertex patch at {:?}",
            grid.width,
            grid.height,
            grid.origin
        );

        for row in 0..grid.height {
            let v = grid.uv_origin.y + uv_step.y * row as f32;
            for start in (0..grid.width).step_by(LANES) {
                let points = Lanes3::strided(grid.point(start, row), grid.x_step);
                let block = self.surface_block(&points, shift_right, shift_down);
                let heights = block.heights.to_array();
                let slopes = block.slopes.to_array();

                // Lanes past the row end are computed but never written
                for lane in 0..LANES.min(grid.width - start) {
                    let col = start + lane;
                    emit(
                        row * grid.width + col,
                        TerrainVertex {
                            position: block.positions.lane(lane).to_array(),
                            normal: block.normals.lane(lane).to_array(),
                            uv: [grid.uv_origin.x + uv_step.x * col as f32, v],
                            slope: slopes[lane],
                            elevation: heights[lane],
                        },
                    );
                }
            }
        }
        Ok(())
    }

    /// Finite-difference offsets along the grid axes, sized by the smallest step
    fn shift_vectors(&self, grid: &PatchGrid) -> Result<(Vec3, Vec3)> {
        let step = self.smallest_step.ok_or(TerrainError::StepSizeNotSet)?;
        Ok((
            grid.x_step.normalize() * step.x,
            grid.z_step.normalize() * step.y,
        ))
    }

    fn displaced(&self, mut points: Lanes3) -> Lanes3 {
        self.displacer.map_to_displacement_space(&mut points);
        self.displacer.displace(&mut points);
        points
    }

    pub(crate) fn surface_block(&self, points: &Lanes3, shift_right: Vec3, shift_down: Vec3) -> SurfaceBlock {
        let up = self.displacer.up_vector(points);

        let mut centre = *points;
        self.displacer.map_to_displacement_space(&mut centre);
        let heights = self.displacer.displace(&mut centre);

        let right = Lanes3::splat(shift_right);
        let down = Lanes3::splat(shift_down);
        let left_offset = self.displaced(*points - right) - centre;
        let up_offset = self.displaced(*points - down) - centre;
        let right_offset = self.displaced(*points + right) - centre;
        let down_offset = self.displaced(*points + down) - centre;

        let normals = accumulate_normal(&left_offset, &up_offset, &right_offset, &down_offset).normalized();
        let slopes = slope_from_normal(&normals, &up, self.slope_range);

        SurfaceBlock {
            positions: centre,
            normals,
            heights,
            slopes,
        }
    }
}
