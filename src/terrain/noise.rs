//! Seeded improved-Perlin noise evaluated four points at a time.

use ::noise::NoiseFn;
use glam::{IVec4, Vec2, Vec3, Vec4};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::error::{Result, TerrainError};
use super::lanes::{Lanes3, LANES, LANE_OFFSETS};

/// Divisor applied to raw gradient noise so practical output spans about [-1, 1].
/// Empirically tuned.
pub const NOISE_NORMALIZATION: f32 = 0.9;

const TABLE_SIZE: usize = 256;
const CELL_MASK: i32 = 255;

/// Gradient noise kernel owning a seeded permutation table
///
/// The table is only rebuilt by [`NoiseKernel::reseed`], which needs exclusive
/// access, so evaluation can never observe a half-built table.
#[derive(Clone)]
pub struct NoiseKernel {
    seed: u32,
    perms: [i32; TABLE_SIZE * 2],
}

impl std::fmt::Debug for NoiseKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseKernel").field("seed", &self.seed).finish_non_exhaustive()
    }
}

impl Default for NoiseKernel {
    fn default() -> Self {
        Self::new(0)
    }
}

impl NoiseKernel {
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            perms: build_permutations(seed),
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Rebuilds the permutation table for `seed`
    pub fn reseed(&mut self, seed: u32) {
        log::trace!("reseeding noise kernel: {} -> {}", self.seed, seed);
        self.seed = seed;
        self.perms = build_permutations(seed);
    }

    #[inline]
    fn perm(&self, index: IVec4) -> IVec4 {
        let [a, b, c, d] = index.to_array();
        IVec4::new(
            self.perms[a as usize],
            self.perms[b as usize],
            self.perms[c as usize],
            self.perms[d as usize],
        )
    }

    /// Noise at four points, one per lane
    pub fn evaluate(&self, x: Vec4, y: Vec4, z: Vec4) -> Vec4 {
        let cell_x = x.floor();
        let cell_y = y.floor();
        let cell_z = z.floor();

        let mask = IVec4::splat(CELL_MASK);
        let ix = cell_x.as_ivec4() & mask;
        let iy = cell_y.as_ivec4() & mask;
        let iz = cell_z.as_ivec4() & mask;

        let x = x - cell_x;
        let y = y - cell_y;
        let z = z - cell_z;

        let u = fade(x);
        let v = fade(y);
        let w = fade(z);

        let one = IVec4::ONE;
        let a = self.perm(ix) + iy;
        let aa = self.perm(a) + iz;
        let ab = self.perm(a + one) + iz;
        let b = self.perm(ix + one) + iy;
        let ba = self.perm(b) + iz;
        let bb = self.perm(b + one) + iz;

        let x1 = x - Vec4::ONE;
        let y1 = y - Vec4::ONE;
        let z1 = z - Vec4::ONE;

        let near = lerp(
            v,
            lerp(u, grad(self.perm(aa), x, y, z), grad(self.perm(ba), x1, y, z)),
            lerp(u, grad(self.perm(ab), x, y1, z), grad(self.perm(bb), x1, y1, z)),
        );
        let far = lerp(
            v,
            lerp(
                u,
                grad(self.perm(aa + one), x, y, z1),
                grad(self.perm(ba + one), x1, y, z1),
            ),
            lerp(
                u,
                grad(self.perm(ab + one), x, y1, z1),
                grad(self.perm(bb + one), x1, y1, z1),
            ),
        );

        lerp(w, near, far) / NOISE_NORMALIZATION
    }

    pub fn evaluate_lanes(&self, points: &Lanes3) -> Vec4 {
        self.evaluate(points.x, points.y, points.z)
    }

    pub fn evaluate_points(&self, points: [Vec3; LANES]) -> [f32; LANES] {
        self.evaluate_lanes(&Lanes3::from_points(points)).to_array()
    }

    /// Single point, run through the same four-lane pipeline
    pub fn sample(&self, point: Vec3) -> f32 {
        self.evaluate_lanes(&Lanes3::splat(point)).x
    }

    /// Writes a seamlessly tiling 8-bit noise image.
    ///
    /// The image covers `tile_size` noise units starting at `origin.xy`, on the
    /// noise plane `z = origin.z`. Each pixel blends four samples offset by one
    /// tile so opposite edges match.
    pub fn generate_tiled_bitmap(
        &self,
        width: usize,
        height: usize,
        stride: usize,
        pixels: &mut [u8],
        origin: Vec3,
        tile_size: Vec2,
    ) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(TerrainError::EmptyGrid { width, height });
        }
        if stride < width {
            return Err(TerrainError::InvalidLayout(format!(
                "row stride {} is narrower than {} pixels",
                stride, width
            )));
        }
        let required = stride * (height - 1) + width;
        if pixels.len() < required {
            return Err(TerrainError::BufferTooSmall {
                required,
                actual: pixels.len(),
            });
        }

        let step = tile_size / Vec2::new(width as f32, height as f32);
        let area = tile_size.x * tile_size.y;
        let z = Vec4::splat(origin.z);

        for row in 0..height {
            let fy = Vec4::splat(row as f32 * step.y);
            let y = fy + origin.y;
            let line = &mut pixels[row * stride..row * stride + width];

            for start in (0..width).step_by(LANES) {
                let fx = (LANE_OFFSETS + start as f32) * step.x;
                let x = fx + origin.x;
                let rx = Vec4::splat(tile_size.x) - fx;
                let ry = Vec4::splat(tile_size.y) - fy;

                let sum = self.evaluate(x, y, z) * rx * ry
                    + self.evaluate(x - tile_size.x, y, z) * fx * ry
                    + self.evaluate(x - tile_size.x, y - tile_size.y, z) * fx * fy
                    + self.evaluate(x, y - tile_size.y, z) * rx * fy;
                let bytes = (sum / area * 128.0 + 128.0).clamp(Vec4::ZERO, Vec4::splat(255.0));

                let count = LANES.min(width - start);
                for (pixel, value) in line[start..start + count].iter_mut().zip(bytes.to_array()) {
                    *pixel = value as u8;
                }
            }
        }

        Ok(())
    }
}

impl NoiseFn<f64, 3> for NoiseKernel {
    fn get(&self, point: [f64; 3]) -> f64 {
        f64::from(self.sample(Vec3::new(point[0] as f32, point[1] as f32, point[2] as f32)))
    }
}

fn build_permutations(seed: u32) -> [i32; TABLE_SIZE * 2] {
    let mut rng = ChaCha8Rng::seed_from_u64(u64::from(seed));
    let mut shuffled: Vec<i32> = (0..TABLE_SIZE as i32).collect();
    shuffled.shuffle(&mut rng);

    let mut perms = [0; TABLE_SIZE * 2];
    for (i, slot) in perms.iter_mut().enumerate() {
        *slot = shuffled[i % TABLE_SIZE];
    }
    perms
}

/// `6t^5 - 15t^4 + 10t^3`
#[inline]
fn fade(t: Vec4) -> Vec4 {
    let t3 = t * (t * t);
    ((t * 6.0 - Vec4::splat(15.0)) * t + Vec4::splat(10.0)) * t3
}

#[inline]
fn lerp(t: Vec4, a: Vec4, b: Vec4) -> Vec4 {
    a + (b - a) * t
}

/// Dot product of the corner-relative vector with one of the 12 edge gradients
#[inline]
fn grad(hash: IVec4, x: Vec4, y: Vec4, z: Vec4) -> Vec4 {
    let h = hash & IVec4::splat(15);
    let hf = h.as_vec4();

    let u = Vec4::select(hf.cmplt(Vec4::splat(8.0)), x, y);
    let x_or_z = Vec4::select(
        hf.cmpeq(Vec4::splat(12.0)) | hf.cmpeq(Vec4::splat(14.0)),
        x,
        z,
    );
    let v = Vec4::select(hf.cmplt(Vec4::splat(4.0)), y, x_or_z);

    let keep_u = (h & IVec4::ONE).as_vec4().cmpeq(Vec4::ZERO);
    let keep_v = (h & IVec4::splat(2)).as_vec4().cmpeq(Vec4::ZERO);
    Vec4::select(keep_u, u, -u) + Vec4::select(keep_v, v, -v)
}
