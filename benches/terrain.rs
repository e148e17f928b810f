use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::{Vec3, Vec4};
use sphere_terrain::terrain::{
    BandedSumFractal, CloudConfig, CloudLayer, CubeMapFace, FractalConfig, HeightFunction, Lanes3, NoiseKernel, PatchGrid, PixelBuffer,
    PixelFormat, RidgedFractal, TerrainConfig, TerrainVertex, TextureContent,
};

fn sample_batches(n: usize) -> Vec<Lanes3> {
    (0..n)
        .map(|i| {
            let t = i as f32 * 0.013;
            Lanes3::strided(Vec3::new(t.sin(), t.cos(), t * 0.5), Vec3::splat(0.01))
        })
        .collect()
}

fn bench_noise(c: &mut Criterion) {
    let mut group = c.benchmark_group("Noise Kernel");
    let kernel = NoiseKernel::new(42);
    let batches = sample_batches(1024);

    group.bench_function("evaluate_4096_points", |b| {
        b.iter(|| {
            let mut acc = Vec4::ZERO;
            for batch in &batches {
                acc += kernel.evaluate_lanes(batch);
            }
            black_box(acc)
        });
    });

    group.finish();
}

fn bench_fractals(c: &mut Criterion) {
    let mut group = c.benchmark_group("Fractals");
    let batches = sample_batches(256);

    for &octaves in &[4, 8] {
        let banded = BandedSumFractal::new(FractalConfig { octaves, ..FractalConfig::banded().with_seed(1) }).unwrap();
        group.bench_function(format!("banded_sum_{}_octaves", octaves), |b| {
            b.iter(|| batches.iter().map(|p| banded.value(p)).fold(Vec4::ZERO, |a, v| a + v));
        });

        let ridged = RidgedFractal::new(FractalConfig { octaves, ..FractalConfig::ridged().with_seed(1) }).unwrap();
        group.bench_function(format!("ridged_{}_octaves", octaves), |b| {
            b.iter(|| batches.iter().map(|p| ridged.value(p)).fold(Vec4::ZERO, |a, v| a + v));
        });
    }

    group.finish();
}

fn bench_patches(c: &mut Criterion) {
    let mut group = c.benchmark_group("Patch Generation");
    let mut generator = TerrainConfig::mountainous_planet(7).build_generator().unwrap();

    for &size in &[17, 33, 65] {
        let step = 0.5 / (size - 1) as f32;
        let grid = PatchGrid::new(Vec3::new(-0.25, 1.0, -0.25), Vec3::X * step, Vec3::Z * step, size, size);
        let mut vertices = vec![TerrainVertex::default(); grid.vertex_count()];

        group.bench_function(format!("vertices_{}x{}", size, size), |b| {
            b.iter(|| generator.generate_vertices(&grid, &mut vertices).unwrap());
        });
        group.bench_function(format!("vertices_with_error_{}x{}", size, size), |b| {
            b.iter(|| black_box(generator.generate_vertices_with_error(&grid, &mut vertices).unwrap()));
        });
    }

    for &size in &[64, 256] {
        let mut pixels = vec![0u8; size * size * 4];
        group.bench_function(format!("cube_face_{}", size), |b| {
            b.iter(|| {
                let mut buffer = PixelBuffer::new(size, size, PixelFormat::Rgba8, &mut pixels);
                generator
                    .generate_cube_map_face(CubeMapFace::PositiveZ, TextureContent::TerrainProperties, &mut buffer)
                    .unwrap();
            });
        });
    }

    group.finish();
}

fn bench_clouds(c: &mut Criterion) {
    let mut group = c.benchmark_group("Clouds");
    let layer = CloudLayer::new(CloudConfig::default()).unwrap();

    for &size in &[64, 256] {
        let mut pixels = vec![0u8; size * size * 4];
        group.bench_function(format!("cloud_face_{}", size), |b| {
            b.iter(|| {
                let mut buffer = PixelBuffer::new(size, size, PixelFormat::Rgba8, &mut pixels);
                layer.generate_face(CubeMapFace::PositiveY, &mut buffer).unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_noise, bench_fractals, bench_patches, bench_clouds);
criterion_main!(benches);
