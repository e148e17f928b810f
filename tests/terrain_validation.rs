// End-to-end checks of the terrain pipeline through the public API
use glam::{Vec3, Vec4};
use sphere_terrain::terrain::{
    generate_cloud_map, generate_cube_map, CloudConfig, CloudLayer, patch_error, BandedSumFractal, CubeMapFace, DisplacerParameters, Displace,
    DistributionBuilder, FlatDisplacer, FractalConfig, FunctionDisplacer, Geometry, HeightFunction, LatitudeBand,
    Lanes3, NoiseKernel, PatchGrid, PixelBuffer, PixelFormat, RidgedFractal, TerrainConfig, TerrainPatchGenerator,
    TerrainTypeSelector, TerrainVertex, TextureContent,
};

#[test]
fn test_banded_sum_at_origin() {
    println!("\n=== Testing BandedSumFractal at Origin ===");

    let config = FractalConfig::new(0, 1.0, 2, 0.5, 2.0);
    let fractal = BandedSumFractal::new(config).unwrap();

    let values = fractal.value(&Lanes3::splat(Vec3::ZERO)).to_array();
    println!("Values at origin: {:?}", values);

    for (lane, &v) in values.iter().enumerate() {
        assert!((0.0..=1.0).contains(&v), "Lane {} value {} out of range [0, 1]", lane, v);
        assert_eq!(v, values[0], "Lane {} differs from lane 0", lane);
    }

    println!("✓ BandedSumFractal origin test passed");
}

#[test]
fn test_lane_determinism() {
    println!("\n=== Testing Lane Determinism ===");

    let kernel = NoiseKernel::new(1234);
    let points = [
        Vec3::new(0.3, -1.7, 2.2),
        Vec3::new(-5.25, 0.5, 0.125),
        Vec3::new(10.1, 3.3, -7.9),
        Vec3::new(0.0, 0.0, 0.77),
    ];

    let forward = kernel.evaluate_points(points);
    let mut reversed_points = points;
    reversed_points.reverse();
    let mut reversed = kernel.evaluate_points(reversed_points);
    reversed.reverse();

    for i in 0..4 {
        println!("Point {:?}: {}", points[i], forward[i]);
        assert_eq!(forward[i], reversed[i], "Point {} depends on its lane", i);
        assert_eq!(forward[i], kernel.sample(points[i]), "Batch and single sample disagree");
    }

    println!("✓ Lane determinism test passed");
}

#[test]
fn test_fractal_ranges() {
    println!("\n=== Testing Fractal Output Ranges ===");

    let banded = BandedSumFractal::new(FractalConfig::banded().with_seed(3)).unwrap();
    let ridged = RidgedFractal::new(FractalConfig::ridged().with_seed(3)).unwrap();

    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for i in 0..2000 {
        let t = i as f32 * 0.037;
        let points = Lanes3::strided(Vec3::new(t.sin() * 3.0, t.cos() * 2.0, t * 0.1), Vec3::splat(0.11));
        for v in banded.value(&points).to_array().into_iter().chain(ridged.value(&points).to_array()) {
            assert!((0.0..=1.0).contains(&v), "Fractal value {} out of range [0, 1]", v);
            min = min.min(v);
            max = max.max(v);
        }
    }

    println!("Observed range: [{:.4}, {:.4}]", min, max);
    assert!(max > min, "Fractals produced a constant field");

    println!("✓ Fractal range test passed");
}

#[test]
fn test_height_range_endpoints() {
    println!("\n=== Testing Height Range Endpoints ===");

    let parameters = DisplacerParameters::new(1.0, 0.97, 1.0, 1.03, 1.0);
    let mapped = parameters.map_to_height_range(Vec4::new(0.0, 1.0, 0.0, 1.0)).to_array();
    println!("Mapped endpoints: {:?}", mapped);

    assert_eq!(mapped[0], 0.97);
    assert_eq!(mapped[1], 1.03);

    println!("✓ Height range endpoint test passed");
}

#[test]
fn test_flat_sphere_patch() {
    println!("\n=== Testing Flat Sphere Patch ===");

    let mut displacer = FlatDisplacer::new(Geometry::Sphere);
    displacer.setup(DisplacerParameters::new(1.0, 2.0, 2.0, 2.0, 1.0)).unwrap();
    let mut generator = TerrainPatchGenerator::new(displacer);
    generator.set_smallest_step_size(0.01, 0.01).unwrap();

    let grid = PatchGrid::new(Vec3::new(-1.0, 1.0, -1.0), Vec3::X, Vec3::Z, 3, 3);
    let mut vertices = vec![TerrainVertex::default(); grid.vertex_count()];
    generator.generate_vertices(&grid, &mut vertices).unwrap();

    for (i, vertex) in vertices.iter().enumerate() {
        let radius = Vec3::from(vertex.position).length();
        println!("Vertex {}: radius {:.6}, slope {:.6}", i, radius, vertex.slope);
        assert!((radius - 2.0).abs() < 1e-5, "Vertex {} radius {} should be 2", i, radius);
        assert!(vertex.slope < 1e-3, "Vertex {} slope {} should be near 0", i, vertex.slope);
    }

    println!("✓ Flat sphere patch test passed");
}

#[test]
fn test_flat_noise_face_is_white() {
    println!("\n=== Testing Flat Noise Face ===");

    let mut displacer = FlatDisplacer::new(Geometry::Sphere);
    displacer.setup(DisplacerParameters::new(1.0, 1.0, 1.0, 1.0, 1.0)).unwrap();
    let mut generator = TerrainPatchGenerator::new(displacer);

    let mut pixels = vec![0u8; 64 * 64 * 4];
    let mut buffer = PixelBuffer::new(64, 64, PixelFormat::Rgba8, &mut pixels);
    generator
        .generate_cube_map_face(CubeMapFace::PositiveY, TextureContent::Noise, &mut buffer)
        .unwrap();

    let non_white = pixels.iter().filter(|&&b| b != 255).count();
    println!("Non-white bytes: {}", non_white);
    assert_eq!(non_white, 0, "Every byte of a flat noise face should be 255");

    println!("✓ Flat noise face test passed");
}

#[test]
fn test_ridged_lod_error_shrinks_with_resolution() {
    println!("\n=== Testing Ridged LOD Error ===");

    let function = RidgedFractal::new(FractalConfig::ridged().with_seed(11)).unwrap();
    let mut displacer = FunctionDisplacer::new(Geometry::Sphere, function);
    displacer.setup(DisplacerParameters::default()).unwrap();

    let origin = Vec3::new(-0.5, 1.0, -0.5);
    let coarse = patch_error(&displacer, origin, Vec3::X * 0.25, Vec3::Z * 0.25, 5, 5).unwrap();
    let fine = patch_error(&displacer, origin, Vec3::X * 0.03125, Vec3::Z * 0.03125, 33, 33).unwrap();

    println!("Coarse error: {:.6}", coarse);
    println!("Fine error:   {:.6}", fine);
    assert!(fine >= 0.0);
    assert!(coarse >= fine, "Coarse error {} should not be below fine error {}", coarse, fine);

    println!("✓ Ridged LOD error test passed");
}

/// Smooth bowl over x in [0, 1]
struct Bowl;

impl HeightFunction for Bowl {
    fn value(&self, points: &Lanes3) -> Vec4 {
        points.x * points.x * 0.5
    }
}

#[test]
fn test_lod_error_is_monotonic() {
    println!("\n=== Testing LOD Error Monotonicity ===");

    let mut displacer = FunctionDisplacer::new(Geometry::Plane, Bowl);
    displacer.setup(DisplacerParameters::new(1.0, 0.0, 0.0, 1.0, 1.0)).unwrap();

    let mut previous = f32::INFINITY;
    for n in [3usize, 5, 9, 17, 33] {
        let step = 1.0 / (n - 1) as f32;
        let error = patch_error(&displacer, Vec3::ZERO, Vec3::X * step, Vec3::Z * step, n, n).unwrap();
        println!("{:2}x{:2}: error {:.8}", n, n, error);
        assert!(error <= previous, "Error {} at {} samples exceeds coarser error {}", error, n, previous);
        previous = error;
    }

    println!("✓ LOD monotonicity test passed");
}

#[test]
fn test_single_type_colour() {
    println!("\n=== Testing Single Type Colour ===");

    let mut selector = TerrainTypeSelector::new();
    selector.add_type("moss", [50, 120, 70]);
    let one = DistributionBuilder::constant(1.0);
    selector.add_latitude_band(LatitudeBand::new(Vec::new()).with(&one, &one)).unwrap();

    for &(latitude, altitude, slope) in &[(0.0, 0.0, 0.0), (0.5, 0.3, 0.9), (1.0, 1.0, 1.0)] {
        let colour = selector.colour(latitude, altitude, slope, 1.0);
        assert_eq!(colour, [50, 120, 70], "Blend at ({}, {}, {})", latitude, altitude, slope);
    }

    println!("✓ Single type colour test passed");
}

#[test]
fn test_bake_configured_planet() {
    println!("\n=== Testing Cube Map Bake ===");

    let json = TerrainConfig::mountainous_planet(5).to_json().unwrap();
    let config = TerrainConfig::from_json(&json).unwrap();
    let generator = config.build_generator().unwrap();
    let selector = TerrainTypeSelector::earth_like();

    let cube_map = generate_cube_map(&generator, TextureContent::TerrainColour(&selector), 16, PixelFormat::Rgb8).unwrap();

    assert_eq!(cube_map.faces.len(), 6);
    for face in CubeMapFace::ALL {
        let pixels = cube_map.face(face).unwrap();
        assert_eq!(pixels.len(), 16 * 16 * 3, "Face {} has the wrong size", face.name());
        println!("{}: first pixel {:?}", face.name(), &pixels[..3]);
    }

    println!("✓ Cube map bake test passed");
}

#[test]
fn test_cloud_cover_faces() {
    println!("\n=== Testing Cloud Cover ===");

    let config = CloudConfig {
        cutoff: 0.2,
        border: 0.5,
        ..Default::default()
    };
    let layer = CloudLayer::new(config).unwrap();
    let cloud_map = generate_cloud_map(&layer, 16, PixelFormat::Rgba8).unwrap();

    let mut covered = 0;
    for (face, pixels) in &cloud_map.faces {
        for pixel in pixels.chunks_exact(4) {
            if pixel[3] == 255 {
                covered += 1;
            }
            if pixel[0] == 0 {
                assert_eq!(pixel[3], 0, "{} has an opaque clear pixel", face.name());
            }
        }
    }
    println!("Opaque pixels: {} of {}", covered, 6 * 16 * 16);

    println!("✓ Cloud cover test passed");
}

#[test]
fn test_selector_json_validation() {
    println!("\n=== Testing Selector JSON ===");

    let selector = TerrainTypeSelector::earth_like();
    let json = serde_json::to_string(&selector).unwrap();
    let loaded: TerrainTypeSelector = serde_json::from_str(&json).unwrap();
    assert_eq!(loaded.colour(0.5, 0.3, 0.1, 1.0), selector.colour(0.5, 0.3, 0.1, 1.0));

    let short = r#"{"types":[{"name":"a","colour":[1,2,3]}],
        "bands":[{"distributions":[{"altitude":[1.0],"slope":[1.0]}]}]}"#;
    let result = serde_json::from_str::<TerrainTypeSelector>(short);
    println!("Short curve result: {:?}", result.as_ref().err());
    assert!(result.is_err(), "Short distribution curves should be rejected");

    println!("✓ Selector JSON test passed");
}
