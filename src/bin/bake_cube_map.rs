//! Bakes the six cube-map faces of a planet into PPM images, plus greyscale
//! cloud faces when the config has a cloud layer.
//!
//! Usage: `bake_cube_map [config.json] [out_dir] [size]`

use std::error::Error;
use std::{env, fs, path::PathBuf};

use sphere_terrain::terrain::{generate_cloud_map, generate_cube_map, PixelFormat, TerrainConfig, TerrainTypeSelector, TextureContent};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let config = match args.next() {
        Some(path) if path != "-" => TerrainConfig::from_json(&fs::read_to_string(&path)?)?,
        _ => TerrainConfig::default(),
    };
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| "cube_map".to_string()));
    let size: usize = match args.next() {
        Some(size) => size.parse()?,
        None => 256,
    };

    let generator = config.build_generator()?;
    let selector = TerrainTypeSelector::earth_like();
    log::info!("baking {}x{} faces into {}", size, size, out_dir.display());

    let cube_map = generate_cube_map(&generator, TextureContent::TerrainColour(&selector), size, PixelFormat::Rgb8)?;

    fs::create_dir_all(&out_dir)?;
    for (face, pixels) in &cube_map.faces {
        let mut ppm = format!("P6\n{} {}\n255\n", size, size).into_bytes();
        ppm.extend_from_slice(pixels);

        let filename = out_dir.join(format!("{}.ppm", face.name()));
        fs::write(&filename, ppm)?;
        log::info!("wrote {}", filename.display());
    }

    if let Some(clouds) = config.build_clouds()? {
        let cloud_map = generate_cloud_map(&clouds, size, PixelFormat::Rgb8)?;
        for (face, pixels) in &cloud_map.faces {
            let mut pgm = format!("P5\n{} {}\n255\n", size, size).into_bytes();
            pgm.extend(pixels.iter().step_by(3));

            let filename = out_dir.join(format!("clouds_{}.pgm", face.name()));
            fs::write(&filename, pgm)?;
            log::info!("wrote {}", filename.display());
        }
    }

    let heights = generate_cube_map(&generator, TextureContent::Noise, size, PixelFormat::Rgb8)?;
    for (face, pixels) in &heights.faces {
        let grey: Vec<u8> = pixels.iter().step_by(3).copied().collect();
        let min = grey.iter().min().copied().unwrap_or(0);
        let max = grey.iter().max().copied().unwrap_or(0);
        let avg = grey.iter().map(|&g| g as f32).sum::<f32>() / grey.len().max(1) as f32;
        println!("{:>6}: height min {:3} max {:3} avg {:.1}", face.name(), min, max, avg);
    }

    Ok(())
}
