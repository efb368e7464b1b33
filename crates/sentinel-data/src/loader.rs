//! Image loading and satellite/mask pair discovery.
//!
//! A dataset root holds two folders, one with satellite tiles and one with
//! masks. Pairs are matched by file stem: `satellite/tile_07.png` pairs with
//! `mask/tile_07.png` (or any other supported extension).

use image::imageops::FilterType;
use image::ImageReader;
use sentinel_core::{Error, ImageShape, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "tif", "tiff"];

/// A satellite tile and its mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplePair {
    pub satellite: PathBuf,
    pub mask: PathBuf,
}

/// Finds every satellite image with a mask of the same stem.
///
/// Satellite images without a mask are skipped with a warning. Pairs are
/// returned sorted by satellite path.
pub fn scan_pairs(root: &Path, satellite_dir: &str, mask_dir: &str) -> Result<Vec<SamplePair>> {
    let satellite_root = root.join(satellite_dir);
    let mask_root = root.join(mask_dir);

    let satellites = list_images(&satellite_root)?;
    let (masks, duplicates) = index_by_stem(list_images(&mask_root)?);
    for duplicate in &duplicates {
        warn!(
            "Mask {} shares its stem with another mask, skipping",
            duplicate.display()
        );
    }

    let mut pairs = Vec::with_capacity(satellites.len());
    for satellite in satellites {
        let Some(key) = stem(&satellite) else {
            continue;
        };
        match masks.get(&key) {
            Some(mask) => pairs.push(SamplePair {
                satellite,
                mask: mask.clone(),
            }),
            None => warn!("No mask for satellite image {}, skipping", satellite.display()),
        }
    }

    debug!(
        "Found {} satellite/mask pairs under {}",
        pairs.len(),
        root.display()
    );
    Ok(pairs)
}

/// Maps file stems to paths, keeping the first path of each stem.
///
/// Later paths with an already seen stem are returned as duplicates.
fn index_by_stem(paths: Vec<PathBuf>) -> (HashMap<String, PathBuf>, Vec<PathBuf>) {
    let mut index = HashMap::with_capacity(paths.len());
    let mut duplicates = Vec::new();
    for path in paths {
        let Some(key) = stem(&path) else {
            continue;
        };
        if index.contains_key(&key) {
            duplicates.push(path);
        } else {
            index.insert(key, path);
        }
    }
    (index, duplicates)
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(Error::NotFound(format!("Directory not found: {}", dir.display())));
    }
    if !dir.is_dir() {
        return Err(Error::InvalidArgument(format!(
            "Path is not a directory: {}",
            dir.display()
        )));
    }

    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image(&path) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn stem(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().to_string())
}

/// Loads an image resized to `shape`, as CHW floats in [0, 1].
///
/// One-channel shapes load as grayscale, three-channel shapes as RGB.
pub fn load_image_chw(path: &Path, shape: ImageShape) -> Result<Vec<f32>> {
    let img = ImageReader::open(path)?.decode()?.resize_exact(
        shape.width as u32,
        shape.height as u32,
        FilterType::Triangle,
    );

    let (height, width) = (shape.height, shape.width);
    let plane = height * width;
    let mut data = vec![0.0f32; shape.num_elements()];

    match shape.channels {
        1 => {
            let gray = img.to_luma8();
            for (x, y, pixel) in gray.enumerate_pixels() {
                data[y as usize * width + x as usize] = pixel[0] as f32 / 255.0;
            }
        }
        3 => {
            let rgb = img.to_rgb8();
            for (x, y, pixel) in rgb.enumerate_pixels() {
                let offset = y as usize * width + x as usize;
                for c in 0..3 {
                    data[c * plane + offset] = pixel[c] as f32 / 255.0;
                }
            }
        }
        other => {
            return Err(Error::InvalidArgument(format!(
                "Unsupported channel count {other} for {}",
                path.display()
            )))
        }
    }

    Ok(data)
}
