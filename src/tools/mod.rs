//! Image loading and dataset helpers shared by the decoder, the replay
//! platform and the CLI.

use image::{DynamicImage, GenericImageView};
use std::fs;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

fn downscale(img: DynamicImage, max_dim: Option<u32>) -> DynamicImage {
    match max_dim {
        Some(max_dim) => {
            let (orig_w, orig_h) = img.dimensions();
            if orig_w.max(orig_h) > max_dim {
                img.resize(max_dim, max_dim, image::imageops::FilterType::Triangle)
            } else {
                img
            }
        }
        None => img,
    }
}

fn into_luma(img: DynamicImage) -> (Vec<u8>, usize, usize) {
    let luma = img.to_luma8();
    let (width, height) = luma.dimensions();
    (luma.into_raw(), width as usize, height as usize)
}

/// Decode an encoded image into a luminance plane, shrinking it so its
/// longer side is at most `max_dim`.
pub fn load_luma_from_memory(
    bytes: &[u8],
    max_dim: Option<u32>,
) -> Result<(Vec<u8>, usize, usize), image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    Ok(into_luma(downscale(img, max_dim)))
}

/// Load an image file as a luminance plane along with its dimensions.
pub fn load_luma<P: AsRef<Path>>(
    path: P,
    max_dim: Option<u32>,
) -> Result<(Vec<u8>, usize, usize), image::ImageError> {
    let img = image::open(path)?;
    Ok(into_luma(downscale(img, max_dim)))
}

/// Recursively collect image files under `root`. Unreadable directories are
/// skipped.
pub fn collect_images(root: &Path) -> Vec<PathBuf> {
    let mut stack = vec![root.to_path_buf()];
    let mut images = Vec::new();

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if let Some(ext) = path.extension() {
                let ext = ext.to_string_lossy().to_lowercase();
                if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
                    images.push(path);
                }
            }
        }
    }

    images
}

/// Sorted image paths under `root`, optionally truncated to `limit`
pub fn dataset_iter<P: AsRef<Path>>(
    root: P,
    limit: Option<usize>,
) -> impl Iterator<Item = PathBuf> {
    let mut images = collect_images(root.as_ref());
    images.sort();
    if let Some(limit) = limit {
        images.truncate(limit);
    }
    images.into_iter()
}
