//! Luminance conversion for camera frames
//!
//! Y = 0.299*R + 0.587*G + 0.114*B, computed with integer arithmetic as
//! Y = (76*R + 150*G + 29*B) >> 8.

use rayon::prelude::*;

/// Coefficients for grayscale conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: u32 = 76;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let lum = (COEF_R * r as u32 + COEF_G * g as u32 + COEF_B * b as u32) >> 8;
    lum.min(255) as u8
}

fn convert_row(src: &[u8], dst: &mut [u8], channels: usize) {
    for (px, out) in src.chunks_exact(channels).zip(dst.iter_mut()) {
        *out = luma(px[0], px[1], px[2]);
    }
}

/// Convert packed pixels with `channels` bytes each (3 = RGB, 4 = RGBA)
///
/// Short input leaves the remaining output pixels black.
pub fn to_grayscale(pixels: &[u8], width: usize, height: usize, channels: usize) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];
    if width == 0 {
        return gray;
    }
    for (src, dst) in pixels
        .chunks(width * channels)
        .zip(gray.chunks_mut(width))
    {
        convert_row(src, dst, channels);
    }
    gray
}

/// Same as [`to_grayscale`], processing rows in parallel
pub fn to_grayscale_parallel(
    pixels: &[u8],
    width: usize,
    height: usize,
    channels: usize,
) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];
    if width == 0 {
        return gray;
    }
    gray.par_chunks_mut(width)
        .zip(pixels.par_chunks(width * channels))
        .for_each(|(dst, src)| convert_row(src, dst, channels));
    gray
}

/// Convert RGB image to grayscale
pub fn rgb_to_grayscale(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    to_grayscale(rgb, width, height, 3)
}

/// Convert RGBA image to grayscale (ignores alpha channel)
pub fn rgba_to_grayscale(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    to_grayscale(rgba, width, height, 4)
}
