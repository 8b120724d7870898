//! Utility functions for frame handling
//!
//! - Grayscale conversion (RGB/RGBA to luminance, serial and rayon-parallel)

pub mod grayscale;
