//! Environment-driven configuration
//!
//! Values that are missing or fail to parse fall back to their defaults.

use std::time::Duration;

/// Default image service used by [`crate::generator::HttpCodeEncoder`]
pub const DEFAULT_ENCODER_URL: &str = "https://api.qrserver.com/v1/create-qr-code/";

fn parse_env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

fn parse_env_string(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_owned())
}

/// Runtime settings for scanning and code generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Downscale static images whose longer side exceeds this (`None` = never)
    pub max_dim: Option<u32>,
    /// Pause between live decode ticks
    pub tick_interval: Duration,
    /// Frames with at least this many pixels are converted to grayscale in parallel
    pub parallel_gray_min_pixels: usize,
    /// Image service endpoint for generated codes
    pub encoder_url: String,
    /// Edge length of generated code images in pixels
    pub code_size: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_dim: Some(1600),
            tick_interval: Duration::ZERO,
            parallel_gray_min_pixels: 1_000_000,
            encoder_url: DEFAULT_ENCODER_URL.to_owned(),
            code_size: 200,
        }
    }
}

impl ScanConfig {
    /// Read `QR_MAX_DIM`, `QR_TICK_INTERVAL_MS`, `QR_PARALLEL_GRAY_MIN`,
    /// `QR_ENCODER_URL` and `QR_CODE_SIZE` on top of the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_dim = match parse_env_u32("QR_MAX_DIM", defaults.max_dim.unwrap_or(0)) {
            0 => None,
            v => Some(v),
        };
        Self {
            max_dim,
            tick_interval: Duration::from_millis(parse_env_u64("QR_TICK_INTERVAL_MS", 0)),
            parallel_gray_min_pixels: parse_env_usize(
                "QR_PARALLEL_GRAY_MIN",
                defaults.parallel_gray_min_pixels,
            ),
            encoder_url: parse_env_string("QR_ENCODER_URL", &defaults.encoder_url),
            code_size: parse_env_u32("QR_CODE_SIZE", defaults.code_size).clamp(32, 2000),
        }
    }

    /// Builder-style override for the downscale limit
    pub fn with_max_dim(mut self, max_dim: Option<u32>) -> Self {
        self.max_dim = max_dim;
        self
    }

    /// Builder-style override for the tick interval
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.max_dim, Some(1600));
        assert_eq!(config.tick_interval, Duration::ZERO);
        assert_eq!(config.code_size, 200);
        assert_eq!(config.encoder_url, DEFAULT_ENCODER_URL);
    }

    #[test]
    fn unset_variables_fall_back() {
        assert_eq!(parse_env_u64("ROAST_SCAN_TEST_UNSET_U64", 7), 7);
        assert_eq!(parse_env_string("ROAST_SCAN_TEST_UNSET_STR", "x"), "x");
    }
}
