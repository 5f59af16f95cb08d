//! Per-session stream configuration.
//!
//! Every knob is an explicit value handed to the session at
//! construction — nothing here is global or persisted beyond the
//! TOML file the caller chooses to load.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::frame::MAX_FRAME_SIZE;

/// Encoder and transport parameters for one streaming session.
///
/// `width`/`height`/`bit_rate`/`frame_rate`/`i_frame_interval`
/// describe the video the caller's codec capability should produce;
/// `max_frame_size` bounds what the transport will carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Capture width in pixels.
    pub width: u32,
    /// Capture height in pixels.
    pub height: u32,
    /// Target encoder bit rate in bits/second.
    pub bit_rate: u32,
    /// Target frames per second.
    pub frame_rate: u8,
    /// Key-frame interval in seconds.
    pub i_frame_interval: u8,
    /// Upper bound for a single coded frame payload, in bytes.
    pub max_frame_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            width: 720,
            height: 1280,
            bit_rate: 2_000_000,
            frame_rate: 30,
            i_frame_interval: 2,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

impl StreamConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let cfg = Self::default();
        let text = toml::to_string_pretty(&cfg).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = StreamConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("bit_rate"));
        assert!(text.contains("max_frame_size"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = StreamConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: StreamConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.frame_rate, 30);
        assert_eq!(parsed.max_frame_size, 2 * 1024 * 1024);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: StreamConfig = toml::from_str("bit_rate = 8000000").unwrap();
        assert_eq!(parsed.bit_rate, 8_000_000);
        assert_eq!(parsed.width, 720);
        assert_eq!(parsed.height, 1280);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = StreamConfig::load(Path::new("/nonexistent/screenlink.toml"));
        assert_eq!(cfg, StreamConfig::default());
    }
}
