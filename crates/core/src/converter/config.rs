//! Configuration for the converter module.

use image::Rgb;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the strategy-based converter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Opaque background used when flattening onto a format without alpha,
    /// as `#rrggbb`.
    #[serde(default = "default_background")]
    pub background: String,

    /// Path to the libheif `heif-convert` binary.
    #[serde(default = "default_heif_convert_path")]
    pub heif_convert_path: PathBuf,

    /// Temporary directory for HEIC round-trips through the external tool.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

fn default_background() -> String {
    "#ffffff".to_string()
}

fn default_heif_convert_path() -> PathBuf {
    PathBuf::from("heif-convert")
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("convertfun")
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            background: default_background(),
            heif_convert_path: default_heif_convert_path(),
            temp_dir: default_temp_dir(),
        }
    }
}

impl ConverterConfig {
    /// Sets the background colour.
    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = background.into();
        self
    }

    /// Sets the temp directory.
    pub fn with_temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    /// Parsed background colour, `None` if the configured value is malformed.
    pub fn background_rgb(&self) -> Option<Rgb<u8>> {
        parse_hex_color(&self.background)
    }
}

/// Parses `#rgb` or `#rrggbb` (leading `#` optional).
pub fn parse_hex_color(s: &str) -> Option<Rgb<u8>> {
    let hex = s.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some(Rgb([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        ])),
        3 => {
            let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
            Some(Rgb([expand(0)?, expand(1)?, expand(2)?]))
        }
        _ => None,
    }
}
