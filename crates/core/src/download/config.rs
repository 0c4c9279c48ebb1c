//! Configuration for artifact retrieval.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where retrieved artifacts are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving converted files. Created on first write.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Replace an existing file of the same name instead of picking
    /// `name (1).ext`, `name (2).ext` and so on.
    #[serde(default)]
    pub overwrite: bool,
}

fn default_directory() -> PathBuf {
    PathBuf::from("converted")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            overwrite: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OutputConfig::default();
        assert_eq!(config.directory, PathBuf::from("converted"));
        assert!(!config.overwrite);
    }

    #[test]
    fn test_deserialize() {
        let config: OutputConfig = toml::from_str("overwrite = true").unwrap();
        assert!(config.overwrite);
        assert_eq!(config.directory, PathBuf::from("converted"));
    }
}
