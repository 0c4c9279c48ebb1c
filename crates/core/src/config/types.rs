use serde::{Deserialize, Serialize};

use crate::converter::ConverterConfig;
use crate::download::OutputConfig;
use crate::orchestrator::OrchestratorConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::IdentityScheme;
    use crate::planner::BatchPolicy;
    use std::path::PathBuf;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.converter.background, "#ffffff");
        assert_eq!(config.orchestrator.batch_policy, BatchPolicy::Union);
        assert_eq!(config.output.directory, PathBuf::from("converted"));
    }

    #[test]
    fn test_full_config() {
        let toml = r##"
[converter]
background = "#000000"
heif_convert_path = "/usr/local/bin/heif-convert"

[orchestrator]
batch_policy = "intersection"
identity_scheme = "content_hash"

[output]
directory = "/tmp/out"
overwrite = true
"##;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.converter.background, "#000000");
        assert_eq!(
            config.converter.heif_convert_path,
            PathBuf::from("/usr/local/bin/heif-convert")
        );
        assert_eq!(
            config.orchestrator.identity_scheme,
            IdentityScheme::ContentHash
        );
        assert!(config.output.overwrite);
    }
}
