//! Optional configuration file for the CLI.

use anyhow::{Context, Result};
use openapi_dom::Format;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub http: HttpConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("oadom/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// `json` or `yaml`; used when `--format` is not given.
    pub format: Option<String>,
}

impl CliConfig {
    /// Load configuration from file, falling back to defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::info!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let extension = path.extension().and_then(|s| s.to_str());
        let config: CliConfig = if matches!(extension, Some("yaml") | Some("yml")) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {:?}", path))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {:?}", path))?
        };

        tracing::debug!("Loaded configuration from: {:?}", path);
        Ok(config)
    }

    /// The configured default output format, if it names one we can write.
    pub fn output_format(&self) -> Result<Option<Format>> {
        self.output
            .format
            .as_deref()
            .map(|raw| {
                raw.parse::<Format>()
                    .with_context(|| format!("Invalid output format in config: {}", raw))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.http.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn toml_and_yaml_are_both_read() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("oadom.toml");
        std::fs::write(&toml_path, "[http]\ntimeout_secs = 5\n\n[output]\nformat = \"json\"\n").unwrap();
        let config = CliConfig::load(&toml_path).unwrap();
        assert_eq!(config.http.timeout_secs, 5);
        assert!(config.http.user_agent.starts_with("oadom/"));
        assert_eq!(config.output_format().unwrap(), Some(Format::Json));

        let yaml_path = dir.path().join("oadom.yml");
        std::fs::write(&yaml_path, "http:\n  user_agent: test-agent\n").unwrap();
        let config = CliConfig::load(&yaml_path).unwrap();
        assert_eq!(config.http.user_agent, "test-agent");
        assert_eq!(config.output_format().unwrap(), None);
    }

    #[test]
    fn bad_config_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "http = [").unwrap();
        let err = CliConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse TOML config"));
    }
}
