//! Configuration management for partnerscraper
//!
//! Configuration is loaded from `./config/partnerscraper.toml` (or `--config`).
//! The compiled-in template is what `--init` writes.

use crate::adapters::{AdapterOptions, SourceId};
use crate::export::OutputFormat;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/partnerscraper.toml";

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = include_str!("../config/partnerscraper.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid URL in '{field}': {url}")]
    InvalidUrl { field: String, url: String },

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub sources: BTreeMap<SourceId, SourceConfig>,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
    /// Forces one format for every source when set
    #[serde(default)]
    pub format: Option<OutputFormat>,
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("data")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            format: None,
        }
    }
}

/// One source's endpoint, output file and transport decoration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub url: String,
    pub output_file: String,
    /// Base that bare logo/file references are joined onto
    #[serde(default)]
    pub asset_base: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
    /// Label token that starts an address line (card sources)
    #[serde(default)]
    pub address_label: Option<String>,
    /// Label token that starts a phone line (card sources)
    #[serde(default)]
    pub phone_label: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl SourceConfig {
    pub fn adapter_options(&self) -> AdapterOptions {
        AdapterOptions {
            asset_base: self.asset_base.clone(),
            address_label: self.address_label.clone(),
            phone_label: self.phone_label.clone(),
        }
    }

    /// Format implied by the output file extension; CSV when unrecognised
    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_path(Path::new(&self.output_file)).unwrap_or(OutputFormat::Csv)
    }
}

impl AppConfig {
    /// Load configuration from the default path
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(Path::new(CONFIG_PATH))
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.user_agent.trim().is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "http.user_agent".to_string(),
            });
        }
        if self.http.request_timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "http.request_timeout_secs".to_string(),
            });
        }

        for (source, cfg) in &self.sources {
            if !(cfg.url.starts_with("https://") || cfg.url.starts_with("http://")) {
                return Err(ConfigError::InvalidUrl {
                    field: format!("sources.{}.url", source),
                    url: cfg.url.clone(),
                });
            }
            if let Some(base) = &cfg.asset_base {
                if !(base.starts_with("https://") || base.starts_with("http://")) {
                    return Err(ConfigError::InvalidUrl {
                        field: format!("sources.{}.asset_base", source),
                        url: base.clone(),
                    });
                }
            }
            if cfg.output_file.trim().is_empty() {
                return Err(ConfigError::EmptyRequired {
                    field: format!("sources.{}.output_file", source),
                });
            }
        }

        Ok(())
    }

    pub fn source(&self, source: SourceId) -> Option<&SourceConfig> {
        self.sources.get(&source)
    }

    /// Enabled sources in their declared order
    pub fn enabled_sources(&self) -> Vec<SourceId> {
        SourceId::ALL
            .into_iter()
            .filter(|s| self.source(*s).is_some_and(|cfg| cfg.enabled))
            .collect()
    }

    /// Create default configuration file at `path`
    pub fn create_default_config(path: &Path) -> Result<PathBuf, ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_CONFIG)?;
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses_and_validates() {
        let config = AppConfig::from_toml(DEFAULT_CONFIG);
        assert!(config.is_ok(), "Default config should parse: {:?}", config.err());
    }

    #[test]
    fn test_default_config_declares_every_source() {
        let config = AppConfig::from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.enabled_sources(), SourceId::ALL.to_vec());

        let birbank = config.source(SourceId::BirBank).unwrap();
        assert_eq!(birbank.asset_base.as_deref(), Some("https://ipoteka.birbank.az/api/files/"));
        assert_eq!(birbank.output_format(), OutputFormat::Csv);
        assert_eq!(
            config.source(SourceId::StarterStory).unwrap().output_format(),
            OutputFormat::Json
        );
        assert_eq!(
            config.source(SourceId::XalqBank).unwrap().address_label.as_deref(),
            Some("Ünvan:")
        );
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config_str = r#"
[http]
user_agent = "test/1.0"
request_timeout_secs = 5

[sources.birbank]
url = "http://127.0.0.1:9999/api/partners"
output_file = "birbank.csv"
"#;
        let config = AppConfig::from_toml(config_str).expect("Config should parse");
        assert_eq!(config.output.directory, PathBuf::from("data"));
        assert!(config.output.format.is_none());
        let birbank = config.source(SourceId::BirBank).unwrap();
        assert!(birbank.enabled);
        assert!(birbank.headers.is_empty());
        assert_eq!(config.enabled_sources(), vec![SourceId::BirBank]);
    }

    #[test]
    fn test_rejects_bad_url_and_empty_user_agent() {
        let bad_url = r#"
[http]
user_agent = "test/1.0"
request_timeout_secs = 5

[sources.xalqbank]
url = "ftp://example.com"
output_file = "x.csv"
"#;
        assert!(matches!(
            AppConfig::from_toml(bad_url),
            Err(ConfigError::InvalidUrl { .. })
        ));

        let no_agent = "[http]\nuser_agent = \"\"\nrequest_timeout_secs = 5\n";
        assert!(matches!(
            AppConfig::from_toml(no_agent),
            Err(ConfigError::EmptyRequired { .. })
        ));
    }

    #[test]
    fn test_rejects_relative_asset_base() {
        let config_str = r#"
[http]
user_agent = "test/1.0"
request_timeout_secs = 5

[sources.birbank]
url = "https://example.com/api"
output_file = "birbank.csv"
asset_base = "api/files/"
"#;
        assert!(matches!(
            AppConfig::from_toml(config_str),
            Err(ConfigError::InvalidUrl { field, .. }) if field == "sources.birbank.asset_base"
        ));
    }

    #[test]
    fn test_unknown_source_is_a_parse_error() {
        let config_str = r#"
[http]
user_agent = "test/1.0"
request_timeout_secs = 5

[sources.nosuchbank]
url = "https://example.com"
output_file = "x.csv"
"#;
        assert!(matches!(
            AppConfig::from_toml(config_str),
            Err(ConfigError::ParseError(_))
        ));
    }
}
