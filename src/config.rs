//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.gabarito.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Aggregator settings.
    #[serde(default)]
    pub aggregator: AggregatorConfig,

    /// Extraction settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { verbose: false }
    }
}

/// Gemini model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Gemini API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum retries for timed-out requests. Absent means unlimited,
    /// matching the scripts this tool replaces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Seconds between file-state polls after an upload.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            api_base_url: default_api_base_url(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
            max_retries: None,
            poll_interval_seconds: default_poll_interval(),
        }
    }
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_timeout() -> u64 {
    300 // 5 min; generation over two PDFs can be slow
}

fn default_poll_interval() -> u64 {
    2
}

/// Folder aggregator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Directory names pruned from the walk.
    #[serde(default = "default_ignored_dirs")]
    pub ignored_dirs: Vec<String>,

    /// Per-folder data file name.
    #[serde(default = "default_data_file")]
    pub data_file: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            ignored_dirs: default_ignored_dirs(),
            data_file: default_data_file(),
        }
    }
}

fn default_ignored_dirs() -> Vec<String> {
    crate::aggregator::IGNORED_DIRS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_data_file() -> String {
    crate::aggregator::DATA_FILE.to_string()
}

/// Extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Exam paper file name inside each folder.
    #[serde(default = "default_prova_file")]
    pub prova_file: String,

    /// Answer-key file name inside each folder.
    #[serde(default = "default_gabarito_file")]
    pub gabarito_file: String,

    /// URL prefix the published exam PDFs live under.
    #[serde(default = "default_link_base")]
    pub link_base: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            prova_file: default_prova_file(),
            gabarito_file: default_gabarito_file(),
            link_base: default_link_base(),
        }
    }
}

fn default_prova_file() -> String {
    "prova.pdf".to_string()
}

fn default_gabarito_file() -> String {
    "gabarito.pdf".to_string()
}

fn default_link_base() -> String {
    "https://raw.githubusercontent.com/cirillom/gabarito-digital-data/refs/heads/main".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".gabarito.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings; only
    /// explicitly provided values override.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if args.verbose {
            self.general.verbose = true;
        }

        if let crate::cli::Command::Extract(ref extract) = args.command {
            if let Some(ref model) = extract.model {
                self.model.name = model.clone();
            }
            if let Some(timeout) = extract.timeout {
                self.model.timeout_seconds = timeout;
            }
            if let Some(max_retries) = extract.max_retries {
                self.model.max_retries = Some(max_retries);
            }
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Args, Command, ExtractArgs};
    use std::path::PathBuf;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.name, "gemini-2.5-flash");
        assert_eq!(config.model.timeout_seconds, 300);
        assert!(config.model.max_retries.is_none());
        assert_eq!(config.aggregator.data_file, "data.json");
        assert!(config
            .aggregator
            .ignored_dirs
            .contains(&"__pycache__".to_string()));
        assert_eq!(config.extraction.prova_file, "prova.pdf");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true

[model]
name = "gemini-2.5-pro"
timeout_seconds = 600
max_retries = 5

[aggregator]
ignored_dirs = [".venv"]

[extraction]
gabarito_file = "answers.pdf"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.model.name, "gemini-2.5-pro");
        assert_eq!(config.model.timeout_seconds, 600);
        assert_eq!(config.model.max_retries, Some(5));
        assert_eq!(config.aggregator.ignored_dirs, vec![".venv"]);
        assert_eq!(config.extraction.gabarito_file, "answers.pdf");
        // Unspecified fields keep their defaults.
        assert_eq!(config.extraction.prova_file, "prova.pdf");
        assert_eq!(config.aggregator.data_file, "data.json");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[model]"));
        assert!(toml_str.contains("[aggregator]"));
        assert!(toml_str.contains("[extraction]"));
        // Must itself be loadable.
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model.name, "gemini-2.5-flash");
    }

    #[test]
    fn test_merge_with_extract_args() {
        let mut config = Config::default();
        let args = Args {
            command: Command::Extract(ExtractArgs {
                directory: PathBuf::from("fuvest/2024/1a Fase"),
                model: Some("gemini-2.5-pro".to_string()),
                timeout: Some(900),
                max_retries: Some(3),
                api_key: "test-key".to_string(),
            }),
            config: None,
            verbose: true,
            quiet: false,
        };

        config.merge_with_args(&args);
        assert_eq!(config.model.name, "gemini-2.5-pro");
        assert_eq!(config.model.timeout_seconds, 900);
        assert_eq!(config.model.max_retries, Some(3));
        assert!(config.general.verbose);
    }

    #[test]
    fn test_merge_keeps_config_when_args_omit_values() {
        let mut config = Config::default();
        config.model.max_retries = Some(7);

        let args = Args {
            command: Command::Extract(ExtractArgs {
                directory: PathBuf::from("fuvest/2024/1a Fase"),
                model: None,
                timeout: None,
                max_retries: None,
                api_key: "test-key".to_string(),
            }),
            config: None,
            verbose: false,
            quiet: false,
        };

        config.merge_with_args(&args);
        assert_eq!(config.model.name, "gemini-2.5-flash");
        assert_eq!(config.model.max_retries, Some(7));
    }
}
