//! Configuration management for the CLI.
//!
//! One `splfacts.toml` holds the CLI settings and the library configs:
//!
//! ```toml
//! [settings]
//! format = "table"
//! vocabulary = "/data/mdr.jsonl"
//!
//! [worker]
//! pool_size = 8
//!
//! [lexicon]
//! negation_window = 80
//! ```
//!
//! The file is layered over the built-in defaults; command-line flags are
//! applied last.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use splfacts_dictionary::DictionaryConfig;
use splfacts_matcher::MatchLexicon;
use splfacts_registry::IdStarts;
use splfacts_worker::WorkerConfig;

use crate::cli::{Cli, CliFormat};
use crate::error::{CliError, Result};

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// Dictionary build options
    #[serde(default)]
    pub dictionary: DictionaryConfig,

    /// Match-time lexicons and windows
    #[serde(default)]
    pub lexicon: MatchLexicon,

    /// Extraction pool options
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Next ids found in existing output
    #[serde(default)]
    pub ids: IdStarts,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// Vocabulary file (JSON lines of concept records)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<PathBuf>,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl From<CliFormat> for OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => OutputFormat::Table,
            CliFormat::Json => OutputFormat::Json,
            CliFormat::Quiet => OutputFormat::Quiet,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: default_true(),
            format: default_format(),
            vocabulary: None,
        }
    }
}

impl Config {
    /// Default configuration file path in the user config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("splfacts").join("splfacts.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default path is used
    /// if present; otherwise the built-in defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        tracing::debug!("Loading config from {}", path.display());
        Self::from_toml(&fs::read_to_string(&path)?)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.dictionary
            .validate()
            .map_err(|e| CliError::Config(format!("[dictionary] {}", e)))?;
        self.lexicon
            .validate()
            .map_err(|e| CliError::Config(format!("[lexicon] {}", e)))?;
        self.worker
            .validate()
            .map_err(|e| CliError::Config(format!("[worker] {}", e)))?;
        Ok(())
    }

    /// Apply global command-line flags on top of the file settings.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(format) = cli.format {
            self.settings.format = format.into();
        }
        if cli.no_color {
            self.settings.color = false;
        }
        if let Some(path) = &cli.vocabulary {
            self.settings.vocabulary = Some(path.clone());
        }
    }

    /// Configured vocabulary file.
    pub fn vocabulary(&self) -> Result<&Path> {
        self.settings.vocabulary.as_deref().ok_or_else(|| {
            CliError::Config(
                "No vocabulary configured; pass --vocabulary or set settings.vocabulary".into(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.settings.color);
        assert_eq!(config.settings.format, OutputFormat::Table);
        assert!(config.vocabulary().is_err());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [settings]
            format = "json"
            vocabulary = "/data/mdr.jsonl"

            [worker]
            pool_size = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.settings.format, OutputFormat::Json);
        assert_eq!(config.vocabulary().unwrap(), Path::new("/data/mdr.jsonl"));
        assert_eq!(config.worker.pool_size, 2);
        assert_eq!(config.worker.max_read_retries, WorkerConfig::default().max_read_retries);
        assert_eq!(config.lexicon, MatchLexicon::default());
    }

    #[test]
    fn test_invalid_section_is_reported() {
        let err = Config::from_toml("[worker]\npool_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("[worker]"));
    }

    #[test]
    fn test_roundtrip() {
        let mut config = Config::default();
        config.settings.vocabulary = Some(PathBuf::from("v.jsonl"));
        config.ids.product = Some(5_000);
        let text = config.to_toml().unwrap();
        let back = Config::from_toml(&text).unwrap();
        assert_eq!(back.ids.product, Some(5_000));
        assert_eq!(back.settings.vocabulary, config.settings.vocabulary);
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[settings]\ncolor = false\n").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert!(!config.settings.color);

        assert!(Config::load(Some(Path::new("/definitely/missing.toml"))).is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let mut config = Config::from_toml("[settings]\nformat = \"json\"\nvocabulary = \"a.jsonl\"\n").unwrap();
        let cli = Cli::try_parse_from(["splfacts", "--format", "quiet", "--no-color", "--vocabulary", "b.jsonl", "config"])
            .unwrap();
        config.apply_cli(&cli);
        assert_eq!(config.settings.format, OutputFormat::Quiet);
        assert!(!config.settings.color);
        assert_eq!(config.vocabulary().unwrap(), Path::new("b.jsonl"));
    }
}
