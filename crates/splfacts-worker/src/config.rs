//! Configuration for extraction runs
//!
//! Pool sizing, read retries and input bounds.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkerError};

/// Configuration for the extraction pool
///
/// # Examples
///
/// ```
/// use splfacts_worker::WorkerConfig;
///
/// let config = WorkerConfig::default();
/// assert_eq!(config.max_read_retries, 3);
/// assert!(config.validate().is_ok());
///
/// // More parallelism, deeper queue
/// let config = WorkerConfig::throughput();
/// assert_eq!(config.channel_capacity, 256);
///
/// // One group at a time, more patience with flaky reads
/// let config = WorkerConfig::conservative();
/// assert_eq!(config.pool_size, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Document groups matched concurrently; capped at available parallelism
    /// Default: 4
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Loaded groups buffered between the reader and the pool
    /// Default: 64
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Extra attempts for a document read that fails
    /// Default: 3
    #[serde(default = "default_max_read_retries")]
    pub max_read_retries: u32,

    /// Pause before each retry, multiplied by the attempt number (milliseconds)
    /// Default: 100
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Section text beyond this many characters is truncated on read
    /// Default: 200000
    #[serde(default = "default_max_section_chars")]
    pub max_section_chars: usize,

    /// Indication atoms whose term contains one of these are dropped
    /// Default: ["death"]
    #[serde(default = "default_indication_exclusions")]
    pub indication_exclusions: Vec<String>,

    /// Share first-observed dates across sections after merging
    /// Default: false
    #[serde(default)]
    pub reconcile_across_sections: bool,

    /// With `reconcile_across_sections`, also share dates by preferred term
    /// Default: false
    #[serde(default)]
    pub reconcile_by_pt_key: bool,
}

fn default_pool_size() -> usize {
    4
}

fn default_channel_capacity() -> usize {
    64
}

fn default_max_read_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    100
}

fn default_max_section_chars() -> usize {
    200_000
}

fn default_indication_exclusions() -> Vec<String> {
    vec!["death".to_string()]
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            channel_capacity: default_channel_capacity(),
            max_read_retries: default_max_read_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_section_chars: default_max_section_chars(),
            indication_exclusions: default_indication_exclusions(),
            reconcile_across_sections: false,
            reconcile_by_pt_key: false,
        }
    }
}

impl WorkerConfig {
    /// Throughput configuration: a wide pool and a deep queue
    ///
    /// - Pool: 16 (still capped at available parallelism)
    /// - Channel: 256 groups
    /// - Retries: 1
    pub fn throughput() -> Self {
        Self {
            pool_size: 16,
            channel_capacity: 256,
            max_read_retries: 1,
            retry_backoff_ms: 50,
            ..Self::default()
        }
    }

    /// Conservative configuration: one group at a time, patient retries
    ///
    /// - Pool: 1
    /// - Channel: 8 groups
    /// - Retries: 5
    pub fn conservative() -> Self {
        Self {
            pool_size: 1,
            channel_capacity: 8,
            max_read_retries: 5,
            retry_backoff_ms: 500,
            ..Self::default()
        }
    }

    /// Pool size capped at the machine's available parallelism
    pub fn effective_pool_size(&self) -> usize {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.pool_size.clamp(1, available.max(1))
    }

    /// Backoff before retry number `attempt` (1-based)
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.pool_size == 0 {
            return Err("pool_size must be greater than 0".to_string());
        }
        if self.channel_capacity == 0 {
            return Err("channel_capacity must be greater than 0".to_string());
        }
        if self.max_section_chars == 0 {
            return Err("max_section_chars must be greater than 0".to_string());
        }
        if self.reconcile_by_pt_key && !self.reconcile_across_sections {
            return Err("reconcile_by_pt_key requires reconcile_across_sections".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> std::result::Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> std::result::Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize TOML: {}", e))
    }

    /// Load and validate from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content).map_err(WorkerError::Config)?;
        config.validate().map_err(WorkerError::Config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorkerConfig::default();
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.channel_capacity, 64);
        assert_eq!(config.max_section_chars, 200_000);
        assert_eq!(config.indication_exclusions, vec!["death"]);
        assert!(!config.reconcile_across_sections);
    }

    #[test]
    fn test_presets() {
        assert!(WorkerConfig::throughput().pool_size > WorkerConfig::default().pool_size);
        assert!(WorkerConfig::conservative().max_read_retries > WorkerConfig::default().max_read_retries);
        assert!(WorkerConfig::throughput().validate().is_ok());
        assert!(WorkerConfig::conservative().validate().is_ok());
    }

    #[test]
    fn test_effective_pool_size_is_bounded() {
        let config = WorkerConfig {
            pool_size: 10_000,
            ..WorkerConfig::default()
        };
        let size = config.effective_pool_size();
        assert!(size >= 1 && size < 10_000);
    }

    #[test]
    fn test_retry_backoff_grows() {
        let config = WorkerConfig::default();
        assert_eq!(config.retry_backoff(1), Duration::from_millis(100));
        assert_eq!(config.retry_backoff(3), Duration::from_millis(300));
    }

    #[test]
    fn test_validation() {
        let config = WorkerConfig {
            pool_size: 0,
            ..WorkerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = WorkerConfig {
            reconcile_by_pt_key: true,
            ..WorkerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = WorkerConfig::conservative();
        let text = config.to_toml().unwrap();
        assert_eq!(WorkerConfig::from_toml(&text).unwrap(), config);

        let partial = WorkerConfig::from_toml("pool_size = 2\n").unwrap();
        assert_eq!(partial.pool_size, 2);
        assert_eq!(partial.max_read_retries, 3);
    }
}
