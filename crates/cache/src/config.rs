//! Cache configuration for user-configurable memory and count budgets.
//!
//! Configuration can be created programmatically, via builder methods,
//! or loaded from environment variables.

use std::fmt;
use thiserror::Error;

/// Configuration for the image cache.
///
/// Both ceilings are soft: a single bitmap larger than the memory budget
/// may transiently exceed it when nothing else can be evicted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of cached images
    pub max_count: usize,

    /// Memory ceiling for cached pixel data in bytes
    pub max_size: u64,

    /// Convert decoded images to 3-byte-per-pixel RGB before caching
    pub strip_alpha: bool,

    /// Size estimate used when neither metadata dimensions nor a cache
    /// average are available
    pub fallback_estimate: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_count: 50,
            max_size: 2 * 1024 * 1024 * 1024, // 2 GiB
            strip_alpha: true,
            fallback_estimate: 100 * 1024 * 1024, // 100 MiB, biases toward caution
        }
    }
}

impl CacheConfig {
    /// Create a configuration with explicit ceilings.
    pub fn new(max_count: usize, max_size: u64) -> Self {
        Self {
            max_count,
            max_size,
            ..Default::default()
        }
    }

    /// Set the maximum number of cached images.
    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = max_count;
        self
    }

    /// Set the memory ceiling in bytes.
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the memory ceiling in megabytes.
    pub fn with_max_size_mb(mut self, mb: u64) -> Self {
        self.max_size = mb * 1024 * 1024;
        self
    }

    /// Enable or disable alpha stripping.
    pub fn with_strip_alpha(mut self, strip_alpha: bool) -> Self {
        self.strip_alpha = strip_alpha;
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PHOTO_VIEWER_CACHE_MAX_MB`: memory ceiling in MB (default: 2048)
    /// - `PHOTO_VIEWER_CACHE_MAX_COUNT`: entry ceiling (default: 50)
    /// - `PHOTO_VIEWER_CACHE_KEEP_ALPHA`: set to `1` to keep alpha channels
    ///
    /// # Errors
    /// Returns an error if a variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("PHOTO_VIEWER_CACHE_MAX_MB") {
            let mb = val
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue("PHOTO_VIEWER_CACHE_MAX_MB".to_string()))?;
            config.max_size = mb * 1024 * 1024;
        }

        if let Ok(val) = std::env::var("PHOTO_VIEWER_CACHE_MAX_COUNT") {
            config.max_count = val.parse::<usize>().map_err(|_| {
                ConfigError::InvalidValue("PHOTO_VIEWER_CACHE_MAX_COUNT".to_string())
            })?;
        }

        if let Ok(val) = std::env::var("PHOTO_VIEWER_CACHE_KEEP_ALPHA") {
            config.strip_alpha = val != "1";
        }

        Ok(config)
    }
}

impl fmt::Display for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "max_count={}, max_size={} MB, strip_alpha={}",
            self.max_count,
            self.max_size / (1024 * 1024),
            self.strip_alpha
        )
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable contained an unparsable value.
    #[error("invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var("PHOTO_VIEWER_CACHE_MAX_MB");
        std::env::remove_var("PHOTO_VIEWER_CACHE_MAX_COUNT");
        std::env::remove_var("PHOTO_VIEWER_CACHE_KEEP_ALPHA");
    }

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.max_count, 50);
        assert_eq!(config.max_size, 2 * 1024 * 1024 * 1024);
        assert!(config.strip_alpha);
        assert_eq!(config.fallback_estimate, 100 * 1024 * 1024);
    }

    #[test]
    fn test_builder_methods() {
        let config = CacheConfig::default()
            .with_max_count(10)
            .with_max_size_mb(512)
            .with_strip_alpha(false);

        assert_eq!(config.max_count, 10);
        assert_eq!(config.max_size, 512 * 1024 * 1024);
        assert!(!config.strip_alpha);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        std::env::set_var("PHOTO_VIEWER_CACHE_MAX_MB", "256");
        std::env::set_var("PHOTO_VIEWER_CACHE_MAX_COUNT", "8");
        std::env::set_var("PHOTO_VIEWER_CACHE_KEEP_ALPHA", "1");

        let config = CacheConfig::from_env().unwrap();
        assert_eq!(config.max_size, 256 * 1024 * 1024);
        assert_eq!(config.max_count, 8);
        assert!(!config.strip_alpha);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_defaults_when_unset() {
        clear_env();
        let config = CacheConfig::from_env().unwrap();
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_value() {
        clear_env();
        std::env::set_var("PHOTO_VIEWER_CACHE_MAX_MB", "lots");

        let err = CacheConfig::from_env().unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue("PHOTO_VIEWER_CACHE_MAX_MB".to_string())
        );

        clear_env();
    }

    #[test]
    fn test_display() {
        let config = CacheConfig::default().with_max_size_mb(100);
        let text = config.to_string();
        assert!(text.contains("max_size=100 MB"));
    }
}
