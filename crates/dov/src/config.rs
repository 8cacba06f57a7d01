//! Client configuration.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DOV_WFS_URL` | https://www.dov.vlaanderen.be/geoserver/wfs | WFS endpoint |
//! | `DOV_WFS_VERSION` | 1.1.0 | WFS protocol version |
//! | `DOV_MAX_FEATURES` | 10000 | Default feature limit per search |
//! | `DOV_TIMEOUT` | 30 | HTTP timeout (seconds) |
//! | `DOV_SRS_NAME` | EPSG:31370 | Spatial reference system of requests |
//! | `DOV_LOG_LEVEL` | info | Log level |
//! | `DOV_PARALLEL_DETAIL_FETCH` | false | Fetch detail documents in parallel |
//! | `DOV_USER_AGENT` | helios-dov/<version> | HTTP user agent |
//!
//! # Example
//!
//! ```rust
//! use helios_dov::DovConfig;
//!
//! let config = DovConfig {
//!     max_features: 500,
//!     parallel_detail_fetch: true,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use clap::Parser;
use url::Url;

use crate::query::DEFAULT_SRS;
use crate::search::SearchOptions;

pub const DEFAULT_WFS_URL: &str = "https://www.dov.vlaanderen.be/geoserver/wfs";
pub const DEFAULT_USER_AGENT: &str = concat!("helios-dov/", env!("CARGO_PKG_VERSION"));

/// GetFeature bodies are written in the WFS 1.1.0 dialect only.
const SUPPORTED_VERSIONS: [&str; 1] = ["1.1.0"];
const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Connection and search settings of a DOV client.
#[derive(Debug, Clone, Parser)]
#[command(name = "dov-cli")]
#[command(about = "Search the DOV web feature service")]
pub struct DovConfig {
    /// Base URL of the WFS endpoint.
    #[arg(long, env = "DOV_WFS_URL", default_value = DEFAULT_WFS_URL)]
    pub wfs_url: String,

    /// WFS protocol version.
    #[arg(long, env = "DOV_WFS_VERSION", default_value = "1.1.0")]
    pub wfs_version: String,

    /// Default maximum number of features per search.
    #[arg(long, env = "DOV_MAX_FEATURES", default_value = "10000")]
    pub max_features: u32,

    /// HTTP timeout in seconds.
    #[arg(long, env = "DOV_TIMEOUT", default_value = "30")]
    pub timeout: u64,

    /// Spatial reference system for bounding boxes and returned geometry.
    #[arg(long, env = "DOV_SRS_NAME", default_value = DEFAULT_SRS)]
    pub srs_name: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "DOV_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Fetch detail documents in parallel.
    #[arg(long, env = "DOV_PARALLEL_DETAIL_FETCH", default_value = "false")]
    pub parallel_detail_fetch: bool,

    /// User agent sent with every request.
    #[arg(long, env = "DOV_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}

impl Default for DovConfig {
    fn default() -> Self {
        Self {
            wfs_url: DEFAULT_WFS_URL.to_string(),
            wfs_version: "1.1.0".to_string(),
            max_features: 10_000,
            timeout: 30,
            srs_name: DEFAULT_SRS.to_string(),
            log_level: "info".to_string(),
            parallel_detail_fetch: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl DovConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            max_features: Some(self.max_features),
            server_max_features: None,
            srs_name: self.srs_name.clone(),
            parallel_detail_fetch: self.parallel_detail_fetch,
        }
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        match Url::parse(&self.wfs_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(format!("WFS URL scheme '{}' is not supported", url.scheme())),
            Err(e) => errors.push(format!("WFS URL '{}' is invalid: {}", self.wfs_url, e)),
        }

        if !SUPPORTED_VERSIONS.contains(&self.wfs_version.as_str()) {
            errors.push(format!(
                "WFS version '{}' is not supported (expected one of {})",
                self.wfs_version,
                SUPPORTED_VERSIONS.join(", ")
            ));
        }

        if self.max_features == 0 {
            errors.push("Max features cannot be 0".to_string());
        }

        if self.timeout == 0 {
            errors.push("Timeout cannot be 0".to_string());
        }

        if self.srs_name.trim().is_empty() {
            errors.push("SRS name cannot be empty".to_string());
        }

        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            errors.push(format!("Unknown log level '{}'", self.log_level));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    ///
    /// Points at an unroutable local endpoint with short timeouts so that an
    /// accidental network call fails fast.
    pub fn for_testing() -> Self {
        Self {
            wfs_url: "http://127.0.0.1:9/geoserver/wfs".to_string(),
            wfs_version: "1.1.0".to_string(),
            max_features: 100,
            timeout: 2,
            srs_name: DEFAULT_SRS.to_string(),
            log_level: "debug".to_string(),
            parallel_detail_fetch: false,
            user_agent: "helios-dov-test".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DovConfig::default();
        assert_eq!(config.wfs_url, DEFAULT_WFS_URL);
        assert_eq!(config.srs_name, "EPSG:31370");
        assert!(!config.parallel_detail_fetch);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_matches_default() {
        let parsed = DovConfig::try_parse_from(["dov-cli"]).unwrap();
        assert_eq!(parsed.max_features, DovConfig::default().max_features);
        assert_eq!(parsed.wfs_version, "1.1.0");
    }

    #[test]
    fn test_validate_invalid_url() {
        let config = DovConfig {
            wfs_url: "ftp://example.org/wfs".to_string(),
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("scheme")));

        let config = DovConfig {
            wfs_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_wfs_2() {
        let config = DovConfig {
            wfs_version: "2.0.0".to_string(),
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("'2.0.0' is not supported"));
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let config = DovConfig {
            wfs_version: "3.0".to_string(),
            max_features: 0,
            timeout: 0,
            log_level: "loud".to_string(),
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_search_options() {
        let config = DovConfig {
            max_features: 25,
            parallel_detail_fetch: true,
            ..Default::default()
        };
        let options = config.search_options();
        assert_eq!(options.max_features, Some(25));
        assert!(options.parallel_detail_fetch);
        assert_eq!(options.server_max_features, None);
    }

    #[test]
    fn test_for_testing() {
        let config = DovConfig::for_testing();
        assert_eq!(config.timeout(), Duration::from_secs(2));
        assert_eq!(config.log_level, "debug");
        assert!(config.validate().is_ok());
    }
}
