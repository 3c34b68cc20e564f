//! Service configuration.
//!
//! Configuration types deserialize with `serde`, and every field has a
//! default, so partial documents are accepted:
//!
//! ```
//! use helios_records::config::RecordServiceConfig;
//!
//! let config: RecordServiceConfig =
//!     serde_json::from_str(r#"{ "max_page_size": 200 }"#).unwrap();
//! assert_eq!(config.default_page_size, 20);
//! assert_eq!(config.max_page_size, 200);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Pagination;

/// A configuration was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid configuration: {}", .problems.join("; "))]
pub struct ConfigError {
    /// Every problem found.
    pub problems: Vec<String>,
}

/// Configuration shared by the record services and the filter engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordServiceConfig {
    /// Page size used when a request does not specify one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Upper bound for any requested page size.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// How many times a write that lost a race is retried from a fresh read
    /// when the caller did not pin an expected version.
    #[serde(default = "default_write_retries")]
    pub write_retries: u32,
}

fn default_page_size() -> u32 {
    20
}

fn default_max_page_size() -> u32 {
    1000
}

fn default_write_retries() -> u32 {
    3
}

impl Default for RecordServiceConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            write_retries: default_write_retries(),
        }
    }
}

impl RecordServiceConfig {
    /// Validates the configuration and returns every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.default_page_size == 0 {
            errors.push("Default page size cannot be 0".to_string());
        }

        if self.max_page_size == 0 {
            errors.push("Max page size cannot be 0".to_string());
        }

        if self.default_page_size > self.max_page_size {
            errors.push("Default page size cannot exceed max page size".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Resolves optional page/limit request values into a usable pagination.
    ///
    /// Pages are 1-based; a missing or zero page becomes 1. A missing or zero
    /// limit falls back to the default page size and larger limits are
    /// clamped to the maximum.
    pub fn pagination(&self, page: Option<u32>, limit: Option<u32>) -> Pagination {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let limit = match limit {
            None | Some(0) => self.default_page_size,
            Some(limit) => limit.min(self.max_page_size),
        };
        Pagination::new(page, limit.max(1))
    }
}

/// Serde module for Duration with humantime format.
pub(crate) mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RecordServiceConfig::default();
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.max_page_size, 1000);
        assert_eq!(config.write_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_page_sizes() {
        let config = RecordServiceConfig {
            default_page_size: 50,
            max_page_size: 10,
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("cannot exceed"));
    }

    #[test]
    fn test_pagination_normalization() {
        let config = RecordServiceConfig {
            default_page_size: 20,
            max_page_size: 100,
            write_retries: 3,
        };

        let p = config.pagination(None, None);
        assert_eq!((p.page, p.limit), (1, 20));

        let p = config.pagination(Some(0), Some(0));
        assert_eq!((p.page, p.limit), (1, 20));

        let p = config.pagination(Some(3), Some(500));
        assert_eq!((p.page, p.limit), (3, 100));
    }

    #[test]
    fn test_partial_deserialize() {
        let config: RecordServiceConfig =
            serde_json::from_str(r#"{ "write_retries": 0 }"#).unwrap();
        assert_eq!(config.write_retries, 0);
        assert_eq!(config.default_page_size, 20);
    }
}
