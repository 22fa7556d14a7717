//! # Reconciler Configuration
//!
//! Process-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_LIST_PAGE_SIZE, DEFAULT_LOG_FORMAT, DEFAULT_LOG_LEVEL, DEFAULT_NAME_PREFIX,
    DEFAULT_REGION,
};

/// Reconciler configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// AWS region for single-region operations (`AWS_REGION`, then `AWS_DEFAULT_REGION`)
    pub region: String,
    /// Regions visited by `sweep` when none are given on the command line
    pub sweep_regions: Vec<String>,
    /// Endpoint override for the SageMaker API (local stacks, VPC endpoints)
    pub endpoint_url: Option<String>,
    /// Prefix for generated resource names
    pub name_prefix: String,
    /// Page size for listing calls (1-100)
    pub list_page_size: i32,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            sweep_regions: vec![DEFAULT_REGION.to_string()],
            endpoint_url: None,
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            list_page_size: DEFAULT_LIST_PAGE_SIZE,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: DEFAULT_LOG_FORMAT.to_string(),
            enable_metrics: true,
        }
    }
}

impl ReconcilerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// `from_env` delegates here; tests pass a map instead of mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let region = lookup("AWS_REGION")
            .or_else(|| lookup("AWS_DEFAULT_REGION"))
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let sweep_regions = lookup("SWEEP_REGIONS")
            .map(|v| parse_region_list(&v))
            .filter(|regions| !regions.is_empty())
            .unwrap_or_else(|| vec![region.clone()]);

        let list_page_size = var_or_default(&lookup, "LIST_PAGE_SIZE", DEFAULT_LIST_PAGE_SIZE)
            .clamp(1, DEFAULT_LIST_PAGE_SIZE);

        Self {
            region,
            sweep_regions,
            endpoint_url: lookup("SAGEMAKER_ENDPOINT_URL").filter(|v| !v.is_empty()),
            name_prefix: str_or_default(&lookup, "NAME_PREFIX", DEFAULT_NAME_PREFIX),
            list_page_size,
            log_level: str_or_default(&lookup, "LOG_LEVEL", DEFAULT_LOG_LEVEL),
            log_format: str_or_default(&lookup, "LOG_FORMAT", DEFAULT_LOG_FORMAT),
            enable_metrics: bool_or_default(&lookup, "ENABLE_METRICS", true),
        }
    }
}

/// Split a comma-separated region list, dropping blanks
pub fn parse_region_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Read variable or return default value
fn var_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read variable as boolean or return default
fn bool_or_default<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| {
            let v_lower = v.to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}

/// Read variable as string or return default
fn str_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ReconcilerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ReconcilerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(config_from(&[]), ReconcilerConfig::default());
    }

    #[test]
    fn test_region_precedence() {
        let config = config_from(&[("AWS_REGION", "eu-west-1"), ("AWS_DEFAULT_REGION", "us-east-1")]);
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.sweep_regions, vec!["eu-west-1".to_string()]);

        let config = config_from(&[("AWS_DEFAULT_REGION", "us-east-1")]);
        assert_eq!(config.region, "us-east-1");
    }

    #[test]
    fn test_sweep_regions_parsed() {
        let config = config_from(&[("SWEEP_REGIONS", " us-east-1, ,us-west-2 ")]);
        assert_eq!(
            config.sweep_regions,
            vec!["us-east-1".to_string(), "us-west-2".to_string()]
        );
    }

    #[test]
    fn test_page_size_clamped_and_bad_values_ignored() {
        assert_eq!(config_from(&[("LIST_PAGE_SIZE", "500")]).list_page_size, 100);
        assert_eq!(config_from(&[("LIST_PAGE_SIZE", "0")]).list_page_size, 1);
        assert_eq!(
            config_from(&[("LIST_PAGE_SIZE", "lots")]).list_page_size,
            DEFAULT_LIST_PAGE_SIZE
        );
    }

    #[test]
    fn test_bool_parsing() {
        assert!(!config_from(&[("ENABLE_METRICS", "off")]).enable_metrics);
        assert!(config_from(&[("ENABLE_METRICS", "YES")]).enable_metrics);
    }

    #[test]
    fn test_empty_endpoint_is_none() {
        assert_eq!(config_from(&[("SAGEMAKER_ENDPOINT_URL", "")]).endpoint_url, None);
        assert_eq!(
            config_from(&[("SAGEMAKER_ENDPOINT_URL", "http://localhost:4566")]).endpoint_url,
            Some("http://localhost:4566".to_string())
        );
    }
}
