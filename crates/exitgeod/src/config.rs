//! Daemon configuration from environment variables

use anyhow::{Context, Result};
use exitgeo_core::ResolverConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

const DEFAULT_ADDR: &str = "0.0.0.0:8099";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RESOLVE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: String,
    pub mmdb_path: Option<PathBuf>,
    pub cdn_cidr_path: Option<PathBuf>,
    pub http_timeout_secs: u64,
    pub resolve_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub exclude_geo_countries: Vec<String>,
    pub accept_invalid_certs: bool,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`
    ///
    /// Unset and empty variables take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(Self {
            addr: var("EXITGEO_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string()),
            mmdb_path: var("EXITGEO_MMDB_PATH").map(PathBuf::from),
            cdn_cidr_path: var("EXITGEO_CDN_CIDR_PATH").map(PathBuf::from),
            http_timeout_secs: parse_secs(
                "EXITGEO_HTTP_TIMEOUT_SECS",
                var("EXITGEO_HTTP_TIMEOUT_SECS"),
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?,
            resolve_timeout_secs: parse_secs(
                "EXITGEO_RESOLVE_TIMEOUT_SECS",
                var("EXITGEO_RESOLVE_TIMEOUT_SECS"),
                DEFAULT_RESOLVE_TIMEOUT_SECS,
            )?,
            probe_timeout_secs: parse_secs(
                "EXITGEO_PROBE_TIMEOUT_SECS",
                var("EXITGEO_PROBE_TIMEOUT_SECS"),
                DEFAULT_PROBE_TIMEOUT_SECS,
            )?,
            exclude_geo_countries: var("EXITGEO_EXCLUDE_GEO_COUNTRIES")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_ascii_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
            accept_invalid_certs: match var("EXITGEO_ACCEPT_INVALID_CERTS") {
                Some(value) => parse_bool(&value).with_context(|| {
                    format!("EXITGEO_ACCEPT_INVALID_CERTS must be true or false. Got: {}", value)
                })?,
                None => false,
            },
            log_level: var("EXITGEO_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.addr.parse::<SocketAddr>().is_err() {
            anyhow::bail!(
                "EXITGEO_ADDR must be a socket address like 0.0.0.0:8099. Got: {}",
                self.addr
            );
        }

        for (name, value) in [
            ("EXITGEO_HTTP_TIMEOUT_SECS", self.http_timeout_secs),
            ("EXITGEO_RESOLVE_TIMEOUT_SECS", self.resolve_timeout_secs),
            ("EXITGEO_PROBE_TIMEOUT_SECS", self.probe_timeout_secs),
        ] {
            if !(1..=120).contains(&value) {
                anyhow::bail!("{} must be between 1 and 120 seconds. Got: {}", name, value);
            }
        }

        if let Some(ref path) = self.mmdb_path
            && !path.is_file()
        {
            anyhow::bail!(
                "EXITGEO_MMDB_PATH does not point to a file: {}. \
                Unset it to search the default locations.",
                path.display()
            );
        }

        if let Some(ref path) = self.cdn_cidr_path
            && !path.is_file()
        {
            anyhow::bail!(
                "EXITGEO_CDN_CIDR_PATH does not point to a file: {}. \
                Unset it to use the built-in Cloudflare ranges.",
                path.display()
            );
        }

        for code in &self.exclude_geo_countries {
            if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_alphabetic()) {
                anyhow::bail!(
                    "EXITGEO_EXCLUDE_GEO_COUNTRIES must list two-letter country codes. Got: {}",
                    code
                );
            }
        }

        if self.level().is_none() {
            anyhow::bail!(
                "EXITGEO_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            );
        }

        Ok(())
    }

    /// Tracing level for the subscriber
    pub fn level(&self) -> Option<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Resolver settings derived from the environment
    pub fn resolver_config(&self) -> ResolverConfig {
        let mut config = ResolverConfig::new();
        config.resolve_timeout_secs = self.resolve_timeout_secs;
        config.probe_timeout_secs = self.probe_timeout_secs;
        config.excluded_geo_countries = self.exclude_geo_countries.clone();
        config
    }
}

fn parse_secs(name: &str, value: Option<String>, default: u64) -> Result<u64> {
    match value {
        Some(value) => value
            .parse()
            .with_context(|| format!("{} must be a whole number of seconds. Got: {}", name, value)),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("not a boolean: {}", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.addr, "0.0.0.0:8099");
        assert_eq!(config.http_timeout_secs, 10);
        assert_eq!(config.resolve_timeout_secs, 5);
        assert_eq!(config.probe_timeout_secs, 10);
        assert!(!config.accept_invalid_certs);
        assert!(config.mmdb_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("EXITGEO_ADDR", "127.0.0.1:9000"),
            ("EXITGEO_RESOLVE_TIMEOUT_SECS", "8"),
            ("EXITGEO_EXCLUDE_GEO_COUNTRIES", "cn, ru ,"),
            ("EXITGEO_ACCEPT_INVALID_CERTS", "true"),
            ("EXITGEO_LOG_LEVEL", "DEBUG"),
        ])
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.exclude_geo_countries, vec!["CN", "RU"]);
        assert!(config.accept_invalid_certs);
        assert_eq!(config.level(), Some(Level::DEBUG));

        let resolver = config.resolver_config();
        assert_eq!(resolver.resolve_timeout_secs, 8);
        assert!(resolver.is_excluded_country("cn"));
        assert!(resolver.validate().is_ok());
    }

    #[test]
    fn test_empty_values_use_defaults() {
        let config = load(&[("EXITGEO_ADDR", ""), ("EXITGEO_HTTP_TIMEOUT_SECS", "  ")]).unwrap();
        assert_eq!(config.addr, "0.0.0.0:8099");
        assert_eq!(config.http_timeout_secs, 10);
    }

    #[test]
    fn test_parse_errors() {
        assert!(load(&[("EXITGEO_PROBE_TIMEOUT_SECS", "ten")]).is_err());
        assert!(load(&[("EXITGEO_ACCEPT_INVALID_CERTS", "maybe")]).is_err());
    }

    #[test]
    fn test_validation_errors() {
        let config = load(&[("EXITGEO_ADDR", "localhost")]).unwrap();
        assert!(config.validate().is_err());

        let config = load(&[("EXITGEO_HTTP_TIMEOUT_SECS", "0")]).unwrap();
        assert!(config.validate().is_err());

        let config = load(&[("EXITGEO_RESOLVE_TIMEOUT_SECS", "121")]).unwrap();
        assert!(config.validate().is_err());

        let config = load(&[("EXITGEO_EXCLUDE_GEO_COUNTRIES", "China")]).unwrap();
        assert!(config.validate().is_err());

        let config = load(&[("EXITGEO_LOG_LEVEL", "verbose")]).unwrap();
        assert!(config.validate().is_err());

        let config = load(&[("EXITGEO_MMDB_PATH", "/nonexistent/GeoLite2-City.mmdb")]).unwrap();
        assert!(config.validate().is_err());
    }
}
