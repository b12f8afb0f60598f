//! Configuration types for exitgeo
//!
//! This module defines the resolver configuration. Every field has a
//! default, so an empty JSON object is a valid configuration.

use crate::endpoints;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Exit-IP discovery endpoints
    #[serde(default = "default_ip_apis")]
    pub ip_apis: Vec<String>,

    /// Geo endpoints answering address + country in JSON
    #[serde(default = "default_geo_apis")]
    pub geo_apis: Vec<String>,

    /// CDN-fronted bases probed at `/cdn-cgi/trace`
    #[serde(default = "default_trace_apis")]
    pub trace_apis: Vec<String>,

    /// Overall deadline of one resolution call (in seconds)
    #[serde(default = "default_resolve_timeout_secs")]
    pub resolve_timeout_secs: u64,

    /// Deadline of one relay probing round (in seconds)
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// How many trace endpoints race per round
    #[serde(default = "default_probe_fanout")]
    pub probe_fanout: usize,

    /// Attempts per raced trace endpoint
    #[serde(default = "default_probe_attempts")]
    pub probe_attempts: usize,

    /// Attempts a sequential tier may still make after its deadline fired
    #[serde(default = "default_grace_attempts")]
    pub grace_attempts: usize,

    /// Per-call timeout for those late attempts (in seconds)
    #[serde(default = "default_grace_timeout_secs")]
    pub grace_timeout_secs: u64,

    /// Geo endpoint answers with these country codes are skipped
    #[serde(default)]
    pub excluded_geo_countries: Vec<String>,
}

impl ResolverConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            ip_apis: default_ip_apis(),
            geo_apis: default_geo_apis(),
            trace_apis: default_trace_apis(),
            resolve_timeout_secs: default_resolve_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            probe_fanout: default_probe_fanout(),
            probe_attempts: default_probe_attempts(),
            grace_attempts: default_grace_attempts(),
            grace_timeout_secs: default_grace_timeout_secs(),
            excluded_geo_countries: Vec::new(),
        }
    }

    /// Replace the discovery endpoint list
    pub fn with_ip_apis<I, S>(mut self, apis: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ip_apis = apis.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the geo endpoint list
    pub fn with_geo_apis<I, S>(mut self, apis: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.geo_apis = apis.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the trace endpoint list
    pub fn with_trace_apis<I, S>(mut self, apis: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trace_apis = apis.into_iter().map(Into::into).collect();
        self
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn grace_timeout(&self) -> Duration {
        Duration::from_secs(self.grace_timeout_secs)
    }

    /// Whether a geo endpoint's country answer must be ignored
    pub fn is_excluded_country(&self, code: &str) -> bool {
        country_listed(&self.excluded_geo_countries, code)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.ip_apis.is_empty() && self.geo_apis.is_empty() {
            return Err(crate::Error::config(
                "At least one of ip_apis or geo_apis must be non-empty",
            ));
        }

        for url in self.ip_apis.iter().chain(&self.geo_apis).chain(&self.trace_apis) {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(crate::Error::config(format!(
                    "Endpoint must use HTTP or HTTPS scheme: {}",
                    url
                )));
            }
        }

        if self.resolve_timeout_secs == 0 {
            return Err(crate::Error::config("resolve_timeout_secs must be > 0"));
        }
        if self.probe_timeout_secs == 0 {
            return Err(crate::Error::config("probe_timeout_secs must be > 0"));
        }
        if self.grace_timeout_secs == 0 {
            return Err(crate::Error::config("grace_timeout_secs must be > 0"));
        }
        if self.probe_fanout == 0 {
            return Err(crate::Error::config("probe_fanout must be >= 1"));
        }
        if self.probe_attempts == 0 {
            return Err(crate::Error::config("probe_attempts must be >= 1"));
        }

        for code in &self.excluded_geo_countries {
            if crate::record::normalize_country_code(code).is_none() {
                return Err(crate::Error::config(format!(
                    "Excluded country must be a two-letter code: {}",
                    code
                )));
            }
        }

        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn country_listed(list: &[String], code: &str) -> bool {
    list.iter().any(|c| c.eq_ignore_ascii_case(code))
}

fn default_ip_apis() -> Vec<String> {
    endpoints::to_owned(endpoints::IP_APIS)
}

fn default_geo_apis() -> Vec<String> {
    endpoints::to_owned(endpoints::GEO_APIS)
}

fn default_trace_apis() -> Vec<String> {
    endpoints::to_owned(endpoints::TRACE_APIS)
}

fn default_resolve_timeout_secs() -> u64 {
    5
}

fn default_probe_timeout_secs() -> u64 {
    10
}

fn default_probe_fanout() -> usize {
    5
}

fn default_probe_attempts() -> usize {
    2
}

fn default_grace_attempts() -> usize {
    3
}

fn default_grace_timeout_secs() -> u64 {
    3
}
