//! Result records
//!
//! - [`AddressRecord`]: what exit discovery found
//! - [`GeoRecord`]: an address record decorated with location fields
//! - [`RelayProbeResult`]: what the Cloudflare edge reported
//! - [`CheckResult`]: the public answer of a resolution call

use crate::traits::GeoLookup;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Exit address as seen by external endpoints
///
/// At least one family is populated whenever a tier reports success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<Ipv4Addr>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<Ipv6Addr>,

    /// Whether the primary address sits inside the CDN range table
    #[serde(default)]
    pub is_cdn: bool,
}

impl AddressRecord {
    /// Build a single-family record from a parsed address
    pub fn from_ip(ip: IpAddr) -> Self {
        let mut record = Self::default();
        record.set(ip);
        record
    }

    /// Store `ip` in the field of its family, replacing what was there
    pub fn set(&mut self, ip: IpAddr) {
        match ip {
            IpAddr::V4(v4) => self.ipv4 = Some(v4),
            IpAddr::V6(v6) => self.ipv6 = Some(v6),
        }
    }

    /// The address used for classification and lookups (IPv4 preferred)
    pub fn primary(&self) -> Option<IpAddr> {
        self.ipv4
            .map(IpAddr::V4)
            .or_else(|| self.ipv6.map(IpAddr::V6))
    }

    pub fn is_empty(&self) -> bool {
        self.ipv4.is_none() && self.ipv6.is_none()
    }

    /// Same-family equality only
    ///
    /// An IPv4 address never equals an IPv4-mapped IPv6 address here.
    pub fn holds(&self, ip: IpAddr) -> bool {
        match ip {
            IpAddr::V4(v4) => self.ipv4 == Some(v4),
            IpAddr::V6(v6) => self.ipv6 == Some(v6),
        }
    }
}

/// Address record plus location fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoRecord {
    #[serde(flatten)]
    pub address: AddressRecord,

    /// Upper-case ISO-3166 alpha-2 code, or empty when unknown
    #[serde(default)]
    pub country_code: String,

    #[serde(default)]
    pub country_name: String,

    #[serde(default)]
    pub continent_code: String,

    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub region_code: String,

    #[serde(default)]
    pub city: String,

    #[serde(default)]
    pub postal_code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    #[serde(default)]
    pub time_zone: String,
}

impl GeoRecord {
    pub fn new(address: AddressRecord) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    /// Set the country code if `code` is a valid two-letter code
    ///
    /// Returns whether the value was accepted.
    pub fn set_country_code(&mut self, code: &str) -> bool {
        match normalize_country_code(code) {
            Some(code) => {
                self.country_code = code;
                true
            }
            None => false,
        }
    }

    pub fn has_country(&self) -> bool {
        !self.country_code.is_empty()
    }

    /// Copy every populated field of a database lookup into this record
    ///
    /// Fields the lookup leaves empty keep their previous value.
    pub fn apply_lookup(&mut self, lookup: &GeoLookup) {
        self.set_country_code(&lookup.country_code);
        fill(&mut self.country_name, &lookup.country_name);
        fill(&mut self.continent_code, &lookup.continent_code);
        fill(&mut self.region, &lookup.region);
        fill(&mut self.region_code, &lookup.region_code);
        fill(&mut self.city, &lookup.city);
        fill(&mut self.postal_code, &lookup.postal_code);
        fill(&mut self.time_zone, &lookup.time_zone);
        if lookup.latitude.is_some() {
            self.latitude = lookup.latitude;
        }
        if lookup.longitude.is_some() {
            self.longitude = lookup.longitude;
        }
    }
}

fn fill(slot: &mut String, value: &str) {
    if !value.is_empty() {
        *slot = value.to_string();
    }
}

/// Accept exactly two ASCII letters and upper-case them
pub fn normalize_country_code(code: &str) -> Option<String> {
    let code = code.trim();
    if code.len() == 2 && code.bytes().all(|b| b.is_ascii_alphabetic()) {
        Some(code.to_ascii_uppercase())
    } else {
        None
    }
}

/// What a Cloudflare edge reported about the caller
///
/// `location` is the edge's `loc=` value and `address` its `ip=` value.
/// Both are empty when no edge answered in time; that is a normal outcome,
/// not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayProbeResult {
    pub location: String,
    pub address: String,
}

impl RelayProbeResult {
    pub fn new(location: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            address: address.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// True unless both fields carry a value
    pub fn is_empty(&self) -> bool {
        self.location.is_empty() || self.address.is_empty()
    }

    /// The reported address, if it parses
    pub fn edge_ip(&self) -> Option<IpAddr> {
        self.address.trim().parse().ok()
    }
}

/// Public answer of a resolution call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub ip: String,
    pub country_code: String,
    pub is_cdn: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}
