//! Cloudflare CDN range table
//!
//! An immutable set of IPv4 and IPv6 networks. Built once at startup
//! (embedded lists or a file) and shared by `Arc` across every resolution.

use crate::error::{Error, Result};
use crate::record::AddressRecord;
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use std::net::IpAddr;
use std::path::Path;
use tracing::{debug, warn};

const EMBEDDED_IPV4: &str = include_str!("../assets/cloudflare_ipv4.txt");
const EMBEDDED_IPV6: &str = include_str!("../assets/cloudflare_ipv6.txt");

/// CIDR membership table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CdnRanges {
    v4: Vec<Ipv4Net>,
    v6: Vec<Ipv6Net>,
}

impl CdnRanges {
    /// The built-in Cloudflare ranges
    pub fn embedded() -> Self {
        let mut ranges = Self::parse(EMBEDDED_IPV4);
        ranges.extend(Self::parse(EMBEDDED_IPV6));
        ranges
    }

    /// Parse a CIDR list
    ///
    /// One network per line. Blank lines and `#` comments are skipped, as
    /// are lines that do not parse (logged at warn). Both families may be
    /// mixed in one text.
    pub fn parse(text: &str) -> Self {
        let mut ranges = Self::default();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match line.parse::<IpNet>() {
                Ok(IpNet::V4(net)) => ranges.v4.push(net.trunc()),
                Ok(IpNet::V6(net)) => ranges.v6.push(net.trunc()),
                Err(e) => warn!("Skipping CIDR line {} ('{}'): {}", index + 1, line, e),
            }
        }

        ranges
    }

    /// Load a CIDR list from disk
    ///
    /// A file without a single usable network is a configuration error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let ranges = Self::parse(&text);

        if ranges.is_empty() {
            return Err(Error::config(format!(
                "no CIDR ranges found in {}",
                path.display()
            )));
        }

        debug!(
            "Loaded {} IPv4 and {} IPv6 CDN ranges from {}",
            ranges.v4.len(),
            ranges.v6.len(),
            path.display()
        );
        Ok(ranges)
    }

    fn extend(&mut self, other: Self) {
        self.v4.extend(other.v4);
        self.v6.extend(other.v6);
    }

    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty()
    }

    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    /// Whether `ip` falls inside any range of its own family
    ///
    /// IPv4-mapped IPv6 addresses are never members.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match ip {
            IpAddr::V4(v4) => self.v4.iter().any(|net| net.contains(&v4)),
            IpAddr::V6(v6) => {
                v6.to_ipv4_mapped().is_none() && self.v6.iter().any(|net| net.contains(&v6))
            }
        }
    }

    /// Membership test on a literal; unparseable input is not a member
    pub fn is_member(&self, literal: &str) -> bool {
        literal
            .trim()
            .parse::<IpAddr>()
            .is_ok_and(|ip| self.contains(ip))
    }

    /// Whether either family of the record is a member
    pub fn classify(&self, record: &AddressRecord) -> bool {
        record.ipv4.is_some_and(|v4| self.contains(IpAddr::V4(v4)))
            || record.ipv6.is_some_and(|v6| self.contains(IpAddr::V6(v6)))
    }

    /// Set `record.is_cdn` from the table
    pub fn mark(&self, record: &mut AddressRecord) {
        record.is_cdn = self.classify(record);
    }
}
