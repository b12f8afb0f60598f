//! Resolution orchestrator
//!
//! The Resolver sequences the tiers under one deadline and produces the
//! public [`CheckResult`].
//!
//! ## Flow
//!
//! ```text
//!                 ┌──────────────────┐
//!                 │     Resolver     │
//!                 └──────────────────┘
//!                   │              │
//!        sequential │              │ concurrent
//!                   ▼              ▼
//!       ┌────────────────┐   ┌──────────────┐
//!       │ ExitDiscovery  │   │  RelayProbe  │
//!       └────────────────┘   └──────────────┘
//!                   │              │
//!                   ▼              │
//!       ┌────────────────┐         │
//!       │ LocalGeoLookup │         │
//!       └────────────────┘         │
//!                   │ no country   │
//!                   ▼              │
//!       ┌────────────────┐         │
//!       │   GeoApiTier   │         │
//!       └────────────────┘         │
//!                   │              │
//!                   └──────┬───────┘
//!                          ▼
//!                   ┌────────────┐
//!                   │  classify  │
//!                   └────────────┘
//! ```
//!
//! Each call owns its records; the only shared state is the read-only CDN
//! table and database handle.

use crate::cdn::CdnRanges;
use crate::classify::{Classification, classify};
use crate::config::ResolverConfig;
use crate::deadline::deadline;
use crate::discovery::ExitDiscovery;
use crate::error::{Error, Result};
use crate::geo_api::GeoApiTier;
use crate::geo_lookup::LocalGeoLookup;
use crate::record::{AddressRecord, CheckResult, GeoRecord, RelayProbeResult};
use crate::traits::{GeoDatabase, HttpTransport, RelayProbe};
use std::net::IpAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Everything one analysis produced
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub record: GeoRecord,
    pub probe: RelayProbeResult,
    pub classification: Classification,
}

impl Analysis {
    /// Project onto the public result shape
    pub fn to_check_result(&self) -> CheckResult {
        check_result(&self.record, &self.classification)
    }
}

fn check_result(record: &GeoRecord, classification: &Classification) -> CheckResult {
    CheckResult {
        ip: record
            .address
            .primary()
            .map(|ip| ip.to_string())
            .unwrap_or_default(),
        country_code: record.country_code.clone(),
        is_cdn: record.address.is_cdn,
        location: record
            .has_country()
            .then(|| record.country_code.clone()),
        tag: Some(classification.tag.to_string()),
    }
}

/// Resolution orchestrator
pub struct Resolver {
    config: ResolverConfig,
    cdn: Arc<CdnRanges>,
    geo: LocalGeoLookup,
    discovery: ExitDiscovery,
    geo_api: GeoApiTier,
    relay: Arc<dyn RelayProbe>,
    shutdown: CancellationToken,
}

impl Resolver {
    /// Create a new resolver
    ///
    /// # Parameters
    ///
    /// - `transport`: HTTP capability shared by the sequential tiers
    /// - `relay`: relay prober (usually `exitgeo_cloudflare::CloudflareTraceProber`)
    /// - `cdn`: CDN range table
    /// - `database`: local geo database, if one could be opened
    /// - `config`: endpoint lists and timing
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `config` does not validate.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        relay: Arc<dyn RelayProbe>,
        cdn: Arc<CdnRanges>,
        database: Option<Arc<dyn GeoDatabase>>,
        config: ResolverConfig,
    ) -> Result<Self> {
        config.validate()?;

        if database.is_none() {
            info!("No geo database configured, country lookups use the geo API tier");
        }

        Ok(Self {
            discovery: ExitDiscovery::new(transport.clone(), cdn.clone(), &config),
            geo_api: GeoApiTier::new(transport, cdn.clone(), &config),
            geo: LocalGeoLookup::new(database),
            relay,
            cdn,
            config,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn cdn_ranges(&self) -> &CdnRanges {
        &self.cdn
    }

    /// Cancel every in-flight call and refuse new work
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        Ok(())
    }

    /// Full analysis of the caller's own exit address
    ///
    /// Uses the resolver's own deadline.
    pub async fn current_ip_info(&self) -> Result<CheckResult> {
        Ok(self.analyze(None).await?.to_check_result())
    }

    /// The caller's exit address only
    ///
    /// Discovery first; when every discovery endpoint fails the geo-API
    /// tier is asked for an address before giving up.
    pub async fn current_ip(&self) -> Result<String> {
        self.ensure_open()?;
        let (cancel, _guard) = deadline(&self.shutdown, self.config.resolve_timeout());

        let address = match self.discovery.discover(&cancel).await {
            Ok(address) => address,
            Err(Error::NoAddressFound) => {
                debug!("Discovery exhausted, asking geo API tier for an address");
                self.geo_api.lookup(&cancel).await?.address
            }
            Err(e) => return Err(e),
        };

        address
            .primary()
            .map(|ip| ip.to_string())
            .ok_or(Error::NoAddressFound)
    }

    /// Classify a caller-supplied address
    ///
    /// Skips discovery. The address is classified against the CDN table,
    /// placed with the local database when one is available, and tagged
    /// against a fresh relay probe.
    ///
    /// # Errors
    ///
    /// `Error::InvalidAddress` when `ip` is not an IPv4/IPv6 literal.
    pub async fn resolve(&self, ip: &str) -> Result<CheckResult> {
        self.ensure_open()?;
        let parsed: IpAddr = ip
            .trim()
            .parse()
            .map_err(|_| Error::invalid_address(ip))?;

        let mut address = AddressRecord::from_ip(parsed);
        self.cdn.mark(&mut address);

        let mut record = GeoRecord::new(address);
        if let Err(e) = self.geo.decorate(&mut record) {
            debug!("Local lookup for {} unavailable: {}", parsed, e);
        }

        let (cancel, _guard) = deadline(&self.shutdown, self.config.resolve_timeout());
        let probe = self.probe_relay(&cancel).await;
        let classification = classify(&record, &probe, &self.cdn);

        Ok(check_result(&record, &classification))
    }

    /// Exit record, relay probe and classification in one call
    ///
    /// A non-empty `hint` stands in for the relay probe, which is then
    /// skipped.
    pub async fn analyze(&self, hint: Option<RelayProbeResult>) -> Result<Analysis> {
        self.ensure_open()?;
        let (cancel, _guard) = deadline(&self.shutdown, self.config.resolve_timeout());

        let probe = async {
            match hint {
                Some(hint) if !hint.is_empty() => hint,
                _ => self.probe_relay(&cancel).await,
            }
        };

        let (record, probe) = tokio::join!(self.exit_geo(&cancel), probe);
        let record = record?;
        let classification = classify(&record, &probe, &self.cdn);

        debug!(
            "Analysis: ip={:?} country={} cdn={} tag={}",
            record.address.primary(),
            record.country_code,
            record.address.is_cdn,
            classification.tag
        );

        Ok(Analysis {
            record,
            probe,
            classification,
        })
    }

    /// One relay probing round, bounded by both `cancel` and the probe timeout
    pub async fn probe_relay(&self, cancel: &CancellationToken) -> RelayProbeResult {
        let (token, _guard) = deadline(cancel, self.config.probe_timeout());
        let probe = self.relay.probe(&token).await;
        if probe.is_empty() {
            debug!("Relay probe produced no edge report");
        }
        probe
    }

    /// Exit address and country
    ///
    /// Discovery, then the local database, then the geo-API tier. An
    /// address without a country is returned as is; no address at all is
    /// `Error::NoAddressFound`.
    pub async fn exit_geo(&self, cancel: &CancellationToken) -> Result<GeoRecord> {
        let discovered = match self.discovery.discover(cancel).await {
            Ok(address) => {
                let mut record = GeoRecord::new(address);
                match self.geo.decorate(&mut record) {
                    Ok(()) if record.has_country() => return Ok(record),
                    Ok(()) => debug!("Local lookup inconclusive, trying geo API tier"),
                    Err(e) => debug!("Local lookup failed ({}), trying geo API tier", e),
                }
                Some(record)
            }
            Err(Error::NoAddressFound) => {
                debug!("Discovery exhausted, trying geo API tier");
                None
            }
            Err(e) => return Err(e),
        };

        match self.geo_api.lookup(cancel).await {
            Ok(mut remote) => {
                if remote.address.is_empty() {
                    match &discovered {
                        Some(local) => remote.address = local.address.clone(),
                        None => return Err(Error::NoAddressFound),
                    }
                }
                Ok(remote)
            }
            Err(e) => {
                debug!("Geo API tier failed: {}", e);
                discovered.ok_or(Error::NoAddressFound)
            }
        }
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("cdn_ranges", &self.cdn.len())
            .field("geo", &self.geo)
            .field("closed", &self.shutdown.is_cancelled())
            .finish()
    }
}
