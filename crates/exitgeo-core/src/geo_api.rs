//! Geo-API fallback tier
//!
//! Rate-limited third-party endpoints answering address and country in
//! one JSON document. Used only when the local database could not place
//! the discovered address, or when discovery found nothing at all.

use crate::cdn::CdnRanges;
use crate::config::{ResolverConfig, country_listed};
use crate::endpoints::wants_postman_profile;
use crate::error::{Error, Result};
use crate::extract::parse_geo_body;
use crate::record::{AddressRecord, GeoRecord};
use crate::tier::{SequentialTier, require_ok};
use crate::traits::{HeaderProfile, HttpRequest, HttpResponse, HttpTransport};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Geo-API fallback over a list of JSON endpoints
pub struct GeoApiTier {
    tier: SequentialTier,
    transport: Arc<dyn HttpTransport>,
    cdn: Arc<CdnRanges>,
    endpoints: Vec<String>,
    excluded_countries: Vec<String>,
}

impl GeoApiTier {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        cdn: Arc<CdnRanges>,
        config: &ResolverConfig,
    ) -> Self {
        Self {
            tier: SequentialTier::new(
                "geo api",
                transport.clone(),
                config.grace_attempts,
                config.grace_timeout(),
            ),
            transport,
            cdn,
            endpoints: config.geo_apis.clone(),
            excluded_countries: config.excluded_geo_countries.clone(),
        }
    }

    /// Query one endpoint
    ///
    /// Succeeds only when the body carries a country code. The address may
    /// be missing; the returned record then has both families empty.
    pub async fn fetch_full_geo(&self, endpoint: &str) -> Result<GeoRecord> {
        let response = self.transport.execute(request_for(endpoint)).await?;
        self.accept(endpoint, response)
    }

    /// Walk the shuffled endpoint list until one yields a country
    ///
    /// # Returns
    ///
    /// - `Ok(GeoRecord)`: country code set, CDN membership classified
    /// - `Err(Error::NoAddressFound)`: no endpoint produced a usable answer
    pub async fn lookup(&self, cancel: &CancellationToken) -> Result<GeoRecord> {
        self.tier
            .first_success(&self.endpoints, cancel, request_for, |url, response| {
                self.accept(url, response)
            })
            .await
            .ok_or(Error::NoAddressFound)
    }

    fn accept(&self, endpoint: &str, response: HttpResponse) -> Result<GeoRecord> {
        let response = require_ok(endpoint, response)?;
        let fields = parse_geo_body(endpoint, &response.body)?;

        let Some(code) = fields.country_code else {
            return Err(Error::soft_failure(endpoint, "no country code"));
        };
        if country_listed(&self.excluded_countries, &code) {
            return Err(Error::soft_failure(
                endpoint,
                format!("country {} is excluded", code),
            ));
        }

        let mut address = fields.ip.map(AddressRecord::from_ip).unwrap_or_default();
        self.cdn.mark(&mut address);

        let mut record = GeoRecord::new(address);
        record.set_country_code(&code);
        debug!(
            "Geo API {} placed {:?} in {}",
            endpoint,
            record.address.primary(),
            record.country_code
        );
        Ok(record)
    }
}

fn request_for(endpoint: &str) -> HttpRequest {
    let profile = if wants_postman_profile(endpoint) {
        HeaderProfile::Postman
    } else {
        HeaderProfile::Api
    };
    HttpRequest::get(endpoint).with_profile(profile)
}
