//! Exit-IP discovery tier
//!
//! Asks "what is my IP" endpoints, one at a time in random order, until
//! one answers with a parseable address. The discovered record is
//! classified against the CDN table before it is returned.

use crate::cdn::CdnRanges;
use crate::config::ResolverConfig;
use crate::error::{Error, Result};
use crate::extract::parse_exit_body;
use crate::record::AddressRecord;
use crate::tier::{SequentialTier, require_ok};
use crate::traits::{HttpRequest, HttpTransport};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Exit-IP discovery over a list of plain endpoints
pub struct ExitDiscovery {
    tier: SequentialTier,
    cdn: Arc<CdnRanges>,
    endpoints: Vec<String>,
}

impl ExitDiscovery {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        cdn: Arc<CdnRanges>,
        config: &ResolverConfig,
    ) -> Self {
        Self {
            tier: SequentialTier::new(
                "exit discovery",
                transport,
                config.grace_attempts,
                config.grace_timeout(),
            ),
            cdn,
            endpoints: config.ip_apis.clone(),
        }
    }

    /// Discover the caller's exit address
    ///
    /// # Returns
    ///
    /// - `Ok(AddressRecord)`: at least one family populated, `is_cdn` set
    /// - `Err(Error::NoAddressFound)`: every endpoint tried (or the grace
    ///   budget spent) without a usable answer
    pub async fn discover(&self, cancel: &CancellationToken) -> Result<AddressRecord> {
        let mut record = self
            .tier
            .first_success(&self.endpoints, cancel, |url: &str| HttpRequest::get(url), |url, response| {
                let response = require_ok(url, response)?;
                let record = parse_exit_body(&response.body, response.is_json());
                if record.is_empty() {
                    return Err(Error::soft_failure(url, "no address in body"));
                }
                Ok(record)
            })
            .await
            .ok_or(Error::NoAddressFound)?;

        self.cdn.mark(&mut record);
        debug!(
            "Discovered exit address ipv4={:?} ipv6={:?} cdn={}",
            record.ipv4, record.ipv6, record.is_cdn
        );
        Ok(record)
    }
}
