//! Local geo lookup adapter
//!
//! Decorates records from the shared read-only geo database handle.

use crate::error::{Error, Result};
use crate::record::GeoRecord;
use crate::traits::GeoDatabase;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

/// Adapter over an optional database handle
///
/// A resolver without a database still works; every decoration then fails
/// with [`Error::DatabaseUnavailable`] and the caller falls through to the
/// geo-API tier.
#[derive(Clone, Default)]
pub struct LocalGeoLookup {
    database: Option<Arc<dyn GeoDatabase>>,
}

impl LocalGeoLookup {
    pub fn new(database: Option<Arc<dyn GeoDatabase>>) -> Self {
        Self { database }
    }

    pub fn is_available(&self) -> bool {
        self.database.is_some()
    }

    /// Fill the location fields of `record` from the database
    ///
    /// The IPv4 field is looked up when present, the IPv6 field otherwise.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: lookup ran; on a miss the record is left unchanged
    /// - `Err(Error::DatabaseUnavailable)`: no handle configured
    /// - `Err(Error::InvalidAddress)`: the record holds no address
    pub fn decorate(&self, record: &mut GeoRecord) -> Result<()> {
        let database = self.database.as_ref().ok_or(Error::DatabaseUnavailable)?;
        let ip = record
            .address
            .primary()
            .ok_or_else(|| Error::invalid_address("record holds no address"))?;

        match database.lookup(ip)? {
            Some(lookup) => record.apply_lookup(&lookup),
            None => debug!("No database entry for {}", ip),
        }
        Ok(())
    }

    /// Country code only
    ///
    /// `Ok(None)` covers both a lookup miss and a record without a code.
    pub fn lookup_country(&self, ip: IpAddr) -> Result<Option<String>> {
        let database = self.database.as_ref().ok_or(Error::DatabaseUnavailable)?;
        Ok(database
            .lookup(ip)?
            .and_then(|lookup| crate::record::normalize_country_code(&lookup.country_code)))
    }
}

impl std::fmt::Debug for LocalGeoLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalGeoLookup")
            .field(
                "database",
                &self.database.as_ref().map(|db| db.describe()),
            )
            .finish()
    }
}
