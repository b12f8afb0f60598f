// # Geo Database Trait
//
// Defines read access to a local binary geo database.
//
// ## Implementations
//
// - MaxMind MMDB: `exitgeo-mmdb` crate
//
// Handles are opened once and shared read-only across concurrent
// resolutions (`Arc<dyn GeoDatabase>`).

use std::net::IpAddr;

/// Location fields read from one database record
///
/// Every field is optional in the source data; empty strings and `None`
/// mean "the database did not say".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoLookup {
    pub country_code: String,
    pub country_name: String,
    pub continent_code: String,
    pub region: String,
    pub region_code: String,
    pub city: String,
    pub postal_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub time_zone: String,
}

/// Trait for geo database implementations
///
/// Lookups are synchronous, in-memory reads. Implementations must be
/// thread-safe.
pub trait GeoDatabase: Send + Sync {
    /// Look up one address
    ///
    /// # Returns
    ///
    /// - `Ok(Some(GeoLookup))`: the database holds a record for `ip`
    /// - `Ok(None)`: lookup miss
    /// - `Err(Error)`: the database could not be read or decoded
    fn lookup(&self, ip: IpAddr) -> crate::Result<Option<GeoLookup>>;

    /// Short description for logs (file name, schema)
    fn describe(&self) -> String {
        "geo database".to_string()
    }
}
