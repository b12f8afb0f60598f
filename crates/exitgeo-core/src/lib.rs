// # exitgeo-core
//
// Core library for exit-address discovery, geolocation and relay
// classification.
//
// ## Architecture Overview
//
// This library answers "where does my traffic appear to come from?":
// - **ExitDiscovery**: asks public endpoints for the caller's exit address
// - **LocalGeoLookup**: places an address with a local geo database
// - **GeoApiTier**: rate-limited JSON endpoints used as a fallback
// - **CdnRanges**: decides whether an address belongs to Cloudflare
// - **RelayProbe**: asks a Cloudflare edge where it sees the caller
// - **classify**: turns all of the above into a compact relay tag
// - **Resolver**: sequences the tiers under one deadline
//
// ## Design Principles
//
// 1. **Capabilities as traits**: HTTP, the geo database and the relay probe
//    are injected, so every tier is testable with doubles
// 2. **Tolerant tiers**: a single endpoint failing is never an error; only an
//    exhausted tier is
// 3. **One deadline**: every call observes a cancellation token and leaves no
//    work running after it returns
// 4. **Library-First**: the daemon is a thin HTTP surface over `Resolver`

pub mod traits;
pub mod error;
pub mod config;
pub mod record;
pub mod cdn;
pub mod extract;
pub mod endpoints;
pub mod budget;
pub mod deadline;
mod tier;
pub mod discovery;
pub mod geo_api;
pub mod geo_lookup;
pub mod classify;
pub mod resolver;

// Re-export core types for convenience
pub use traits::{GeoDatabase, GeoLookup, HttpTransport, RelayProbe};
pub use error::{Error, Result};
pub use config::ResolverConfig;
pub use record::{AddressRecord, CheckResult, GeoRecord, RelayProbeResult};
pub use cdn::CdnRanges;
pub use classify::{Classification, RelayTag, classify};
pub use discovery::ExitDiscovery;
pub use geo_api::GeoApiTier;
pub use geo_lookup::LocalGeoLookup;
pub use resolver::{Analysis, Resolver};
