//! Capability traits for exitgeo
//!
//! This module defines the seams the core reaches the outside world through.
//!
//! - [`HttpTransport`]: issue one HTTP request
//! - [`GeoDatabase`]: read a local geo database
//! - [`RelayProbe`]: ask the Cloudflare edge where it sees us

pub mod http_transport;
pub mod geo_database;
pub mod relay_probe;

pub use http_transport::{HeaderProfile, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
pub use geo_database::{GeoDatabase, GeoLookup};
pub use relay_probe::RelayProbe;
