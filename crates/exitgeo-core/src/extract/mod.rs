//! Response body extractors
//!
//! Pure functions from raw endpoint bodies to typed values:
//!
//! - [`scan_addresses`]: linear scan of free text for the first IPv4 and IPv6
//! - [`parse_exit_body`]: exit-IP endpoint bodies (JSON or text) into an address record
//! - [`parse_geo_body`]: geo endpoint JSON into address + country code

mod scanner;
mod exit_body;
mod geo_body;

pub use scanner::scan_addresses;
pub use exit_body::{parse_exit_body, EXIT_JSON_FIELDS};
pub use geo_body::{parse_geo_body, GeoFields};
