//! Relay classifier and tag encoder
//!
//! Combines the exit record's CDN membership with what a Cloudflare edge
//! reported into one of four tag shapes. The glyphs are part of the output
//! format:
//!
//! | Tag | Meaning |
//! |---|---|
//! | `XX²` | exit not in a CDN range; direct geolocation trusted |
//! | `XX⁻¹` | exit in a CDN range, no edge could corroborate it |
//! | `XX¹⁺` | exit in a CDN range, edge reports the same country |
//! | `XX¹-YY⁰` | exit in a CDN range, edge is a distinct CDN address in country YY |

use crate::cdn::CdnRanges;
use crate::record::{GeoRecord, RelayProbeResult};
use std::fmt;

/// One of the four tag shapes, carrying the countries it prints
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayTag {
    /// `{exit}²`
    Direct { exit: String },
    /// `{exit}⁻¹`
    Unverified { exit: String },
    /// `{exit}¹⁺`
    EdgeAgrees { exit: String },
    /// `{exit}¹-{edge}⁰`
    EdgeDiffers { exit: String, edge: String },
}

impl RelayTag {
    /// Whether this shape reports a relay
    pub fn is_relay(&self) -> bool {
        !matches!(self, Self::Direct { .. })
    }

    /// The exit country the tag was built from
    pub fn exit_country(&self) -> &str {
        match self {
            Self::Direct { exit }
            | Self::Unverified { exit }
            | Self::EdgeAgrees { exit }
            | Self::EdgeDiffers { exit, .. } => exit,
        }
    }
}

impl fmt::Display for RelayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct { exit } => write!(f, "{}²", exit),
            Self::Unverified { exit } => write!(f, "{}⁻¹", exit),
            Self::EdgeAgrees { exit } => write!(f, "{}¹⁺", exit),
            Self::EdgeDiffers { exit, edge } => write!(f, "{}¹-{}⁰", exit, edge),
        }
    }
}

/// Outcome of classifying one exit record against one probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_relay: bool,
    pub tag: RelayTag,
}

/// Classify an exit record against a probe result
///
/// Rules, first match wins:
///
/// 1. exit not in a CDN range: `Direct`
/// 2. probe empty: `Unverified`
/// 3. edge country equals exit country: `EdgeAgrees`
/// 4. edge address is itself in a CDN range and is not the exit address:
///    `EdgeDiffers`
/// 5. otherwise: `Direct` (the edge could not corroborate a distinct relay)
///
/// The edge/exit address comparison is same-family equality on the
/// discovered fields.
pub fn classify(exit: &GeoRecord, probe: &RelayProbeResult, cdn: &CdnRanges) -> Classification {
    let exit_country = exit.country_code.clone();

    let tag = if !exit.address.is_cdn {
        RelayTag::Direct { exit: exit_country }
    } else if probe.is_empty() {
        RelayTag::Unverified { exit: exit_country }
    } else {
        let edge_country = probe.location.trim().to_ascii_uppercase();
        let edge_ip = probe.edge_ip();
        let edge_is_cdn = edge_ip.is_some_and(|ip| cdn.contains(ip));
        let same_address = edge_ip.is_some_and(|ip| exit.address.holds(ip));

        if edge_country == exit_country {
            RelayTag::EdgeAgrees { exit: exit_country }
        } else if edge_is_cdn && !same_address {
            RelayTag::EdgeDiffers {
                exit: exit_country,
                edge: edge_country,
            }
        } else {
            RelayTag::Direct { exit: exit_country }
        }
    };

    Classification {
        is_relay: tag.is_relay(),
        tag,
    }
}
