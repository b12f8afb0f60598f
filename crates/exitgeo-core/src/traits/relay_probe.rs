// # Relay Probe Trait
//
// Defines how the orchestrator asks a CDN edge where it sees the caller.
//
// ## Implementations
//
// - Cloudflare `/cdn-cgi/trace` race: `exitgeo-cloudflare` crate

use crate::record::RelayProbeResult;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Trait for relay probe implementations
///
/// A probe never fails. An empty [`RelayProbeResult`] means no edge
/// answered usefully before `cancel` fired or every candidate gave up.
#[async_trait]
pub trait RelayProbe: Send + Sync {
    /// Run one probing round
    ///
    /// # Parameters
    ///
    /// - `cancel`: fires when the caller's deadline passes; the probe must
    ///   return promptly afterwards and leave no work running
    ///
    /// # Returns
    ///
    /// The first complete edge report, or an empty result
    async fn probe(&self, cancel: &CancellationToken) -> RelayProbeResult;
}
