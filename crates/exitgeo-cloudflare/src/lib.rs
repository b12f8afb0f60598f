// # Cloudflare Relay Prober
//
// This crate provides the `RelayProbe` that asks Cloudflare edges where
// they see the caller.
//
// ## How it works
//
// Every Cloudflare-fronted site answers `GET /cdn-cgi/trace` with a plain
// text report containing, among others, `ip=` (the address the edge saw)
// and `loc=` (the country the edge placed it in). Any such site gives the
// same information, so a handful of them are raced:
//
// 1. Shuffle the trace bases, keep at most `probe_fanout`
// 2. One task per base, each trying up to `probe_attempts` times
// 3. The first complete report is delivered through a single-slot channel
//    and cancels every sibling
// 4. The caller's token firing first yields an empty result
//
// An empty result is an answer ("no relay signal"), never an error.
//
// ## Reachability
//
// `check_reachability` adds a `HEAD https://www.cloudflare.com` when the
// race produced nothing, to tell "Cloudflare is blocked" apart from
// "Cloudflare refused to proxy itself".

use exitgeo_core::deadline::until_cancelled;
use exitgeo_core::endpoints::{shuffled, trace_url};
use exitgeo_core::record::RelayProbeResult;
use exitgeo_core::traits::{HeaderProfile, HttpRequest, HttpResponse, HttpTransport, RelayProbe};
use exitgeo_core::{ResolverConfig, Result};

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Probed when the trace race yields nothing
pub const CLOUDFLARE_HOME: &str = "https://www.cloudflare.com";

/// Bound on the reachability HEAD request
const REACHABILITY_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport error fragments that mean the connection reached Cloudflare
const REACHABLE_ERROR_HINTS: &[&str] = &["eof", "tls", "connection reset"];

/// Single-slot result channel; the first `take()` wins
type Slot = Arc<Mutex<Option<oneshot::Sender<RelayProbeResult>>>>;

/// Outcome of [`CloudflareTraceProber::check_reachability`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudflareReachability {
    pub reachable: bool,
    /// The trace report, empty when no edge answered
    pub probe: RelayProbeResult,
}

/// Concurrent `/cdn-cgi/trace` prober
pub struct CloudflareTraceProber {
    transport: Arc<dyn HttpTransport>,
    endpoints: Vec<String>,
    fanout: usize,
    attempts: usize,
}

impl CloudflareTraceProber {
    /// Create a prober from the resolver configuration
    ///
    /// Uses `trace_apis`, `probe_fanout` and `probe_attempts`.
    pub fn new(transport: Arc<dyn HttpTransport>, config: &ResolverConfig) -> Self {
        Self {
            transport,
            endpoints: config.trace_apis.clone(),
            fanout: config.probe_fanout.max(1),
            attempts: config.probe_attempts.max(1),
        }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Probe, then fall back to a plain reachability check
    ///
    /// # Returns
    ///
    /// - `reachable: true` with a non-empty probe when an edge answered
    /// - `reachable: true` with an empty probe when www.cloudflare.com
    ///   answered 2xx/403, or the connection failed in a way that shows it
    ///   reached Cloudflare (EOF, TLS, reset)
    /// - `reachable: false` otherwise
    pub async fn check_reachability(&self, cancel: &CancellationToken) -> CloudflareReachability {
        let probe = self.probe(cancel).await;
        if !probe.is_empty() {
            debug!("Cloudflare edge answered: loc={} ip={}", probe.location, probe.address);
            return CloudflareReachability {
                reachable: true,
                probe,
            };
        }

        let request = HttpRequest::head(CLOUDFLARE_HOME)
            .with_profile(HeaderProfile::CdnTrace)
            .with_timeout(REACHABILITY_TIMEOUT);
        let reachable =
            match tokio::time::timeout(REACHABILITY_TIMEOUT, self.transport.execute(request)).await
            {
                Ok(outcome) => is_reachable(&outcome),
                Err(_) => false,
            };

        if reachable {
            debug!("Cloudflare reachable, but no edge report");
        }

        CloudflareReachability { reachable, probe }
    }
}

#[async_trait::async_trait]
impl RelayProbe for CloudflareTraceProber {
    async fn probe(&self, cancel: &CancellationToken) -> RelayProbeResult {
        if cancel.is_cancelled() {
            return RelayProbeResult::empty();
        }

        let mut candidates = shuffled(&self.endpoints);
        candidates.truncate(self.fanout);
        if candidates.is_empty() {
            return RelayProbeResult::empty();
        }

        let race = cancel.child_token();
        let (tx, rx) = oneshot::channel();
        let slot: Slot = Arc::new(Mutex::new(Some(tx)));

        let mut tasks = JoinSet::new();
        for base in candidates {
            tasks.spawn(race_endpoint(
                self.transport.clone(),
                trace_url(&base),
                self.attempts,
                race.clone(),
                slot.clone(),
            ));
        }
        // Only the tasks hold the sender now; once they all give up the
        // receiver sees the channel close.
        drop(slot);

        let result = tokio::select! {
            biased;
            delivered = rx => delivered.unwrap_or_default(),
            _ = race.cancelled() => RelayProbeResult::empty(),
        };

        race.cancel();
        tasks.shutdown().await;

        if result.is_empty() {
            debug!("No Cloudflare edge answered");
        }
        result
    }
}

/// One candidate: up to `attempts` trace requests
async fn race_endpoint(
    transport: Arc<dyn HttpTransport>,
    url: String,
    attempts: usize,
    race: CancellationToken,
    slot: Slot,
) {
    for attempt in 1..=attempts {
        if race.is_cancelled() {
            return;
        }

        let request = HttpRequest::get(url.as_str()).with_profile(HeaderProfile::CdnTrace);
        let Some(outcome) = until_cancelled(&race, transport.execute(request)).await else {
            return;
        };

        match outcome {
            Ok(response) if response.status == 200 => {
                let report = parse_trace(&response.body);
                if !report.is_empty() {
                    if deliver(&slot, report) {
                        debug!("{} won the trace race", url);
                    }
                    race.cancel();
                    return;
                }
                debug!("{} attempt {}: incomplete trace", url, attempt);
            }
            Ok(response) => debug!("{} attempt {}: status {}", url, attempt, response.status),
            Err(e) => debug!("{} attempt {}: {}", url, attempt, e),
        }
    }
}

fn deliver(slot: &Mutex<Option<oneshot::Sender<RelayProbeResult>>>, report: RelayProbeResult) -> bool {
    let sender = match slot.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => {
            warn!("Trace result slot poisoned");
            poisoned.into_inner().take()
        }
    };

    sender.is_some_and(|tx| tx.send(report).is_ok())
}

/// Extract `loc=` and `ip=` from a trace body
///
/// Later lines override earlier ones. Either field may come back empty.
pub fn parse_trace(body: &str) -> RelayProbeResult {
    let mut report = RelayProbeResult::empty();
    for line in body.lines() {
        let line = line.trim();
        if let Some(loc) = line.strip_prefix("loc=") {
            report.location = loc.to_string();
        } else if let Some(ip) = line.strip_prefix("ip=") {
            report.address = ip.to_string();
        }
    }
    report
}

/// Whether a HEAD outcome shows Cloudflare is reachable
pub fn is_reachable(outcome: &Result<HttpResponse>) -> bool {
    match outcome {
        Ok(response) => response.is_success() || response.status == 403,
        Err(e) => {
            let message = e.to_string().to_ascii_lowercase();
            REACHABLE_ERROR_HINTS.iter().any(|hint| message.contains(hint))
        }
    }
}
