//! Test doubles and common utilities for contract tests
//!
//! Every capability the resolver needs is replaced by a scripted double
//! that counts its calls.

#![allow(dead_code)]

use exitgeo_core::error::{Error, Result};
use exitgeo_core::record::RelayProbeResult;
use exitgeo_core::traits::{
    GeoDatabase, GeoLookup, HttpRequest, HttpResponse, HttpTransport, RelayProbe,
};
use exitgeo_core::{CdnRanges, ResolverConfig};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What a scripted endpoint does
#[derive(Debug, Clone)]
pub enum Reply {
    Respond(HttpResponse),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Script {
    reply: Reply,
    delay: Option<Duration>,
}

/// HTTP transport answering from a per-URL script
///
/// Unscripted URLs fail like a refused connection.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Arc<AtomicUsize>,
    log: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(self, url: &str, body: &str) -> Self {
        self.respond(url, HttpResponse::new(200, Some("text/plain"), body))
    }

    pub fn json(self, url: &str, body: &str) -> Self {
        self.respond(url, HttpResponse::new(200, Some("application/json"), body))
    }

    pub fn status(self, url: &str, status: u16) -> Self {
        self.respond(url, HttpResponse::new(status, Some("text/plain"), ""))
    }

    pub fn fail(self, url: &str, reason: &str) -> Self {
        self.script(url, Reply::Fail(reason.to_string()), None)
    }

    pub fn respond(self, url: &str, response: HttpResponse) -> Self {
        self.script(url, Reply::Respond(response), None)
    }

    /// Answer `body` only after `delay`
    pub fn slow_text(self, url: &str, body: &str, delay: Duration) -> Self {
        self.script(
            url,
            Reply::Respond(HttpResponse::new(200, Some("text/plain"), body)),
            Some(delay),
        )
    }

    fn script(self, url: &str, reply: Reply, delay: Option<Duration>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), Script { reply, delay });
        self
    }

    /// Total number of execute() calls
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// How often `url` was requested
    pub fn calls_to(&self, url: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn requested(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(request.url.clone());

        let script = self.scripts.lock().unwrap().get(&request.url).cloned();
        let Some(script) = script else {
            return Err(Error::http(format!("connection refused: {}", request.url)));
        };

        if let Some(delay) = script.delay {
            tokio::time::sleep(delay).await;
        }

        match script.reply {
            Reply::Respond(response) => Ok(response),
            Reply::Fail(reason) => Err(Error::http(reason)),
        }
    }
}

/// Geo database backed by a fixed table
#[derive(Default)]
pub struct FixedGeoDatabase {
    table: HashMap<IpAddr, GeoLookup>,
    lookups: Arc<AtomicUsize>,
}

impl FixedGeoDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_country(mut self, ip: &str, country_code: &str) -> Self {
        self.table.insert(
            ip.parse().unwrap(),
            GeoLookup {
                country_code: country_code.to_string(),
                ..GeoLookup::default()
            },
        );
        self
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl GeoDatabase for FixedGeoDatabase {
    fn lookup(&self, ip: IpAddr) -> Result<Option<GeoLookup>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.table.get(&ip).cloned())
    }
}

/// Relay probe returning a fixed result, optionally after a delay
///
/// Honors cancellation: a cancelled probe returns an empty result.
pub struct FixedRelayProbe {
    result: RelayProbeResult,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl FixedRelayProbe {
    pub fn new(location: &str, address: &str) -> Self {
        Self {
            result: RelayProbeResult::new(location, address),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn silent() -> Self {
        Self::new("", "")
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RelayProbe for FixedRelayProbe {
    async fn probe(&self, cancel: &CancellationToken) -> RelayProbeResult {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::select! {
                _ = cancel.cancelled() => return RelayProbeResult::empty(),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.result.clone()
    }
}

/// Config pointing every tier at the given lists
pub fn config(ip_apis: &[&str], geo_apis: &[&str]) -> ResolverConfig {
    ResolverConfig::new()
        .with_ip_apis(ip_apis.iter().copied())
        .with_geo_apis(geo_apis.iter().copied())
        .with_trace_apis(["https://trace.example"])
}

pub fn cdn() -> Arc<CdnRanges> {
    Arc::new(CdnRanges::embedded())
}
