//! Test doubles for the trace prober contract tests

#![allow(dead_code)]

use exitgeo_core::error::{Error, Result};
use exitgeo_core::traits::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use exitgeo_core::ResolverConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Script {
    outcome: std::result::Result<HttpResponse, String>,
    delay: Duration,
}

/// Decrements the in-flight counter when a request future is dropped
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Transport answering from a per-URL script
///
/// Tracks how many requests are running, so tests can check that nothing
/// outlives a probing round.
#[derive(Default)]
pub struct TraceTransport {
    scripts: Mutex<HashMap<String, Script>>,
    calls: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
    log: Mutex<Vec<(HttpMethod, String)>>,
}

impl TraceTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{base}/cdn-cgi/trace` answers with `loc` and `ip` after `delay`
    pub fn edge(self, base: &str, loc: &str, ip: &str, delay: Duration) -> Self {
        let body = format!("fl=1\nip={}\nts=0\nloc={}\nwarp=off\n", ip, loc);
        self.script(
            &trace(base),
            Ok(HttpResponse::new(200, Some("text/plain"), body)),
            delay,
        )
    }

    pub fn status(self, url: &str, status: u16) -> Self {
        self.script(url, Ok(HttpResponse::new(status, None, "")), Duration::ZERO)
    }

    pub fn body(self, url: &str, body: &str) -> Self {
        self.script(
            url,
            Ok(HttpResponse::new(200, Some("text/plain"), body)),
            Duration::ZERO,
        )
    }

    pub fn fail(self, url: &str, reason: &str) -> Self {
        self.script(url, Err(reason.to_string()), Duration::ZERO)
    }

    fn script(
        self,
        url: &str,
        outcome: std::result::Result<HttpResponse, String>,
        delay: Duration,
    ) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), Script { outcome, delay });
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, u)| u == url)
            .count()
    }

    pub fn distinct_urls(&self) -> usize {
        let log = self.log.lock().unwrap();
        let mut urls: Vec<&String> = log.iter().map(|(_, u)| u).collect();
        urls.sort();
        urls.dedup();
        urls.len()
    }

    pub fn methods(&self) -> Vec<HttpMethod> {
        self.log.lock().unwrap().iter().map(|(m, _)| *m).collect()
    }
}

#[async_trait::async_trait]
impl HttpTransport for TraceTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight(self.in_flight.clone());
        self.log
            .lock()
            .unwrap()
            .push((request.method, request.url.clone()));

        let script = self.scripts.lock().unwrap().get(&request.url).cloned();
        let Some(script) = script else {
            return Err(Error::http(format!("connection refused: {}", request.url)));
        };

        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }

        script.outcome.map_err(Error::http)
    }
}

pub fn trace(base: &str) -> String {
    format!("{}/cdn-cgi/trace", base)
}

pub fn bases(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("https://edge{}.example", i)).collect()
}

pub fn config(bases: &[String]) -> ResolverConfig {
    ResolverConfig::new().with_trace_apis(bases.iter().cloned())
}
