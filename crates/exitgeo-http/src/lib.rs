// # HTTP Transport
//
// This crate provides the reqwest-based `HttpTransport` used by every
// resolver tier.
//
// ## Purpose
//
// Public "what is my IP" and geo endpoints are picky about who they
// answer. The transport attaches a browser-like header set per request,
// selected by the request's `HeaderProfile`:
//
// - `Api`: desktop browser headers with a random User-Agent
// - `CdnTrace`: the same plus `Origin: https://www.cloudflare.com`
// - `Postman`: a Postman client identity (checkip.info refuses browsers)
//
// ## Architecture
//
// One `reqwest::Client` is built up front and shared by all calls. The
// client timeout is the default; a request may carry a shorter one.

use exitgeo_core::traits::{HeaderProfile, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use exitgeo_core::{Error, Result};

use rand::seq::SliceRandom;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

/// Default per-call timeout
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

const POSTMAN_USER_AGENT: &str = "PostmanRuntime/7.32.3";

const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

const SEC_CH_UA: &str =
    "\"Chromium\";v=\"122\", \"Google Chrome\";v=\"122\", \"Not A(Brand\";v=\"99\"";

const CLOUDFLARE_ORIGIN: &str = "https://www.cloudflare.com";

/// Desktop User-Agents rotated per request
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36 Edg/121.0.0.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:123.0) Gecko/20100101 Firefox/123.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_3) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.3 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:122.0) Gecko/20100101 Firefox/122.0",
];

/// reqwest-backed transport
#[derive(Clone)]
pub struct ReqwestTransport {
    /// Shared HTTP client
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with the default timeout and certificate checks on
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Wrap an already configured client
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Builder for [`ReqwestTransport`]
#[derive(Debug, Clone)]
pub struct ReqwestTransportBuilder {
    timeout: Duration,
    accept_invalid_certs: bool,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HTTP_TIMEOUT,
            accept_invalid_certs: false,
        }
    }
}

impl ReqwestTransportBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Accept self-signed or expired certificates
    ///
    /// Some endpoints are reached through intercepting proxies; off by default.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn build(self) -> Result<ReqwestTransport> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        if self.accept_invalid_certs {
            tracing::warn!("TLS certificate verification is disabled");
        }

        Ok(ReqwestTransport { client })
    }
}

/// Header set for one profile
///
/// The User-Agent is picked at random for the browser profiles.
pub fn profile_headers(profile: HeaderProfile) -> Vec<(&'static str, String)> {
    if profile == HeaderProfile::Postman {
        return vec![
            ("User-Agent", POSTMAN_USER_AGENT.to_string()),
            ("Accept", "*/*".to_string()),
            ("Accept-Language", "en-US,en;q=0.5".to_string()),
            ("Connection", "close".to_string()),
        ];
    }

    let user_agent = USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0]);

    let mut headers = vec![
        ("User-Agent", user_agent.to_string()),
        ("Accept-Language", "en-US,en;q=0.5".to_string()),
        ("Accept", BROWSER_ACCEPT.to_string()),
        ("Sec-Ch-Ua", SEC_CH_UA.to_string()),
        ("Sec-Ch-Ua-Mobile", "?0".to_string()),
        ("Sec-Ch-Ua-Platform", "\"Windows\"".to_string()),
        ("Connection", "close".to_string()),
    ];
    if profile == HeaderProfile::CdnTrace {
        headers.push(("Origin", CLOUDFLARE_ORIGIN.to_string()));
    }
    headers
}

/// reqwest's Display hides the cause; callers match on it
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Head => self.client.head(&request.url),
        };

        for (name, value) in profile_headers(request.profile) {
            builder = builder.header(name, value);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::http(format!("{} {}", request.url, describe(&e))))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = match request.method {
            HttpMethod::Head => String::new(),
            HttpMethod::Get => response.text().await.map_err(|e| {
                Error::http(format!("Failed to read response from {}: {}", request.url, describe(&e)))
            })?,
        };

        tracing::trace!("{} answered {} ({} bytes)", request.url, status, body.len());

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}
