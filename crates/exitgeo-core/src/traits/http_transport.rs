// # HTTP Transport Trait
//
// Defines the single outbound capability every tier uses.
//
// ## Implementations
//
// - reqwest-based: `exitgeo-http` crate
// - Scripted doubles in the contract tests
//
// ## Usage
//
// ```rust,ignore
// use exitgeo_core::traits::{HttpRequest, HttpTransport};
//
// async fn fetch(transport: &dyn HttpTransport) -> exitgeo_core::Result<()> {
//     let response = transport.execute(HttpRequest::get("https://ipinfo.io/ip")).await?;
//     if response.is_success() {
//         println!("{}", response.body.trim());
//     }
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::time::Duration;

/// Request method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
}

/// Which header set the transport should attach
///
/// Endpoints are picky about what they answer. The transport owns the
/// actual header values; the core only says which family of client it
/// wants to look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderProfile {
    /// Desktop browser headers with a random User-Agent
    #[default]
    Api,
    /// Browser headers plus `Origin: https://www.cloudflare.com`
    CdnTrace,
    /// Postman-style client (`User-Agent: PostmanRuntime/...`, `Accept: */*`)
    Postman,
}

/// One outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub profile: HeaderProfile,
    /// Overrides the transport's default per-call timeout
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// GET with the default profile
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            profile: HeaderProfile::Api,
            timeout: None,
        }
    }

    /// HEAD with the default profile
    pub fn head(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Head,
            ..Self::get(url)
        }
    }

    pub fn with_profile(mut self, profile: HeaderProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// What came back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Raw `Content-Type` header, if any
    pub content_type: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, content_type: Option<&str>, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the server declared a JSON body
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
    }
}

/// Trait for HTTP transport implementations
///
/// The transport performs exactly one request per call. It does not retry,
/// does not follow tier logic and does not interpret bodies.
///
/// # Errors vs. statuses
///
/// - Connection, TLS and timeout failures are `Err(Error::Http)`
/// - Any response that arrived, whatever its status, is `Ok(HttpResponse)`
///
/// Callers decide what a 403 or a 429 means for them.
///
/// # Cancellation
///
/// Futures returned by `execute` must be safe to drop at any await point.
/// Tiers race them against a cancellation token and abandon the loser.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue one request
    ///
    /// # Parameters
    ///
    /// - `request`: method, URL, header profile and optional timeout override
    ///
    /// # Returns
    ///
    /// - `Ok(HttpResponse)`: a response arrived (any status)
    /// - `Err(Error)`: the request never produced a response
    async fn execute(&self, request: HttpRequest) -> crate::Result<HttpResponse>;
}
