//! HTTP API over the resolver
//!
//! | Route | Answer |
//! |---|---|
//! | `GET /api` | full analysis of the daemon's own exit address |
//! | `GET /api?ip=..` | analysis of the given address |
//! | `GET /api/ip` | `{"ip": ..}` only |
//! | `GET /api/:ip` | analysis of the given address |
//! | `GET /healthz` | `{"status": "ok"}` |
//!
//! Error bodies carry a fixed message; endpoint error text stays in the logs.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use exitgeo_core::{CheckResult, Error, Resolver};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Default, Deserialize)]
pub struct IpQuery {
    ip: Option<String>,
}

impl IpQuery {
    fn target(&self) -> Option<&str> {
        self.ip.as_deref().map(str::trim).filter(|ip| !ip.is_empty())
    }
}

/// Failure as seen by API clients
#[derive(Debug)]
pub enum ApiError {
    BadRequest(&'static str),
    Internal(&'static str),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidAddress(_) => Self::BadRequest("invalid IP address"),
            Error::NoAddressFound => Self::Internal("no valid IP address found"),
            other => {
                warn!("Request failed: {}", other);
                Self::Internal("lookup failed")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Build the router
pub fn router(resolver: Arc<Resolver>) -> Router {
    Router::new()
        .route("/api", get(current_or_query))
        .route("/api/ip", get(current_ip))
        .route("/api/:ip", get(resolve_path))
        .route("/healthz", get(healthz))
        .with_state(resolver)
}

async fn current_or_query(
    State(resolver): State<Arc<Resolver>>,
    Query(query): Query<IpQuery>,
) -> ApiResult<CheckResult> {
    let result = match query.target() {
        Some(ip) => resolver.resolve(ip).await?,
        None => resolver.current_ip_info().await?,
    };
    Ok(Json(result))
}

async fn current_ip(State(resolver): State<Arc<Resolver>>) -> ApiResult<serde_json::Value> {
    let ip = resolver.current_ip().await?;
    Ok(Json(json!({ "ip": ip })))
}

async fn resolve_path(
    State(resolver): State<Arc<Resolver>>,
    Path(ip): Path<String>,
    Query(query): Query<IpQuery>,
) -> ApiResult<CheckResult> {
    // The query parameter wins over the path segment
    let target = query.target().unwrap_or(ip.as_str());
    Ok(Json(resolver.resolve(target).await?))
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
