// # exitgeod - Exit Geolocation Daemon
//
// CRITICAL RULES:
// - This is a THIN integration layer ONLY
// - DO NOT add discovery, lookup or classification logic here
// - All resolution logic MUST be in exitgeo-core
// - Configuration is via environment variables ONLY
//
// The exitgeod daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing the runtime
// 3. Loading the CDN range table and the geo database
// 4. Serving the HTTP API until SIGTERM/SIGINT
//
// ## Configuration
//
// ### Server
// - `EXITGEO_ADDR`: Listen address (default 0.0.0.0:8099)
//
// ### Assets
// - `EXITGEO_MMDB_PATH`: MaxMind database file (default: search ./assets,
//   /usr/share/GeoIP, /var/lib/GeoIP)
// - `EXITGEO_CDN_CIDR_PATH`: CIDR list replacing the built-in Cloudflare ranges
//
// ### Resolution
// - `EXITGEO_HTTP_TIMEOUT_SECS`: Per-request timeout (default 10)
// - `EXITGEO_RESOLVE_TIMEOUT_SECS`: Deadline of one resolution (default 5)
// - `EXITGEO_PROBE_TIMEOUT_SECS`: Deadline of one relay probe (default 10)
// - `EXITGEO_EXCLUDE_GEO_COUNTRIES`: Comma-separated codes ignored from geo APIs
// - `EXITGEO_ACCEPT_INVALID_CERTS`: Skip TLS verification (default false)
//
// ### Logging
// - `EXITGEO_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export EXITGEO_ADDR=127.0.0.1:8099
// export EXITGEO_MMDB_PATH=/var/lib/GeoIP/GeoLite2-City.mmdb
// export EXITGEO_EXCLUDE_GEO_COUNTRIES=CN
//
// exitgeod
// curl http://127.0.0.1:8099/api
// ```

mod api;
mod config;

use anyhow::{Context, Result};
use config::Config;
use exitgeo_cloudflare::CloudflareTraceProber;
use exitgeo_core::{CdnRanges, GeoDatabase, Resolver};
use exitgeo_http::ReqwestTransport;
use exitgeo_mmdb::MaxMindDatabase;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum ExitgeoExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<ExitgeoExitCode> for ExitCode {
    fn from(code: ExitgeoExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ExitgeoExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ExitgeoExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.level().unwrap_or(Level::INFO))
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ExitgeoExitCode::ConfigError.into();
    }

    info!("Starting exitgeod daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ExitgeoExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {:#}", e);
            ExitgeoExitCode::RuntimeError
        } else {
            ExitgeoExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let resolver_config = config.resolver_config();

    let transport = Arc::new(
        ReqwestTransport::builder()
            .timeout(config.http_timeout())
            .accept_invalid_certs(config.accept_invalid_certs)
            .build()?,
    );

    let cdn = Arc::new(load_cdn_ranges(&config)?);
    info!("CDN range table: {} networks", cdn.len());

    let database = open_database(&config);
    let prober = Arc::new(CloudflareTraceProber::new(transport.clone(), &resolver_config));

    let resolver = Arc::new(Resolver::new(transport, prober, cdn, database, resolver_config)?);

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.addr))?;
    info!("Listening on {}", config.addr);

    let shutdown_resolver = resolver.clone();
    axum::serve(listener, api::router(resolver))
        .with_graceful_shutdown(async move {
            match wait_for_shutdown().await {
                Ok(signal) => info!("Received shutdown signal: {}", signal),
                Err(e) => error!("Shutdown error: {}", e),
            }
            // In-flight resolutions end at their next cancellation check
            shutdown_resolver.close();
        })
        .await
        .context("HTTP server failed")?;

    info!("Shutting down daemon");
    Ok(())
}

fn load_cdn_ranges(config: &Config) -> Result<CdnRanges> {
    match config.cdn_cidr_path {
        Some(ref path) => CdnRanges::from_file(path)
            .with_context(|| format!("Failed to load CDN ranges from {}", path.display())),
        None => Ok(CdnRanges::embedded()),
    }
}

/// A missing database is not fatal; lookups then use the geo API tier
fn open_database(config: &Config) -> Option<Arc<dyn GeoDatabase>> {
    let opened = match config.mmdb_path {
        Some(ref path) => MaxMindDatabase::open(path),
        None => MaxMindDatabase::open_default(),
    };

    match opened {
        Ok(database) => Some(Arc::new(database)),
        Err(e) => {
            warn!("Geo database not loaded ({}), continuing without it", e);
            None
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
