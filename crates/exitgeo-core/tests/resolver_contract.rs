//! Contract Test: Resolution Orchestrator
//!
//! Constraints verified:
//! - Discovery, local lookup and the geo-API tier are sequenced in order
//! - A missing country is not an error; a missing address is
//! - The relay probe runs alongside discovery and is bounded by the deadline
//! - Caller-supplied addresses skip discovery
//! - A closed resolver starts no new work

mod common;

use common::*;
use exitgeo_core::record::RelayProbeResult;
use exitgeo_core::{Error, GeoDatabase, RelayProbe, Resolver, ResolverConfig};
use std::sync::Arc;
use std::time::Duration;

const IP_API: &str = "https://ip.example/";
const GEO_API: &str = "https://geo.example/json";

fn resolver(
    transport: Arc<ScriptedTransport>,
    probe: Arc<FixedRelayProbe>,
    database: Option<Arc<FixedGeoDatabase>>,
    config: ResolverConfig,
) -> Resolver {
    Resolver::new(
        transport,
        probe as Arc<dyn RelayProbe>,
        cdn(),
        database.map(|db| db as Arc<dyn GeoDatabase>),
        config,
    )
    .unwrap()
}

#[tokio::test]
async fn direct_exit_placed_by_local_database() {
    let transport = Arc::new(ScriptedTransport::new().text(IP_API, "45.65.122.98"));
    let probe = Arc::new(FixedRelayProbe::new("US", "45.65.122.98"));
    let database = Arc::new(FixedGeoDatabase::new().with_country("45.65.122.98", "US"));
    let resolver = resolver(
        transport.clone(),
        probe,
        Some(database.clone()),
        config(&[IP_API], &[GEO_API]),
    );

    let result = resolver.current_ip_info().await.unwrap();

    assert_eq!(result.ip, "45.65.122.98");
    assert_eq!(result.country_code, "US");
    assert!(!result.is_cdn);
    assert_eq!(result.location.as_deref(), Some("US"));
    assert_eq!(result.tag.as_deref(), Some("US²"));
    assert_eq!(transport.calls_to(GEO_API), 0, "geo API not needed");
    assert_eq!(database.lookup_count(), 1);
}

#[tokio::test]
async fn database_miss_falls_back_to_geo_api() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .text(IP_API, "45.65.122.98")
            .json(GEO_API, r#"{"ip": "45.65.122.98", "country": "DE"}"#),
    );
    let probe = Arc::new(FixedRelayProbe::silent());
    let database = Arc::new(FixedGeoDatabase::new());
    let resolver = resolver(
        transport.clone(),
        probe,
        Some(database),
        config(&[IP_API], &[GEO_API]),
    );

    let result = resolver.current_ip_info().await.unwrap();

    assert_eq!(result.country_code, "DE");
    assert_eq!(result.tag.as_deref(), Some("DE²"));
    assert_eq!(transport.calls_to(GEO_API), 1);
}

#[tokio::test]
async fn geo_api_without_address_keeps_discovered_one() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .text(IP_API, "45.65.122.98")
            .json(GEO_API, r#"{"datacenter": {"country_code": "FR"}}"#),
    );
    let resolver = resolver(
        transport,
        Arc::new(FixedRelayProbe::silent()),
        None,
        config(&[IP_API], &[GEO_API]),
    );

    let analysis = resolver.analyze(None).await.unwrap();

    assert_eq!(analysis.record.country_code, "FR");
    assert_eq!(
        analysis.record.address.ipv4,
        Some("45.65.122.98".parse().unwrap())
    );
}

#[tokio::test]
async fn missing_country_is_not_fatal() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .text(IP_API, "45.65.122.98")
            .status(GEO_API, 429),
    );
    let resolver = resolver(
        transport,
        Arc::new(FixedRelayProbe::silent()),
        None,
        config(&[IP_API], &[GEO_API]),
    );

    let result = resolver.current_ip_info().await.unwrap();

    assert_eq!(result.ip, "45.65.122.98");
    assert_eq!(result.country_code, "");
    assert_eq!(result.location, None);
    assert_eq!(result.tag.as_deref(), Some("²"));
}

#[tokio::test]
async fn no_address_anywhere_is_an_error() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .status(IP_API, 500)
            .json(GEO_API, r#"{"country_code": "US"}"#),
    );
    let resolver = resolver(
        transport,
        Arc::new(FixedRelayProbe::silent()),
        None,
        config(&[IP_API], &[GEO_API]),
    );

    let err = resolver.current_ip_info().await.unwrap_err();

    assert!(matches!(err, Error::NoAddressFound));
}

#[tokio::test]
async fn cdn_exit_with_agreeing_edge() {
    let transport = Arc::new(ScriptedTransport::new().text(IP_API, "104.28.163.56"));
    let database = Arc::new(FixedGeoDatabase::new().with_country("104.28.163.56", "US"));
    let resolver = resolver(
        transport,
        Arc::new(FixedRelayProbe::new("US", "45.65.122.98")),
        Some(database),
        config(&[IP_API], &[]),
    );

    let result = resolver.current_ip_info().await.unwrap();

    assert!(result.is_cdn);
    assert_eq!(result.tag.as_deref(), Some("US¹⁺"));
}

#[tokio::test(start_paused = true)]
async fn slow_probe_is_bounded_by_the_deadline() {
    let transport = Arc::new(ScriptedTransport::new().text(IP_API, "104.28.163.56"));
    let database = Arc::new(FixedGeoDatabase::new().with_country("104.28.163.56", "US"));
    let probe = Arc::new(FixedRelayProbe::new("JP", "104.28.9.9").after(Duration::from_secs(60)));
    let resolver = resolver(
        transport,
        probe.clone(),
        Some(database),
        config(&[IP_API], &[]),
    );
    let started = tokio::time::Instant::now();

    let result = resolver.current_ip_info().await.unwrap();

    assert_eq!(result.tag.as_deref(), Some("US⁻¹"));
    assert_eq!(probe.call_count(), 1);
    assert!(started.elapsed() <= resolver.config().resolve_timeout());
}

#[tokio::test]
async fn hint_replaces_the_probe() {
    let transport = Arc::new(ScriptedTransport::new().text(IP_API, "104.28.163.56"));
    let database = Arc::new(FixedGeoDatabase::new().with_country("104.28.163.56", "US"));
    let probe = Arc::new(FixedRelayProbe::silent());
    let resolver = resolver(
        transport,
        probe.clone(),
        Some(database),
        config(&[IP_API], &[]),
    );

    let analysis = resolver
        .analyze(Some(RelayProbeResult::new("JP", "104.28.9.9")))
        .await
        .unwrap();

    assert_eq!(analysis.classification.tag.to_string(), "US¹-JP⁰");
    assert!(analysis.classification.is_relay);
    assert_eq!(probe.call_count(), 0);
}

#[tokio::test]
async fn resolve_skips_discovery() {
    let transport = Arc::new(ScriptedTransport::new());
    let database = Arc::new(FixedGeoDatabase::new().with_country("8.8.8.8", "US"));
    let resolver = resolver(
        transport.clone(),
        Arc::new(FixedRelayProbe::silent()),
        Some(database),
        config(&[IP_API], &[GEO_API]),
    );

    let result = resolver.resolve("8.8.8.8").await.unwrap();

    assert_eq!(result.ip, "8.8.8.8");
    assert_eq!(result.country_code, "US");
    assert_eq!(result.tag.as_deref(), Some("US²"));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn resolve_without_database_still_answers() {
    let resolver = resolver(
        Arc::new(ScriptedTransport::new()),
        Arc::new(FixedRelayProbe::silent()),
        None,
        config(&[IP_API], &[]),
    );

    let result = resolver.resolve("2606:4700:3037::ac43:bd3a").await.unwrap();

    assert!(result.is_cdn);
    assert_eq!(result.country_code, "");
    assert_eq!(result.tag.as_deref(), Some("⁻¹"));
}

#[tokio::test]
async fn resolve_rejects_bad_literals() {
    let resolver = resolver(
        Arc::new(ScriptedTransport::new()),
        Arc::new(FixedRelayProbe::silent()),
        None,
        config(&[IP_API], &[]),
    );

    for input in ["", "999.1.1.1", "example.com", "1.2.3"] {
        let err = resolver.resolve(input).await.unwrap_err();
        assert!(matches!(err, Error::InvalidAddress(_)), "input {:?}", input);
    }
}

#[tokio::test]
async fn current_ip_falls_back_to_geo_api() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .status(IP_API, 403)
            .json(GEO_API, r#"{"ip": "2001:db8::7", "cc": "NL"}"#),
    );
    let resolver = resolver(
        transport,
        Arc::new(FixedRelayProbe::silent()),
        None,
        config(&[IP_API], &[GEO_API]),
    );

    assert_eq!(resolver.current_ip().await.unwrap(), "2001:db8::7");
}

#[tokio::test]
async fn closed_resolver_starts_no_work() {
    let transport = Arc::new(ScriptedTransport::new().text(IP_API, "45.65.122.98"));
    let probe = Arc::new(FixedRelayProbe::silent());
    let resolver = resolver(
        transport.clone(),
        probe.clone(),
        None,
        config(&[IP_API], &[]),
    );

    resolver.close();

    assert!(matches!(resolver.current_ip_info().await, Err(Error::Closed)));
    assert!(matches!(resolver.current_ip().await, Err(Error::Closed)));
    assert!(matches!(resolver.resolve("8.8.8.8").await, Err(Error::Closed)));
    assert_eq!(transport.call_count(), 0);
    assert_eq!(probe.call_count(), 0);
}

#[test]
fn invalid_config_is_rejected() {
    let result = Resolver::new(
        Arc::new(ScriptedTransport::new()),
        Arc::new(FixedRelayProbe::silent()),
        cdn(),
        None,
        config(&[], &[]),
    );

    assert!(matches!(result, Err(Error::Config(_))));
}
