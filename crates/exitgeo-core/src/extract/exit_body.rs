use super::scanner::scan_addresses;
use crate::record::AddressRecord;
use regex::Regex;
use serde_json::Value;
use std::net::IpAddr;
use std::sync::LazyLock;

/// JSON keys that carry the caller's address, in priority order
pub const EXIT_JSON_FIELDS: &[&str] = &[
    "ip", "ipv4", "ipv6", "query", "origin", "your_ip", "ip_addr", "address",
];

/// `checkip.dyndns.com` style pages
static CURRENT_IP: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"Current IP Address: ([\d.]+)").ok());

/// `httpbin.org/ip` style bodies, whatever the declared content type
static ORIGIN_FIELD: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#""origin"\s*:\s*"([^"]+)""#).ok());

/// Turn an exit-IP endpoint body into an address record
///
/// JSON bodies (by content type) are searched through [`EXIT_JSON_FIELDS`];
/// anything else goes through the text scanner. Two format-specific
/// fallbacks then apply: a `Current IP Address:` line fills a missing IPv4,
/// and an `"origin"` field overrides the family it belongs to. Values that
/// do not parse as addresses never reach the record.
///
/// The result may be empty; the caller treats that as a soft failure.
pub fn parse_exit_body(body: &str, is_json: bool) -> AddressRecord {
    let body = body.trim();
    let mut record = AddressRecord::default();

    if is_json {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
            for key in EXIT_JSON_FIELDS {
                let Some(ip) = map.get(*key).and_then(Value::as_str).and_then(parse_ip) else {
                    continue;
                };
                match ip {
                    IpAddr::V4(v4) if record.ipv4.is_none() => record.ipv4 = Some(v4),
                    IpAddr::V6(v6) if record.ipv6.is_none() => record.ipv6 = Some(v6),
                    _ => {}
                }
                if record.ipv4.is_some() && record.ipv6.is_some() {
                    break;
                }
            }
        }
    } else {
        let (ipv4, ipv6) = scan_addresses(body);
        record.ipv4 = ipv4;
        record.ipv6 = ipv6;
    }

    if record.ipv4.is_none()
        && let Some(ip) = capture_ip(&CURRENT_IP, body)
    {
        record.set(ip);
    }

    if let Some(ip) = capture_ip(&ORIGIN_FIELD, body) {
        record.set(ip);
    }

    record
}

fn capture_ip(pattern: &Option<Regex>, body: &str) -> Option<IpAddr> {
    pattern
        .as_ref()?
        .captures(body)?
        .get(1)
        .and_then(|m| parse_ip(m.as_str()))
}

fn parse_ip(value: &str) -> Option<IpAddr> {
    value.trim().parse().ok()
}
