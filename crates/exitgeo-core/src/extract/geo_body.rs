use crate::error::{Error, Result};
use crate::record::normalize_country_code;
use serde_json::{Map, Value};
use std::net::IpAddr;

/// What a geo endpoint told us
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoFields {
    pub ip: Option<IpAddr>,
    /// Upper-case two-letter code
    pub country_code: Option<String>,
}

/// Where in the document a rule looks
#[derive(Debug, Clone, Copy)]
enum Scope {
    Root,
    Nested(&'static str),
    /// Top level, only when `"status": "success"` (ip-api.com)
    RootOnSuccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Ip,
    Country,
}

/// One extraction rule: scope, candidate keys, validator
struct FieldRule {
    scope: Scope,
    target: Target,
    keys: &'static [&'static str],
    accept: fn(&str) -> Option<String>,
}

const IP_KEYS: &[&str] = &["ip", "query"];
const COUNTRY_KEYS: &[&str] = &["countryCode", "country_code", "cc", "country"];

/// Rules run in order; the first accepted value per target wins
const GEO_RULES: &[FieldRule] = &[
    FieldRule { scope: Scope::Root, target: Target::Ip, keys: IP_KEYS, accept: accept_ip },
    FieldRule { scope: Scope::Root, target: Target::Country, keys: COUNTRY_KEYS, accept: accept_country_or_name },
    FieldRule { scope: Scope::Nested("location"), target: Target::Ip, keys: IP_KEYS, accept: accept_ip },
    FieldRule { scope: Scope::Nested("location"), target: Target::Country, keys: COUNTRY_KEYS, accept: accept_country },
    FieldRule { scope: Scope::Nested("datacenter"), target: Target::Country, keys: COUNTRY_KEYS, accept: accept_country },
    FieldRule { scope: Scope::RootOnSuccess, target: Target::Ip, keys: &["query"], accept: accept_ip },
];

/// Country names some providers put where a code belongs
const COUNTRY_NAME_ALIASES: &[(&str, &str)] = &[("United States", "US")];

fn accept_ip(value: &str) -> Option<String> {
    value.trim().parse::<IpAddr>().ok().map(|ip| ip.to_string())
}

fn accept_country(value: &str) -> Option<String> {
    normalize_country_code(value)
}

fn accept_country_or_name(value: &str) -> Option<String> {
    accept_country(value).or_else(|| {
        COUNTRY_NAME_ALIASES
            .iter()
            .find(|(name, _)| *name == value.trim())
            .map(|(_, code)| code.to_string())
    })
}

/// Parse a geo endpoint body
///
/// Explicit failure markers (`"status": "fail"`, a numeric `429` status,
/// any `"error"` key) and non-JSON bodies are soft failures. Otherwise the
/// rule table above is applied; either field may come back empty.
pub fn parse_geo_body(endpoint: &str, body: &str) -> Result<GeoFields> {
    let document: Value = serde_json::from_str(body.trim())
        .map_err(|e| Error::soft_failure(endpoint, format!("not JSON: {}", e)))?;

    let Value::Object(root) = document else {
        return Err(Error::soft_failure(endpoint, "JSON body is not an object"));
    };

    if let Some(reason) = failure_marker(&root) {
        return Err(Error::soft_failure(endpoint, reason));
    }

    let mut fields = GeoFields::default();
    for rule in GEO_RULES {
        let filled = match rule.target {
            Target::Ip => fields.ip.is_some(),
            Target::Country => fields.country_code.is_some(),
        };
        if filled {
            continue;
        }

        let Some(scope) = resolve_scope(&root, rule.scope) else {
            continue;
        };
        let Some(value) = first_accepted(scope, rule) else {
            continue;
        };

        match rule.target {
            Target::Ip => fields.ip = value.parse().ok(),
            Target::Country => fields.country_code = Some(value),
        }
    }

    Ok(fields)
}

fn failure_marker(root: &Map<String, Value>) -> Option<String> {
    match root.get("status") {
        Some(Value::String(s)) if s.eq_ignore_ascii_case("fail") => {
            let message = root.get("message").and_then(Value::as_str).unwrap_or("status fail");
            return Some(message.to_string());
        }
        Some(Value::Number(n)) if n.as_u64() == Some(429) => {
            return Some("rate limited (429)".to_string());
        }
        _ => {}
    }

    if root.contains_key("error") {
        return Some("error field present".to_string());
    }

    None
}

fn resolve_scope(root: &Map<String, Value>, scope: Scope) -> Option<&Map<String, Value>> {
    match scope {
        Scope::Root => Some(root),
        Scope::Nested(key) => root.get(key).and_then(Value::as_object),
        Scope::RootOnSuccess => {
            (root.get("status").and_then(Value::as_str) == Some("success")).then_some(root)
        }
    }
}

fn first_accepted(scope: &Map<String, Value>, rule: &FieldRule) -> Option<String> {
    rule.keys
        .iter()
        .filter_map(|key| scope.get(*key).and_then(Value::as_str))
        .find_map(rule.accept)
}
