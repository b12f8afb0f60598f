//! Built-in endpoint lists
//!
//! Every tier walks its list in a fresh random order per call, so load
//! spreads across providers and a dead provider is not always hit first.

use rand::seq::SliceRandom;

/// Endpoints answering with the caller's address (text or JSON)
pub const IP_APIS: &[&str] = &[
    "http://checkip.amazonaws.com",
    "https://checkip.global.api.aws",
    "https://check.torproject.org/api/ip",
    "http://whatismyip.akamai.com",
    "https://4.tnedi.me/ip",
    "https://6.ident.me/ip",
    "https://ipv4.seeip.org/ip",
    "https://ipv6.seeip.org/ip",
    "https://ip4.me/api/",
    "https://ip6.me/api/",
    "https://ipv4.my.ipinfo.app/api/ipDetails.php",
    "https://ipv6.my.ipinfo.app/api/ipDetails.php",
    "https://ipv6.wtfismyip.com/text",
    "https://myip.wtf/json",
    "https://checkip.info/ip",
    "https://checkip.dns.he.net/",
    "https://httpbin.org/ip",
    "http://checkip.dyndns.com/",
    "https://api.vore.top/api/IPdata",
    "https://api.ipapi.is/ip",
    "http://ifconfig.me/ip",
    "https://ipinfo.io/ip",
    "https://freedns.afraid.org/dynamic/check.php",
    "https://test.ipw.cn/",
    "https://6.ipw.cn/",
    "https://api6.ipify.org?format=json",
    "https://qifu-api.baidubce.com/ip/local/geo/v1/district",
    "https://r.inews.qq.com/api/ip2city",
    "https://g3.letv.com/r?format=1",
    "https://cdid.c-ctrip.com/model-poc2/h",
    "https://whois.pconline.com.cn/ipJson.jsp",
    "https://api.live.bilibili.com/xlive/web-room/v1/index/getIpInfo",
];

/// Endpoints answering with address and country in JSON
///
/// Most of these are rate limited; they are the fallback tier.
pub const GEO_APIS: &[&str] = &[
    "https://4.ident.me/json",
    "https://4.tnedi.me/json",
    "https://ident.me/json",
    "https://tnedi.me/json",
    "https://a.ident.me/json",
    "https://api.seeip.org/geoip",
    "https://api.ipapi.is",
    "https://checkip.info/json",
    "https://ip-api.io/json",
    "https://ip-api.io/api/v1/ip",
    "http://ip-api.com/json",
    "https://ipwhois.app/json/",
    "https://ipapi.co/json",
];

/// Cloudflare-fronted sites exposing `/cdn-cgi/trace`
pub const TRACE_APIS: &[&str] = &[
    "https://4.ipw.cn",
    "https://www.cloudflare.com",
    "https://api.ipify.org",
    "https://ip.122911.xyz",
    "https://6.iplark.com",
    "https://ifconfig.co",
    "https://api.ip2location.io",
    "https://api.ip.sb/",
    "https://realip.cc",
    "https://ipapi.co",
    "https://free.freeipapi.com",
    "https://api.myip.com",
    "https://api.ipbase.com",
    "https://api.ipquery.io",
];

/// Hosts that only answer Postman-looking clients
const POSTMAN_HOSTS: &[&str] = &["checkip.info"];

pub(crate) fn to_owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// A shuffled copy of `list`
///
/// The thread-local RNG is dropped before returning, so this is safe to
/// call from async code.
pub fn shuffled(list: &[String]) -> Vec<String> {
    let mut out = list.to_vec();
    out.shuffle(&mut rand::thread_rng());
    out
}

/// Whether `url` belongs to a host needing the Postman header profile
pub fn wants_postman_profile(url: &str) -> bool {
    POSTMAN_HOSTS.iter().any(|host| url.contains(host))
}

/// `{base}/cdn-cgi/trace`, tolerating a trailing slash on `base`
pub fn trace_url(base: &str) -> String {
    format!("{}/cdn-cgi/trace", base.trim_end_matches('/'))
}
