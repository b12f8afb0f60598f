use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Longest textual IPv4 address (`255.255.255.255`)
const MAX_V4_TOKEN: usize = 15;

/// Longest uncompressed textual IPv6 address
const MAX_V6_TOKEN: usize = 39;

/// Find the first IPv4 and the first IPv6 address in free text
///
/// Single forward pass, no backtracking. A candidate token starts at a
/// digit, `:` or `.` and extends over hex digits, dots and colons. Tokens
/// with dots only are tried as IPv4, tokens with colons only as IPv6;
/// anything mixing both (`host:port`, IPv4-mapped literals) is skipped.
/// Scanning stops as soon as both families are found.
pub fn scan_addresses(text: &str) -> (Option<Ipv4Addr>, Option<Ipv6Addr>) {
    let bytes = text.as_bytes();
    let mut ipv4 = None;
    let mut ipv6 = None;
    let mut i = 0;

    while i < bytes.len() && (ipv4.is_none() || ipv6.is_none()) {
        let c = bytes[i];
        if !(c.is_ascii_digit() || c == b':' || c == b'.') {
            i += 1;
            continue;
        }

        let mut j = i;
        let mut dots = 0usize;
        let mut colons = 0usize;
        while j < bytes.len() {
            match bytes[j] {
                b'.' => dots += 1,
                b':' => colons += 1,
                b if b.is_ascii_hexdigit() => {}
                _ => break,
            }
            j += 1;
        }

        // Token bytes are ASCII, so the slice boundaries are char boundaries.
        let token = &text[i..j];
        if dots > 0 && colons == 0 {
            if ipv4.is_none()
                && dots <= 3
                && token.len() <= MAX_V4_TOKEN
                && let Ok(IpAddr::V4(v4)) = token.parse::<IpAddr>()
            {
                ipv4 = Some(v4);
            }
        } else if colons > 0
            && dots == 0
            && ipv6.is_none()
            && token.len() <= MAX_V6_TOKEN
            && let Ok(IpAddr::V6(v6)) = token.parse::<IpAddr>()
        {
            ipv6 = Some(v6);
        }

        i = j + 1;
    }

    (ipv4, ipv6)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(s: &str) -> Option<Ipv4Addr> {
        Some(s.parse().unwrap())
    }

    fn v6(s: &str) -> Option<Ipv6Addr> {
        Some(s.parse().unwrap())
    }

    #[test]
    fn test_plain_addresses() {
        assert_eq!(scan_addresses("8.8.8.8\n"), (v4("8.8.8.8"), None));
        assert_eq!(
            scan_addresses("2606:4700:3037::ac43:bd3a"),
            (None, v6("2606:4700:3037::ac43:bd3a"))
        );
    }

    #[test]
    fn test_embedded_in_markup() {
        let html = "<html><body>Current IP Address: 203.0.113.7</body></html>";
        assert_eq!(scan_addresses(html), (v4("203.0.113.7"), None));
    }

    #[test]
    fn test_first_of_each_family_wins() {
        let text = "a 1.2.3.4 b 2001:db8::1 c 5.6.7.8 d 2001:db8::2";
        assert_eq!(scan_addresses(text), (v4("1.2.3.4"), v6("2001:db8::1")));
    }

    #[test]
    fn test_mixed_tokens_are_skipped() {
        assert_eq!(scan_addresses("1.2.3.4:8080"), (None, None));
        assert_eq!(scan_addresses("::ffff:1.2.3.4"), (None, None));
    }

    #[test]
    fn test_rejects_non_addresses() {
        assert_eq!(scan_addresses("version 1.2.3"), (None, None));
        assert_eq!(scan_addresses("1.2.3.4.5"), (None, None));
        assert_eq!(scan_addresses("256.1.1.1"), (None, None));
        assert_eq!(scan_addresses("no digits here"), (None, None));
        assert_eq!(scan_addresses(""), (None, None));
        assert_eq!(scan_addresses("12:30"), (None, None));
    }

    #[test]
    fn test_bad_token_does_not_hide_later_match() {
        assert_eq!(scan_addresses("1.2.3 then 9.9.9.9"), (v4("9.9.9.9"), None));
    }

    #[test]
    fn test_non_ascii_text() {
        assert_eq!(scan_addresses("当前 IP：114.114.114.114 来自"), (v4("114.114.114.114"), None));
    }
}
