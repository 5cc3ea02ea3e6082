//! SSRF-safe URL validation (spec §4.1 "SSRF safety").
//!
//! Applied once, at registry-client construction time, against every
//! registry's configured base URL — never re-checked per request, since the
//! base URL is immutable for the process lifetime (spec §3).

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, ToSocketAddrs};

use url::Url;

use crate::error::CoreError;
use crate::registry::SsrfPolicy;

/// Validate a registry base URL against the SSRF deny-list.
///
/// - Scheme must be `http` or `https`; `file`, `gopher`, and anything else
///   is always rejected regardless of policy.
/// - The host must resolve to at least one address, and every resolved
///   address must be a "public" address unless `policy.allow_localhost` is
///   set, in which case loopback and private-range addresses are permitted.
pub fn validate_base_url(raw: &str, policy: SsrfPolicy) -> Result<Url, CoreError> {
    let url = Url::parse(raw).map_err(|e| CoreError::SsrfBlocked(format!("{raw}: {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(CoreError::SsrfBlocked(format!(
                "scheme {other:?} is never permitted"
            )))
        }
    }

    let host = url
        .host_str()
        .ok_or_else(|| CoreError::SsrfBlocked(format!("{raw}: no host")))?;
    let port = url.port_or_known_default().unwrap_or(443);

    // Literal IP hosts are checked directly; hostnames are resolved.
    let addrs: Vec<IpAddr> = if let Ok(ip) = host.parse::<IpAddr>() {
        vec![ip]
    } else {
        (host, port)
            .to_socket_addrs()
            .map_err(|e| CoreError::SsrfBlocked(format!("{host}: DNS resolution failed: {e}")))?
            .map(|sa| sa.ip())
            .collect()
    };

    if addrs.is_empty() {
        return Err(CoreError::SsrfBlocked(format!(
            "{host}: resolved to no addresses"
        )));
    }

    for addr in &addrs {
        if !policy.allow_localhost && !is_publicly_routable(*addr) {
            return Err(CoreError::SsrfBlocked(format!(
                "{addr} is a loopback/private/link-local address; set ALLOW_LOCALHOST=true to permit"
            )));
        }
    }

    Ok(url)
}

fn is_publicly_routable(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => is_public_v6(v6),
    }
}

fn is_public_v4(addr: Ipv4Addr) -> bool {
    !(addr.is_loopback()
        || addr.is_private()
        || addr.is_link_local()
        || addr.is_broadcast()
        || addr.is_documentation()
        || addr.is_unspecified()
        || is_cgnat(addr))
}

/// 100.64.0.0/10 — Carrier-Grade NAT range, not covered by `Ipv4Addr::is_private`.
fn is_cgnat(addr: Ipv4Addr) -> bool {
    let octets = addr.octets();
    octets[0] == 100 && (octets[1] & 0b1100_0000) == 0b0100_0000
}

fn is_public_v6(addr: Ipv6Addr) -> bool {
    !(addr.is_loopback() || addr.is_unspecified() || is_unique_local(addr) || is_link_local_v6(addr))
}

/// fc00::/7 — IPv6 unique local addresses (the private-range analogue).
fn is_unique_local(addr: Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xfe00) == 0xfc00
}

/// fe80::/10 — IPv6 link-local addresses.
fn is_link_local_v6(addr: Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xffc0) == 0xfe80
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strict() -> SsrfPolicy {
        SsrfPolicy { allow_localhost: false }
    }

    fn permissive() -> SsrfPolicy {
        SsrfPolicy { allow_localhost: true }
    }

    #[test]
    fn rejects_file_scheme_even_with_allow_localhost() {
        let err = validate_base_url("file:///etc/passwd", permissive()).unwrap_err();
        assert!(matches!(err, CoreError::SsrfBlocked(_)));
    }

    #[test]
    fn rejects_loopback_literal_ip_by_default() {
        let err = validate_base_url("http://127.0.0.1:8081", strict()).unwrap_err();
        assert!(matches!(err, CoreError::SsrfBlocked(_)));
    }

    #[test]
    fn allows_loopback_when_policy_permits() {
        let url = validate_base_url("http://127.0.0.1:8081", permissive()).unwrap();
        assert_eq!(url.host_str(), Some("127.0.0.1"));
    }

    #[test]
    fn rejects_private_range_literal_ip_by_default() {
        let err = validate_base_url("http://10.0.0.5:8081", strict()).unwrap_err();
        assert!(matches!(err, CoreError::SsrfBlocked(_)));
    }

    #[test]
    fn rejects_link_local_metadata_endpoint() {
        let err = validate_base_url("http://169.254.169.254/latest/meta-data", strict()).unwrap_err();
        assert!(matches!(err, CoreError::SsrfBlocked(_)));
    }

    #[test]
    fn allows_public_literal_ip() {
        let url = validate_base_url("https://8.8.8.8:443", strict()).unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn cgnat_range_is_blocked_by_default() {
        let err = validate_base_url("http://100.64.0.1", strict()).unwrap_err();
        assert!(matches!(err, CoreError::SsrfBlocked(_)));
    }

    #[test]
    fn rejects_gopher_scheme() {
        let err = validate_base_url("gopher://example.com", strict()).unwrap_err();
        assert!(matches!(err, CoreError::SsrfBlocked(_)));
    }
}
