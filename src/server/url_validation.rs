use crate::error::SubstitchError;
use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Parse `url` and require an `http` or `https` scheme with a host.
fn parse_http_url(url: &str) -> Result<Url, SubstitchError> {
    let parsed =
        Url::parse(url).map_err(|_| SubstitchError::InvalidOrigin(format!("Invalid URL: {url}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(SubstitchError::InvalidOrigin(format!(
                "Scheme '{scheme}' not allowed, only http/https permitted"
            )));
        }
    }

    if parsed.host().is_none() {
        return Err(SubstitchError::InvalidOrigin(format!("No host in URL: {url}")));
    }

    Ok(parsed)
}

/// Validate that a user-supplied manifest URL is safe for this service to
/// fetch (SSRF protection).
///
/// **IP literals** are checked against blocked ranges.
/// **Hostnames** are accepted without DNS resolution; DNS rebinding is a
/// known limitation.
///
/// # Errors
/// Returns [`SubstitchError::InvalidOrigin`] for:
/// - Invalid or relative URLs
/// - Non-HTTP(S) schemes
/// - IPv4 addresses in private/reserved ranges
/// - IPv6 loopback or link-local/unique-local addresses
pub fn validate_origin_url(url: &str) -> Result<(), SubstitchError> {
    let parsed = parse_http_url(url)?;

    match parsed.host() {
        Some(Host::Ipv4(ip)) if is_blocked_ipv4(ip) => Err(SubstitchError::InvalidOrigin(
            format!("Private or reserved IPv4 address not allowed: {ip}"),
        )),
        Some(Host::Ipv6(ip)) if is_blocked_ipv6(ip) => Err(SubstitchError::InvalidOrigin(
            format!("Private or reserved IPv6 address not allowed: {ip}"),
        )),
        _ => Ok(()),
    }
}

/// Validate a URL that is only handed to the player, never fetched here.
pub fn validate_resource_url(url: &str) -> Result<(), SubstitchError> {
    parse_http_url(url).map(|_| ())
}

/// Returns `true` for IPv4 addresses in private or reserved ranges.
///
/// Blocked ranges:
/// - `0.0.0.0/8`      - "this" network (RFC 1122)
/// - `10.0.0.0/8`     - RFC 1918 private
/// - `127.0.0.0/8`    - loopback
/// - `169.254.0.0/16` - link-local / cloud-metadata
/// - `172.16.0.0/12`  - RFC 1918 private
/// - `192.168.0.0/16` - RFC 1918 private
fn is_blocked_ipv4(ip: Ipv4Addr) -> bool {
    let octets = ip.octets();
    let (a, b) = (octets[0], octets[1]);

    a == 0
        || a == 10
        || a == 127
        || (a == 169 && b == 254)
        || (a == 172 && (16..=31).contains(&b))
        || (a == 192 && b == 168)
}

/// Returns `true` for IPv6 loopback, link-local (`fe80::/10`) and
/// unique-local (`fc00::/7`) addresses.
fn is_blocked_ipv6(ip: Ipv6Addr) -> bool {
    let s = ip.segments();

    ip.is_loopback() || (s[0] & 0xffc0) == 0xfe80 || (s[0] & 0xfe00) == 0xfc00
}
