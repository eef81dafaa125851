//! Key-set URL policy: fail closed before any network access.
//!
//! Verification keys are fetched from a configured URL. A tampered or
//! mistyped URL must never cause key material to travel in cleartext to a
//! non-local host, so the policy is checked before the HTTP client is
//! even handed the URL: `https` is always accepted, `http` only when the
//! host is a loopback name or literal — including IPv4-mapped IPv6 forms,
//! the classic filter bypass.

use std::net::{Ipv4Addr, Ipv6Addr};

use url::{Host, Url};

use crate::{Error, Result};

/// Validate a key-set URL against the scheme/host policy.
///
/// Returns the parsed URL on success so callers fetch exactly what was
/// validated.
///
/// # Errors
///
/// [`Error::InsecureUrl`] for unparseable URLs, non-`http(s)` schemes and
/// `http` to any non-loopback host. No network I/O happens here.
pub fn validate_jwks_url(url_str: &str) -> Result<Url> {
    let parsed =
        Url::parse(url_str).map_err(|e| Error::InsecureUrl(format!("invalid URL: {e}")))?;

    match parsed.scheme() {
        "https" => Ok(parsed),
        "http" => {
            let loopback = parsed.host().is_some_and(|host| is_loopback_host(&host));
            if loopback {
                Ok(parsed)
            } else {
                Err(Error::InsecureUrl(format!(
                    "http key-set URL allowed only for loopback hosts: {url_str}"
                )))
            }
        }
        other => Err(Error::InsecureUrl(format!(
            "unsupported key-set URL scheme '{other}': {url_str}"
        ))),
    }
}

/// Loopback check for a URL host: the `localhost` name, `127.0.0.0/8`,
/// `::1`, or an IPv4-mapped/compatible IPv6 literal embedding a loopback
/// address.
fn is_loopback_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(name) => name.eq_ignore_ascii_case("localhost"),
        Host::Ipv4(addr) => addr.is_loopback(),
        Host::Ipv6(addr) => {
            addr.is_loopback() || embedded_ipv4(addr).is_some_and(|v4| v4.is_loopback())
        }
    }
}

/// Extract the IPv4 address embedded in an IPv4-mapped (`::ffff:x.x.x.x`)
/// or IPv4-compatible (`::x.x.x.x`, deprecated) IPv6 literal.
#[allow(clippy::cast_possible_truncation)] // Extracting u8 octets from u16 IPv6 segments is intentional
fn embedded_ipv4(addr: &Ipv6Addr) -> Option<Ipv4Addr> {
    let segments = addr.segments();
    let mapped = segments[..5] == [0, 0, 0, 0, 0] && segments[5] == 0xFFFF;
    let compatible = segments[..6] == [0, 0, 0, 0, 0, 0]
        && (segments[6] != 0 || segments[7] > 1); // exclude :: and ::1
    if mapped || compatible {
        Some(Ipv4Addr::new(
            (segments[6] >> 8) as u8,
            segments[6] as u8,
            (segments[7] >> 8) as u8,
            segments[7] as u8,
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_is_always_accepted() {
        assert!(validate_jwks_url("https://sso.example.com/openid/jwks").is_ok());
        assert!(validate_jwks_url("https://10.0.0.5/jwks").is_ok());
    }

    #[test]
    fn http_localhost_is_accepted() {
        assert!(validate_jwks_url("http://localhost:8000/openid/jwks").is_ok());
        assert!(validate_jwks_url("http://LOCALHOST/jwks").is_ok());
    }

    #[test]
    fn http_loopback_literals_are_accepted() {
        assert!(validate_jwks_url("http://127.0.0.1:8000/jwks").is_ok());
        assert!(validate_jwks_url("http://127.0.0.53/jwks").is_ok());
        assert!(validate_jwks_url("http://[::1]/jwks").is_ok());
        assert!(validate_jwks_url("http://[::ffff:127.0.0.1]/jwks").is_ok());
    }

    #[test]
    fn http_non_loopback_is_rejected_without_network() {
        // 169.0.0.1 looks loopback-ish but is not
        assert!(matches!(
            validate_jwks_url("http://169.0.0.1/openid/jwks"),
            Err(Error::InsecureUrl(_))
        ));
        assert!(validate_jwks_url("http://sso.example.com/jwks").is_err());
        assert!(validate_jwks_url("http://[2001:db8::1]/jwks").is_err());
        assert!(validate_jwks_url("http://[::ffff:10.0.0.1]/jwks").is_err());
    }

    #[test]
    fn non_http_schemes_are_rejected() {
        assert!(matches!(
            validate_jwks_url("ftp://localhost/jwks"),
            Err(Error::InsecureUrl(_))
        ));
        assert!(validate_jwks_url("file:///etc/jwks.json").is_err());
    }

    #[test]
    fn unparseable_url_is_rejected() {
        assert!(validate_jwks_url("not a url").is_err());
    }
}
