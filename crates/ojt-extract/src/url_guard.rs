//! Request-forgery pre-check for user supplied URLs.
//!
//! Runs before any network call and never resolves DNS, so it only judges the
//! literal host of the URL.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

use crate::{ExtractError, Result};

const METADATA_HOSTS: &[&str] = &["metadata.google.internal", "metadata"];

const METADATA_V4: &[Ipv4Addr] = &[
    Ipv4Addr::new(169, 254, 169, 254),
    Ipv4Addr::new(100, 100, 100, 200),
];

const METADATA_V6: &[Ipv6Addr] = &[Ipv6Addr::new(0xfd00, 0x0ec2, 0, 0, 0, 0, 0, 0x0254)];

/// Parse `raw` and reject anything that could reach internal infrastructure.
pub fn check_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ExtractError::InvalidInput(format!("malformed URL '{}': {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ExtractError::InvalidInput(format!(
                "unsupported URL scheme '{}'",
                other
            )))
        }
    }

    let blocked = match url.host() {
        None => return Err(ExtractError::InvalidInput("URL has no host".to_string())),
        Some(Host::Domain(domain)) => is_blocked_domain(domain),
        Some(Host::Ipv4(ip)) => is_blocked_ip(IpAddr::V4(ip)),
        Some(Host::Ipv6(ip)) => is_blocked_ip(IpAddr::V6(ip)),
    };

    if blocked {
        return Err(ExtractError::InvalidInput(format!(
            "URL host '{}' is not allowed",
            url.host_str().unwrap_or_default()
        )));
    }

    Ok(url)
}

fn is_blocked_domain(domain: &str) -> bool {
    let domain = domain.trim_end_matches('.').to_ascii_lowercase();
    domain == "localhost"
        || domain.ends_with(".localhost")
        || METADATA_HOSTS.contains(&domain.as_str())
}

fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_blocked_v4(v4),
            None => is_blocked_v6(v6),
        },
    }
}

fn is_blocked_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || METADATA_V4.contains(&ip)
}

fn is_blocked_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || (first & 0xfe00) == 0xfc00 // unique local fc00::/7
        || (first & 0xffc0) == 0xfe80 // link local fe80::/10
        || METADATA_V6.contains(&ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(raw: &str) -> bool {
        matches!(check_url(raw), Err(ExtractError::InvalidInput(_)))
    }

    #[test]
    fn test_accepts_public_urls() {
        let url = check_url("https://example.com/guide?page=2").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert!(check_url("http://93.184.216.34/").is_ok());
        assert!(check_url("http://[2606:2800:220:1::]/").is_ok());
    }

    #[test]
    fn test_rejects_metadata_endpoint() {
        assert!(rejected("http://169.254.169.254/latest/meta-data/"));
        assert!(rejected("http://metadata.google.internal/computeMetadata/v1/"));
        assert!(rejected("http://100.100.100.200/latest/meta-data/"));
        assert!(rejected("http://[fd00:ec2::254]/"));
    }

    #[test]
    fn test_rejects_private_ranges() {
        for raw in [
            "http://localhost:8080/",
            "http://api.localhost/",
            "http://127.0.0.1/",
            "http://10.1.2.3/",
            "http://172.16.0.1/",
            "http://172.31.255.255/",
            "http://192.168.1.1/",
            "http://0.0.0.0/",
            "http://[::1]/",
            "http://[::ffff:127.0.0.1]/",
            "http://[fe80::1]/",
            "http://[fc00::1]/",
        ] {
            assert!(rejected(raw), "{} should be rejected", raw);
        }
    }

    #[test]
    fn test_allows_public_neighbours_of_private_ranges() {
        assert!(check_url("http://172.32.0.1/").is_ok());
        assert!(check_url("http://11.0.0.1/").is_ok());
    }

    #[test]
    fn test_rejects_bad_scheme_and_garbage() {
        assert!(rejected("ftp://example.com/file"));
        assert!(rejected("file:///etc/passwd"));
        assert!(rejected("not a url"));
    }
}
