//! URL checks applied to every listing before it is stored or returned
//!
//! A listing url must either parse as an absolute URL or be a magnet link,
//! and must not point at a private, loopback or link-local host.

use std::net::{IpAddr, Ipv4Addr};
use url::{Host, Url};

const MAGNET_PREFIX: &str = "magnet:";

/// URL utilities for listing validation
pub struct UrlUtils;

impl UrlUtils {
    /// Parse and validate a URL
    pub fn parse_and_validate(url: &str) -> Result<Url, url::ParseError> {
        Url::parse(url)
    }

    /// Magnet links are accepted without further parsing.
    ///
    /// Requires the full `magnet:` scheme, compared case-insensitively as URL
    /// schemes are, so a bare `magnet` prefix such as `magnetic.example` is
    /// not treated as a magnet link.
    pub fn is_magnet(url: &str) -> bool {
        url.get(..MAGNET_PREFIX.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(MAGNET_PREFIX))
    }

    /// Well-formed absolute URL with a host, or a magnet link
    pub fn is_valid(url: &str) -> bool {
        if Self::is_magnet(url) {
            return true;
        }
        Self::parse_and_validate(url)
            .map(|u| u.has_host())
            .unwrap_or(false)
    }

    /// Whether the url's host is a private-network or loopback address.
    ///
    /// Only IP literals and `localhost` are recognised; names are not
    /// resolved. Magnet links have no host and are never private.
    pub fn is_private_host(url: &str) -> bool {
        if Self::is_magnet(url) {
            return false;
        }
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };

        match parsed.host() {
            Some(Host::Ipv4(v4)) => is_lan_ip(IpAddr::V4(v4)),
            Some(Host::Ipv6(v6)) => is_lan_ip(IpAddr::V6(v6)),
            Some(Host::Domain(domain)) => {
                let domain = domain.trim_end_matches('.').to_ascii_lowercase();
                domain == "localhost" || domain.ends_with(".localhost")
            }
            None => false,
        }
    }

    /// Accepted for storage and for matching: valid and not private
    pub fn is_acceptable_listing(url: &str) -> bool {
        Self::is_valid(url) && !Self::is_private_host(url)
    }
}

fn is_lan_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || is_cgnat(v4)
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_lan_ip(IpAddr::V4(mapped));
            }
            v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_unique_local()
                || v6.is_unicast_link_local()
        }
    }
}

fn is_cgnat(ip: Ipv4Addr) -> bool {
    let addr = u32::from(ip);
    let start = u32::from(Ipv4Addr::new(100, 64, 0, 0));
    let end = u32::from(Ipv4Addr::new(100, 127, 255, 255));
    addr >= start && addr <= end
}
