//! Refuses URLs that point at local or private infrastructure.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use url::Url;

/// Check if a URL targets a potentially dangerous resource.
///
/// Non-HTTP schemes, loopback/private/link-local addresses and local
/// hostnames are all refused.
pub fn is_private_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_ipv4(v4),
        IpAddr::V6(v6) => is_private_ipv6(v6),
    }
}

fn is_private_ipv4(v4: Ipv4Addr) -> bool {
    v4.is_loopback()
        || v4.is_private()
        || v4.is_link_local()
        || v4.is_broadcast()
        || v4.is_unspecified()
        // 100.64.0.0/10 (Carrier-grade NAT)
        || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
}

fn is_private_ipv6(v6: Ipv6Addr) -> bool {
    // ::ffff:a.b.c.d reaches the IPv4 host directly.
    if let Some(v4) = v6.to_ipv4_mapped() {
        return is_private_ipv4(v4);
    }

    let first = v6.segments()[0];
    v6.is_loopback()
        || v6.is_unspecified()
        // fc00::/7 (unique local)
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 (link-local)
        || (first & 0xffc0) == 0xfe80
        // ff00::/8 (multicast)
        || (first & 0xff00) == 0xff00
}
