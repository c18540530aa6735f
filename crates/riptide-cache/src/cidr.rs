//! IP normalization and CIDR matching.
//!
//! Implements the canonicalization and widening rules a request's client IP
//! and an admin-supplied whitelist entry must agree on before any CIDR
//! comparison is made.

use ipnetwork::IpNetwork;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Canonicalize a client IP before any matching or hashing:
/// - an IPv4-mapped IPv6 address (`::ffff:a.b.c.d`) becomes its IPv4 form
/// - any other IPv6 address is returned in its shortest (already-canonical)
///   `std` representation
/// - IPv4 addresses are returned unchanged
pub fn canonicalize(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V4(v4) => IpAddr::V4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
    }
}

/// Turn a bare client/admin IP into the network pattern used as a whitelist
/// key, applying the admin-insert widening rule: a bare IPv4 literal widens
/// to its `/24`; a bare IPv6 literal stays at `/128`.
///
/// This widening applies only on admin insert (`AddWhitelist`,
/// `AddStaticWhitelist`) — the fixed whitelist loaded from configuration is
/// matched at the literal prefix supplied there, see [`parse_fixed_entry`].
pub fn widen_for_admin_insert(ip: IpAddr) -> IpNetwork {
    let ip = canonicalize(ip);
    match ip {
        IpAddr::V4(v4) => {
            let octets = v4.octets();
            let network = Ipv4Addr::new(octets[0], octets[1], octets[2], 0);
            IpNetwork::new(IpAddr::V4(network), 24).expect("24 is a valid IPv4 prefix")
        }
        IpAddr::V6(v6) => IpNetwork::new(IpAddr::V6(v6), 128).expect("128 is a valid IPv6 prefix"),
    }
}

/// Parse a fixed-whitelist configuration entry. Unlike admin insert, a bare
/// literal here is matched exactly (`/32` for IPv4, `/128` for IPv6) — an
/// explicit CIDR suffix (`10.0.0.0/8`) is always honored.
pub fn parse_fixed_entry(raw: &str) -> Result<IpNetwork, ipnetwork::IpNetworkError> {
    if raw.contains('/') {
        raw.parse::<IpNetwork>()
    } else {
        let ip: IpAddr = raw
            .parse()
            .map_err(|_| ipnetwork::IpNetworkError::InvalidAddr(raw.to_string()))?;
        let ip = canonicalize(ip);
        let bits = match ip {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        Ok(IpNetwork::new(ip, bits).expect("32/128 are always valid prefixes"))
    }
}

/// The whitelist-key representation of an admin-inserted IP pattern
/// (`192.168.1.0/24`, `::1/128`, …).
pub fn admin_pattern_string(ip: IpAddr) -> String {
    widen_for_admin_insert(ip).to_string()
}

/// True if `ip` falls within `network`, after canonicalizing `ip`.
pub fn matches(ip: IpAddr, network: IpNetwork) -> bool {
    network.contains(canonicalize(ip))
}

/// Parse a previously stored pattern string back into an `IpNetwork`.
pub fn parse_pattern(pattern: &str) -> Option<IpNetwork> {
    pattern.parse().ok()
}

#[allow(dead_code)]
fn loopback_v6() -> Ipv6Addr {
    Ipv6Addr::LOCALHOST
}
