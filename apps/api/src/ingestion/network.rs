//! Private, loopback and link-local address detection by exact prefix arithmetic.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// IPv4 networks that must never be fetched: (network, prefix length).
const BLOCKED_V4: &[([u8; 4], u32)] = &[
    ([0, 0, 0, 0], 8),       // "this" network
    ([10, 0, 0, 0], 8),      // private
    ([100, 64, 0, 0], 10),   // carrier-grade NAT
    ([127, 0, 0, 0], 8),     // loopback
    ([169, 254, 0, 0], 16),  // link-local, cloud metadata
    ([172, 16, 0, 0], 12),   // private
    ([192, 0, 0, 0], 24),    // IETF protocol assignments
    ([192, 168, 0, 0], 16),  // private
    ([198, 18, 0, 0], 15),   // benchmarking
    ([224, 0, 0, 0], 4),     // multicast
    ([240, 0, 0, 0], 4),     // reserved, broadcast
];

/// IPv6 networks that must never be fetched: (network, prefix length).
const BLOCKED_V6: &[(u128, u32)] = &[
    (0, 128),                                        // unspecified
    (1, 128),                                        // loopback
    (0xfc00_0000_0000_0000_0000_0000_0000_0000, 7),  // unique local
    (0xfe80_0000_0000_0000_0000_0000_0000_0000, 10), // link-local
    (0xfec0_0000_0000_0000_0000_0000_0000_0000, 10), // site-local (deprecated)
    (0xff00_0000_0000_0000_0000_0000_0000_0000, 8),  // multicast
];

pub fn is_blocked_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_v4(v4),
        IpAddr::V6(v6) => is_blocked_v6(v6),
    }
}

pub fn is_blocked_v4(ip: &Ipv4Addr) -> bool {
    let addr = u32::from(*ip);
    BLOCKED_V4.iter().any(|(network, prefix)| {
        let mask = prefix_mask_v4(*prefix);
        addr & mask == u32::from(Ipv4Addr::from(*network)) & mask
    })
}

pub fn is_blocked_v6(ip: &Ipv6Addr) -> bool {
    // IPv4-mapped (::ffff:a.b.c.d) and the deprecated IPv4-compatible form
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_blocked_v4(&v4);
    }
    let addr = u128::from(*ip);
    if addr >> 32 == 0 && addr > 1 {
        return is_blocked_v4(&Ipv4Addr::from(addr as u32));
    }
    BLOCKED_V6.iter().any(|(network, prefix)| {
        let mask = prefix_mask_v6(*prefix);
        addr & mask == network & mask
    })
}

/// Hostnames that name the local machine regardless of resolution.
pub fn is_local_hostname(host: &str) -> bool {
    let host = host.trim_end_matches('.');
    host == "localhost"
        || host.ends_with(".localhost")
        || host == "localhost.localdomain"
        || host.ends_with(".local")
        || host.ends_with(".internal")
}

fn prefix_mask_v4(prefix: u32) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - prefix)
    }
}

fn prefix_mask_v6(prefix: u32) -> u128 {
    if prefix == 0 {
        0
    } else {
        u128::MAX << (128 - prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(s: &str) -> bool {
        is_blocked_ip(&s.parse().unwrap())
    }

    #[test]
    fn test_blocks_full_172_16_slash_12() {
        assert!(v4("172.16.0.1"));
        assert!(v4("172.20.10.5"));
        assert!(v4("172.31.255.255"));
        assert!(!v4("172.15.255.255"));
        assert!(!v4("172.32.0.0"));
    }

    #[test]
    fn test_blocks_common_private_ranges() {
        for ip in ["127.0.0.1", "10.1.2.3", "192.168.1.1", "169.254.169.254", "0.0.0.0"] {
            assert!(v4(ip), "{ip} should be blocked");
        }
    }

    #[test]
    fn test_allows_public_v4() {
        for ip in ["8.8.8.8", "104.18.2.3", "192.169.0.1", "11.0.0.1"] {
            assert!(!v4(ip), "{ip} should be allowed");
        }
    }

    #[test]
    fn test_blocks_v6_local_ranges() {
        for ip in ["::1", "::", "fc00::1", "fd12:3456::1", "fe80::1", "ff02::1"] {
            assert!(v4(ip), "{ip} should be blocked");
        }
        assert!(!v4("2606:4700::1111"));
    }

    #[test]
    fn test_blocks_v4_mapped_v6() {
        assert!(v4("::ffff:127.0.0.1"));
        assert!(v4("::ffff:169.254.169.254"));
        assert!(!v4("::ffff:8.8.8.8"));
    }

    #[test]
    fn test_local_hostnames() {
        assert!(is_local_hostname("localhost"));
        assert!(is_local_hostname("api.localhost"));
        assert!(is_local_hostname("metadata.google.internal"));
        assert!(!is_local_hostname("jobs.lever.co"));
    }
}
