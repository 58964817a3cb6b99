//! IPv4 CIDR membership.
//!
//! Matching is done octet by octet with integer masks so the boundary
//! behaviour is exact and does not depend on a host networking library.
//! Any malformed input yields `false`.

/// Returns `true` when `ip` lies inside `cidr` (`a.b.c.d/n`, `0 <= n <= 32`).
///
/// Whole octets covered by the prefix are compared for equality; a partial
/// octet is compared under the mask `0xFF << (8 - remaining_bits)`.
///
/// ```
/// use devlink::subnet::is_in_subnet;
///
/// assert!(is_in_subnet("192.168.1.50", "192.168.1.0/24"));
/// assert!(!is_in_subnet("192.168.2.50", "192.168.1.0/24"));
/// assert!(!is_in_subnet("not-an-ip", "192.168.1.0/24"));
/// ```
pub fn is_in_subnet(ip: &str, cidr: &str) -> bool {
    let Some((base, prefix)) = cidr.trim().split_once('/') else {
        return false;
    };
    let Some(prefix) = parse_prefix(prefix) else {
        return false;
    };
    let (Some(ip), Some(base)) = (parse_octets(ip), parse_octets(base)) else {
        return false;
    };

    let full = usize::from(prefix / 8);
    if ip[..full] != base[..full] {
        return false;
    }

    let remaining = prefix % 8;
    if remaining == 0 {
        return true;
    }

    let mask = 0xFFu8 << (8 - remaining);
    ip[full] & mask == base[full] & mask
}

/// Parse a prefix length in `0..=32`.
fn parse_prefix(prefix: &str) -> Option<u8> {
    let prefix = prefix.trim();
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    prefix.parse::<u8>().ok().filter(|p| *p <= 32)
}

/// Parse a dotted quad into its four octets.
fn parse_octets(addr: &str) -> Option<[u8; 4]> {
    let mut octets = [0u8; 4];
    let mut parts = addr.trim().split('.');

    for octet in &mut octets {
        let part = parts.next()?;
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *octet = part.parse().ok()?;
    }

    if parts.next().is_some() {
        return None;
    }
    Some(octets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_membership() {
        assert!(is_in_subnet("192.168.1.50", "192.168.1.0/24"));
        assert!(is_in_subnet("10.20.30.40", "10.0.0.0/8"));
        assert!(!is_in_subnet("11.20.30.40", "10.0.0.0/8"));
        assert!(!is_in_subnet("192.168.2.1", "192.168.1.0/24"));
    }

    #[test]
    fn test_partial_octet() {
        // /20 covers 172.16.0.0 - 172.16.15.255
        assert!(is_in_subnet("172.16.15.255", "172.16.0.0/20"));
        assert!(!is_in_subnet("172.16.16.0", "172.16.0.0/20"));

        // /25 splits the last octet in half
        assert!(is_in_subnet("192.168.1.127", "192.168.1.0/25"));
        assert!(!is_in_subnet("192.168.1.128", "192.168.1.0/25"));
        assert!(is_in_subnet("192.168.1.200", "192.168.1.128/25"));
    }

    #[test]
    fn test_prefix_boundaries() {
        assert!(is_in_subnet("8.8.8.8", "0.0.0.0/0"));
        assert!(is_in_subnet("255.255.255.255", "10.1.2.3/0"));

        assert!(is_in_subnet("10.1.2.3", "10.1.2.3/32"));
        assert!(!is_in_subnet("10.1.2.4", "10.1.2.3/32"));
    }

    #[test]
    fn test_bits_past_prefix_are_ignored() {
        let base = [192u8, 168, 77, 0];
        for prefix in 0..=32u32 {
            let cidr = format!("{}.{}.{}.{}/{}", base[0], base[1], base[2], base[3], prefix);
            let ip = u32::from_be_bytes(base);
            for bit in 0..32u32 {
                // bit 0 is the most significant
                if bit < prefix {
                    continue;
                }
                let flipped = (ip ^ (1 << (31 - bit))).to_be_bytes();
                let addr = format!("{}.{}.{}.{}", flipped[0], flipped[1], flipped[2], flipped[3]);
                assert!(is_in_subnet(&addr, &cidr), "{addr} should be in {cidr}");
            }
            if prefix > 0 {
                let flipped = (ip ^ (1 << (32 - prefix))).to_be_bytes();
                let addr = format!("{}.{}.{}.{}", flipped[0], flipped[1], flipped[2], flipped[3]);
                assert!(!is_in_subnet(&addr, &cidr), "{addr} should not be in {cidr}");
            }
        }
    }

    #[test]
    fn test_malformed_input_fails_closed() {
        assert!(!is_in_subnet("192.168.1.1", "192.168.1.0"));
        assert!(!is_in_subnet("192.168.1.1", "192.168.1.0/33"));
        assert!(!is_in_subnet("192.168.1.1", "192.168.1.0/-1"));
        assert!(!is_in_subnet("192.168.1.1", "192.168.1.0/abc"));
        assert!(!is_in_subnet("192.168.1.1", "192.168.1/24"));
        assert!(!is_in_subnet("192.168.1", "192.168.1.0/24"));
        assert!(!is_in_subnet("192.168.1.1.1", "192.168.1.0/24"));
        assert!(!is_in_subnet("192.168.1.256", "192.168.1.0/24"));
        assert!(!is_in_subnet("router1.lab", "192.168.1.0/24"));
        assert!(!is_in_subnet("", ""));
    }
}
