//! IPv4 CIDR arithmetic.
//!
//! Prefix lengths arrive from the declarative front-end as plain integers, so
//! the entry points take `i32` and reject anything outside 0-32 before it can
//! reach a remote call.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

use crate::error::{IpamError, IpamResult};

/// Largest valid IPv4 prefix length.
pub const MAX_PREFIX_LEN: u8 = 32;

/// Checks that a prefix length is within 0-32.
pub fn validate_mask_bits(prefix_len: i32) -> IpamResult<u8> {
    u8::try_from(prefix_len)
        .ok()
        .filter(|bits| *bits <= MAX_PREFIX_LEN)
        .ok_or_else(|| IpamError::invalid_prefix_length(prefix_len))
}

/// Converts a prefix length to its dotted netmask, e.g. `24` -> `255.255.255.0`.
pub fn mask_bits_to_dotted_mask(prefix_len: i32) -> IpamResult<String> {
    let bits = validate_mask_bits(prefix_len)?;
    let net = Ipv4Net::new(Ipv4Addr::UNSPECIFIED, bits)
        .map_err(|_| IpamError::invalid_prefix_length(prefix_len))?;
    Ok(net.netmask().to_string())
}

/// Converts a dotted netmask back to its prefix length.
///
/// Rejects malformed addresses and non-contiguous masks such as `255.0.255.0`.
pub fn dotted_mask_to_mask_bits(mask: &str) -> IpamResult<u8> {
    let addr: Ipv4Addr = mask
        .parse()
        .map_err(|_| IpamError::invalid_network(mask, "not a dotted IPv4 mask"))?;

    let raw = u32::from(addr);
    let ones = raw.leading_ones();
    if raw.count_ones() != ones {
        return Err(IpamError::invalid_network(mask, "mask bits are not contiguous"));
    }

    Ok(ones as u8)
}

/// Parses and validates a network address plus prefix length.
pub fn parse_network(network: &str, prefix_len: i32) -> IpamResult<Ipv4Net> {
    let cidr = format!("{}/{}", network, prefix_len);
    cidr.parse::<Ipv4Net>()
        .map_err(|e| IpamError::invalid_network(cidr.clone(), e.to_string()))
}

/// Derives the conventional gateway for a network: last octet plus one.
///
/// This is a fixed convention, not a first-free-host computation, and the
/// arithmetic is not clamped: `10.0.0.255` yields `10.0.0.256`.
pub fn derive_gateway(network: &str) -> IpamResult<String> {
    let octets: Vec<&str> = network.split('.').collect();
    if octets.len() != 4 {
        return Err(IpamError::invalid_network(
            network,
            "expected four dot-separated octets",
        ));
    }

    let mut parsed = [0u8; 4];
    for (slot, octet) in parsed.iter_mut().zip(&octets) {
        let canonical = !octet.is_empty()
            && octet.bytes().all(|b| b.is_ascii_digit())
            && (octet.len() == 1 || !octet.starts_with('0'));
        if !canonical {
            return Err(IpamError::invalid_network(
                network,
                format!("bad octet '{}'", octet),
            ));
        }
        *slot = octet
            .parse::<u8>()
            .map_err(|_| IpamError::invalid_network(network, format!("bad octet '{}'", octet)))?;
    }

    Ok(format!(
        "{}.{}.{}.{}",
        parsed[0],
        parsed[1],
        parsed[2],
        u16::from(parsed[3]) + 1
    ))
}
