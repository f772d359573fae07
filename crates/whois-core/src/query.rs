//! Query classification.
//!
//! A query line is trimmed, lowercased and sorted into one of four classes,
//! tried in this order: IP address or CIDR block, domain name, AS number,
//! bare alphanumeric token (looked up as a TLD).

use ipnet::IpNet;
use std::net::IpAddr;

use crate::error::{Result, WhoisError};

/// Longest domain name accepted, in bytes.
const MAX_DOMAIN_LEN: usize = 253;

/// Longest domain label accepted, in bytes.
const MAX_LABEL_LEN: usize = 63;

/// A classified query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// IP address or CIDR block
    Address(AddressQuery),
    /// Fully qualified domain name
    Domain(String),
    /// AS number, normalised to `as<digits>`
    Asn(String),
    /// Bare token, answered from the domain table
    Tld(String),
}

/// A parsed address query: a single address is a full-length block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressQuery {
    net: IpNet,
}

impl AddressQuery {
    /// Parse `value` as an address or `address/prefix`.
    ///
    /// A prefix wider than the family's bit width is rejected with
    /// [`WhoisError::InvalidCidr`].
    pub fn parse(value: &str) -> Result<Self> {
        if let Ok(addr) = value.parse::<IpAddr>() {
            return Ok(Self {
                net: IpNet::from(addr),
            });
        }

        let (addr, prefix) = split_cidr(value)
            .ok_or_else(|| WhoisError::InvalidQuery(format!("{value} is not an IP address")))?;

        let max = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix > u16::from(max) {
            return Err(WhoisError::InvalidCidr { prefix, max });
        }

        let net = u8::try_from(prefix)
            .ok()
            .and_then(|len| IpNet::new(addr, len).ok())
            .ok_or(WhoisError::InvalidCidr { prefix, max })?;

        Ok(Self { net })
    }

    /// The queried block.
    #[must_use]
    pub const fn net(&self) -> IpNet {
        self.net
    }

    /// True when `other` belongs to the same address family.
    #[must_use]
    pub const fn same_family(&self, other: &IpNet) -> bool {
        matches!(
            (&self.net, other),
            (IpNet::V4(_), IpNet::V4(_)) | (IpNet::V6(_), IpNet::V6(_))
        )
    }
}

impl Query {
    /// Classify a raw query line.
    pub fn classify(line: &str) -> Result<Self> {
        let query = line.trim().to_lowercase();

        if looks_like_address(&query) {
            return AddressQuery::parse(&query).map(Self::Address);
        }

        if is_domain(&query) {
            Ok(Self::Domain(query))
        } else if is_asn(&query) {
            Ok(Self::Asn(query))
        } else if !query.is_empty() && query.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Ok(Self::Tld(query))
        } else {
            Err(WhoisError::InvalidQuery(query))
        }
    }
}

/// True for a bare IP address or `address/NNN` whose address part parses.
fn looks_like_address(query: &str) -> bool {
    query.parse::<IpAddr>().is_ok() || split_cidr(query).is_some()
}

/// Split `address/prefix` where prefix is one to three digits.
fn split_cidr(value: &str) -> Option<(IpAddr, u16)> {
    let (addr, prefix) = value.split_once('/')?;

    if addr.is_empty()
        || !addr
            .bytes()
            .all(|b| b.is_ascii_hexdigit() || b == b'.' || b == b':')
    {
        return None;
    }
    if prefix.is_empty() || prefix.len() > 3 || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some((addr.parse().ok()?, prefix.parse().ok()?))
}

/// Domain name syntax check: two or more LDH labels, non-numeric TLD.
pub fn is_domain(value: &str) -> bool {
    if value.is_empty() || value.len() > MAX_DOMAIN_LEN {
        return false;
    }

    let labels: Vec<&str> = value.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    });

    let tld = labels[labels.len() - 1];
    labels_ok && tld.len() >= 2 && !tld.bytes().all(|b| b.is_ascii_digit())
}

/// `AS` followed by digits, any case.
pub fn is_asn(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() > 2
        && bytes[..2].eq_ignore_ascii_case(b"as")
        && bytes[2..].iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(value: &str) -> IpNet {
        match Query::classify(value).unwrap() {
            Query::Address(q) => q.net(),
            other => panic!("expected address query, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_addresses() {
        assert_eq!(address("10.1.2.3").prefix_len(), 32);
        assert_eq!(address(" 10.1.0.0/16\r\n").prefix_len(), 16);
        assert_eq!(address("2001:DB8::1").prefix_len(), 128);
        assert_eq!(address("2001:db8::/48").prefix_len(), 48);
    }

    #[test]
    fn test_cidr_out_of_range() {
        assert_eq!(
            Query::classify("10.0.0.0/33"),
            Err(WhoisError::InvalidCidr { prefix: 33, max: 32 })
        );
        assert_eq!(
            Query::classify("2001:db8::/129"),
            Err(WhoisError::InvalidCidr {
                prefix: 129,
                max: 128
            })
        );
        assert_eq!(
            Query::classify("10.0.0.0/999").unwrap_err().client_message(),
            Some(crate::response::INVALID_CIDR)
        );
    }

    #[test]
    fn test_classify_domains() {
        assert_eq!(
            Query::classify("Example.COM").unwrap(),
            Query::Domain("example.com".into())
        );
        assert_eq!(
            Query::classify("sub.my-zone.example").unwrap(),
            Query::Domain("sub.my-zone.example".into())
        );
    }

    #[test]
    fn test_classify_asn_and_tld() {
        assert_eq!(
            Query::classify("AS64500").unwrap(),
            Query::Asn("as64500".into())
        );
        assert_eq!(Query::classify("com").unwrap(), Query::Tld("com".into()));
        assert_eq!(Query::classify("12345").unwrap(), Query::Tld("12345".into()));
    }

    #[test]
    fn test_classify_invalid() {
        for line in ["", "   ", "foo bar", "-bad-.com", "a..b", "10.0.0.0/", "help!"] {
            let err = Query::classify(line).unwrap_err();
            assert!(matches!(err, WhoisError::InvalidQuery(_)), "{line:?}");
        }
    }

    #[test]
    fn test_is_domain_rules() {
        assert!(is_domain("example.com"));
        assert!(!is_domain("example"));
        assert!(!is_domain("example.1"));
        assert!(!is_domain("exa_mple.com"));
        assert!(!is_domain(&format!("{}.com", "a".repeat(64))));
    }

    #[test]
    fn test_same_family() {
        let q = AddressQuery::parse("10.0.0.1").unwrap();
        assert!(q.same_family(&"10.0.0.0/8".parse().unwrap()));
        assert!(!q.same_family(&"::/0".parse().unwrap()));
    }
}
