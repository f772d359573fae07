//! Storage keys: how record names map onto file names.
//!
//! Address keys are made filesystem-safe by turning `:` into `-` and the
//! first `/` into `_`. Dynamic companions written by the pull scheduler
//! share the static key behind a `d_` prefix.

use ipnet::IpNet;

use crate::record::RecordKind;

/// Prefix marking a dynamic companion key.
pub const DYNAMIC_PREFIX: &str = "d_";

/// Top-level storage directory a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Ipv4,
    Ipv6,
    Domain,
    Asn,
}

impl Category {
    /// All categories in load order.
    pub const ALL: [Self; 4] = [Self::Ipv4, Self::Ipv6, Self::Domain, Self::Asn];

    /// Directory name under the storage root.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
            Self::Domain => "domain",
            Self::Asn => "asn",
        }
    }

    /// Category holding records of `kind`.
    #[must_use]
    pub const fn for_kind(kind: &RecordKind) -> Self {
        match kind {
            RecordKind::Address(IpNet::V4(_)) => Self::Ipv4,
            RecordKind::Address(IpNet::V6(_)) => Self::Ipv6,
            RecordKind::Domain => Self::Domain,
            RecordKind::Asn => Self::Asn,
        }
    }

    /// True for the two address categories.
    #[must_use]
    pub const fn is_address(self) -> bool {
        matches!(self, Self::Ipv4 | Self::Ipv6)
    }
}

/// Encode an address or CIDR string as a file name.
#[must_use]
pub fn encode_address_key(network: &str) -> String {
    network.replace(':', "-").replacen('/', "_", 1)
}

/// Decode a file name produced by [`encode_address_key`].
#[must_use]
pub fn decode_address_key(file_name: &str) -> String {
    file_name.replace('-', ":").replacen('_', "/", 1)
}

/// Storage key of the dynamic companion for `key`.
#[must_use]
pub fn dynamic_key(key: &str) -> String {
    format!("{DYNAMIC_PREFIX}{key}")
}

/// Split a dynamic prefix off `key`, returning the static key.
#[must_use]
pub fn strip_dynamic(key: &str) -> Option<&str> {
    key.strip_prefix(DYNAMIC_PREFIX)
}

/// File name for a record of `kind` named `name`, static or dynamic.
#[must_use]
pub fn file_name(kind: &RecordKind, name: &str, dynamic: bool) -> String {
    let key = match kind {
        RecordKind::Address(_) => encode_address_key(name),
        RecordKind::Domain | RecordKind::Asn => name.to_lowercase(),
    };

    if dynamic {
        dynamic_key(&key)
    } else {
        key
    }
}
