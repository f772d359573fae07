use thiserror::Error;

/// Result type alias for core registry operations
pub type Result<T> = std::result::Result<T, WhoisError>;

/// Errors raised while parsing records or classifying queries
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WhoisError {
    /// A stored record key or directive could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// The query line is not an address, domain, TLD or AS number
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The CIDR suffix is wider than the address family allows
    #[error("invalid CIDR /{prefix}: family allows at most /{max}")]
    InvalidCidr {
        /// Prefix length sent by the client
        prefix: u16,
        /// Bit width of the address family
        max: u8,
    },
}

impl WhoisError {
    /// The one-line text written back to a client for this error, if any
    #[must_use]
    pub const fn client_message(&self) -> Option<&'static str> {
        match self {
            Self::InvalidQuery(_) => Some(crate::response::INVALID_QUERY),
            Self::InvalidCidr { .. } => Some(crate::response::INVALID_CIDR),
            Self::Parse(_) => None,
        }
    }
}
