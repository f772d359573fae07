//! Registry records: one parsed entry per address block, domain or ASN.
//!
//! A record's stored text is a list of lines. Lines starting with `_` are
//! directives and never reach the body:
//!
//! - `_REFER: <host>` points clients at another WHOIS server
//! - `_PULL: <host> [port]` asks the pull scheduler to mirror an upstream
//!
//! Every other line is returned to clients verbatim.

use ipnet::IpNet;
use std::net::IpAddr;
use tracing::warn;

use crate::error::{Result, WhoisError};

/// Port used by `_PULL` targets that do not name one.
pub const DEFAULT_WHOIS_PORT: u16 = 43;

/// Directive setting the referral server.
const REFER_DIRECTIVE: &str = "_REFER";

/// Directive setting the pull target.
const PULL_DIRECTIVE: &str = "_PULL";

/// What a record describes.
///
/// Only address records carry a payload: the network used for
/// containment tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// An IPv4 or IPv6 block (a bare address is a /32 or /128)
    Address(IpNet),
    /// A domain name or TLD
    Domain,
    /// An autonomous system number (`as<digits>`)
    Asn,
}

impl RecordKind {
    /// Short label used in logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Address(IpNet::V4(_)) => "ipv4",
            Self::Address(IpNet::V6(_)) => "ipv6",
            Self::Domain => "domain",
            Self::Asn => "asn",
        }
    }
}

/// Upstream server a pull-flagged record is refreshed from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PullTarget {
    /// Upstream WHOIS host
    pub host: String,
    /// Upstream port (default 43)
    pub port: u16,
}

/// One immutable registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    name: String,
    kind: RecordKind,
    body: Vec<String>,
    referral: Option<String>,
    pull: Option<PullTarget>,
    dynamic: bool,
}

impl Record {
    /// Parse an address record. `network` is an IP address or CIDR block.
    pub fn address(network: &str, data: &str) -> Result<Self> {
        let net = parse_network(network)?;
        Ok(Self::parse(network, RecordKind::Address(net), data))
    }

    /// Parse a domain (or TLD) record.
    #[must_use]
    pub fn domain(name: &str, data: &str) -> Self {
        Self::parse(name, RecordKind::Domain, data)
    }

    /// Parse an ASN record.
    #[must_use]
    pub fn asn(name: &str, data: &str) -> Self {
        Self::parse(name, RecordKind::Asn, data)
    }

    /// Build an address record from already formatted body lines.
    ///
    /// Used for records supplied by an external feed: no directives are
    /// interpreted, so such records never refer or pull.
    #[must_use]
    pub fn synthesized_address(net: IpNet, body: Vec<String>) -> Self {
        Self {
            name: net.to_string().to_lowercase(),
            kind: RecordKind::Address(net),
            body,
            referral: None,
            pull: None,
            dynamic: false,
        }
    }

    /// Mark this record as produced by the pull scheduler.
    #[must_use]
    pub fn into_dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }

    fn parse(name: &str, kind: RecordKind, data: &str) -> Self {
        let name = name.to_lowercase();
        let mut body = Vec::new();
        let mut referral = None;
        let mut pull = None;

        for line in data.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);

            if !line.starts_with('_') {
                body.push(line.to_string());
                continue;
            }

            let (directive, value) = match line.split_once(':') {
                Some((directive, value)) => (directive, value.trim()),
                None => (line, ""),
            };

            match directive {
                REFER_DIRECTIVE if !value.is_empty() => referral = Some(value.to_string()),
                PULL_DIRECTIVE => match parse_pull(value) {
                    Some(target) => pull = Some(target),
                    None => warn!(record = %name, value, "ignoring malformed _PULL directive"),
                },
                _ => {}
            }
        }

        if let (Some(referral), Some(target)) = (&referral, &pull) {
            warn!(
                record = %name,
                referral = %referral,
                pull = %target.host,
                "record has both _REFER and _PULL, ignoring _PULL"
            );
            pull = None;
        }

        Self {
            name,
            kind,
            body,
            referral,
            pull,
            dynamic: false,
        }
    }

    /// Canonical lowercase key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record kind (with the network for address records).
    #[must_use]
    pub const fn kind(&self) -> &RecordKind {
        &self.kind
    }

    /// Body lines, directives removed.
    #[must_use]
    pub fn body(&self) -> &[String] {
        &self.body
    }

    /// Body lines joined with `\n`.
    #[must_use]
    pub fn body_text(&self) -> String {
        self.body.join("\n")
    }

    /// Referral server, if the record delegates.
    #[must_use]
    pub fn referral(&self) -> Option<&str> {
        self.referral.as_deref()
    }

    #[must_use]
    pub const fn has_referral(&self) -> bool {
        self.referral.is_some()
    }

    /// Upstream pull target, if any.
    #[must_use]
    pub const fn pull(&self) -> Option<&PullTarget> {
        self.pull.as_ref()
    }

    #[must_use]
    pub const fn has_pull(&self) -> bool {
        self.pull.is_some()
    }

    /// True for records written by the pull scheduler.
    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Network of an address record.
    #[must_use]
    pub const fn network(&self) -> Option<&IpNet> {
        match &self.kind {
            RecordKind::Address(net) => Some(net),
            _ => None,
        }
    }
}

/// Parse an IP address or CIDR block, accepting host bits in the block.
pub fn parse_network(value: &str) -> Result<IpNet> {
    let value = value.trim();
    if value.contains('/') {
        value
            .parse::<IpNet>()
            .map_err(|e| WhoisError::Parse(format!("{value} is not a valid network: {e}")))
    } else {
        value
            .parse::<IpAddr>()
            .map(IpNet::from)
            .map_err(|e| WhoisError::Parse(format!("{value} is not a valid IP address: {e}")))
    }
}

fn parse_pull(value: &str) -> Option<PullTarget> {
    let mut parts = value.split_whitespace();
    let host = parts.next()?;
    let port = match parts.next() {
        Some(port) => port.parse().ok()?,
        None => DEFAULT_WHOIS_PORT,
    };

    Some(PullTarget {
        host: host.to_string(),
        port,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referral_round_trip() {
        let record = Record::domain(
            "example.com",
            "_REFER: whois.example.net\ndomain: example.com\nstatus: active",
        );
        assert!(record.has_referral());
        assert_eq!(record.referral(), Some("whois.example.net"));
        assert_eq!(record.body_text(), "domain: example.com\nstatus: active");
    }

    #[test]
    fn test_referral_keeps_port_suffix() {
        let record = Record::asn("AS64500", "_REFER: whois.example.net:4343\naut-num: AS64500");
        assert_eq!(record.referral(), Some("whois.example.net:4343"));
    }

    #[test]
    fn test_directives_never_reach_body() {
        let record = Record::domain(
            "example.org",
            "_PULL: whois.upstream.net\n_COMMENT: internal\n_\nline one\nline two",
        );
        assert_eq!(record.body(), ["line one", "line two"]);
        assert!(!record.body_text().contains('_'));
    }

    #[test]
    fn test_name_is_lowercased() {
        let record = Record::asn("AS64500", "aut-num: AS64500");
        assert_eq!(record.name(), "as64500");
        assert_eq!(record.kind(), &RecordKind::Asn);
    }

    #[test]
    fn test_crlf_lines_and_trailing_newline() {
        let record = Record::domain("example.com", "a\r\nb\r\n");
        assert_eq!(record.body(), ["a", "b", ""]);
        assert_eq!(record.body_text(), "a\nb\n");
    }

    #[test]
    fn test_pull_default_port() {
        let record = Record::domain("example.com", "_PULL: whois.upstream.net\nbody");
        let pull = record.pull().unwrap();
        assert_eq!(pull.host, "whois.upstream.net");
        assert_eq!(pull.port, DEFAULT_WHOIS_PORT);
        assert!(!record.has_referral());
    }

    #[test]
    fn test_pull_explicit_port() {
        let record = Record::domain("example.com", "_PULL: whois.upstream.net 4343");
        assert_eq!(record.pull().unwrap().port, 4343);
    }

    #[test]
    fn test_pull_bad_port_is_ignored() {
        let record = Record::domain("example.com", "_PULL: whois.upstream.net notaport");
        assert!(!record.has_pull());
    }

    #[test]
    fn test_referral_wins_over_pull() {
        // Order of the directives does not matter.
        for data in [
            "_PULL: whois.upstream.net\n_REFER: whois.example.net",
            "_REFER: whois.example.net\n_PULL: whois.upstream.net",
        ] {
            let record = Record::domain("example.com", data);
            assert_eq!(record.referral(), Some("whois.example.net"));
            assert!(!record.has_pull());
        }
    }

    #[test]
    fn test_empty_referral_is_no_referral() {
        let record = Record::domain("example.com", "_REFER:\nbody");
        assert!(!record.has_referral());
    }

    #[test]
    fn test_address_cidr_and_bare() {
        let block = Record::address("10.0.0.0/8", "net").unwrap();
        assert_eq!(block.network().unwrap().prefix_len(), 8);
        assert_eq!(block.kind().label(), "ipv4");

        let host = Record::address("2001:DB8::1", "host").unwrap();
        assert_eq!(host.name(), "2001:db8::1");
        assert_eq!(host.network().unwrap().prefix_len(), 128);
        assert_eq!(host.kind().label(), "ipv6");
    }

    #[test]
    fn test_address_rejects_garbage() {
        assert!(matches!(
            Record::address("10.0.0.256/8", ""),
            Err(WhoisError::Parse(_))
        ));
        assert!(Record::address("not-an-ip", "").is_err());
        assert!(Record::address("10.0.0.0/33", "").is_err());
    }

    #[test]
    fn test_synthesized_address_has_no_directives() {
        let net: IpNet = "192.0.2.0/24".parse().unwrap();
        let record =
            Record::synthesized_address(net, vec!["_REFER: nowhere".into(), "Network: x".into()]);
        assert!(!record.has_referral());
        assert_eq!(record.name(), "192.0.2.0/24");
        assert!(!record.is_dynamic());
        assert!(record.into_dynamic().is_dynamic());
    }
}
