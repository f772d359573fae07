//! External address feed: subnets pulled from an IPAM system over HTTP.
//!
//! The endpoint returns a JSON list of subnets, either bare or wrapped in a
//! `{"data": [...]}` envelope as phpIPAM does. Each subnet becomes an
//! address record with a synthesized body:
//!
//! ```text
//! Network: 10.20.0.0/16
//! Description: Office LAN
//! Address: Building 4
//! Nameserver: ns1.example.net
//! ```

use async_trait::async_trait;
use ipnet::IpNet;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::Value;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use whois_core::Record;

use crate::config::IpamConfig;

/// A source of additional address records, consulted on every rebuild.
#[async_trait]
pub trait AddressFeed: Send + Sync {
    /// Fetch the current record set.
    async fn fetch(&self) -> crate::Result<Vec<Record>>;
}

/// HTTP client for an IPAM subnet list.
#[derive(Debug, Clone)]
pub struct IpamFeed {
    http: HttpClient,
    url: Url,
    token: Option<String>,
}

/// Entries stay untyped here so one malformed subnet cannot reject the list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SubnetList {
    Envelope { data: Vec<Value> },
    Bare(Vec<Value>),
}

#[derive(Debug, Deserialize)]
struct IpamSubnet {
    subnet: String,
    mask: Mask,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    nameservers: Option<Nameservers>,
}

/// phpIPAM sends masks as strings, other systems as numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Mask {
    Number(u8),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Nameservers {
    List(Vec<String>),
    /// phpIPAM nameserver set: `;`-separated hosts.
    Ipam { namesrv1: String },
}

impl IpamFeed {
    /// Build a feed client from config.
    pub fn new(config: &IpamConfig) -> crate::Result<Self> {
        let url = Url::parse(config.url.trim())
            .map_err(|e| crate::SrvError::Config(format!("invalid ipam.url: {e}")))?;

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("whoisd/{}", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .map_err(|e| crate::SrvError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            url,
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl AddressFeed for IpamFeed {
    async fn fetch(&self) -> crate::Result<Vec<Record>> {
        debug!(url = %self.url, "GET subnet list");

        let mut request = self.http.get(self.url.clone());
        if let Some(token) = &self.token {
            request = request.header("token", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| crate::SrvError::Feed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(crate::SrvError::Feed(format!(
                "{} returned HTTP {}",
                self.url,
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| crate::SrvError::Feed(e.to_string()))?;
        let list: SubnetList = serde_json::from_str(&body).map_err(|e| {
            crate::SrvError::Feed(format!("{} returned no subnet list: {e}", self.url))
        })?;

        let entries = match list {
            SubnetList::Envelope { data } | SubnetList::Bare(data) => data,
        };
        Ok(entries.iter().filter_map(parse_entry).collect())
    }
}

/// Decode one list entry, skipping it with a warning when it does not fit.
fn parse_entry(entry: &Value) -> Option<Record> {
    match IpamSubnet::deserialize(entry) {
        Ok(subnet) => to_record(subnet),
        Err(e) => {
            warn!(entry = %entry, error = %e, "skipping malformed IPAM subnet");
            None
        }
    }
}

/// Map one subnet to a record, skipping entries that do not parse.
fn to_record(subnet: IpamSubnet) -> Option<Record> {
    let mask = match &subnet.mask {
        Mask::Number(n) => Some(*n),
        Mask::Text(text) => text.trim().parse().ok(),
    };

    let net = subnet
        .subnet
        .trim()
        .parse::<IpAddr>()
        .ok()
        .zip(mask)
        .and_then(|(addr, len)| IpNet::new(addr, len).ok());

    let Some(net) = net else {
        warn!(subnet = %subnet.subnet, mask = ?subnet.mask, "skipping malformed IPAM subnet");
        return None;
    };

    let mut body = vec![format!("Network: {}/{}", subnet.subnet.trim(), net.prefix_len())];
    if let Some(description) = non_empty(subnet.description.as_deref()) {
        body.push(format!("Description: {description}"));
    }
    if let Some(location) = non_empty(subnet.location.as_deref()) {
        body.push(format!("Address: {location}"));
    }

    let nameservers = match subnet.nameservers {
        Some(Nameservers::List(list)) => list,
        Some(Nameservers::Ipam { namesrv1 }) => {
            namesrv1.split(';').map(str::to_string).collect()
        }
        None => Vec::new(),
    };
    for ns in nameservers.iter().filter_map(|ns| non_empty(Some(ns))) {
        body.push(format!("Nameserver: {ns}"));
    }

    Some(Record::synthesized_address(net, body))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
