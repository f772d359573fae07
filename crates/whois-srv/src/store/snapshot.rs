//! One complete, immutable build of the registry.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use whois_core::keys;
use whois_core::query::Query;
use whois_core::{matcher, referral, response, Record};

use super::loader::LoadedRecords;

/// Registry snapshot answering queries read-only.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Static address records followed by feed records, in scan order.
    addresses: Vec<Record>,
    /// Index into `addresses` where feed records start.
    feed_start: usize,
    address_companions: HashMap<String, Record>,
    domains: HashMap<String, Record>,
    asns: HashMap<String, Record>,
    built_at: DateTime<Utc>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new(LoadedRecords::default(), Vec::new())
    }
}

impl Snapshot {
    /// Assemble a snapshot from disk records and feed-supplied addresses.
    #[must_use]
    pub fn new(loaded: LoadedRecords, feed: Vec<Record>) -> Self {
        let LoadedRecords {
            mut addresses,
            address_companions,
            domains,
            asns,
            ..
        } = loaded;

        let feed_start = addresses.len();
        addresses.extend(feed);

        Self {
            addresses,
            feed_start,
            address_companions,
            domains,
            asns,
            built_at: Utc::now(),
        }
    }

    /// Answer a classified query.
    #[must_use]
    pub fn answer(&self, query: &Query) -> String {
        match query {
            Query::Address(q) => {
                let matches = matcher::find_matches(q, &self.addresses);
                matcher::render(&matches, |record| self.address_companion(record.name()))
            }
            Query::Domain(key) | Query::Tld(key) => referral::answer(
                self.domains.get(key),
                self.domains.get(&keys::dynamic_key(key)),
                response::NO_DOMAIN,
            ),
            Query::Asn(key) => referral::answer(
                self.asns.get(key),
                self.asns.get(&keys::dynamic_key(key)),
                response::NO_ASN,
            ),
        }
    }

    /// Address records that came from the external feed.
    #[must_use]
    pub fn feed_addresses(&self) -> &[Record] {
        &self.addresses[self.feed_start..]
    }

    /// Dynamic companion of the address record `name`.
    #[must_use]
    pub fn address_companion(&self, name: &str) -> Option<&Record> {
        self.address_companions.get(name)
    }

    /// Static records flagged for pulling, addresses then domains then ASNs.
    #[must_use]
    pub fn pull_records(&self) -> Vec<&Record> {
        let mut domains: Vec<&Record> = self.domains.values().collect();
        domains.sort_by(|a, b| a.name().cmp(b.name()));
        let mut asns: Vec<&Record> = self.asns.values().collect();
        asns.sort_by(|a, b| a.name().cmp(b.name()));

        self.addresses
            .iter()
            .chain(domains)
            .chain(asns)
            .filter(|record| record.has_pull() && !record.is_dynamic())
            .collect()
    }

    /// Number of address records (static and feed).
    #[must_use]
    pub fn address_count(&self) -> usize {
        self.addresses.len()
    }

    /// Number of domain table entries, companions included.
    #[must_use]
    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }

    /// Number of ASN table entries, companions included.
    #[must_use]
    pub fn asn_count(&self) -> usize {
        self.asns.len()
    }

    /// When this snapshot was assembled.
    #[must_use]
    pub const fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }
}
