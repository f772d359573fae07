//! Address matching: longest-prefix lookup with referral stop.
//!
//! Address records are scanned in storage order. Every record of the
//! query's family whose network contains the queried block is collected,
//! until a match carrying a referral is found: that zone delegates away, so
//! nothing after it is considered. The collected matches are then sorted by
//! ascending prefix length (stable, so equal prefixes keep scan order) which
//! puts the most specific block last.

use ipnet::IpNet;

use crate::query::AddressQuery;
use crate::record::Record;
use crate::response::{self, SECTION_BREAK};

/// Collect the address records containing `query`, least specific first.
pub fn find_matches<'a>(query: &AddressQuery, records: &'a [Record]) -> Vec<&'a Record> {
    let target = query.net();
    let mut matches = Vec::new();

    for record in records {
        let Some(net) = record.network() else {
            continue;
        };
        if record.is_dynamic() || !query.same_family(net) {
            continue;
        }

        if net.contains(&target) {
            matches.push(record);
            if record.has_referral() {
                break;
            }
        }
    }

    matches.sort_by_key(|record| record.network().map_or(0, IpNet::prefix_len));
    matches
}

/// Format matched records as a response.
///
/// Bodies are separated by a blank line. `companion` supplies the dynamic
/// companion of a record, appended right after it when the record has no
/// referral. If a match carries a referral (at most one can, since the
/// scan stops there) the response ends with its `ReferralServer:` line.
pub fn render<'a, F>(matches: &[&Record], companion: F) -> String
where
    F: Fn(&Record) -> Option<&'a Record>,
{
    if matches.is_empty() {
        return response::NO_ADDRESS.to_string();
    }

    let mut sections = Vec::with_capacity(matches.len());
    for record in matches {
        let mut section = record.body_text();
        if !record.has_referral() {
            if let Some(dynamic) = companion(record) {
                section.push_str(SECTION_BREAK);
                section.push_str(&dynamic.body_text());
            }
        }
        sections.push(section);
    }

    let mut out = sections.join(SECTION_BREAK);
    if let Some(referral) = matches.iter().find_map(|record| record.referral()) {
        out.push_str(SECTION_BREAK);
        out.push_str(&response::referral_trailer(referral));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(entries: &[(&str, &str)]) -> Vec<Record> {
        entries
            .iter()
            .map(|(net, data)| Record::address(net, data).unwrap())
            .collect()
    }

    fn query(value: &str) -> AddressQuery {
        AddressQuery::parse(value).unwrap()
    }

    fn names(matches: &[&Record]) -> Vec<String> {
        matches.iter().map(|r| r.name().to_string()).collect()
    }

    #[test]
    fn test_nested_blocks_most_specific_last() {
        // Stored most specific first: the sort must still put /16 last.
        let recs = records(&[("10.1.0.0/16", "sixteen"), ("10.0.0.0/8", "eight")]);
        let matches = find_matches(&query("10.1.2.3"), &recs);
        assert_eq!(names(&matches), ["10.0.0.0/8", "10.1.0.0/16"]);
        assert_eq!(render(&matches, |_| None), "eight\n\nsixteen");
    }

    #[test]
    fn test_equal_prefixes_keep_scan_order() {
        let recs = records(&[("10.0.0.0/8", "first"), ("10.0.0.0/8", "second")]);
        let matches = find_matches(&query("10.9.9.9"), &recs);
        assert_eq!(render(&matches, |_| None), "first\n\nsecond");
    }

    #[test]
    fn test_no_cross_family_matches() {
        let recs = records(&[
            ("::/0", "all of v6"),
            ("0.0.0.0/0", "all of v4"),
            ("::ffff:0:0/96", "mapped"),
        ]);
        let v4 = find_matches(&query("192.0.2.1"), &recs);
        assert_eq!(names(&v4), ["0.0.0.0/0"]);

        let v6 = find_matches(&query("2001:db8::1"), &recs);
        assert_eq!(names(&v6), ["::/0"]);
        assert!(v6.iter().all(|r| matches!(r.network(), Some(IpNet::V6(_)))));
    }

    #[test]
    fn test_referral_stops_scan() {
        let recs = records(&[
            ("10.0.0.0/8", "eight\n_REFER: whois.example.net"),
            ("10.1.0.0/16", "sixteen"),
        ]);
        let matches = find_matches(&query("10.1.2.3"), &recs);
        assert_eq!(names(&matches), ["10.0.0.0/8"]);

        let text = render(&matches, |_| None);
        assert_eq!(text, "eight\n\nReferralServer: whois.example.net");
        assert_eq!(text.matches("ReferralServer:").count(), 1);
    }

    #[test]
    fn test_referral_trailer_when_sorted_before_more_specific() {
        let recs = records(&[
            ("10.1.2.0/24", "twenty-four"),
            ("10.0.0.0/8", "eight\n_REFER: whois.example.net"),
            ("10.1.0.0/16", "never seen"),
        ]);
        let matches = find_matches(&query("10.1.2.3"), &recs);
        assert_eq!(names(&matches), ["10.0.0.0/8", "10.1.2.0/24"]);
        assert!(render(&matches, |_| None).ends_with("\n\nReferralServer: whois.example.net"));
    }

    #[test]
    fn test_cidr_query_must_fit_inside() {
        let recs = records(&[("10.0.0.0/8", "eight"), ("10.1.0.0/16", "sixteen")]);
        let matches = find_matches(&query("10.0.0.0/12"), &recs);
        assert_eq!(names(&matches), ["10.0.0.0/8"]);
    }

    #[test]
    fn test_no_match_message() {
        let recs = records(&[("10.0.0.0/8", "eight")]);
        let matches = find_matches(&query("192.0.2.1"), &recs);
        assert!(matches.is_empty());
        assert_eq!(
            render(&matches, |_| None),
            "No information about that address is available from this WHOIS server"
        );
    }

    #[test]
    fn test_dynamic_companion_appended() {
        let recs = records(&[("192.0.2.0/24", "static")]);
        let dynamic = Record::address("192.0.2.0/24", "pulled").unwrap().into_dynamic();
        let matches = find_matches(&query("192.0.2.7"), &recs);
        let text = render(&matches, |r| (r.name() == "192.0.2.0/24").then_some(&dynamic));
        assert_eq!(text, "static\n\npulled");
    }

    #[test]
    fn test_dynamic_records_are_not_candidates() {
        let recs = vec![Record::address("192.0.2.0/24", "pulled").unwrap().into_dynamic()];
        assert!(find_matches(&query("192.0.2.7"), &recs).is_empty());
    }
}
