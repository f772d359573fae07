//! Exact-key answers for domain and ASN queries.
//!
//! A record with a referral gets a `ReferralServer:` trailer and its dynamic
//! companion is not consulted. A record without one gets its companion's
//! body appended when a companion exists. Only one hop is ever emitted: the
//! client re-queries the referral server itself.

use crate::record::Record;
use crate::response::{self, SECTION_BREAK};

/// Text appended after `record`'s body, if any.
#[must_use]
pub fn resolve(record: &Record, companion: Option<&Record>) -> Option<String> {
    if let Some(referral) = record.referral() {
        return Some(format!(
            "{SECTION_BREAK}{}",
            response::referral_trailer(referral)
        ));
    }

    companion.map(|dynamic| format!("{SECTION_BREAK}{}", dynamic.body_text()))
}

/// Full response for an exact-key lookup.
///
/// `not_found` is written when `record` is absent.
#[must_use]
pub fn answer(record: Option<&Record>, companion: Option<&Record>, not_found: &str) -> String {
    let Some(record) = record else {
        return not_found.to_string();
    };

    let mut out = record.body_text();
    if let Some(appendix) = resolve(record, companion) {
        out.push_str(&appendix);
    }
    out
}
