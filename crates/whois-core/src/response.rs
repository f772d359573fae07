//! Fixed response texts and trailer formatting.
//!
//! Responses carry no trailing newline; the connection close terminates them.

/// Written when no address record contains the query.
pub const NO_ADDRESS: &str = "No information about that address is available from this WHOIS server";

/// Written when no domain or TLD record has the queried key.
pub const NO_DOMAIN: &str = "No information about that domain is available from this WHOIS server";

/// Written when no ASN record has the queried key.
pub const NO_ASN: &str = "No information about that ASN is available from this WHOIS server";

/// Written for a line that fits no query class.
pub const INVALID_QUERY: &str = "Invalid query";

/// Written for a CIDR suffix wider than its address family.
pub const INVALID_CIDR: &str = "Invalid CIDR";

/// Separator between record bodies and before the referral trailer.
pub const SECTION_BREAK: &str = "\n\n";

/// Format the referral trailer line for `host`.
#[must_use]
pub fn referral_trailer(host: &str) -> String {
    format!("ReferralServer: {host}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referral_trailer() {
        assert_eq!(
            referral_trailer("whois.example.net"),
            "ReferralServer: whois.example.net"
        );
    }

    #[test]
    fn test_fixed_texts_have_no_newline() {
        for text in [NO_ADDRESS, NO_DOMAIN, NO_ASN, INVALID_QUERY, INVALID_CIDR] {
            assert!(!text.ends_with('\n'));
        }
    }
}
