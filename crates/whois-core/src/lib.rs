//! Core types for a WHOIS registry server.
//!
//! This crate holds everything about answering a query that does not touch
//! the network or the filesystem:
//!
//! - **Records**: parsed registry entries ([`Record`]) for address blocks,
//!   domains and AS numbers, with `_REFER` / `_PULL` directives split out
//! - **Queries**: classification of a raw query line into a [`Query`]
//! - **Matching**: longest-prefix address matching with referral stop
//! - **Referrals**: exact-key answers with referral or dynamic companion
//!
//! # Example
//!
//! ```rust,ignore
//! use whois_core::{matcher, Query, Record};
//!
//! let records = vec![Record::address("10.0.0.0/8", "netname: TEN")?];
//! if let Query::Address(q) = Query::classify("10.1.2.3")? {
//!     let matches = matcher::find_matches(&q, &records);
//!     println!("{}", matcher::render(&matches, |_| None));
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/whois-core/0.1.0")]

mod error;
pub mod keys;
pub mod matcher;
pub mod query;
pub mod record;
pub mod referral;
pub mod response;

pub use error::{Result, WhoisError};
pub use query::{AddressQuery, Query};
pub use record::{PullTarget, Record, RecordKind};
