//! whois-srv: RFC 3912 WHOIS registry server.
//!
//! Answers one query per TCP connection from an in-memory registry of
//! address blocks, domains and AS numbers, optionally pointing the client
//! at another WHOIS server.
//!
//! # Architecture
//!
//! - **Store**: immutable [`store::Snapshot`]s rebuilt from flat files (plus
//!   an optional IPAM feed) and swapped atomically; readers never see a
//!   half-built registry
//! - **Pull**: a background scheduler that mirrors `_PULL` records from
//!   their upstream servers into dynamic companion files, picked up by the
//!   next rebuild
//! - **Session**: the per-connection read line, classify, answer, close
//!   state machine
//!
//! # Storage
//!
//! The data directory holds `ipv4/`, `ipv6/`, `domain/` and `asn/`. Each
//! file is one record named by its key; dynamic companions carry a `d_`
//! prefix.

pub mod config;
pub mod error;
pub mod feed;
pub mod pull;
pub mod server;
pub mod session;
pub mod store;

// Re-exports for convenience.
pub use config::ServerConfig;
pub use error::SrvError;
pub use store::{RegistryStore, Snapshot};

/// Result type for whois-srv operations.
pub type Result<T> = std::result::Result<T, SrvError>;
