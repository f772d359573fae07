//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

/// WHOIS registry server
///
/// Answers address, domain and ASN queries from flat-file records,
/// with optional referrals and upstream mirroring.
#[derive(Parser, Debug)]
#[command(name = "whoisd")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: platform config dir, whoisd/config.toml)
    #[arg(short, long, env = "WHOISD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Storage root, overrides `data_dir` from the config file
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the server
    Serve(ServeArgs),

    /// Load the registry once and report what it holds
    Check,

    /// Send one query to a WHOIS server and print the answer
    Query(QueryArgs),

    /// Create the storage directories
    Init,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen address, overrides `listen` from the config file
    #[arg(short, long)]
    pub listen: Option<SocketAddr>,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Query token: address, CIDR block, domain, TLD or AS number
    pub token: String,

    /// Server to ask
    #[arg(short, long, default_value = "127.0.0.1")]
    pub server: String,

    /// Server port
    #[arg(short, long, default_value_t = 43)]
    pub port: u16,

    /// Give up after this many seconds
    #[arg(short, long, default_value_t = 10)]
    pub timeout: u64,
}
