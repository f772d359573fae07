//! whoisd - WHOIS registry server
//!
//! Serves address, domain and ASN records over RFC 3912.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    whois_cli::run().await
}
