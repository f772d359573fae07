//! whoisd library: command line parsing, logging setup and command dispatch.

pub mod cli;

pub use cli::run;
