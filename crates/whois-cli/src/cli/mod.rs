//! CLI argument parsing and command dispatch.

pub mod args;

use anyhow::{Context, Result};
use args::{Cli, Commands, QueryArgs, ServeArgs};
use clap::Parser;
use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use whois_srv::pull::{upstream, PullScheduler};
use whois_srv::store::loader;
use whois_srv::{server, ServerConfig};

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    debug!(path = %config_path.display(), found = config_path.exists(), "loading configuration");
    let mut config = ServerConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    match cli.command {
        Commands::Serve(args) => serve(config, args).await,
        Commands::Check => check(&config).await,
        Commands::Query(args) => query(args).await,
        Commands::Init => init(&config),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn default_config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("net", "whoisd", "whoisd")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    Ok(dirs.config_dir().join("config.toml"))
}

async fn serve(mut config: ServerConfig, args: ServeArgs) -> Result<()> {
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    info!(
        listen = %config.listen,
        data_dir = %config.data_dir.display(),
        version = env!("CARGO_PKG_VERSION"),
        "starting whoisd"
    );
    server::run(&config).await?;
    Ok(())
}

async fn check(config: &ServerConfig) -> Result<()> {
    let store = server::build_store(config)?;
    let stats = store.rebuild().await?;
    let snapshot = store.snapshot();

    println!("data dir:      {}", config.data_dir.display());
    println!("built at:      {}", snapshot.built_at().to_rfc3339());
    println!("addresses:     {} ({} from feed)", stats.addresses, stats.feed_addresses);
    println!("domains:       {}", stats.domains);
    println!("asns:          {}", stats.asns);
    println!("skipped files: {}", stats.skipped);
    if !stats.feed_ok {
        println!("feed:          unavailable");
    }

    let jobs = PullScheduler::worklist(&snapshot);
    println!("pull targets:  {}", jobs.len());
    for job in &jobs {
        println!("  {} <- {}:{}", job.name, job.target.host, job.target.port);
    }
    if let Some(budget) = config.pull.budget() {
        let every = PullScheduler::interval_for(budget, jobs.len());
        println!("pull interval: {}ms", every.as_millis());
    }

    Ok(())
}

async fn query(args: QueryArgs) -> Result<()> {
    let timeout = Duration::from_secs(args.timeout);
    let text = upstream::fetch(&args.server, args.port, &args.token, timeout, timeout).await?;
    println!("{text}");
    Ok(())
}

fn init(config: &ServerConfig) -> Result<()> {
    loader::create_data_dirs(&config.data_dir)?;
    println!("storage directories ready under {}", config.data_dir.display());
    Ok(())
}
