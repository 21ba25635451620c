//! notion-courier - Notion to GitHub issue courier
//!
//! Main entry point for the courier CLI.

use clap::{Parser, Subcommand};
use notion_courier::config::CourierConfig;
use notion_courier::courier::{DaemonConfig, EngineConfig, SyncDaemon, SyncEngine};
use notion_courier::integrations::{GitHubAdapter, NotionAdapter};
use notion_courier::ledger::Ledger;
use notion_courier::server::{HealthServer, HealthState};
use std::process;

/// notion-courier - Mirror validated Notion pages into GitHub issues
#[derive(Parser, Debug)]
#[command(name = "notion-courier")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.config/notion-courier/config.yaml)
    #[arg(short, long)]
    config: Option<String>,

    /// Compute drafts but make no outbound writes
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the poll daemon with the health server
    Run {
        /// Bind address for the health endpoints (overrides config)
        #[arg(long)]
        listen: Option<String>,
    },

    /// Run a single sync cycle and exit
    Sync,

    /// Validate configuration and show a redacted summary
    Check,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    if let Err(e) = notion_courier::logging::init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> notion_courier::Result<()> {
    let mut config = match &cli.config {
        Some(path) => CourierConfig::from_env_and_file(path)?,
        None => CourierConfig::from_env()?,
    };
    if cli.dry_run {
        config.dry_run = true;
    }

    match cli.command {
        Commands::Run { listen } => run_daemon(config, listen).await,
        Commands::Sync => run_once(config).await,
        Commands::Check => check_config(&config),
    }
}

/// Run the poll loop until SIGTERM/SIGINT
async fn run_daemon(config: CourierConfig, listen: Option<String>) -> notion_courier::Result<()> {
    let listen_addr = listen.unwrap_or_else(|| config.listen_addr.clone());

    let engine = build_engine(&config)?;
    let mut daemon = SyncDaemon::new(engine, DaemonConfig::new(config.poll_interval));

    // Health endpoints run beside the poll loop and never block it
    let health = HealthServer::new(HealthState::from_config(&config));
    tokio::spawn(async move {
        if let Err(e) = health.run(&listen_addr).await {
            tracing::error!("Health server failed: {}", e);
        }
    });

    tracing::info!(
        repo = %config.repo_slug(),
        poll_interval_secs = config.poll_interval.as_secs(),
        dry_run = config.dry_run,
        "Courier starting"
    );

    daemon.run().await
}

/// Run one cycle and report it on stdout
async fn run_once(config: CourierConfig) -> notion_courier::Result<()> {
    let mut engine = build_engine(&config)?;
    let report = engine.run_cycle().await?;

    println!("Cycle complete:");
    println!("  Eligible: {}", report.eligible);
    println!("  Synced:   {}", report.synced);
    println!("  Repaired: {}", report.repaired);
    if report.planned > 0 {
        println!("  Planned:  {} (dry-run)", report.planned);
    }
    println!("  Skipped:  {}", report.skipped);

    if report.has_errors() {
        println!("  Errors:   {}", report.errors.len());
        for error in &report.errors {
            println!("    - {}", error);
        }
        return Err(notion_courier::CourierError::Other(format!(
            "{} page(s) failed to sync",
            report.errors.len()
        )));
    }

    Ok(())
}

fn build_engine(
    config: &CourierConfig,
) -> notion_courier::Result<SyncEngine<NotionAdapter, GitHubAdapter>> {
    let notion = NotionAdapter::new(
        config.notion_token.clone(),
        config.notion_database_id.clone(),
    )?;
    let github = GitHubAdapter::new(
        config.github_token.clone(),
        config.github_owner.clone(),
        config.github_repo.clone(),
    )?;
    let ledger = Ledger::open(&config.ledger_path)?;

    Ok(SyncEngine::new(
        notion,
        github,
        ledger,
        EngineConfig::from_config(config),
    ))
}

/// Print a redacted configuration summary
fn check_config(config: &CourierConfig) -> notion_courier::Result<()> {
    println!("Configuration OK");
    println!();
    println!("  Notion database:  {}", config.notion_database_id);
    println!("  Notion token:     {}", mask(&config.notion_token));
    println!("  GitHub repo:      {}", config.repo_slug());
    println!("  GitHub token:     {}", mask(&config.github_token));
    match &config.github_project_id {
        Some(id) => println!("  Project:          {}", id),
        None => println!("  Project:          (not configured)"),
    }
    println!("  Draft mode:       {}", config.project_create_draft);
    println!("  Trigger status:   {}", config.transition.trigger());
    println!("  Synced status:    {}", config.transition.next());
    println!("  Poll interval:    {}s", config.poll_interval.as_secs());
    println!("  Dry run:          {}", config.dry_run);
    println!("  Listen address:   {}", config.listen_addr);
    println!("  Ledger:           {}", config.ledger_path.display());

    let ledger = Ledger::open(&config.ledger_path)?;
    println!("  Recorded pages:   {}", ledger.count()?);

    Ok(())
}

/// Show enough of a secret to recognize it, never the whole value
fn mask(secret: &str) -> String {
    if secret.len() <= 8 {
        "********".to_string()
    } else {
        let prefix: String = secret.chars().take(4).collect();
        format!("{}****", prefix)
    }
}
