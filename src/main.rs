//! Main entry point for the rivalry ledger
//!
//! Loads configuration, then replays a JSON script of match operations
//! against in-memory stores and prints the resulting standings.

use anyhow::Result;
use clap::Parser;
use rivalry_ledger::config::{validate_config, AppConfig};
use rivalry_ledger::replay::{replay, ReplayScript, StepStatus};
use rivalry_ledger::service::MatchService;
use rivalry_ledger::utils::format_change;
use std::path::PathBuf;
use tracing::{error, info};

/// Rivalry Ledger - reversible Elo ratings for head-to-head matches
#[derive(Parser)]
#[command(
    name = "rivalry-ledger",
    version,
    about = "Replay head-to-head match operations through the rating ledger",
    long_about = "Rivalry Ledger keeps an Elo rating per player and lets recorded matches be \
                 edited or deleted by exactly reverting the rating delta stored with each match. \
                 This binary replays a JSON script of record/edit/delete operations and prints \
                 the resulting standings."
)]
struct Args {
    /// Replay script (JSON)
    #[arg(value_name = "SCRIPT", required_unless_present = "dry_run")]
    script: Option<PathBuf>,

    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// K-factor override
    #[arg(short, long, value_name = "K", help = "Override the Elo K-factor")]
    k_factor: Option<f64>,

    /// Starting rating override
    #[arg(long, value_name = "RATING", help = "Override the rating of new players")]
    starting_rating: Option<i64>,

    /// Print Prometheus metrics after the replay
    #[arg(long, help = "Print collected metrics in Prometheus text format")]
    metrics: bool,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(long, help = "Validate configuration and exit without replaying")]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Display startup banner with configuration summary
fn display_startup_banner(config: &AppConfig) {
    info!("📒 Rivalry Ledger");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Starting rating: {}", config.rating.starting_rating);
    info!("   K-factor: {}", config.rating.k_factor);
    info!("   Rounding: {}", config.rating.rounding);
    info!("   Store timeout: {}ms", config.ledger.store_timeout_ms);
    info!(
        "   Conflict retries: {}",
        config.ledger.max_conflict_retries
    );
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from environment, file and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(k_factor) = args.k_factor {
        config.rating.k_factor = k_factor;
    }

    if let Some(starting_rating) = args.starting_rating {
        config.rating.starting_rating = starting_rating;
    }

    validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    display_startup_banner(&config);

    if args.dry_run {
        info!("Configuration validation successful");
        info!("Dry run completed - exiting without replaying");
        return Ok(());
    }

    let Some(script_path) = &args.script else {
        anyhow::bail!("No replay script given");
    };

    let script = ReplayScript::from_file(script_path)?;
    info!(
        "Replaying {} steps for {} players from {}",
        script.steps.len(),
        script.players.len(),
        script_path.display()
    );

    let service = MatchService::in_memory(&config)?;
    let report = replay(&service, &script).await?;

    for step in &report.steps {
        match &step.status {
            StepStatus::Applied { rating_changes } => {
                let changes: Vec<String> = rating_changes
                    .iter()
                    .map(|c| format!("{} {}", c.player_id, format_change(c.old_rating, c.new_rating)))
                    .collect();
                println!("✅ #{} {} {}: {}", step.index, step.op, step.label, changes.join(", "));
            }
            StepStatus::Failed { kind, message } => {
                println!("❌ #{} {} {}: {} ({})", step.index, step.op, step.label, message, kind);
            }
        }
    }

    println!();
    println!(
        "{:<4} {:<20} {:>7} {:>4} {:>4} {:>4} {:>4} {:>6} {:>5}",
        "#", "Player", "Rating", "P", "W", "D", "L", "GD", "Pts"
    );
    for (position, entry) in service.standings().await?.iter().enumerate() {
        println!(
            "{:<4} {:<20} {:>7} {:>4} {:>4} {:>4} {:>4} {:>+6} {:>5}",
            position + 1,
            entry.player_id,
            entry.rating,
            entry.tally.matches_played,
            entry.tally.wins,
            entry.tally.draws,
            entry.tally.losses,
            entry.tally.goal_difference(),
            entry.tally.points
        );
    }

    if args.metrics {
        println!();
        print!("{}", service.metrics().gather_text()?);
    }

    if report.failures() > 0 {
        error!("{} of {} steps failed", report.failures(), report.steps.len());
        std::process::exit(2);
    }

    Ok(())
}
