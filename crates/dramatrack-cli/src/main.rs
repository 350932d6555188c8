mod analyze;
mod collect;
mod runs;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use dramatrack_analysis::DEFAULT_REPORT_MAX_CHARS;
use dramatrack_core::MAX_WINDOW_DAYS;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dramatrack")]
#[command(about = "Capture short-drama rankings and report what changed")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Fetch every selected platform and append one snapshot each
    Collect {
        /// Restrict to these platform ids (repeatable)
        #[arg(long = "platform")]
        platforms: Vec<String>,

        /// Fetch and validate without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Compare the latest two snapshots of each platform
    Analyze {
        /// Restrict to these platform ids (repeatable)
        #[arg(long = "platform")]
        platforms: Vec<String>,

        /// Print the full analysis as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render the text report, save it, and print it
    Report {
        /// Restrict to these platform ids (repeatable)
        #[arg(long = "platform")]
        platforms: Vec<String>,

        /// Where to save the full report (defaults to DRAMATRACK_REPORT_PATH)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Cut the printed report to this many characters
        #[arg(long, default_value_t = DEFAULT_REPORT_MAX_CHARS)]
        max_chars: usize,
    },
    /// Write the structured JSON export
    Export {
        /// Restrict to these platform ids (repeatable)
        #[arg(long = "platform")]
        platforms: Vec<String>,

        /// Export file path (defaults to DRAMATRACK_EXPORT_PATH)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show one item's rank and metrics over time
    History {
        #[arg(long)]
        platform: String,

        #[arg(long)]
        item: String,

        /// Trailing window in days
        #[arg(
            long,
            default_value_t = 30,
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_WINDOW_DAYS))
        )]
        days: u32,
    },
    /// List recent capture runs
    Runs {
        #[arg(long, default_value_t = 20)]
        limit: i64,

        /// Show per-platform results for one run
        #[arg(long)]
        id: Option<i64>,
    },
    /// Collect, then report and export (the scheduled job)
    Run {
        /// Restrict to these platform ids (repeatable)
        #[arg(long = "platform")]
        platforms: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Verify the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = dramatrack_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = dramatrack_db::PoolConfig::from_app_config(&config);
    let pool = dramatrack_db::connect_pool(&config.database_url, pool_config).await?;

    if let Some(Commands::Db { command }) = &cli.command {
        return run_db(&pool, command).await;
    }

    dramatrack_db::run_migrations(&pool).await?;
    let store = dramatrack_db::PgSnapshotStore::new(pool.clone());

    match cli.command {
        Some(Commands::Db { .. }) => Ok(()),
        Some(Commands::Collect {
            platforms,
            dry_run,
        }) => {
            let catalog = load_catalog(&config)?;
            let selected = select_platforms(&config, &platforms);
            let registry = collect::build_registry(&config, &catalog)?;
            collect::run_collect(&pool, &store, &registry, &config, &selected, dry_run).await?;
            Ok(())
        }
        Some(Commands::Analyze { platforms, json }) => {
            let selected = select_platforms(&config, &platforms);
            analyze::run_analyze(&store, &config, &selected, json).await
        }
        Some(Commands::Report {
            platforms,
            output,
            max_chars,
        }) => {
            let catalog = load_catalog(&config)?;
            let selected = select_platforms(&config, &platforms);
            let path = output.unwrap_or_else(|| config.report_path.clone());
            analyze::run_report(&store, &config, &catalog, &selected, &path, max_chars).await
        }
        Some(Commands::Export { platforms, output }) => {
            let catalog = load_catalog(&config)?;
            let selected = select_platforms(&config, &platforms);
            let path = output.unwrap_or_else(|| config.export_path.clone());
            analyze::run_export(&store, &config, &catalog, &selected, &path).await
        }
        Some(Commands::History {
            platform,
            item,
            days,
        }) => analyze::run_history(&store, &platform.to_lowercase(), &item, days).await,
        Some(Commands::Runs { limit, id }) => match id {
            Some(id) => runs::run_show(&pool, id).await,
            None => runs::run_list(&pool, limit).await,
        },
        Some(Commands::Run { platforms }) => run_all(&pool, &store, &config, &platforms).await,
        None => run_all(&pool, &store, &config, &[]).await,
    }
}

async fn run_db(pool: &sqlx::PgPool, command: &DbCommands) -> anyhow::Result<()> {
    match command {
        DbCommands::Ping => {
            dramatrack_db::ping(pool).await?;
            println!("database reachable");
        }
        DbCommands::Migrate => {
            let applied = dramatrack_db::run_migrations(pool).await?;
            println!("applied {applied} migration(s)");
        }
    }
    Ok(())
}

/// Collect, then report and export from whatever is stored.
///
/// A failed collect still produces a report over earlier snapshots; its
/// error is returned afterwards so the process exits non-zero.
async fn run_all(
    pool: &sqlx::PgPool,
    store: &dramatrack_db::PgSnapshotStore,
    config: &dramatrack_core::AppConfig,
    platforms: &[String],
) -> anyhow::Result<()> {
    let catalog = load_catalog(config)?;
    let selected = select_platforms(config, platforms);
    let registry = collect::build_registry(config, &catalog)?;

    let collected = collect::run_collect(pool, store, &registry, config, &selected, false).await;
    if let Err(ref e) = collected {
        tracing::error!(error = %e, "collect step failed; reporting on stored snapshots");
    }

    analyze::run_report_and_export(store, config, &catalog, &selected, DEFAULT_REPORT_MAX_CHARS)
        .await?;

    collected.map(|_| ())
}

fn load_catalog(
    config: &dramatrack_core::AppConfig,
) -> anyhow::Result<dramatrack_core::PlatformsFile> {
    Ok(dramatrack_core::load_platforms(&config.platforms_path)?)
}

/// Platforms named on the command line, or the configured set when none are.
fn select_platforms(config: &dramatrack_core::AppConfig, requested: &[String]) -> Vec<String> {
    if requested.is_empty() {
        return config.platforms.clone();
    }
    let mut selected: Vec<String> = Vec::new();
    for id in requested.iter().map(|p| p.trim().to_lowercase()) {
        if !id.is_empty() && !selected.contains(&id) {
            selected.push(id);
        }
    }
    selected
}

/// Directory that relative paths inside the catalog resolve against.
fn catalog_dir(config: &dramatrack_core::AppConfig) -> &Path {
    config
        .platforms_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}
