//! Standalone data sync CLI.

use clap::{Parser, Subcommand};
use stocksync_collector::{modules, SyncerConfig};
use stocksync_core::{init_logging, LogConfig, Market};

#[derive(Parser)]
#[command(name = "stocksync-collector")]
#[command(about = "StockSync incremental market data collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync one target table
    Sync {
        /// Market to sync (idx, us)
        #[arg(long)]
        market: String,

        /// Target table (e.g. "idx_daily_data", "daily_data")
        #[arg(long)]
        table: String,

        /// Symbols per page; -1 syncs the whole roster
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        batch_size: i64,

        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        batch_num: i64,
    },

    /// Run every category for a market sequentially
    RunAll {
        /// Market to sync (idx, us)
        #[arg(long)]
        market: String,

        /// Symbols per page; -1 syncs the whole roster
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        batch_size: i64,

        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        batch_num: i64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_logging(LogConfig::new(format!(
        "stocksync_collector={level},stocksync_data={level}",
        level = cli.log_level
    )))?;

    tracing::info!("StockSync collector starting");

    let config = SyncerConfig::from_env()?;
    tracing::debug!(backfill_days = config.backfill_days, "configuration loaded");

    let pool = sqlx::PgPool::connect(&config.database_url).await?;
    tracing::info!("database connected");

    match cli.command {
        Commands::Sync {
            market,
            table,
            batch_size,
            batch_num,
        } => {
            let market: Market = market.parse()?;
            let stats = modules::run(&pool, &config, market, &table, batch_size, batch_num).await?;
            stats.log_summary(&table);
        }
        Commands::RunAll {
            market,
            batch_size,
            batch_num,
        } => {
            let market: Market = market.parse()?;
            let tables = modules::default_tables(market);

            for (step, table) in tables.iter().enumerate() {
                tracing::info!(
                    step = format!("{}/{}", step + 1, tables.len()),
                    table = table,
                    "run-all step"
                );
                match modules::run(&pool, &config, market, table, batch_size, batch_num).await {
                    Ok(stats) => stats.log_summary(table),
                    Err(e) => tracing::error!(table = table, error = %e, "table sync failed"),
                }
            }
        }
    }

    pool.close().await;
    tracing::info!("StockSync collector finished");

    Ok(())
}
