use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;

use uninews_config::UniNewsConfig;
use uninews_scheduler::{LogSink, ReminderScheduler, SystemClock};
use uninews_store::ReminderStore;

#[derive(Parser)]
#[command(name = "uninews", about = "University news channel reminder service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST gateway and the reminder scheduler
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to the config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Run a single scheduler pass and exit
    Tick {
        /// Path to the config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load(config: Option<PathBuf>) -> anyhow::Result<UniNewsConfig> {
    Ok(match config {
        Some(path) => uninews_config::load_config_from(&path)?,
        None => uninews_config::load_config()?,
    })
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, config } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(async {
                let config = load(config)?;
                let tz = config.time_zone()?;
                let store = Arc::new(ReminderStore::open(&config.db_path, tz)?);
                info!("Storage initialized: {}", config.db_path.display());

                let scheduler = Arc::new(ReminderScheduler::new(
                    store.clone(),
                    Arc::new(LogSink),
                    Arc::new(SystemClock::new(tz)),
                    Duration::from_secs(config.scheduler.tick_seconds),
                ));
                tokio::spawn(scheduler.run());

                uninews_gateway::start_gateway(&config, store, port).await
            })?;
        }
        Commands::Tick { config } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(async {
                let config = load(config)?;
                let tz = config.time_zone()?;
                let store = Arc::new(ReminderStore::open(&config.db_path, tz)?);

                let scheduler = ReminderScheduler::new(
                    store,
                    Arc::new(LogSink),
                    Arc::new(SystemClock::new(tz)),
                    Duration::from_secs(config.scheduler.tick_seconds),
                );
                let summary = scheduler.tick_once().await?;
                println!(
                    "evaluated: {}  fired: {}  suppressed: {}  expired: {}",
                    summary.evaluated, summary.fired, summary.suppressed, summary.expired
                );
                anyhow::Ok(())
            })?;
        }
    }

    Ok(())
}
