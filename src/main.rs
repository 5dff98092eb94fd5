mod tui;

use clap::{Parser, Subcommand};
use kioskflow::backend::{BackendClient, SettlementBackend};
use kioskflow::config::AppConfig;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILE: &str = "kioskflow.log";

#[derive(Parser)]
#[command(name = "kioskflow")]
#[command(about = "Cash-to-crypto kiosk controller")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the kiosk screen (default)
    Run {
        /// File receiving the session logs
        #[arg(long, default_value = DEFAULT_LOG_FILE)]
        log_file: PathBuf,
        /// Write logs as JSON lines
        #[arg(long)]
        json_logs: bool,
    },
    /// Fetch the machine status once and print it as JSON
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::Run {
        log_file: PathBuf::from(DEFAULT_LOG_FILE),
        json_logs: false,
    });

    match command {
        Commands::Run {
            log_file,
            json_logs,
        } => {
            // The terminal belongs to the kiosk screen, so logs go to a file.
            init_file_logging(&log_file, json_logs)?;
            info!("Starting kioskflow v{}", env!("CARGO_PKG_VERSION"));

            let config = AppConfig::init()?;
            info!(
                "Configuration loaded, backend at {}, identity at {}",
                config.backend.url, config.identity.url
            );
            tui::run_tui(config).await
        }
        Commands::Status => {
            init_stderr_logging();
            let config = AppConfig::init()?;
            let client = BackendClient::new(&config.backend)?;
            let status = client.stats().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| "kioskflow=info".into())
}

fn init_file_logging(path: &Path, json: bool) -> anyhow::Result<()> {
    let writer = Mutex::new(OpenOptions::new().create(true).append(true).open(path)?);
    let layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(layer)
        .init();
    Ok(())
}

fn init_stderr_logging() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
