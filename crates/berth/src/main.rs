use berth_apiserver::{ApiServer, AppState, Config as ApiConfig};
use berth_scheduler::SchedulerConfig;
use berth_storage::RedbBackend;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "berth", about = "Berth deployment scheduler")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "BERTH_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server and scheduling engine
    Serve {
        /// Address to listen on
        #[arg(long, env = "BERTH_BIND", default_value = "0.0.0.0:8000")]
        bind: String,
        /// Path to the redb database file, created if missing
        #[arg(long, env = "BERTH_DB_PATH", default_value = "./berth.redb")]
        db_path: PathBuf,
        /// Drain the low tier in the same pass once the high tier empties
        #[arg(long, env = "BERTH_LOW_TIER_AFTER_HIGH_DRAINS")]
        low_tier_after_high_drains: bool,
    },
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    match cli.command {
        Commands::Serve {
            bind,
            db_path,
            low_tier_after_high_drains,
        } => {
            let config = SchedulerConfig {
                low_tier_after_high_drains,
            };
            run_serve(&bind, &db_path, config).await
        }
    }
}

/// Run the API server until ctrl-c
async fn run_serve(bind: &str, db_path: &Path, config: SchedulerConfig) -> miette::Result<()> {
    info!("Starting berth");

    let state = create_app_state(db_path, config)?;

    let api_config = ApiConfig {
        listen_addr: bind
            .parse()
            .map_err(|e| miette::miette!("Invalid bind address '{}': {}", bind, e))?,
    };

    let token = CancellationToken::new();

    let api_server = ApiServer::new(api_config, state);
    let api_token = token.clone();
    let mut api_handle = tokio::spawn(async move {
        if let Err(e) = api_server.run(api_token.cancelled_owned()).await {
            error!("API server error: {}", e);
        }
    });

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.map_err(|e| miette::miette!("Failed to listen for ctrl-c: {}", e))?;
        }
        _ = &mut api_handle => {
            return Err(miette::miette!("API server exited unexpectedly"));
        }
    }

    info!("Shutting down gracefully...");
    token.cancel();

    let shutdown_timeout = std::time::Duration::from_secs(5);
    if tokio::time::timeout(shutdown_timeout, api_handle).await.is_err() {
        warn!("API server did not stop within {:?}", shutdown_timeout);
    }

    info!("Shutdown complete");

    Ok(())
}

/// Create the shared application state
fn create_app_state(db_path: &Path, config: SchedulerConfig) -> miette::Result<Arc<AppState>> {
    let storage = Arc::new(RedbBackend::new(db_path).map_err(|e| {
        miette::miette!("Failed to open storage at '{}': {}", db_path.display(), e)
    })?);

    Ok(Arc::new(AppState::with_scheduler_config(storage, config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_serve_takes_database_file_path() {
        let cli = Cli::try_parse_from(["berth", "serve", "--db-path", "/var/lib/berth/state.redb"]).unwrap();
        let Commands::Serve { bind, db_path, low_tier_after_high_drains } = cli.command;

        assert_eq!(bind, "0.0.0.0:8000");
        assert_eq!(db_path, PathBuf::from("/var/lib/berth/state.redb"));
        assert!(!low_tier_after_high_drains);
    }

    #[test]
    fn test_app_state_creates_database_file() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("berth.redb");

        create_app_state(&db_path, SchedulerConfig::default()).unwrap();

        assert!(db_path.is_file());
    }
}
