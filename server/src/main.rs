mod config;

use driftrace_core::repo::Repository;
use driftrace_core::repo_sqlite::SqliteRepository;
use driftrace_gateway::{GatewayConfig, GatewayContext};
use driftrace_registry::RoomRegistry;
use driftrace_room::RoomRef;
use driftrace_wallet::{CommissionRates, WalletLedger};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Rooms mid-race are given this long to reach `finished` before the
/// process gives up waiting and exits anyway.
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(5);

fn cli() -> clap::Command {
    use clap::{arg, Command};
    Command::new("driftrace-server").about("Drift Race realtime match server").arg(arg!([config] "Path to the TOML configuration file"))
}

fn init_tracing() {
    use tracing_subscriber::fmt::writer::MakeWriterExt;
    use tracing_subscriber::{fmt, EnvFilter};

    let file_appender = tracing_appender::rolling::daily("logs", "driftrace-server.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    // Leaked deliberately: the guard must outlive the process for buffered
    // writes to flush, and main() never returns ownership of it back out.
    Box::leak(Box::new(guard));

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(non_blocking.and(std::io::stdout))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let matches = cli().get_matches();
    let config_path = matches.get_one::<PathBuf>("config").cloned().unwrap_or_else(|| PathBuf::from("config.toml"));
    let config = config::Config::from_path(&config_path).await;

    let db_path = config.storage.resolved_db_path();
    info!(%db_path, "opening repository");
    let repo: Arc<dyn Repository> = Arc::new(SqliteRepository::try_new(&db_path)?);
    let commission_rates = CommissionRates {
        l1: config.economy.commission_l1,
        l2: config.economy.commission_l2,
        l3: config.economy.commission_l3,
    };
    let wallet = Arc::new(WalletLedger::new(repo.clone(), commission_rates));
    let registry: Arc<RoomRegistry<RoomRef>> = Arc::new(RoomRegistry::new());

    let room_config = config::room_config(&config);
    let gateway_config = GatewayConfig {
        port: config.network.port,
        idle_timeout: Duration::from_secs(config.network.idle_timeout_secs),
        join_timeout: Duration::from_secs(config.network.join_timeout_secs),
    };
    let context = GatewayContext::new(repo, wallet, registry, room_config, gateway_config);

    let server = tokio::spawn(driftrace_gateway::run_server(context));

    tokio::select! {
        result = server => {
            match result {
                Ok(Ok(())) => info!("gateway server stopped"),
                Ok(Err(e)) => error!(error = %e, "gateway server failed"),
                Err(e) => error!(error = %e, "gateway server task panicked"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received, draining room actors");
            tokio::time::sleep(SHUTDOWN_DRAIN).await;
        }
    }

    Ok(())
}
