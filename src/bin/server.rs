use clap::Parser;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use uptime_monitor::db::schema;
use uptime_monitor::monitoring::{CheckRunner, HealthProbe, Scheduler};
use uptime_monitor::server::config::ServerConfig;
use uptime_monitor::services::auth_service::TokenService;
use uptime_monitor::web::create_axum_router;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "server.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C.");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM.");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // Logging needs the log directory, so the config is read first and any
    // load error is reported once logging is up.
    let loaded = ServerConfig::load(args.config.as_deref());
    init_logging(loaded.as_ref().map(|c| c.log_dir.as_str()).unwrap_or("logs"));
    info!("Starting uptime monitor, version: {}", env!("CARGO_PKG_VERSION"));

    let server_config = match loaded {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Failed to load server configuration: {}", e);
            return Err(e.into());
        }
    };

    // --- Database Setup ---
    let mut opt = ConnectOptions::new(server_config.database_url.to_owned());
    opt.max_connections(server_config.max_db_connections)
        .sqlx_logging(false);
    let db_pool: DatabaseConnection = Database::connect(opt).await.map_err(|e| {
        error!(error = %e, "Failed to create database connection.");
        Box::new(e)
    })?;
    schema::create_tables(&db_pool).await?;
    info!("Database schema is ready.");

    // --- Check Pipeline ---
    let probe = HealthProbe::new()?;
    let check_runner = CheckRunner::new(db_pool.clone(), probe, server_config.lease_grace());
    let scheduler = Arc::new(Scheduler::new(
        check_runner.clone(),
        server_config.scheduler_config(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let scheduler_task = tokio::spawn(scheduler.start(shutdown_rx));

    // --- HTTP Server ---
    let token_service = Arc::new(TokenService::new(&server_config.jwt_secret));
    let app = create_axum_router(db_pool, check_runner, token_service);

    let listener = tokio::net::TcpListener::bind(&server_config.listen_address).await?;
    info!(address = %server_config.listen_address, "HTTP server listening.");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(Box::new)?;

    if shutdown_tx.send(()).is_err() {
        info!("Scheduler had already stopped.");
    }
    if let Err(e) = scheduler_task.await {
        error!(error = %e, "Scheduler task ended abnormally.");
    }

    info!("Uptime monitor stopped.");
    Ok(())
}
