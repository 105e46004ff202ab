use std::time::Duration;

use tracing::{error, info};

use photos_api::credentials::CredentialVerifier;
use photos_api::{AppStateInner, fault};
use photos_db::Database;
use photos_server::{config::Config, logging};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {e}");
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    logging::init(config.log_level, config.pretty_logs);

    let db = match Database::open(&config.db_path, config.pool) {
        Ok(db) => db,
        Err(e) => {
            error!(path = %config.db_path.display(), "Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let credentials = CredentialVerifier::new(config.salt.clone())?;
    let state = AppStateInner::new(db.clone(), credentials, &config.settings);

    fault::spawn_contained(
        "session-sweeper",
        state.sessions.clone().run_sweeper(SESSION_SWEEP_INTERVAL),
    );

    let app = photos_api::router(state).layer(logging::http_trace_layer());

    let addr = tokio::net::lookup_host((config.host.as_str(), config.port))
        .await?
        .next()
        .ok_or_else(|| anyhow::anyhow!("{}:{} did not resolve", config.host, config.port))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "Photos listening on {} (uploads in {})",
        addr,
        config.settings.upload_dir.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
