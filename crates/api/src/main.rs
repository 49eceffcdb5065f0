use anyhow::anyhow;
use axum::serve;
use climate_api::{app, build_app_state, get_config_info, get_log_level, setup_logger};
use futures::TryFutureExt;
use hawaii_climate_core::path_exists;
use log::{info, warn};
use std::{net::SocketAddr, str::FromStr};
use tokio::{net::TcpListener, signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = get_config_info();
    let log_level = get_log_level(&cli);

    setup_logger()
        .level(log_level)
        .level_for("duckdb", log_level)
        .level_for("climate_api", log_level)
        .level_for("http_response", log_level)
        .level_for("http_request", log_level)
        .apply()?;

    let data_dir = cli.data_dir();
    let host = cli.host();
    let port = cli.port();
    let remote_url = cli.remote_url();

    if !path_exists(&data_dir) {
        warn!(
            "data directory {} does not exist, queries will fail until the dataset is in place",
            data_dir
        );
    }

    let socket_addr = SocketAddr::from_str(&format!("{}:{}", host, port))
        .map_err(|e| anyhow!("invalid address: {}", e))?;

    let listener = TcpListener::bind(socket_addr)
        .map_err(|e| anyhow!("error binding to socket: {}", e))
        .await?;

    info!("Hawaii climate API starting...");
    info!("  Listen:  http://{}", socket_addr);
    info!("  Docs:    http://{}/docs", socket_addr);
    info!("  Dataset: {}", data_dir);

    let app_state = build_app_state(remote_url, data_dir);
    let app = app(app_state);

    serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
