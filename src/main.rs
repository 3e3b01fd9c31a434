use anyhow::Result;
use tokio::{net::TcpListener, signal, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rack_dashboard::{
    api::{self, AppState},
    client::DashboardClient,
    config::Config,
    dashboard::{self, Dashboard},
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env if present; env vars may also be set externally
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    info!(api_url = %config.api_url, "Configuration loaded");

    let client = DashboardClient::new(&config.api_url, config.http_timeout())?;

    let dashboard = Dashboard::start(client.clone(), config.poll_schedule());
    let observer = spawn_render_observer(&dashboard);

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP server listening");

    let state = AppState::from_dashboard(&dashboard, client);
    let served = axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    dashboard.shutdown().await;
    if let Err(e) = observer.await {
        error!(error = %e, "Render observer ended abnormally");
    }

    served?;
    Ok(())
}

/// Log a one-line summary each time the dashboard state changes.
fn spawn_render_observer(dashboard: &Dashboard) -> JoinHandle<()> {
    let mut status = dashboard.subscribe_status();
    let mut weather = dashboard.subscribe_weather();
    let cancel: CancellationToken = dashboard.shutdown_token();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                changed = status.changed() => if changed.is_err() { break },
                changed = weather.changed() => if changed.is_err() { break },
            }

            let view = dashboard::render(&status, &weather);
            let alerts = view.sensors.iter().filter(|s| s.alert).count();
            info!(
                time = %view.clock.time,
                sensors = view.sensors.len(),
                alerts,
                points = view.graph.points.len(),
                weather = view.weather.as_ref().map_or("--", |w| w.temperature.as_str()),
                "Dashboard updated"
            );
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received");
}
