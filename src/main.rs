use clap::Parser;
use foodorder::{app::Application, config::AppConfig, telemetry::register_telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config setup
    dotenvy::dotenv().ok();

    let app_config = AppConfig::parse();

    // Setup telemetry before building, so store/email setup is logged
    register_telemetry(std::io::stdout);

    let app = Application::build(app_config).await?;
    tracing::info!(port = app.port, "listening");

    // Run on tokio multi-thread
    let (close_tx, close_rx) = tokio::sync::oneshot::channel();
    let server_handle = tokio::spawn(async move { app.run_gracefully(close_rx).await });

    // Listen for shutdown command
    shutdown_signal().await;

    // Send shutdown signal to server
    _ = close_tx.send(());

    // Wait for server to gracefully shutdown
    server_handle.await??;

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
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
}
