use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use rag_chatbot_backend::core::config::Settings;
use rag_chatbot_backend::core::logging;
use rag_chatbot_backend::server;
use rag_chatbot_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env().context("Failed to load configuration")?;
    logging::init(&settings.log_dir);
    tracing::debug!("Loaded settings: {:?}", settings);

    let bind_addr = settings.bind_addr();
    let state = AppState::initialize(settings)
        .await
        .context("Failed to initialize application state")?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
