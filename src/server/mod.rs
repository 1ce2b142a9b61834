pub mod generate;
pub mod router;

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::upstream::InferenceClient;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Serve the HTTP API until `shutdown` fires.
pub async fn start(
    config: &ServerConfig,
    inference: Arc<InferenceClient>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let app = router::create_router(inference);
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    log::info!("Axum server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    log::info!("Server stopped");
    Ok(())
}
