//! Axum server setup and startup

use std::future::Future;
use std::net::SocketAddr;

use tower_http::cors::{Any, CorsLayer};

use super::routes::create_router;
use super::SharedStateHandle;

/// Run the API server on the specified port until `shutdown` resolves.
///
/// In-flight requests are allowed to finish; the caller tears the pool down
/// afterwards.
pub async fn run_server<F>(
    port: u16,
    state: SharedStateHandle,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    // The command stream may come from a browser-hosted bot
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state).layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            log::info!("API server shutting down gracefully");
        })
        .await
}
