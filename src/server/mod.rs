//! HTTP server implementation using Axum.

pub mod handlers;

use crate::core::{ModelRunner, ModelService};
use axum::{
    routing::{get, post},
    Router,
};
use handlers::{
    handle_get_model, handle_health, handle_list_models, handle_predict, handle_root,
    handle_train,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn router<R: ModelRunner + 'static>(service: Arc<ModelService<R>>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/v2/", get(handle_root))
        .route("/v2/models/", get(handle_list_models::<R>))
        .route("/v2/models/:name/", get(handle_get_model::<R>))
        .route("/v2/models/:name/predict/", post(handle_predict::<R>))
        .route("/v2/models/:name/train/", post(handle_train::<R>))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Binds `host:port` and serves in the background.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server<R: ModelRunner + 'static>(
    service: ModelService<R>,
    host: &str,
    port: u16,
) -> anyhow::Result<SocketAddr> {
    let app = router(Arc::new(service));

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}
