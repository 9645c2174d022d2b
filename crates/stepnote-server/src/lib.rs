pub mod config;
pub mod error;
pub mod guard;
pub mod routes;
pub mod state;
pub mod table;

use axum::middleware;
use axum::routing::{any, get, patch};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::ProxyConfig;
use routes::index::describe;

/// Build the axum Router with all proxy routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(config: ProxyConfig) -> Router {
    let app_state = state::AppState::new(config);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Lookups
        .route(
            "/api/records-by-unique-id",
            get(routes::records::by_unique_id).fallback(describe),
        )
        .route(
            "/api/record-by-task-number",
            get(routes::records::by_task_number).fallback(describe),
        )
        // Updates
        .route(
            "/api/record",
            patch(routes::records::update).fallback(routes::records::update_or_describe),
        )
        .route(
            "/api/record/{record_id}",
            patch(routes::records::update_by_path).fallback(describe),
        )
        // Single-endpoint form, selected by method and query
        .route("/api", any(routes::records::dispatch))
        .fallback(describe)
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            guard::credential_guard,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the proxy on `0.0.0.0:{port}`.
pub async fn serve(config: ProxyConfig, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    serve_on(config, listener).await
}

/// Start the proxy on a pre-bound listener.
///
/// Lets the caller read the actual port before starting (useful when
/// `port = 0` and the OS picks a free port).
pub async fn serve_on(config: ProxyConfig, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    if config.api_key.is_none() {
        tracing::warn!("no upstream API key configured; every request will fail with 500");
    }
    tracing::info!(?config, "stepnote proxy listening on http://localhost:{actual_port}/api");

    axum::serve(listener, build_router(config)).await?;
    Ok(())
}
