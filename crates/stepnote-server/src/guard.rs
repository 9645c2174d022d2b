use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::state::AppState;

/// Axum middleware run before every proxy route.
///
/// Evaluated in order:
/// 1. `OPTIONS` → 200 with an empty JSON body (CORS headers come from the outer layer)
/// 2. no upstream credential configured → 500 configuration error
/// 3. otherwise → passthrough
pub async fn credential_guard(State(app): State<AppState>, req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        return (StatusCode::OK, axum::Json(serde_json::json!({}))).into_response();
    }

    if let Err(e) = app.table() {
        return AppError::from(e).into_response();
    }

    next.run(req).await
}
