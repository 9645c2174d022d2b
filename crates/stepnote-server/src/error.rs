use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use stepnote_core::error::StepnoteError;

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
///
/// Every failure is rendered as `{ "error": <summary>, "details": <detail> }`.
/// Upstream failures keep the upstream status and body.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request for a missing parameter or body field.
    pub fn missing(param: impl Into<String>) -> Self {
        Self(StepnoteError::MissingParameter(param.into()).into())
    }

    /// Construct a 400 Bad Request for parameters that could not be read.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self(StepnoteError::InvalidParameter(reason.into()).into())
    }

    fn parts(&self) -> (StatusCode, String, Value) {
        let Some(e) = self.0.downcast_ref::<StepnoteError>() else {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                Value::String(format!("{:#}", self.0)),
            );
        };
        match e {
            StepnoteError::MissingCredential(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server configuration error".to_string(),
                Value::String(e.to_string()),
            ),
            StepnoteError::MissingParameter(_) => {
                (StatusCode::BAD_REQUEST, e.to_string(), Value::Null)
            }
            StepnoteError::InvalidParameter(reason) => (
                StatusCode::BAD_REQUEST,
                "Invalid request parameters".to_string(),
                Value::String(reason.clone()),
            ),
            StepnoteError::Upstream { status, body } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                "Upstream service error".to_string(),
                body.clone(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                Value::String(e.to_string()),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = self.parts();
        if status.is_server_error() {
            tracing::error!(%status, "{error}: {details}");
        } else {
            tracing::warn!(%status, "{error}");
        }
        let body = serde_json::json!({ "error": error, "details": details });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn missing_credential_maps_to_500() {
        let err = AppError(StepnoteError::MissingCredential("AIRTABLE_API_KEY").into());
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn missing_parameter_maps_to_400() {
        let err = AppError::missing("uniqueId");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_status_passes_through() {
        let err = AppError(
            StepnoteError::Upstream {
                status: 429,
                body: serde_json::json!({ "error": { "type": "RATE_LIMIT_REACHED" } }),
            }
            .into(),
        );
        assert_eq!(err.into_response().status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn upstream_details_are_verbatim() {
        let body = serde_json::json!({ "error": "NOT_FOUND" });
        let err = AppError(
            StepnoteError::Upstream {
                status: 404,
                body: body.clone(),
            }
            .into(),
        );
        let (status, error, details) = err.parts();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error, "Upstream service error");
        assert_eq!(details, body);
    }

    #[test]
    fn foreign_error_maps_to_500_with_message() {
        let err = AppError(anyhow::anyhow!("connection reset"));
        let (status, _, details) = err.parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(details, "connection reset");
    }

    #[test]
    fn invalid_parameter_maps_to_400_with_reason() {
        let (status, error, details) = AppError::invalid("duplicate field `uniqueId`").parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error, "Invalid request parameters");
        assert_eq!(details, "duplicate field `uniqueId`");
    }

    #[test]
    fn response_is_json() {
        let response = AppError::missing("taskNumber").into_response();
        let ct = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("should have content-type");
        assert!(ct.to_str().unwrap().contains("application/json"));
    }
}
