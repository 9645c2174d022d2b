use axum::body::Bytes;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{Map, Value};
use stepnote_core::record::{RawRecord, FIELD_TASK_NUMBER, FIELD_UNIQUE_ID};

use crate::error::AppError;
use crate::state::AppState;

/// Query parameters shared by every proxy operation.
///
/// Extracted directly so that an unparseable query string is answered with
/// the JSON error envelope instead of axum's plain-text rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyQuery {
    pub unique_id: Option<String>,
    pub task_number: Option<String>,
    pub record_id: Option<String>,
}

impl<S: Send + Sync> FromRequestParts<S> for ProxyQuery {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<ProxyQuery>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::invalid(rejection.body_text()))?;
        Ok(query)
    }
}

/// PATCH body. Anything that does not parse as this is treated as no body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateBody {
    record_id: Option<String>,
    fields: Option<Value>,
}

impl UpdateBody {
    fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// A body naming a record selects the update operation whatever the method.
    fn names_record(&self) -> bool {
        self.record_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// GET /api/records-by-unique-id?uniqueId=: every record for a submitter.
pub async fn by_unique_id(
    State(app): State<AppState>,
    query: ProxyQuery,
) -> Result<Json<Vec<RawRecord>>, AppError> {
    let unique_id = present(query.unique_id).ok_or_else(|| AppError::missing("uniqueId"))?;
    let records = app.table()?.find_all(FIELD_UNIQUE_ID, &unique_id).await?;
    tracing::info!(%unique_id, count = records.len(), "records by unique id");
    Ok(Json(records))
}

/// GET /api/record-by-task-number?taskNumber=: one record or `null`.
pub async fn by_task_number(
    State(app): State<AppState>,
    query: ProxyQuery,
) -> Result<Json<Option<RawRecord>>, AppError> {
    let task_number = present(query.task_number).ok_or_else(|| AppError::missing("taskNumber"))?;
    let record = app.table()?.find_first(FIELD_TASK_NUMBER, &task_number).await?;
    tracing::info!(%task_number, found = record.is_some(), "record by task number");
    Ok(Json(record))
}

/// PATCH /api/record: `{recordId, fields}` in the body, or `?recordId=`.
pub async fn update(
    State(app): State<AppState>,
    query: ProxyQuery,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    update_record(app, None, query, UpdateBody::parse(&body)).await
}

/// PATCH /api/record/:recordId
pub async fn update_by_path(
    State(app): State<AppState>,
    Path(record_id): Path<String>,
    query: ProxyQuery,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    update_record(app, Some(record_id), query, UpdateBody::parse(&body)).await
}

/// Any other method on /api/record: an update when the body names a record.
pub async fn update_or_describe(
    State(app): State<AppState>,
    query: ProxyQuery,
    body: Bytes,
) -> Result<Response, AppError> {
    let body = UpdateBody::parse(&body);
    if body.names_record() {
        return Ok(update_record(app, None, query, body).await?.into_response());
    }
    Ok(super::index::describe().await.into_response())
}

async fn update_record(
    app: AppState,
    path_id: Option<String>,
    query: ProxyQuery,
    body: UpdateBody,
) -> Result<Json<Value>, AppError> {
    let record_id = present(path_id)
        .or_else(|| present(body.record_id))
        .or_else(|| present(query.record_id));
    let fields = match body.fields {
        Some(Value::Object(map)) if !map.is_empty() => Some(map),
        _ => None,
    };
    let (record_id, fields): (String, Map<String, Value>) = match (record_id, fields) {
        (Some(id), Some(fields)) => (id, fields),
        (None, Some(_)) => return Err(AppError::missing("recordId")),
        (Some(_), None) => return Err(AppError::missing("fields")),
        (None, None) => return Err(AppError::missing("recordId and fields")),
    };

    let names: Vec<&String> = fields.keys().collect();
    tracing::info!(%record_id, fields = ?names, "updating record");
    let result = app.table()?.update(&record_id, fields).await?;
    Ok(Json(result))
}

/// /api: selects the operation from the method, body and query parameters.
pub async fn dispatch(
    State(app): State<AppState>,
    method: Method,
    query: ProxyQuery,
    body: Bytes,
) -> Result<Response, AppError> {
    let body = UpdateBody::parse(&body);
    if method == Method::PATCH || body.names_record() {
        return Ok(update_record(app, None, query, body).await?.into_response());
    }
    if method == Method::GET {
        if query.unique_id.is_some() {
            return Ok(by_unique_id(State(app), query).await?.into_response());
        }
        if query.task_number.is_some() {
            return Ok(by_task_number(State(app), query).await?.into_response());
        }
    }
    Ok(super::index::describe().await.into_response())
}
