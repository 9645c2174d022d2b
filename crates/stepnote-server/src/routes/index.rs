use axum::Json;
use serde_json::Value;

/// Fallback for anything that is not a proxy operation.
pub async fn describe() -> Json<Value> {
    Json(serde_json::json!({
        "message": "stepnote proxy: use one of the endpoints below",
        "endpoints": [
            "GET /api/records-by-unique-id?uniqueId=<id>",
            "GET /api/record-by-task-number?taskNumber=<number>",
            "PATCH /api/record {\"recordId\": \"<id>\", \"fields\": {...}}",
            "PATCH /api/record/<recordId> {\"fields\": {...}}",
        ],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn descriptor_lists_endpoints() {
        let Json(body) = describe().await;
        assert!(body["message"].is_string());
        assert_eq!(body["endpoints"].as_array().unwrap().len(), 4);
    }
}
