use axum::response::Json;
use serde_json::json;

/// Health check endpoint handler.
///
/// # Route
/// - **Method**: GET
/// - **Path**: `/ping`
///
/// # Response Format
/// ```json
/// { "status": "pong" }
/// ```
///
/// The orchestrator also answers `{"action": "ping"}` on the message
/// endpoint; this route needs no state and stays up even if storage does not.
pub async fn ping() -> Json<serde_json::Value> {
    Json(json!({ "status": "pong" }))
}
