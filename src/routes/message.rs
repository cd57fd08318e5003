use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::Json as ResponseJson;
use tracing::{debug, warn};

use crate::server::AppState;
use crate::state_structs::{ExtensionMessage, Reply};

/// Routes one `{action, data}` message through the orchestrator.
///
/// Always `200 OK`; failures travel inside the reply envelope so a UI
/// never has to tell a transport error from a handler error. A body that
/// is not a message at all gets the same envelope.
pub async fn post_message(
    State(state): State<AppState>,
    message: Result<Json<ExtensionMessage>, JsonRejection>,
) -> ResponseJson<Reply> {
    let message = match message {
        Ok(Json(message)) => message,
        Err(rejection) => {
            warn!("[HTTP] Rejected message body: {}", rejection.body_text());
            return ResponseJson(Reply::failure(format!("Invalid message: {}", rejection.body_text())));
        }
    };

    debug!("[HTTP] Message {}", message.action);
    ResponseJson(state.orchestrator.handle(message).await)
}
