use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri};
use axum::Json;

use crate::errors::AppError;
use crate::models::{ChatRequest, ConversationId};
use crate::service::relay_service::RelayService;

pub const CONVERSATION_UUID_HEADER: &str = "x-conversation-uuid";

/// POST `/`: relays `{"inputs": ...}` to Rippletide, answers in plain text.
///
/// Credentials are checked before the body so a misconfigured gateway fails
/// the same way for every caller.
pub async fn relay_handler(
    State(svc): State<RelayService>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<String, AppError> {
    let credentials = svc.credentials()?;
    let Json(request) = payload?;
    let conversation_id = conversation_id_from(&headers)?;

    svc.relay(credentials, &request, &conversation_id).await
}

/// Fallback for every unrouted request.
pub async fn route_not_found(method: Method, uri: Uri) -> AppError {
    AppError::RouteNotFound {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}

/// Fallback for a known path called with the wrong method.
pub async fn method_not_allowed(method: Method, uri: Uri) -> AppError {
    AppError::MethodNotAllowed {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}

fn conversation_id_from(headers: &HeaderMap) -> Result<ConversationId, AppError> {
    let value = headers
        .get(CONVERSATION_UUID_HEADER)
        .map(|v| {
            v.to_str().map_err(|_| AppError::InvalidHeader {
                header: "X-Conversation-UUID",
            })
        })
        .transpose()?;
    Ok(ConversationId::from_header(value))
}
