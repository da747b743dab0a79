// src/api/http/chat.rs

use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::info;

use crate::api::error::ApiResult;
use crate::api::types::{ChatRequest, ChatResponse};
use crate::services::ChatInput;
use crate::state::AppState;

/// `POST /chat`: one stateless completion over the caller's history
pub async fn chat_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    info!(
        "REST chat request: persona {} with {} turns",
        request.persona_index,
        request.messages.len()
    );

    let result: ApiResult<_> = async {
        let input = ChatInput::from(request);
        let outcome = app_state.chat_service.chat(&input).await?;
        Ok(Json(ChatResponse::from(outcome)))
    }
    .await;

    match result {
        Ok(response) => response.into_response(),
        Err(error) => error.into_response(),
    }
}
