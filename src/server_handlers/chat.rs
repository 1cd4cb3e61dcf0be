use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::AppError;
use crate::server::AppState;

#[derive(Deserialize)]
pub struct ChatRequest {
    prompt: String,
}

/// POST /api/chat
pub async fn chat_handler(state: web::Data<AppState>, body: web::Json<ChatRequest>) -> Result<HttpResponse, AppError> {
    let respuesta = state.chat.enviar(&body.prompt).await?;
    Ok(HttpResponse::Ok().json(respuesta))
}
