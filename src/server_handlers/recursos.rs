use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{web, HttpResponse};
use chrono::Utc;

use super::{bloqueante, query_param};
use crate::error::AppError;
use crate::recursos::NuevoRecurso;
use crate::server::AppState;

/// POST /api/recursos
pub async fn recurso_create_handler(state: web::Data<AppState>, body: web::Json<NuevoRecurso>) -> Result<HttpResponse, AppError> {
    let nuevo = body.into_inner().validar()?;
    let store = Arc::clone(&state.store);
    let recurso = bloqueante(move || Ok(store.crear_recurso(&nuevo, Utc::now())?)).await?;
    Ok(HttpResponse::Created().json(recurso))
}

/// GET /api/recursos?curso=algoritmia
pub async fn recurso_list_handler(state: web::Data<AppState>, query: web::Query<HashMap<String, String>>) -> Result<HttpResponse, AppError> {
    let curso = query_param(&query, "curso").map(str::to_string);
    let store = Arc::clone(&state.store);
    let recursos = bloqueante(move || Ok(store.listar_recursos(curso.as_deref())?)).await?;
    Ok(HttpResponse::Ok().json(recursos))
}
