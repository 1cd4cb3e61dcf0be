use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::Value;

use super::bloqueante;
use crate::error::AppError;
use crate::riesgo::puntaje_desde_valor;
use crate::server::AppState;

#[derive(Deserialize)]
pub struct RiesgoRequest {
    estudiante_id: String,
    puntaje: Value,
}

/// POST /api/riesgo
/// Reemplaza la evaluación vigente del estudiante.
pub async fn riesgo_upsert_handler(state: web::Data<AppState>, body: web::Json<RiesgoRequest>) -> Result<HttpResponse, AppError> {
    let req = body.into_inner();
    let puntaje = puntaje_desde_valor(&req.puntaje)?;
    let motor = Arc::clone(&state.motor);
    let evaluacion = bloqueante(move || motor.registrar_riesgo(&req.estudiante_id, puntaje)).await?;
    Ok(HttpResponse::Ok().json(evaluacion))
}

/// GET /api/riesgo/{estudiante_id}
pub async fn riesgo_get_handler(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let store = Arc::clone(&state.store);
    let evaluacion = bloqueante(move || {
        store.obtener_riesgo(id.trim())?.ok_or_else(|| AppError::NotFound(format!("evaluación de '{}'", id.trim())))
    })
    .await?;
    Ok(HttpResponse::Ok().json(evaluacion))
}

/// GET /api/riesgo
pub async fn riesgo_list_handler(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let store = Arc::clone(&state.store);
    let evaluaciones = bloqueante(move || Ok(store.listar_riesgos()?)).await?;
    Ok(HttpResponse::Ok().json(evaluaciones))
}
