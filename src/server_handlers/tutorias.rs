use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{web, HttpResponse};
use chrono::Utc;

use super::{bloqueante, query_param};
use crate::error::AppError;
use crate::server::AppState;
use crate::tutorias::{CambioTutoria, EstadoTutoria, NuevaTutoria};

/// POST /api/tutorias
pub async fn tutoria_create_handler(state: web::Data<AppState>, body: web::Json<NuevaTutoria>) -> Result<HttpResponse, AppError> {
    let nueva = body.into_inner().validar()?;
    let store = Arc::clone(&state.store);
    let tutoria = bloqueante(move || Ok(store.crear_tutoria(&nueva, Utc::now())?)).await?;
    Ok(HttpResponse::Created().json(tutoria))
}

/// GET /api/tutorias?estado=pendiente
pub async fn tutoria_list_handler(state: web::Data<AppState>, query: web::Query<HashMap<String, String>>) -> Result<HttpResponse, AppError> {
    let estado = query_param(&query, "estado")
        .map(|s| s.parse::<EstadoTutoria>().map_err(AppError::MalformedPayload))
        .transpose()?;
    let store = Arc::clone(&state.store);
    let tutorias = bloqueante(move || Ok(store.listar_tutorias(estado)?)).await?;
    Ok(HttpResponse::Ok().json(tutorias))
}

/// PATCH /api/tutorias/{id}
/// Body: `{"estado": "aceptada", "tutor": "Prof. Ramos"}`
pub async fn tutoria_update_handler(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<CambioTutoria>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let cambio = body.into_inner();
    let store = Arc::clone(&state.store);
    let tutoria = bloqueante(move || {
        let mut tutoria = store.obtener_tutoria(id)?.ok_or_else(|| AppError::NotFound(format!("tutoría {}", id)))?;
        let previo = tutoria.estado;
        tutoria.aplicar(&cambio, Utc::now())?;
        store.actualizar_tutoria(&tutoria, previo)?;
        Ok(tutoria)
    })
    .await?;
    Ok(HttpResponse::Ok().json(tutoria))
}
