use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::info;

use super::bloqueante;
use crate::error::AppError;
use crate::malla::normalizar_clave;
use crate::server::AppState;
use crate::usuarios::{verificar, Credenciales, NuevoUsuario};

/// POST /api/registro
pub async fn registro_handler(state: web::Data<AppState>, body: web::Json<NuevoUsuario>) -> Result<HttpResponse, AppError> {
    let nuevo = body.into_inner().validar()?;
    let store = Arc::clone(&state.store);
    let usuario = bloqueante(move || Ok(store.crear_usuario(&nuevo)?)).await?;
    info!(id = usuario.id, rol = %usuario.rol, "usuario registrado");
    Ok(HttpResponse::Created().json(json!({"usuario": usuario})))
}

/// POST /api/login
pub async fn login_handler(state: web::Data<AppState>, body: web::Json<Credenciales>) -> Result<HttpResponse, AppError> {
    let credenciales = body.into_inner();
    let email = normalizar_clave(&credenciales.email);
    let store = Arc::clone(&state.store);
    let usuario = bloqueante(move || {
        let registro = store.buscar_usuario(&email)?;
        verificar(registro, &credenciales)
    })
    .await?;
    Ok(HttpResponse::Ok().json(json!({"mensaje": "Login exitoso", "usuario": usuario})))
}
