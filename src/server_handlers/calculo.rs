use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Serialize;
use serde_json::json;

use super::{bloqueante, query_param};
use crate::error::AppError;
use crate::malla::Curso;
use crate::ponderado::SolicitudCalculo;
use crate::server::AppState;

#[derive(Serialize)]
struct MallaResumen<'a> {
    id: &'a str,
    nombre: &'a str,
    creditos_totales: u32,
    cursos: &'a [Curso],
}

/// GET /api/mallas
pub async fn mallas_handler(state: web::Data<AppState>) -> HttpResponse {
    let mallas: Vec<MallaResumen> = state
        .motor
        .catalogo()
        .iter()
        .map(|m| MallaResumen { id: m.id(), nombre: m.nombre(), creditos_totales: m.creditos_posibles(), cursos: m.cursos() })
        .collect();
    HttpResponse::Ok().json(mallas)
}

/// POST /api/calcular
/// Calcula el ponderado y guarda una fila en el ranking.
pub async fn calcular_handler(state: web::Data<AppState>, body: web::Json<serde_json::Value>) -> Result<HttpResponse, AppError> {
    let solicitud = SolicitudCalculo::desde_valor(body.into_inner(), state.motor.catalogo())?;
    let motor = Arc::clone(&state.motor);
    let (resultado, entrada) = bloqueante(move || motor.registrar_calculo(&solicitud)).await?;

    Ok(HttpResponse::Ok().json(json!({
        "mensaje": "¡Cálculo Exitoso!",
        "ponderado": resultado.promedio,
        "creditos_totales": resultado.creditos_totales,
        "creditos_posibles": resultado.creditos_posibles,
        "cursos_retirados": resultado.cursos_retirados,
        "coerciones": resultado.coerciones,
        "entrada_id": entrada.id,
    })))
}

/// POST /api/calcular/simular
/// Mismo cálculo sin guardar nada.
pub async fn simular_handler(state: web::Data<AppState>, body: web::Json<serde_json::Value>) -> Result<HttpResponse, AppError> {
    let solicitud = SolicitudCalculo::desde_valor(body.into_inner(), state.motor.catalogo())?;
    let resultado = state.motor.calcular(&solicitud.malla, &solicitud.notas)?;
    Ok(HttpResponse::Ok().json(resultado))
}

#[derive(Serialize)]
struct FilaRanking {
    id: i64,
    nombre: String,
    malla: String,
    ponderado: f64,
    creado_en: chrono::DateTime<chrono::Utc>,
}

/// GET /api/ranking?malla=sistemas&limit=10
/// `malla=general` o sin `malla` devuelve todas las mallas.
pub async fn ranking_handler(state: web::Data<AppState>, query: web::Query<HashMap<String, String>>) -> Result<HttpResponse, AppError> {
    let qm = query.into_inner();
    let filtro = query_param(&qm, "malla").map(str::to_string);
    let limite = query_param(&qm, "limit").and_then(|s| s.parse::<usize>().ok());
    let motor = Arc::clone(&state.motor);

    let entradas = bloqueante(move || motor.consultar_ranking(filtro.as_deref(), limite)).await?;
    let out: Vec<FilaRanking> = entradas
        .into_iter()
        .map(|e| FilaRanking { id: e.id, nombre: e.nombre, malla: e.malla, ponderado: e.ponderado, creado_en: e.creado_en })
        .collect();
    Ok(HttpResponse::Ok().json(out))
}
