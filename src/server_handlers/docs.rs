use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::server::AppState;

pub async fn help_handler(state: web::Data<AppState>) -> HttpResponse {
    let mallas = state.motor.catalogo().ids();
    let politica = state.motor.politica();

    let help = json!({
        "description": "API de apoyo académico: ponderado por créditos, ranking, riesgo académico, tutorías, recursos y chat.",
        "calcular_example": {
            "nombre": "Ana Torres",
            "malla": "sistemas",
            "notas": {"integral": 16, "lineal": 14, "algoritmia": -1, "etica": 18, "tcs": 10, "psico": 15, "biologia": 13}
        },
        "calcular_legacy_example": {"nombre": "Ana Torres", "n1": "16", "n2": "14", "n3": "12", "n4": "18", "n5": "10", "n6": "15", "n7": "13"},
        "riesgo_example": {"estudiante_id": "20231234", "puntaje": 6.5},
        "ranking_example_query": "/api/ranking?malla=general&limit=20",
        "note": "Una nota -1 marca el curso como retirado: no suma ni cuenta créditos. Los valores no numéricos se reemplazan por 0 y se informan en 'coerciones'.",
        "niveles_riesgo": {"Crítico": ">= 7", "Alto": ">= 5", "Medio": ">= 3", "Bajo": "< 3"},
        "malla_choices": mallas,
        "politica": politica,
        "chat_habilitado": state.chat.habilitado(),
    });

    HttpResponse::Ok().json(help)
}
