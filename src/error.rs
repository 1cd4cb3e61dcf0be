use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::malla::MallaDesconocida;
use crate::store::StoreError;

/// Errores que llegan al cliente HTTP. Los 4xx indican entrada inválida; los
/// 5xx, que una entrada válida no pudo procesarse o guardarse.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    InvalidCurriculum(#[from] MallaDesconocida),

    #[error("puntaje de riesgo inválido ({0}): debe ser un número entre 0 y 10")]
    InvalidScore(f64),

    #[error("solicitud inválida: {0}")]
    MalformedPayload(String),

    #[error("credenciales incorrectas")]
    Unauthorized,

    #[error("{0} no encontrado")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("error al guardar datos")]
    StoreUnavailable(#[source] StoreError),

    #[error("el servicio de chat falló: {0}")]
    Upstream(String),

    #[error("el chat no está configurado")]
    ChatDisabled,

    #[error("error interno: {0}")]
    Interno(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicado(msg) | StoreError::Conflicto(msg) => AppError::Conflict(msg),
            other => AppError::StoreUnavailable(other),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCurriculum(_) | AppError::InvalidScore(_) | AppError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::StoreUnavailable(_) | AppError::Interno(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::ChatDisabled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::StoreUnavailable(e) = self {
            error!("store error: {}", e);
        }
        HttpResponse::build(self.status_code()).json(json!({"error": self.to_string()}))
    }
}
