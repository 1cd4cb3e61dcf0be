pub mod calculo;
pub mod chat;
pub mod docs;
pub mod recursos;
pub mod riesgo;
pub mod tutorias;
pub mod usuarios;

pub use calculo::*;
pub use chat::*;
pub use docs::*;
pub use recursos::*;
pub use riesgo::*;
pub use tutorias::*;
pub use usuarios::*;

use crate::error::AppError;

/// Ejecuta trabajo bloqueante (acceso al store) fuera del executor.
pub(crate) async fn bloqueante<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Interno(format!("task join error: {}", e)))?
}

/// Lee un parámetro de query no vacío.
pub(crate) fn query_param<'a>(query: &'a std::collections::HashMap<String, String>, key: &str) -> Option<&'a str> {
    query.get(key).map(|s| s.trim()).filter(|s| !s.is_empty())
}
