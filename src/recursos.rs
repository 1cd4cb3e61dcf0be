use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Material de la biblioteca. Sólo se guarda la referencia; el archivo vive
/// en la URL indicada.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recurso {
    pub id: i64,
    pub titulo: String,
    pub curso: String,
    pub url: String,
    pub descripcion: Option<String>,
    pub creado_en: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NuevoRecurso {
    pub titulo: String,
    pub curso: String,
    pub url: String,
    #[serde(default)]
    pub descripcion: Option<String>,
}

impl NuevoRecurso {
    pub fn validar(mut self) -> Result<Self, AppError> {
        self.titulo = self.titulo.trim().to_string();
        self.curso = self.curso.trim().to_string();
        self.url = self.url.trim().to_string();
        self.descripcion = self.descripcion.map(|d| d.trim().to_string()).filter(|d| !d.is_empty());
        if self.titulo.is_empty() {
            return Err(AppError::MalformedPayload("titulo es requerido".into()));
        }
        if self.curso.is_empty() {
            return Err(AppError::MalformedPayload("curso es requerido".into()));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(AppError::MalformedPayload("url debe empezar con http:// o https://".into()));
        }
        Ok(self)
    }
}
