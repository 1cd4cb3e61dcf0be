//! Solicitudes de tutoría y sus transiciones de estado.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::malla::normalizar_clave;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoTutoria {
    Pendiente,
    Aceptada,
    Completada,
    Cancelada,
}

impl EstadoTutoria {
    pub fn as_str(self) -> &'static str {
        match self {
            EstadoTutoria::Pendiente => "pendiente",
            EstadoTutoria::Aceptada => "aceptada",
            EstadoTutoria::Completada => "completada",
            EstadoTutoria::Cancelada => "cancelada",
        }
    }

    /// pendiente -> aceptada | cancelada; aceptada -> completada | cancelada.
    pub fn puede_pasar_a(self, siguiente: EstadoTutoria) -> bool {
        use EstadoTutoria::*;
        matches!(
            (self, siguiente),
            (Pendiente, Aceptada) | (Pendiente, Cancelada) | (Aceptada, Completada) | (Aceptada, Cancelada)
        )
    }
}

impl fmt::Display for EstadoTutoria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EstadoTutoria {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalizar_clave(s).as_str() {
            "pendiente" => Ok(EstadoTutoria::Pendiente),
            "aceptada" => Ok(EstadoTutoria::Aceptada),
            "completada" => Ok(EstadoTutoria::Completada),
            "cancelada" => Ok(EstadoTutoria::Cancelada),
            otro => Err(format!("estado de tutoría desconocido '{}'", otro)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tutoria {
    pub id: i64,
    pub estudiante: String,
    pub curso: String,
    pub mensaje: String,
    pub estado: EstadoTutoria,
    pub tutor: Option<String>,
    pub creado_en: DateTime<Utc>,
    pub actualizado_en: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NuevaTutoria {
    pub estudiante: String,
    pub curso: String,
    #[serde(default)]
    pub mensaje: String,
}

impl NuevaTutoria {
    pub fn validar(mut self) -> Result<Self, AppError> {
        self.estudiante = self.estudiante.trim().to_string();
        self.curso = self.curso.trim().to_string();
        self.mensaje = self.mensaje.trim().to_string();
        if self.estudiante.is_empty() {
            return Err(AppError::MalformedPayload("estudiante es requerido".into()));
        }
        if self.curso.is_empty() {
            return Err(AppError::MalformedPayload("curso es requerido".into()));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CambioTutoria {
    pub estado: String,
    #[serde(default)]
    pub tutor: Option<String>,
}

impl Tutoria {
    /// Aplica un cambio de estado validando la transición.
    pub fn aplicar(&mut self, cambio: &CambioTutoria, ahora: DateTime<Utc>) -> Result<(), AppError> {
        let siguiente: EstadoTutoria = cambio.estado.parse().map_err(AppError::MalformedPayload)?;
        if !self.estado.puede_pasar_a(siguiente) {
            return Err(AppError::MalformedPayload(format!(
                "no se puede pasar de '{}' a '{}'",
                self.estado, siguiente
            )));
        }
        let tutor = cambio.tutor.as_deref().map(str::trim).filter(|t| !t.is_empty());
        if siguiente == EstadoTutoria::Aceptada && tutor.is_none() && self.tutor.is_none() {
            return Err(AppError::MalformedPayload("tutor es requerido para aceptar".into()));
        }
        if let Some(t) = tutor {
            self.tutor = Some(t.to_string());
        }
        self.estado = siguiente;
        self.actualizado_en = ahora;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pendiente() -> Tutoria {
        let t = Utc::now();
        Tutoria {
            id: 1,
            estudiante: "s1".into(),
            curso: "algoritmia".into(),
            mensaje: String::new(),
            estado: EstadoTutoria::Pendiente,
            tutor: None,
            creado_en: t,
            actualizado_en: t,
        }
    }

    fn cambio(estado: &str, tutor: Option<&str>) -> CambioTutoria {
        CambioTutoria { estado: estado.into(), tutor: tutor.map(str::to_string) }
    }

    #[test]
    fn transiciones_validas() {
        let mut t = pendiente();
        t.aplicar(&cambio("aceptada", Some("Prof. Ramos")), Utc::now()).unwrap();
        t.aplicar(&cambio("completada", None), Utc::now()).unwrap();
        assert_eq!(t.estado, EstadoTutoria::Completada);
        assert_eq!(t.tutor.as_deref(), Some("Prof. Ramos"));
    }

    #[test]
    fn estados_finales_no_cambian() {
        let mut t = pendiente();
        t.aplicar(&cambio("cancelada", None), Utc::now()).unwrap();
        assert!(t.aplicar(&cambio("aceptada", Some("x")), Utc::now()).is_err());
        assert!(pendiente().aplicar(&cambio("completada", None), Utc::now()).is_err());
        assert!(pendiente().aplicar(&cambio("aceptada", Some("  ")), Utc::now()).is_err());
        assert!(pendiente().aplicar(&cambio("inventado", None), Utc::now()).is_err());
    }
}
