//! Clasificación de riesgo académico.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::malla::normalizar_clave;

pub const UMBRAL_CRITICO: f64 = 7.0;
pub const UMBRAL_ALTO: f64 = 5.0;
pub const UMBRAL_MEDIO: f64 = 3.0;
pub const PUNTAJE_MAXIMO: f64 = 10.0;

/// Niveles ordenados de menor a mayor riesgo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NivelRiesgo {
    Bajo,
    Medio,
    Alto,
    #[serde(rename = "Crítico", alias = "Critico")]
    Critico,
}

impl NivelRiesgo {
    pub fn etiqueta(self) -> &'static str {
        match self {
            NivelRiesgo::Bajo => "Bajo",
            NivelRiesgo::Medio => "Medio",
            NivelRiesgo::Alto => "Alto",
            NivelRiesgo::Critico => "Crítico",
        }
    }

    /// 0 para Bajo .. 3 para Crítico.
    pub fn rango(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for NivelRiesgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.etiqueta())
    }
}

impl FromStr for NivelRiesgo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalizar_clave(s).as_str() {
            "bajo" => Ok(NivelRiesgo::Bajo),
            "medio" => Ok(NivelRiesgo::Medio),
            "alto" => Ok(NivelRiesgo::Alto),
            "crítico" | "critico" => Ok(NivelRiesgo::Critico),
            otro => Err(format!("nivel de riesgo desconocido '{}'", otro)),
        }
    }
}

/// Umbrales evaluados de arriba hacia abajo, cerrados en su límite inferior.
/// NaN no supera ningún umbral y cae en Bajo.
pub fn clasificar_riesgo(puntaje: f64) -> NivelRiesgo {
    if puntaje >= UMBRAL_CRITICO {
        NivelRiesgo::Critico
    } else if puntaje >= UMBRAL_ALTO {
        NivelRiesgo::Alto
    } else if puntaje >= UMBRAL_MEDIO {
        NivelRiesgo::Medio
    } else {
        NivelRiesgo::Bajo
    }
}

pub fn validar_puntaje(puntaje: f64) -> Result<f64, AppError> {
    if puntaje.is_finite() && (0.0..=PUNTAJE_MAXIMO).contains(&puntaje) {
        Ok(puntaje)
    } else {
        Err(AppError::InvalidScore(puntaje))
    }
}

/// Lee el puntaje enviado por el cliente: número o texto numérico (`"6,5"`
/// también vale).
pub fn puntaje_desde_valor(valor: &Value) -> Result<f64, AppError> {
    let leido = match valor {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    };
    leido.ok_or_else(|| AppError::MalformedPayload(format!("puntaje debe ser numérico, se recibió {}", valor)))
}

/// Evaluación vigente de un estudiante; una nueva reemplaza a la anterior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluacionRiesgo {
    pub estudiante_id: String,
    pub puntaje: f64,
    pub nivel: NivelRiesgo,
    pub evaluado_en: DateTime<Utc>,
}

impl EvaluacionRiesgo {
    pub fn evaluar(estudiante_id: &str, puntaje: f64, evaluado_en: DateTime<Utc>) -> Result<Self, AppError> {
        let estudiante_id = estudiante_id.trim();
        if estudiante_id.is_empty() {
            return Err(AppError::MalformedPayload("estudiante_id es requerido".into()));
        }
        let puntaje = validar_puntaje(puntaje)?;
        Ok(EvaluacionRiesgo {
            estudiante_id: estudiante_id.to_string(),
            puntaje,
            nivel: clasificar_riesgo(puntaje),
            evaluado_en,
        })
    }
}
