//! Entradas del ranking y parámetros de consulta.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::malla::{normalizar_clave, CatalogoMallas, MallaDesconocida};

/// Tamaño de página cuando el cliente no pide otro.
pub const RANKING_LIMITE_POR_DEFECTO: usize = 50;
/// Tope para cualquier consulta de ranking.
pub const RANKING_LIMITE_MAXIMO: usize = 100;
/// Filtro que devuelve todas las mallas.
pub const FILTRO_GENERAL: &str = "general";

/// Resultado de un cálculo a punto de guardarse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NuevaEntradaRanking {
    pub nombre: String,
    pub malla: String,
    pub notas: BTreeMap<String, f64>,
    pub ponderado: f64,
    pub creditos_totales: u32,
    pub creado_en: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntradaRanking {
    pub id: i64,
    pub nombre: String,
    pub malla: String,
    pub notas: BTreeMap<String, f64>,
    pub ponderado: f64,
    pub creditos_totales: u32,
    pub creado_en: DateTime<Utc>,
}

impl EntradaRanking {
    pub fn from_nueva(id: i64, nueva: &NuevaEntradaRanking) -> Self {
        EntradaRanking {
            id,
            nombre: nueva.nombre.clone(),
            malla: nueva.malla.clone(),
            notas: nueva.notas.clone(),
            ponderado: nueva.ponderado,
            creditos_totales: nueva.creditos_totales,
            creado_en: nueva.creado_en,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FiltroRanking {
    General,
    Malla(String),
}

impl FiltroRanking {
    /// `None`, vacío o "general" -> todas las mallas; cualquier otro valor
    /// debe ser una malla del catálogo.
    pub fn resolver(raw: Option<&str>, catalogo: &CatalogoMallas) -> Result<Self, MallaDesconocida> {
        let key = match raw.map(normalizar_clave) {
            None => return Ok(FiltroRanking::General),
            Some(k) if k.is_empty() || k == FILTRO_GENERAL => return Ok(FiltroRanking::General),
            Some(k) => k,
        };
        let malla = catalogo.obtener(&key)?;
        Ok(FiltroRanking::Malla(malla.id().to_string()))
    }

    pub fn malla(&self) -> Option<&str> {
        match self {
            FiltroRanking::General => None,
            FiltroRanking::Malla(m) => Some(m),
        }
    }
}

/// Límite efectivo: 0 o ausente usa `por_defecto`; nunca supera el máximo.
pub fn limite_efectivo(pedido: Option<usize>, por_defecto: usize) -> usize {
    let lim = match pedido {
        Some(0) | None => por_defecto,
        Some(n) => n,
    };
    lim.clamp(1, RANKING_LIMITE_MAXIMO)
}

/// Mayor ponderado primero; a igual ponderado, la entrada más antigua.
pub fn comparar_entradas(a: &EntradaRanking, b: &EntradaRanking) -> Ordering {
    b.ponderado.total_cmp(&a.ponderado).then(a.id.cmp(&b.id))
}

/// Ordena, filtra y recorta en memoria.
pub fn top_ranking<'a, I>(entradas: I, malla: Option<&str>, limite: usize) -> Vec<EntradaRanking>
where
    I: IntoIterator<Item = &'a EntradaRanking>,
{
    let mut v: Vec<EntradaRanking> = entradas
        .into_iter()
        .filter(|e| malla.is_none_or(|m| e.malla == m))
        .cloned()
        .collect();
    v.sort_by(comparar_entradas);
    v.truncate(limite);
    v
}
