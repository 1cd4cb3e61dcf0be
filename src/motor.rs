//! Fachada del motor: cálculo de ponderado, riesgo y ranking sobre un
//! catálogo inmutable y un `Store` intercambiable.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::AppError;
use crate::malla::{CatalogoMallas, Malla};
use crate::ponderado::{
    calcular_ponderado, normalizar_notas, notas_para_registro, PoliticaCalculo, ResultadoPonderado, SolicitudCalculo,
};
use crate::ranking::{limite_efectivo, EntradaRanking, FiltroRanking, NuevaEntradaRanking};
use crate::riesgo::EvaluacionRiesgo;
use crate::store::Store;

pub struct Motor {
    catalogo: Arc<CatalogoMallas>,
    politica: PoliticaCalculo,
    ranking_limite: usize,
    store: Arc<dyn Store>,
}

impl Motor {
    pub fn new(catalogo: Arc<CatalogoMallas>, politica: PoliticaCalculo, ranking_limite: usize, store: Arc<dyn Store>) -> Self {
        Motor { catalogo, politica, ranking_limite, store }
    }

    pub fn catalogo(&self) -> &CatalogoMallas {
        &self.catalogo
    }

    pub fn politica(&self) -> PoliticaCalculo {
        self.politica
    }

    /// Cálculo puro; no toca el almacenamiento.
    pub fn calcular(&self, malla_id: &str, notas: &Map<String, Value>) -> Result<ResultadoPonderado, AppError> {
        let malla = self.catalogo.obtener(malla_id)?;
        Ok(self.calcular_en(malla, notas).0)
    }

    /// Normaliza una sola vez y devuelve el resultado junto con las notas
    /// tal como se guardan en el ranking.
    fn calcular_en(&self, malla: &Malla, notas: &Map<String, Value>) -> (ResultadoPonderado, BTreeMap<String, f64>) {
        let normalizadas = normalizar_notas(malla, notas);
        let registro = notas_para_registro(malla, &normalizadas);
        let mut resultado = calcular_ponderado(malla, &normalizadas.valores, self.politica);
        resultado.coerciones = normalizadas.coerciones;
        debug!(
            malla = malla.id(),
            promedio = resultado.promedio,
            creditos = resultado.creditos_totales,
            "ponderado calculado"
        );
        (resultado, registro)
    }

    /// Calcula y agrega una fila al ranking. Bloqueante.
    pub fn registrar_calculo(&self, solicitud: &SolicitudCalculo) -> Result<(ResultadoPonderado, EntradaRanking), AppError> {
        let malla = self.catalogo.obtener(&solicitud.malla)?;
        let (resultado, notas) = self.calcular_en(malla, &solicitud.notas);
        let nueva = NuevaEntradaRanking {
            nombre: solicitud.nombre.clone(),
            malla: malla.id().to_string(),
            notas,
            ponderado: resultado.promedio,
            creditos_totales: resultado.creditos_totales,
            creado_en: Utc::now(),
        };
        let entrada = self.store.agregar_ranking(&nueva)?;
        info!(id = entrada.id, malla = %entrada.malla, ponderado = entrada.ponderado, "entrada de ranking guardada");
        Ok((resultado, entrada))
    }

    /// Clasifica y reemplaza la evaluación vigente del estudiante. Bloqueante.
    pub fn registrar_riesgo(&self, estudiante_id: &str, puntaje: f64) -> Result<EvaluacionRiesgo, AppError> {
        let evaluacion = EvaluacionRiesgo::evaluar(estudiante_id, puntaje, Utc::now())?;
        self.store.upsert_riesgo(&evaluacion)?;
        info!(estudiante = %evaluacion.estudiante_id, nivel = %evaluacion.nivel, "evaluación de riesgo guardada");
        Ok(evaluacion)
    }

    pub fn consultar_ranking(&self, filtro: Option<&str>, limite: Option<usize>) -> Result<Vec<EntradaRanking>, AppError> {
        let filtro = FiltroRanking::resolver(filtro, &self.catalogo)?;
        let limite = limite_efectivo(limite, self.ranking_limite);
        Ok(self.store.consultar_ranking(filtro.malla(), limite)?)
    }
}
