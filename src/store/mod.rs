//! Persistencia: ranking, evaluaciones de riesgo, usuarios, tutorías y
//! recursos.
//!
//! `open_store` elige el backend según el esquema de la URL:
//! - `sqlite://ruta` o `file://ruta` -> [`SqliteStore`]
//! - `postgres://...` o `postgresql://...` -> [`PostgresStore`]
//! - `memory://` -> [`MemoryStore`]
//!
//! Todas las operaciones son bloqueantes; los handlers HTTP las ejecutan con
//! `spawn_blocking`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::ranking::{EntradaRanking, NuevaEntradaRanking};
use crate::recursos::{NuevoRecurso, Recurso};
use crate::riesgo::EvaluacionRiesgo;
use crate::tutorias::{EstadoTutoria, NuevaTutoria, Tutoria};
use crate::usuarios::{NuevoUsuario, Usuario, UsuarioConClave};

pub mod memory;
pub mod postgres;
pub mod sqlite;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("postgres: {0}")]
    Postgres(#[from] ::postgres::Error),
    #[error("serialización: {0}")]
    Serializacion(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Duplicado(String),
    #[error("{0}")]
    Conflicto(String),
    #[error("dato corrupto: {0}")]
    Datos(String),
    #[error("thread join error: {0}")]
    Hilo(String),
    #[error("RENDIMIENTO_DB_URL usa un esquema no soportado: {0}")]
    Esquema(String),
}

/// Contrato de almacenamiento. `upsert_riesgo` sigue la semántica de un
/// `put(clave, valor)`: la última escritura para un estudiante gana.
pub trait Store: Send + Sync {
    fn agregar_ranking(&self, entrada: &NuevaEntradaRanking) -> Result<EntradaRanking, StoreError>;
    /// Mayor ponderado primero, empates por id ascendente.
    fn consultar_ranking(&self, malla: Option<&str>, limite: usize) -> Result<Vec<EntradaRanking>, StoreError>;

    fn upsert_riesgo(&self, evaluacion: &EvaluacionRiesgo) -> Result<(), StoreError>;
    fn obtener_riesgo(&self, estudiante_id: &str) -> Result<Option<EvaluacionRiesgo>, StoreError>;
    /// Mayor puntaje primero.
    fn listar_riesgos(&self) -> Result<Vec<EvaluacionRiesgo>, StoreError>;

    /// Falla con `StoreError::Duplicado` si el email ya existe.
    fn crear_usuario(&self, nuevo: &NuevoUsuario) -> Result<Usuario, StoreError>;
    fn buscar_usuario(&self, email: &str) -> Result<Option<UsuarioConClave>, StoreError>;

    fn crear_tutoria(&self, nueva: &NuevaTutoria, ahora: DateTime<Utc>) -> Result<Tutoria, StoreError>;
    fn obtener_tutoria(&self, id: i64) -> Result<Option<Tutoria>, StoreError>;
    /// Guarda el nuevo estado sólo si la fila sigue en `estado_previo`; si
    /// otro cambio llegó antes, falla con `StoreError::Conflicto`.
    fn actualizar_tutoria(&self, tutoria: &Tutoria, estado_previo: EstadoTutoria) -> Result<(), StoreError>;
    /// Más recientes primero.
    fn listar_tutorias(&self, estado: Option<EstadoTutoria>) -> Result<Vec<Tutoria>, StoreError>;

    fn crear_recurso(&self, nuevo: &NuevoRecurso, ahora: DateTime<Utc>) -> Result<Recurso, StoreError>;
    fn listar_recursos(&self, curso: Option<&str>) -> Result<Vec<Recurso>, StoreError>;
}

pub fn open_store(url: &str) -> Result<Arc<dyn Store>, StoreError> {
    let url = url.trim();
    if let Some(path) = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("file://")) {
        info!("Usando SQLite en {}", path);
        return Ok(Arc::new(SqliteStore::open(Path::new(path))?));
    }
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        info!("Usando Postgres");
        return Ok(Arc::new(PostgresStore::connect(url)?));
    }
    if url.starts_with("memory://") {
        info!("Usando almacenamiento en memoria (los datos se pierden al reiniciar)");
        return Ok(Arc::new(MemoryStore::new()));
    }
    Err(StoreError::Esquema(url.to_string()))
}

// Conversión de columnas compartida por SQLite y Postgres: fechas RFC 3339 y
// notas como JSON.

pub(crate) fn parse_ts(s: &str) -> Result<DateTime<Utc>, StoreError> {
    s.parse::<DateTime<Utc>>().map_err(|e| StoreError::Datos(format!("fecha '{}': {}", s, e)))
}

pub(crate) fn parse_enum<T: std::str::FromStr<Err = String>>(s: &str) -> Result<T, StoreError> {
    s.parse::<T>().map_err(StoreError::Datos)
}

pub(crate) fn parse_notas(s: &str) -> Result<BTreeMap<String, f64>, StoreError> {
    Ok(serde_json::from_str(s)?)
}

pub(crate) fn tutoria_cambiada(id: i64, estado_previo: EstadoTutoria) -> StoreError {
    StoreError::Conflicto(format!("la tutoría {} ya no está '{}'", id, estado_previo))
}

pub(crate) fn creditos_desde_db(n: i64) -> Result<u32, StoreError> {
    u32::try_from(n).map_err(|_| StoreError::Datos(format!("creditos fuera de rango: {}", n)))
}

pub(crate) const ESQUEMA_SQLITE: &str = "
    CREATE TABLE IF NOT EXISTS ranking (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        nombre TEXT NOT NULL,
        malla TEXT NOT NULL,
        notas_json TEXT NOT NULL,
        ponderado REAL NOT NULL,
        creditos_totales INTEGER NOT NULL,
        creado_en TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_ranking_malla_ponderado ON ranking (malla, ponderado DESC);

    CREATE TABLE IF NOT EXISTS evaluaciones_riesgo (
        estudiante_id TEXT PRIMARY KEY,
        puntaje REAL NOT NULL,
        nivel TEXT NOT NULL,
        evaluado_en TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS usuarios (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        nombre TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        rol TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS tutorias (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        estudiante TEXT NOT NULL,
        curso TEXT NOT NULL,
        mensaje TEXT NOT NULL,
        estado TEXT NOT NULL,
        tutor TEXT,
        creado_en TEXT NOT NULL,
        actualizado_en TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS recursos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        titulo TEXT NOT NULL,
        curso TEXT NOT NULL,
        url TEXT NOT NULL,
        descripcion TEXT,
        creado_en TEXT NOT NULL
    );
";

pub(crate) const ESQUEMA_POSTGRES: &str = "
    CREATE TABLE IF NOT EXISTS ranking (
        id BIGSERIAL PRIMARY KEY,
        nombre TEXT NOT NULL,
        malla TEXT NOT NULL,
        notas_json TEXT NOT NULL,
        ponderado DOUBLE PRECISION NOT NULL,
        creditos_totales BIGINT NOT NULL,
        creado_en TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_ranking_malla_ponderado ON ranking (malla, ponderado DESC);

    CREATE TABLE IF NOT EXISTS evaluaciones_riesgo (
        estudiante_id TEXT PRIMARY KEY,
        puntaje DOUBLE PRECISION NOT NULL,
        nivel TEXT NOT NULL,
        evaluado_en TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS usuarios (
        id BIGSERIAL PRIMARY KEY,
        nombre TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        rol TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS tutorias (
        id BIGSERIAL PRIMARY KEY,
        estudiante TEXT NOT NULL,
        curso TEXT NOT NULL,
        mensaje TEXT NOT NULL,
        estado TEXT NOT NULL,
        tutor TEXT,
        creado_en TEXT NOT NULL,
        actualizado_en TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS recursos (
        id BIGSERIAL PRIMARY KEY,
        titulo TEXT NOT NULL,
        curso TEXT NOT NULL,
        url TEXT NOT NULL,
        descripcion TEXT,
        creado_en TEXT NOT NULL
    );
";
