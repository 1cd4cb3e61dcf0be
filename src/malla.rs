//! Catálogo de mallas curriculares (plan -> cursos con créditos).
//!
//! El catálogo se carga una sola vez al iniciar el proceso y después sólo se
//! lee; se comparte entre hilos como `Arc<CatalogoMallas>`.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;
use thiserror::Error;
use tracing::{info, warn};

/// Similitud mínima para sugerir una malla cuando el id no existe.
const UMBRAL_SUGERENCIA: f64 = 0.8;

#[derive(Debug, Error)]
pub enum MallaError {
    #[error("identificador de malla vacío")]
    IdVacio,
    #[error("la malla '{0}' no define cursos")]
    SinCursos(String),
    #[error("la malla '{0}' aparece más de una vez en el catálogo")]
    MallaDuplicada(String),
    #[error("la malla '{malla}' repite el curso '{clave}'")]
    ClaveDuplicada { malla: String, clave: String },
    #[error("la malla '{malla}' tiene un curso sin clave")]
    ClaveVacia { malla: String },
    #[error("el curso '{clave}' de la malla '{malla}' debe tener créditos positivos (tiene {creditos})")]
    CreditosInvalidos { malla: String, clave: String, creditos: i64 },
    #[error("no se pudo leer el catálogo {path}: {source}")]
    Lectura { path: PathBuf, source: std::io::Error },
    #[error("catálogo de mallas inválido: {0}")]
    Formato(#[from] serde_json::Error),
}

/// Error de consulta: el id pedido no corresponde a ninguna malla.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("malla desconocida '{id}'{}", sufijo_sugerencia(.sugerencia))]
pub struct MallaDesconocida {
    pub id: String,
    pub sugerencia: Option<String>,
}

fn sufijo_sugerencia(sugerencia: &Option<String>) -> String {
    match sugerencia {
        Some(s) => format!(" (¿quiso decir '{}'?)", s),
        None => String::new(),
    }
}

/// Normaliza identificadores y claves: sin espacios extremos y en minúsculas.
pub fn normalizar_clave(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Curso tal como aparece en el archivo de configuración.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursoDef {
    pub clave: String,
    #[serde(default)]
    pub nombre: Option<String>,
    pub creditos: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MallaDef {
    pub id: String,
    #[serde(default)]
    pub nombre: Option<String>,
    pub cursos: Vec<CursoDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogoDef {
    pub mallas: Vec<MallaDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Curso {
    pub clave: String,
    pub nombre: String,
    pub creditos: u32,
}

/// Plan de estudios validado: claves únicas y créditos positivos.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Malla {
    id: String,
    nombre: String,
    cursos: Vec<Curso>,
}

impl Malla {
    pub fn new(def: MallaDef) -> Result<Self, MallaError> {
        let id = normalizar_clave(&def.id);
        if id.is_empty() {
            return Err(MallaError::IdVacio);
        }
        if def.cursos.is_empty() {
            return Err(MallaError::SinCursos(id));
        }

        let mut vistas = HashSet::new();
        let mut cursos = Vec::with_capacity(def.cursos.len());
        for c in def.cursos {
            let clave = normalizar_clave(&c.clave);
            if clave.is_empty() {
                return Err(MallaError::ClaveVacia { malla: id });
            }
            if !vistas.insert(clave.clone()) {
                return Err(MallaError::ClaveDuplicada { malla: id, clave });
            }
            let creditos = match u32::try_from(c.creditos) {
                Ok(n) if n > 0 => n,
                _ => return Err(MallaError::CreditosInvalidos { malla: id, clave, creditos: c.creditos }),
            };
            let nombre = c.nombre.unwrap_or_else(|| clave.clone());
            cursos.push(Curso { clave, nombre, creditos });
        }

        let nombre = def.nombre.unwrap_or_else(|| id.clone());
        Ok(Malla { id, nombre, cursos })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn nombre(&self) -> &str {
        &self.nombre
    }

    /// Cursos en el orden en que fueron declarados.
    pub fn cursos(&self) -> &[Curso] {
        &self.cursos
    }

    pub fn curso(&self, clave: &str) -> Option<&Curso> {
        self.cursos.iter().find(|c| c.clave == clave)
    }

    pub fn contiene(&self, clave: &str) -> bool {
        self.curso(clave).is_some()
    }

    /// Suma de los créditos de todos los cursos del plan.
    pub fn creditos_posibles(&self) -> u32 {
        self.cursos.iter().map(|c| c.creditos).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogoMallas {
    mallas: BTreeMap<String, Malla>,
}

impl CatalogoMallas {
    pub fn from_defs(defs: Vec<MallaDef>) -> Result<Self, MallaError> {
        let mut mallas = BTreeMap::new();
        for def in defs {
            let malla = Malla::new(def)?;
            if mallas.contains_key(malla.id()) {
                return Err(MallaError::MallaDuplicada(malla.id().to_string()));
            }
            mallas.insert(malla.id().to_string(), malla);
        }
        Ok(CatalogoMallas { mallas })
    }

    pub fn from_json(json_str: &str) -> Result<Self, MallaError> {
        let def: CatalogoDef = serde_json::from_str(json_str)?;
        Self::from_defs(def.mallas)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MallaError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| MallaError::Lectura { path: path.to_path_buf(), source })?;
        Self::from_json(&contents)
    }

    /// Carga el catálogo desde `path` si se indica; si no, usa el integrado.
    pub fn cargar(path: Option<&Path>) -> Result<Self, MallaError> {
        let catalogo = match path {
            Some(p) => {
                info!("Cargando mallas desde {}", p.display());
                Self::from_file(p)?
            }
            None => {
                info!("RENDIMIENTO_MALLAS_PATH no definido, usando catálogo integrado");
                Self::integrado()
            }
        };
        info!("{} mallas disponibles: {:?}", catalogo.len(), catalogo.ids());
        Ok(catalogo)
    }

    /// Catálogo por defecto: sistemas, industrial y software.
    pub fn integrado() -> Self {
        let def = |id: &str, nombre: &str, cursos: &[(&str, &str, i64)]| MallaDef {
            id: id.to_string(),
            nombre: Some(nombre.to_string()),
            cursos: cursos
                .iter()
                .map(|(clave, nombre, creditos)| CursoDef {
                    clave: clave.to_string(),
                    nombre: Some(nombre.to_string()),
                    creditos: *creditos,
                })
                .collect(),
        };

        let defs = vec![
            def("sistemas", "Ingeniería de Sistemas", &[
                ("integral", "Cálculo Integral", 5),
                ("lineal", "Álgebra Lineal", 4),
                ("algoritmia", "Algoritmia", 3),
                ("etica", "Ética", 2),
                ("tcs", "Teoría de la Comunicación", 3),
                ("psico", "Psicología", 3),
                ("biologia", "Biología", 2),
            ]),
            def("industrial", "Ingeniería Industrial", &[
                ("calculo", "Cálculo Diferencial", 5),
                ("fisica", "Física General", 4),
                ("quimica", "Química General", 4),
                ("dibujo", "Dibujo de Ingeniería", 3),
                ("economia", "Economía General", 3),
                ("redaccion", "Redacción", 2),
            ]),
            def("software", "Ingeniería de Software", &[
                ("programacion", "Introducción a la Programación", 5),
                ("discretas", "Matemáticas Discretas", 4),
                ("calculo", "Cálculo Diferencial", 4),
                ("estructuras", "Estructuras de Datos", 4),
                ("comunicacion", "Comunicación", 2),
                ("etica", "Ética", 2),
            ]),
        ];

        match Self::from_defs(defs) {
            Ok(c) => c,
            Err(e) => {
                // las tablas de arriba son fijas; sólo falla si alguien las rompe
                warn!("catálogo integrado inválido: {}", e);
                CatalogoMallas::default()
            }
        }
    }

    pub fn obtener(&self, id: &str) -> Result<&Malla, MallaDesconocida> {
        let key = normalizar_clave(id);
        self.mallas.get(&key).ok_or_else(|| MallaDesconocida {
            id: id.trim().to_string(),
            sugerencia: self.sugerir(&key),
        })
    }

    /// Id más parecido a `id` según Jaro-Winkler, si supera el umbral.
    fn sugerir(&self, id: &str) -> Option<String> {
        if id.is_empty() {
            return None;
        }
        self.mallas
            .keys()
            .map(|k| (k, jaro_winkler(k, id)))
            .filter(|(_, score)| *score >= UMBRAL_SUGERENCIA)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(k, _)| k.clone())
    }

    pub fn contiene(&self, id: &str) -> bool {
        self.mallas.contains_key(&normalizar_clave(id))
    }

    pub fn ids(&self) -> Vec<&str> {
        self.mallas.keys().map(|k| k.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Malla> {
        self.mallas.values()
    }

    pub fn len(&self) -> usize {
        self.mallas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mallas.is_empty()
    }
}
