//! Cálculo del promedio ponderado por créditos.
//!
//! El flujo tiene dos pasos: `normalizar_notas` convierte los valores enviados
//! por el cliente (números, textos, nulos) en notas o retiros y deja registro
//! de cada valor que tuvo que reemplazarse por 0; `calcular_ponderado` aplica
//! los pesos de la malla sobre las notas ya normalizadas.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::AppError;
use crate::malla::{normalizar_clave, CatalogoMallas, Malla};

/// Valor que marca un curso como retirado.
pub const NOTA_RETIRO: f64 = -1.0;

/// Malla usada por el formulario antiguo de siete notas (`n1`..`n7`).
pub const MALLA_FORMULARIO_LEGADO: &str = "sistemas";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Redondeo {
    DosDecimales,
    #[default]
    CuatroDecimales,
}

impl Redondeo {
    pub fn decimales(self) -> i32 {
        match self {
            Redondeo::DosDecimales => 2,
            Redondeo::CuatroDecimales => 4,
        }
    }

    pub fn aplicar(self, valor: f64) -> f64 {
        let factor = 10f64.powi(self.decimales());
        (valor * factor).round() / factor
    }
}

impl FromStr for Redondeo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "2" => Ok(Redondeo::DosDecimales),
            "4" => Ok(Redondeo::CuatroDecimales),
            otro => Err(format!("se esperaba 2 o 4 decimales, se recibió '{}'", otro)),
        }
    }
}

/// Qué hacer con un curso de la malla que no vino en la solicitud.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaveAusente {
    /// Cuenta como nota 0 con todos sus créditos.
    #[default]
    Cero,
    /// Se excluye igual que un retiro.
    Retiro,
}

impl FromStr for ClaveAusente {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalizar_clave(s).as_str() {
            "cero" | "0" => Ok(ClaveAusente::Cero),
            "retiro" | "retirado" => Ok(ClaveAusente::Retiro),
            otro => Err(format!("se esperaba 'cero' o 'retiro', se recibió '{}'", otro)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PoliticaCalculo {
    pub redondeo: Redondeo,
    pub clave_ausente: ClaveAusente,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NotaNormalizada {
    Nota(f64),
    Retiro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MotivoCoercion {
    /// Texto que no se puede leer como número.
    NoNumerico,
    /// NaN o infinito.
    NoFinito,
    /// Negativo distinto del valor de retiro.
    Negativo,
    /// Booleano, arreglo u objeto.
    TipoInvalido,
    /// La clave no pertenece a la malla; el valor se ignora.
    ClaveDesconocida,
    /// La clave repite un curso ya enviado (p. ej. `Integral` e `integral`);
    /// vale la primera en orden de claves y esta se ignora.
    ClaveDuplicada,
}

impl fmt::Display for MotivoCoercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MotivoCoercion::NoNumerico => "no numérico",
            MotivoCoercion::NoFinito => "no finito",
            MotivoCoercion::Negativo => "negativo",
            MotivoCoercion::TipoInvalido => "tipo inválido",
            MotivoCoercion::ClaveDesconocida => "curso fuera de la malla",
            MotivoCoercion::ClaveDuplicada => "curso repetido",
        };
        f.write_str(s)
    }
}

/// Registro de un valor enviado que no se usó tal cual.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coercion {
    pub curso: String,
    pub valor_original: Value,
    pub motivo: MotivoCoercion,
}

#[derive(Debug, Clone, Default)]
pub struct NotasNormalizadas {
    pub valores: HashMap<String, NotaNormalizada>,
    pub coerciones: Vec<Coercion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultadoPonderado {
    pub promedio: f64,
    pub creditos_totales: u32,
    pub creditos_posibles: u32,
    pub cursos_retirados: Vec<String>,
    pub coerciones: Vec<Coercion>,
}

fn clasificar_numero(n: f64) -> Result<NotaNormalizada, MotivoCoercion> {
    if !n.is_finite() {
        Err(MotivoCoercion::NoFinito)
    } else if n == NOTA_RETIRO {
        Ok(NotaNormalizada::Retiro)
    } else if n < 0.0 {
        Err(MotivoCoercion::Negativo)
    } else {
        Ok(NotaNormalizada::Nota(n))
    }
}

/// Interpreta un valor JSON como nota. `Ok(None)` significa "no enviado".
pub fn normalizar_valor(valor: &Value) -> Result<Option<NotaNormalizada>, MotivoCoercion> {
    match valor {
        Value::Null => Ok(None),
        Value::Number(n) => match n.as_f64() {
            Some(f) => clasificar_numero(f).map(Some),
            None => Err(MotivoCoercion::NoFinito),
        },
        Value::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                return Ok(None);
            }
            match t.replace(',', ".").parse::<f64>() {
                Ok(f) => clasificar_numero(f).map(Some),
                Err(_) => Err(MotivoCoercion::NoNumerico),
            }
        }
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => Err(MotivoCoercion::TipoInvalido),
    }
}

/// Normaliza las notas enviadas contra la malla. Los valores inutilizables
/// quedan como nota 0 y se reportan en `coerciones`.
pub fn normalizar_notas(malla: &Malla, notas: &Map<String, Value>) -> NotasNormalizadas {
    let mut out = NotasNormalizadas::default();
    let mut vistas = HashSet::new();
    for (clave_original, valor) in notas {
        let clave = normalizar_clave(clave_original);
        if malla.contiene(&clave) && !vistas.insert(clave.clone()) {
            warn!(malla = malla.id(), curso = %clave_original, "curso repetido ignorado");
            out.coerciones.push(Coercion {
                curso: clave_original.clone(),
                valor_original: valor.clone(),
                motivo: MotivoCoercion::ClaveDuplicada,
            });
            continue;
        }
        if !malla.contiene(&clave) {
            warn!(malla = malla.id(), curso = %clave_original, "curso fuera de la malla ignorado");
            out.coerciones.push(Coercion {
                curso: clave_original.clone(),
                valor_original: valor.clone(),
                motivo: MotivoCoercion::ClaveDesconocida,
            });
            continue;
        }
        match normalizar_valor(valor) {
            Ok(Some(nota)) => {
                out.valores.insert(clave, nota);
            }
            Ok(None) => {}
            Err(motivo) => {
                warn!(malla = malla.id(), curso = %clave, valor = %valor, %motivo, "nota reemplazada por 0");
                out.coerciones.push(Coercion { curso: clave.clone(), valor_original: valor.clone(), motivo });
                out.valores.insert(clave, NotaNormalizada::Nota(0.0));
            }
        }
    }
    out.coerciones.sort_by(|a, b| a.curso.cmp(&b.curso));
    out
}

/// Promedio ponderado sobre los cursos no retirados. Si todos los cursos
/// quedan fuera, el resultado es 0 con 0 créditos.
pub fn calcular_ponderado(malla: &Malla, notas: &HashMap<String, NotaNormalizada>, politica: PoliticaCalculo) -> ResultadoPonderado {
    let mut suma = 0.0f64;
    let mut creditos_totales = 0u32;
    let mut cursos_retirados = Vec::new();

    for curso in malla.cursos() {
        let nota = match notas.get(&curso.clave) {
            Some(NotaNormalizada::Nota(n)) => Some(*n),
            Some(NotaNormalizada::Retiro) => None,
            None => match politica.clave_ausente {
                ClaveAusente::Cero => Some(0.0),
                ClaveAusente::Retiro => None,
            },
        };
        match nota {
            Some(n) => {
                suma += n * f64::from(curso.creditos);
                creditos_totales += curso.creditos;
            }
            None => cursos_retirados.push(curso.clave.clone()),
        }
    }

    let promedio = if creditos_totales == 0 {
        0.0
    } else {
        politica.redondeo.aplicar(suma / f64::from(creditos_totales))
    };

    ResultadoPonderado {
        promedio,
        creditos_totales,
        creditos_posibles: malla.creditos_posibles(),
        cursos_retirados,
        coerciones: Vec::new(),
    }
}

/// Normaliza y calcula en un paso.
pub fn ponderar(malla: &Malla, notas: &Map<String, Value>, politica: PoliticaCalculo) -> ResultadoPonderado {
    let normalizadas = normalizar_notas(malla, notas);
    let mut resultado = calcular_ponderado(malla, &normalizadas.valores, politica);
    resultado.coerciones = normalizadas.coerciones;
    resultado
}

/// Notas por curso tal como se guardan en el ranking (retiro = -1).
pub fn notas_para_registro(malla: &Malla, normalizadas: &NotasNormalizadas) -> BTreeMap<String, f64> {
    malla
        .cursos()
        .iter()
        .filter_map(|c| {
            normalizadas.valores.get(&c.clave).map(|n| {
                let v = match n {
                    NotaNormalizada::Nota(x) => *x,
                    NotaNormalizada::Retiro => NOTA_RETIRO,
                };
                (c.clave.clone(), v)
            })
        })
        .collect()
}

/// Solicitud de cálculo ya validada en su forma.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolicitudCalculo {
    pub nombre: String,
    pub malla: String,
    #[serde(default)]
    pub notas: Map<String, Value>,
}

impl SolicitudCalculo {
    /// Acepta dos formas de cuerpo:
    ///
    /// ```json
    /// {"nombre": "Ana", "malla": "sistemas", "notas": {"integral": 16, "algoritmia": -1}}
    /// ```
    ///
    /// o el formulario antiguo de siete campos, que se asigna en orden a los
    /// cursos de la malla `sistemas`:
    ///
    /// ```json
    /// {"nombre": "Ana", "n1": "16", "n2": "14", "n3": "12", "n4": "18", "n5": "10", "n6": "15", "n7": "13"}
    /// ```
    pub fn desde_valor(body: Value, catalogo: &CatalogoMallas) -> Result<Self, AppError> {
        let obj = match body {
            Value::Object(o) => o,
            _ => return Err(AppError::MalformedPayload("se esperaba un objeto JSON".into())),
        };

        let nombre = obj
            .get("nombre")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::MalformedPayload("nombre es requerido".into()))?;

        if let Some(notas) = obj.get("notas") {
            let notas = notas
                .as_object()
                .cloned()
                .ok_or_else(|| AppError::MalformedPayload("notas debe ser un objeto curso -> nota".into()))?;
            let malla = obj
                .get("malla")
                .and_then(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| AppError::MalformedPayload("malla es requerida".into()))?;
            return Ok(SolicitudCalculo { nombre, malla, notas });
        }

        let es_legado = obj.keys().any(|k| es_campo_legado(k));
        if !es_legado {
            return Err(AppError::MalformedPayload("notas es requerido".into()));
        }

        let malla = catalogo.obtener(MALLA_FORMULARIO_LEGADO)?;
        let mut notas = Map::new();
        for (i, curso) in malla.cursos().iter().enumerate() {
            if let Some(v) = obj.get(&format!("n{}", i + 1)) {
                notas.insert(curso.clave.clone(), v.clone());
            }
        }
        Ok(SolicitudCalculo { nombre, malla: malla.id().to_string(), notas })
    }
}

fn es_campo_legado(k: &str) -> bool {
    k.strip_prefix('n').map(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())).unwrap_or(false)
}
