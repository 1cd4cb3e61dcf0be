use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::chat::{ChatConfig, CHAT_API_URL_POR_DEFECTO, CHAT_MODELO_POR_DEFECTO};
use crate::ponderado::{ClaveAusente, PoliticaCalculo, Redondeo};
use crate::ranking::{RANKING_LIMITE_MAXIMO, RANKING_LIMITE_POR_DEFECTO};

pub const DB_URL_POR_DEFECTO: &str = "sqlite://data/rendimiento.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("valor inválido para {key}: {detalle}")]
    Invalido { key: String, detalle: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub db_url: String,
    pub mallas_path: Option<PathBuf>,
    pub politica: PoliticaCalculo,
    pub ranking_limite: usize,
    pub chat: ChatConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 3000,
            workers: num_cpus::get().max(1),
            db_url: DB_URL_POR_DEFECTO.to_string(),
            mallas_path: None,
            politica: PoliticaCalculo::default(),
            ranking_limite: RANKING_LIMITE_POR_DEFECTO,
            chat: ChatConfig::default(),
        }
    }
}

impl Config {
    /// Lee la configuración del entorno (y de `.env` si existe).
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenv::dotenv();

        let ranking_limite: usize = try_load("RENDIMIENTO_RANKING_LIMITE", &RANKING_LIMITE_POR_DEFECTO.to_string())?;
        if ranking_limite == 0 || ranking_limite > RANKING_LIMITE_MAXIMO {
            return Err(ConfigError::Invalido {
                key: "RENDIMIENTO_RANKING_LIMITE".into(),
                detalle: format!("debe estar entre 1 y {}", RANKING_LIMITE_MAXIMO),
            });
        }

        let workers: usize = try_load("RENDIMIENTO_WORKERS", &num_cpus::get().max(1).to_string())?;
        let timeout_secs: u64 = try_load("CHAT_TIMEOUT_SECS", "60")?;

        Ok(Config {
            host: try_load("RENDIMIENTO_HOST", "127.0.0.1")?,
            port: try_load("PORT", "3000")?,
            workers: workers.max(1),
            db_url: try_load("RENDIMIENTO_DB_URL", DB_URL_POR_DEFECTO)?,
            mallas_path: var("RENDIMIENTO_MALLAS_PATH").map(PathBuf::from),
            politica: PoliticaCalculo {
                redondeo: try_load::<Redondeo>("RENDIMIENTO_REDONDEO", "4")?,
                clave_ausente: try_load::<ClaveAusente>("RENDIMIENTO_CLAVE_AUSENTE", "cero")?,
            },
            ranking_limite,
            chat: ChatConfig {
                api_url: try_load("CHAT_API_URL", CHAT_API_URL_POR_DEFECTO)?,
                api_key: secret("CHAT_API_KEY"),
                modelo: try_load("CHAT_MODEL", CHAT_MODELO_POR_DEFECTO)?,
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn secret(key: &str) -> Option<String> {
    let v = var(key);
    if v.is_none() {
        warn!("{key} not set, chat endpoint disabled");
    }
    v
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse::<T>()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalido { key: key.to_string(), detalle: e.to_string() }
        })
}
