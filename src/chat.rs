//! Reenvío del prompt del usuario a un proveedor de chat compatible con la
//! API de "chat completions". La respuesta del proveedor se devuelve tal cual.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::AppError;

pub const CHAT_API_URL_POR_DEFECTO: &str = "https://api.openai.com/v1/chat/completions";
pub const CHAT_MODELO_POR_DEFECTO: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub modelo: String,
    pub timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        ChatConfig {
            api_url: CHAT_API_URL_POR_DEFECTO.to_string(),
            api_key: None,
            modelo: CHAT_MODELO_POR_DEFECTO.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    config: ChatConfig,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Interno(format!("no se pudo crear el cliente http: {}", e)))?;
        Ok(ChatClient { http, config })
    }

    pub fn habilitado(&self) -> bool {
        self.config.api_key.is_some()
    }

    pub async fn enviar(&self, prompt: &str) -> Result<Value, AppError> {
        let key = self.config.api_key.as_deref().ok_or(AppError::ChatDisabled)?;
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AppError::MalformedPayload("prompt es requerido".into()));
        }

        let cuerpo = json!({
            "model": self.config.modelo,
            "messages": [{"role": "user", "content": prompt}],
        });
        debug!(modelo = %self.config.modelo, largo = prompt.len(), "reenviando prompt");

        let resp = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(key)
            .json(&cuerpo)
            .send()
            .await
            .map_err(|e| {
                warn!("chat provider unreachable: {}", e);
                AppError::Upstream(e.to_string())
            })?;

        let status = resp.status();
        if !status.is_success() {
            let detalle = resp.text().await.unwrap_or_default();
            warn!(%status, cuerpo = %detalle.chars().take(200).collect::<String>(), "chat provider returned error");
            return Err(AppError::Upstream(format!("el proveedor respondió {}", status)));
        }
        resp.json::<Value>().await.map_err(|e| AppError::Upstream(format!("respuesta no JSON: {}", e)))
    }
}
