// --- Backend de apoyo académico - Archivo principal ---

use rendimiento::config::Config;
use rendimiento::run_server;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("=== Calculadora de ponderado y riesgo académico (API) ===");
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("configuración inválida: {}", e);
            return Err(std::io::Error::other(e));
        }
    };
    run_server(config).await
}
