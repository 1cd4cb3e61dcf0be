use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing::info;

use crate::chat::{ChatClient, ChatConfig};
use crate::config::Config;
use crate::error::AppError;
use crate::malla::CatalogoMallas;
use crate::motor::Motor;
use crate::server_handlers::*;
use crate::store::{open_store, Store};

/// Estado compartido por todos los workers.
pub struct AppState {
    pub motor: Arc<Motor>,
    pub store: Arc<dyn Store>,
    pub chat: ChatClient,
}

impl AppState {
    pub fn new(config: &Config, catalogo: CatalogoMallas, store: Arc<dyn Store>) -> Result<Self, AppError> {
        Self::with_chat(config, catalogo, store, config.chat.clone())
    }

    pub fn with_chat(config: &Config, catalogo: CatalogoMallas, store: Arc<dyn Store>, chat: ChatConfig) -> Result<Self, AppError> {
        let motor = Motor::new(Arc::new(catalogo), config.politica, config.ranking_limite, Arc::clone(&store));
        Ok(AppState { motor: Arc::new(motor), store, chat: ChatClient::new(chat)? })
    }
}

/// Registra todas las rutas; también lo usan los tests con `actix_web::test`.
pub fn configurar_rutas(cfg: &mut web::ServiceConfig) {
    // cuerpos y rutas que no se pueden extraer responden {"error": ...} como el resto
    cfg.app_data(web::JsonConfig::default().error_handler(|e, _| AppError::MalformedPayload(e.to_string()).into()))
        .app_data(web::PathConfig::default().error_handler(|e, _| AppError::MalformedPayload(e.to_string()).into()));
    cfg.route("/", web::get().to(help_handler))
        .route("/help", web::get().to(help_handler))
        .service(
            web::scope("/api")
                .route("/mallas", web::get().to(mallas_handler))
                .route("/calcular", web::post().to(calcular_handler))
                .route("/calcular/simular", web::post().to(simular_handler))
                .route("/ranking", web::get().to(ranking_handler))
                .route("/riesgo", web::post().to(riesgo_upsert_handler))
                .route("/riesgo", web::get().to(riesgo_list_handler))
                .route("/riesgo/{estudiante_id}", web::get().to(riesgo_get_handler))
                .route("/registro", web::post().to(registro_handler))
                .route("/login", web::post().to(login_handler))
                .route("/tutorias", web::post().to(tutoria_create_handler))
                .route("/tutorias", web::get().to(tutoria_list_handler))
                .route("/tutorias/{id}", web::patch().to(tutoria_update_handler))
                .route("/recursos", web::post().to(recurso_create_handler))
                .route("/recursos", web::get().to(recurso_list_handler))
                .route("/chat", web::post().to(chat_handler)),
        );
}

pub async fn run_server(config: Config) -> std::io::Result<()> {
    let catalogo = CatalogoMallas::cargar(config.mallas_path.as_deref()).map_err(std::io::Error::other)?;
    let store = open_store(&config.db_url).map_err(std::io::Error::other)?;
    let state = AppState::new(&config, catalogo, store).map_err(std::io::Error::other)?;
    if !state.chat.habilitado() {
        info!("Chat deshabilitado: CHAT_API_KEY no definido");
    }
    let state = web::Data::new(state);

    let bind = config.bind_addr();
    info!("Iniciando servidor en http://{} con {} workers", bind, config.workers);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(state.clone())
            .configure(configurar_rutas)
    })
    .workers(config.workers)
    .bind(&bind)?
    .run()
    .await
}
