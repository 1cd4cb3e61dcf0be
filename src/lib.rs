// Biblioteca raíz del crate `rendimiento`.
// Expone el motor de ponderado y riesgo, el almacenamiento y el servidor HTTP.
pub mod chat;
pub mod config;
pub mod error;
pub mod malla;
pub mod motor;
pub mod ponderado;
pub mod ranking;
pub mod recursos;
pub mod riesgo;
pub mod server;
mod server_handlers;
pub mod store;
pub mod tutorias;
pub mod usuarios;

/// Ejecuta el servidor HTTP (reexport para facilitar uso desde `main`)
pub use server::run_server;
