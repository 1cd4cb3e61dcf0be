use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::malla::normalizar_clave;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rol {
    #[default]
    Estudiante,
    Tutor,
    Admin,
}

impl Rol {
    pub fn as_str(self) -> &'static str {
        match self {
            Rol::Estudiante => "estudiante",
            Rol::Tutor => "tutor",
            Rol::Admin => "admin",
        }
    }
}

impl fmt::Display for Rol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalizar_clave(s).as_str() {
            "estudiante" => Ok(Rol::Estudiante),
            "tutor" => Ok(Rol::Tutor),
            "admin" => Ok(Rol::Admin),
            otro => Err(format!("rol desconocido '{}'", otro)),
        }
    }
}

/// Usuario tal como se expone al cliente (sin contraseña).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usuario {
    pub id: i64,
    pub nombre: String,
    pub email: String,
    pub rol: Rol,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsuarioConClave {
    pub usuario: Usuario,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NuevoUsuario {
    pub nombre: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub rol: Rol,
}

impl NuevoUsuario {
    /// Recorta campos y deja el email en minúsculas.
    pub fn validar(mut self) -> Result<Self, AppError> {
        self.nombre = self.nombre.trim().to_string();
        self.email = normalizar_clave(&self.email);
        if self.nombre.is_empty() {
            return Err(AppError::MalformedPayload("nombre es requerido".into()));
        }
        if !self.email.contains('@') {
            return Err(AppError::MalformedPayload("email inválido".into()));
        }
        if self.password.is_empty() {
            return Err(AppError::MalformedPayload("password es requerido".into()));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credenciales {
    pub email: String,
    pub password: String,
}

/// Las contraseñas se guardan y comparan en texto plano.
pub fn verificar(registro: Option<UsuarioConClave>, credenciales: &Credenciales) -> Result<Usuario, AppError> {
    match registro {
        Some(r) if r.password == credenciales.password => Ok(r.usuario),
        _ => Err(AppError::Unauthorized),
    }
}
