use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::{tutoria_cambiada, Store, StoreError};
use crate::ranking::{top_ranking, EntradaRanking, NuevaEntradaRanking};
use crate::recursos::{NuevoRecurso, Recurso};
use crate::riesgo::EvaluacionRiesgo;
use crate::tutorias::{EstadoTutoria, NuevaTutoria, Tutoria};
use crate::usuarios::{NuevoUsuario, Usuario, UsuarioConClave};

#[derive(Default)]
struct Tablas {
    ultimo_id: i64,
    ranking: Vec<EntradaRanking>,
    riesgos: HashMap<String, EvaluacionRiesgo>,
    usuarios: Vec<UsuarioConClave>,
    tutorias: Vec<Tutoria>,
    recursos: Vec<Recurso>,
}

impl Tablas {
    fn siguiente_id(&mut self) -> i64 {
        self.ultimo_id += 1;
        self.ultimo_id
    }
}

/// Almacenamiento volátil para pruebas y `memory://`.
#[derive(Default)]
pub struct MemoryStore {
    tablas: Mutex<Tablas>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tablas(&self) -> Result<MutexGuard<'_, Tablas>, StoreError> {
        self.tablas.lock().map_err(|_| StoreError::Hilo("memory store mutex poisoned".into()))
    }
}

impl Store for MemoryStore {
    fn agregar_ranking(&self, entrada: &NuevaEntradaRanking) -> Result<EntradaRanking, StoreError> {
        let mut t = self.tablas()?;
        let id = t.siguiente_id();
        let e = EntradaRanking::from_nueva(id, entrada);
        t.ranking.push(e.clone());
        Ok(e)
    }

    fn consultar_ranking(&self, malla: Option<&str>, limite: usize) -> Result<Vec<EntradaRanking>, StoreError> {
        let t = self.tablas()?;
        Ok(top_ranking(&t.ranking, malla, limite))
    }

    fn upsert_riesgo(&self, evaluacion: &EvaluacionRiesgo) -> Result<(), StoreError> {
        let mut t = self.tablas()?;
        t.riesgos.insert(evaluacion.estudiante_id.clone(), evaluacion.clone());
        Ok(())
    }

    fn obtener_riesgo(&self, estudiante_id: &str) -> Result<Option<EvaluacionRiesgo>, StoreError> {
        Ok(self.tablas()?.riesgos.get(estudiante_id).cloned())
    }

    fn listar_riesgos(&self) -> Result<Vec<EvaluacionRiesgo>, StoreError> {
        let t = self.tablas()?;
        let mut v: Vec<EvaluacionRiesgo> = t.riesgos.values().cloned().collect();
        v.sort_by(|a, b| b.puntaje.total_cmp(&a.puntaje).then_with(|| a.estudiante_id.cmp(&b.estudiante_id)));
        Ok(v)
    }

    fn crear_usuario(&self, nuevo: &NuevoUsuario) -> Result<Usuario, StoreError> {
        let mut t = self.tablas()?;
        if t.usuarios.iter().any(|u| u.usuario.email == nuevo.email) {
            return Err(StoreError::Duplicado(format!("el email {} ya está registrado", nuevo.email)));
        }
        let usuario = Usuario { id: t.siguiente_id(), nombre: nuevo.nombre.clone(), email: nuevo.email.clone(), rol: nuevo.rol };
        t.usuarios.push(UsuarioConClave { usuario: usuario.clone(), password: nuevo.password.clone() });
        Ok(usuario)
    }

    fn buscar_usuario(&self, email: &str) -> Result<Option<UsuarioConClave>, StoreError> {
        Ok(self.tablas()?.usuarios.iter().find(|u| u.usuario.email == email).cloned())
    }

    fn crear_tutoria(&self, nueva: &NuevaTutoria, ahora: DateTime<Utc>) -> Result<Tutoria, StoreError> {
        let mut t = self.tablas()?;
        let tutoria = Tutoria {
            id: t.siguiente_id(),
            estudiante: nueva.estudiante.clone(),
            curso: nueva.curso.clone(),
            mensaje: nueva.mensaje.clone(),
            estado: EstadoTutoria::Pendiente,
            tutor: None,
            creado_en: ahora,
            actualizado_en: ahora,
        };
        t.tutorias.push(tutoria.clone());
        Ok(tutoria)
    }

    fn obtener_tutoria(&self, id: i64) -> Result<Option<Tutoria>, StoreError> {
        Ok(self.tablas()?.tutorias.iter().find(|t| t.id == id).cloned())
    }

    fn actualizar_tutoria(&self, tutoria: &Tutoria, estado_previo: EstadoTutoria) -> Result<(), StoreError> {
        let mut t = self.tablas()?;
        match t.tutorias.iter_mut().find(|x| x.id == tutoria.id && x.estado == estado_previo) {
            Some(existente) => {
                *existente = tutoria.clone();
                Ok(())
            }
            None => Err(tutoria_cambiada(tutoria.id, estado_previo)),
        }
    }

    fn listar_tutorias(&self, estado: Option<EstadoTutoria>) -> Result<Vec<Tutoria>, StoreError> {
        let t = self.tablas()?;
        let mut v: Vec<Tutoria> = t.tutorias.iter().filter(|x| estado.is_none_or(|e| x.estado == e)).cloned().collect();
        v.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(v)
    }

    fn crear_recurso(&self, nuevo: &NuevoRecurso, ahora: DateTime<Utc>) -> Result<Recurso, StoreError> {
        let mut t = self.tablas()?;
        let recurso = Recurso {
            id: t.siguiente_id(),
            titulo: nuevo.titulo.clone(),
            curso: nuevo.curso.clone(),
            url: nuevo.url.clone(),
            descripcion: nuevo.descripcion.clone(),
            creado_en: ahora,
        };
        t.recursos.push(recurso.clone());
        Ok(recurso)
    }

    fn listar_recursos(&self, curso: Option<&str>) -> Result<Vec<Recurso>, StoreError> {
        let t = self.tablas()?;
        let curso = curso.map(str::to_lowercase);
        let mut v: Vec<Recurso> = t
            .recursos
            .iter()
            .filter(|r| curso.as_deref().is_none_or(|c| r.curso.to_lowercase() == c))
            .cloned()
            .collect();
        v.sort_by(|a, b| a.titulo.cmp(&b.titulo).then(a.id.cmp(&b.id)));
        Ok(v)
    }
}
