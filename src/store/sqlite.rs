use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use super::{creditos_desde_db, parse_enum, parse_notas, parse_ts, tutoria_cambiada, Store, StoreError, ESQUEMA_SQLITE};
use crate::ranking::{EntradaRanking, NuevaEntradaRanking};
use crate::recursos::{NuevoRecurso, Recurso};
use crate::riesgo::EvaluacionRiesgo;
use crate::tutorias::{EstadoTutoria, NuevaTutoria, Tutoria};
use crate::usuarios::{NuevoUsuario, Usuario, UsuarioConClave};

/// Backend SQLite con una única conexión protegida por un mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Abre (o crea) la base en `path`, creando el directorio si hace falta.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(ESQUEMA_SQLITE)?;
        Ok(SqliteStore { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Hilo("sqlite mutex poisoned".into()))
    }
}

type FilaRanking = (i64, String, String, String, f64, i64, String);
type FilaTutoria = (i64, String, String, String, String, Option<String>, String, String);
type FilaRecurso = (i64, String, String, String, Option<String>, String);

fn leer_fila_ranking(row: &Row<'_>) -> rusqlite::Result<FilaRanking> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?, row.get(6)?))
}

fn leer_fila_tutoria(row: &Row<'_>) -> rusqlite::Result<FilaTutoria> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?, row.get(6)?, row.get(7)?))
}

fn leer_fila_recurso(row: &Row<'_>) -> rusqlite::Result<FilaRecurso> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
}

fn entrada_desde_fila(f: FilaRanking) -> Result<EntradaRanking, StoreError> {
    let (id, nombre, malla, notas_json, ponderado, creditos, creado_en) = f;
    Ok(EntradaRanking {
        id,
        nombre,
        malla,
        notas: parse_notas(&notas_json)?,
        ponderado,
        creditos_totales: creditos_desde_db(creditos)?,
        creado_en: parse_ts(&creado_en)?,
    })
}

fn tutoria_desde_fila(f: FilaTutoria) -> Result<Tutoria, StoreError> {
    let (id, estudiante, curso, mensaje, estado, tutor, creado_en, actualizado_en) = f;
    Ok(Tutoria {
        id,
        estudiante,
        curso,
        mensaje,
        estado: parse_enum(&estado)?,
        tutor,
        creado_en: parse_ts(&creado_en)?,
        actualizado_en: parse_ts(&actualizado_en)?,
    })
}

fn recurso_desde_fila(f: FilaRecurso) -> Result<Recurso, StoreError> {
    let (id, titulo, curso, url, descripcion, creado_en) = f;
    Ok(Recurso { id, titulo, curso, url, descripcion, creado_en: parse_ts(&creado_en)? })
}

fn es_violacion_unica(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation)
}

impl Store for SqliteStore {
    fn agregar_ranking(&self, entrada: &NuevaEntradaRanking) -> Result<EntradaRanking, StoreError> {
        let conn = self.conn()?;
        let notas_json = serde_json::to_string(&entrada.notas)?;
        conn.execute(
            "INSERT INTO ranking (nombre, malla, notas_json, ponderado, creditos_totales, creado_en)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entrada.nombre,
                entrada.malla,
                notas_json,
                entrada.ponderado,
                i64::from(entrada.creditos_totales),
                entrada.creado_en.to_rfc3339(),
            ],
        )?;
        Ok(EntradaRanking::from_nueva(conn.last_insert_rowid(), entrada))
    }

    fn consultar_ranking(&self, malla: Option<&str>, limite: usize) -> Result<Vec<EntradaRanking>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, nombre, malla, notas_json, ponderado, creditos_totales, creado_en
             FROM ranking
             WHERE (?1 IS NULL OR malla = ?1)
             ORDER BY ponderado DESC, id ASC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![malla, limite as i64], leer_fila_ranking)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(entrada_desde_fila(r?)?);
        }
        Ok(out)
    }

    fn upsert_riesgo(&self, ev: &EvaluacionRiesgo) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO evaluaciones_riesgo (estudiante_id, puntaje, nivel, evaluado_en)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(estudiante_id) DO UPDATE SET
                puntaje = excluded.puntaje,
                nivel = excluded.nivel,
                evaluado_en = excluded.evaluado_en",
            params![ev.estudiante_id, ev.puntaje, ev.nivel.etiqueta(), ev.evaluado_en.to_rfc3339()],
        )?;
        Ok(())
    }

    fn obtener_riesgo(&self, estudiante_id: &str) -> Result<Option<EvaluacionRiesgo>, StoreError> {
        let conn = self.conn()?;
        let fila = conn
            .query_row(
                "SELECT estudiante_id, puntaje, nivel, evaluado_en FROM evaluaciones_riesgo WHERE estudiante_id = ?1",
                params![estudiante_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?, row.get::<_, String>(2)?, row.get::<_, String>(3)?)),
            )
            .optional()?;
        fila.map(|(estudiante_id, puntaje, nivel, ts)| -> Result<EvaluacionRiesgo, StoreError> {
            Ok(EvaluacionRiesgo { estudiante_id, puntaje, nivel: parse_enum(&nivel)?, evaluado_en: parse_ts(&ts)? })
        })
        .transpose()
    }

    fn listar_riesgos(&self) -> Result<Vec<EvaluacionRiesgo>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT estudiante_id, puntaje, nivel, evaluado_en FROM evaluaciones_riesgo ORDER BY puntaje DESC, estudiante_id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?, row.get::<_, String>(2)?, row.get::<_, String>(3)?))
        })?;
        let mut out = Vec::new();
        for r in rows {
            let (estudiante_id, puntaje, nivel, ts) = r?;
            out.push(EvaluacionRiesgo { estudiante_id, puntaje, nivel: parse_enum(&nivel)?, evaluado_en: parse_ts(&ts)? });
        }
        Ok(out)
    }

    fn crear_usuario(&self, nuevo: &NuevoUsuario) -> Result<Usuario, StoreError> {
        let conn = self.conn()?;
        let res = conn.execute(
            "INSERT INTO usuarios (nombre, email, password, rol) VALUES (?1, ?2, ?3, ?4)",
            params![nuevo.nombre, nuevo.email, nuevo.password, nuevo.rol.as_str()],
        );
        match res {
            Ok(_) => Ok(Usuario {
                id: conn.last_insert_rowid(),
                nombre: nuevo.nombre.clone(),
                email: nuevo.email.clone(),
                rol: nuevo.rol,
            }),
            Err(e) if es_violacion_unica(&e) => Err(StoreError::Duplicado(format!("el email {} ya está registrado", nuevo.email))),
            Err(e) => Err(e.into()),
        }
    }

    fn buscar_usuario(&self, email: &str) -> Result<Option<UsuarioConClave>, StoreError> {
        let conn = self.conn()?;
        let fila = conn
            .query_row(
                "SELECT id, nombre, email, password, rol FROM usuarios WHERE email = ?1",
                params![email],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;
        fila.map(|(id, nombre, email, password, rol)| -> Result<UsuarioConClave, StoreError> {
            Ok(UsuarioConClave { usuario: Usuario { id, nombre, email, rol: parse_enum(&rol)? }, password })
        })
        .transpose()
    }

    fn crear_tutoria(&self, nueva: &NuevaTutoria, ahora: DateTime<Utc>) -> Result<Tutoria, StoreError> {
        let conn = self.conn()?;
        let ts = ahora.to_rfc3339();
        conn.execute(
            "INSERT INTO tutorias (estudiante, curso, mensaje, estado, tutor, creado_en, actualizado_en)
             VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?5)",
            params![nueva.estudiante, nueva.curso, nueva.mensaje, EstadoTutoria::Pendiente.as_str(), ts],
        )?;
        Ok(Tutoria {
            id: conn.last_insert_rowid(),
            estudiante: nueva.estudiante.clone(),
            curso: nueva.curso.clone(),
            mensaje: nueva.mensaje.clone(),
            estado: EstadoTutoria::Pendiente,
            tutor: None,
            creado_en: ahora,
            actualizado_en: ahora,
        })
    }

    fn obtener_tutoria(&self, id: i64) -> Result<Option<Tutoria>, StoreError> {
        let conn = self.conn()?;
        let fila = conn
            .query_row(
                "SELECT id, estudiante, curso, mensaje, estado, tutor, creado_en, actualizado_en FROM tutorias WHERE id = ?1",
                params![id],
                leer_fila_tutoria,
            )
            .optional()?;
        fila.map(tutoria_desde_fila).transpose()
    }

    fn actualizar_tutoria(&self, t: &Tutoria, estado_previo: EstadoTutoria) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let n = conn.execute(
            "UPDATE tutorias SET estado = ?1, tutor = ?2, actualizado_en = ?3 WHERE id = ?4 AND estado = ?5",
            params![t.estado.as_str(), t.tutor, t.actualizado_en.to_rfc3339(), t.id, estado_previo.as_str()],
        )?;
        if n == 0 {
            return Err(tutoria_cambiada(t.id, estado_previo));
        }
        Ok(())
    }

    fn listar_tutorias(&self, estado: Option<EstadoTutoria>) -> Result<Vec<Tutoria>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, estudiante, curso, mensaje, estado, tutor, creado_en, actualizado_en
             FROM tutorias
             WHERE (?1 IS NULL OR estado = ?1)
             ORDER BY id DESC",
        )?;
        let rows = stmt.query_map(params![estado.map(EstadoTutoria::as_str)], leer_fila_tutoria)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(tutoria_desde_fila(r?)?);
        }
        Ok(out)
    }

    fn crear_recurso(&self, nuevo: &NuevoRecurso, ahora: DateTime<Utc>) -> Result<Recurso, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO recursos (titulo, curso, url, descripcion, creado_en) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![nuevo.titulo, nuevo.curso, nuevo.url, nuevo.descripcion, ahora.to_rfc3339()],
        )?;
        Ok(Recurso {
            id: conn.last_insert_rowid(),
            titulo: nuevo.titulo.clone(),
            curso: nuevo.curso.clone(),
            url: nuevo.url.clone(),
            descripcion: nuevo.descripcion.clone(),
            creado_en: ahora,
        })
    }

    fn listar_recursos(&self, curso: Option<&str>) -> Result<Vec<Recurso>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, titulo, curso, url, descripcion, creado_en
             FROM recursos
             WHERE (?1 IS NULL OR lower(curso) = lower(?1))
             ORDER BY titulo ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![curso], leer_fila_recurso)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(recurso_desde_fila(r?)?);
        }
        Ok(out)
    }
}
