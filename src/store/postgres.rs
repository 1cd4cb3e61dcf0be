use chrono::{DateTime, Utc};
use postgres::error::SqlState;
use postgres::{Client, NoTls, Row};

use super::{creditos_desde_db, parse_enum, parse_notas, parse_ts, tutoria_cambiada, Store, StoreError, ESQUEMA_POSTGRES};
use crate::ranking::{EntradaRanking, NuevaEntradaRanking};
use crate::recursos::{NuevoRecurso, Recurso};
use crate::riesgo::EvaluacionRiesgo;
use crate::tutorias::{EstadoTutoria, NuevaTutoria, Tutoria};
use crate::usuarios::{NuevoUsuario, Usuario, UsuarioConClave};

/// Backend Postgres. Sólo guarda la URL; cada operación abre su propio
/// cliente en un hilo dedicado para no arrancar el runtime del cliente
/// síncrono dentro del runtime de actix.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    url: String,
}

impl PostgresStore {
    /// Crea las tablas si no existen.
    pub fn connect(url: &str) -> Result<Self, StoreError> {
        let store = PostgresStore { url: url.to_string() };
        store.con_cliente(|client| {
            client.batch_execute(ESQUEMA_POSTGRES)?;
            Ok(())
        })?;
        Ok(store)
    }

    fn con_cliente<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Client) -> Result<T, StoreError> + Send + 'static,
    {
        let url = self.url.clone();
        let handle = std::thread::spawn(move || -> Result<T, StoreError> {
            let mut client = Client::connect(&url, NoTls)?;
            f(&mut client)
        });
        match handle.join() {
            Ok(res) => res,
            Err(e) => Err(StoreError::Hilo(format!("{:?}", e))),
        }
    }
}

fn entrada_desde_fila(r: &Row) -> Result<EntradaRanking, StoreError> {
    Ok(EntradaRanking {
        id: r.try_get(0)?,
        nombre: r.try_get(1)?,
        malla: r.try_get(2)?,
        notas: parse_notas(r.try_get::<_, &str>(3)?)?,
        ponderado: r.try_get(4)?,
        creditos_totales: creditos_desde_db(r.try_get(5)?)?,
        creado_en: parse_ts(r.try_get::<_, &str>(6)?)?,
    })
}

fn riesgo_desde_fila(r: &Row) -> Result<EvaluacionRiesgo, StoreError> {
    Ok(EvaluacionRiesgo {
        estudiante_id: r.try_get(0)?,
        puntaje: r.try_get(1)?,
        nivel: parse_enum(r.try_get::<_, &str>(2)?)?,
        evaluado_en: parse_ts(r.try_get::<_, &str>(3)?)?,
    })
}

fn tutoria_desde_fila(r: &Row) -> Result<Tutoria, StoreError> {
    Ok(Tutoria {
        id: r.try_get(0)?,
        estudiante: r.try_get(1)?,
        curso: r.try_get(2)?,
        mensaje: r.try_get(3)?,
        estado: parse_enum(r.try_get::<_, &str>(4)?)?,
        tutor: r.try_get(5)?,
        creado_en: parse_ts(r.try_get::<_, &str>(6)?)?,
        actualizado_en: parse_ts(r.try_get::<_, &str>(7)?)?,
    })
}

fn recurso_desde_fila(r: &Row) -> Result<Recurso, StoreError> {
    Ok(Recurso {
        id: r.try_get(0)?,
        titulo: r.try_get(1)?,
        curso: r.try_get(2)?,
        url: r.try_get(3)?,
        descripcion: r.try_get(4)?,
        creado_en: parse_ts(r.try_get::<_, &str>(5)?)?,
    })
}

impl Store for PostgresStore {
    fn agregar_ranking(&self, entrada: &NuevaEntradaRanking) -> Result<EntradaRanking, StoreError> {
        let nueva = entrada.clone();
        let notas_json = serde_json::to_string(&nueva.notas)?;
        self.con_cliente(move |client| {
            let row = client.query_one(
                "INSERT INTO ranking (nombre, malla, notas_json, ponderado, creditos_totales, creado_en)
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
                &[
                    &nueva.nombre,
                    &nueva.malla,
                    &notas_json,
                    &nueva.ponderado,
                    &i64::from(nueva.creditos_totales),
                    &nueva.creado_en.to_rfc3339(),
                ],
            )?;
            Ok(EntradaRanking::from_nueva(row.try_get(0)?, &nueva))
        })
    }

    fn consultar_ranking(&self, malla: Option<&str>, limite: usize) -> Result<Vec<EntradaRanking>, StoreError> {
        let malla = malla.map(str::to_string);
        let limite = limite as i64;
        self.con_cliente(move |client| {
            let rows = client.query(
                "SELECT id, nombre, malla, notas_json, ponderado, creditos_totales, creado_en
                 FROM ranking
                 WHERE ($1::TEXT IS NULL OR malla = $1)
                 ORDER BY ponderado DESC, id ASC
                 LIMIT $2",
                &[&malla, &limite],
            )?;
            rows.iter().map(entrada_desde_fila).collect()
        })
    }

    fn upsert_riesgo(&self, ev: &EvaluacionRiesgo) -> Result<(), StoreError> {
        let ev = ev.clone();
        self.con_cliente(move |client| {
            client.execute(
                "INSERT INTO evaluaciones_riesgo (estudiante_id, puntaje, nivel, evaluado_en)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (estudiante_id) DO UPDATE SET
                    puntaje = EXCLUDED.puntaje,
                    nivel = EXCLUDED.nivel,
                    evaluado_en = EXCLUDED.evaluado_en",
                &[&ev.estudiante_id, &ev.puntaje, &ev.nivel.etiqueta(), &ev.evaluado_en.to_rfc3339()],
            )?;
            Ok(())
        })
    }

    fn obtener_riesgo(&self, estudiante_id: &str) -> Result<Option<EvaluacionRiesgo>, StoreError> {
        let id = estudiante_id.to_string();
        self.con_cliente(move |client| {
            let row = client.query_opt(
                "SELECT estudiante_id, puntaje, nivel, evaluado_en FROM evaluaciones_riesgo WHERE estudiante_id = $1",
                &[&id],
            )?;
            row.as_ref().map(riesgo_desde_fila).transpose()
        })
    }

    fn listar_riesgos(&self) -> Result<Vec<EvaluacionRiesgo>, StoreError> {
        self.con_cliente(|client| {
            let rows = client.query(
                "SELECT estudiante_id, puntaje, nivel, evaluado_en FROM evaluaciones_riesgo ORDER BY puntaje DESC, estudiante_id ASC",
                &[],
            )?;
            rows.iter().map(riesgo_desde_fila).collect()
        })
    }

    fn crear_usuario(&self, nuevo: &NuevoUsuario) -> Result<Usuario, StoreError> {
        let nuevo = nuevo.clone();
        self.con_cliente(move |client| {
            let res = client.query_one(
                "INSERT INTO usuarios (nombre, email, password, rol) VALUES ($1, $2, $3, $4) RETURNING id",
                &[&nuevo.nombre, &nuevo.email, &nuevo.password, &nuevo.rol.as_str()],
            );
            match res {
                Ok(row) => Ok(Usuario { id: row.try_get(0)?, nombre: nuevo.nombre, email: nuevo.email, rol: nuevo.rol }),
                Err(e) if e.code() == Some(&SqlState::UNIQUE_VIOLATION) => {
                    Err(StoreError::Duplicado(format!("el email {} ya está registrado", nuevo.email)))
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    fn buscar_usuario(&self, email: &str) -> Result<Option<UsuarioConClave>, StoreError> {
        let email = email.to_string();
        self.con_cliente(move |client| {
            let row = client.query_opt("SELECT id, nombre, email, password, rol FROM usuarios WHERE email = $1", &[&email])?;
            match row {
                Some(r) => Ok(Some(UsuarioConClave {
                    usuario: Usuario {
                        id: r.try_get(0)?,
                        nombre: r.try_get(1)?,
                        email: r.try_get(2)?,
                        rol: parse_enum(r.try_get::<_, &str>(4)?)?,
                    },
                    password: r.try_get(3)?,
                })),
                None => Ok(None),
            }
        })
    }

    fn crear_tutoria(&self, nueva: &NuevaTutoria, ahora: DateTime<Utc>) -> Result<Tutoria, StoreError> {
        let nueva = nueva.clone();
        self.con_cliente(move |client| {
            let ts = ahora.to_rfc3339();
            let row = client.query_one(
                "INSERT INTO tutorias (estudiante, curso, mensaje, estado, tutor, creado_en, actualizado_en)
                 VALUES ($1, $2, $3, $4, NULL, $5, $5) RETURNING id",
                &[&nueva.estudiante, &nueva.curso, &nueva.mensaje, &EstadoTutoria::Pendiente.as_str(), &ts],
            )?;
            Ok(Tutoria {
                id: row.try_get(0)?,
                estudiante: nueva.estudiante,
                curso: nueva.curso,
                mensaje: nueva.mensaje,
                estado: EstadoTutoria::Pendiente,
                tutor: None,
                creado_en: ahora,
                actualizado_en: ahora,
            })
        })
    }

    fn obtener_tutoria(&self, id: i64) -> Result<Option<Tutoria>, StoreError> {
        self.con_cliente(move |client| {
            let row = client.query_opt(
                "SELECT id, estudiante, curso, mensaje, estado, tutor, creado_en, actualizado_en FROM tutorias WHERE id = $1",
                &[&id],
            )?;
            row.as_ref().map(tutoria_desde_fila).transpose()
        })
    }

    fn actualizar_tutoria(&self, t: &Tutoria, estado_previo: EstadoTutoria) -> Result<(), StoreError> {
        let t = t.clone();
        self.con_cliente(move |client| {
            let n = client.execute(
                "UPDATE tutorias SET estado = $1, tutor = $2, actualizado_en = $3 WHERE id = $4 AND estado = $5",
                &[&t.estado.as_str(), &t.tutor, &t.actualizado_en.to_rfc3339(), &t.id, &estado_previo.as_str()],
            )?;
            if n == 0 {
                return Err(tutoria_cambiada(t.id, estado_previo));
            }
            Ok(())
        })
    }

    fn listar_tutorias(&self, estado: Option<EstadoTutoria>) -> Result<Vec<Tutoria>, StoreError> {
        let estado = estado.map(|e| e.as_str().to_string());
        self.con_cliente(move |client| {
            let rows = client.query(
                "SELECT id, estudiante, curso, mensaje, estado, tutor, creado_en, actualizado_en
                 FROM tutorias
                 WHERE ($1::TEXT IS NULL OR estado = $1)
                 ORDER BY id DESC",
                &[&estado],
            )?;
            rows.iter().map(tutoria_desde_fila).collect()
        })
    }

    fn crear_recurso(&self, nuevo: &NuevoRecurso, ahora: DateTime<Utc>) -> Result<Recurso, StoreError> {
        let nuevo = nuevo.clone();
        self.con_cliente(move |client| {
            let row = client.query_one(
                "INSERT INTO recursos (titulo, curso, url, descripcion, creado_en) VALUES ($1, $2, $3, $4, $5) RETURNING id",
                &[&nuevo.titulo, &nuevo.curso, &nuevo.url, &nuevo.descripcion, &ahora.to_rfc3339()],
            )?;
            Ok(Recurso {
                id: row.try_get(0)?,
                titulo: nuevo.titulo,
                curso: nuevo.curso,
                url: nuevo.url,
                descripcion: nuevo.descripcion,
                creado_en: ahora,
            })
        })
    }

    fn listar_recursos(&self, curso: Option<&str>) -> Result<Vec<Recurso>, StoreError> {
        let curso = curso.map(str::to_string);
        self.con_cliente(move |client| {
            let rows = client.query(
                "SELECT id, titulo, curso, url, descripcion, creado_en
                 FROM recursos
                 WHERE ($1::TEXT IS NULL OR lower(curso) = lower($1))
                 ORDER BY titulo ASC, id ASC",
                &[&curso],
            )?;
            rows.iter().map(recurso_desde_fila).collect()
        })
    }
}
