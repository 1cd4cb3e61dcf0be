use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use rendimiento::ranking::NuevaEntradaRanking;
use rendimiento::recursos::NuevoRecurso;
use rendimiento::riesgo::{EvaluacionRiesgo, NivelRiesgo};
use rendimiento::store::{open_store, MemoryStore, SqliteStore, Store, StoreError};
use rendimiento::tutorias::{CambioTutoria, EstadoTutoria, NuevaTutoria};
use rendimiento::usuarios::{NuevoUsuario, Rol};

fn entrada(nombre: &str, malla: &str, ponderado: f64) -> NuevaEntradaRanking {
    let mut notas = BTreeMap::new();
    notas.insert("integral".to_string(), 16.0);
    notas.insert("algoritmia".to_string(), -1.0);
    NuevaEntradaRanking {
        nombre: nombre.to_string(),
        malla: malla.to_string(),
        notas,
        ponderado,
        creditos_totales: 19,
        creado_en: Utc::now(),
    }
}

fn ranking_ordena_filtra_y_limita(store: &dyn Store) {
    let a = store.agregar_ranking(&entrada("Ana", "sistemas", 14.3684)).unwrap();
    let b = store.agregar_ranking(&entrada("Beto", "sistemas", 16.0)).unwrap();
    let c = store.agregar_ranking(&entrada("Carla", "software", 14.3684)).unwrap();
    let d = store.agregar_ranking(&entrada("Dani", "industrial", 9.5)).unwrap();
    assert!(a.id < b.id && b.id < c.id && c.id < d.id);

    let general = store.consultar_ranking(None, 50).unwrap();
    let nombres: Vec<&str> = general.iter().map(|e| e.nombre.as_str()).collect();
    // empate entre Ana y Carla: primero la más antigua
    assert_eq!(nombres, vec!["Beto", "Ana", "Carla", "Dani"]);
    assert_eq!(general[1].notas.get("algoritmia"), Some(&-1.0));
    assert_eq!(general[1].creditos_totales, 19);

    let sistemas = store.consultar_ranking(Some("sistemas"), 50).unwrap();
    assert_eq!(sistemas.len(), 2);
    assert!(sistemas.iter().all(|e| e.malla == "sistemas"));

    let top1 = store.consultar_ranking(None, 1).unwrap();
    assert_eq!(top1.len(), 1);
    assert_eq!(top1[0].id, b.id);

    assert!(store.consultar_ranking(Some("derecho"), 50).unwrap().is_empty());
}

fn riesgo_es_upsert(store: &dyn Store) {
    let t0 = Utc::now();
    let primera = EvaluacionRiesgo::evaluar("s1", 8.0, t0).unwrap();
    store.upsert_riesgo(&primera).unwrap();
    let segunda = EvaluacionRiesgo::evaluar("s1", 2.0, t0 + Duration::seconds(5)).unwrap();
    store.upsert_riesgo(&segunda).unwrap();
    store.upsert_riesgo(&segunda).unwrap();
    store.upsert_riesgo(&EvaluacionRiesgo::evaluar("s2", 5.5, t0).unwrap()).unwrap();

    let leida = store.obtener_riesgo("s1").unwrap().unwrap();
    assert_eq!(leida.puntaje, 2.0);
    assert_eq!(leida.nivel, NivelRiesgo::Bajo);
    assert_eq!(leida.evaluado_en.timestamp(), segunda.evaluado_en.timestamp());

    let todas = store.listar_riesgos().unwrap();
    assert_eq!(todas.len(), 2);
    assert_eq!(todas[0].estudiante_id, "s2");
    assert_eq!(todas[0].nivel, NivelRiesgo::Alto);

    assert!(store.obtener_riesgo("nadie").unwrap().is_none());
}

fn usuarios_con_email_unico(store: &dyn Store) {
    let nuevo = NuevoUsuario {
        nombre: "Ana".into(),
        email: "ana@uni.edu".into(),
        password: "secreta".into(),
        rol: Rol::Tutor,
    };
    let u = store.crear_usuario(&nuevo).unwrap();
    assert_eq!(u.rol, Rol::Tutor);

    let err = store.crear_usuario(&nuevo).unwrap_err();
    assert!(matches!(err, StoreError::Duplicado(_)));

    let r = store.buscar_usuario("ana@uni.edu").unwrap().unwrap();
    assert_eq!(r.usuario, u);
    assert_eq!(r.password, "secreta");
    assert!(store.buscar_usuario("otro@uni.edu").unwrap().is_none());
}

fn tutorias_y_recursos(store: &dyn Store) {
    let ahora = Utc::now();
    let nueva = NuevaTutoria { estudiante: "s1".into(), curso: "algoritmia".into(), mensaje: "recursión".into() };
    let t1 = store.crear_tutoria(&nueva, ahora).unwrap();
    let t2 = store.crear_tutoria(&nueva, ahora).unwrap();
    assert_eq!(t1.estado, EstadoTutoria::Pendiente);

    let mut cambiada = store.obtener_tutoria(t1.id).unwrap().unwrap();
    cambiada
        .aplicar(&CambioTutoria { estado: "aceptada".into(), tutor: Some("Prof. Ramos".into()) }, ahora)
        .unwrap();
    store.actualizar_tutoria(&cambiada, EstadoTutoria::Pendiente).unwrap();

    let leida = store.obtener_tutoria(t1.id).unwrap().unwrap();
    assert_eq!(leida.estado, EstadoTutoria::Aceptada);
    assert_eq!(leida.tutor.as_deref(), Some("Prof. Ramos"));

    let todas = store.listar_tutorias(None).unwrap();
    assert_eq!(todas.iter().map(|t| t.id).collect::<Vec<_>>(), vec![t2.id, t1.id]);
    let pendientes = store.listar_tutorias(Some(EstadoTutoria::Pendiente)).unwrap();
    assert_eq!(pendientes.len(), 1);
    assert_eq!(pendientes[0].id, t2.id);
    assert!(store.obtener_tutoria(9999).unwrap().is_none());

    let recurso = |titulo: &str, curso: &str| NuevoRecurso {
        titulo: titulo.into(),
        curso: curso.into(),
        url: "https://example.org/a.pdf".into(),
        descripcion: None,
    };
    store.crear_recurso(&recurso("Grafos", "Algoritmia"), ahora).unwrap();
    store.crear_recurso(&recurso("Árboles", "algoritmia"), ahora).unwrap();
    store.crear_recurso(&recurso("Integrales", "integral"), ahora).unwrap();

    assert_eq!(store.listar_recursos(None).unwrap().len(), 3);
    let algo = store.listar_recursos(Some("ALGORITMIA")).unwrap();
    assert_eq!(algo.len(), 2);
    assert_eq!(algo[0].titulo, "Grafos");
}

fn cambios_simultaneos_de_tutoria(store: &dyn Store) {
    let ahora = Utc::now();
    let nueva = NuevaTutoria { estudiante: "s9".into(), curso: "lineal".into(), mensaje: String::new() };
    let id = store.crear_tutoria(&nueva, ahora).unwrap().id;

    // dos clientes leen la misma tutoría pendiente
    let mut a = store.obtener_tutoria(id).unwrap().unwrap();
    let mut b = store.obtener_tutoria(id).unwrap().unwrap();
    a.aplicar(&CambioTutoria { estado: "aceptada".into(), tutor: Some("Prof. Ramos".into()) }, ahora).unwrap();
    b.aplicar(&CambioTutoria { estado: "cancelada".into(), tutor: None }, ahora).unwrap();

    store.actualizar_tutoria(&a, EstadoTutoria::Pendiente).unwrap();
    let err = store.actualizar_tutoria(&b, EstadoTutoria::Pendiente).unwrap_err();
    assert!(matches!(err, StoreError::Conflicto(_)));

    let final_ = store.obtener_tutoria(id).unwrap().unwrap();
    assert_eq!(final_.estado, EstadoTutoria::Aceptada);
    assert_eq!(final_.tutor.as_deref(), Some("Prof. Ramos"));
}

fn suite(store: &dyn Store) {
    ranking_ordena_filtra_y_limita(store);
    riesgo_es_upsert(store);
    usuarios_con_email_unico(store);
    tutorias_y_recursos(store);
    cambios_simultaneos_de_tutoria(store);
}

#[test]
fn memory_store() {
    suite(&MemoryStore::new());
}

#[test]
fn sqlite_en_memoria() {
    suite(&SqliteStore::open_in_memory().unwrap());
}

#[test]
fn sqlite_en_archivo_persiste_entre_aperturas() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sub").join("rendimiento.db");
    let url = format!("sqlite://{}", path.display());
    {
        let store = open_store(&url).unwrap();
        store.agregar_ranking(&entrada("Ana", "sistemas", 15.0)).unwrap();
        store.upsert_riesgo(&EvaluacionRiesgo::evaluar("s1", 7.0, Utc::now()).unwrap()).unwrap();
    }
    let store = open_store(&url).unwrap();
    assert_eq!(store.consultar_ranking(None, 10).unwrap().len(), 1);
    assert_eq!(store.obtener_riesgo("s1").unwrap().unwrap().nivel, NivelRiesgo::Critico);
}

#[test]
fn open_store_por_esquema() {
    assert!(open_store("memory://").is_ok());
    assert!(matches!(open_store("mysql://localhost/db"), Err(StoreError::Esquema(_))));
}
