use std::io::Write;

use rendimiento::malla::*;

#[test]
fn catalogo_integrado_tiene_tres_mallas() {
    let catalogo = CatalogoMallas::integrado();
    assert_eq!(catalogo.ids(), vec!["industrial", "sistemas", "software"]);

    let sistemas = catalogo.obtener("sistemas").unwrap();
    assert_eq!(sistemas.cursos().len(), 7);
    assert_eq!(sistemas.creditos_posibles(), 22);
    assert_eq!(sistemas.cursos()[0].clave, "integral");
    assert_eq!(sistemas.curso("integral").map(|c| c.creditos), Some(5));

    assert_eq!(catalogo.obtener("industrial").unwrap().creditos_posibles(), 21);
    assert_eq!(catalogo.obtener("software").unwrap().creditos_posibles(), 21);
}

#[test]
fn busqueda_sin_distinguir_mayusculas() {
    let catalogo = CatalogoMallas::integrado();
    assert!(catalogo.obtener("  SISTEMAS ").is_ok());
    assert!(catalogo.contiene("Software"));
}

#[test]
fn malla_desconocida_sugiere_la_mas_parecida() {
    let catalogo = CatalogoMallas::integrado();
    let err = catalogo.obtener("sistema").unwrap_err();
    assert_eq!(err.id, "sistema");
    assert_eq!(err.sugerencia.as_deref(), Some("sistemas"));
    assert!(err.to_string().contains("sistemas"));

    let err = catalogo.obtener("medicina").unwrap_err();
    assert_eq!(err.sugerencia, None);
    assert_eq!(err.to_string(), "malla desconocida 'medicina'");
}

#[test]
fn carga_desde_archivo_json() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(
        f,
        r#"{{"mallas": [
            {{"id": "Derecho", "nombre": "Derecho", "cursos": [
                {{"clave": "Civil", "creditos": 4}},
                {{"clave": "penal", "nombre": "Derecho Penal", "creditos": 3}}
            ]}}
        ]}}"#
    )
    .unwrap();

    let catalogo = CatalogoMallas::cargar(Some(f.path())).unwrap();
    assert_eq!(catalogo.len(), 1);
    let malla = catalogo.obtener("derecho").unwrap();
    assert_eq!(malla.creditos_posibles(), 7);
    assert_eq!(malla.curso("civil").map(|c| c.nombre.as_str()), Some("civil"));
    assert_eq!(malla.curso("penal").map(|c| c.nombre.as_str()), Some("Derecho Penal"));
}

#[test]
fn archivo_del_repositorio_coincide_con_el_integrado() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/mallas.json");
    let desde_archivo = CatalogoMallas::from_file(&path).unwrap();
    let integrado = CatalogoMallas::integrado();
    assert_eq!(desde_archivo.ids(), integrado.ids());
    for malla in integrado.iter() {
        let otra = desde_archivo.obtener(malla.id()).unwrap();
        assert_eq!(otra.creditos_posibles(), malla.creditos_posibles(), "malla {}", malla.id());
    }
}

#[test]
fn sin_ruta_usa_el_integrado() {
    let catalogo = CatalogoMallas::cargar(None).unwrap();
    assert_eq!(catalogo.len(), 3);
}

#[test]
fn rechaza_claves_repetidas() {
    let json = r#"{"mallas": [{"id": "a", "cursos": [
        {"clave": "x", "creditos": 2}, {"clave": " X ", "creditos": 3}
    ]}]}"#;
    let err = CatalogoMallas::from_json(json).unwrap_err();
    assert!(matches!(err, MallaError::ClaveDuplicada { ref clave, .. } if clave == "x"));
}

#[test]
fn rechaza_creditos_no_positivos() {
    for creditos in [0, -2] {
        let json = format!(r#"{{"mallas": [{{"id": "a", "cursos": [{{"clave": "x", "creditos": {}}}]}}]}}"#, creditos);
        let err = CatalogoMallas::from_json(&json).unwrap_err();
        assert!(matches!(err, MallaError::CreditosInvalidos { creditos: c, .. } if c == creditos));
    }
}

#[test]
fn rechaza_mallas_vacias_o_repetidas() {
    let vacia = r#"{"mallas": [{"id": "a", "cursos": []}]}"#;
    assert!(matches!(CatalogoMallas::from_json(vacia), Err(MallaError::SinCursos(_))));

    let repetida = r#"{"mallas": [
        {"id": "a", "cursos": [{"clave": "x", "creditos": 1}]},
        {"id": "A", "cursos": [{"clave": "y", "creditos": 1}]}
    ]}"#;
    assert!(matches!(CatalogoMallas::from_json(repetida), Err(MallaError::MallaDuplicada(_))));

    assert!(matches!(CatalogoMallas::from_json("no es json"), Err(MallaError::Formato(_))));
}

#[test]
fn archivo_inexistente() {
    let err = CatalogoMallas::from_file("/no/existe/mallas.json").unwrap_err();
    assert!(matches!(err, MallaError::Lectura { .. }));
}
