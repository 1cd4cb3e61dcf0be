use std::collections::HashMap;

use rendimiento::malla::CatalogoMallas;
use rendimiento::ponderado::*;
use serde_json::{json, Map, Value};

fn notas(v: Value) -> Map<String, Value> {
    v.as_object().cloned().expect("objeto de notas")
}

fn politica(redondeo: Redondeo) -> PoliticaCalculo {
    PoliticaCalculo { redondeo, clave_ausente: ClaveAusente::Cero }
}

fn notas_sistemas() -> Map<String, Value> {
    notas(json!({
        "integral": 16, "lineal": 14, "algoritmia": 12, "etica": 18,
        "tcs": 10, "psico": 15, "biologia": 13
    }))
}

#[test]
fn sistemas_cuatro_decimales() {
    let catalogo = CatalogoMallas::integrado();
    let malla = catalogo.obtener("sistemas").unwrap();
    let r = ponderar(malla, &notas_sistemas(), politica(Redondeo::CuatroDecimales));
    assert_eq!(r.creditos_totales, 22);
    assert_eq!(r.creditos_posibles, 22);
    assert_eq!(r.promedio, 14.0455);
    assert!(r.coerciones.is_empty());
    assert!(r.cursos_retirados.is_empty());
}

#[test]
fn sistemas_dos_decimales() {
    let catalogo = CatalogoMallas::integrado();
    let malla = catalogo.obtener("sistemas").unwrap();
    let r = ponderar(malla, &notas_sistemas(), politica(Redondeo::DosDecimales));
    assert_eq!(r.promedio, 14.05);
}

#[test]
fn retiro_excluye_numerador_y_creditos() {
    let catalogo = CatalogoMallas::integrado();
    let malla = catalogo.obtener("sistemas").unwrap();
    let mut n = notas_sistemas();
    n.insert("algoritmia".into(), json!(-1));
    let r = ponderar(malla, &n, politica(Redondeo::CuatroDecimales));
    assert_eq!(r.creditos_totales, 19);
    assert_eq!(r.creditos_posibles, 22);
    assert_eq!(r.promedio, 14.3684);
    assert_eq!(r.cursos_retirados, vec!["algoritmia".to_string()]);
}

#[test]
fn retiro_como_texto() {
    let catalogo = CatalogoMallas::integrado();
    let malla = catalogo.obtener("sistemas").unwrap();
    let mut n = notas_sistemas();
    n.insert("algoritmia".into(), json!("-1"));
    let r = ponderar(malla, &n, politica(Redondeo::CuatroDecimales));
    assert_eq!(r.creditos_totales, 19);
    assert_eq!(r.promedio, 14.3684);
}

#[test]
fn todos_retirados_da_cero_sin_dividir() {
    let catalogo = CatalogoMallas::integrado();
    for malla in catalogo.iter() {
        let mut n = Map::new();
        for c in malla.cursos() {
            n.insert(c.clave.clone(), json!(-1));
        }
        let r = ponderar(malla, &n, PoliticaCalculo::default());
        assert_eq!(r.promedio, 0.0, "malla {}", malla.id());
        assert_eq!(r.creditos_totales, 0);
        assert!(!r.promedio.is_nan());
        assert_eq!(r.cursos_retirados.len(), malla.cursos().len());
    }
}

#[test]
fn orden_de_las_notas_no_importa() {
    let catalogo = CatalogoMallas::integrado();
    let malla = catalogo.obtener("sistemas").unwrap();
    let pares = vec![
        ("integral", NotaNormalizada::Nota(16.0)),
        ("lineal", NotaNormalizada::Nota(14.0)),
        ("algoritmia", NotaNormalizada::Retiro),
        ("etica", NotaNormalizada::Nota(18.0)),
        ("tcs", NotaNormalizada::Nota(10.0)),
        ("psico", NotaNormalizada::Nota(15.0)),
        ("biologia", NotaNormalizada::Nota(13.0)),
    ];
    let directo: HashMap<String, NotaNormalizada> = pares.iter().map(|(k, v)| (k.to_string(), *v)).collect();
    let invertido: HashMap<String, NotaNormalizada> = pares.iter().rev().map(|(k, v)| (k.to_string(), *v)).collect();

    let a = calcular_ponderado(malla, &directo, PoliticaCalculo::default());
    let b = calcular_ponderado(malla, &invertido, PoliticaCalculo::default());
    assert_eq!(a, b);
    assert_eq!(a.promedio, 14.3684);
}

#[test]
fn valores_invalidos_se_reemplazan_por_cero_y_se_reportan() {
    let catalogo = CatalogoMallas::integrado();
    let malla = catalogo.obtener("sistemas").unwrap();
    let mut n = notas_sistemas();
    n.insert("etica".into(), json!("dieciocho"));
    n.insert("biologia".into(), json!(true));
    let r = ponderar(malla, &n, PoliticaCalculo::default());

    // 309 - 18*2 - 13*2 = 247 sobre 22 créditos
    assert_eq!(r.creditos_totales, 22);
    assert_eq!(r.promedio, 11.2273);
    assert_eq!(r.coerciones.len(), 2);
    assert_eq!(r.coerciones[0].curso, "biologia");
    assert_eq!(r.coerciones[0].motivo, MotivoCoercion::TipoInvalido);
    assert_eq!(r.coerciones[1].curso, "etica");
    assert_eq!(r.coerciones[1].motivo, MotivoCoercion::NoNumerico);
    assert_eq!(r.coerciones[1].valor_original, json!("dieciocho"));
}

#[test]
fn textos_numericos_se_aceptan() {
    let catalogo = CatalogoMallas::integrado();
    let malla = catalogo.obtener("sistemas").unwrap();
    let n = notas(json!({
        "integral": "16", "lineal": " 14 ", "algoritmia": "12,0", "etica": "18",
        "tcs": "10", "psico": "15", "biologia": "13"
    }));
    let r = ponderar(malla, &n, PoliticaCalculo::default());
    assert_eq!(r.promedio, 14.0455);
    assert!(r.coerciones.is_empty());
}

#[test]
fn clave_ausente_cuenta_como_cero_por_defecto() {
    let catalogo = CatalogoMallas::integrado();
    let malla = catalogo.obtener("sistemas").unwrap();
    let mut n = notas_sistemas();
    n.remove("algoritmia");
    let r = ponderar(malla, &n, PoliticaCalculo::default());
    // 273 / 22
    assert_eq!(r.creditos_totales, 22);
    assert_eq!(r.promedio, 12.4091);
    assert!(r.cursos_retirados.is_empty());
}

#[test]
fn clave_ausente_como_retiro() {
    let catalogo = CatalogoMallas::integrado();
    let malla = catalogo.obtener("sistemas").unwrap();
    let mut n = notas_sistemas();
    n.remove("algoritmia");
    let p = PoliticaCalculo { redondeo: Redondeo::CuatroDecimales, clave_ausente: ClaveAusente::Retiro };
    let r = ponderar(malla, &n, p);
    assert_eq!(r.creditos_totales, 19);
    assert_eq!(r.promedio, 14.3684);
}

#[test]
fn null_equivale_a_ausente() {
    let catalogo = CatalogoMallas::integrado();
    let malla = catalogo.obtener("sistemas").unwrap();
    let mut n = notas_sistemas();
    n.insert("algoritmia".into(), Value::Null);
    let r = ponderar(malla, &n, PoliticaCalculo::default());
    assert_eq!(r.promedio, 12.4091);
    assert!(r.coerciones.is_empty());
}

#[test]
fn cursos_fuera_de_la_malla_se_ignoran() {
    let catalogo = CatalogoMallas::integrado();
    let malla = catalogo.obtener("sistemas").unwrap();
    let mut n = notas_sistemas();
    n.insert("quimica".into(), json!(20));
    let r = ponderar(malla, &n, PoliticaCalculo::default());
    assert_eq!(r.promedio, 14.0455);
    assert_eq!(r.coerciones.len(), 1);
    assert_eq!(r.coerciones[0].motivo, MotivoCoercion::ClaveDesconocida);
}

#[test]
fn claves_sin_distinguir_mayusculas() {
    let catalogo = CatalogoMallas::integrado();
    let malla = catalogo.obtener("Sistemas").unwrap();
    let n = notas(json!({
        "Integral": 16, "LINEAL": 14, "algoritmia": 12, "etica": 18,
        "tcs": 10, "psico": 15, "biologia": 13
    }));
    let r = ponderar(malla, &n, PoliticaCalculo::default());
    assert_eq!(r.promedio, 14.0455);
}

#[test]
fn notas_para_registro_marcan_retiros() {
    let catalogo = CatalogoMallas::integrado();
    let malla = catalogo.obtener("sistemas").unwrap();
    let mut n = notas_sistemas();
    n.insert("algoritmia".into(), json!(-1));
    n.insert("etica".into(), json!("x"));
    let reg = notas_para_registro(malla, &normalizar_notas(malla, &n));
    assert_eq!(reg.get("algoritmia"), Some(&NOTA_RETIRO));
    assert_eq!(reg.get("etica"), Some(&0.0));
    assert_eq!(reg.get("integral"), Some(&16.0));
    assert_eq!(reg.len(), 7);
}

#[test]
fn solicitud_formato_actual() {
    let catalogo = CatalogoMallas::integrado();
    let body = json!({"nombre": " Ana ", "malla": "software", "notas": {"programacion": 15}});
    let s = SolicitudCalculo::desde_valor(body, &catalogo).unwrap();
    assert_eq!(s.nombre, "Ana");
    assert_eq!(s.malla, "software");
    assert_eq!(s.notas.get("programacion"), Some(&json!(15)));
}

#[test]
fn solicitud_formulario_legado() {
    let catalogo = CatalogoMallas::integrado();
    let body = json!({
        "nombre": "Luis", "n1": "16", "n2": "14", "n3": "12", "n4": "18", "n5": "10", "n6": "15", "n7": "13"
    });
    let s = SolicitudCalculo::desde_valor(body, &catalogo).unwrap();
    assert_eq!(s.malla, MALLA_FORMULARIO_LEGADO);
    assert_eq!(s.notas.get("integral"), Some(&json!("16")));
    assert_eq!(s.notas.get("biologia"), Some(&json!("13")));

    let malla = catalogo.obtener(&s.malla).unwrap();
    let r = ponderar(malla, &s.notas, politica(Redondeo::DosDecimales));
    assert_eq!(r.promedio, 14.05);
}

#[test]
fn solicitud_sin_nombre_o_sin_notas_es_invalida() {
    let catalogo = CatalogoMallas::integrado();
    assert!(SolicitudCalculo::desde_valor(json!({"malla": "sistemas", "notas": {}}), &catalogo).is_err());
    assert!(SolicitudCalculo::desde_valor(json!({"nombre": "Ana", "malla": "sistemas"}), &catalogo).is_err());
    assert!(SolicitudCalculo::desde_valor(json!({"nombre": "Ana", "notas": {}}), &catalogo).is_err());
    assert!(SolicitudCalculo::desde_valor(json!([1, 2]), &catalogo).is_err());
}

#[test]
fn curso_repetido_por_mayusculas_se_reporta() {
    let catalogo = CatalogoMallas::integrado();
    let malla = catalogo.obtener("sistemas").unwrap();
    let mut n = notas_sistemas();
    n.remove("integral");
    n.insert("Integral".into(), json!(20));
    n.insert("integral".into(), json!(-1));
    let r = ponderar(malla, &n, PoliticaCalculo::default());

    // "Integral" va antes que "integral" en el mapa: queda 20 y el retiro se ignora
    // (309 - 16*5 + 20*5) / 22 = 329 / 22
    assert_eq!(r.promedio, 14.9545);
    assert_eq!(r.creditos_totales, 22);
    assert!(r.cursos_retirados.is_empty());
    assert_eq!(r.coerciones.len(), 1);
    assert_eq!(r.coerciones[0].curso, "integral");
    assert_eq!(r.coerciones[0].motivo, MotivoCoercion::ClaveDuplicada);
    assert_eq!(r.coerciones[0].valor_original, json!(-1));
}
