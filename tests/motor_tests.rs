use std::sync::Arc;

use rendimiento::malla::CatalogoMallas;
use rendimiento::motor::Motor;
use rendimiento::ponderado::{MotivoCoercion, PoliticaCalculo, SolicitudCalculo, NOTA_RETIRO};
use rendimiento::store::{MemoryStore, Store};
use serde_json::json;

fn motor(store: Arc<dyn Store>) -> Motor {
    Motor::new(Arc::new(CatalogoMallas::integrado()), PoliticaCalculo::default(), 50, store)
}

#[test]
fn registrar_y_calcular_coinciden() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let m = motor(Arc::clone(&store));
    let body = json!({"nombre": "Ana", "malla": "sistemas", "notas": {
        "integral": 16, "lineal": "14", "algoritmia": -1, "etica": "x",
        "tcs": 10, "psico": 15, "biologia": 13, "quimica": 20
    }});
    let solicitud = SolicitudCalculo::desde_valor(body, m.catalogo()).unwrap();

    let simulado = m.calcular(&solicitud.malla, &solicitud.notas).unwrap();
    let (resultado, entrada) = m.registrar_calculo(&solicitud).unwrap();
    assert_eq!(resultado, simulado);

    // cada coerción aparece una sola vez
    let motivos: Vec<MotivoCoercion> = resultado.coerciones.iter().map(|c| c.motivo).collect();
    assert_eq!(motivos.len(), 2);
    assert!(motivos.contains(&MotivoCoercion::NoNumerico));
    assert!(motivos.contains(&MotivoCoercion::ClaveDesconocida));

    assert_eq!(entrada.ponderado, resultado.promedio);
    assert_eq!(entrada.notas.get("algoritmia"), Some(&NOTA_RETIRO));
    assert_eq!(entrada.notas.get("etica"), Some(&0.0));
    assert_eq!(entrada.notas.get("lineal"), Some(&14.0));
    assert!(!entrada.notas.contains_key("quimica"));

    let guardado = store.consultar_ranking(None, 10).unwrap();
    assert_eq!(guardado.len(), 1);
    assert_eq!(guardado[0].notas, entrada.notas);
}
