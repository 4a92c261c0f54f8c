use std::sync::Arc;

use crate::engine::KeyValue;
use crate::indexer::Indexer;
use crate::wordcount::WordCount;

/// Funciones map/reduce del usuario. Tienen que ser puras: una misma entrada
/// puede procesarse varias veces (reintentos, stragglers).
pub trait MapReduceApp: Send + Sync {
    fn name(&self) -> &'static str;

    /// (archivo, contenido) -> pares clave/valor
    fn map(&self, filename: &str, contents: &str) -> Vec<KeyValue>;

    /// (clave, todos sus valores) -> un único valor de salida
    fn reduce(&self, key: &str, values: &[String]) -> String;
}

pub const APP_NAMES: &[&str] = &["wordcount", "indexer"];

/// Busca una app empaquetada por nombre.
pub fn app_by_name(name: &str) -> Option<Arc<dyn MapReduceApp>> {
    match name.trim().to_ascii_lowercase().as_str() {
        "wordcount" | "wc" => Some(Arc::new(WordCount)),
        "indexer" => Some(Arc::new(Indexer)),
        _ => None,
    }
}

/// Normaliza un token: solo alfanumérico y '_', en minúscula.
pub(crate) fn normalize_token(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_by_name_resuelve_las_apps_empaquetadas() {
        for name in APP_NAMES {
            let app = app_by_name(name).unwrap();
            assert_eq!(app.name(), *name);
        }
        assert_eq!(app_by_name(" WC ").unwrap().name(), "wordcount");
        assert!(app_by_name("grep").is_none());
    }

    #[test]
    fn normalize_token_limpia_signos() {
        assert_eq!(normalize_token("Hola,"), "hola");
        assert_eq!(normalize_token("mundo_prueba!!"), "mundo_prueba");
        assert_eq!(normalize_token("--"), "");
    }
}
