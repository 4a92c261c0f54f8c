use std::collections::BTreeSet;
use std::path::Path;

use crate::app::{normalize_token, MapReduceApp};
use crate::engine::KeyValue;

/// Índice invertido: palabra -> "N doc1,doc2,..." (documentos sin repetir, ordenados).
#[derive(Debug, Clone, Copy, Default)]
pub struct Indexer;

impl MapReduceApp for Indexer {
    fn name(&self) -> &'static str {
        "indexer"
    }

    fn map(&self, filename: &str, contents: &str) -> Vec<KeyValue> {
        let doc = Path::new(filename)
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);

        // una sola emisión por palabra y documento
        let words: BTreeSet<String> = contents
            .split_whitespace()
            .map(normalize_token)
            .filter(|t| !t.is_empty())
            .collect();

        words.into_iter().map(|w| KeyValue::new(w, doc)).collect()
    }

    fn reduce(&self, _key: &str, values: &[String]) -> String {
        let docs: BTreeSet<&str> = values.iter().map(|v| v.as_str()).collect();
        let list: Vec<&str> = docs.into_iter().collect();
        format!("{} {}", list.len(), list.join(","))
    }
}
