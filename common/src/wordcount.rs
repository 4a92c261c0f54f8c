use crate::app::{normalize_token, MapReduceApp};
use crate::engine::KeyValue;

/// WordCount clásico: emite (palabra, "1") y suma en el reduce.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCount;

impl MapReduceApp for WordCount {
    fn name(&self) -> &'static str {
        "wordcount"
    }

    fn map(&self, _filename: &str, contents: &str) -> Vec<KeyValue> {
        contents
            .split_whitespace()
            .map(normalize_token)
            .filter(|t| !t.is_empty())
            .map(|t| KeyValue::new(t, "1"))
            .collect()
    }

    fn reduce(&self, _key: &str, values: &[String]) -> String {
        // valores no numéricos se ignoran
        let total: u64 = values.iter().filter_map(|v| v.trim().parse::<u64>().ok()).sum();
        total.to_string()
    }
}
