use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    io::{self, Write},
};

/// Par clave/valor emitido por una función map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/* =========================
   Particionado por hash
   ========================= */

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// FNV-1a de 32 bits sin el bit de signo. Tiene que ser estable entre
/// procesos y builds distintos: todos los workers deben mandar una clave
/// a la misma partición.
pub fn ihash(key: &str) -> u32 {
    let mut h = FNV_OFFSET;
    for b in key.as_bytes() {
        h ^= u32::from(*b);
        h = h.wrapping_mul(FNV_PRIME);
    }
    h & 0x7fff_ffff
}

pub fn hash_key_to_partition(key: &str, num_partitions: u32) -> u32 {
    ihash(key) % num_partitions.max(1)
}

/// Reparte los pares en `num_partitions` buckets según hash(key).
/// Siempre devuelve exactamente `num_partitions` buckets (pueden ir vacíos).
pub fn partition_pairs(pairs: Vec<KeyValue>, num_partitions: u32) -> Vec<Vec<KeyValue>> {
    let n = num_partitions.max(1);
    let mut buckets: Vec<Vec<KeyValue>> = (0..n).map(|_| Vec::new()).collect();

    for kv in pairs.into_iter() {
        let pid = hash_key_to_partition(&kv.key, n) as usize;
        buckets[pid].push(kv);
    }

    buckets
}

/* =========================
   Ubicaciones en disco
   ========================= */

/// Intermedio de (map, partición). Lleva el intento en el nombre para que un
/// straggler nunca pise lo que escribió su reemplazo.
pub fn intermediate_location(work_dir: &str, map_index: u32, partition: u32, attempt_id: u64) -> String {
    format!(
        "{}/intermediate/mr-{}-{}-a{}.jsonl",
        work_dir.trim_end_matches('/'),
        map_index,
        partition,
        attempt_id
    )
}

/// Salida final de una partición reduce.
pub fn output_location(work_dir: &str, partition: u32) -> String {
    format!("{}/output/mr-out-{}.csv", work_dir.trim_end_matches('/'), partition)
}

/* =========================
   Intermedios: JSONL {key, value}
   ========================= */

pub fn encode_partition(pairs: &[KeyValue]) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    for kv in pairs {
        serde_json::to_writer(&mut out, kv)?;
        out.write_all(b"\n")?;
    }
    Ok(out)
}

pub fn decode_partition(bytes: &[u8]) -> io::Result<Vec<KeyValue>> {
    let mut out = Vec::new();
    for line in bytes.split(|b| *b == b'\n') {
        if line.iter().all(|b| b.is_ascii_whitespace()) {
            continue;
        }
        let kv: KeyValue = serde_json::from_slice(line)?;
        out.push(kv);
    }
    Ok(out)
}

/// Agrupa valores por clave. BTreeMap => las claves salen ordenadas.
pub fn group_by_key<I>(pairs: I) -> BTreeMap<String, Vec<String>>
where
    I: IntoIterator<Item = KeyValue>,
{
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for kv in pairs {
        groups.entry(kv.key).or_default().push(kv.value);
    }
    groups
}

/* =========================
   Salida final: CSV "clave,valor" sin encabezado
   ========================= */

pub fn encode_output(rows: &[(String, String)]) -> io::Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    for (key, value) in rows {
        writer.write_record([key.as_str(), value.as_str()])?;
    }

    writer.into_inner().map_err(|e| e.into_error())
}

pub fn decode_output(bytes: &[u8]) -> io::Result<Vec<(String, String)>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(bytes);

    let mut out = Vec::new();
    for rec in reader.records() {
        let rec = rec?;
        let key = rec.get(0).unwrap_or_default().to_string();
        let value = rec.get(1).unwrap_or_default().to_string();
        out.push((key, value));
    }
    Ok(out)
}
