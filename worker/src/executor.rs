use mr_common::{engine, MapAssignment, MapReduceApp, ReduceAssignment, Storage};
use tracing::debug;

use crate::error::WorkerError;

/// Corre una tarea map: lee el shard, aplica `map`, particiona por hash y
/// escribe un intermedio por partición (aunque quede vacío). Devuelve las
/// ubicaciones en orden de partición.
pub fn execute_map(
    storage: &dyn Storage,
    app: &dyn MapReduceApp,
    task: &MapAssignment,
) -> Result<Vec<String>, WorkerError> {
    let task_name = task.task_id().to_string();

    let bytes = storage
        .read(&task.input_file)
        .map_err(|e| WorkerError::Application {
            task: task_name.clone(),
            reason: format!("no se pudo leer {}: {}", task.input_file, e),
        })?;
    let contents = String::from_utf8_lossy(&bytes);

    let pairs = app.map(&task.input_file, &contents);
    debug!("{}: {} pares emitidos por {}", task_name, pairs.len(), app.name());

    let buckets = engine::partition_pairs(pairs, task.reduce_count);
    let mut locations = Vec::with_capacity(buckets.len());

    for (pid, bucket) in buckets.iter().enumerate() {
        let location =
            engine::intermediate_location(&task.work_dir, task.map_index, pid as u32, task.attempt_id);
        let encoded = engine::encode_partition(bucket).map_err(|e| WorkerError::storage(&location, e))?;
        storage
            .write(&location, &encoded)
            .map_err(|e| WorkerError::storage(&location, e))?;
        locations.push(location);
    }

    Ok(locations)
}

/// Corre una tarea reduce: junta la partición de cada map, agrupa por clave
/// (ordenado) y escribe la salida final. Devuelve una única ubicación.
pub fn execute_reduce(
    storage: &dyn Storage,
    app: &dyn MapReduceApp,
    task: &ReduceAssignment,
) -> Result<Vec<String>, WorkerError> {
    let task_name = task.task_id().to_string();
    let mut pairs = Vec::new();

    for location in &task.map_output_locations {
        let bytes = storage
            .read(location)
            .map_err(|e| WorkerError::storage(location, e))?;
        let decoded = engine::decode_partition(&bytes).map_err(|e| WorkerError::Application {
            task: task_name.clone(),
            reason: format!("intermedio corrupto {}: {}", location, e),
        })?;
        pairs.extend(decoded);
    }

    let groups = engine::group_by_key(pairs);
    debug!("{}: {} claves distintas", task_name, groups.len());

    let rows: Vec<(String, String)> = groups
        .into_iter()
        .map(|(key, values)| {
            let value = app.reduce(&key, &values);
            (key, value)
        })
        .collect();

    let location = engine::output_location(&task.work_dir, task.partition_id);
    let encoded = engine::encode_output(&rows).map_err(|e| WorkerError::storage(&location, e))?;
    storage
        .write(&location, &encoded)
        .map_err(|e| WorkerError::storage(&location, e))?;

    Ok(vec![location])
}

#[cfg(test)]
mod tests {
    use super::*;
    use mr_common::{app_by_name, LocalStorage};
    use std::{fs, path::PathBuf};

    fn work_dir(sub: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("executor_tests").join(sub);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn map_task(dir: &PathBuf, index: u32, input: &str, r: u32) -> MapAssignment {
        MapAssignment {
            job_id: "job".to_string(),
            map_index: index,
            attempt_id: 1,
            input_file: input.to_string(),
            reduce_count: r,
            work_dir: dir.to_string_lossy().to_string(),
        }
    }

    #[test]
    fn map_escribe_una_particion_por_reduce() {
        let dir = work_dir("map_parts");
        let input = dir.join("in.txt");
        fs::write(&input, "a b a").unwrap();

        let storage = LocalStorage::new();
        let app = app_by_name("wordcount").unwrap();
        let task = map_task(&dir, 0, &input.to_string_lossy(), 4);

        let locations = execute_map(&storage, app.as_ref(), &task).unwrap();
        assert_eq!(locations.len(), 4);

        let mut total = 0;
        for (pid, loc) in locations.iter().enumerate() {
            assert!(loc.ends_with(&format!("mr-0-{}-a1.jsonl", pid)));
            let kvs = engine::decode_partition(&storage.read(loc).unwrap()).unwrap();
            for kv in &kvs {
                assert_eq!(engine::hash_key_to_partition(&kv.key, 4) as usize, pid);
            }
            total += kvs.len();
        }
        assert_eq!(total, 3);
    }

    #[test]
    fn map_con_input_faltante_es_error_de_aplicacion() {
        let dir = work_dir("map_missing");
        let storage = LocalStorage::new();
        let app = app_by_name("wordcount").unwrap();
        let task = map_task(&dir, 0, &dir.join("nope.txt").to_string_lossy(), 2);

        let err = execute_map(&storage, app.as_ref(), &task).unwrap_err();
        assert!(matches!(err, WorkerError::Application { .. }));
    }

    #[test]
    fn reduce_junta_todas_las_maps_y_ordena() {
        let dir = work_dir("reduce");
        let storage = LocalStorage::new();
        let app = app_by_name("wordcount").unwrap();

        let a = dir.join("a.txt");
        let b = dir.join("b.txt");
        fs::write(&a, "gato perro gato").unwrap();
        fs::write(&b, "perro ave").unwrap();

        let locs_a = execute_map(&storage, app.as_ref(), &map_task(&dir, 0, &a.to_string_lossy(), 1)).unwrap();
        let locs_b = execute_map(&storage, app.as_ref(), &map_task(&dir, 1, &b.to_string_lossy(), 1)).unwrap();

        let task = ReduceAssignment {
            job_id: "job".to_string(),
            partition_id: 0,
            attempt_id: 1,
            map_output_locations: vec![locs_a[0].clone(), locs_b[0].clone()],
            work_dir: dir.to_string_lossy().to_string(),
        };

        let out = execute_reduce(&storage, app.as_ref(), &task).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].ends_with("output/mr-out-0.csv"));

        let rows = engine::decode_output(&storage.read(&out[0]).unwrap()).unwrap();
        assert_eq!(
            rows,
            vec![
                ("ave".to_string(), "1".to_string()),
                ("gato".to_string(), "2".to_string()),
                ("perro".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn reduce_sin_intermedio_falla_por_storage() {
        let dir = work_dir("reduce_missing");
        let storage = LocalStorage::new();
        let app = app_by_name("wordcount").unwrap();
        let task = ReduceAssignment {
            job_id: "job".to_string(),
            partition_id: 0,
            attempt_id: 1,
            map_output_locations: vec![dir.join("falta.jsonl").to_string_lossy().to_string()],
            work_dir: dir.to_string_lossy().to_string(),
        };

        let err = execute_reduce(&storage, app.as_ref(), &task).unwrap_err();
        assert!(matches!(err, WorkerError::Storage { .. }));
    }
}
