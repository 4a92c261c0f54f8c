use serde::{Deserialize, Serialize};
use std::fmt;

use crate::job::JobId;

/// Fase a la que pertenece una tarea.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Map,
    Reduce,
}

/// Identificador de una tarea dentro del job: fase + índice.
/// Para reduce el índice coincide con la partición.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId {
    pub phase: Phase,
    pub index: u32,
}

impl TaskId {
    pub fn map(index: u32) -> Self {
        Self {
            phase: Phase::Map,
            index,
        }
    }

    pub fn reduce(index: u32) -> Self {
        Self {
            phase: Phase::Reduce,
            index,
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.phase {
            Phase::Map => write!(f, "map-{}", self.index),
            Phase::Reduce => write!(f, "reduce-{}", self.index),
        }
    }
}

/// Tarea map tal como viaja al worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapAssignment {
    pub job_id: JobId,
    pub map_index: u32,
    pub attempt_id: u64,
    /// Shard de entrada que procesa esta tarea
    pub input_file: String,
    /// Número de particiones reduce (fijo para todo el job)
    pub reduce_count: u32,
    /// Directorio de trabajo del job (intermedios + salida)
    pub work_dir: String,
}

impl MapAssignment {
    pub fn task_id(&self) -> TaskId {
        TaskId::map(self.map_index)
    }
}

/// Tarea reduce tal como viaja al worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReduceAssignment {
    pub job_id: JobId,
    pub partition_id: u32,
    pub attempt_id: u64,
    /// Una ubicación intermedia por cada tarea map, en orden de map
    pub map_output_locations: Vec<String>,
    pub work_dir: String,
}

impl ReduceAssignment {
    pub fn task_id(&self) -> TaskId {
        TaskId::reduce(self.partition_id)
    }
}

/// Respuesta de AssignTask. El tag se serializa explícitamente en "type".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskDescriptor {
    Map(MapAssignment),
    Reduce(ReduceAssignment),
    /// No hay tareas libres todavía: volver a preguntar más tarde
    Wait,
    /// El job terminó: el worker debe salir de su loop
    JobFinished,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_id_se_muestra_con_fase_e_indice() {
        assert_eq!(TaskId::map(3).to_string(), "map-3");
        assert_eq!(TaskId::reduce(0).to_string(), "reduce-0");
    }

    #[test]
    fn descriptor_lleva_el_tag_en_el_json() {
        let wait = serde_json::to_value(TaskDescriptor::Wait).unwrap();
        assert_eq!(wait, json!({"type": "WAIT"}));

        let finished = serde_json::to_value(TaskDescriptor::JobFinished).unwrap();
        assert_eq!(finished, json!({"type": "JOB_FINISHED"}));

        let map = TaskDescriptor::Map(MapAssignment {
            job_id: "j1".to_string(),
            map_index: 1,
            attempt_id: 2,
            input_file: "a.txt".to_string(),
            reduce_count: 4,
            work_dir: "/tmp/j1".to_string(),
        });
        let v = serde_json::to_value(&map).unwrap();
        assert_eq!(v["type"], json!("MAP"));
        assert_eq!(v["input_file"], json!("a.txt"));
        assert_eq!(v["attempt_id"], json!(2));

        let back: TaskDescriptor = serde_json::from_value(v).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn descriptor_desconocido_no_se_acepta() {
        let res: Result<TaskDescriptor, _> = serde_json::from_value(json!({"type": "SHUFFLE"}));
        assert!(res.is_err());
    }
}
