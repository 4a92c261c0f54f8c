use serde::{Deserialize, Serialize};

use crate::job::JobId;
use crate::task::TaskId;

pub type WorkerId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignTaskRequest {
    pub worker_id: WorkerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteTaskRequest {
    pub job_id: JobId,
    pub worker_id: WorkerId,
    pub task_id: TaskId,
    pub attempt_id: u64,
    /// map: una ubicación por partición (índice = partición); reduce: la salida final
    pub output_locations: Vec<String>,
}

/// Ack de CompleteTask. `accepted = false` cuando el reporte era de un intento
/// obsoleto, duplicado o de otro job; el worker igual recibe respuesta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteTaskResponse {
    pub accepted: bool,
}
