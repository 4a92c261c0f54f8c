use serde::{Deserialize, Serialize};

use crate::job::JobId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResults {
    pub job_id: JobId,
    /// Directorio de trabajo del job
    pub work_dir: String,
    /// Salidas finales aceptadas, una por partición reduce completada
    pub files: Vec<String>,
    pub complete: bool,
}
