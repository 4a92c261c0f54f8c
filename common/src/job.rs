use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

pub type JobId = String;

fn default_reduce_count() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    pub name: String,

    /// Archivos de entrada explícitos (un map por archivo, en este orden)
    #[serde(default)]
    pub input_files: Vec<String>,

    /// Patrón de archivos de entrada, ej: "/data/input/*.txt".
    /// Los matches se agregan después de `input_files`, ordenados.
    #[serde(default)]
    pub input_glob: Option<String>,

    /// Número de particiones reduce
    #[serde(default = "default_reduce_count")]
    pub reduce_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Accepted,
    Mapping,
    Reducing,
    Succeeded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    pub id: JobId,
    pub name: String,
    pub status: JobStatus,

    pub reduce_count: u32,
    pub input_files: Vec<String>,
    /// Directorio de trabajo concreto del job
    pub work_dir: String,

    /// -------- Métricas del job --------
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub map_total: u32,
    pub map_completed: u32,
    pub reduce_total: u32,
    pub reduce_completed: u32,
    /// Tareas devueltas a Idle por timeout
    pub reassignments: u32,
}

impl JobInfo {
    pub fn progress_pct(&self) -> f64 {
        let total = self.map_total + self.reduce_total;
        if total == 0 {
            return 100.0;
        }
        let done = self.map_completed + self.reduce_completed;
        (done as f64 / total as f64) * 100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoneResponse {
    pub done: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn job_request_usa_defaults() {
        let req: JobRequest = serde_json::from_value(json!({"name": "wc"})).unwrap();
        assert!(req.input_files.is_empty());
        assert!(req.input_glob.is_none());
        assert_eq!(req.reduce_count, 10);
    }
}
