use thiserror::Error;

use crate::job::JobId;
use crate::task::TaskId;

/// Errores del lado del coordinador.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("request inválido: {0}")]
    InvalidRequest(String),

    #[error("el job {0} todavía está en curso")]
    JobInProgress(JobId),

    #[error("no hay ningún job activo")]
    NoJob,

    #[error("job desconocido: {0}")]
    UnknownJob(JobId),

    #[error("tarea desconocida: {0}")]
    UnknownTask(TaskId),

    #[error("reporte mal formado para {task}: {reason}")]
    MalformedCompletion { task: TaskId, reason: String },

    #[error("lock del job envenenado")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
