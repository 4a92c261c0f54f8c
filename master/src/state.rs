// master/src/state.rs

use chrono::{DateTime, Utc};
use mr_common::{
    CompleteTaskRequest, CompleteTaskResponse, JobError, JobInfo, JobRequest, JobResults,
    JobStatus, LocalStorage, Storage, TaskDescriptor, TaskId,
};
use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
    time::Instant,
};
use tracing::{debug, info, warn};

use crate::config::MasterConfig;
use crate::ledger::{Completion, Ledger};

/// Job en curso: el ledger más su metadata. Todo vive detrás de un único lock
/// para que el gate map -> reduce se vea atómico.
#[derive(Debug)]
pub struct ActiveJob {
    pub id: String,
    pub name: String,
    pub work_dir: String,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub reassignments: u32,
    pub ledger: Ledger,
}

impl ActiveJob {
    fn info(&self) -> JobInfo {
        let l = &self.ledger;
        let status = if l.is_done() {
            JobStatus::Succeeded
        } else if self.started_at.is_none() {
            JobStatus::Accepted
        } else if l.map_remaining() > 0 {
            JobStatus::Mapping
        } else {
            JobStatus::Reducing
        };

        JobInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            status,
            reduce_count: l.reduce_count(),
            input_files: l.input_files(),
            work_dir: self.work_dir.clone(),
            submitted_at: self.submitted_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            map_total: l.map_total() as u32,
            map_completed: (l.map_total() - l.map_remaining()) as u32,
            reduce_total: l.reduce_total() as u32,
            reduce_completed: (l.reduce_total() - l.reduce_remaining()) as u32,
            reassignments: self.reassignments,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    // job actual (uno a la vez); None hasta el primer submit
    job: Arc<Mutex<Option<ActiveJob>>>,
    storage: Arc<dyn Storage>,
    pub config: Arc<MasterConfig>,
}

impl AppState {
    pub fn new(config: MasterConfig) -> Self {
        Self::with_storage(config, Arc::new(LocalStorage::new()))
    }

    pub fn with_storage(config: MasterConfig, storage: Arc<dyn Storage>) -> Self {
        Self {
            job: Arc::new(Mutex::new(None)),
            storage,
            config: Arc::new(config),
        }
    }

    fn lock_job(&self) -> Result<MutexGuard<'_, Option<ActiveJob>>, JobError> {
        self.job.lock().map_err(|_| JobError::LockPoisoned)
    }

    /// Crea el job con todas sus tareas de una vez. Falla si hay otro job sin terminar.
    pub fn submit_job(&self, req: JobRequest) -> Result<JobInfo, JobError> {
        // IO fuera del lock: expandir el glob y crear el directorio de trabajo
        let mut input_files = req.input_files;
        if let Some(pattern) = req.input_glob.as_deref() {
            for file in self.storage.list(pattern)? {
                if !input_files.contains(&file) {
                    input_files.push(file);
                }
            }
        }

        let ledger = Ledger::new(input_files, req.reduce_count)?;

        {
            let job = self.lock_job()?;
            if let Some(current) = job.as_ref() {
                if !current.ledger.is_done() {
                    return Err(JobError::JobInProgress(current.id.clone()));
                }
            }
        }

        let job_id = uuid::Uuid::new_v4().to_string();
        let work_dir = Path::new(&self.config.data_dir)
            .join(&job_id)
            .to_string_lossy()
            .to_string();
        std::fs::create_dir_all(&work_dir)?;

        let active = ActiveJob {
            id: job_id.clone(),
            name: req.name,
            work_dir,
            submitted_at: Utc::now(),
            started_at: None,
            finished_at: None,
            reassignments: 0,
            ledger,
        };

        self.commit_job(active)
    }

    /// Instala el job si sigue sin haber otro en curso. Si otro submit se coló
    /// mientras se creaba el directorio, el perdedor borra el suyo.
    fn commit_job(&self, active: ActiveJob) -> Result<JobInfo, JobError> {
        let mut job = self.lock_job()?;
        let conflict = job
            .as_ref()
            .filter(|current| !current.ledger.is_done())
            .map(|current| current.id.clone());

        if let Some(current_id) = conflict {
            drop(job);
            if let Err(e) = std::fs::remove_dir(&active.work_dir) {
                warn!("no se pudo borrar {}: {}", active.work_dir, e);
            }
            return Err(JobError::JobInProgress(current_id));
        }

        if let Some(done) = job.as_ref() {
            info!("descartando job terminado {}", done.id);
        }

        let info = active.info();
        info!(
            "job {} creado: {} map, {} reduce, work_dir={}",
            info.id, info.map_total, info.reduce_total, info.work_dir
        );
        *job = Some(active);
        Ok(info)
    }

    /// AssignTask: tarea idle -> descriptor; nada libre -> Wait; job terminado -> JobFinished.
    pub fn assign_task(&self, worker_id: &str, now: Instant) -> Result<TaskDescriptor, JobError> {
        let mut guard = self.lock_job()?;
        let Some(job) = guard.as_mut() else {
            debug!("worker {} pidió tarea pero no hay job", worker_id);
            return Ok(TaskDescriptor::Wait);
        };

        if job.ledger.is_done() {
            return Ok(TaskDescriptor::JobFinished);
        }

        // un loop corre una tarea a la vez: si vuelve a pedir con una en vuelo,
        // se perdió la respuesta anterior (ej. reintento por timeout)
        if let Some(task) = job.ledger.in_progress_for(worker_id) {
            warn!(
                "worker {} pidió tarea teniendo {} en vuelo, se reenvía el mismo intento",
                worker_id, task
            );
            return job
                .ledger
                .descriptor(task, &job.id, &job.work_dir)
                .ok_or(JobError::UnknownTask(task));
        }

        let Some(task) = job.ledger.next_idle_task() else {
            debug!(
                "worker {} pidió tarea pero no hay libres ({} en vuelo)",
                worker_id,
                job.ledger.in_progress()
            );
            return Ok(TaskDescriptor::Wait);
        };

        let attempt = job.ledger.assign(task, worker_id, now)?;
        if job.started_at.is_none() {
            job.started_at = Some(Utc::now());
        }

        info!(
            "asignando {} (attempt={}) del job {} al worker {}",
            task, attempt, job.id, worker_id
        );

        job.ledger
            .descriptor(task, &job.id, &job.work_dir)
            .ok_or(JobError::UnknownTask(task))
    }

    /// CompleteTask: los reportes obsoletos, duplicados o de otro job reciben
    /// ack con `accepted = false`.
    pub fn complete_task(&self, req: CompleteTaskRequest) -> Result<CompleteTaskResponse, JobError> {
        let mut guard = self.lock_job()?;
        let Some(job) = guard.as_mut() else {
            warn!(
                "reporte de {} (worker {}) sin job activo, descartado",
                req.task_id, req.worker_id
            );
            return Ok(CompleteTaskResponse { accepted: false });
        };

        if job.id != req.job_id {
            warn!(
                "reporte de {} para el job {} que ya no está activo, descartado",
                req.task_id, req.job_id
            );
            return Ok(CompleteTaskResponse { accepted: false });
        }

        let outcome = job
            .ledger
            .complete(req.task_id, req.attempt_id, req.output_locations)?;

        let accepted = match outcome {
            Completion::Accepted { phase_finished } => {
                info!(
                    "{} completada por {} (attempt={}), quedan {} map / {} reduce",
                    req.task_id,
                    req.worker_id,
                    req.attempt_id,
                    job.ledger.map_remaining(),
                    job.ledger.reduce_remaining()
                );
                if phase_finished && job.ledger.map_remaining() == 0 && job.ledger.reduce_remaining() > 0 {
                    info!("job {}: fase map terminada, habilitando reduce", job.id);
                }
                if job.ledger.is_done() && job.finished_at.is_none() {
                    job.finished_at = Some(Utc::now());
                    info!("job {} terminado", job.id);
                }
                true
            }
            Completion::Stale { current_attempt } => {
                warn!(
                    "reporte obsoleto de {} por {} (attempt={}, vigente={}), descartado",
                    req.task_id, req.worker_id, req.attempt_id, current_attempt
                );
                false
            }
            Completion::AlreadyCompleted => {
                info!(
                    "{} ya estaba completada, ignorando reporte de {}",
                    req.task_id, req.worker_id
                );
                false
            }
        };

        Ok(CompleteTaskResponse { accepted })
    }

    /// Done: todas las tareas del job actual completadas.
    pub fn done(&self) -> Result<bool, JobError> {
        let guard = self.lock_job()?;
        Ok(guard.as_ref().map(|j| j.ledger.is_done()).unwrap_or(false))
    }

    /// Pasa las tareas vencidas a Idle. Devuelve las que se resetearon.
    pub fn sweep_timeouts(&self, now: Instant) -> Result<Vec<TaskId>, JobError> {
        let mut guard = self.lock_job()?;
        let Some(job) = guard.as_mut() else {
            return Ok(Vec::new());
        };

        let reset = job.ledger.sweep_timeouts(now, self.config.task_timeout);
        job.reassignments += reset.len() as u32;
        Ok(reset)
    }

    pub fn job_info(&self, job_id: &str) -> Result<JobInfo, JobError> {
        let guard = self.lock_job()?;
        match guard.as_ref() {
            Some(job) if job.id == job_id => Ok(job.info()),
            _ => Err(JobError::UnknownJob(job_id.to_string())),
        }
    }

    pub fn current_job(&self) -> Result<JobInfo, JobError> {
        let guard = self.lock_job()?;
        guard.as_ref().map(|j| j.info()).ok_or(JobError::NoJob)
    }

    pub fn job_results(&self, job_id: &str) -> Result<JobResults, JobError> {
        let guard = self.lock_job()?;
        match guard.as_ref() {
            Some(job) if job.id == job_id => Ok(JobResults {
                job_id: job.id.clone(),
                work_dir: job.work_dir.clone(),
                files: job.ledger.output_locations(),
                complete: job.ledger.is_done(),
            }),
            _ => Err(JobError::UnknownJob(job_id.to_string())),
        }
    }
}
