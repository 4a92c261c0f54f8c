// master/src/ledger.rs
//
// Estado autoritativo de todas las tareas del job. Solo se toca con el lock
// del job tomado (ver state.rs).

use std::time::{Duration, Instant};

use mr_common::{
    JobError, MapAssignment, Phase, ReduceAssignment, TaskDescriptor, TaskId, WorkerId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Idle,
    InProgress,
    Completed,
}

#[derive(Debug, Clone)]
pub struct TaskState {
    pub status: TaskStatus,
    /// Solo tiene sentido mientras status == InProgress
    pub assigned_worker: Option<WorkerId>,
    pub assigned_at: Option<Instant>,
    /// Sube en cada (re)asignación, nunca baja
    pub attempt_id: u64,
}

impl TaskState {
    fn new() -> Self {
        Self {
            status: TaskStatus::Idle,
            assigned_worker: None,
            assigned_at: None,
            attempt_id: 0,
        }
    }

    fn assign(&mut self, worker_id: &str, now: Instant) -> u64 {
        self.status = TaskStatus::InProgress;
        self.assigned_worker = Some(worker_id.to_string());
        self.assigned_at = Some(now);
        self.attempt_id += 1;
        self.attempt_id
    }

    fn timed_out(&self, now: Instant, timeout: Duration) -> bool {
        if self.status != TaskStatus::InProgress {
            return false;
        }
        match self.assigned_at {
            Some(at) => now.saturating_duration_since(at) > timeout,
            None => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MapTask {
    pub state: TaskState,
    pub input_file: String,
    pub reduce_count: u32,
    /// Salidas del intento aceptado, índice = partición
    pub output_locations: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ReduceTask {
    pub state: TaskState,
    pub partition_id: u32,
    /// Un slot por tarea map; se llena cuando esa map se completa
    pub map_output_locations: Vec<Option<String>>,
    pub output_location: Option<String>,
}

/// Resultado de `Ledger::complete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// El reporte se aceptó. `phase_finished` indica que era la última tarea de su fase.
    Accepted { phase_finished: bool },
    /// El intento ya no es el vigente (reasignado o vencido por timeout).
    Stale { current_attempt: u64 },
    /// La tarea ya estaba completada; reporte duplicado.
    AlreadyCompleted,
}

#[derive(Debug)]
pub struct Ledger {
    map_tasks: Vec<MapTask>,
    reduce_tasks: Vec<ReduceTask>,
    map_remaining: usize,
    reduce_remaining: usize,
}

impl Ledger {
    /// Crea el set completo de tareas de una vez: una map por archivo de
    /// entrada (en orden) y `reduce_count` reduce.
    pub fn new(input_files: Vec<String>, reduce_count: u32) -> Result<Self, JobError> {
        if reduce_count == 0 {
            return Err(JobError::InvalidRequest(
                "reduce_count tiene que ser al menos 1".to_string(),
            ));
        }

        let n_map = input_files.len();

        let map_tasks: Vec<MapTask> = input_files
            .into_iter()
            .map(|input_file| MapTask {
                state: TaskState::new(),
                input_file,
                reduce_count,
                output_locations: Vec::new(),
            })
            .collect();

        let reduce_tasks: Vec<ReduceTask> = (0..reduce_count)
            .map(|partition_id| ReduceTask {
                state: TaskState::new(),
                partition_id,
                map_output_locations: vec![None; n_map],
                output_location: None,
            })
            .collect();

        Ok(Self {
            map_remaining: map_tasks.len(),
            reduce_remaining: reduce_tasks.len(),
            map_tasks,
            reduce_tasks,
        })
    }

    pub fn map_total(&self) -> usize {
        self.map_tasks.len()
    }

    pub fn reduce_total(&self) -> usize {
        self.reduce_tasks.len()
    }

    pub fn map_remaining(&self) -> usize {
        self.map_remaining
    }

    pub fn reduce_remaining(&self) -> usize {
        self.reduce_remaining
    }

    pub fn is_done(&self) -> bool {
        self.map_remaining == 0 && self.reduce_remaining == 0
    }

    pub fn reduce_count(&self) -> u32 {
        self.reduce_tasks.len() as u32
    }

    pub fn input_files(&self) -> Vec<String> {
        self.map_tasks.iter().map(|t| t.input_file.clone()).collect()
    }

    fn state(&self, task: TaskId) -> Option<&TaskState> {
        let idx = task.index as usize;
        match task.phase {
            Phase::Map => self.map_tasks.get(idx).map(|t| &t.state),
            Phase::Reduce => self.reduce_tasks.get(idx).map(|t| &t.state),
        }
    }

    fn state_mut(&mut self, task: TaskId) -> Option<&mut TaskState> {
        let idx = task.index as usize;
        match task.phase {
            Phase::Map => self.map_tasks.get_mut(idx).map(|t| &mut t.state),
            Phase::Reduce => self.reduce_tasks.get_mut(idx).map(|t| &mut t.state),
        }
    }

    pub fn status(&self, task: TaskId) -> Option<TaskStatus> {
        self.state(task).map(|s| s.status)
    }

    pub fn attempt_id(&self, task: TaskId) -> Option<u64> {
        self.state(task).map(|s| s.attempt_id)
    }

    pub fn assigned_worker(&self, task: TaskId) -> Option<&str> {
        self.state(task).and_then(|s| s.assigned_worker.as_deref())
    }

    pub fn in_progress(&self) -> usize {
        self.map_tasks
            .iter()
            .map(|t| &t.state)
            .chain(self.reduce_tasks.iter().map(|t| &t.state))
            .filter(|s| s.status == TaskStatus::InProgress)
            .count()
    }

    /// Tarea que `worker_id` tiene en vuelo, si tiene alguna.
    pub fn in_progress_for(&self, worker_id: &str) -> Option<TaskId> {
        let maps = self
            .map_tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (TaskId::map(i as u32), &t.state));
        let reduces = self
            .reduce_tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (TaskId::reduce(i as u32), &t.state));

        maps.chain(reduces)
            .find(|(_, s)| {
                s.status == TaskStatus::InProgress && s.assigned_worker.as_deref() == Some(worker_id)
            })
            .map(|(id, _)| id)
    }

    /// Primera tarea Idle: primero las map en orden; las reduce solo cuando
    /// todas las map están completadas. `None` no implica que el job terminó.
    pub fn next_idle_task(&self) -> Option<TaskId> {
        if let Some(idx) = self
            .map_tasks
            .iter()
            .position(|t| t.state.status == TaskStatus::Idle)
        {
            return Some(TaskId::map(idx as u32));
        }

        if self.map_remaining > 0 {
            return None;
        }

        self.reduce_tasks
            .iter()
            .position(|t| t.state.status == TaskStatus::Idle)
            .map(|idx| TaskId::reduce(idx as u32))
    }

    /// Marca la tarea como InProgress para `worker_id` y devuelve el nuevo attempt_id.
    pub fn assign(&mut self, task: TaskId, worker_id: &str, now: Instant) -> Result<u64, JobError> {
        if task.phase == Phase::Reduce && self.map_remaining > 0 {
            return Err(JobError::InvalidRequest(format!(
                "{} no se puede asignar: quedan {} map sin completar",
                task, self.map_remaining
            )));
        }

        let state = self.state_mut(task).ok_or(JobError::UnknownTask(task))?;
        if state.status != TaskStatus::Idle {
            return Err(JobError::InvalidRequest(format!("{} no está Idle", task)));
        }

        Ok(state.assign(worker_id, now))
    }

    /// Commit idempotente: solo el intento vigente de una tarea InProgress la completa.
    pub fn complete(
        &mut self,
        task: TaskId,
        attempt_id: u64,
        output_locations: Vec<String>,
    ) -> Result<Completion, JobError> {
        let reduce_count = self.reduce_count() as usize;
        let state = self.state(task).ok_or(JobError::UnknownTask(task))?;

        if state.status == TaskStatus::Completed {
            return Ok(Completion::AlreadyCompleted);
        }
        if state.status != TaskStatus::InProgress || state.attempt_id != attempt_id {
            return Ok(Completion::Stale {
                current_attempt: state.attempt_id,
            });
        }

        let expected = match task.phase {
            Phase::Map => reduce_count,
            Phase::Reduce => 1,
        };
        if output_locations.len() != expected {
            return Err(JobError::MalformedCompletion {
                task,
                reason: format!(
                    "se esperaban {} ubicaciones de salida, llegaron {}",
                    expected,
                    output_locations.len()
                ),
            });
        }

        let idx = task.index as usize;
        let phase_finished = match task.phase {
            Phase::Map => {
                for (reduce, loc) in self.reduce_tasks.iter_mut().zip(output_locations.iter()) {
                    reduce.map_output_locations[idx] = Some(loc.clone());
                }
                let map = &mut self.map_tasks[idx];
                map.output_locations = output_locations;
                finish(&mut map.state);
                self.map_remaining -= 1;
                self.map_remaining == 0
            }
            Phase::Reduce => {
                let reduce = &mut self.reduce_tasks[idx];
                reduce.output_location = output_locations.into_iter().next();
                finish(&mut reduce.state);
                self.reduce_remaining -= 1;
                self.reduce_remaining == 0
            }
        };

        Ok(Completion::Accepted { phase_finished })
    }

    /// Devuelve a Idle toda tarea InProgress asignada hace más de `timeout`.
    /// El attempt_id no se toca: el reporte tardío del intento muerto queda obsoleto.
    pub fn sweep_timeouts(&mut self, now: Instant, timeout: Duration) -> Vec<TaskId> {
        let mut reset = Vec::new();

        let maps = self
            .map_tasks
            .iter_mut()
            .enumerate()
            .map(|(i, t)| (TaskId::map(i as u32), &mut t.state));
        let reduces = self
            .reduce_tasks
            .iter_mut()
            .enumerate()
            .map(|(i, t)| (TaskId::reduce(i as u32), &mut t.state));

        for (id, state) in maps.chain(reduces) {
            if state.timed_out(now, timeout) {
                state.status = TaskStatus::Idle;
                state.assigned_worker = None;
                reset.push(id);
            }
        }

        reset
    }

    /// Descriptor para mandar al worker con el intento actual de la tarea.
    pub fn descriptor(&self, task: TaskId, job_id: &str, work_dir: &str) -> Option<TaskDescriptor> {
        let idx = task.index as usize;
        match task.phase {
            Phase::Map => self.map_tasks.get(idx).map(|t| {
                TaskDescriptor::Map(MapAssignment {
                    job_id: job_id.to_string(),
                    map_index: task.index,
                    attempt_id: t.state.attempt_id,
                    input_file: t.input_file.clone(),
                    reduce_count: t.reduce_count,
                    work_dir: work_dir.to_string(),
                })
            }),
            Phase::Reduce => self.reduce_tasks.get(idx).map(|t| {
                TaskDescriptor::Reduce(ReduceAssignment {
                    job_id: job_id.to_string(),
                    partition_id: t.partition_id,
                    attempt_id: t.state.attempt_id,
                    map_output_locations: t.map_output_locations.iter().flatten().cloned().collect(),
                    work_dir: work_dir.to_string(),
                })
            }),
        }
    }

    /// Salidas finales aceptadas, en orden de partición.
    pub fn output_locations(&self) -> Vec<String> {
        self.reduce_tasks
            .iter()
            .filter_map(|t| t.output_location.clone())
            .collect()
    }
}

fn finish(state: &mut TaskState) {
    state.status = TaskStatus::Completed;
    state.assigned_worker = None;
}
