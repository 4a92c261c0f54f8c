use anyhow::{anyhow, bail, Result};
use mr_common::{
    app::APP_NAMES, app_by_name, CompleteTaskRequest, JobId, LocalStorage, MapReduceApp, Storage,
    TaskDescriptor, TaskId,
};
use std::{sync::Arc, time::Duration};
use tokio::{task::JoinSet, time::sleep};
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::executor;
use crate::transport::{CoordinatorTransport, HttpTransport};

/// Lo que necesita un loop para ejecutar tareas.
#[derive(Clone)]
pub struct TaskContext {
    pub storage: Arc<dyn Storage>,
    pub app: Arc<dyn MapReduceApp>,
    pub poll_interval: Duration,
}

/// Resumen de un loop que terminó porque el job terminó.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoopSummary {
    pub maps: u32,
    pub reduces: u32,
    /// Reportes que el master descartó (intento viejo o duplicado)
    pub rejected: u32,
}

/// Loop de un worker: pedir tarea, ejecutarla, reportar. Sale con Ok cuando el
/// master responde JobFinished y con Err ante cualquier falla; una tarea que
/// falla no se reporta, el sweep del master la vuelve a repartir.
pub async fn run_loop<T>(
    worker_id: String,
    transport: Arc<T>,
    ctx: TaskContext,
) -> Result<LoopSummary, WorkerError>
where
    T: CoordinatorTransport + ?Sized,
{
    let mut summary = LoopSummary::default();

    loop {
        let descriptor = transport.assign_task(&worker_id).await?;

        match descriptor {
            TaskDescriptor::Wait => {
                debug!("[{}] no hay tareas libres, esperando {:?}", worker_id, ctx.poll_interval);
                sleep(ctx.poll_interval).await;
            }
            TaskDescriptor::JobFinished => {
                info!(
                    "[{}] job terminado (maps={}, reduces={}, rechazadas={})",
                    worker_id, summary.maps, summary.reduces, summary.rejected
                );
                return Ok(summary);
            }
            TaskDescriptor::Map(task) => {
                info!(
                    "[{}] tengo {} del job {} (input={}, attempt={})",
                    worker_id,
                    task.task_id(),
                    task.job_id,
                    task.input_file,
                    task.attempt_id
                );

                let (storage, app, t) = (ctx.storage.clone(), ctx.app.clone(), task.clone());
                let outputs =
                    run_blocking(move || executor::execute_map(storage.as_ref(), app.as_ref(), &t)).await?;

                let accepted = report(
                    transport.as_ref(),
                    &worker_id,
                    &task.job_id,
                    task.task_id(),
                    task.attempt_id,
                    outputs,
                )
                .await?;
                if accepted {
                    summary.maps += 1;
                } else {
                    summary.rejected += 1;
                }
            }
            TaskDescriptor::Reduce(task) => {
                info!(
                    "[{}] tengo {} del job {} ({} intermedios, attempt={})",
                    worker_id,
                    task.task_id(),
                    task.job_id,
                    task.map_output_locations.len(),
                    task.attempt_id
                );

                let (storage, app, t) = (ctx.storage.clone(), ctx.app.clone(), task.clone());
                let outputs =
                    run_blocking(move || executor::execute_reduce(storage.as_ref(), app.as_ref(), &t))
                        .await?;

                let accepted = report(
                    transport.as_ref(),
                    &worker_id,
                    &task.job_id,
                    task.task_id(),
                    task.attempt_id,
                    outputs,
                )
                .await?;
                if accepted {
                    summary.reduces += 1;
                } else {
                    summary.rejected += 1;
                }
            }
        }
    }
}

/// Ejecuta la tarea en un hilo de bloqueo; un pánico se reporta como Aborted.
async fn run_blocking<F>(f: F) -> Result<Vec<String>, WorkerError>
where
    F: FnOnce() -> Result<Vec<String>, WorkerError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => Err(WorkerError::Aborted(e.to_string())),
    }
}

async fn report<T>(
    transport: &T,
    worker_id: &str,
    job_id: &JobId,
    task_id: TaskId,
    attempt_id: u64,
    output_locations: Vec<String>,
) -> Result<bool, WorkerError>
where
    T: CoordinatorTransport + ?Sized,
{
    let req = CompleteTaskRequest {
        job_id: job_id.clone(),
        worker_id: worker_id.to_string(),
        task_id,
        attempt_id,
        output_locations,
    };
    let ack = transport.complete_task(&req).await?;

    if ack.accepted {
        info!("[{}] {} (attempt {}) aceptada", worker_id, task_id, attempt_id);
    } else {
        warn!(
            "[{}] el master descartó {} (attempt {}): intento viejo o duplicado",
            worker_id, task_id, attempt_id
        );
    }
    Ok(ack.accepted)
}

/// Arranca `concurrency` loops contra el master configurado y espera a que
/// terminen todos. Falla si alguno terminó con error.
pub async fn run(config: WorkerConfig) -> Result<()> {
    let app = app_by_name(&config.app).ok_or_else(|| {
        anyhow!(
            "app desconocida '{}' (disponibles: {})",
            config.app,
            APP_NAMES.join(", ")
        )
    })?;
    let transport = Arc::new(HttpTransport::from_config(&config)?);
    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new());

    info!(
        "worker {} con app={} concurrency={} contra {}",
        config.worker_id,
        app.name(),
        config.concurrency,
        transport.endpoint()
    );

    let mut loops = JoinSet::new();
    for slot in 0..config.concurrency {
        let worker_id = config.loop_worker_id(slot);
        let transport = transport.clone();
        let ctx = TaskContext {
            storage: storage.clone(),
            app: app.clone(),
            poll_interval: config.poll_interval,
        };
        loops.spawn(async move {
            let result = run_loop(worker_id.clone(), transport, ctx).await;
            (worker_id, result)
        });
    }

    let failures = supervise(loops).await;
    if failures > 0 {
        bail!("{} loop(s) de worker terminaron con error", failures);
    }
    Ok(())
}

type LoopOutcome = (String, Result<LoopSummary, WorkerError>);

/// Espera a todos los loops y cuenta los que fallaron. Si uno pierde al
/// coordinador se cancelan los demás: sin coordinador no pueden avanzar.
async fn supervise(mut loops: JoinSet<LoopOutcome>) -> usize {
    let mut failures = 0;
    while let Some(joined) = loops.join_next().await {
        match joined {
            Ok((id, Ok(summary))) => debug!("[{}] loop terminado: {:?}", id, summary),
            Ok((id, Err(e))) => {
                error!("[{}] loop terminado con error: {}", id, e);
                failures += 1;
                if e.is_fatal_for_process() {
                    warn!("coordinador perdido, cancelando los loops restantes");
                    loops.abort_all();
                }
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                error!("loop de worker abortado: {}", e);
                failures += 1;
            }
        }
    }
    failures
}
