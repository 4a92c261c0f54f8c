use std::time::Instant;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::state::AppState;

/// Loop principal de tolerancia a fallos: cada `sweep_interval` devuelve a
/// Idle las tareas que llevan más de `task_timeout` sin reportar. No hay
/// heartbeats: un worker caído simplemente deja vencer su tarea.
pub async fn run_failover_loop(state: AppState) {
    let interval = state.config.sweep_interval;
    info!(
        "failover activo: sweep cada {:?}, timeout por tarea {:?}",
        interval, state.config.task_timeout
    );

    loop {
        sleep(interval).await;

        if let Err(e) = sweep_once(&state, Instant::now()) {
            warn!("error en failover sweep: {:?}", e);
        }
    }
}

/// Una pasada de chequeo. Devuelve cuántas tareas se reencolaron.
pub fn sweep_once(state: &AppState, now: Instant) -> Result<usize, mr_common::JobError> {
    let reset = state.sweep_timeouts(now)?;

    for task in &reset {
        warn!(
            "{} superó el timeout de {:?}, vuelve a Idle para reasignarse",
            task, state.config.task_timeout
        );
    }

    Ok(reset.len())
}
