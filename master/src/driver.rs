use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::state::AppState;

/// Resuelve cuando el job actual terminó y pasó `exit_grace`, para que los
/// workers que siguen consultando alcancen a ver JobFinished.
pub async fn wait_job_done(state: &AppState, poll_every: Duration) {
    loop {
        match state.done() {
            Ok(true) => break,
            Ok(false) => {}
            Err(e) => warn!("no se pudo consultar Done: {}", e),
        }
        sleep(poll_every).await;
    }

    info!("job terminado, apagando en {:?}", state.config.exit_grace);
    sleep(state.config.exit_grace).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MasterConfig;
    use mr_common::{CompleteTaskRequest, JobRequest, TaskDescriptor};
    use std::time::Instant;

    fn state(grace: Duration) -> AppState {
        let dir = std::env::temp_dir().join("driver_tests");
        AppState::new(MasterConfig {
            data_dir: dir.to_string_lossy().to_string(),
            exit_grace: grace,
            ..MasterConfig::default()
        })
    }

    #[tokio::test]
    async fn sin_job_no_termina() {
        let st = state(Duration::from_millis(10));
        let res = tokio::time::timeout(
            Duration::from_millis(100),
            wait_job_done(&st, Duration::from_millis(10)),
        )
        .await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn termina_despues_del_job_y_del_margen() {
        let grace = Duration::from_millis(150);
        let st = state(grace);
        let job = st
            .submit_job(JobRequest {
                name: "driver".to_string(),
                input_files: vec!["a.txt".to_string()],
                input_glob: None,
                reduce_count: 1,
            })
            .unwrap();

        let waiter = {
            let st = st.clone();
            tokio::spawn(async move {
                wait_job_done(&st, Duration::from_millis(10)).await;
                Instant::now()
            })
        };

        // job en curso: el driver sigue esperando
        sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        for _ in 0..2 {
            let (task, attempt) = match st.assign_task("w1", Instant::now()).unwrap() {
                TaskDescriptor::Map(m) => (m.task_id(), m.attempt_id),
                TaskDescriptor::Reduce(r) => (r.task_id(), r.attempt_id),
                other => panic!("esperaba tarea, llegó {:?}", other),
            };
            st.complete_task(CompleteTaskRequest {
                job_id: job.id.clone(),
                worker_id: "w1".to_string(),
                task_id: task,
                attempt_id: attempt,
                output_locations: vec!["out".to_string()],
            })
            .unwrap();
        }
        let finished_at = Instant::now();
        assert!(st.done().unwrap());

        let ended = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .expect("el driver no terminó")
            .unwrap();
        assert!(ended.duration_since(finished_at) >= grace);
    }
}
