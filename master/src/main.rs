use anyhow::{Context, Result};
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mr_master::{driver, failover, handlers, AppState, MasterConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mr_master=debug,tower_http=info")),
        )
        .init();

    let config = MasterConfig::from_env();
    let state = AppState::new(config.clone());

    // modo batch: el job viene de la configuración
    if let Some(req) = config.initial_job() {
        let job = state
            .submit_job(req)
            .context("no se pudo crear el job inicial")?;
        info!(
            "job inicial {} con {} archivos de entrada y {} particiones",
            job.id, job.map_total, job.reduce_total
        );
    }

    // router HTTP
    let app = handlers::build_router(state.clone());

    // sweep de timeouts en segundo plano
    tokio::spawn(failover::run_failover_loop(state.clone()));

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("no se pudo escuchar en {}", config.bind_addr))?;
    info!("master escuchando en {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    info!("master apagado");
    Ok(())
}

/// Termina con Ctrl-C o, si MR_EXIT_WHEN_DONE, cuando el job terminó y pasó
/// el margen para que los workers vean JobFinished.
async fn shutdown_signal(state: AppState) {
    let job_done = async {
        if !state.config.exit_when_done {
            std::future::pending::<()>().await;
        }
        driver::wait_job_done(&state, Duration::from_secs(1)).await;
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Ctrl-C recibido"),
        _ = job_done => {}
    }
}
