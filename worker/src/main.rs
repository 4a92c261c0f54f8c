use anyhow::Result;
use mr_worker::{worker, WorkerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mr_worker=debug,reqwest=info")),
        )
        .init();

    let config = WorkerConfig::from_env();
    worker::run(config).await
}
