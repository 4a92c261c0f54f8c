use async_trait::async_trait;
use mr_common::{AssignTaskRequest, CompleteTaskRequest, CompleteTaskResponse, TaskDescriptor};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tokio_retry::{strategy::FixedInterval, RetryIf};
use tracing::warn;

use crate::config::WorkerConfig;
use crate::error::WorkerError;

/// Llamadas que el worker le hace al coordinador. Cualquier falla que salga de
/// acá es fatal para el loop que llamó.
#[async_trait]
pub trait CoordinatorTransport: Send + Sync {
    /// Dirección del coordinador, para logs y errores.
    fn endpoint(&self) -> String;

    async fn assign_task(&self, worker_id: &str) -> Result<TaskDescriptor, WorkerError>;

    async fn complete_task(&self, req: &CompleteTaskRequest) -> Result<CompleteTaskResponse, WorkerError>;
}

/// Transporte HTTP/JSON contra el router del master.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    retries: usize,
    retry_delay: Duration,
}

impl HttpTransport {
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        retries: usize,
        retry_delay: Duration,
    ) -> Result<Self, WorkerError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| WorkerError::Protocol(format!("no se pudo crear el cliente HTTP: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retries,
            retry_delay,
        })
    }

    pub fn from_config(cfg: &WorkerConfig) -> Result<Self, WorkerError> {
        Self::new(&cfg.master_url, cfg.request_timeout, cfg.call_retries, cfg.retry_delay)
    }

    /// POST con reintentos acotados, solo para fallas de conexión/timeout.
    /// Un status de error del master no se reintenta.
    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, WorkerError>
    where
        Req: Serialize + Sync + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let client = &self.client;
        let url_ref = url.as_str();

        let strategy = FixedInterval::new(self.retry_delay).take(self.retries);
        let resp = RetryIf::spawn(
            strategy,
            move || client.post(url_ref).json(body).send(),
            |e: &reqwest::Error| {
                let transient = e.is_connect() || e.is_timeout();
                if transient {
                    warn!("falló la llamada a {}, reintentando: {}", url_ref, e);
                }
                transient
            },
        )
        .await
        .map_err(|e| WorkerError::CoordinatorUnreachable {
            endpoint: url.clone(),
            reason: e.to_string(),
        })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(WorkerError::Protocol(format!(
                "{} devolvió status {}: {}",
                url, status, text
            )));
        }

        resp.json::<Resp>()
            .await
            .map_err(|e| WorkerError::Protocol(format!("respuesta ilegible de {}: {}", url, e)))
    }
}

#[async_trait]
impl CoordinatorTransport for HttpTransport {
    fn endpoint(&self) -> String {
        self.base_url.clone()
    }

    async fn assign_task(&self, worker_id: &str) -> Result<TaskDescriptor, WorkerError> {
        let req = AssignTaskRequest {
            worker_id: worker_id.to_string(),
        };
        self.post_json("/api/v1/tasks/next", &req).await
    }

    async fn complete_task(&self, req: &CompleteTaskRequest) -> Result<CompleteTaskResponse, WorkerError> {
        self.post_json("/api/v1/tasks/complete", req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use tokio::net::TcpListener;

    fn transport(addr: std::net::SocketAddr, retries: usize) -> HttpTransport {
        HttpTransport::new(
            &format!("http://{}", addr),
            Duration::from_secs(2),
            retries,
            Duration::from_millis(50),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn reintenta_hasta_que_el_master_levanta() {
        // reservar un puerto libre y soltarlo: el master arranca tarde
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();

        let server = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            let listener = TcpListener::bind(addr).await.unwrap();
            let router = Router::new().route(
                "/api/v1/tasks/next",
                post(|| async { Json(TaskDescriptor::Wait) }),
            );
            axum::serve(listener, router).await.unwrap();
        });

        let got = transport(addr, 20).assign_task("w1").await.unwrap();
        server.abort();
        assert_eq!(got, TaskDescriptor::Wait);
    }

    #[tokio::test]
    async fn status_de_error_no_se_reintenta() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route(
                "/api/v1/tasks/next",
                post(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::INTERNAL_SERVER_ERROR, "roto")
                }),
            )
            .with_state(hits.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let err = transport(addr, 3).assign_task("w1").await.unwrap_err();
        server.abort();

        assert!(matches!(err, WorkerError::Protocol(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn master_caido_da_coordinator_unreachable() {
        // puerto 9 (discard) en loopback: nadie escucha
        let transport = HttpTransport::new(
            "http://127.0.0.1:9/",
            Duration::from_millis(500),
            1,
            Duration::from_millis(10),
        )
        .unwrap();

        assert_eq!(transport.endpoint(), "http://127.0.0.1:9");

        let err = transport.assign_task("w1").await.unwrap_err();
        assert!(matches!(err, WorkerError::CoordinatorUnreachable { .. }));
        assert!(err.is_fatal_for_process());
    }
}
