use std::{env, str::FromStr, time::Duration};

pub const DEFAULT_MASTER_URL: &str = "http://localhost:8080";
pub const DEFAULT_WORKER_CONCURRENCY: u32 = 1;
pub const DEFAULT_APP: &str = "wordcount";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_CALL_RETRIES: usize = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// URL base del master
    /// - En Docker: MASTER_URL=http://master:8080
    /// - Local: http://localhost:8080
    pub master_url: String,
    /// Loops independientes en este proceso, cada uno con su propio id
    pub concurrency: u32,
    /// Prefijo de identidad; por defecto hostname + uuid corto
    pub worker_id: String,
    pub app: String,
    /// Espera entre polls cuando el master responde Wait
    pub poll_interval: Duration,
    /// Reintentos ante fallas de conexión antes de dar al coordinador por caído
    pub call_retries: usize,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// hostname-<uuid corto>: único aunque haya varios workers en el mismo host.
pub fn default_worker_id() -> String {
    let hostname = hostname::get()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let host = if hostname.is_empty() { "worker".to_string() } else { hostname };
    let short = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", host, &short[..8])
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            master_url: DEFAULT_MASTER_URL.to_string(),
            concurrency: DEFAULT_WORKER_CONCURRENCY,
            worker_id: default_worker_id(),
            app: DEFAULT_APP.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            call_retries: DEFAULT_CALL_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            master_url: env::var("MASTER_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(d.master_url),
            concurrency: env_or("WORKER_CONCURRENCY", DEFAULT_WORKER_CONCURRENCY).max(1),
            worker_id: env::var("WORKER_ID")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(d.worker_id),
            app: env::var("MR_APP").unwrap_or(d.app),
            poll_interval: Duration::from_millis(env_or("MR_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)),
            call_retries: env_or("MR_CALL_RETRIES", DEFAULT_CALL_RETRIES),
            retry_delay: Duration::from_millis(env_or("MR_RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS)),
            request_timeout: Duration::from_secs(env_or(
                "MR_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
        }
    }

    /// Id del loop `slot`. Con un solo loop se usa el id tal cual.
    pub fn loop_worker_id(&self, slot: u32) -> String {
        if self.concurrency <= 1 {
            self.worker_id.clone()
        } else {
            format!("{}-{}", self.worker_id, slot)
        }
    }
}
