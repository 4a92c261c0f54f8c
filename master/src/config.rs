use std::{env, str::FromStr, time::Duration};

use mr_common::JobRequest;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_DATA_DIR: &str = "/data/mr";
pub const DEFAULT_TASK_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_REDUCE_COUNT: u32 = 10;
pub const DEFAULT_EXIT_GRACE_SECS: u64 = 3;

#[derive(Debug, Clone)]
pub struct MasterConfig {
    pub bind_addr: String,
    /// Base de los directorios de trabajo: <data_dir>/<job_id>/
    pub data_dir: String,
    /// Tiempo máximo que una tarea puede estar InProgress sin reportar
    pub task_timeout: Duration,
    pub sweep_interval: Duration,
    /// Job inicial opcional (modo batch)
    pub input_glob: Option<String>,
    pub reduce_count: u32,
    pub job_name: String,
    /// Apagar el master cuando el job termina
    pub exit_when_done: bool,
    /// Margen para que los workers vean JobFinished antes de apagar
    pub exit_grace: Duration,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            data_dir: DEFAULT_DATA_DIR.to_string(),
            task_timeout: Duration::from_secs(DEFAULT_TASK_TIMEOUT_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            input_glob: None,
            reduce_count: DEFAULT_REDUCE_COUNT,
            job_name: "batch".to_string(),
            exit_when_done: false,
            exit_grace: Duration::from_secs(DEFAULT_EXIT_GRACE_SECS),
        }
    }
}

/// Lee una env var y la parsea; si falta o no parsea, usa el default.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

impl MasterConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            bind_addr: env::var("MR_BIND_ADDR").unwrap_or(d.bind_addr),
            data_dir: env::var("MR_DATA_DIR").unwrap_or(d.data_dir),
            task_timeout: Duration::from_secs(env_or(
                "MR_TASK_TIMEOUT_SECS",
                DEFAULT_TASK_TIMEOUT_SECS,
            )),
            sweep_interval: Duration::from_secs(
                env_or("MR_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS).max(1),
            ),
            input_glob: env::var("MR_INPUT_GLOB").ok().filter(|s| !s.trim().is_empty()),
            reduce_count: env_or("MR_REDUCE_COUNT", DEFAULT_REDUCE_COUNT),
            job_name: env::var("MR_JOB_NAME").unwrap_or(d.job_name),
            exit_when_done: env_flag("MR_EXIT_WHEN_DONE", false),
            exit_grace: Duration::from_secs(env_or("MR_EXIT_GRACE_SECS", DEFAULT_EXIT_GRACE_SECS)),
        }
    }

    /// Job a crear al arrancar, si se configuró MR_INPUT_GLOB.
    pub fn initial_job(&self) -> Option<JobRequest> {
        self.input_glob.as_ref().map(|glob| JobRequest {
            name: self.job_name.clone(),
            input_files: Vec::new(),
            input_glob: Some(glob.clone()),
            reduce_count: self.reduce_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_respeta_env_var_y_cae_al_default() {
        env::set_var("MR_TEST_ENV_OR", "42");
        assert_eq!(env_or("MR_TEST_ENV_OR", 7u64), 42);
        env::set_var("MR_TEST_ENV_OR", "no-numero");
        assert_eq!(env_or("MR_TEST_ENV_OR", 7u64), 7);
        env::remove_var("MR_TEST_ENV_OR");
        assert_eq!(env_or("MR_TEST_ENV_OR", 7u64), 7);
    }

    #[test]
    fn env_flag_entiende_valores_comunes() {
        env::set_var("MR_TEST_FLAG", "TRUE");
        assert!(env_flag("MR_TEST_FLAG", false));
        env::set_var("MR_TEST_FLAG", "0");
        assert!(!env_flag("MR_TEST_FLAG", true));
        env::remove_var("MR_TEST_FLAG");
        assert!(env_flag("MR_TEST_FLAG", true));
    }

    #[test]
    fn initial_job_solo_con_glob() {
        let mut cfg = MasterConfig::default();
        assert!(cfg.initial_job().is_none());

        cfg.input_glob = Some("/data/input/*.txt".to_string());
        cfg.reduce_count = 3;
        let req = cfg.initial_job().unwrap();
        assert_eq!(req.input_glob.as_deref(), Some("/data/input/*.txt"));
        assert_eq!(req.reduce_count, 3);
    }
}
