use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use mr_common::{DoneResponse, JobInfo, JobRequest, JobResults};
use reqwest::{Client, Response};
use std::{env, time::Duration};

/// Igual que en el worker:
/// - En Docker: MASTER_URL=http://master:8080
/// - Local: default http://localhost:8080
fn master_base_url() -> String {
    env::var("MASTER_URL")
        .map(|u| u.trim_end_matches('/').to_string())
        .unwrap_or_else(|_| "http://localhost:8080".to_string())
}

#[derive(Parser)]
#[command(name = "client")]
#[command(about = "CLI simple para hablar con el master MapReduce")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Envía un job nuevo (uno a la vez por master)
    Submit {
        #[arg(value_name = "NOMBRE")]
        name: String,

        /// Patrón glob de entrada, expandido por el master
        #[arg(long)]
        input_glob: Option<String>,

        /// Archivos de entrada explícitos (se puede repetir)
        #[arg(long = "input", value_name = "ARCHIVO")]
        inputs: Vec<String>,

        /// Número de particiones reduce
        #[arg(long, default_value_t = 10)]
        reduce_count: u32,
    },
    /// Consulta el estado de un job (sin id: el job actual)
    Status {
        #[arg(value_name = "JOB_ID")]
        id: Option<String>,
    },
    /// Lista los archivos de salida de un job
    Results {
        #[arg(value_name = "JOB_ID")]
        id: String,
    },
    /// Bloquea hasta que el job actual termine
    Wait {
        /// Segundos entre consultas
        #[arg(long, default_value_t = 1)]
        interval: u64,
    },
}

async fn error_text(resp: Response) -> String {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    format!("status {}: {}", status, body)
}

fn print_job(job: &JobInfo) {
    println!("  id: {}", job.id);
    println!("  nombre: {}", job.name);
    println!("  estado: {:?}", job.status);
    println!(
        "  map: {}/{}  reduce: {}/{}  reasignaciones: {}",
        job.map_completed, job.map_total, job.reduce_completed, job.reduce_total, job.reassignments
    );
    println!("  progreso: {:.1}%", job.progress_pct());
    println!("  work_dir: {}", job.work_dir);
    println!("  submitted_at: {}", job.submitted_at);
    if let Some(ref started) = job.started_at {
        println!("  iniciado: {}", started);
    }
    if let Some(ref done) = job.finished_at {
        println!("  finalizado: {}", done);
    }
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base_url = master_base_url();

    match cli.command {
        Commands::Submit {
            name,
            input_glob,
            inputs,
            reduce_count,
        } => {
            let url = format!("{}/api/v1/jobs", base_url);
            let req = JobRequest {
                name,
                input_files: inputs,
                input_glob,
                reduce_count,
            };

            let resp = client.post(&url).json(&req).send().await?;
            if !resp.status().is_success() {
                bail!("el master rechazó el job ({})", error_text(resp).await);
            }
            let job: JobInfo = resp.json().await?;

            println!("Job creado:");
            print_job(&job);
            println!("  archivos de entrada: {}", job.input_files.len());
        }

        Commands::Status { id } => {
            let url = match &id {
                Some(id) => format!("{}/api/v1/jobs/{}", base_url, id),
                None => format!("{}/api/v1/job", base_url),
            };
            let resp = client.get(&url).send().await?;
            if resp.status().is_success() {
                let job: JobInfo = resp.json().await?;
                println!("Job:");
                print_job(&job);
            } else {
                let which = id.as_deref().unwrap_or("actual");
                println!("No se encontró el job {} ({})", which, error_text(resp).await);
            }
        }

        Commands::Results { id } => {
            let url = format!("{}/api/v1/jobs/{id}/results", base_url);
            let resp = client.get(&url).send().await?;

            if resp.status().is_success() {
                let results: JobResults = resp.json().await?;
                println!("Resultados para job {}:", results.job_id);
                println!("  directorio de trabajo: {}", results.work_dir);
                println!("  completo: {}", results.complete);
                if results.files.is_empty() {
                    println!("  (sin archivos de salida)");
                } else {
                    println!("  archivos:");
                    for f in results.files {
                        println!("    - {}", f);
                    }
                }
            } else {
                println!("No se encontraron resultados para job {id}");
            }
        }

        Commands::Wait { interval } => {
            let url = format!("{}/api/v1/done", base_url);
            loop {
                let resp = client.get(&url).send().await?;
                if !resp.status().is_success() {
                    bail!("error consultando {} ({})", url, error_text(resp).await);
                }
                let DoneResponse { done } = resp.json().await?;
                if done {
                    println!("Job terminado.");
                    break;
                }
                tokio::time::sleep(Duration::from_secs(interval.max(1))).await;
            }
        }
    }

    Ok(())
}
