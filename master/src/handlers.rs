use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use mr_common::{
    AssignTaskRequest, CompleteTaskRequest, CompleteTaskResponse, DoneResponse, JobError,
    JobInfo, JobRequest, JobResults, TaskDescriptor,
};
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/jobs", post(create_job))
        .route("/api/v1/job", get(get_current_job))
        .route("/api/v1/jobs/:id", get(get_job))
        .route("/api/v1/jobs/:id/results", get(get_job_results))
        .route("/api/v1/done", get(done))
        .route("/api/v1/tasks/next", post(assign_task))
        .route("/api/v1/tasks/complete", post(complete_task))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

fn error_response(err: JobError) -> (StatusCode, String) {
    let status = match &err {
        JobError::InvalidRequest(_) | JobError::MalformedCompletion { .. } => StatusCode::BAD_REQUEST,
        JobError::JobInProgress(_) => StatusCode::CONFLICT,
        JobError::NoJob | JobError::UnknownJob(_) | JobError::UnknownTask(_) => StatusCode::NOT_FOUND,
        JobError::LockPoisoned | JobError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!("error interno: {}", err);
    }
    (status, err.to_string())
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> &'static str {
    "ok"
}

// Crea el job con todas sus tareas (uno a la vez). Expande el glob y crea
// el directorio de trabajo, así que corre en el pool de bloqueo.
async fn create_job(State(state): State<AppState>, Json(req): Json<JobRequest>) -> ApiResult<JobInfo> {
    match tokio::task::spawn_blocking(move || state.submit_job(req)).await {
        Ok(res) => res.map(Json).map_err(error_response),
        Err(e) => {
            warn!("submit abortado: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

// Job actual, sin necesidad de conocer su id
async fn get_current_job(State(state): State<AppState>) -> ApiResult<JobInfo> {
    state.current_job().map(Json).map_err(error_response)
}

async fn get_job(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<JobInfo> {
    state.job_info(&id).map(Json).map_err(error_response)
}

// Lista las salidas finales aceptadas del job
async fn get_job_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<JobResults> {
    state.job_results(&id).map(Json).map_err(error_response)
}

async fn done(State(state): State<AppState>) -> ApiResult<DoneResponse> {
    state
        .done()
        .map(|done| Json(DoneResponse { done }))
        .map_err(error_response)
}

// Asigna la siguiente tarea libre (o Wait / JobFinished)
async fn assign_task(
    State(state): State<AppState>,
    Json(req): Json<AssignTaskRequest>,
) -> ApiResult<TaskDescriptor> {
    state
        .assign_task(&req.worker_id, Instant::now())
        .map(Json)
        .map_err(error_response)
}

// Worker reporta que terminó una tarea
async fn complete_task(
    State(state): State<AppState>,
    Json(req): Json<CompleteTaskRequest>,
) -> ApiResult<CompleteTaskResponse> {
    state.complete_task(req).map(Json).map_err(error_response)
}
