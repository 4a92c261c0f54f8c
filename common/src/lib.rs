pub mod app;
pub mod engine;
pub mod error;
pub mod indexer;
pub mod job;
pub mod results;
pub mod storage;
pub mod task;
pub mod wordcount;
pub mod worker;

pub use app::{app_by_name, MapReduceApp};
pub use engine::KeyValue;
pub use error::JobError;
pub use job::{DoneResponse, JobId, JobInfo, JobRequest, JobStatus};
pub use results::JobResults;
pub use storage::{LocalStorage, Storage};
pub use task::{MapAssignment, Phase, ReduceAssignment, TaskDescriptor, TaskId};
pub use worker::{AssignTaskRequest, CompleteTaskRequest, CompleteTaskResponse, WorkerId};
