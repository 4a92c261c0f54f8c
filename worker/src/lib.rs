pub mod config;
pub mod error;
pub mod executor;
pub mod transport;
pub mod worker;

pub use config::WorkerConfig;
pub use error::WorkerError;
pub use transport::{CoordinatorTransport, HttpTransport};
pub use worker::{run_loop, LoopSummary, TaskContext};
