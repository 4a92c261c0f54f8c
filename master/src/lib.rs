pub mod config;
pub mod driver;
pub mod failover;
pub mod handlers;
pub mod ledger;
pub mod state;

pub use config::MasterConfig;
pub use state::AppState;
