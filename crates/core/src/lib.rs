pub mod config;
pub mod errors;
pub mod models;
pub mod stats;

pub use config::{AppConfig, ServerConfig, ServiceConfig};
pub use errors::{BalancerError, BalancerResult};
pub use models::Endpoint;
pub use stats::{register_time, register_time_at, standard_deviation};
