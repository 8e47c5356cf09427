pub mod clients;
pub mod config;
pub mod errors;
pub mod telemetry;
pub mod types;

pub use config::ClientConfig;
pub use errors::{AppError, AppResult, ErrorCode};
pub use types::*;
