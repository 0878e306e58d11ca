pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod utils;

pub use crate::adapters::CommandRunner;
pub use crate::config::{cli::CliArgs, ApiConfig};
pub use crate::core::{service::ModelService, ContentType, PredictArgs, TrainArgs};
pub use crate::utils::error::{ApiError, Result};
