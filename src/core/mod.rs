pub mod responses;
pub mod service;

pub use crate::domain::model::{ContentType, PredictArgs, RenderedResponse, TrainArgs};
pub use crate::domain::ports::ModelRunner;
pub use crate::utils::error::Result;
pub use service::ModelService;
