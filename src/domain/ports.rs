use crate::domain::model::{Invocation, RunOutput};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Runs one entry point of the external simulation package.
#[async_trait]
pub trait ModelRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<RunOutput>;
}
