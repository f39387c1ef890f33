//! Lifecycle trait for long-running pipeline components

use anyhow::Result;
use async_trait::async_trait;

/// A component that runs until cancelled or until it gives up
#[async_trait]
pub trait PipelineStage: Send {
    /// Run the stage, processing data until shutdown signal
    async fn run(&mut self) -> Result<()>;

    /// Get the name of this stage for logging
    fn name(&self) -> &'static str;

    /// Release everything the stage holds. Must be idempotent.
    async fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}
