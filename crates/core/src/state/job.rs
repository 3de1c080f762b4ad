//! The unit of work a controller runs.

use crate::state::context::PipelineContext;
use crate::state::error::PipelineError;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;

/// A pipeline the controller can drive on its background thread.
///
/// Implementations hold their own typed parameters and check them in
/// [`validate`](PipelineJob::validate), which the controller calls before
/// changing any state.
#[async_trait]
pub trait PipelineJob: Send + Sync + 'static {
    /// Reject bad parameters up front.
    ///
    /// # Errors
    ///
    /// Any error is reported to the caller of `start_pipeline` as
    /// `ControllerError::InvalidParams`.
    fn validate(&self) -> Result<(), PipelineError> {
        Ok(())
    }

    /// Run to completion, calling the context's checkpoint API between steps.
    async fn run(&self, ctx: PipelineContext) -> Result<Value, PipelineError>;
}

/// Adapter turning an async closure into a [`PipelineJob`].
pub struct FnJob<F> {
    f: F,
}

/// Wrap an async closure as a job with no parameter validation.
///
/// ```ignore
/// controller.start_pipeline(
///     pipeline_fn(|ctx| async move {
///         ctx.update_progress(1, "editor", "polishing").await?;
///         Ok(serde_json::json!({"words": 1200}))
///     }),
///     "polish",
///     1,
/// )?;
/// ```
pub fn pipeline_fn<F, Fut>(f: F) -> FnJob<F>
where
    F: Fn(PipelineContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, PipelineError>> + Send + 'static,
{
    FnJob { f }
}

#[async_trait]
impl<F, Fut> PipelineJob for FnJob<F>
where
    F: Fn(PipelineContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, PipelineError>> + Send + 'static,
{
    async fn run(&self, ctx: PipelineContext) -> Result<Value, PipelineError> {
        (self.f)(ctx).await
    }
}
