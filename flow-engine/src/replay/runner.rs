//! Flow runner
//!
//! Walks a flow in order and calls back into a [`RunnerExtension`] at fixed
//! points. The extension decides how a step is executed and what happens
//! around it; the runner only owns the iteration contract.

use crate::error::{FlowEngineError, FlowResult};
use crate::flow::model::{Flow, Step};
use async_trait::async_trait;
use tracing::{debug, info_span, Instrument};

/// Lifecycle hooks invoked by [`FlowRunner::run`]
#[async_trait]
pub trait RunnerExtension: Send {
    async fn before_all_steps(&mut self, _flow: &Flow) -> FlowResult<()> {
        Ok(())
    }

    /// Execute one step against the page
    async fn run_step(&mut self, step: &Step, flow: &Flow) -> FlowResult<()>;

    async fn after_each_step(&mut self, _step: &Step, _flow: &Flow) -> FlowResult<()> {
        Ok(())
    }

    async fn after_all_steps(&mut self, _flow: &Flow) -> FlowResult<()> {
        Ok(())
    }
}

/// Sequential executor for one flow
pub struct FlowRunner<'f> {
    flow: &'f Flow,
}

impl<'f> FlowRunner<'f> {
    pub fn new(flow: &'f Flow) -> Self {
        Self { flow }
    }

    /// Run every step; returns the number of steps executed
    pub async fn run<E: RunnerExtension>(&self, extension: &mut E) -> FlowResult<usize> {
        let flow = self.flow;
        let total = flow.step_count();

        extension.before_all_steps(flow).await?;

        for (i, step) in flow.steps.iter().enumerate() {
            let index = i + 1;
            let span = info_span!("step", index, kind = %step.kind());
            async {
                debug!("Executing step {}/{}", index, total);
                extension
                    .run_step(step, flow)
                    .await
                    .map_err(|e| FlowEngineError::StepFailed {
                        index,
                        kind: step.kind(),
                        source: Box::new(e),
                    })?;
                extension.after_each_step(step, flow).await
            }
            .instrument(span)
            .await?;
        }

        extension.after_all_steps(flow).await?;
        Ok(total)
    }
}
