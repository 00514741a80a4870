//! Replay orchestrator
//!
//! Drives one flow through one browser session while recording it. The
//! ordering is:
//!
//! 1. launch browser, open page
//! 2. replay the pre-flow (if any), pausing after each of its steps
//! 3. pause, start capture, pause
//! 4. replay the main flow, pausing after every step except viewport changes
//! 5. stop capture
//! 6. close browser
//!
//! Steps 5 and 6 run on every exit path once step 1 succeeded, and capture is
//! always stopped before the browser goes away.

use crate::capture::lifecycle::CaptureLifecycle;
use crate::capture::Capture;
use crate::error::{FlowEngineError, FlowResult};
use crate::flow::driver::Driver;
use crate::flow::filter::StepFilter;
use crate::flow::loader::load_flow;
use crate::flow::model::{Flow, Step};
use crate::replay::config::ReplayConfig;
use crate::replay::pacing::{Pacing, PacingSite};
use crate::replay::runner::{FlowRunner, RunnerExtension};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of one successful replay
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayReport {
    pub title: String,
    pub source: Option<PathBuf>,
    pub output: PathBuf,
    pub steps_executed: usize,
    pub pre_flow_steps: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

/// Hooks for one replay: pre-flow warm-up, pacing and capture bracketing
struct VideoExtension<'a, D, C>
where
    D: Driver,
    C: Capture<D::Page>,
{
    driver: &'a D,
    page: &'a D::Page,
    capture: CaptureLifecycle<'a, D::Page, C>,
    pacing: Pacing,
    pre_flow: Option<&'a Flow>,
    output: &'a Path,
    pre_flow_steps: usize,
}

impl<'a, D, C> VideoExtension<'a, D, C>
where
    D: Driver,
    C: Capture<D::Page>,
{
    async fn run_pre_flow(&mut self) -> FlowResult<()> {
        let Some(pre_flow) = self.pre_flow else {
            return Ok(());
        };
        info!(
            "Replaying pre-flow {} ({} steps)",
            pre_flow.display_name(),
            pre_flow.step_count()
        );
        for (i, step) in pre_flow.steps.iter().enumerate() {
            self.driver
                .run_step(step, self.page, pre_flow.step_timeout())
                .await
                .map_err(|e| FlowEngineError::PreFlowStepFailed {
                    index: i + 1,
                    kind: step.kind(),
                    source: Box::new(e),
                })?;
            self.pre_flow_steps += 1;
            self.pacing.pause(PacingSite::AfterPreFlowStep).await;
        }
        Ok(())
    }
}

#[async_trait]
impl<'a, D, C> RunnerExtension for VideoExtension<'a, D, C>
where
    D: Driver,
    C: Capture<D::Page>,
{
    async fn before_all_steps(&mut self, _flow: &Flow) -> FlowResult<()> {
        self.run_pre_flow().await?;
        self.pacing.pause(PacingSite::BeforeCapture).await;
        self.capture.start(self.page, self.output).await?;
        self.pacing.pause(PacingSite::AfterCaptureStart).await;
        Ok(())
    }

    async fn run_step(&mut self, step: &Step, flow: &Flow) -> FlowResult<()> {
        self.driver
            .run_step(step, self.page, flow.step_timeout())
            .await
    }

    async fn after_each_step(&mut self, step: &Step, _flow: &Flow) -> FlowResult<()> {
        if !step.is_viewport_change() {
            self.pacing.pause(PacingSite::AfterStep).await;
        }
        Ok(())
    }

    async fn after_all_steps(&mut self, _flow: &Flow) -> FlowResult<()> {
        self.capture.stop().await?;
        Ok(())
    }
}

/// Replays flows into videos with a given driver and capture backend
pub struct ReplayOrchestrator<'a, D, C> {
    driver: &'a D,
    capture: &'a C,
    config: &'a ReplayConfig,
}

impl<'a, D, C> ReplayOrchestrator<'a, D, C>
where
    D: Driver,
    C: Capture<D::Page>,
{
    pub fn new(driver: &'a D, capture: &'a C, config: &'a ReplayConfig) -> Self {
        Self {
            driver,
            capture,
            config,
        }
    }

    pub fn config(&self) -> &ReplayConfig {
        self.config
    }

    /// Load the configured warm-up flow, if any
    pub fn load_pre_flow(&self) -> FlowResult<Option<Flow>> {
        self.config
            .pre_flow_path
            .as_deref()
            .map(load_flow)
            .transpose()
    }

    /// Filter, then replay `flow` into a video at `output`
    pub async fn replay(&self, flow: &Flow, output: &Path) -> FlowResult<ReplayReport> {
        let pre_flow = self.load_pre_flow()?;
        let flow = StepFilter::new(self.config.ignore_navigation).apply(flow);
        self.replay_filtered(&flow, pre_flow.as_ref(), output).await
    }

    /// Replay a flow that has already been filtered, with a preloaded pre-flow
    pub async fn replay_filtered(
        &self,
        flow: &Flow,
        pre_flow: Option<&Flow>,
        output: &Path,
    ) -> FlowResult<ReplayReport> {
        let started_at = Utc::now();
        let clock = tokio::time::Instant::now();
        info!(
            "Starting replay: {} ({} steps) -> {:?}",
            flow.display_name(),
            flow.step_count(),
            output
        );

        let browser = self.driver.launch(!self.config.headful).await?;
        let outcome = self.drive(&browser, flow, pre_flow, output).await;
        let closed = self.driver.close(browser).await;

        let (steps_executed, pre_flow_steps) = match (outcome, closed) {
            (Ok(counts), Ok(())) => counts,
            (Ok(_), Err(e)) => return Err(e),
            (Err(e), Ok(())) => return Err(e),
            (Err(e), Err(close_err)) => {
                warn!("Browser teardown also failed: {}", close_err);
                return Err(e);
            }
        };

        let elapsed = clock.elapsed();
        info!(
            "Replay completed: {} steps in {}ms -> {:?}",
            steps_executed,
            elapsed.as_millis(),
            output
        );

        Ok(ReplayReport {
            title: flow.title.clone(),
            source: flow.source.clone(),
            output: output.to_path_buf(),
            steps_executed,
            pre_flow_steps,
            started_at,
            elapsed,
        })
    }

    /// Everything that happens while the browser is up
    async fn drive(
        &self,
        browser: &D::Browser,
        flow: &Flow,
        pre_flow: Option<&Flow>,
        output: &Path,
    ) -> FlowResult<(usize, usize)> {
        let page = self.driver.new_page(browser).await?;
        let mut extension = VideoExtension {
            driver: self.driver,
            page: &page,
            capture: CaptureLifecycle::new(self.capture),
            pacing: Pacing::from_config(self.config),
            pre_flow,
            output,
            pre_flow_steps: 0,
        };

        let run = FlowRunner::new(flow).run(&mut extension).await;

        // after_all_steps already stopped capture on success; this covers failures
        let stopped = extension.capture.stop().await;
        if let Ok(true) = stopped {
            debug!("Capture stopped after aborted replay");
        }

        match (run, stopped) {
            (Ok(steps), Ok(_)) => Ok((steps, extension.pre_flow_steps)),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(_)) => Err(e),
            (Err(e), Err(stop_err)) => {
                warn!("Capture stop also failed: {}", stop_err);
                Err(e)
            }
        }
    }
}
