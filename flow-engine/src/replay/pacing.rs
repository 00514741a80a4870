//! Pacing controller
//!
//! Fixed pauses inserted at well-defined points of a replay so the video shows
//! each interaction long enough to follow.

use crate::replay::config::ReplayConfig;
use std::time::Duration;
use tracing::trace;

/// Point in the replay where a pause may happen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingSite {
    /// After each step of the warm-up flow
    AfterPreFlowStep,
    /// Right before the recording starts
    BeforeCapture,
    /// Right after the recording starts
    AfterCaptureStart,
    /// After each main-flow step
    AfterStep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    step_delay: Duration,
    pre_flow_step_delay: Duration,
}

impl Pacing {
    pub fn new(step_delay: Duration, pre_flow_step_delay: Duration) -> Self {
        Self {
            step_delay,
            pre_flow_step_delay,
        }
    }

    pub fn from_config(config: &ReplayConfig) -> Self {
        Self::new(config.step_delay, config.pre_flow_step_delay)
    }

    pub fn delay_for(&self, site: PacingSite) -> Duration {
        match site {
            PacingSite::AfterPreFlowStep => self.pre_flow_step_delay,
            PacingSite::BeforeCapture | PacingSite::AfterCaptureStart | PacingSite::AfterStep => {
                self.step_delay
            }
        }
    }

    /// Suspend for the duration bound to `site`
    pub async fn pause(&self, site: PacingSite) {
        let delay = self.delay_for(site);
        if delay.is_zero() {
            return;
        }
        trace!(?site, ?delay, "pacing");
        tokio::time::sleep(delay).await;
    }
}
