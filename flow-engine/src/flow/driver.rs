//! Automation driver seam
//!
//! The replay orchestrator only talks to the browser through [`Driver`], so the
//! Chromium implementation can be swapped for a scripted one in tests.

use crate::error::FlowResult;
use crate::flow::model::Step;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait Driver: Send + Sync {
    /// A running browser instance
    type Browser: Send + Sync;
    /// One tab inside a browser
    type Page: Send + Sync;

    async fn launch(&self, headless: bool) -> FlowResult<Self::Browser>;

    async fn new_page(&self, browser: &Self::Browser) -> FlowResult<Self::Page>;

    /// Execute a single step against the page.
    ///
    /// A step's own timeout wins over `flow_timeout`, which wins over the
    /// driver's default.
    async fn run_step(
        &self,
        step: &Step,
        page: &Self::Page,
        flow_timeout: Option<Duration>,
    ) -> FlowResult<()>;

    /// Tear the browser down; pages opened on it are invalid afterwards
    async fn close(&self, browser: Self::Browser) -> FlowResult<()>;
}
