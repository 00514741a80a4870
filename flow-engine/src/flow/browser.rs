//! Browser Management Module
//!
//! Handles Chromium browser lifecycle and configuration, and implements the
//! [`Driver`] seam on top of chromiumoxide.

use crate::error::{FlowEngineError, FlowResult};
use crate::flow::driver::Driver;
use crate::flow::model::Step;
use crate::flow::page::PageController;
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default timeout for element lookups and waits
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Browser launch options
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Run in headless mode (no visible UI)
    pub headless: bool,
    /// Additional Chrome arguments
    pub extra_args: Vec<String>,
    /// Chrome/Chromium binary; auto-detected when unset
    pub executable: Option<PathBuf>,
    /// Window size
    pub window_size: Option<(u32, u32)>,
    /// Timeout for steps that do not carry their own
    pub step_timeout: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            extra_args: Vec::new(),
            executable: None,
            window_size: Some((1920, 1080)),
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }
}

impl BrowserOptions {
    /// Create options for headed (visible) browser
    pub fn headed() -> Self {
        Self {
            headless: false,
            ..Default::default()
        }
    }

    /// Set headless mode
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    fn to_config(&self, user_data_dir: &Path) -> FlowResult<BrowserConfig> {
        let mut config_builder = BrowserConfig::builder().user_data_dir(user_data_dir);

        // chromiumoxide defaults to headless, with_head() makes it visible
        if !self.headless {
            config_builder = config_builder.with_head();
        }

        if let Some(ref executable) = self.executable {
            config_builder = config_builder.chrome_executable(executable);
        }

        if let Some((width, height)) = self.window_size {
            config_builder = config_builder.arg(format!("--window-size={},{}", width, height));
        }

        for arg in &self.extra_args {
            config_builder = config_builder.arg(arg);
        }

        config_builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--hide-scrollbars")
            .build()
            .map_err(FlowEngineError::BrowserLaunch)
    }
}

/// Managed browser instance
pub struct ManagedBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: PathBuf,
}

impl ManagedBrowser {
    /// Get the underlying browser
    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Close the browser and remove its throwaway profile
    pub async fn close(mut self) -> FlowResult<()> {
        let closed = self
            .browser
            .close()
            .await
            .map_err(|e| FlowEngineError::BrowserLaunch(format!("Failed to close browser: {}", e)));
        if closed.is_ok() {
            if let Err(e) = self.browser.wait().await {
                warn!("Browser process did not exit cleanly: {}", e);
            }
        }
        self.handler.abort();
        info!("Browser closed");

        if self.user_data_dir.exists() {
            debug!("Cleaning up browser profile: {:?}", self.user_data_dir);
            if let Err(e) = std::fs::remove_dir_all(&self.user_data_dir) {
                warn!("Failed to remove browser profile dir: {:?}", e);
            }
        }
        closed.map(|_| ())
    }
}

/// Chromium-backed automation driver
#[derive(Debug, Clone, Default)]
pub struct ChromeDriver {
    options: BrowserOptions,
}

impl ChromeDriver {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BrowserOptions {
        &self.options
    }
}

#[async_trait]
impl Driver for ChromeDriver {
    type Browser = ManagedBrowser;
    type Page = Page;

    async fn launch(&self, headless: bool) -> FlowResult<ManagedBrowser> {
        let options = self.options.clone().headless(headless);

        // Use a unique user data directory to avoid SingletonLock errors
        let user_data_dir = std::env::temp_dir().join(format!("flow_video_{}", Uuid::new_v4()));
        let config = options.to_config(&user_data_dir)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FlowEngineError::BrowserLaunch(format!("Failed to launch browser: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("Browser event error: {:?}", e);
                }
            }
        });

        info!("Browser launched (headless: {})", options.headless);

        Ok(ManagedBrowser {
            browser,
            handler,
            user_data_dir,
        })
    }

    async fn new_page(&self, browser: &ManagedBrowser) -> FlowResult<Page> {
        browser
            .browser()
            .new_page("about:blank")
            .await
            .map_err(|e| FlowEngineError::BrowserLaunch(format!("Failed to create page: {}", e)))
    }

    async fn run_step(
        &self,
        step: &Step,
        page: &Page,
        flow_timeout: Option<Duration>,
    ) -> FlowResult<()> {
        PageController::new(page.clone())
            .with_timeout(flow_timeout.unwrap_or(self.options.step_timeout))
            .execute(step)
            .await
    }

    async fn close(&self, browser: ManagedBrowser) -> FlowResult<()> {
        browser.close().await
    }
}
