//! Scripted driver and capture backends that record what the orchestrator
//! asks of them, stamped with the (usually paused) tokio clock.

#![allow(dead_code)]

use async_trait::async_trait;
use flow_engine::{Capture, Driver, FlowEngineError, FlowResult, Step, StepKind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Launch { headless: bool },
    NewPage,
    Step(StepKind),
    CaptureStart(PathBuf),
    CaptureStop,
    Close,
}

#[derive(Debug, Clone)]
pub struct Journal {
    origin: Instant,
    events: Arc<Mutex<Vec<(Duration, Event)>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push(&self, event: Event) {
        self.events
            .lock()
            .unwrap()
            .push((self.origin.elapsed(), event));
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn timed(&self) -> Vec<(Duration, Event)> {
        self.events.lock().unwrap().clone()
    }

    /// Timestamp of the first event matching `pred`
    pub fn first_at(&self, pred: impl Fn(&Event) -> bool) -> Option<Duration> {
        self.timed()
            .into_iter()
            .find(|(_, e)| pred(e))
            .map(|(at, _)| at)
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

#[derive(Debug, Default)]
pub struct MockBrowser;

#[derive(Debug, Default)]
pub struct MockPage;

pub struct MockDriver {
    pub journal: Journal,
    /// 1-based `run_step` call that fails
    pub fail_on_call: Option<usize>,
    pub fail_launch: bool,
    pub fail_close: bool,
    /// Flow-level timeout handed to each `run_step` call
    pub flow_timeouts: Mutex<Vec<Option<Duration>>>,
    calls: Mutex<usize>,
}

impl MockDriver {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail_on_call: None,
            fail_launch: false,
            fail_close: false,
            flow_timeouts: Mutex::new(Vec::new()),
            calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl Driver for MockDriver {
    type Browser = MockBrowser;
    type Page = MockPage;

    async fn launch(&self, headless: bool) -> FlowResult<MockBrowser> {
        if self.fail_launch {
            return Err(FlowEngineError::BrowserLaunch("no chromium".into()));
        }
        self.journal.push(Event::Launch { headless });
        Ok(MockBrowser)
    }

    async fn new_page(&self, _browser: &MockBrowser) -> FlowResult<MockPage> {
        self.journal.push(Event::NewPage);
        Ok(MockPage)
    }

    async fn run_step(
        &self,
        step: &Step,
        _page: &MockPage,
        flow_timeout: Option<Duration>,
    ) -> FlowResult<()> {
        self.flow_timeouts.lock().unwrap().push(flow_timeout);
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        self.journal.push(Event::Step(step.kind()));
        if self.fail_on_call == Some(call) {
            return Err(FlowEngineError::ElementNotFound {
                selector: "#missing".into(),
            });
        }
        Ok(())
    }

    async fn close(&self, _browser: MockBrowser) -> FlowResult<()> {
        self.journal.push(Event::Close);
        if self.fail_close {
            return Err(FlowEngineError::StepExecution("browser hung".into()));
        }
        Ok(())
    }
}

pub struct MockCapture {
    pub journal: Journal,
    pub fail_stop: bool,
}

impl MockCapture {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail_stop: false,
        }
    }
}

#[async_trait]
impl Capture<MockPage> for MockCapture {
    type Handle = PathBuf;

    async fn start(&self, _page: &MockPage, output: &Path) -> FlowResult<PathBuf> {
        self.journal.push(Event::CaptureStart(output.to_path_buf()));
        Ok(output.to_path_buf())
    }

    async fn stop(&self, _handle: PathBuf) -> FlowResult<()> {
        self.journal.push(Event::CaptureStop);
        if self.fail_stop {
            return Err(FlowEngineError::Encoder("ffmpeg exited with 1".into()));
        }
        Ok(())
    }
}

pub fn click(selector: &str) -> Step {
    serde_json::from_value(serde_json::json!({
        "type": "click",
        "selectors": [[selector]],
        "offsetX": 1,
        "offsetY": 1
    }))
    .unwrap()
}

pub fn navigate(url: &str) -> Step {
    Step::Navigate {
        url: url.to_string(),
        timeout: None,
        asserted_events: Vec::new(),
    }
}

pub fn viewport() -> Step {
    Step::SetViewport {
        width: 1280,
        height: 720,
        device_scale_factor: 1.0,
        is_mobile: false,
        has_touch: false,
        is_landscape: false,
    }
}

fn from_json(value: serde_json::Value) -> Step {
    serde_json::from_value(value).unwrap()
}

/// Any recorder step kind the orchestrator can be handed
pub fn arb_step() -> impl proptest::strategy::Strategy<Value = Step> {
    use proptest::prelude::*;

    prop_oneof![
        Just(viewport()),
        "[a-z]{1,8}".prop_map(|host| navigate(&format!("https://{}.test/", host))),
        "[a-z]{1,6}".prop_map(|id| click(&format!("#{}", id))),
        "[a-z]{1,6}".prop_map(|id| from_json(serde_json::json!({
            "type": "doubleClick", "selectors": [[format!("#{}", id)]], "offsetX": 1, "offsetY": 1
        }))),
        "[a-z]{1,6}".prop_map(|id| from_json(serde_json::json!({
            "type": "hover", "selectors": [[format!("#{}", id)]]
        }))),
        "[a-z]{1,6}".prop_map(|value| from_json(serde_json::json!({
            "type": "change", "selectors": [["input"]], "value": value
        }))),
        "[a-zA-Z]".prop_map(|key| from_json(serde_json::json!({"type": "keyDown", "key": key}))),
        "[a-zA-Z]".prop_map(|key| from_json(serde_json::json!({"type": "keyUp", "key": key}))),
        (-500.0f64..500.0).prop_map(|y| from_json(serde_json::json!({"type": "scroll", "x": 0, "y": y}))),
        Just(from_json(serde_json::json!({
            "type": "waitForExpression", "expression": "document.readyState === 'complete'"
        }))),
        Just(from_json(serde_json::json!({"type": "customStep", "name": "noop", "parameters": {}}))),
        Just(Step::Close),
    ]
}
