//! Flow Data Models
//!
//! Core data structures for replaying browser flows exported by the Chrome
//! DevTools Recorder. A flow is an ordered list of typed steps; the `type`
//! field of every step record selects its variant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// A recorded user flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    /// Human-readable title given in the recorder
    #[serde(default)]
    pub title: String,
    /// Default timeout in milliseconds for steps that do not set their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Ordered list of steps in the flow
    pub steps: Vec<Step>,
    /// File the flow was loaded from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Flow {
    pub fn new(title: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            title: title.into(),
            timeout: None,
            steps,
            source: None,
        }
    }

    /// Flow-wide default step timeout
    pub fn step_timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_millis)
    }

    /// Get total number of steps
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Name used in logs: the title, or the source file when untitled
    pub fn display_name(&self) -> String {
        if !self.title.is_empty() {
            return self.title.clone();
        }
        self.source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<untitled flow>".to_string())
    }
}

/// Discriminant of a [`Step`], without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    SetViewport,
    Navigate,
    Click,
    DoubleClick,
    Hover,
    Change,
    KeyDown,
    KeyUp,
    Scroll,
    WaitForElement,
    WaitForExpression,
    Close,
    EmulateNetworkConditions,
    CustomStep,
}

impl StepKind {
    /// Name of the kind as written in the `type` field
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::SetViewport => "setViewport",
            StepKind::Navigate => "navigate",
            StepKind::Click => "click",
            StepKind::DoubleClick => "doubleClick",
            StepKind::Hover => "hover",
            StepKind::Change => "change",
            StepKind::KeyDown => "keyDown",
            StepKind::KeyUp => "keyUp",
            StepKind::Scroll => "scroll",
            StepKind::WaitForElement => "waitForElement",
            StepKind::WaitForExpression => "waitForExpression",
            StepKind::Close => "close",
            StepKind::EmulateNetworkConditions => "emulateNetworkConditions",
            StepKind::CustomStep => "customStep",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Individual step in a browser flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Step {
    /// Resize the page viewport
    SetViewport {
        width: u32,
        height: u32,
        #[serde(default = "default_scale_factor")]
        device_scale_factor: f64,
        #[serde(default)]
        is_mobile: bool,
        #[serde(default)]
        has_touch: bool,
        #[serde(default)]
        is_landscape: bool,
    },

    /// Navigate to a URL
    Navigate {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        asserted_events: Vec<AssertedEvent>,
    },

    /// Click an element
    Click {
        selectors: Vec<Selector>,
        #[serde(default)]
        button: MouseButton,
        #[serde(default)]
        offset_x: f64,
        #[serde(default)]
        offset_y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        asserted_events: Vec<AssertedEvent>,
    },

    /// Double-click an element
    DoubleClick {
        selectors: Vec<Selector>,
        #[serde(default)]
        button: MouseButton,
        #[serde(default)]
        offset_x: f64,
        #[serde(default)]
        offset_y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        asserted_events: Vec<AssertedEvent>,
    },

    /// Hover over an element
    Hover {
        selectors: Vec<Selector>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },

    /// Change the value of an input, textarea or select
    Change {
        selectors: Vec<Selector>,
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        asserted_events: Vec<AssertedEvent>,
    },

    /// Press a key
    KeyDown {
        key: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        asserted_events: Vec<AssertedEvent>,
    },

    /// Release a key
    KeyUp {
        key: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        asserted_events: Vec<AssertedEvent>,
    },

    /// Scroll the page, or an element when selectors are given
    Scroll {
        #[serde(default)]
        selectors: Vec<Selector>,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    },

    /// Wait until an element matching the selectors exists
    WaitForElement {
        selectors: Vec<Selector>,
        /// Comparison applied to the match count
        #[serde(default)]
        operator: CountOperator,
        /// Expected number of matches
        #[serde(default = "default_count")]
        count: u32,
        /// Only count elements whose visibility equals this
        #[serde(default, skip_serializing_if = "Option::is_none")]
        visible: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },

    /// Wait until a JavaScript expression evaluates truthy
    WaitForExpression {
        expression: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },

    /// Close the page
    Close,

    /// Throttle the network
    EmulateNetworkConditions {
        #[serde(default)]
        download: f64,
        #[serde(default)]
        upload: f64,
        #[serde(default)]
        latency: f64,
    },

    /// Recorder extension step, not executable by the engine
    CustomStep {
        name: String,
        #[serde(default)]
        parameters: serde_json::Value,
    },
}

fn default_scale_factor() -> f64 {
    1.0
}

fn default_count() -> u32 {
    1
}

/// Mouse button of a click step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Primary,
    Auxiliary,
    Secondary,
    Back,
    Forward,
}

/// How a `waitForElement` count is compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountOperator {
    #[default]
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = "==")]
    Exactly,
    #[serde(rename = "<=")]
    AtMost,
}

impl CountOperator {
    pub fn matches(&self, actual: u32, expected: u32) -> bool {
        match self {
            CountOperator::AtLeast => actual >= expected,
            CountOperator::Exactly => actual == expected,
            CountOperator::AtMost => actual <= expected,
        }
    }
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Step::SetViewport { .. } => StepKind::SetViewport,
            Step::Navigate { .. } => StepKind::Navigate,
            Step::Click { .. } => StepKind::Click,
            Step::DoubleClick { .. } => StepKind::DoubleClick,
            Step::Hover { .. } => StepKind::Hover,
            Step::Change { .. } => StepKind::Change,
            Step::KeyDown { .. } => StepKind::KeyDown,
            Step::KeyUp { .. } => StepKind::KeyUp,
            Step::Scroll { .. } => StepKind::Scroll,
            Step::WaitForElement { .. } => StepKind::WaitForElement,
            Step::WaitForExpression { .. } => StepKind::WaitForExpression,
            Step::Close => StepKind::Close,
            Step::EmulateNetworkConditions { .. } => StepKind::EmulateNetworkConditions,
            Step::CustomStep { .. } => StepKind::CustomStep,
        }
    }

    pub fn is_navigation(&self) -> bool {
        self.kind() == StepKind::Navigate
    }

    /// Viewport changes apply instantly and are never paced
    pub fn is_viewport_change(&self) -> bool {
        self.kind() == StepKind::SetViewport
    }

    /// Step-level timeout override in milliseconds
    pub fn timeout(&self) -> Option<u64> {
        match self {
            Step::Navigate { timeout, .. }
            | Step::Click { timeout, .. }
            | Step::DoubleClick { timeout, .. }
            | Step::Hover { timeout, .. }
            | Step::Change { timeout, .. }
            | Step::WaitForElement { timeout, .. }
            | Step::WaitForExpression { timeout, .. } => *timeout,
            _ => None,
        }
    }

    /// Whether the recording asserted that this step triggers a page load
    pub fn expects_navigation(&self) -> bool {
        let events = match self {
            Step::Navigate { asserted_events, .. }
            | Step::Click { asserted_events, .. }
            | Step::DoubleClick { asserted_events, .. }
            | Step::Change { asserted_events, .. }
            | Step::KeyDown { asserted_events, .. }
            | Step::KeyUp { asserted_events, .. } => asserted_events,
            _ => return false,
        };
        events
            .iter()
            .any(|e| e.event_type == AssertedEventType::Navigation)
    }
}

/// Event the recorder observed as a consequence of a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertedEvent {
    #[serde(rename = "type")]
    pub event_type: AssertedEventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssertedEventType {
    Navigation,
}

/// One selector candidate for an element.
///
/// A path holds one selector per shadow root or frame boundary, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selector {
    Single(String),
    Path(Vec<String>),
}

impl Selector {
    /// The innermost selector, which addresses the element itself
    pub fn target(&self) -> Option<&str> {
        match self {
            Selector::Single(s) => Some(s.as_str()),
            Selector::Path(parts) => parts.last().map(String::as_str),
        }
    }
}

/// Type of selector, derived from the recorder prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorType {
    /// Plain CSS
    Css,
    /// `aria/` accessible name
    Aria,
    /// `xpath/` expression
    XPath,
    /// `pierce/` CSS that crosses shadow roots
    Pierce,
    /// `text/` visible text
    Text,
}

impl SelectorType {
    /// Split a recorder selector into its type and value
    pub fn parse(raw: &str) -> (SelectorType, &str) {
        const PREFIXES: [(&str, SelectorType); 4] = [
            ("aria/", SelectorType::Aria),
            ("xpath/", SelectorType::XPath),
            ("pierce/", SelectorType::Pierce),
            ("text/", SelectorType::Text),
        ];
        for (prefix, kind) in PREFIXES {
            if let Some(value) = raw.strip_prefix(prefix) {
                return (kind, value);
            }
        }
        (SelectorType::Css, raw)
    }
}
