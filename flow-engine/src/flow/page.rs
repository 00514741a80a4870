//! Page Controller Module
//!
//! Executes individual flow steps against a chromiumoxide page: navigation,
//! element interaction, keyboard input, waits and emulation.

use crate::error::{FlowEngineError, FlowResult};
use crate::flow::model::{CountOperator, MouseButton, Selector, SelectorType, Step};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetTouchEmulationEnabledParams,
};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams, DispatchMouseEventType,
    MouseButton as CdpMouseButton,
};
use chromiumoxide::cdp::browser_protocol::network::EmulateNetworkConditionsParams;
use chromiumoxide::{Element, Page};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::browser::DEFAULT_STEP_TIMEOUT;

/// Polling interval used by expression waits
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound for the element lookup backoff
const MAX_LOOKUP_DELAY: Duration = Duration::from_secs(1);

/// Page controller for browser automation
pub struct PageController {
    page: Page,
    default_timeout: Duration,
}

impl PageController {
    /// Create a new page controller
    pub fn new(page: Page) -> Self {
        Self {
            page,
            default_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    /// Set default timeout for operations
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Get the underlying page
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Execute one step
    pub async fn execute(&self, step: &Step) -> FlowResult<()> {
        let timeout = step
            .timeout()
            .map(Duration::from_millis)
            .unwrap_or(self.default_timeout);

        match step {
            Step::SetViewport {
                width,
                height,
                device_scale_factor,
                is_mobile,
                has_touch,
                ..
            } => {
                self.set_viewport(*width, *height, *device_scale_factor, *is_mobile, *has_touch)
                    .await?;
            }

            Step::Navigate { url, .. } => {
                self.navigate(url).await?;
            }

            Step::Click {
                selectors, button, ..
            } => {
                let (element, _) = self.find_element_with_fallback(selectors, timeout).await?;
                self.click_element(&element, *button, 1).await?;
            }

            Step::DoubleClick {
                selectors, button, ..
            } => {
                let (element, _) = self.find_element_with_fallback(selectors, timeout).await?;
                self.click_element(&element, *button, 2).await?;
            }

            Step::Hover { selectors, .. } => {
                let (element, _) = self.find_element_with_fallback(selectors, timeout).await?;
                element
                    .scroll_into_view()
                    .await
                    .map_err(|e| FlowEngineError::StepExecution(format!("Scroll failed: {}", e)))?;
                element
                    .hover()
                    .await
                    .map_err(|e| FlowEngineError::StepExecution(format!("Hover failed: {}", e)))?;
            }

            Step::Change {
                selectors, value, ..
            } => {
                self.change(selectors, value, timeout).await?;
            }

            Step::KeyDown { key, .. } => {
                self.dispatch_key(DispatchKeyEventType::KeyDown, key).await?;
            }

            Step::KeyUp { key, .. } => {
                self.dispatch_key(DispatchKeyEventType::KeyUp, key).await?;
            }

            Step::Scroll { selectors, x, y } => {
                let script = if selectors.is_empty() {
                    format!("window.scrollTo({}, {})", x, y)
                } else {
                    let (_, css) = self.find_element_with_fallback(selectors, timeout).await?;
                    format!(
                        "document.querySelector({}).scrollTo({}, {})",
                        js_string(&css),
                        x,
                        y
                    )
                };
                self.execute_script(&script).await?;
            }

            Step::WaitForElement {
                selectors,
                operator,
                count,
                visible,
                ..
            } => {
                if *operator == CountOperator::AtLeast && *count == 1 && visible.is_none() {
                    self.find_element_with_fallback(selectors, timeout).await?;
                } else {
                    self.wait_for_element_count(selectors, *operator, *count, *visible, timeout)
                        .await?;
                }
            }

            Step::WaitForExpression { expression, .. } => {
                self.wait_for_expression(expression, timeout).await?;
            }

            Step::EmulateNetworkConditions {
                download,
                upload,
                latency,
            } => {
                let params = EmulateNetworkConditionsParams::new(false, *latency, *download, *upload);
                self.page.execute(params).await.map_err(|e| {
                    FlowEngineError::StepExecution(format!("Network emulation failed: {}", e))
                })?;
            }

            // Closing the page would end the capture it is bound to
            Step::Close => {
                debug!("Skipping close step; page stays open until teardown");
            }

            Step::CustomStep { name, parameters } => {
                debug!("Custom step {} with {:?} has no handler, skipping", name, parameters);
            }
        }

        if step.expects_navigation() && !step.is_navigation() {
            debug!("Waiting for navigation triggered by {}", step.kind());
            tokio::time::timeout(timeout, self.page.wait_for_navigation())
                .await
                .map_err(|_| FlowEngineError::Timeout {
                    condition: "navigation".to_string(),
                    details: format!("after {} step", step.kind()),
                })?
                .map_err(|e| FlowEngineError::Navigation(e.to_string()))?;
        }

        Ok(())
    }

    /// Navigate to a URL
    pub async fn navigate(&self, url: &str) -> FlowResult<()> {
        info!("Navigating to: {}", url);

        self.page
            .goto(url)
            .await
            .map_err(|e| FlowEngineError::Navigation(format!("Failed to navigate to {}: {}", url, e)))?;

        Ok(())
    }

    async fn set_viewport(
        &self,
        width: u32,
        height: u32,
        device_scale_factor: f64,
        mobile: bool,
        has_touch: bool,
    ) -> FlowResult<()> {
        debug!("Setting viewport to {}x{}", width, height);
        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(width))
            .height(i64::from(height))
            .device_scale_factor(device_scale_factor)
            .mobile(mobile)
            .build()
            .map_err(FlowEngineError::StepExecution)?;
        self.page
            .execute(metrics)
            .await
            .map_err(|e| FlowEngineError::StepExecution(format!("Viewport change failed: {}", e)))?;
        self.page
            .execute(SetTouchEmulationEnabledParams::new(has_touch))
            .await
            .map_err(|e| FlowEngineError::StepExecution(format!("Touch emulation failed: {}", e)))?;
        Ok(())
    }

    async fn change(&self, selectors: &[Selector], value: &str, timeout: Duration) -> FlowResult<()> {
        let (element, css) = self.find_element_with_fallback(selectors, timeout).await?;

        // <select> elements cannot be typed into
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({css});
                if (!el || el.tagName !== 'SELECT') return false;
                el.value = {value};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()"#,
            css = js_string(&css),
            value = js_string(value),
        );
        if self.execute_script(&script).await?.as_bool() == Some(true) {
            return Ok(());
        }

        element
            .click()
            .await
            .map_err(|e| FlowEngineError::StepExecution(format!("Click for change failed: {}", e)))?;
        if let Err(e) = self
            .page
            .evaluate("document.execCommand('selectAll', false, null)")
            .await
        {
            debug!("Select-all before typing failed, value may be appended: {}", e);
        }
        element
            .type_str(value)
            .await
            .map_err(|e| FlowEngineError::StepExecution(format!("Type failed: {}", e)))?;
        Ok(())
    }

    /// Click through chromiumoxide for a plain left click, otherwise dispatch
    /// raw CDP mouse events at the element's clickable point
    async fn click_element(
        &self,
        element: &Element,
        button: MouseButton,
        click_count: i64,
    ) -> FlowResult<()> {
        let failed = |e: chromiumoxide::error::CdpError| {
            FlowEngineError::StepExecution(format!("Click failed: {}", e))
        };

        if button == MouseButton::Primary && click_count == 1 {
            element.click().await.map_err(failed)?;
            return Ok(());
        }

        element.scroll_into_view().await.map_err(failed)?;
        let point = element.clickable_point().await.map_err(failed)?;
        let cdp_button = cdp_mouse_button(button);

        let moved = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseMoved)
            .x(point.x)
            .y(point.y)
            .build()
            .map_err(FlowEngineError::StepExecution)?;
        self.page.execute(moved).await.map_err(failed)?;

        for count in 1..=click_count {
            for kind in [
                DispatchMouseEventType::MousePressed,
                DispatchMouseEventType::MouseReleased,
            ] {
                let params = DispatchMouseEventParams::builder()
                    .r#type(kind)
                    .x(point.x)
                    .y(point.y)
                    .button(cdp_button.clone())
                    .click_count(count)
                    .build()
                    .map_err(FlowEngineError::StepExecution)?;
                self.page.execute(params).await.map_err(failed)?;
            }
        }
        Ok(())
    }

    async fn dispatch_key(&self, kind: DispatchKeyEventType, key: &str) -> FlowResult<()> {
        let is_down = matches!(kind, DispatchKeyEventType::KeyDown);
        let mut builder = DispatchKeyEventParams::builder().r#type(kind).key(key);
        if let Some(code) = virtual_key_code(key) {
            builder = builder.windows_virtual_key_code(code);
        }
        if is_down {
            if let Some(text) = key_text(key) {
                builder = builder.text(text);
            }
        }
        let params = builder.build().map_err(FlowEngineError::StepExecution)?;
        self.page
            .execute(params)
            .await
            .map_err(|e| FlowEngineError::StepExecution(format!("Key event {} failed: {}", key, e)))?;
        Ok(())
    }

    async fn wait_for_expression(&self, expression: &str, timeout: Duration) -> FlowResult<()> {
        let script = format!("Boolean({})", expression);
        let start = Instant::now();
        while start.elapsed() < timeout {
            if self.execute_script(&script).await?.as_bool() == Some(true) {
                return Ok(());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        Err(FlowEngineError::Timeout {
            condition: "expression".to_string(),
            details: expression.to_string(),
        })
    }

    /// Poll until the number of elements matching the primary selector
    /// satisfies `operator` against `expected`
    async fn wait_for_element_count(
        &self,
        selectors: &[Selector],
        operator: CountOperator,
        expected: u32,
        visible: Option<bool>,
        timeout: Duration,
    ) -> FlowResult<()> {
        let Some(raw) = selectors.iter().find_map(Selector::target) else {
            return Err(FlowEngineError::ElementNotFound {
                selector: "<empty selector>".to_string(),
            });
        };
        let script = element_count_script(raw, visible);
        let start = Instant::now();

        loop {
            let actual = self
                .execute_script(&script)
                .await?
                .as_u64()
                .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
                .unwrap_or(0);
            if operator.matches(actual, expected) {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(FlowEngineError::Timeout {
                    condition: "element count".to_string(),
                    details: format!("{} {:?} {} (found {})", raw, operator, expected, actual),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Get current page URL
    pub async fn get_url(&self) -> FlowResult<String> {
        let result = self
            .page
            .evaluate("window.location.href")
            .await
            .map_err(|e| FlowEngineError::Navigation(format!("Failed to get URL: {}", e)))?;

        result
            .into_value::<String>()
            .map_err(|e| FlowEngineError::Navigation(format!("Failed to parse URL: {}", e)))
    }

    /// Execute JavaScript and return result
    pub async fn execute_script(&self, script: &str) -> FlowResult<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| FlowEngineError::StepExecution(format!("Script execution failed: {}", e)))?;

        // If the script returns undefined/void, return null instead of error
        Ok(result
            .into_value::<serde_json::Value>()
            .unwrap_or(serde_json::Value::Null))
    }

    /// Try every selector in order until one matches, retrying with backoff
    /// until `timeout` elapses. Returns the element and the CSS that found it.
    async fn find_element_with_fallback(
        &self,
        selectors: &[Selector],
        timeout: Duration,
    ) -> FlowResult<(Element, String)> {
        let start = Instant::now();
        let mut delay = POLL_INTERVAL;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            for selector in selectors {
                let Some(raw) = selector.target() else {
                    continue;
                };
                let css = match self.selector_to_css(raw).await {
                    Ok(css) => css,
                    Err(_) => continue,
                };
                if let Ok(element) = self.page.find_element(css.as_str()).await {
                    if attempt > 1 {
                        debug!("Found element after {} attempts: {}", attempt, raw);
                    }
                    return Ok((element, css));
                }
            }

            if start.elapsed() + delay > timeout {
                break;
            }
            tokio::time::sleep(delay).await;
            delay = std::cmp::min(delay * 2, MAX_LOOKUP_DELAY);
        }

        let tried = selectors
            .iter()
            .filter_map(Selector::target)
            .collect::<Vec<_>>()
            .join(" | ");
        match self.get_url().await {
            Ok(url) => warn!("Element lookup failed on {}: {}", url, tried),
            Err(_) => warn!("Element lookup failed: {}", tried),
        }

        Err(FlowEngineError::ElementNotFound { selector: tried })
    }

    /// Convert a recorder selector to a CSS selector string
    pub async fn selector_to_css(&self, raw: &str) -> FlowResult<String> {
        match selector_query(raw) {
            SelectorQuery::Css(css) => Ok(css),
            SelectorQuery::XPath(xpath) => self.xpath_to_css(&xpath).await,
        }
    }

    /// Runtime conversion from XPath to CSS via JS
    async fn xpath_to_css(&self, xpath: &str) -> FlowResult<String> {
        let script = format!(
            r#"(function() {{
                try {{
                    const el = document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
                    if (!el) return null;
                    if (el.id) return '#' + CSS.escape(el.id);
                    let path = [];
                    let current = el;
                    while (current && current.nodeType === Node.ELEMENT_NODE) {{
                        let selector = current.nodeName.toLowerCase();
                        if (current.id) {{
                            path.unshift('#' + CSS.escape(current.id));
                            break;
                        }}
                        let sib = current;
                        let nth = 1;
                        while (sib = sib.previousElementSibling) {{
                            if (sib.nodeName.toLowerCase() == selector) nth++;
                        }}
                        if (nth != 1) selector += ':nth-of-type(' + nth + ')';
                        path.unshift(selector);
                        current = current.parentNode;
                    }}
                    return path.join(' > ') || null;
                }} catch (e) {{
                    return null;
                }}
            }})()"#,
            js_string(xpath)
        );

        let result = self.execute_script(&script).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| FlowEngineError::ElementNotFound {
                selector: format!("xpath: {}", xpath),
            })
    }
}

/// Query language a recorder selector resolves to in the page
#[derive(Debug, PartialEq)]
enum SelectorQuery {
    Css(String),
    XPath(String),
}

fn selector_query(raw: &str) -> SelectorQuery {
    let (kind, value) = SelectorType::parse(raw);
    match kind {
        SelectorType::Css | SelectorType::Pierce => SelectorQuery::Css(value.to_string()),
        SelectorType::Aria => SelectorQuery::Css(format!("[aria-label={}]", js_string(value))),
        SelectorType::XPath => SelectorQuery::XPath(value.to_string()),
        SelectorType::Text => SelectorQuery::XPath(format!(
            "//*[normalize-space(text())={}]",
            xpath_literal(value)
        )),
    }
}

/// Script returning how many elements match `raw`, optionally only those
/// whose visibility equals `visible`
fn element_count_script(raw: &str, visible: Option<bool>) -> String {
    let collect = match selector_query(raw) {
        SelectorQuery::Css(css) => format!(
            "document.querySelectorAll({}).forEach(n => nodes.push(n));",
            js_string(&css)
        ),
        SelectorQuery::XPath(xpath) => format!(
            "const r = document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
             for (let i = 0; i < r.snapshotLength; i++) nodes.push(r.snapshotItem(i));",
            js_string(&xpath)
        ),
    };
    let visible = match visible {
        Some(v) => v.to_string(),
        None => "null".to_string(),
    };
    format!(
        r#"(() => {{
            const nodes = [];
            try {{ {collect} }} catch (e) {{ return 0; }}
            const want = {visible};
            const isVisible = (el) => {{
                const style = getComputedStyle(el);
                const box = el.getBoundingClientRect();
                return style.visibility !== 'hidden' && style.display !== 'none' && box.width > 0 && box.height > 0;
            }};
            return nodes.filter((el) => want === null || isVisible(el) === want).length;
        }})()"#
    )
}

fn cdp_mouse_button(button: MouseButton) -> CdpMouseButton {
    match button {
        MouseButton::Primary => CdpMouseButton::Left,
        MouseButton::Auxiliary => CdpMouseButton::Middle,
        MouseButton::Secondary => CdpMouseButton::Right,
        MouseButton::Back => CdpMouseButton::Back,
        MouseButton::Forward => CdpMouseButton::Forward,
    }
}

/// Quote a value as a JavaScript string literal
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Quote a value as an XPath string literal
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }
    let parts: Vec<String> = value.split('\'').map(|p| format!("'{}'", p)).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

fn virtual_key_code(key: &str) -> Option<i64> {
    let code = match key {
        "Enter" => 13,
        "Tab" => 9,
        "Escape" => 27,
        "Backspace" => 8,
        "Delete" => 46,
        "ArrowLeft" => 37,
        "ArrowUp" => 38,
        "ArrowRight" => 39,
        "ArrowDown" => 40,
        " " => 32,
        _ => return None,
    };
    Some(code)
}

/// Text a key inserts when pressed, if any
fn key_text(key: &str) -> Option<&str> {
    match key {
        "Enter" => Some("\r"),
        k if k.chars().count() == 1 => Some(k),
        _ => None,
    }
}
