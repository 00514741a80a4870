//! Step filtering applied once before a flow is replayed

use crate::flow::model::Flow;

/// Removes step kinds from a flow without touching the original
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepFilter {
    /// Drop every `navigate` step
    pub ignore_navigation: bool,
}

impl StepFilter {
    pub fn new(ignore_navigation: bool) -> Self {
        Self { ignore_navigation }
    }

    /// Derive a new flow; kept steps retain their relative order
    pub fn apply(&self, flow: &Flow) -> Flow {
        if !self.ignore_navigation {
            return flow.clone();
        }
        Flow {
            steps: flow
                .steps
                .iter()
                .filter(|step| !step.is_navigation())
                .cloned()
                .collect(),
            ..flow.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::model::{MouseButton, Selector, Step};

    fn click(sel: &str) -> Step {
        Step::Click {
            selectors: vec![Selector::Single(sel.to_string())],
            button: MouseButton::Primary,
            offset_x: 0.0,
            offset_y: 0.0,
            timeout: None,
            asserted_events: Vec::new(),
        }
    }

    fn navigate(url: &str) -> Step {
        Step::Navigate {
            url: url.to_string(),
            timeout: None,
            asserted_events: Vec::new(),
        }
    }

    #[test]
    fn test_navigation_removed() {
        let flow = Flow::new(
            "demo",
            vec![navigate("https://a.test"), click("#a"), navigate("https://b.test"), click("#b")],
        );
        let filtered = StepFilter::new(true).apply(&flow);
        assert_eq!(filtered.steps, vec![click("#a"), click("#b")]);
        assert_eq!(filtered.title, "demo");
        // original untouched
        assert_eq!(flow.step_count(), 4);
    }

    #[test]
    fn test_disabled_filter_is_identity() {
        let flow = Flow::new("demo", vec![navigate("https://a.test"), click("#a")]);
        assert_eq!(StepFilter::default().apply(&flow), flow);
    }
}
