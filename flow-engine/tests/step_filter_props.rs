use flow_engine::{Flow, Step, StepFilter, StepKind};
use proptest::prelude::*;

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        "[a-z]{1,8}".prop_map(|host| Step::Navigate {
            url: format!("https://{}.test/", host),
            timeout: None,
            asserted_events: Vec::new(),
        }),
        (1u32..4000, 1u32..4000).prop_map(|(width, height)| Step::SetViewport {
            width,
            height,
            device_scale_factor: 1.0,
            is_mobile: false,
            has_touch: false,
            is_landscape: false,
        }),
        "[a-zA-Z]".prop_map(|key| Step::KeyDown {
            key,
            asserted_events: Vec::new(),
        }),
        (-500.0f64..500.0).prop_map(|y| Step::Scroll {
            selectors: Vec::new(),
            x: 0.0,
            y,
        }),
        Just(Step::Close),
    ]
}

fn arb_flow() -> impl Strategy<Value = Flow> {
    prop::collection::vec(arb_step(), 0..40).prop_map(|steps| Flow::new("generated", steps))
}

proptest! {
    #[test]
    fn prop_filter_removes_all_navigation(flow in arb_flow()) {
        let filtered = StepFilter::new(true).apply(&flow);
        prop_assert!(filtered.steps.iter().all(|s| s.kind() != StepKind::Navigate));
    }

    #[test]
    fn prop_filter_preserves_relative_order(flow in arb_flow()) {
        let filtered = StepFilter::new(true).apply(&flow);
        let expected: Vec<Step> = flow
            .steps
            .iter()
            .filter(|s| !s.is_navigation())
            .cloned()
            .collect();
        prop_assert_eq!(filtered.steps, expected);
        prop_assert_eq!(filtered.title, flow.title);
    }

    #[test]
    fn prop_disabled_filter_is_identity(flow in arb_flow()) {
        prop_assert_eq!(StepFilter::default().apply(&flow), flow);
    }
}
