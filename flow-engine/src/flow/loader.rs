//! Flow loading and validation

use crate::error::{FlowEngineError, FlowResult};
use crate::flow::model::{Flow, Step};
use std::path::Path;
use tracing::debug;
use url::Url;

/// Read a recorder export from disk, attach its source path and validate it
pub fn load_flow(path: &Path) -> FlowResult<Flow> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        FlowEngineError::Configuration(format!("cannot read flow {:?}: {}", path, e))
    })?;
    let mut flow = parse_flow(&raw, path)?;
    flow.source = Some(path.to_path_buf());
    validate_flow(&flow, path)?;
    debug!("Loaded flow {:?} ({} steps)", path, flow.step_count());
    Ok(flow)
}

fn parse_flow(raw: &str, path: &Path) -> FlowResult<Flow> {
    serde_json::from_str(raw).map_err(|source| FlowEngineError::FlowParse {
        path: path.to_path_buf(),
        source,
    })
}

fn validate_flow(flow: &Flow, path: &Path) -> FlowResult<()> {
    let invalid = |index: usize, reason: String| FlowEngineError::InvalidFlow {
        path: path.to_path_buf(),
        reason: format!("step {}: {}", index + 1, reason),
    };

    for (i, step) in flow.steps.iter().enumerate() {
        match step {
            Step::Navigate { url, .. } => {
                Url::parse(url).map_err(|e| invalid(i, format!("bad url {:?}: {}", url, e)))?;
            }
            Step::SetViewport { width, height, .. } if *width == 0 || *height == 0 => {
                return Err(invalid(i, format!("empty viewport {}x{}", width, height)));
            }
            Step::Click { selectors, .. }
            | Step::DoubleClick { selectors, .. }
            | Step::Hover { selectors, .. }
            | Step::Change { selectors, .. }
            | Step::WaitForElement { selectors, .. }
                if selectors.is_empty() =>
            {
                return Err(invalid(i, format!("{} step has no selectors", step.kind())));
            }
            _ => {}
        }
    }
    Ok(())
}
