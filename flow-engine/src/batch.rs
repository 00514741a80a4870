//! Batch driver
//!
//! Resolves the input path to one or more flow files and replays them one
//! after another, each into `<output_dir>/<file stem>.mp4`.

use crate::capture::Capture;
use crate::error::{FlowEngineError, FlowResult};
use crate::flow::driver::Driver;
use crate::flow::filter::StepFilter;
use crate::flow::loader::load_flow;
use crate::flow::model::Flow;
use crate::replay::config::{BatchConfig, ReplayConfig};
use crate::replay::orchestrator::{ReplayOrchestrator, ReplayReport};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, info_span, Instrument};

/// File extension of recorder exports picked up in directory mode
pub const FLOW_EXTENSION: &str = "json";

/// File extension of produced videos
pub const VIDEO_EXTENSION: &str = "mp4";

/// Summary of a completed batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub replays: Vec<ReplayReport>,
}

impl BatchReport {
    pub fn video_count(&self) -> usize {
        self.replays.len()
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Path> {
        self.replays.iter().map(|r| r.output.as_path())
    }
}

/// List the flow files designated by `input`.
///
/// A file is returned as-is. A directory yields its `.json` entries in the
/// order the filesystem lists them; nothing is sorted.
pub fn resolve_sources(input: &Path) -> FlowResult<Vec<PathBuf>> {
    let metadata = std::fs::metadata(input).map_err(|e| {
        FlowEngineError::Configuration(format!("cannot access input path {:?}: {}", input, e))
    })?;

    if !metadata.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut sources = Vec::new();
    for entry in std::fs::read_dir(input)? {
        let path = entry?.path();
        if path.is_file() && has_flow_extension(&path) {
            sources.push(path);
        }
    }
    Ok(sources)
}

fn has_flow_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == FLOW_EXTENSION)
}

/// `<output_dir>/<stem of source>.mp4`
pub fn output_path_for(source: &Path, output_dir: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "flow".into());
    let mut path = output_dir.join(stem);
    path.set_extension(VIDEO_EXTENSION);
    path
}

/// Replays every resolved flow with one orchestrator
pub struct BatchDriver<'a, D, C> {
    orchestrator: ReplayOrchestrator<'a, D, C>,
    batch: &'a BatchConfig,
}

impl<'a, D, C> BatchDriver<'a, D, C>
where
    D: Driver,
    C: Capture<D::Page>,
{
    pub fn new(
        driver: &'a D,
        capture: &'a C,
        replay: &'a ReplayConfig,
        batch: &'a BatchConfig,
    ) -> Self {
        Self {
            orchestrator: ReplayOrchestrator::new(driver, capture, replay),
            batch,
        }
    }

    /// Load and validate everything, then replay sequentially.
    ///
    /// Every flow (and the pre-flow) is parsed before the first browser is
    /// launched. The first failing replay aborts the batch.
    pub async fn run(&self) -> FlowResult<BatchReport> {
        let started_at = Utc::now();
        let clock = tokio::time::Instant::now();

        let sources = resolve_sources(&self.batch.input_path)?;
        let filter = StepFilter::new(self.orchestrator.config().ignore_navigation);
        let flows = sources
            .iter()
            .map(|source| load_flow(source).map(|flow| filter.apply(&flow)))
            .collect::<FlowResult<Vec<Flow>>>()?;
        let pre_flow = self.orchestrator.load_pre_flow()?;

        info!(
            "Batch of {} flow(s) from {:?} into {:?}",
            flows.len(),
            self.batch.input_path,
            self.batch.output_dir
        );
        std::fs::create_dir_all(&self.batch.output_dir)?;

        let mut replays = Vec::with_capacity(flows.len());
        for (source, flow) in sources.iter().zip(&flows) {
            let output = output_path_for(source, &self.batch.output_dir);
            let span = info_span!("flow", name = %flow.display_name());
            let report = self
                .orchestrator
                .replay_filtered(flow, pre_flow.as_ref(), &output)
                .instrument(span)
                .await?;
            replays.push(report);
        }

        let report = BatchReport {
            started_at,
            elapsed: clock.elapsed(),
            replays,
        };
        info!(
            "Batch finished: {} video(s) in {}ms",
            report.video_count(),
            report.elapsed.as_millis()
        );
        Ok(report)
    }
}
