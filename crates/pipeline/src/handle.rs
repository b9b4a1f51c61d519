//! Pipeline states and the handles used to observe and stop pipelines.

use crate::error::PipelineError;
use crate::health::Health;
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Lifecycle of a topic pipeline.
///
/// `STARTING → RUNNING → DRAINING → STOPPED`; `FAILED` is reachable from any
/// non-terminal state. `STOPPED` and `FAILED` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Starting,
    Running,
    Draining,
    Stopped,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Stopped | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Starting => "STARTING",
            PipelineState::Running => "RUNNING",
            PipelineState::Draining => "DRAINING",
            PipelineState::Stopped => "STOPPED",
            PipelineState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Terminal report of one pipeline.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Pipeline name, `<topic>-<partition>`
    pub name: String,
    pub state: PipelineState,
    /// Cause of `FAILED`
    pub error: Option<PipelineError>,
    pub metrics: MetricsSnapshot,
}

impl PipelineOutcome {
    pub fn is_failed(&self) -> bool {
        self.state == PipelineState::Failed
    }
}

/// Pipeline-side end of the control channel: publishes state, watches for stop.
#[derive(Debug)]
pub struct PipelineControl {
    name: String,
    stop: CancellationToken,
    state: watch::Sender<PipelineState>,
    metrics: Arc<PipelineMetrics>,
}

impl PipelineControl {
    /// New control in `STARTING`, stopped through `stop` (or any of its parents).
    pub fn new(name: impl Into<String>, stop: CancellationToken) -> Self {
        let (state, _) = watch::channel(PipelineState::Starting);
        Self {
            name: name.into(),
            stop,
            state,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    pub fn handle(&self) -> PipelineHandle {
        PipelineHandle {
            name: self.name.clone(),
            stop: self.stop.clone(),
            state: self.state.subscribe(),
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Pipeline name, `<topic>-<partition>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Resolves once a stop has been requested.
    pub async fn stopped(&self) {
        self.stop.cancelled().await
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Move to `next`, logging the transition. Terminal states are never left.
    pub fn transition(&self, next: PipelineState) {
        let previous = self.state();
        if previous.is_terminal() || previous == next {
            return;
        }
        self.state.send_replace(next);
        tracing::info!(
            pipeline = %self.name,
            from = %previous,
            to = %next,
            "Pipeline state changed"
        );
    }

    /// Finish in `FAILED` with `error`.
    pub fn fail(&self, error: PipelineError) -> PipelineOutcome {
        tracing::error!(pipeline = %self.name, error = %error, "Pipeline failed");
        self.transition(PipelineState::Failed);
        self.outcome(Some(error))
    }

    pub fn outcome(&self, error: Option<PipelineError>) -> PipelineOutcome {
        PipelineOutcome {
            name: self.name.clone(),
            state: self.state(),
            error,
            metrics: self.metrics.snapshot(),
        }
    }
}

/// Supervisor's view of a running pipeline. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PipelineHandle {
    name: String,
    stop: CancellationToken,
    state: watch::Receiver<PipelineState>,
    metrics: Arc<PipelineMetrics>,
}

impl PipelineHandle {
    /// Pipeline name, `<topic>-<partition>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask the pipeline to drain and stop. Repeated calls are no-ops.
    pub fn request_stop(&self) {
        self.stop.cancel();
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Wait until the pipeline is `STOPPED` or `FAILED`.
    pub async fn wait_terminal(&self) -> PipelineState {
        let mut state = self.state.clone();
        let terminal = match state.wait_for(PipelineState::is_terminal).await {
            Ok(s) => *s,
            // Sender gone without a terminal state: the task died
            Err(_) => PipelineState::Failed,
        };
        terminal
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn health(&self) -> Health {
        self.metrics.health()
    }
}
