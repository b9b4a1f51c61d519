//! Starts one pipeline per topic partition and coordinates their shutdown.

use crate::config::{PipelineSettings, TopicConfig};
use crate::error::PipelineError;
use crate::handle::{PipelineControl, PipelineHandle, PipelineOutcome, PipelineState};
use crate::health::Health;
use crate::metrics::MetricsSnapshot;
use crate::pipeline::TopicPipeline;
use async_trait::async_trait;
use checkpoint::CheckpointStore;
use city_sync_file_sink::{SinkError, SinkWriter};
use city_sync_kafka_source::{SourceError, SourceReader};
use std::sync::Arc;
use sync_core::{Schema, SchemaRegistry, TopicDescriptor};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Opens the source and sink of a topic.
///
/// Called from inside the pipeline task, so a topic whose connectors cannot
/// be opened fails on its own without holding up the others.
#[async_trait]
pub trait ConnectorFactory: Send + Sync {
    async fn open_source(&self, topic: &TopicConfig) -> Result<Box<dyn SourceReader>, SourceError>;

    async fn open_sink(
        &self,
        topic: &TopicConfig,
        schema: Arc<Schema>,
    ) -> Result<Box<dyn SinkWriter>, SinkError>;
}

/// Owns every pipeline of the process.
pub struct Supervisor {
    registry: Arc<SchemaRegistry>,
    factory: Arc<dyn ConnectorFactory>,
    store: Arc<dyn CheckpointStore>,
    settings: PipelineSettings,
    shutdown: CancellationToken,
    handles: Vec<PipelineHandle>,
    tasks: Vec<(String, JoinHandle<PipelineOutcome>)>,
}

impl Supervisor {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        factory: Arc<dyn ConnectorFactory>,
        store: Arc<dyn CheckpointStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            registry,
            factory,
            store,
            settings,
            shutdown: CancellationToken::new(),
            handles: Vec::new(),
            tasks: Vec::new(),
        }
    }

    /// Spawn one pipeline per topic partition and return their handles.
    ///
    /// Pipelines start independently; an unknown topic or a broken connector
    /// shows up as that pipeline's `FAILED` outcome.
    pub fn start(&mut self, topics: Vec<TopicConfig>) -> Vec<PipelineHandle> {
        let mut started = Vec::with_capacity(topics.len());

        for topic in topics {
            let name = topic.pipeline_name();
            let control = PipelineControl::new(&name, self.shutdown.child_token());
            let handle = control.handle();

            let registry = Arc::clone(&self.registry);
            let factory = Arc::clone(&self.factory);
            let store = Arc::clone(&self.store);
            let settings = self.settings.clone();

            tracing::info!(pipeline = %name, "Starting pipeline");
            let task = tokio::spawn(async move {
                let pipeline =
                    match build_pipeline(&registry, factory.as_ref(), store, settings, &topic, control)
                        .await
                    {
                        Ok(pipeline) => pipeline,
                        Err((control, e)) => return control.fail(e),
                    };
                pipeline.run().await
            });

            self.tasks.push((name, task));
            self.handles.push(handle.clone());
            started.push(handle);
        }

        started
    }

    /// Ask every pipeline to drain and stop.
    pub fn request_shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::info!(pipelines = self.handles.len(), "Shutdown requested");
        }
        self.shutdown.cancel();
    }

    /// Token cancelled on shutdown; signal handlers cancel it too.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn handles(&self) -> &[PipelineHandle] {
        &self.handles
    }

    /// Health of every started pipeline, by pipeline name.
    pub fn health(&self) -> Vec<(String, Health)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.health()))
            .collect()
    }

    /// Wait for every pipeline to reach a terminal state.
    ///
    /// Does not request shutdown itself; pipelines that were never asked to
    /// stop keep this waiting until they fail.
    pub async fn await_all(&mut self) -> ShutdownReport {
        let mut outcomes = Vec::with_capacity(self.tasks.len());

        for (name, task) in self.tasks.drain(..) {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(pipeline = %name, error = %e, "Pipeline task did not complete");
                    PipelineOutcome {
                        name,
                        state: PipelineState::Failed,
                        error: Some(PipelineError::Aborted(e.to_string())),
                        metrics: MetricsSnapshot::default(),
                    }
                }
            };
            outcomes.push(outcome);
        }
        self.handles.clear();

        let report = ShutdownReport { outcomes };
        report.log_summary();
        report
    }
}

async fn build_pipeline(
    registry: &SchemaRegistry,
    factory: &dyn ConnectorFactory,
    store: Arc<dyn CheckpointStore>,
    settings: PipelineSettings,
    topic: &TopicConfig,
    control: PipelineControl,
) -> Result<TopicPipeline, (PipelineControl, PipelineError)> {
    let descriptor = match describe_topic(registry, topic) {
        Ok(descriptor) => descriptor,
        Err(e) => return Err((control, e)),
    };

    let source = match factory.open_source(topic).await {
        Ok(source) => source,
        Err(e) => return Err((control, e.into())),
    };
    let sink = match factory
        .open_sink(topic, Arc::clone(&descriptor.schema))
        .await
    {
        Ok(sink) => sink,
        Err(e) => return Err((control, e.into())),
    };

    Ok(TopicPipeline::new(
        descriptor, topic, settings, source, sink, store, control,
    ))
}

fn describe_topic(
    registry: &SchemaRegistry,
    topic: &TopicConfig,
) -> Result<TopicDescriptor, PipelineError> {
    let schema = registry.get_schema(&topic.name)?;
    let descriptor = TopicDescriptor::new(
        &topic.name,
        schema,
        &topic.watermark_field,
        topic.allowed_lateness,
    )?;
    Ok(descriptor)
}

/// Terminal outcomes of all pipelines.
#[derive(Debug)]
pub struct ShutdownReport {
    pub outcomes: Vec<PipelineOutcome>,
}

impl ShutdownReport {
    /// True when every pipeline reached `STOPPED`.
    pub fn is_success(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.state == PipelineState::Stopped)
    }

    pub fn failed(&self) -> impl Iterator<Item = &PipelineOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    /// Process exit status: 0 if all pipelines stopped cleanly, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// Outcome of the pipeline named `<topic>-<partition>`.
    pub fn outcome(&self, name: &str) -> Option<&PipelineOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    fn log_summary(&self) {
        for outcome in &self.outcomes {
            match &outcome.error {
                Some(e) => tracing::error!(
                    pipeline = %outcome.name,
                    state = %outcome.state,
                    error = %e,
                    "Pipeline finished"
                ),
                None => tracing::info!(
                    pipeline = %outcome.name,
                    state = %outcome.state,
                    consumed = outcome.metrics.messages_consumed,
                    written = outcome.metrics.records_written,
                    decode_failures = outcome.metrics.decode_failures,
                    late_drops = outcome.metrics.late_drops,
                    "Pipeline finished"
                ),
            }
        }
        tracing::info!(
            pipelines = self.outcomes.len(),
            failed = self.failed().count(),
            "All pipelines finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(name: &str, state: PipelineState) -> PipelineOutcome {
        PipelineOutcome {
            name: name.to_string(),
            state,
            error: None,
            metrics: MetricsSnapshot::default(),
        }
    }

    #[test]
    fn test_exit_code() {
        let ok = ShutdownReport {
            outcomes: vec![
                outcome("gps_data-0", PipelineState::Stopped),
                outcome("weather_data-0", PipelineState::Stopped),
            ],
        };
        assert_eq!(ok.exit_code(), 0);

        let failed = ShutdownReport {
            outcomes: vec![
                outcome("gps_data-0", PipelineState::Stopped),
                outcome("weather_data-0", PipelineState::Failed),
            ],
        };
        assert_eq!(failed.exit_code(), 1);
        assert_eq!(failed.failed().count(), 1);
        assert!(failed.outcome("weather_data-0").unwrap().is_failed());
    }

    #[test]
    fn test_empty_report_is_success() {
        assert_eq!(ShutdownReport { outcomes: vec![] }.exit_code(), 0);
    }

    #[test]
    fn test_describe_topic_errors() {
        let registry = SchemaRegistry::builtin();

        let err = describe_topic(&registry, &TopicConfig::new("parking_data")).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownTopic(t) if t == "parking_data"));

        let mut config = TopicConfig::new("gps_data");
        config.watermark_field = "speed".to_string();
        let err = describe_topic(&registry, &config).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTopic(_)));
    }
}
