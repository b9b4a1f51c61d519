//! The `run` command: start every pipeline, wait for a signal, drain.

use crate::config::AppConfig;
use crate::connect::KafkaParquetFactory;
use anyhow::Context;
use city_sync_pipeline::{ConnectorFactory, ShutdownReport, Supervisor};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Run all configured pipelines until SIGINT/SIGTERM and return the exit code.
pub async fn run_pipelines(config: &AppConfig) -> anyhow::Result<i32> {
    let factory = KafkaParquetFactory::from_config(config)?;
    let report = run_with_factory(config, Arc::new(factory), wait_for_signal).await?;
    print_report(&report)?;
    Ok(report.exit_code())
}

/// Run with the given connectors until `shutdown` resolves or every pipeline
/// has ended on its own.
pub async fn run_with_factory<F, Fut>(
    config: &AppConfig,
    factory: Arc<dyn ConnectorFactory>,
    shutdown: F,
) -> anyhow::Result<ShutdownReport>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let registry = config.schema_registry()?;
    let storage = config.checkpoint_storage()?;
    let store = storage.open().await;
    let topics = config.topic_configs();

    info!(
        topics = topics.len(),
        bus = %config.bus_endpoint,
        checkpoints = %storage,
        sink_root = %config.sink_root,
        "Starting city-sync"
    );

    let mut supervisor = Supervisor::new(
        Arc::new(registry),
        factory,
        store,
        config.pipeline_settings(),
    );
    supervisor.start(topics);

    let token = supervisor.shutdown_token();
    let signal = tokio::spawn(shutdown(token.clone()));

    let report = supervisor.await_all().await;
    signal.abort();
    if !token.is_cancelled() {
        info!("Every pipeline ended before a shutdown was requested");
    }
    Ok(report)
}

/// Cancel `token` on Ctrl+C or SIGTERM.
pub async fn wait_for_signal(token: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Received interrupt signal (Ctrl+C), draining pipelines"),
                Err(e) => {
                    tracing::warn!("Failed to listen for Ctrl+C: {e}");
                    return;
                }
            }
        }
        _ = terminate => info!("Received SIGTERM, draining pipelines"),
        _ = token.cancelled() => return,
    }
    token.cancel();
}

/// Print one line per pipeline: final state, error and metrics as JSON.
pub fn print_report(report: &ShutdownReport) -> anyhow::Result<()> {
    for outcome in &report.outcomes {
        let metrics = serde_json::to_string(&outcome.metrics)
            .with_context(|| format!("Failed to serialize metrics of {}", outcome.name))?;
        match &outcome.error {
            Some(e) => println!("{}: {} ({e}) {metrics}", outcome.name, outcome.state),
            None => println!("{}: {} {metrics}", outcome.name, outcome.state),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use city_sync_file_sink::{SinkError, SinkWriter};
    use city_sync_kafka_source::{SourceError, SourceReader};
    use city_sync_pipeline::{PipelineState, TopicConfig};
    use sync_core::Schema;

    struct NoConnectors;

    #[async_trait]
    impl ConnectorFactory for NoConnectors {
        async fn open_source(
            &self,
            topic: &TopicConfig,
        ) -> Result<Box<dyn SourceReader>, SourceError> {
            Err(SourceError::Fatal(format!("{} is unreachable", topic.name)))
        }

        async fn open_sink(
            &self,
            topic: &TopicConfig,
            _schema: Arc<Schema>,
        ) -> Result<Box<dyn SinkWriter>, SinkError> {
            Err(SinkError::InvalidLocation(topic.name.clone()))
        }
    }

    #[tokio::test]
    async fn test_run_ends_when_every_pipeline_failed() {
        let config = AppConfig::from_toml(
            "checkpoint_location = \"memory://\"\nsink_root = \"/tmp/unused\"\n",
        )
        .unwrap();

        let report = run_with_factory(&config, Arc::new(NoConnectors), |_| {
            std::future::pending::<()>()
        })
        .await
        .unwrap();

        assert_eq!(report.outcomes.len(), 5);
        assert!(report
            .outcomes
            .iter()
            .all(|o| o.state == PipelineState::Failed));
        assert_eq!(report.exit_code(), 1);
        print_report(&report).unwrap();
    }
}
