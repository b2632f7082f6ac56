use crate::{
    interval::IntervalConfig,
    mocn::MocnClassifier,
    monitor::Monitor,
    observation::ObservationStore,
    radio::FileRadio,
    telemetry, Settings,
};
use anyhow::Result;
use futures::StreamExt;
use std::sync::Arc;
use tokio::signal;

#[derive(Debug, clap::Args)]
pub struct Cmd {}

impl Cmd {
    pub async fn run(self, settings: &Settings) -> Result<()> {
        if let Some(metrics) = &settings.metrics {
            telemetry::start_metrics(metrics)?;
        }

        let pool = crate::connect(settings).await?;
        let store = ObservationStore::new(pool.clone());
        let interval = IntervalConfig::new(pool);

        let radio = Arc::new(FileRadio::from_settings(&settings.radio));
        tracing::info!(snapshot = %radio.path().display(), "using radio snapshot");

        let monitor = Monitor::new(
            radio.clone(),
            radio,
            MocnClassifier::new(settings.cell_attribution),
            store,
            interval.clone(),
        );
        monitor.start().await?;

        let (trigger, shutdown) = triggered::trigger();
        let interval_log = tokio::spawn(log_interval_changes(interval, shutdown));

        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("received SIGTERM"),
            _ = signal::ctrl_c() => tracing::info!("received ctrl-c"),
        }

        trigger.trigger();
        monitor.stop().await;
        interval_log.await?;
        Ok(())
    }
}

async fn log_interval_changes(interval: IntervalConfig, shutdown: triggered::Listener) {
    let mut changes = interval.watch();
    loop {
        tokio::select! {
            _ = shutdown.clone() => break,
            seconds = changes.next() => match seconds {
                Some(seconds) => {
                    telemetry::refresh_interval(seconds);
                    tracing::info!(seconds, "refresh interval");
                }
                None => break,
            }
        }
    }
}
