//! The monitoring loop: on every tick each active subscription is classified
//! and any observation produced is recorded, then the loop sleeps for the
//! currently configured interval.

use crate::{
    interval::IntervalConfig,
    mocn::MocnClassifier,
    observation::{Observation, ObservationStore, StoreError},
    radio::{PermissionCheck, RadioSource, SubscriptionId},
    telemetry,
};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

#[derive(thiserror::Error, Debug)]
pub enum MonitorError {
    #[error("radio and location permissions are not granted")]
    PermissionDenied,
}

pub struct Monitor<R, P> {
    worker: Worker<R, P>,
    state: watch::Sender<MonitorState>,
    shutdown: Mutex<Option<triggered::Trigger>>,
}

struct Worker<R, P> {
    radio: Arc<R>,
    permissions: Arc<P>,
    classifier: MocnClassifier,
    store: ObservationStore,
    interval: IntervalConfig,
}

impl<R, P> Clone for Worker<R, P> {
    fn clone(&self) -> Self {
        Self {
            radio: self.radio.clone(),
            permissions: self.permissions.clone(),
            classifier: self.classifier,
            store: self.store.clone(),
            interval: self.interval.clone(),
        }
    }
}

impl<R, P> Monitor<R, P>
where
    R: RadioSource,
    P: PermissionCheck,
{
    pub fn new(
        radio: Arc<R>,
        permissions: Arc<P>,
        classifier: MocnClassifier,
        store: ObservationStore,
        interval: IntervalConfig,
    ) -> Self {
        let (state, _) = watch::channel(MonitorState::Idle);
        Self {
            worker: Worker {
                radio,
                permissions,
                classifier,
                store,
                interval,
            },
            state,
            shutdown: Mutex::new(None),
        }
    }

    pub fn state(&self) -> MonitorState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<MonitorState> {
        self.state.subscribe()
    }

    /// Starts the loop unless it is already running. Without the required
    /// permissions the monitor moves straight to `Stopped`.
    pub async fn start(&self) -> Result<StartOutcome, MonitorError> {
        let mut shutdown = self.shutdown.lock().await;
        if self.state() == MonitorState::Running {
            tracing::debug!("already monitoring, ignoring start");
            return Ok(StartOutcome::AlreadyRunning);
        }

        if !self.worker.permissions.has_required_permissions() {
            tracing::error!("required permissions not granted, not starting monitor");
            self.state.send_replace(MonitorState::Stopped);
            return Err(MonitorError::PermissionDenied);
        }

        let (trigger, listener) = triggered::trigger();
        *shutdown = Some(trigger);
        self.state.send_replace(MonitorState::Running);

        tokio::spawn(self.worker.clone().run(listener));
        Ok(StartOutcome::Started)
    }

    /// Stops the loop, abandoning a tick in progress. Inserts already
    /// dispatched are neither cancelled nor waited for.
    pub async fn stop(&self) {
        if let Some(trigger) = self.shutdown.lock().await.take() {
            trigger.trigger();
        }
        if self.state.send_replace(MonitorState::Stopped) == MonitorState::Running {
            tracing::info!("stopped monitoring");
        }
    }
}

impl<R, P> Drop for Monitor<R, P> {
    fn drop(&mut self) {
        if let Some(trigger) = self.shutdown.get_mut().take() {
            trigger.trigger();
        }
    }
}

impl<R, P> Worker<R, P>
where
    R: RadioSource,
    P: PermissionCheck,
{
    async fn run(self, shutdown: triggered::Listener) {
        tracing::info!("started mocn monitoring");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.clone() => break,
                _ = self.tick() => (),
            }

            let seconds = self.interval.current().await;
            telemetry::refresh_interval(seconds);
            tracing::debug!(seconds, "sleeping before next check");

            tokio::select! {
                biased;
                _ = shutdown.clone() => break,
                _ = tokio::time::sleep(std::time::Duration::from_secs(seconds as u64)) => (),
            }
        }

        tracing::info!("stopping mocn monitoring");
    }

    async fn tick(&self) {
        tracing::debug!("checking for mocn");
        telemetry::tick();

        if !self.permissions.has_required_permissions() {
            tracing::debug!("permissions revoked, skipping check");
            return;
        }

        for subscription in self.radio.active_subscriptions().await {
            if let Some(observation) = self.check(subscription).await {
                self.record(observation);
            }
        }
    }

    async fn check(&self, subscription: SubscriptionId) -> Option<Observation> {
        let observation = classify_subscription(&*self.radio, &self.classifier, subscription).await;
        if observation.is_none() {
            tracing::debug!(subscription, "no serving cell to classify");
        }
        observation
    }

    fn record(&self, observation: Observation) {
        let insert = self.store.insert(observation);
        tokio::spawn(async move {
            match insert.await {
                Ok(stored) => {
                    telemetry::observation_recorded(stored.is_mocn_detected);
                    tracing::debug!(
                        id = stored.id,
                        rplmn = ?stored.rplmn,
                        is_ran_sharing = stored.is_ran_sharing(),
                        is_mocn_detected = stored.is_mocn_detected,
                        "recorded observation"
                    );
                }
                Err(StoreError::Purged) => {
                    tracing::debug!("observation purged before it was recorded");
                }
                Err(err) => {
                    telemetry::insert_failed();
                    tracing::warn!(?err, "failed to record observation");
                }
            }
        });
    }
}

/// Checks every active subscription once without recording anything.
pub async fn check_once<R>(
    radio: &R,
    classifier: &MocnClassifier,
) -> Vec<(SubscriptionId, Observation)>
where
    R: RadioSource,
{
    let mut observations = Vec::new();
    for subscription in radio.active_subscriptions().await {
        if let Some(observation) = classify_subscription(radio, classifier, subscription).await {
            observations.push((subscription, observation));
        }
    }
    observations
}

async fn classify_subscription<R>(
    radio: &R,
    classifier: &MocnClassifier,
    subscription: SubscriptionId,
) -> Option<Observation>
where
    R: RadioSource,
{
    let hplmn = radio.home_network_id(subscription).await;
    let cells = radio.visible_cells(subscription).await;
    classifier.classify(hplmn.as_deref(), &cells)
}
