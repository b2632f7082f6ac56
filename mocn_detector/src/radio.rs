//! Seams to the device radio and the host permission model.
//!
//! Radio queries never fail: anything the radio cannot answer is reported as
//! absent (no home network, no cells, no subscriptions).

use crate::mocn::VisibleCell;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub type SubscriptionId = i32;

#[async_trait::async_trait]
pub trait RadioSource: Send + Sync + 'static {
    async fn active_subscriptions(&self) -> Vec<SubscriptionId>;

    /// `mcc` + `mnc` of the SIM for the subscription, e.g. "23415".
    async fn home_network_id(&self, subscription: SubscriptionId) -> Option<String>;

    async fn visible_cells(&self, subscription: SubscriptionId) -> Vec<VisibleCell>;
}

/// Answered synchronously from the async path, so implementations must not
/// wait on anything slower than a local filesystem stat.
pub trait PermissionCheck: Send + Sync + 'static {
    fn has_required_permissions(&self) -> bool;
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Path of the JSON radio snapshot kept up to date by the modem tooling.
    /// Default "/var/run/mocn/radio.json"
    #[serde(default = "default_snapshot")]
    pub snapshot: PathBuf,
}

pub fn default_snapshot() -> PathBuf {
    PathBuf::from("/var/run/mocn/radio.json")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            snapshot: default_snapshot(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RadioSnapshot {
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionSnapshot>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionSnapshot {
    pub id: SubscriptionId,
    pub home_network_id: Option<String>,
    #[serde(default)]
    pub cells: Vec<VisibleCell>,
}

impl RadioSnapshot {
    fn subscription(&self, id: SubscriptionId) -> Option<&SubscriptionSnapshot> {
        self.subscriptions
            .iter()
            .find(|subscription| subscription.id == id)
    }
}

/// Radio backed by a JSON snapshot file that is re-read on every query.
#[derive(Debug, Clone)]
pub struct FileRadio {
    path: PathBuf,
}

impl FileRadio {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.snapshot.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn snapshot(&self) -> RadioSnapshot {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), ?err, "unable to read radio snapshot");
                return RadioSnapshot::default();
            }
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|err| {
            tracing::warn!(path = %self.path.display(), ?err, "unable to decode radio snapshot");
            RadioSnapshot::default()
        })
    }
}

#[async_trait::async_trait]
impl RadioSource for FileRadio {
    async fn active_subscriptions(&self) -> Vec<SubscriptionId> {
        self.snapshot()
            .await
            .subscriptions
            .iter()
            .map(|subscription| subscription.id)
            .collect()
    }

    async fn home_network_id(&self, subscription: SubscriptionId) -> Option<String> {
        self.snapshot()
            .await
            .subscription(subscription)
            .and_then(|subscription| subscription.home_network_id.clone())
    }

    async fn visible_cells(&self, subscription: SubscriptionId) -> Vec<VisibleCell> {
        self.snapshot()
            .await
            .subscription(subscription)
            .map(|subscription| subscription.cells.clone())
            .unwrap_or_default()
    }
}

impl PermissionCheck for FileRadio {
    fn has_required_permissions(&self) -> bool {
        // a stat plus an open; the snapshot itself is only read asynchronously
        std::fs::metadata(&self.path).is_ok_and(|metadata| metadata.is_file())
            && std::fs::File::open(&self.path).is_ok()
    }
}
