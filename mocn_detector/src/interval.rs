use futures::{
    future,
    stream::{self, BoxStream},
    StreamExt,
};
use sqlx::{Pool, Sqlite};
use std::{ops::RangeInclusive, sync::Arc, time::Duration};
use tokio::sync::watch;
use tokio_stream::wrappers::{IntervalStream, WatchStream};

pub const DEFAULT_INTERVAL_SECS: u32 = 10;
pub const INTERVAL_RANGE_SECS: RangeInclusive<u32> = 5..=600;

const REFRESH_INTERVAL_KEY: &str = "refresh_interval_seconds";

// Picks up changes written by other processes sharing the database file.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(thiserror::Error, Debug)]
pub enum IntervalError {
    #[error("refresh interval must be between 5 and 600 seconds, got {0}")]
    OutOfRange(u32),
    #[error("interval storage error: {0}")]
    Storage(#[from] db_store::MetaError),
}

/// The user adjustable number of seconds the monitor sleeps between checks.
#[derive(Clone)]
pub struct IntervalConfig {
    pool: Pool<Sqlite>,
    changes: Arc<watch::Sender<u64>>,
}

impl IntervalConfig {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            pool,
            changes: Arc::new(changes),
        }
    }

    /// The stored interval, or the default when none has been set.
    pub async fn get(&self) -> Result<u32, IntervalError> {
        let seconds = db_store::meta::get_optional(&self.pool, REFRESH_INTERVAL_KEY).await?;
        Ok(seconds.unwrap_or(DEFAULT_INTERVAL_SECS))
    }

    pub async fn set(&self, seconds: u32) -> Result<(), IntervalError> {
        if !INTERVAL_RANGE_SECS.contains(&seconds) {
            return Err(IntervalError::OutOfRange(seconds));
        }
        db_store::meta::save(&self.pool, REFRESH_INTERVAL_KEY, seconds).await?;
        tracing::info!(seconds, "refresh interval updated");
        self.changes.send_modify(|generation| *generation += 1);
        Ok(())
    }

    /// Like [`get`](Self::get) but a failed read yields the default.
    pub async fn current(&self) -> u32 {
        match self.get().await {
            Ok(seconds) => seconds,
            Err(err) => {
                tracing::warn!(?err, "failed to read refresh interval, using default");
                DEFAULT_INTERVAL_SECS
            }
        }
    }

    /// Emits the current interval immediately and then every time it changes.
    /// A failed read emits the default rather than ending the stream.
    pub fn watch(&self) -> BoxStream<'static, u32> {
        let config = self.clone();
        let changed = WatchStream::new(self.changes.subscribe()).map(|_| ());
        let mut poll = tokio::time::interval(POLL_INTERVAL);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let polled = IntervalStream::new(poll).skip(1).map(|_| ());

        stream::select(changed, polled)
            .then(move |_| {
                let config = config.clone();
                async move { config.current().await }
            })
            .scan(None, |last, seconds| {
                let emit = (*last != Some(seconds)).then_some(seconds);
                *last = Some(seconds);
                future::ready(Some(emit))
            })
            .filter_map(future::ready)
            .boxed()
    }
}
