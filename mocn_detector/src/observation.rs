use crate::rat::Rat;
use chrono::{DateTime, Utc};
use futures::{
    future,
    stream::{self, BoxStream},
    StreamExt,
};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Pool, Sqlite};
use std::{
    collections::BTreeSet,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::{watch, Mutex};
use tokio_stream::wrappers::{IntervalStream, WatchStream};

pub const DEFAULT_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_RECENT_LIMIT: u32 = 1000;

/// Cursor that sorts before every stored id.
pub const MIN_CURSOR: i64 = i64::MIN;

// Picks up writes made by other processes sharing the database file.
const RECENT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),
    #[error("failed to encode observation: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("observation discarded by a later purge")]
    Purged,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellObservation {
    pub plmn: String,
    pub gci: String,
    pub rat: Rat,
}

/// The outcome of classifying the cells visible to one subscription at one
/// instant. Whether the serving cell is shared is derived from
/// `additional_plmns` and cannot be set independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub checked_at: DateTime<Utc>,
    pub hplmn: Option<String>,
    pub rplmn: Option<String>,
    pub additional_plmns: BTreeSet<String>,
    pub is_mocn_detected: bool,
    pub cell_observations: Vec<CellObservation>,
}

impl Observation {
    pub fn new(
        checked_at: DateTime<Utc>,
        hplmn: Option<String>,
        rplmn: Option<String>,
        additional_plmns: BTreeSet<String>,
        is_mocn_detected: bool,
        cell_observations: Vec<CellObservation>,
    ) -> Self {
        Self {
            checked_at,
            hplmn,
            rplmn,
            additional_plmns,
            is_mocn_detected,
            cell_observations,
        }
    }

    pub fn is_ran_sharing(&self) -> bool {
        !self.additional_plmns.is_empty()
    }

    fn record(&self, id: Option<i64>) -> ObservationRecord<'_> {
        ObservationRecord {
            id,
            checked_at: &self.checked_at,
            hplmn: &self.hplmn,
            rplmn: &self.rplmn,
            additional_plmns: &self.additional_plmns,
            is_ran_sharing: self.is_ran_sharing(),
            is_mocn_detected: self.is_mocn_detected,
            cell_observations: &self.cell_observations,
        }
    }
}

/// An observation that has been persisted and assigned its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObservation {
    pub id: i64,
    pub observation: Observation,
}

impl std::ops::Deref for StoredObservation {
    type Target = Observation;

    fn deref(&self) -> &Self::Target {
        &self.observation
    }
}

/// Wire shape shared by stored and unsaved observations.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ObservationRecord<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    checked_at: &'a DateTime<Utc>,
    hplmn: &'a Option<String>,
    rplmn: &'a Option<String>,
    additional_plmns: &'a BTreeSet<String>,
    is_ran_sharing: bool,
    is_mocn_detected: bool,
    cell_observations: &'a [CellObservation],
}

impl Serialize for Observation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.record(None).serialize(serializer)
    }
}

impl Serialize for StoredObservation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.observation.record(Some(self.id)).serialize(serializer)
    }
}

#[derive(FromRow)]
struct ObservationRow {
    id: i64,
    checked_at: DateTime<Utc>,
    hplmn: Option<String>,
    rplmn: Option<String>,
    additional_plmns: Json<BTreeSet<String>>,
    is_mocn_detected: bool,
    cell_observations: Json<Vec<CellObservation>>,
}

impl From<ObservationRow> for StoredObservation {
    fn from(row: ObservationRow) -> Self {
        Self {
            id: row.id,
            observation: Observation::new(
                row.checked_at,
                row.hplmn,
                row.rplmn,
                row.additional_plmns.0,
                row.is_mocn_detected,
                row.cell_observations.0,
            ),
        }
    }
}

/// Append-only log of observations.
///
/// Inserts and purges are serialized through a single fair lock. Purges are
/// numbered when requested; an insert that finds a purge requested after it
/// already completed is dropped.
#[derive(Clone)]
pub struct ObservationStore {
    pool: Pool<Sqlite>,
    write_lock: Arc<Mutex<()>>,
    purges: Arc<Purges>,
    changes: Arc<watch::Sender<u64>>,
}

#[derive(Default)]
struct Purges {
    requested: AtomicU64,
    completed: AtomicU64,
}

impl ObservationStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
            purges: Arc::default(),
            changes: Arc::new(changes),
        }
    }

    /// Appends `observation` and assigns it the next id.
    ///
    /// The returned future may be spawned and polled later. If a purge that
    /// was requested after this call completes first, the observation is
    /// discarded with [`StoreError::Purged`].
    pub fn insert(
        &self,
        observation: Observation,
    ) -> impl Future<Output = Result<StoredObservation, StoreError>> + Send + 'static {
        let store = self.clone();
        let requested_after = store.purges.requested.load(Ordering::SeqCst);

        async move { store.insert_unless_purged(observation, requested_after).await }
    }

    async fn insert_unless_purged(
        &self,
        observation: Observation,
        requested_after: u64,
    ) -> Result<StoredObservation, StoreError> {
        let additional_plmns = serde_json::to_string(&observation.additional_plmns)?;
        let cell_observations = serde_json::to_string(&observation.cell_observations)?;

        let _guard = self.write_lock.lock().await;
        if self.purges.completed.load(Ordering::SeqCst) > requested_after {
            return Err(StoreError::Purged);
        }

        let id = sqlx::query(
            r#"
            insert into observations
                (checked_at, hplmn, rplmn, additional_plmns, is_mocn_detected, cell_observations)
            values (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(observation.checked_at)
        .bind(&observation.hplmn)
        .bind(&observation.rplmn)
        .bind(additional_plmns)
        .bind(observation.is_mocn_detected)
        .bind(cell_observations)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.notify();
        Ok(StoredObservation { id, observation })
    }

    /// The next page of at most `limit` observations with ids strictly above
    /// `cursor`, in id order. An empty page means there is nothing further.
    pub async fn scan_above(
        &self,
        cursor: i64,
        limit: u32,
    ) -> Result<Vec<StoredObservation>, StoreError> {
        let rows = sqlx::query_as::<_, ObservationRow>(
            r#"
            select * from observations
            where id > ?
            order by id asc
            limit ?
            "#,
        )
        .bind(cursor)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StoredObservation::from).collect())
    }

    /// The `limit` most recent observations, newest first.
    pub async fn recent(&self, limit: u32) -> Result<Vec<StoredObservation>, StoreError> {
        let rows = sqlx::query_as::<_, ObservationRow>(
            r#"
            select * from observations
            order by checked_at desc, id desc
            limit ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StoredObservation::from).collect())
    }

    /// Emits [`recent`](Self::recent) immediately and again whenever the
    /// stored set may have changed. An emission identical to the previous one
    /// is suppressed.
    pub fn watch_recent(
        &self,
        limit: u32,
    ) -> BoxStream<'static, Result<Vec<StoredObservation>, StoreError>> {
        let store = self.clone();
        let changed = WatchStream::new(self.changes.subscribe()).map(|_| ());
        let mut poll = tokio::time::interval(RECENT_POLL_INTERVAL);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let polled = IntervalStream::new(poll).skip(1).map(|_| ());

        stream::select(changed, polled)
            .then(move |_| {
                let store = store.clone();
                async move { store.recent(limit).await }
            })
            .scan(None, |last, result| {
                let emit = match result {
                    Ok(page) if last.as_ref() == Some(&page) => None,
                    Ok(page) => {
                        *last = Some(page.clone());
                        Some(Ok(page))
                    }
                    Err(err) => Some(Err(err)),
                };
                future::ready(Some(emit))
            })
            .filter_map(future::ready)
            .boxed()
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar("select count(*) from observations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn max_id(&self) -> Result<Option<i64>, StoreError> {
        let id = sqlx::query_scalar("select max(id) from observations")
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    /// Irreversibly removes every stored observation. Inserts requested
    /// before this call never land after it completes.
    pub fn delete_all(&self) -> impl Future<Output = Result<u64, StoreError>> + Send + 'static {
        let store = self.clone();
        let ticket = store.purges.requested.fetch_add(1, Ordering::SeqCst) + 1;

        async move { store.purge(ticket).await }
    }

    async fn purge(&self, ticket: u64) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().await;
        let deleted = sqlx::query("delete from observations")
            .execute(&self.pool)
            .await?
            .rows_affected();
        self.purges.completed.fetch_max(ticket, Ordering::SeqCst);

        self.notify();
        Ok(deleted)
    }

    fn notify(&self) {
        self.changes.send_modify(|generation| *generation += 1);
    }
}
