use crate::common;
use futures::StreamExt;
use mocn_detector::observation::{ObservationStore, StoreError, DEFAULT_RECENT_LIMIT, MIN_CURSOR};
use sqlx::SqlitePool;
use std::time::Duration;

#[sqlx::test]
async fn insert_assigns_increasing_ids(pool: SqlitePool) -> anyhow::Result<()> {
    let store = ObservationStore::new(pool);

    let first = store.insert(common::observation(common::minutes_ago(2))).await?;
    let second = store.insert(common::observation(common::minutes_ago(1))).await?;

    assert!(second.id > first.id);
    assert_eq!(common::observation(common::minutes_ago(2)).hplmn, first.hplmn);
    assert_eq!(Some(second.id), store.max_id().await?);
    Ok(())
}

#[sqlx::test]
async fn stored_observation_reads_back_unchanged(pool: SqlitePool) -> anyhow::Result<()> {
    let store = ObservationStore::new(pool);
    let observation = common::observation("2024-05-01T12:00:00.250Z".parse()?);

    let stored = store.insert(observation.clone()).await?;
    let page = store.scan_above(MIN_CURSOR, 10).await?;

    assert_eq!(vec![stored], page);
    assert_eq!(observation, page[0].observation);
    assert!(page[0].is_ran_sharing());
    Ok(())
}

#[sqlx::test]
async fn scan_above_yields_every_row_once_for_any_page_size(
    pool: SqlitePool,
) -> anyhow::Result<()> {
    let store = ObservationStore::new(pool);
    let mut inserted = Vec::new();
    for minutes in 0..23 {
        inserted.push(store.insert(common::observation(common::minutes_ago(minutes))).await?.id);
    }

    for page_size in [1, 3, 7, 23, 1000] {
        let mut cursor = MIN_CURSOR;
        let mut scanned = Vec::new();
        loop {
            let page = store.scan_above(cursor, page_size).await?;
            let Some(last) = page.last() else {
                break;
            };
            assert!(page.len() <= page_size as usize);
            cursor = last.id;
            scanned.extend(page.iter().map(|observation| observation.id));
        }
        assert_eq!(inserted, scanned, "page size {page_size}");
    }
    Ok(())
}

#[sqlx::test]
async fn recent_is_newest_first_and_bounded(pool: SqlitePool) -> anyhow::Result<()> {
    let store = ObservationStore::new(pool);
    for minutes in [30, 10, 50, 20, 40] {
        store.insert(common::observation(common::minutes_ago(minutes))).await?;
    }

    let recent = store.recent(3).await?;

    assert_eq!(3, recent.len());
    assert!(recent
        .windows(2)
        .all(|pair| pair[0].checked_at >= pair[1].checked_at));
    assert!(recent[0].checked_at > common::minutes_ago(11));
    Ok(())
}

#[sqlx::test]
async fn watch_recent_emits_on_change_and_suppresses_no_ops(
    pool: SqlitePool,
) -> anyhow::Result<()> {
    let store = ObservationStore::new(pool);
    for minutes in [1, 2] {
        store.insert(common::observation(common::minutes_ago(minutes))).await?;
    }
    let mut recent = store.watch_recent(2);

    let initial = recent.next().await.expect("initial emission")?;
    assert_eq!(2, initial.len());

    // older than both emitted rows, so the two most recent are unchanged
    store.insert(common::observation(common::minutes_ago(60))).await?;
    let no_op = tokio::time::timeout(Duration::from_millis(300), recent.next()).await;
    assert!(no_op.is_err(), "unchanged window must not be re-emitted");

    let newest = store.insert(common::observation(common::minutes_ago(0))).await?;
    let updated = tokio::time::timeout(Duration::from_secs(2), recent.next())
        .await?
        .expect("emission after insert")?;
    assert_eq!(2, updated.len());
    assert_eq!(newest.id, updated[0].id);
    Ok(())
}

#[sqlx::test]
async fn delete_all_empties_store_without_reusing_ids(pool: SqlitePool) -> anyhow::Result<()> {
    let store = ObservationStore::new(pool);
    let mut last = None;
    for minutes in 0..3 {
        last = Some(store.insert(common::observation(common::minutes_ago(minutes))).await?.id);
    }

    assert_eq!(3, store.delete_all().await?);
    assert_eq!(0, store.count().await?);
    assert!(store.scan_above(MIN_CURSOR, 1000).await?.is_empty());
    assert_eq!(None, store.max_id().await?);

    let after = store.insert(common::observation(common::minutes_ago(0))).await?;
    assert!(Some(after.id) > last);
    assert_eq!(1, store.count().await?);
    Ok(())
}

#[sqlx::test]
async fn delete_all_is_not_followed_by_earlier_insert(pool: SqlitePool) -> anyhow::Result<()> {
    let store = ObservationStore::new(pool);

    let pending: Vec<_> = (0..10)
        .map(|minutes| tokio::spawn(store.insert(common::observation(common::minutes_ago(minutes)))))
        .collect();
    store.delete_all().await?;

    for insert in pending {
        match insert.await? {
            Ok(_) | Err(StoreError::Purged) => (),
            Err(err) => return Err(err.into()),
        }
    }
    assert_eq!(0, store.count().await?);
    Ok(())
}

#[sqlx::test]
async fn insert_requested_after_delete_all_is_kept(pool: SqlitePool) -> anyhow::Result<()> {
    let store = ObservationStore::new(pool);
    store.insert(common::observation(common::minutes_ago(5))).await?;

    let purge = store.delete_all();
    let insert = store.insert(common::observation(common::minutes_ago(0)));

    assert_eq!(1, purge.await?);
    insert.await?;
    assert_eq!(1, store.count().await?);
    Ok(())
}

#[sqlx::test]
async fn watch_recent_window_is_bounded_at_default_limit(pool: SqlitePool) -> anyhow::Result<()> {
    let store = ObservationStore::new(pool);
    let mut ids = Vec::new();
    for minutes in 0..DEFAULT_RECENT_LIMIT as i64 + 1 {
        ids.push(store.insert(common::observation(common::minutes_ago(minutes))).await?.id);
    }
    let mut recent = store.watch_recent(DEFAULT_RECENT_LIMIT);

    let initial = recent.next().await.expect("initial emission")?;
    assert_eq!(DEFAULT_RECENT_LIMIT as usize, initial.len());
    assert_eq!(ids.first().copied(), initial.first().map(|o| o.id));
    // the oldest row falls outside the window
    assert!(initial.iter().all(|o| Some(&o.id) != ids.last()));

    store.insert(common::observation(common::minutes_ago(10_000))).await?;
    let no_op = tokio::time::timeout(Duration::from_millis(300), recent.next()).await;
    assert!(no_op.is_err(), "window unchanged by an older row");
    Ok(())
}
