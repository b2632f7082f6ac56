use crate::common::{self, MockRadio};
use mocn_detector::{
    export,
    interval::IntervalConfig,
    mocn::MocnClassifier,
    monitor::{Monitor, MonitorError, MonitorState, StartOutcome},
    observation::{ObservationStore, MIN_CURSOR},
};
use sqlx::SqlitePool;
use std::{sync::Arc, time::Duration};

fn monitor(pool: &SqlitePool, radio: MockRadio) -> (Monitor<MockRadio, MockRadio>, Arc<MockRadio>) {
    let radio = Arc::new(radio);
    let monitor = Monitor::new(
        radio.clone(),
        radio.clone(),
        MocnClassifier::default(),
        ObservationStore::new(pool.clone()),
        IntervalConfig::new(pool.clone()),
    );
    (monitor, radio)
}

#[sqlx::test]
async fn refuses_to_start_without_permissions(pool: SqlitePool) -> anyhow::Result<()> {
    let (monitor, radio) = monitor(&pool, MockRadio::mocn().denied());
    assert_eq!(MonitorState::Idle, monitor.state());

    let result = monitor.start().await;

    assert!(matches!(result, Err(MonitorError::PermissionDenied)));
    assert_eq!(MonitorState::Stopped, monitor.state());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(0, radio.ticks());
    Ok(())
}

#[sqlx::test]
async fn second_start_is_a_no_op(pool: SqlitePool) -> anyhow::Result<()> {
    let (monitor, radio) = monitor(&pool, MockRadio::mocn());
    let mut states = monitor.subscribe();

    assert_eq!(StartOutcome::Started, monitor.start().await?);
    assert_eq!(StartOutcome::AlreadyRunning, monitor.start().await?);
    assert_eq!(MonitorState::Running, *states.borrow_and_update());

    tokio::time::sleep(Duration::from_millis(200)).await;
    // one loop, one tick, the default interval has not elapsed yet
    assert_eq!(1, radio.ticks());

    monitor.stop().await;
    assert_eq!(MonitorState::Stopped, monitor.state());
    states.changed().await?;
    assert_eq!(MonitorState::Stopped, *states.borrow());
    Ok(())
}

#[sqlx::test]
async fn stop_abandons_tick_in_progress(pool: SqlitePool) -> anyhow::Result<()> {
    let (monitor, radio) = monitor(&pool, MockRadio::mocn().slow(Duration::from_millis(300)));
    let store = ObservationStore::new(pool.clone());

    monitor.start().await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(1, radio.ticks());
    monitor.stop().await;
    assert_eq!(MonitorState::Stopped, monitor.state());

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(0, store.count().await?);
    assert_eq!(1, radio.ticks());
    Ok(())
}

#[sqlx::test]
async fn running_without_home_network_records_nothing(pool: SqlitePool) -> anyhow::Result<()> {
    let (monitor, radio) = monitor(&pool, MockRadio::new(None, MockRadio::mocn_cells()));
    let store = ObservationStore::new(pool.clone());

    monitor.start().await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(MonitorState::Running, monitor.state());
    assert_eq!(1, radio.ticks());
    assert_eq!(0, store.count().await?);
    monitor.stop().await;
    Ok(())
}

#[sqlx::test]
async fn keeps_running_when_store_fails(pool: SqlitePool) -> anyhow::Result<()> {
    let (monitor, radio) = monitor(&pool, MockRadio::mocn());
    pool.close().await;

    monitor.start().await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(MonitorState::Running, monitor.state());
    assert_eq!(1, radio.ticks());
    monitor.stop().await;
    Ok(())
}

#[sqlx::test]
async fn records_mocn_every_tick_and_exports_it(pool: SqlitePool) -> anyhow::Result<()> {
    let (monitor, _radio) = monitor(&pool, MockRadio::mocn());
    let store = ObservationStore::new(pool.clone());
    IntervalConfig::new(pool.clone()).set(5).await?;

    monitor.start().await?;
    tokio::time::sleep(Duration::from_secs(12)).await;
    monitor.stop().await;
    // dispatched inserts are not awaited by stop
    tokio::time::sleep(Duration::from_millis(200)).await;

    let recorded = store.scan_above(MIN_CURSOR, 1000).await?;
    assert!(recorded.len() >= 2, "recorded {}", recorded.len());
    assert!(recorded.iter().all(|observation| observation.is_mocn_detected));
    assert!(recorded
        .iter()
        .all(|observation| observation.hplmn.as_deref() == Some(common::HPLMN)));

    let mut exported = Vec::new();
    let written = export::export_all(&store, &mut exported).await?;
    let lines: Vec<serde_json::Value> = String::from_utf8(exported)?
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;

    assert_eq!(recorded.len() as u64, written);
    assert_eq!(recorded.len(), lines.len());
    assert_eq!(
        store.max_id().await?,
        lines.last().and_then(|line| line["id"].as_i64())
    );
    Ok(())
}
