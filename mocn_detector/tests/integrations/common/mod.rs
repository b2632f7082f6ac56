use chrono::{DateTime, Duration, Utc};
use mocn_detector::{
    mocn::VisibleCell,
    observation::{CellObservation, Observation},
    radio::{PermissionCheck, RadioSource, SubscriptionId},
    rat::{CellIdentity, LteCell, Rat},
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const HPLMN: &str = "23415";

pub struct MockRadio {
    hplmn: Option<String>,
    cells: Vec<VisibleCell>,
    granted: AtomicBool,
    ticks: AtomicUsize,
    delay: std::time::Duration,
}

impl MockRadio {
    pub fn new(hplmn: Option<&str>, cells: Vec<VisibleCell>) -> Self {
        Self {
            hplmn: hplmn.map(str::to_string),
            cells,
            granted: AtomicBool::new(true),
            ticks: AtomicUsize::new(0),
            delay: std::time::Duration::ZERO,
        }
    }

    /// A partner network cell that also broadcasts the home network.
    pub fn mocn() -> Self {
        Self::new(Some(HPLMN), Self::mocn_cells())
    }

    pub fn mocn_cells() -> Vec<VisibleCell> {
        vec![
            VisibleCell::registered(lte("234", "20", &["23420", HPLMN])),
            VisibleCell::neighbour(lte("234", "15", &[])),
        ]
    }

    pub fn denied(self) -> Self {
        self.granted.store(false, Ordering::SeqCst);
        self
    }

    /// Makes every cell query take `delay`, like a radio still scanning.
    pub fn slow(mut self, delay: std::time::Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn ticks(&self) -> usize {
        self.ticks.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RadioSource for MockRadio {
    async fn active_subscriptions(&self) -> Vec<SubscriptionId> {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        vec![1]
    }

    async fn home_network_id(&self, _subscription: SubscriptionId) -> Option<String> {
        self.hplmn.clone()
    }

    async fn visible_cells(&self, _subscription: SubscriptionId) -> Vec<VisibleCell> {
        tokio::time::sleep(self.delay).await;
        self.cells.clone()
    }
}

impl PermissionCheck for MockRadio {
    fn has_required_permissions(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }
}

pub fn lte(mcc: &str, mnc: &str, additional: &[&str]) -> CellIdentity {
    CellIdentity::Lte(LteCell {
        mcc: Some(mcc.to_string()),
        mnc: Some(mnc.to_string()),
        ci: 26881,
        pci: 312,
        tac: 40,
        bands: vec![20],
        additional_plmns: additional.iter().map(|p| p.to_string()).collect(),
    })
}

pub fn observation(checked_at: DateTime<Utc>) -> Observation {
    Observation::new(
        checked_at,
        Some(HPLMN.to_string()),
        Some("23420".to_string()),
        ["23420".to_string(), HPLMN.to_string()].into(),
        true,
        vec![CellObservation {
            plmn: "234-20".to_string(),
            gci: "26881-312 / B20".to_string(),
            rat: Rat::Lte,
        }],
    )
}

pub fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    Utc::now() - Duration::minutes(minutes)
}
