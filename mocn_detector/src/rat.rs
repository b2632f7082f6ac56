//! Radio access technology tagging and Global Cell Identity formatting for the
//! cell identities reported by the radio.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Rat {
    Lte,
    Nr,
    Gsm,
    Wcdma,
    Tdscdma,
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LteCell {
    pub mcc: Option<String>,
    pub mnc: Option<String>,
    pub ci: i32,
    pub pci: i32,
    pub tac: i32,
    pub bands: Vec<i32>,
    pub additional_plmns: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NrCell {
    pub mcc: Option<String>,
    pub mnc: Option<String>,
    pub nci: i64,
    pub pci: i32,
    pub tac: i32,
    pub bands: Vec<i32>,
    pub additional_plmns: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GsmCell {
    pub mcc: Option<String>,
    pub mnc: Option<String>,
    pub cid: i32,
    pub lac: i32,
    pub additional_plmns: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WcdmaCell {
    pub mcc: Option<String>,
    pub mnc: Option<String>,
    pub cid: i32,
    pub lac: i32,
    /// Primary scrambling code
    pub psc: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TdscdmaCell {
    pub mcc: Option<String>,
    pub mnc: Option<String>,
    pub cid: i32,
    pub lac: i32,
    /// Cell parameter id
    pub cpid: i32,
}

/// Identity of a single cell as reported by the radio. Any technology the
/// radio reports that is not modelled here decodes as `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rat", rename_all = "UPPERCASE")]
pub enum CellIdentity {
    Lte(LteCell),
    Nr(NrCell),
    Gsm(GsmCell),
    Wcdma(WcdmaCell),
    Tdscdma(TdscdmaCell),
    #[serde(other)]
    Unknown,
}

impl CellIdentity {
    pub fn mcc(&self) -> Option<&str> {
        match self {
            Self::Lte(cell) => cell.mcc.as_deref(),
            Self::Nr(cell) => cell.mcc.as_deref(),
            Self::Gsm(cell) => cell.mcc.as_deref(),
            Self::Wcdma(cell) => cell.mcc.as_deref(),
            Self::Tdscdma(cell) => cell.mcc.as_deref(),
            Self::Unknown => None,
        }
    }

    pub fn mnc(&self) -> Option<&str> {
        match self {
            Self::Lte(cell) => cell.mnc.as_deref(),
            Self::Nr(cell) => cell.mnc.as_deref(),
            Self::Gsm(cell) => cell.mnc.as_deref(),
            Self::Wcdma(cell) => cell.mnc.as_deref(),
            Self::Tdscdma(cell) => cell.mnc.as_deref(),
            Self::Unknown => None,
        }
    }

    /// The PLMN this cell is registered under: mcc and mnc concatenated, each
    /// empty when the radio did not report it.
    pub fn plmn(&self) -> String {
        format!(
            "{}{}",
            self.mcc().unwrap_or_default(),
            self.mnc().unwrap_or_default()
        )
    }

    /// PLMNs broadcast alongside the registered one. Only LTE, NR and GSM
    /// cells carry them.
    pub fn additional_plmns(&self) -> BTreeSet<String> {
        match self {
            Self::Lte(cell) => cell.additional_plmns.clone(),
            Self::Nr(cell) => cell.additional_plmns.clone(),
            Self::Gsm(cell) => cell.additional_plmns.clone(),
            Self::Wcdma(_) | Self::Tdscdma(_) | Self::Unknown => BTreeSet::new(),
        }
    }
}

impl From<&CellIdentity> for Rat {
    fn from(identity: &CellIdentity) -> Self {
        classify(identity)
    }
}

pub fn classify(identity: &CellIdentity) -> Rat {
    match identity {
        CellIdentity::Lte(_) => Rat::Lte,
        CellIdentity::Nr(_) => Rat::Nr,
        CellIdentity::Gsm(_) => Rat::Gsm,
        CellIdentity::Wcdma(_) => Rat::Wcdma,
        CellIdentity::Tdscdma(_) => Rat::Tdscdma,
        CellIdentity::Unknown => Rat::Unknown,
    }
}

pub fn format_gci(identity: &CellIdentity) -> String {
    match identity {
        CellIdentity::Lte(cell) => {
            format!("{}-{} / {}", cell.ci, cell.pci, join_bands(&cell.bands, "B"))
        }
        CellIdentity::Nr(cell) => {
            format!("{}-{} / {}", cell.nci, cell.pci, join_bands(&cell.bands, "n"))
        }
        CellIdentity::Gsm(cell) => format!("{}-{}", cell.cid, cell.lac),
        CellIdentity::Wcdma(cell) => format!("{}-{}-{}", cell.cid, cell.lac, cell.psc),
        CellIdentity::Tdscdma(cell) => format!("{}-{}-{}", cell.cid, cell.lac, cell.cpid),
        CellIdentity::Unknown => "Unknown".to_string(),
    }
}

/// The `{mcc}-{mnc}` label recorded against each observed cell.
pub fn format_plmn(identity: &CellIdentity) -> String {
    format!(
        "{}-{}",
        identity.mcc().unwrap_or_default(),
        identity.mnc().unwrap_or_default()
    )
}

fn join_bands(bands: &[i32], prefix: &str) -> String {
    bands
        .iter()
        .map(|band| format!("{prefix}{band}"))
        .collect::<Vec<_>>()
        .join(", ")
}
