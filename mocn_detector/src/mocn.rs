use crate::{
    observation::{CellObservation, Observation},
    rat::{self, CellIdentity},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A cell visible to the radio for one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleCell {
    pub identity: CellIdentity,
    #[serde(default)]
    pub registered: bool,
}

impl VisibleCell {
    pub fn registered(identity: CellIdentity) -> Self {
        Self {
            identity,
            registered: true,
        }
    }

    pub fn neighbour(identity: CellIdentity) -> Self {
        Self {
            identity,
            registered: false,
        }
    }
}

/// Which identity each recorded cell observation is formatted from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellAttribution {
    /// Every registered cell is recorded with its own plmn, gci and rat.
    #[default]
    EachCell,
    /// Every registered cell is recorded with the serving cell's plmn, gci
    /// and rat, collapsing them to a single entry. Matches histories recorded
    /// by earlier releases.
    ServingCell,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MocnClassifier {
    attribution: CellAttribution,
}

impl MocnClassifier {
    pub fn new(attribution: CellAttribution) -> Self {
        Self { attribution }
    }

    pub fn attribution(&self) -> CellAttribution {
        self.attribution
    }

    pub fn classify(&self, hplmn: Option<&str>, cells: &[VisibleCell]) -> Option<Observation> {
        self.classify_at(Utc::now(), hplmn, cells)
    }

    /// Builds an observation from the first registered cell, or `None` when
    /// there is no home network (no SIM or no signal) or nothing registered.
    pub fn classify_at(
        &self,
        checked_at: DateTime<Utc>,
        hplmn: Option<&str>,
        cells: &[VisibleCell],
    ) -> Option<Observation> {
        let hplmn = hplmn.filter(|hplmn| !hplmn.is_empty())?;

        let registered: Vec<&CellIdentity> = cells
            .iter()
            .filter(|cell| cell.registered)
            .map(|cell| &cell.identity)
            .collect();
        let serving = *registered.first()?;

        let rplmn = serving.plmn();
        let additional_plmns = serving.additional_plmns();
        let is_ran_sharing = !additional_plmns.is_empty();
        let broadcasts_hplmn = rplmn == hplmn || additional_plmns.contains(hplmn);
        let is_mocn_detected = is_ran_sharing && broadcasts_hplmn && rplmn != hplmn;

        let mut seen = HashSet::new();
        let cell_observations = registered
            .iter()
            .map(|identity| match self.attribution {
                CellAttribution::EachCell => *identity,
                CellAttribution::ServingCell => serving,
            })
            .map(|identity| CellObservation {
                plmn: rat::format_plmn(identity),
                gci: rat::format_gci(identity),
                rat: rat::classify(identity),
            })
            .filter(|cell| seen.insert(cell.clone()))
            .collect();

        Some(Observation::new(
            checked_at,
            Some(hplmn.to_string()),
            Some(rplmn),
            additional_plmns,
            is_mocn_detected,
            cell_observations,
        ))
    }
}
