//! World-state snapshot handed to the pre-publication validators.
//!
//! Validators are pure functions of (batch, snapshot). Everything they need
//! to know about the world beyond the batch itself lives here: citizen
//! statuses after this cycle's transitions, who was already dead before the
//! cycle began, the externally declared crisis, and category counts from
//! prior cycles for the distribution window.

use crate::models::citizen::{Citizen, CitizenId, HealthStatus};
use crate::models::event::MilestoneCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Crisis severity as declared by the external world-state source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrisisLevel {
    Advisory,
    Emergency,
}

/// Externally declared crisis window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrisisState {
    pub label: String,
    pub level: CrisisLevel,
    pub started_cycle: u64,
}

/// Category counts for one past cycle
pub type CategoryCounts = BTreeMap<MilestoneCategory, u64>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub cycle: u64,
    /// Status of every known citizen after this cycle's transitions
    pub statuses: BTreeMap<CitizenId, HealthStatus>,
    /// Citizens already deceased when the cycle started, with the cycle
    /// they died in when known
    pub deceased_before: BTreeMap<CitizenId, Option<u64>>,
    pub crisis: Option<CrisisState>,
    /// Oldest first
    pub prior_category_counts: Vec<CategoryCounts>,
}

impl WorldSnapshot {
    pub fn new(cycle: u64) -> Self {
        Self {
            cycle,
            ..Default::default()
        }
    }

    /// Build from the working set before and after the cycle's transitions.
    pub fn from_citizens(cycle: u64, before: &[Citizen], after: &[Citizen]) -> Self {
        let deceased_before = before
            .iter()
            .filter(|c| c.is_deceased())
            .map(|c| (c.id, c.deceased_since()))
            .collect();
        let statuses = after.iter().map(|c| (c.id, c.health_status)).collect();
        Self {
            cycle,
            statuses,
            deceased_before,
            crisis: None,
            prior_category_counts: Vec::new(),
        }
    }

    pub fn with_crisis(mut self, crisis: Option<CrisisState>) -> Self {
        self.crisis = crisis;
        self
    }

    pub fn with_history(mut self, prior: Vec<CategoryCounts>) -> Self {
        self.prior_category_counts = prior;
        self
    }

    pub fn with_status(mut self, id: CitizenId, status: HealthStatus) -> Self {
        self.statuses.insert(id, status);
        self
    }

    pub fn with_deceased(mut self, id: CitizenId, since: Option<u64>) -> Self {
        self.deceased_before.insert(id, since);
        self.statuses.insert(id, HealthStatus::Deceased);
        self
    }

    pub fn is_crisis_active(&self) -> bool {
        self.crisis.is_some()
    }

    pub fn status_of(&self, id: CitizenId) -> Option<HealthStatus> {
        self.statuses.get(&id).copied()
    }

    pub fn is_known(&self, id: CitizenId) -> bool {
        self.statuses.contains_key(&id) || self.deceased_before.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_citizens_tracks_prior_deaths() {
        let before = vec![
            Citizen::new(1, "A", 80).with_status(HealthStatus::Deceased, 4),
            Citizen::new(2, "B", 30),
        ];
        let after = vec![
            before[0].clone(),
            Citizen::new(2, "B", 30).with_status(HealthStatus::Hospitalized, 9),
        ];
        let world = WorldSnapshot::from_citizens(9, &before, &after);

        assert_eq!(world.deceased_before.get(&CitizenId(1)), Some(&Some(4)));
        assert!(!world.deceased_before.contains_key(&CitizenId(2)));
        assert_eq!(world.status_of(CitizenId(2)), Some(HealthStatus::Hospitalized));
        assert!(!world.is_crisis_active());
    }
}
