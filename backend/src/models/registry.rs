//! Citizen registry interface
//!
//! The registry is the external store of citizen records. The engine loads
//! the whole population once at cycle start and writes health fields back
//! only after the cycle's ledger append succeeded.

use crate::models::citizen::{Citizen, CitizenId, CitizenRecord, HealthStatus};
use std::collections::BTreeMap;
use thiserror::Error;

/// Registry errors
///
/// Upstream failures (ID counter exhaustion, storage outages) are opaque to
/// the engine and pass through unchanged.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Citizen not found: {0}")]
    CitizenNotFound(CitizenId),

    #[error(transparent)]
    Upstream(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// External citizen store
pub trait CitizenRegistry {
    /// Load every citizen the engine should see this cycle, deceased
    /// citizens included (they are marked, never removed).
    fn load_active_citizens(&self) -> Result<Vec<CitizenRecord>, RegistryError>;

    /// Persist the health fields of one citizen
    fn save_citizen_status(
        &mut self,
        id: CitizenId,
        status: HealthStatus,
        status_start_cycle: Option<u64>,
        status_duration: Option<u64>,
    ) -> Result<(), RegistryError>;
}

/// Registry held in memory, keyed by citizen ID
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    records: BTreeMap<CitizenId, CitizenRecord>,
}

impl InMemoryRegistry {
    pub fn new(records: Vec<CitizenRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.id, r)).collect(),
        }
    }

    pub fn from_citizens(citizens: &[Citizen]) -> Self {
        Self::new(citizens.iter().map(Citizen::to_record).collect())
    }

    pub fn insert(&mut self, record: CitizenRecord) {
        self.records.insert(record.id, record);
    }

    pub fn get(&self, id: CitizenId) -> Option<&CitizenRecord> {
        self.records.get(&id)
    }

    /// Typed view of a record; `None` if absent or unparseable
    pub fn citizen(&self, id: CitizenId) -> Option<Citizen> {
        self.records
            .get(&id)
            .cloned()
            .and_then(|r| Citizen::try_from(r).ok())
    }

    pub fn records(&self) -> impl Iterator<Item = &CitizenRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CitizenRegistry for InMemoryRegistry {
    fn load_active_citizens(&self) -> Result<Vec<CitizenRecord>, RegistryError> {
        Ok(self.records.values().cloned().collect())
    }

    fn save_citizen_status(
        &mut self,
        id: CitizenId,
        status: HealthStatus,
        status_start_cycle: Option<u64>,
        status_duration: Option<u64>,
    ) -> Result<(), RegistryError> {
        let record = self
            .records
            .get_mut(&id)
            .ok_or(RegistryError::CitizenNotFound(id))?;
        *record = record
            .clone()
            .with_status(status, status_start_cycle, status_duration);
        Ok(())
    }
}
