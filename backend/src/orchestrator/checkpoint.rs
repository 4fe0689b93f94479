//! Checkpoint - Save/Load Engine State
//!
//! Serializes the state an orchestrator carries between cycles so a run can
//! stop and resume in another process.
//!
//! # Critical Invariants
//!
//! - **Determinism**: a restored engine produces the same batches as one
//!   that never stopped (per-cycle RNG streams carry no state across cycles)
//! - **Unique citizens**: no citizen ID appears twice
//! - **Terminal deaths**: a deceased citizen stays deceased
//! - **Config Matching**: state can only be loaded with a matching config

use crate::models::citizen::{Citizen, CitizenRecord, HealthStatus};
use crate::models::registry::InMemoryRegistry;
use crate::models::world::CategoryCounts;
use crate::orchestrator::engine::{EngineConfig, EngineError, Orchestrator};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

// ============================================================================
// Snapshot Structures
// ============================================================================

/// Engine state between cycles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Last committed cycle, `None` before the first
    pub last_cycle: Option<u64>,

    /// Base seed (CRITICAL for determinism)
    pub base_seed: u64,

    /// Working set after the last committed cycle
    pub citizens: Vec<CitizenRecord>,

    /// Category counts for the distribution window, oldest first
    pub distribution_history: Vec<CategoryCounts>,

    /// SHA256 hash of the config (for validation)
    pub config_hash: String,
}

impl EngineSnapshot {
    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string(self)
            .map_err(|e| EngineError::Serialization(format!("Snapshot serialization failed: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::Serialization(format!("Snapshot parse failed: {}", e)))
    }

    /// Registry seeded with the snapshot's citizens
    pub fn registry(&self) -> InMemoryRegistry {
        InMemoryRegistry::new(self.citizens.clone())
    }
}

// ============================================================================
// Config Hashing
// ============================================================================

/// Compute deterministic SHA256 hash of config
///
/// Uses canonical JSON serialization with sorted keys so the hash does not
/// depend on map iteration order.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, EngineError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(config)
        .map_err(|e| EngineError::Serialization(format!("Config serialization failed: {}", e)))?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value))
        .map_err(|e| EngineError::Serialization(format!("Config serialization failed: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Validate snapshot integrity
///
/// Checks:
/// - Citizen ID uniqueness
/// - Every status string parses
/// - No more history than the configured window
pub fn validate_snapshot(snapshot: &EngineSnapshot, config: &EngineConfig) -> Result<Vec<Citizen>, EngineError> {
    let mut seen = BTreeSet::new();
    let mut citizens = Vec::with_capacity(snapshot.citizens.len());
    for record in &snapshot.citizens {
        if !seen.insert(record.id) {
            return Err(EngineError::StateValidation(format!(
                "Duplicate citizen {} in snapshot",
                record.id
            )));
        }
        let citizen = Citizen::try_from(record.clone())
            .map_err(|e| EngineError::StateValidation(format!("{}: {}", record.id, e)))?;
        citizens.push(citizen);
    }

    let window = config.validation.distribution.window_cycles;
    if snapshot.distribution_history.len() > window {
        return Err(EngineError::StateValidation(format!(
            "Snapshot holds {} cycles of history, window is {}",
            snapshot.distribution_history.len(),
            window
        )));
    }

    Ok(citizens)
}

// ============================================================================
// Orchestrator integration
// ============================================================================

impl Orchestrator {
    /// Capture the state needed to resume after the last committed cycle.
    pub fn save_state(&self) -> Result<EngineSnapshot, EngineError> {
        Ok(EngineSnapshot {
            last_cycle: self.last_cycle(),
            base_seed: self.config().base_seed,
            citizens: self.citizens().iter().map(Citizen::to_record).collect(),
            distribution_history: self.distribution_history().cloned().collect(),
            config_hash: compute_config_hash(self.config())?,
        })
    }

    /// Rebuild an orchestrator from a snapshot taken with the same config.
    pub fn load_state(config: EngineConfig, snapshot: EngineSnapshot) -> Result<Self, EngineError> {
        let expected = compute_config_hash(&config)?;
        if snapshot.config_hash != expected {
            return Err(EngineError::StateValidation(format!(
                "Config hash mismatch: snapshot {}, config {}",
                snapshot.config_hash, expected
            )));
        }
        let citizens = validate_snapshot(&snapshot, &config)?;

        tracing::info!(
            target: "orchestrator",
            last_cycle = ?snapshot.last_cycle,
            citizens = citizens.len(),
            deceased = citizens.iter().filter(|c| c.health_status == HealthStatus::Deceased).count(),
            "state restored"
        );
        Orchestrator::restore(config, snapshot.last_cycle, citizens, snapshot.distribution_history)
    }
}
