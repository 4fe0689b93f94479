//! Checkpoint Tests - Save/Load Engine State
//!
//! Critical invariants tested:
//! - Determinism: a restored engine produces identical batches
//! - Terminal deaths: deceased citizens survive the round trip
//! - Config matching: reject state saved under a different config
//! - Integrity: duplicate or unparseable citizens are rejected

use generational_events_core::core::calendar::WeeklyCalendar;
use generational_events_core::ledger::InMemoryLedger;
use generational_events_core::orchestrator::validate_snapshot;
use generational_events_core::{
    CitizenRecord, EngineConfig, EngineError, EngineSnapshot, HealthStatus, InMemoryRegistry, Orchestrator,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn config() -> EngineConfig {
    let mut config = EngineConfig {
        base_seed: 1234,
        ..EngineConfig::default()
    };
    for p in config.milestones.base_probabilities.values_mut() {
        *p = (*p * 15.0).min(1.0);
    }
    config
}

fn population() -> Vec<CitizenRecord> {
    (1..=20)
        .map(|id| CitizenRecord::active(id, format!("C{}", id), 18 + id as u32 * 3))
        .chain([CitizenRecord::active(21, "Gone", 90).with_status(HealthStatus::Deceased, Some(0), Some(0))])
        .collect()
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn test_resume_matches_uninterrupted_run() {
    let calendar = WeeklyCalendar::default();

    // Uninterrupted: cycles 0..20
    let mut straight = Orchestrator::new(config()).unwrap();
    let mut straight_registry = InMemoryRegistry::new(population());
    let mut straight_ledger = InMemoryLedger::standard();
    let mut straight_digests = Vec::new();
    for cycle in 0..20 {
        let outcome = straight
            .run_cycle(cycle, &calendar, &mut straight_registry, &mut straight_ledger, None)
            .unwrap();
        straight_digests.push(outcome.batch_digest);
    }

    // Interrupted after cycle 9, restored from JSON
    let mut first = Orchestrator::new(config()).unwrap();
    let mut registry = InMemoryRegistry::new(population());
    let mut ledger = InMemoryLedger::standard();
    let mut digests = Vec::new();
    for cycle in 0..10 {
        let outcome = first.run_cycle(cycle, &calendar, &mut registry, &mut ledger, None).unwrap();
        digests.push(outcome.batch_digest);
    }
    let json = first.save_state().unwrap().to_json().unwrap();
    drop(first);

    let snapshot = EngineSnapshot::from_json(&json).unwrap();
    let mut resumed_registry = snapshot.registry();
    let mut resumed = Orchestrator::load_state(config(), snapshot).unwrap();
    assert_eq!(resumed.last_cycle(), Some(9));

    for cycle in 10..20 {
        let outcome = resumed
            .run_cycle(cycle, &calendar, &mut resumed_registry, &mut ledger, None)
            .unwrap();
        digests.push(outcome.batch_digest);
    }

    assert_eq!(digests, straight_digests);
    assert_eq!(ledger, straight_ledger);
    assert_eq!(
        resumed_registry.records().collect::<Vec<_>>(),
        straight_registry.records().collect::<Vec<_>>()
    );
}

#[test]
fn test_snapshot_keeps_deceased_and_history() {
    let calendar = WeeklyCalendar::default();
    let mut orchestrator = Orchestrator::new(config()).unwrap();
    let mut registry = InMemoryRegistry::new(population());
    let mut ledger = InMemoryLedger::standard();
    for cycle in 0..6 {
        orchestrator.run_cycle(cycle, &calendar, &mut registry, &mut ledger, None).unwrap();
    }

    let snapshot = orchestrator.save_state().unwrap();
    assert_eq!(snapshot.base_seed, 1234);
    assert_eq!(snapshot.distribution_history.len(), 4);
    let gone = snapshot.citizens.iter().find(|c| c.id.0 == 21).unwrap();
    assert_eq!(gone.health_status, "deceased");

    let restored = Orchestrator::load_state(config(), snapshot.clone()).unwrap();
    assert_eq!(restored.save_state().unwrap(), snapshot);
}

#[test]
fn test_fresh_engine_snapshot() {
    let snapshot = Orchestrator::new(config()).unwrap().save_state().unwrap();
    assert_eq!(snapshot.last_cycle, None);
    assert!(snapshot.citizens.is_empty());
    assert!(snapshot.distribution_history.is_empty());
}

// ============================================================================
// Rejection
// ============================================================================

#[test]
fn test_config_mismatch_rejected() {
    let snapshot = Orchestrator::new(config()).unwrap().save_state().unwrap();

    let mut other = config();
    other.health.max_critical_cycles += 1;

    match Orchestrator::load_state(other, snapshot) {
        Err(EngineError::StateValidation(message)) => assert!(message.contains("Config hash mismatch")),
        Err(other) => panic!("unexpected error {}", other),
        Ok(_) => panic!("snapshot loaded under a different config"),
    }
}

#[test]
fn test_corrupt_snapshot_rejected() {
    let mut orchestrator = Orchestrator::new(config()).unwrap();
    let mut registry = InMemoryRegistry::new(population());
    let mut ledger = InMemoryLedger::standard();
    orchestrator
        .run_cycle(0, &WeeklyCalendar::default(), &mut registry, &mut ledger, None)
        .unwrap();
    let snapshot = orchestrator.save_state().unwrap();

    let mut duplicated = snapshot.clone();
    duplicated.citizens.push(duplicated.citizens[0].clone());
    assert!(matches!(
        validate_snapshot(&duplicated, &config()),
        Err(EngineError::StateValidation(_))
    ));

    let mut unparseable = snapshot.clone();
    unparseable.citizens[0].health_status = "undead".to_string();
    assert!(matches!(
        Orchestrator::load_state(config(), unparseable),
        Err(EngineError::StateValidation(_))
    ));

    assert!(matches!(
        EngineSnapshot::from_json("{not json"),
        Err(EngineError::Serialization(_))
    ));
}
