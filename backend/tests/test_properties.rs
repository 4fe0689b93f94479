//! Property Tests
//!
//! Randomized checks over seeds, populations and calendar inputs:
//! - Replaying a cycle is byte-identical
//! - Season normalization is idempotent
//! - Deceased citizens never change or produce events
//! - No transient status outlives its maximum by more than one cycle

use generational_events_core::core::calendar::{normalize_season, FixedCalendar, WeeklyCalendar};
use generational_events_core::ledger::InMemoryLedger;
use generational_events_core::lifecycle::{self, HealthConfig};
use generational_events_core::{
    Citizen, CitizenRecord, EngineConfig, HealthStatus, InMemoryRegistry, Orchestrator, RngManager,
};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn status() -> impl Strategy<Value = HealthStatus> {
    prop::sample::select(vec![
        HealthStatus::Active,
        HealthStatus::Active,
        HealthStatus::Hospitalized,
        HealthStatus::Recovering,
        HealthStatus::Critical,
        HealthStatus::Deceased,
    ])
}

fn population() -> impl Strategy<Value = Vec<CitizenRecord>> {
    prop::collection::vec((0u32..95, status(), 0u64..6), 1..30).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (age, status, start))| {
                let record = CitizenRecord::active(i as u64 + 1, format!("P{}", i), age);
                if status == HealthStatus::Active {
                    record
                } else {
                    record.with_status(status, Some(start), Some(0))
                }
            })
            .collect()
    })
}

fn season_spelling() -> impl Strategy<Value = String> {
    (
        prop::sample::select(vec!["spring", "summer", "fall", "autumn", "winter"]),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(season, upper, padded)| {
            let s = if upper {
                season.to_uppercase()
            } else {
                season.to_string()
            };
            if padded {
                format!("  {} ", s)
            } else {
                s
            }
        })
}

/// Aggressive health settings so deaths and forced resolutions happen
fn harsh_config(seed: u64) -> EngineConfig {
    let mut config = EngineConfig {
        base_seed: seed,
        ..EngineConfig::default()
    };
    config.health.p_critical = 0.4;
    config.health.p_death = 0.4;
    for p in config.milestones.base_probabilities.values_mut() {
        *p = (*p * 20.0).min(1.0);
    }
    config
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_cycle_replay_identical(seed in any::<u64>(), cycle in 0u64..10_000, records in population()) {
        let run = || {
            let mut orchestrator = Orchestrator::new(harsh_config(seed)).unwrap();
            let mut registry = InMemoryRegistry::new(records.clone());
            let mut ledger = InMemoryLedger::standard();
            let outcome = orchestrator
                .run_cycle(cycle, &WeeklyCalendar::default(), &mut registry, &mut ledger, None)
                .unwrap();
            (outcome, ledger, registry.records().cloned().collect::<Vec<_>>())
        };

        let (a, ledger_a, registry_a) = run();
        let (b, ledger_b, registry_b) = run();
        prop_assert_eq!(a, b);
        prop_assert_eq!(ledger_a, ledger_b);
        prop_assert_eq!(registry_a, registry_b);
    }

    #[test]
    fn prop_season_normalization_idempotent(raw in season_spelling()) {
        let season = normalize_season(&raw).unwrap();
        prop_assert_eq!(normalize_season(season.as_str()).unwrap(), season);
        prop_assert_eq!(normalize_season(&season.to_string()).unwrap(), season);
    }

    #[test]
    fn prop_deceased_is_terminal(seed in any::<u64>(), records in population()) {
        let mut orchestrator = Orchestrator::new(harsh_config(seed)).unwrap();
        let mut registry = InMemoryRegistry::new(records);
        let mut ledger = InMemoryLedger::standard();
        let calendar = FixedCalendar::new(7, "summer");

        for cycle in 6..30 {
            let dead_before: Vec<CitizenRecord> = registry
                .records()
                .filter(|r| r.health_status == "deceased")
                .cloned()
                .collect();

            let outcome = orchestrator
                .run_cycle(cycle, &calendar, &mut registry, &mut ledger, None)
                .unwrap();

            for record in &dead_before {
                prop_assert_eq!(registry.get(record.id), Some(record));
                let appears = outcome
                    .publication
                    .accepted
                    .iter()
                    .chain(&outcome.publication.held)
                    .any(|e| e.citizen_id == record.id);
                prop_assert!(!appears);
            }
            prop_assert!(outcome.publication.report.findings_from("continuity").is_empty());
        }
    }

    #[test]
    fn prop_transient_duration_bounded(seed in any::<u64>(), start in 0u64..50, max in 1u64..12, critical in any::<bool>()) {
        let config = HealthConfig {
            max_hospitalized_cycles: max,
            max_critical_cycles: max,
            ..HealthConfig::default()
        };
        let status = if critical { HealthStatus::Critical } else { HealthStatus::Hospitalized };
        let mut citizen = Citizen::new(1, "T", 50).with_status(status, start);

        // Step every cycle until the status resolves
        let mut cycle = start;
        loop {
            cycle += 1;
            let mut rng = RngManager::for_cycle(seed, cycle);
            let step = lifecycle::step(&mut citizen, cycle, &config, &mut rng);
            if step.transition.is_some() {
                prop_assert!(cycle - start <= max + 1);
                break;
            }
            prop_assert!(cycle - start <= max);
        }
    }
}
