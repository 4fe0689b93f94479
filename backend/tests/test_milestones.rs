//! Milestone Generation Tests
//!
//! Tests for:
//! - Season normalization feeding the seasonal modifier
//! - Cascade resolution and the depth limit
//! - Citizen ordering within a batch
//! - Elder health incident factor

use generational_events_core::core::calendar::{CalendarContext, FixedCalendar, RawCalendar};
use generational_events_core::ledger::InMemoryLedger;
use generational_events_core::{
    CascadeRule, CitizenId, CitizenRecord, EngineConfig, HealthStatus, InMemoryRegistry, MilestoneCategory,
    MilestoneConfig, MilestoneGenerator, Orchestrator, Season, Severity,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn only(categories: &[(MilestoneCategory, f64)]) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.milestones.base_probabilities = categories.iter().copied().collect();
    config.milestones.cascade_rules.clear();
    config
}

fn raw(season: &str) -> RawCalendar {
    RawCalendar {
        cycle: 12,
        month: 1,
        season: season.to_string(),
    }
}

// ============================================================================
// Seasons
// ============================================================================

#[test]
fn test_season_casing_gives_same_modifier() {
    let config = MilestoneConfig::default();
    let generator = MilestoneGenerator::new(&config);

    let (upper, upper_err) = CalendarContext::normalize(raw("Winter"));
    let (lower, lower_err) = CalendarContext::normalize(raw("winter"));

    assert!(upper_err.is_none());
    assert!(lower_err.is_none());
    assert_eq!(upper, lower);
    assert_eq!(upper.season, Some(Season::Winter));
    assert_eq!(generator.modifier_for(upper.season), generator.modifier_for(lower.season));
    assert_eq!(generator.modifier_for(upper.season), 0.85);
}

#[test]
fn test_season_casing_gives_same_batch() {
    let population = vec![
        CitizenRecord::active(1, "Ada", 24),
        CitizenRecord::active(2, "Bo", 33),
        CitizenRecord::active(3, "Cy", 47),
    ];
    let mut config = EngineConfig::default();
    for p in config.milestones.base_probabilities.values_mut() {
        *p = (*p * 25.0).min(1.0);
    }

    let digest = |season: &str| {
        let mut orchestrator = Orchestrator::new(config.clone()).unwrap();
        let mut registry = InMemoryRegistry::new(population.clone());
        let mut ledger = InMemoryLedger::standard();
        orchestrator
            .run_cycle(12, &FixedCalendar::new(1, season), &mut registry, &mut ledger, None)
            .unwrap()
            .batch_digest
    };

    assert_eq!(digest("Winter"), digest("winter"));
    assert_eq!(digest("winter"), digest(" WINTER "));
}

#[test]
fn test_unknown_season_is_neutral_and_reported() {
    let mut orchestrator = Orchestrator::new(only(&[])).unwrap();
    let mut registry = InMemoryRegistry::new(vec![CitizenRecord::active(1, "Ada", 30)]);
    let mut ledger = InMemoryLedger::standard();

    let outcome = orchestrator
        .run_cycle(4, &FixedCalendar::new(7, "monsoon"), &mut registry, &mut ledger, None)
        .unwrap();

    let calendar = outcome.publication.report.findings_from("calendar");
    assert_eq!(calendar.len(), 1);
    assert_eq!(calendar[0].severity, Severity::Warning);

    let config = MilestoneConfig::default();
    assert_eq!(MilestoneGenerator::new(&config).modifier_for(None), 1.0);
}

// ============================================================================
// Cascades
// ============================================================================

#[test]
fn test_cascade_chain_truncated_at_depth_limit() {
    use MilestoneCategory::*;

    // Wedding -> Birth -> Relocation -> CivicParticipation, all certain, limit 3.
    let mut config = only(&[(Wedding, 1.0)]);
    config.milestones.cascade_rules = vec![
        CascadeRule::new(Wedding, Birth, 1.0),
        CascadeRule::new(Birth, Relocation, 1.0),
        CascadeRule::new(Relocation, CivicParticipation, 1.0),
    ];
    config.milestones.max_cascade_depth = 3;

    let mut orchestrator = Orchestrator::new(config).unwrap();
    let mut registry = InMemoryRegistry::new(vec![CitizenRecord::active(1, "Ada", 30)]);
    let mut ledger = InMemoryLedger::standard();

    let outcome = orchestrator
        .run_cycle(20, &FixedCalendar::new(6, "summer"), &mut registry, &mut ledger, None)
        .unwrap();

    assert_eq!(outcome.rows_written, 3);
    assert_eq!(
        ledger.column_values("Category").unwrap(),
        vec!["wedding", "birth", "relocation"]
    );
    assert_eq!(ledger.column_values("Cascade Depth").unwrap(), vec!["", "2", "3"]);
    assert_eq!(
        ledger.column_values("Cause").unwrap(),
        vec!["", "cascade:wedding", "cascade:birth"]
    );

    let truncated = outcome.publication.report.findings_from("milestones");
    assert_eq!(truncated.len(), 1);
    assert_eq!(truncated[0].severity, Severity::Warning);
    assert_eq!(truncated[0].citizen_id, Some(CitizenId(1)));
    assert_eq!(truncated[0].event_ids, vec![outcome.publication.accepted[2].event_id]);

    // Truncation is not a publication blocker
    assert!(outcome.publication.held.is_empty());
}

#[test]
fn test_cascade_respects_follow_on_eligibility() {
    use MilestoneCategory::*;

    // A 60-year-old can marry but is outside the birth window.
    let mut config = only(&[(Wedding, 1.0)]);
    config.milestones.cascade_rules = vec![CascadeRule::new(Wedding, Birth, 1.0)];
    let mut orchestrator = Orchestrator::new(config).unwrap();
    let mut registry = InMemoryRegistry::new(vec![CitizenRecord::active(1, "Ed", 60)]);
    let mut ledger = InMemoryLedger::standard();

    let outcome = orchestrator
        .run_cycle(2, &FixedCalendar::new(3, "spring"), &mut registry, &mut ledger, None)
        .unwrap();

    assert_eq!(ledger.column_values("Category").unwrap(), vec!["wedding"]);
    assert!(outcome.publication.report.findings_from("milestones").is_empty());
}

#[test]
fn test_job_loss_cascade_can_admit_to_hospital() {
    use MilestoneCategory::*;

    let mut config = only(&[(JobLoss, 1.0)]);
    config.milestones.cascade_rules = vec![CascadeRule::new(JobLoss, HealthIncident, 1.0)];
    let mut orchestrator = Orchestrator::new(config).unwrap();
    let mut registry = InMemoryRegistry::new(vec![CitizenRecord::active(1, "Bo", 44)]);
    let mut ledger = InMemoryLedger::standard();

    orchestrator
        .run_cycle(9, &FixedCalendar::new(9, "fall"), &mut registry, &mut ledger, None)
        .unwrap();

    assert_eq!(
        ledger.column_values("Category").unwrap(),
        vec!["job_loss", "health_incident", "hospitalization"]
    );
    assert_eq!(ledger.column_values("Cascade Depth").unwrap(), vec!["", "2", "3"]);
    assert_eq!(
        registry.citizen(CitizenId(1)).unwrap().health_status,
        HealthStatus::Hospitalized
    );
}

#[test]
fn test_incident_at_depth_limit_is_not_admitted() {
    use MilestoneCategory::*;

    // Wedding -> JobLoss -> HealthIncident puts the incident at the limit,
    // so its admission would be a depth-4 event.
    let mut config = only(&[(Wedding, 1.0)]);
    config.milestones.cascade_rules = vec![
        CascadeRule::new(Wedding, JobLoss, 1.0),
        CascadeRule::new(JobLoss, HealthIncident, 1.0),
    ];
    config.milestones.max_cascade_depth = 3;

    let mut orchestrator = Orchestrator::new(config).unwrap();
    let mut registry = InMemoryRegistry::new(vec![CitizenRecord::active(1, "Ada", 30)]);
    let mut ledger = InMemoryLedger::standard();

    let outcome = orchestrator
        .run_cycle(20, &FixedCalendar::new(6, "summer"), &mut registry, &mut ledger, None)
        .unwrap();

    assert_eq!(
        ledger.column_values("Category").unwrap(),
        vec!["wedding", "job_loss", "health_incident"]
    );
    assert_eq!(ledger.column_values("Cascade Depth").unwrap(), vec!["", "2", "3"]);
    assert!(outcome
        .publication
        .accepted
        .iter()
        .chain(&outcome.publication.held)
        .all(|e| e.cascade_depth <= 3));

    let truncated = outcome.publication.report.findings_from("milestones");
    assert_eq!(truncated.len(), 1);
    assert!(truncated[0].message.contains("health_incident -> hospitalization"));
    assert_eq!(truncated[0].event_ids, vec![outcome.publication.accepted[2].event_id]);

    assert_eq!(registry.citizen(CitizenId(1)).unwrap().health_status, HealthStatus::Active);
}

// ============================================================================
// Ordering and eligibility
// ============================================================================

#[test]
fn test_batch_ordered_by_citizen_id() {
    let mut orchestrator = Orchestrator::new(only(&[(MilestoneCategory::Relocation, 1.0)])).unwrap();
    let mut registry = InMemoryRegistry::new(vec![
        CitizenRecord::active(30, "C", 30),
        CitizenRecord::active(4, "A", 30),
        CitizenRecord::active(17, "B", 30),
    ]);
    let mut ledger = InMemoryLedger::standard();

    orchestrator
        .run_cycle(1, &FixedCalendar::new(1, "winter"), &mut registry, &mut ledger, None)
        .unwrap();

    assert_eq!(
        ledger.column_values("POPID").unwrap(),
        vec!["POP-00004", "POP-00017", "POP-00030"]
    );
}

#[test]
fn test_no_health_incident_after_transition_same_cycle() {
    let mut config = only(&[(MilestoneCategory::HealthIncident, 1.0)]);
    config.health.recovery_cooldown_cycles = 2;
    let mut orchestrator = Orchestrator::new(config).unwrap();
    let record = CitizenRecord::active(1, "R", 40).with_status(HealthStatus::Recovering, Some(3), Some(1));
    let mut registry = InMemoryRegistry::new(vec![record]);
    let mut ledger = InMemoryLedger::standard();

    let outcome = orchestrator
        .run_cycle(5, &FixedCalendar::new(2, "winter"), &mut registry, &mut ledger, None)
        .unwrap();

    assert_eq!(outcome.transitions.len(), 1);
    assert_eq!(ledger.column_values("Category").unwrap(), vec!["discharge"]);
    assert_eq!(registry.citizen(CitizenId(1)).unwrap().health_status, HealthStatus::Active);
}

#[test]
fn test_elder_incident_probability() {
    let config = MilestoneConfig::default();
    let generator = MilestoneGenerator::new(&config);

    let young = generator.probability(MilestoneCategory::HealthIncident, 40, 1.0);
    let elder = generator.probability(MilestoneCategory::HealthIncident, 65, 1.0);
    assert!((elder - young * 2.0).abs() < 1e-12);

    // Other categories ignore age beyond eligibility windows
    assert_eq!(
        generator.probability(MilestoneCategory::Relocation, 40, 1.0),
        generator.probability(MilestoneCategory::Relocation, 80, 1.0)
    );
}

#[test]
fn test_lifecycle_categories_are_never_rolled() {
    let mut config = only(&[]);
    config
        .milestones
        .base_probabilities
        .insert(MilestoneCategory::Death, 0.5);
    assert!(config.validate().is_err());
}
