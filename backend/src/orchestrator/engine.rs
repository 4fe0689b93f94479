//! Orchestrator engine
//!
//! Runs one simulation cycle at a time:
//!
//! ```text
//! For cycle c:
//! 1. Read calendar context and citizen records (once)
//! 2. Seed the cycle RNG from base_seed ^ c
//! 3. For each citizen, ascending by ID:
//!    a. Lifecycle step (transient statuses)
//!    b. Milestone rolls and cascades
//! 4. Append the batch to the ledger (single call)
//! 5. Save changed health fields to the registry
//! 6. Validate the batch and assemble the publication
//! ```
//!
//! Steps 1 to 3 are pure ([`Orchestrator::plan_cycle`]); nothing is
//! persisted until the full batch exists. A ledger failure returns before
//! any registry write.
//!
//! # Example
//!
//! ```rust
//! use generational_events_core::core::calendar::WeeklyCalendar;
//! use generational_events_core::ledger::InMemoryLedger;
//! use generational_events_core::models::{CitizenRecord, InMemoryRegistry};
//! use generational_events_core::orchestrator::{EngineConfig, Orchestrator};
//!
//! let mut orchestrator = Orchestrator::new(EngineConfig::default()).unwrap();
//! let mut registry = InMemoryRegistry::new(vec![
//!     CitizenRecord::active(1, "Ada", 34),
//!     CitizenRecord::active(2, "Bo", 71),
//! ]);
//! let mut ledger = InMemoryLedger::standard();
//!
//! let outcome = orchestrator
//!     .run_cycle(1, &WeeklyCalendar::default(), &mut registry, &mut ledger, None)
//!     .unwrap();
//! assert_eq!(outcome.rows_written, ledger.len());
//! ```

use crate::core::calendar::{CalendarContext, CalendarProvider, RawCalendar};
use crate::ledger::{LedgerError, LedgerStore, LedgerWriter};
use crate::lifecycle::{self, HealthConfig, Transition};
use crate::milestones::{MilestoneConfig, MilestoneGenerator};
use crate::models::citizen::{Citizen, CitizenRecord};
use crate::models::event::{digest_events, EventLog, MilestoneEvent};
use crate::models::registry::{CitizenRegistry, RegistryError};
use crate::models::world::{CategoryCounts, CrisisState, WorldSnapshot};
use crate::rng::RngManager;
use crate::validation::{
    category_counts, Finding, PublicationBatch, Severity, ValidationConfig, ValidationSuite,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

// ============================================================================
// Errors and configuration
// ============================================================================

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Ledger write failed: {0}")]
    Ledger(#[from] LedgerError),

    /// Upstream registry failures, passed through unchanged
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Registry save failed after the ledger append. The cycle is not
    /// committed; replaying it appends `rows_written` rows a second time.
    #[error("Cycle {cycle} partially committed ({rows_written} ledger rows, {saved} citizens saved): {source}")]
    PartialCommit {
        cycle: u64,
        rows_written: usize,
        saved: usize,
        #[source]
        source: RegistryError,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("State validation error: {0}")]
    StateValidation(String),
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Every cycle's RNG derives from this seed and the cycle number
    pub base_seed: u64,
    pub health: HealthConfig,
    pub milestones: MilestoneConfig,
    pub validation: ValidationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_seed: 42,
            health: HealthConfig::default(),
            milestones: MilestoneConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse JSON; absent fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidConfig(format!("Config parse failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let mut errors = Vec::new();
        self.health.validate(&mut errors);
        self.milestones.validate(&mut errors);
        self.validation.validate(&mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(EngineError::InvalidConfig(errors.join("; ")))
        }
    }
}

// ============================================================================
// Cycle results
// ============================================================================

/// Everything computed for one cycle before anything is persisted
#[derive(Debug, Clone, PartialEq)]
pub struct CyclePlan {
    pub calendar: CalendarContext,
    /// Working set as loaded, ascending by ID
    pub loaded: Vec<Citizen>,
    /// Working set after this cycle's transitions
    pub citizens: Vec<Citizen>,
    pub events: Vec<MilestoneEvent>,
    pub transitions: Vec<Transition>,
    /// Non-fatal findings raised while planning
    pub findings: Vec<Finding>,
    pub world: WorldSnapshot,
}

impl CyclePlan {
    pub fn cycle(&self) -> u64 {
        self.calendar.cycle
    }

    /// Citizens whose health fields differ from what was loaded
    pub fn changed_citizens(&self) -> impl Iterator<Item = &Citizen> {
        self.citizens.iter().zip(&self.loaded).filter_map(|(after, before)| {
            let changed = after.health_status != before.health_status
                || after.status_start_cycle != before.status_start_cycle
                || after.status_duration != before.status_duration;
            changed.then_some(after)
        })
    }
}

/// Result of one committed cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleOutcome {
    pub publication: PublicationBatch,
    pub transitions: Vec<Transition>,
    pub rows_written: usize,
    /// SHA-256 of the batch; equal across replays of the same cycle
    pub batch_digest: String,
}

impl CycleOutcome {
    pub fn cycle(&self) -> u64 {
        self.publication.cycle
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Drives cycles against external collaborators.
pub struct Orchestrator {
    config: EngineConfig,
    validation: ValidationSuite,
    /// Resolved on first write against the store's schema
    writer: Option<LedgerWriter>,
    /// Category counts of recent cycles, oldest first
    distribution_history: VecDeque<CategoryCounts>,
    last_cycle: Option<u64>,
    /// Working set after the last committed cycle
    citizens: Vec<Citizen>,
}

impl Orchestrator {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let validation = ValidationSuite::standard(config.milestones.expected_shares(), &config.validation);
        Ok(Self {
            config,
            validation,
            writer: None,
            distribution_history: VecDeque::new(),
            last_cycle: None,
            citizens: Vec::new(),
        })
    }

    /// Replace the validation suite (e.g. to register extra checks).
    pub fn with_validation(mut self, validation: ValidationSuite) -> Self {
        self.validation = validation;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn last_cycle(&self) -> Option<u64> {
        self.last_cycle
    }

    pub fn citizens(&self) -> &[Citizen] {
        &self.citizens
    }

    pub fn distribution_history(&self) -> impl Iterator<Item = &CategoryCounts> {
        self.distribution_history.iter()
    }

    /// Resolve the ledger column mapping now instead of on first write.
    pub fn attach_ledger<L: LedgerStore + ?Sized>(&mut self, ledger: &L) {
        self.writer = Some(LedgerWriter::resolve(&ledger.schema()));
    }

    /// Compute one cycle against an in-memory working set. No I/O.
    pub fn plan_cycle(
        &self,
        cycle: u64,
        raw_calendar: RawCalendar,
        records: Vec<CitizenRecord>,
        crisis: Option<CrisisState>,
        rng: &mut RngManager,
    ) -> CyclePlan {
        let mut findings = Vec::new();

        let raw_cycle = raw_calendar.cycle;
        let (mut calendar, season_error) = CalendarContext::normalize(raw_calendar);
        if let Some(err) = season_error {
            tracing::warn!(target: "orchestrator", cycle, error = %err, "using neutral seasonal modifier");
            findings.push(Finding::new("calendar", Severity::Warning, err.to_string()));
        }
        if raw_cycle != cycle {
            findings.push(Finding::new(
                "calendar",
                Severity::Warning,
                format!("provider returned cycle {} for cycle {}", raw_cycle, cycle),
            ));
            calendar.cycle = cycle;
        }

        let mut citizens = Vec::with_capacity(records.len());
        for record in records {
            let id = record.id;
            match Citizen::try_from(record) {
                Ok(citizen) => citizens.push(citizen),
                Err(err) => {
                    tracing::warn!(target: "orchestrator", cycle, citizen_id = id.0, error = %err, "record skipped");
                    findings.push(
                        Finding::new("registry", Severity::Warning, format!("{} skipped: {}", id, err))
                            .for_citizen(id),
                    );
                }
            }
        }
        citizens.sort_by_key(|c| c.id);
        let loaded = citizens.clone();

        let generator = MilestoneGenerator::new(&self.config.milestones);
        let mut log = EventLog::for_cycle(self.config.base_seed, cycle);
        let mut transitions = Vec::new();

        for citizen in citizens.iter_mut() {
            let step = lifecycle::step(citizen, cycle, &self.config.health, rng);
            if step.repaired {
                findings.push(
                    Finding::new(
                        "lifecycle",
                        Severity::Info,
                        format!("{} had unset or corrupt status cycles; reset to cycle {}", citizen.id, cycle),
                    )
                    .for_citizen(citizen.id),
                );
            }
            if let Some(transition) = step.transition {
                log.log(MilestoneEvent::transition(citizen.id, transition.change, calendar.clone()));
                transitions.push(transition);
            }

            let health_eligible = step.transition.is_none();
            let admissions =
                generator.generate_for(citizen, &calendar, health_eligible, rng, &mut log, &mut findings);
            transitions.extend(admissions);
        }

        let world = WorldSnapshot::from_citizens(cycle, &loaded, &citizens)
            .with_crisis(crisis)
            .with_history(self.distribution_history.iter().cloned().collect());

        CyclePlan {
            calendar,
            loaded,
            citizens,
            events: log.into_events(),
            transitions,
            findings,
            world,
        }
    }

    /// Run one cycle with the RNG seeded from `base_seed ^ cycle`.
    pub fn run_cycle<C, R, L>(
        &mut self,
        cycle: u64,
        calendar: &C,
        registry: &mut R,
        ledger: &mut L,
        crisis: Option<CrisisState>,
    ) -> Result<CycleOutcome, EngineError>
    where
        C: CalendarProvider + ?Sized,
        R: CitizenRegistry + ?Sized,
        L: LedgerStore + ?Sized,
    {
        let mut rng = RngManager::for_cycle(self.config.base_seed, cycle);
        self.run_cycle_with_rng(cycle, calendar, registry, ledger, crisis, &mut rng)
    }

    /// Run one cycle with an explicit RNG.
    pub fn run_cycle_with_rng<C, R, L>(
        &mut self,
        cycle: u64,
        calendar: &C,
        registry: &mut R,
        ledger: &mut L,
        crisis: Option<CrisisState>,
        rng: &mut RngManager,
    ) -> Result<CycleOutcome, EngineError>
    where
        C: CalendarProvider + ?Sized,
        R: CitizenRegistry + ?Sized,
        L: LedgerStore + ?Sized,
    {
        let raw_calendar = calendar.calendar_context(cycle);
        let records = registry.load_active_citizens()?;
        let plan = self.plan_cycle(cycle, raw_calendar, records, crisis, rng);

        let writer = self
            .writer
            .get_or_insert_with(|| LedgerWriter::resolve(&ledger.schema()));
        let rows_written = writer.write(ledger, &plan.events).map_err(|e| {
            tracing::error!(target: "orchestrator", cycle, error = %e, "ledger write failed; cycle not committed");
            e
        })?;

        for (saved, citizen) in plan.changed_citizens().enumerate() {
            registry
                .save_citizen_status(
                    citizen.id,
                    citizen.health_status,
                    citizen.status_start_cycle,
                    citizen.status_duration,
                )
                .map_err(|source| {
                    tracing::error!(
                        target: "orchestrator",
                        cycle,
                        rows_written,
                        saved,
                        citizen_id = citizen.id.0,
                        error = %source,
                        "registry save failed after ledger append"
                    );
                    EngineError::PartialCommit {
                        cycle,
                        rows_written,
                        saved,
                        source,
                    }
                })?;
        }

        let report = self.validation.run(&plan.events, &plan.world, plan.findings);
        let batch_digest = digest_events(&plan.events).map_err(|e| {
            EngineError::Serialization(format!("Batch digest failed: {}", e))
        })?;

        self.record_distribution(category_counts(&plan.events));
        self.last_cycle = Some(cycle);
        self.citizens = plan.citizens;

        let publication = PublicationBatch::assemble(plan.events, report);
        tracing::info!(
            target: "orchestrator",
            cycle,
            events = rows_written,
            transitions = plan.transitions.len(),
            held = publication.held.len(),
            findings = publication.report.findings.len(),
            "cycle committed"
        );

        Ok(CycleOutcome {
            publication,
            transitions: plan.transitions,
            rows_written,
            batch_digest,
        })
    }

    fn record_distribution(&mut self, counts: CategoryCounts) {
        self.distribution_history.push_back(counts);
        while self.distribution_history.len() > self.config.validation.distribution.window_cycles {
            self.distribution_history.pop_front();
        }
    }

    pub(crate) fn restore(
        config: EngineConfig,
        last_cycle: Option<u64>,
        citizens: Vec<Citizen>,
        history: Vec<CategoryCounts>,
    ) -> Result<Self, EngineError> {
        let mut orchestrator = Self::new(config)?;
        orchestrator.last_cycle = last_cycle;
        orchestrator.citizens = citizens;
        for counts in history {
            orchestrator.record_distribution(counts);
        }
        Ok(orchestrator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calendar::FixedCalendar;
    use crate::ledger::InMemoryLedger;
    use crate::models::citizen::HealthStatus;
    use crate::models::registry::InMemoryRegistry;

    fn quiet() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.milestones.base_probabilities.clear();
        config
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.health.p_death = 1.5;
        assert!(matches!(Orchestrator::new(config), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_from_partial_json() {
        let config = EngineConfig::from_json_str(r#"{"base_seed": 7, "health": {"max_critical_cycles": 2}}"#).unwrap();
        assert_eq!(config.base_seed, 7);
        assert_eq!(config.health.max_critical_cycles, 2);
        assert_eq!(config.health.max_hospitalized_cycles, 8);
    }

    #[test]
    fn test_unknown_status_record_is_skipped_with_finding() {
        let orchestrator = Orchestrator::new(quiet()).unwrap();
        let mut bad = CitizenRecord::active(2, "B", 30);
        bad.health_status = "zombie".to_string();
        let records = vec![CitizenRecord::active(1, "A", 30), bad];
        let raw = FixedCalendar::new(1, "winter").calendar_context(3);

        let plan = orchestrator.plan_cycle(3, raw, records, None, &mut RngManager::new(1));
        assert_eq!(plan.citizens.len(), 1);
        assert_eq!(plan.findings.len(), 1);
        assert_eq!(plan.findings[0].source, "registry");
    }

    #[test]
    fn test_invalid_season_is_a_finding_not_an_error() {
        let mut orchestrator = Orchestrator::new(quiet()).unwrap();
        let mut registry = InMemoryRegistry::new(vec![CitizenRecord::active(1, "A", 30)]);
        let mut ledger = InMemoryLedger::standard();

        let outcome = orchestrator
            .run_cycle(3, &FixedCalendar::new(1, "monsoon"), &mut registry, &mut ledger, None)
            .unwrap();
        assert_eq!(outcome.publication.report.findings_from("calendar").len(), 1);
    }

    #[test]
    fn test_ledger_failure_saves_nothing() {
        let mut orchestrator = Orchestrator::new(quiet()).unwrap();
        let record = CitizenRecord::active(1, "A", 30).with_status(HealthStatus::Critical, Some(0), Some(0));
        let mut registry = InMemoryRegistry::new(vec![record.clone()]);
        let mut ledger = InMemoryLedger::standard();
        ledger.fail_next_append("offline");

        // Critical since 0, max 5: forced death at cycle 6 produces an event.
        let result = orchestrator.run_cycle(6, &FixedCalendar::new(1, "winter"), &mut registry, &mut ledger, None);
        assert!(matches!(result, Err(EngineError::Ledger(LedgerError::Store(_)))));
        assert_eq!(registry.get(record.id), Some(&record));
        assert_eq!(orchestrator.last_cycle(), None);
    }

    #[test]
    fn test_history_window_is_bounded() {
        let mut orchestrator = Orchestrator::new(quiet()).unwrap();
        let mut registry = InMemoryRegistry::new(vec![CitizenRecord::active(1, "A", 30)]);
        let mut ledger = InMemoryLedger::standard();
        for cycle in 0..10 {
            orchestrator
                .run_cycle(cycle, &FixedCalendar::new(1, "winter"), &mut registry, &mut ledger, None)
                .unwrap();
        }
        assert_eq!(orchestrator.distribution_history().count(), 4);
    }
}
