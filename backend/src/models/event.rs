//! Milestone events for ledger writing and narrative hand-off.
//!
//! This module defines [`MilestoneEvent`], one occurrence of a life milestone
//! or health transition for one citizen in one cycle. Events enable:
//! - Auditing (one ledger row per event)
//! - Replay checks (batch digests are byte-stable for the same seed)
//! - Validation (tone, continuity, distribution, sensitivity)
//!
//! # Event Categories
//!
//! - **Generated milestones**: birth, wedding, graduation, career, civic,
//!   relocation, health incident
//! - **Lifecycle transitions**: hospitalization, critical condition,
//!   recovery, discharge, death
//!
//! # Example
//!
//! ```rust
//! use generational_events_core::core::calendar::{CalendarContext, Season};
//! use generational_events_core::models::{CitizenId, MilestoneCategory, MilestoneEvent};
//!
//! let event = MilestoneEvent::milestone(
//!     CitizenId(42),
//!     MilestoneCategory::Wedding,
//!     CalendarContext::new(10, 6, Season::Summer),
//! );
//!
//! assert_eq!(event.cycle(), 10);
//! assert_eq!(event.outcome, "married");
//! ```

use crate::core::calendar::CalendarContext;
use crate::models::citizen::{CitizenId, HealthStatus};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// How a milestone reads to a narrative consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Celebratory,
    Neutral,
    Somber,
}

/// Milestone category
///
/// Declaration order is the evaluation order used by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneCategory {
    Birth,
    Wedding,
    Graduation,
    Promotion,
    JobLoss,
    CivicHonor,
    CivicParticipation,
    Relocation,
    HealthIncident,
    Hospitalization,
    CriticalCondition,
    Recovery,
    Discharge,
    Death,
}

impl MilestoneCategory {
    /// Categories the milestone generator rolls for, in evaluation order.
    pub const GENERATED: [MilestoneCategory; 9] = [
        MilestoneCategory::Birth,
        MilestoneCategory::Wedding,
        MilestoneCategory::Graduation,
        MilestoneCategory::Promotion,
        MilestoneCategory::JobLoss,
        MilestoneCategory::CivicHonor,
        MilestoneCategory::CivicParticipation,
        MilestoneCategory::Relocation,
        MilestoneCategory::HealthIncident,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneCategory::Birth => "birth",
            MilestoneCategory::Wedding => "wedding",
            MilestoneCategory::Graduation => "graduation",
            MilestoneCategory::Promotion => "promotion",
            MilestoneCategory::JobLoss => "job_loss",
            MilestoneCategory::CivicHonor => "civic_honor",
            MilestoneCategory::CivicParticipation => "civic_participation",
            MilestoneCategory::Relocation => "relocation",
            MilestoneCategory::HealthIncident => "health_incident",
            MilestoneCategory::Hospitalization => "hospitalization",
            MilestoneCategory::CriticalCondition => "critical_condition",
            MilestoneCategory::Recovery => "recovery",
            MilestoneCategory::Discharge => "discharge",
            MilestoneCategory::Death => "death",
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            MilestoneCategory::Birth
            | MilestoneCategory::Wedding
            | MilestoneCategory::Graduation
            | MilestoneCategory::Promotion
            | MilestoneCategory::CivicHonor => Tone::Celebratory,
            MilestoneCategory::CivicParticipation
            | MilestoneCategory::Relocation
            | MilestoneCategory::Recovery
            | MilestoneCategory::Discharge => Tone::Neutral,
            MilestoneCategory::JobLoss
            | MilestoneCategory::HealthIncident
            | MilestoneCategory::Hospitalization
            | MilestoneCategory::CriticalCondition
            | MilestoneCategory::Death => Tone::Somber,
        }
    }

    /// Category produced by the lifecycle state machine rather than rolled
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            MilestoneCategory::Hospitalization
                | MilestoneCategory::CriticalCondition
                | MilestoneCategory::Recovery
                | MilestoneCategory::Discharge
                | MilestoneCategory::Death
        )
    }

    /// Lifecycle category recorded when a citizen enters `status`.
    pub fn for_status_entry(status: HealthStatus) -> MilestoneCategory {
        match status {
            HealthStatus::Hospitalized => MilestoneCategory::Hospitalization,
            HealthStatus::Critical => MilestoneCategory::CriticalCondition,
            HealthStatus::Recovering => MilestoneCategory::Recovery,
            HealthStatus::Active => MilestoneCategory::Discharge,
            HealthStatus::Deceased => MilestoneCategory::Death,
        }
    }

    /// Short outcome tag written to the ledger
    pub fn outcome_tag(&self) -> &'static str {
        match self {
            MilestoneCategory::Birth => "child_born",
            MilestoneCategory::Wedding => "married",
            MilestoneCategory::Graduation => "graduated",
            MilestoneCategory::Promotion => "promoted",
            MilestoneCategory::JobLoss => "job_lost",
            MilestoneCategory::CivicHonor => "honored",
            MilestoneCategory::CivicParticipation => "participated",
            MilestoneCategory::Relocation => "relocated",
            MilestoneCategory::HealthIncident => "incident",
            MilestoneCategory::Hospitalization => "hospitalized",
            MilestoneCategory::CriticalCondition => "critical",
            MilestoneCategory::Recovery => "recovering",
            MilestoneCategory::Discharge => "active",
            MilestoneCategory::Death => "deceased",
        }
    }

    /// Whether a citizen of `age` can experience this milestone
    pub fn eligible_at(&self, age: u32) -> bool {
        match self {
            MilestoneCategory::Birth => (18..=50).contains(&age),
            MilestoneCategory::Wedding => age >= 18,
            MilestoneCategory::Graduation => (16..=30).contains(&age),
            MilestoneCategory::Promotion | MilestoneCategory::JobLoss => (18..=70).contains(&age),
            MilestoneCategory::CivicHonor | MilestoneCategory::CivicParticipation => age >= 18,
            _ => true,
        }
    }
}

impl fmt::Display for MilestoneCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a lifecycle transition happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    /// Health incident cascaded into an admission
    Incident,
    /// Weighted roll selected this outcome
    Stochastic,
    /// Duration exceeded the configured maximum
    ForcedResolution,
    /// Recovery cooldown elapsed
    CooldownElapsed,
}

impl TransitionCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionCause::Incident => "incident",
            TransitionCause::Stochastic => "stochastic",
            TransitionCause::ForcedResolution => "forced_resolution",
            TransitionCause::CooldownElapsed => "cooldown_elapsed",
        }
    }
}

/// Status change carried by lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: HealthStatus,
    pub to: HealthStatus,
    pub cause: TransitionCause,
}

impl fmt::Display for StatusChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{} ({})", self.from, self.to, self.cause.as_str())
    }
}

/// One milestone or health transition for one citizen in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneEvent {
    /// Deterministic ID, stamped when the event is logged
    pub event_id: Uuid,
    pub citizen_id: CitizenId,
    pub category: MilestoneCategory,
    pub calendar: CalendarContext,
    /// Optional cause; cascades record their trigger here
    pub cause: Option<String>,
    pub outcome: String,
    /// 1 for a directly fired milestone, +1 per cascade step
    pub cascade_depth: u8,
    pub status_change: Option<StatusChange>,
}

impl MilestoneEvent {
    /// Directly fired milestone (depth 1, no cause)
    pub fn milestone(citizen_id: CitizenId, category: MilestoneCategory, calendar: CalendarContext) -> Self {
        Self {
            event_id: Uuid::nil(),
            citizen_id,
            category,
            calendar,
            cause: None,
            outcome: category.outcome_tag().to_string(),
            cascade_depth: 1,
            status_change: None,
        }
    }

    /// Event for a lifecycle transition
    pub fn transition(citizen_id: CitizenId, change: StatusChange, calendar: CalendarContext) -> Self {
        let category = MilestoneCategory::for_status_entry(change.to);
        let cause = match change.cause {
            TransitionCause::Stochastic | TransitionCause::Incident => None,
            other => Some(other.as_str().to_string()),
        };
        Self {
            event_id: Uuid::nil(),
            citizen_id,
            category,
            calendar,
            cause,
            outcome: change.to.as_str().to_string(),
            cascade_depth: 1,
            status_change: Some(change),
        }
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn at_depth(mut self, depth: u8) -> Self {
        self.cascade_depth = depth;
        self
    }

    pub fn cycle(&self) -> u64 {
        self.calendar.cycle
    }

    pub fn tone(&self) -> Tone {
        self.category.tone()
    }
}

/// Derive the ID of the `ordinal`-th event of a cycle batch.
///
/// The UUID is built from the first 16 bytes of SHA-256 over the base seed,
/// cycle and ordinal, so replaying a cycle yields identical IDs.
pub fn derive_event_id(base_seed: u64, cycle: u64, ordinal: u64) -> Uuid {
    let mut hasher = Sha256::new();
    hasher.update(base_seed.to_le_bytes());
    hasher.update(cycle.to_le_bytes());
    hasher.update(ordinal.to_le_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}

/// SHA-256 hex digest of a batch's canonical JSON encoding.
pub fn digest_events(events: &[MilestoneEvent]) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(events)?;
    let mut hasher = Sha256::new();
    hasher.update(&json);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Ordered batch of events for one cycle, with query helpers.
///
/// Logging an event stamps its deterministic ID from the batch position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    base_seed: u64,
    cycle: u64,
    events: Vec<MilestoneEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty log whose event IDs derive from (base_seed, cycle)
    pub fn for_cycle(base_seed: u64, cycle: u64) -> Self {
        Self {
            base_seed,
            cycle,
            events: Vec::new(),
        }
    }

    /// Add an event to the log, returning the ID it was stamped with
    pub fn log(&mut self, mut event: MilestoneEvent) -> Uuid {
        let id = derive_event_id(self.base_seed, self.cycle, self.events.len() as u64);
        event.event_id = id;
        self.events.push(event);
        id
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[MilestoneEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<MilestoneEvent> {
        self.events
    }

    /// Get events of a specific category
    pub fn events_of_category(&self, category: MilestoneCategory) -> Vec<&MilestoneEvent> {
        self.events.iter().filter(|e| e.category == category).collect()
    }

    /// Get events for a specific citizen
    pub fn events_for_citizen(&self, citizen_id: CitizenId) -> Vec<&MilestoneEvent> {
        self.events
            .iter()
            .filter(|e| e.citizen_id == citizen_id)
            .collect()
    }

    /// Get lifecycle transition events
    pub fn transitions(&self) -> Vec<&MilestoneEvent> {
        self.events
            .iter()
            .filter(|e| e.status_change.is_some())
            .collect()
    }
}
