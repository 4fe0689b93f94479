//! Generational Events Core - Rust Engine
//!
//! Cycle-based simulation of citizens moving through life milestones and a
//! health lifecycle, with an auditable ledger and pre-publication checks.
//!
//! # Architecture
//!
//! - **core**: Calendar context (season normalization, providers)
//! - **models**: Domain types (Citizen, MilestoneEvent, registry, world snapshot)
//! - **lifecycle**: Health status state machine
//! - **milestones**: Milestone generation and cascades
//! - **ledger**: Named-column life-history ledger writer
//! - **validation**: Tone, continuity, distribution and sensitivity checks
//! - **orchestrator**: One-cycle runner and checkpoints
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. All randomness is deterministic (per-cycle seeded RNG, citizen order)
//! 2. Ledger columns are never inserted, removed or reordered
//! 3. `deceased` is terminal
//! 4. FFI boundary is minimal and safe

// Module declarations
pub mod core;
pub mod ledger;
pub mod lifecycle;
pub mod milestones;
pub mod models;
pub mod orchestrator;
pub mod rng;
pub mod validation;

// Re-exports for convenience
pub use core::calendar::{
    normalize_season, CalendarContext, CalendarError, CalendarProvider, FixedCalendar, RawCalendar,
    Season, WeeklyCalendar,
};
pub use ledger::{InMemoryLedger, LedgerError, LedgerRow, LedgerStore, LedgerWriter};
pub use lifecycle::{HealthConfig, LifecycleError, Transition};
pub use milestones::{CascadeRule, MilestoneConfig, MilestoneGenerator};
pub use models::{
    citizen::{Citizen, CitizenId, CitizenRecord, HealthStatus, StatusParseError},
    event::{EventLog, MilestoneCategory, MilestoneEvent, StatusChange, TransitionCause},
    registry::{CitizenRegistry, InMemoryRegistry, RegistryError},
    world::{CrisisLevel, CrisisState, WorldSnapshot},
};
pub use orchestrator::{CycleOutcome, EngineConfig, EngineError, EngineSnapshot, Orchestrator};
pub use rng::RngManager;
pub use validation::{Finding, PublicationBatch, Severity, ValidationReport, ValidationSuite, Validator};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn generational_events_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::orchestrator::PyOrchestrator>()?;
    Ok(())
}
