//! Domain models for the generational events engine

pub mod citizen;
pub mod event;
pub mod registry;
pub mod world;

// Re-exports
pub use citizen::{Citizen, CitizenId, CitizenRecord, HealthStatus, StatusParseError};
pub use event::{
    digest_events, EventLog, MilestoneCategory, MilestoneEvent, StatusChange, Tone, TransitionCause,
};
pub use registry::{CitizenRegistry, InMemoryRegistry, RegistryError};
pub use world::{CategoryCounts, CrisisLevel, CrisisState, WorldSnapshot};
