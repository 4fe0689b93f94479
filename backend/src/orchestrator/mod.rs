//! Orchestrator - one simulation cycle at a time
//!
//! See `engine.rs` for the cycle sequence and `checkpoint.rs` for
//! save/restore.

pub mod checkpoint;
pub mod engine;

// Re-export main types for convenience
pub use engine::{CycleOutcome, CyclePlan, EngineConfig, EngineError, Orchestrator};

// Re-export checkpoint types
pub use checkpoint::{compute_config_hash, validate_snapshot, EngineSnapshot};
