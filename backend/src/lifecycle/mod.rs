//! Health lifecycle state machine
//!
//! Evaluates, once per cycle, every citizen in a transient health status and
//! decides whether a transition happens.
//!
//! ```text
//!              incident               p_recover / forced
//!   active ─────────────▶ hospitalized ─────────────────▶ recovering
//!     ▲                        │                             │  ▲
//!     │                        │ p_critical                  │  │ p_stabilize
//!     │                        ▼                             │  │ (optional)
//!     │                     critical ────────────────────────┼──┘
//!     │                        │ p_death / forced            │
//!     │                        ▼                             │
//!     │                     deceased (terminal)              │
//!     └──────────────────────────────────────────────────────┘
//!                  p_discharge / cooldown elapsed
//! ```
//!
//! # Critical Invariants
//!
//! 1. No citizen stays in `hospitalized` or `critical` longer than the
//!    configured maximum: forced resolution overrides the roll
//! 2. Exactly one roll is drawn per transient citizen per cycle, forced or
//!    not, so RNG alignment never depends on the outcome
//! 3. `deceased` is terminal
//! 4. Corrupt duration fields reset to "just entered", never fail the cycle

use crate::models::citizen::{Citizen, CitizenId, HealthStatus};
use crate::models::event::{StatusChange, TransitionCause};
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LifecycleError {
    #[error("Illegal transition for {citizen}: {from} -> {to}")]
    IllegalTransition {
        citizen: CitizenId,
        from: HealthStatus,
        to: HealthStatus,
    },
}

/// Transition probabilities and duration limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Per-cycle chance that a hospitalized citizen starts recovering
    pub p_recover: f64,
    /// Per-cycle chance that a hospitalized citizen turns critical
    pub p_critical: f64,
    /// Per-cycle chance that a recovering citizen returns to active
    pub p_discharge: f64,
    /// Per-cycle chance that a critical citizen dies
    pub p_death: f64,
    /// Per-cycle chance that a critical citizen stabilizes; `None` disables
    pub p_stabilize: Option<f64>,
    /// Hospitalized longer than this is forced to recovering
    pub max_hospitalized_cycles: u64,
    /// Critical longer than this is forced to deceased
    pub max_critical_cycles: u64,
    /// Recovering citizens return to active once this many cycles passed
    pub recovery_cooldown_cycles: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            p_recover: 0.35,
            p_critical: 0.08,
            p_discharge: 0.30,
            p_death: 0.20,
            p_stabilize: Some(0.15),
            max_hospitalized_cycles: 8,
            max_critical_cycles: 5,
            recovery_cooldown_cycles: 3,
        }
    }
}

impl HealthConfig {
    /// Append configuration problems to `errors`
    pub fn validate(&self, errors: &mut Vec<String>) {
        let probabilities = [
            ("p_recover", Some(self.p_recover)),
            ("p_critical", Some(self.p_critical)),
            ("p_discharge", Some(self.p_discharge)),
            ("p_death", Some(self.p_death)),
            ("p_stabilize", self.p_stabilize),
        ];
        for (name, value) in probabilities {
            if let Some(p) = value {
                if !(0.0..=1.0).contains(&p) {
                    errors.push(format!("health.{} must be within [0, 1], got {}", name, p));
                }
            }
        }
        if self.max_hospitalized_cycles == 0 {
            errors.push("health.max_hospitalized_cycles must be positive".to_string());
        }
        if self.max_critical_cycles == 0 {
            errors.push("health.max_critical_cycles must be positive".to_string());
        }
    }
}

/// Normalize outcome probabilities plus an implicit "no change" weight.
///
/// The returned vector has one entry per input followed by the remain
/// weight, and always sums to 1.0. If the inputs already exceed 1.0 the
/// remain weight is zero and the inputs are scaled down proportionally.
/// Negative or NaN inputs count as zero.
///
/// # Example
/// ```
/// use generational_events_core::lifecycle::normalized_weights;
///
/// assert_eq!(normalized_weights(&[0.25, 0.25]), vec![0.25, 0.25, 0.5]);
/// assert_eq!(normalized_weights(&[1.5, 0.5]), vec![0.75, 0.25, 0.0]);
/// ```
pub fn normalized_weights(probabilities: &[f64]) -> Vec<f64> {
    let mut weights: Vec<f64> = probabilities
        .iter()
        .map(|p| if p.is_finite() && *p > 0.0 { *p } else { 0.0 })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.push((1.0 - sum).max(0.0));

    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        // Unreachable given remain = max(0, 1 - sum), kept for NaN safety.
        let last = weights.len() - 1;
        weights.iter_mut().for_each(|w| *w = 0.0);
        weights[last] = 1.0;
        return weights;
    }
    weights.iter_mut().for_each(|w| *w /= total);
    weights
}

/// A committed status change for one citizen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub citizen_id: CitizenId,
    pub cycle: u64,
    pub change: StatusChange,
}

/// Result of evaluating one citizen for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Step {
    pub transition: Option<Transition>,
    /// The citizen's cycle fields were unset or corrupt and were reset
    pub repaired: bool,
}

/// Recompute `status_duration` for the current cycle.
///
/// Returns `true` when the stored start cycle was missing or lay in the
/// future and had to be reset to the current cycle.
pub fn refresh_duration(citizen: &mut Citizen, cycle: u64) -> bool {
    if !citizen.health_status.is_transient() {
        return false;
    }
    match citizen.status_start_cycle {
        Some(start) if start <= cycle => {
            citizen.status_duration = Some(cycle - start);
            false
        }
        _ => {
            citizen.status_start_cycle = Some(cycle);
            citizen.status_duration = Some(0);
            true
        }
    }
}

/// Admit an active citizen to hospital (`active → hospitalized`).
pub fn admit(citizen: &mut Citizen, cycle: u64) -> Result<Transition, LifecycleError> {
    apply(citizen, cycle, HealthStatus::Hospitalized, TransitionCause::Incident)
}

/// Evaluate one citizen for one cycle.
///
/// Active and deceased citizens are left untouched and consume no draws.
pub fn step(citizen: &mut Citizen, cycle: u64, config: &HealthConfig, rng: &mut RngManager) -> Step {
    let status = citizen.health_status;
    if !status.is_transient() {
        return Step::default();
    }

    let repaired = refresh_duration(citizen, cycle);
    let duration = citizen.status_duration.unwrap_or(0);

    let target = match status {
        HealthStatus::Hospitalized => {
            let weights = normalized_weights(&[config.p_recover, config.p_critical]);
            let pick = rng.pick_weighted(&weights);
            if duration > config.max_hospitalized_cycles {
                Some((HealthStatus::Recovering, TransitionCause::ForcedResolution))
            } else {
                match pick {
                    Some(0) => Some((HealthStatus::Recovering, TransitionCause::Stochastic)),
                    Some(1) => Some((HealthStatus::Critical, TransitionCause::Stochastic)),
                    _ => None,
                }
            }
        }
        HealthStatus::Critical => {
            let weights =
                normalized_weights(&[config.p_death, config.p_stabilize.unwrap_or(0.0)]);
            let pick = rng.pick_weighted(&weights);
            if duration > config.max_critical_cycles {
                Some((HealthStatus::Deceased, TransitionCause::ForcedResolution))
            } else {
                match pick {
                    Some(0) => Some((HealthStatus::Deceased, TransitionCause::Stochastic)),
                    Some(1) if config.p_stabilize.is_some() => {
                        Some((HealthStatus::Recovering, TransitionCause::Stochastic))
                    }
                    _ => None,
                }
            }
        }
        HealthStatus::Recovering => {
            let discharged = rng.chance(config.p_discharge);
            if duration >= config.recovery_cooldown_cycles {
                Some((HealthStatus::Active, TransitionCause::CooldownElapsed))
            } else if discharged {
                Some((HealthStatus::Active, TransitionCause::Stochastic))
            } else {
                None
            }
        }
        HealthStatus::Active | HealthStatus::Deceased => None,
    };

    let transition = match target {
        Some((to, cause)) => apply(citizen, cycle, to, cause).ok(),
        None => None,
    };

    Step {
        transition,
        repaired,
    }
}

/// Move a citizen to `to`, resetting the duration fields.
fn apply(
    citizen: &mut Citizen,
    cycle: u64,
    to: HealthStatus,
    cause: TransitionCause,
) -> Result<Transition, LifecycleError> {
    let from = citizen.health_status;
    if !from.can_transition_to(to) {
        return Err(LifecycleError::IllegalTransition {
            citizen: citizen.id,
            from,
            to,
        });
    }

    citizen.health_status = to;
    citizen.status_start_cycle = Some(cycle);
    citizen.status_duration = Some(0);

    tracing::debug!(
        target: "lifecycle",
        cycle,
        citizen_id = citizen.id.0,
        from = from.as_str(),
        to = to.as_str(),
        cause = cause.as_str(),
    );

    Ok(Transition {
        citizen_id: citizen.id,
        cycle,
        change: StatusChange { from, to, cause },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never() -> HealthConfig {
        HealthConfig {
            p_recover: 0.0,
            p_critical: 0.0,
            p_discharge: 0.0,
            p_death: 0.0,
            p_stabilize: None,
            ..HealthConfig::default()
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        for probs in [[0.1, 0.2], [0.9, 0.9], [0.0, 0.0], [-1.0, f64::NAN]] {
            let total: f64 = normalized_weights(&probs).iter().sum();
            assert!((total - 1.0).abs() < 1e-12, "weights for {:?} sum to {}", probs, total);
        }
    }

    #[test]
    fn test_admit_sets_start_and_zero_duration() {
        let mut citizen = Citizen::new(1, "X", 40);
        let t = admit(&mut citizen, 10).unwrap();

        assert_eq!(t.change.from, HealthStatus::Active);
        assert_eq!(t.change.to, HealthStatus::Hospitalized);
        assert_eq!(citizen.status_start_cycle, Some(10));
        assert_eq!(citizen.status_duration, Some(0));
    }

    #[test]
    fn test_admit_rejects_non_active() {
        let mut citizen = Citizen::new(1, "X", 40).with_status(HealthStatus::Critical, 3);
        assert!(matches!(
            admit(&mut citizen, 5),
            Err(LifecycleError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn test_duration_increments_while_status_held() {
        let mut citizen = Citizen::new(1, "X", 40).with_status(HealthStatus::Hospitalized, 5);
        let mut rng = RngManager::new(1);
        for cycle in 6..=8 {
            let result = step(&mut citizen, cycle, &never(), &mut rng);
            assert!(result.transition.is_none());
            assert_eq!(citizen.status_duration, Some(cycle - 5));
        }
    }

    #[test]
    fn test_forced_critical_to_deceased() {
        let mut citizen = Citizen::new(1, "X", 70).with_status(HealthStatus::Critical, 0);
        let config = HealthConfig {
            max_critical_cycles: 5,
            ..never()
        };
        let mut rng = RngManager::new(3);

        assert!(step(&mut citizen, 5, &config, &mut rng).transition.is_none());
        let t = step(&mut citizen, 6, &config, &mut rng).transition.unwrap();
        assert_eq!(t.change.to, HealthStatus::Deceased);
        assert_eq!(t.change.cause, TransitionCause::ForcedResolution);
    }

    #[test]
    fn test_recovering_returns_after_cooldown() {
        let mut citizen = Citizen::new(1, "X", 30).with_status(HealthStatus::Recovering, 10);
        let mut rng = RngManager::new(3);
        let config = HealthConfig {
            recovery_cooldown_cycles: 3,
            ..never()
        };

        assert!(step(&mut citizen, 12, &config, &mut rng).transition.is_none());
        let t = step(&mut citizen, 13, &config, &mut rng).transition.unwrap();
        assert_eq!(t.change.to, HealthStatus::Active);
        assert_eq!(t.change.cause, TransitionCause::CooldownElapsed);
    }

    #[test]
    fn test_stabilization_disabled_never_recovers_from_critical() {
        let config = HealthConfig {
            p_death: 0.0,
            p_stabilize: None,
            max_critical_cycles: 1000,
            ..HealthConfig::default()
        };
        let mut rng = RngManager::new(11);
        let mut citizen = Citizen::new(1, "X", 50).with_status(HealthStatus::Critical, 0);
        for cycle in 1..200 {
            assert!(step(&mut citizen, cycle, &config, &mut rng).transition.is_none());
        }
    }

    #[test]
    fn test_corrupt_start_cycle_is_repaired() {
        let mut citizen = Citizen::new(1, "X", 30).with_status(HealthStatus::Hospitalized, 50);
        let mut rng = RngManager::new(3);
        let result = step(&mut citizen, 20, &never(), &mut rng);

        assert!(result.repaired);
        assert_eq!(citizen.status_start_cycle, Some(20));
        assert_eq!(citizen.status_duration, Some(0));
    }

    #[test]
    fn test_deceased_consumes_no_draws() {
        let mut citizen = Citizen::new(1, "X", 90).with_status(HealthStatus::Deceased, 2);
        let mut rng = RngManager::new(8);
        let before = rng.get_state();
        let result = step(&mut citizen, 30, &HealthConfig::default(), &mut rng);

        assert!(result.transition.is_none());
        assert_eq!(rng.get_state(), before);
        assert_eq!(citizen.health_status, HealthStatus::Deceased);
    }
}
