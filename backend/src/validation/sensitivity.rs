//! Sensitivity filter: lighthearted milestones during a declared crisis.

use super::{Finding, Severity, Validator};
use crate::models::event::{MilestoneEvent, Tone};
use crate::models::world::{CrisisLevel, WorldSnapshot};

pub struct SensitivityFilter;

impl Validator for SensitivityFilter {
    fn name(&self) -> &'static str {
        "sensitivity"
    }

    fn check(&self, batch: &[MilestoneEvent], world: &WorldSnapshot) -> Vec<Finding> {
        let Some(crisis) = &world.crisis else {
            return Vec::new();
        };
        let severity = match crisis.level {
            CrisisLevel::Advisory => Severity::Warning,
            CrisisLevel::Emergency => Severity::Critical,
        };

        batch
            .iter()
            .filter(|e| e.tone() == Tone::Celebratory && e.cycle() >= crisis.started_cycle)
            .map(|e| {
                Finding::new(
                    self.name(),
                    severity,
                    format!("{} for {} during '{}'", e.category, e.citizen_id, crisis.label),
                )
                .with_event(e)
            })
            .collect()
    }
}
