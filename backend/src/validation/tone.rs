//! Tone checker: celebration next to a critical or dying citizen.

use super::{Finding, Severity, Validator};
use crate::models::citizen::{CitizenId, HealthStatus};
use crate::models::event::{MilestoneEvent, Tone};
use crate::models::world::WorldSnapshot;
use std::collections::BTreeSet;

pub struct ToneChecker;

impl Validator for ToneChecker {
    fn name(&self) -> &'static str {
        "tone"
    }

    fn check(&self, batch: &[MilestoneEvent], world: &WorldSnapshot) -> Vec<Finding> {
        let died_this_cycle: BTreeSet<CitizenId> = batch
            .iter()
            .filter(|e| matches!(e.status_change, Some(c) if c.to == HealthStatus::Deceased))
            .map(|e| e.citizen_id)
            .collect();

        let mut findings = Vec::new();
        for event in batch.iter().filter(|e| e.tone() == Tone::Celebratory) {
            let finding = if died_this_cycle.contains(&event.citizen_id) {
                Some((Severity::Warning, "in the same cycle as their death"))
            } else {
                match world.status_of(event.citizen_id) {
                    Some(HealthStatus::Critical) => Some((Severity::Warning, "while in critical condition")),
                    Some(HealthStatus::Hospitalized) => Some((Severity::Info, "while hospitalized")),
                    _ => None,
                }
            };

            if let Some((severity, context)) = finding {
                findings.push(
                    Finding::new(
                        self.name(),
                        severity,
                        format!("{} celebrates {} {}", event.citizen_id, event.category, context),
                    )
                    .with_event(event),
                );
            }
        }
        findings
    }
}
