//! Continuity checker: impossible situations in a batch.
//!
//! - A citizen who was already deceased before an event's cycle appears in
//!   that event (critical, one finding per citizen)
//! - A citizen appears again after their own death event in the same batch
//!   (critical, one finding per citizen)
//! - An event references a citizen the world snapshot does not know
//!   (warning, one finding per citizen)

use super::{Finding, Severity, Validator};
use crate::models::citizen::{CitizenId, HealthStatus};
use crate::models::event::MilestoneEvent;
use crate::models::world::WorldSnapshot;
use std::collections::BTreeMap;

pub struct ContinuityChecker;

/// Group offending events per citizen, keeping first-appearance order.
#[derive(Default)]
struct Offenders<'a> {
    order: Vec<CitizenId>,
    events: BTreeMap<CitizenId, Vec<&'a MilestoneEvent>>,
}

impl<'a> Offenders<'a> {
    fn add(&mut self, event: &'a MilestoneEvent) {
        let entry = self.events.entry(event.citizen_id).or_default();
        if entry.is_empty() {
            self.order.push(event.citizen_id);
        }
        entry.push(event);
    }

    fn into_findings(
        mut self,
        source: &str,
        severity: Severity,
        describe: impl Fn(CitizenId, usize) -> String,
    ) -> Vec<Finding> {
        self.order
            .into_iter()
            .map(|id| {
                let events = self.events.remove(&id).unwrap_or_default();
                events.iter().fold(
                    Finding::new(source, severity, describe(id, events.len())).for_citizen(id),
                    |finding, event| finding.with_event(event),
                )
            })
            .collect()
    }
}

impl Validator for ContinuityChecker {
    fn name(&self) -> &'static str {
        "continuity"
    }

    fn check(&self, batch: &[MilestoneEvent], world: &WorldSnapshot) -> Vec<Finding> {
        let mut resurrected = Offenders::default();
        let mut after_death = Offenders::default();
        let mut unknown = Offenders::default();
        let mut died_in_batch: BTreeMap<CitizenId, usize> = BTreeMap::new();

        for (index, event) in batch.iter().enumerate() {
            let id = event.citizen_id;

            if let Some(since) = world.deceased_before.get(&id) {
                // Unknown death cycle: dead before this cycle began.
                let dead_already = since.map_or(true, |cycle| cycle < event.cycle());
                if dead_already {
                    resurrected.add(event);
                    continue;
                }
            } else if !world.is_known(id) {
                unknown.add(event);
            }

            if let Some(death_index) = died_in_batch.get(&id) {
                if index > *death_index {
                    after_death.add(event);
                }
            }
            if matches!(event.status_change, Some(c) if c.to == HealthStatus::Deceased) {
                died_in_batch.entry(id).or_insert(index);
            }
        }

        let source = self.name();
        let mut findings = resurrected.into_findings(source, Severity::Critical, |id, n| {
            format!("{} is deceased but appears in {} new event(s)", id, n)
        });
        findings.extend(after_death.into_findings(source, Severity::Critical, |id, n| {
            format!("{} appears in {} event(s) after dying this cycle", id, n)
        }));
        findings.extend(unknown.into_findings(source, Severity::Warning, |id, n| {
            format!("{} is not in the registry snapshot ({} event(s))", id, n)
        }));
        findings
    }
}
