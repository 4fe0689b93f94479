//! Pre-publication validation
//!
//! Runs after the ledger write and before a cycle's events are released to
//! narrative consumers. Four independent checks:
//! - Tone (celebration next to a critical or dying citizen)
//! - Continuity (the dead reappearing)
//! - Distribution (one category monopolizing output)
//! - Sensitivity (lighthearted events during a declared crisis)
//!
//! Validators are pure over (batch, world snapshot). Findings annotate the
//! report; they never fail the cycle and never touch the ledger. Events
//! referenced by a critical finding are held back from publication.

pub mod continuity;
pub mod distribution;
pub mod sensitivity;
pub mod tone;

pub use continuity::ContinuityChecker;
pub use distribution::{category_counts, DistributionAuditor, DistributionConfig};
pub use sensitivity::SensitivityFilter;
pub use tone::ToneChecker;

use crate::models::citizen::CitizenId;
use crate::models::event::{MilestoneCategory, MilestoneEvent};
use crate::models::world::WorldSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Finding severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// One finding from a validator or an engine stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Validator or engine stage that produced the finding
    pub source: String,
    pub severity: Severity,
    pub citizen_id: Option<CitizenId>,
    /// Offending events, batch order
    pub event_ids: Vec<Uuid>,
    pub message: String,
}

impl Finding {
    pub fn new(source: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            source: source.to_string(),
            severity,
            citizen_id: None,
            event_ids: Vec::new(),
            message: message.into(),
        }
    }

    pub fn for_citizen(mut self, citizen_id: CitizenId) -> Self {
        self.citizen_id = Some(citizen_id);
        self
    }

    pub fn with_event(mut self, event: &MilestoneEvent) -> Self {
        self.citizen_id.get_or_insert(event.citizen_id);
        self.event_ids.push(event.event_id);
        self
    }

    pub fn with_event_id(mut self, event_id: Uuid) -> Self {
        self.event_ids.push(event_id);
        self
    }
}

/// A pre-publication check
pub trait Validator: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, batch: &[MilestoneEvent], world: &WorldSnapshot) -> Vec<Finding>;
}

/// Aggregated findings for one cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub cycle: u64,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn new(cycle: u64) -> Self {
        Self {
            cycle,
            findings: Vec::new(),
        }
    }

    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.findings.extend(findings);
    }

    pub fn findings_from(&self, source: &str) -> Vec<&Finding> {
        self.findings.iter().filter(|f| f.source == source).collect()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    pub fn has_critical(&self) -> bool {
        self.count(Severity::Critical) > 0
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    /// Events referenced by critical findings
    pub fn held_event_ids(&self) -> BTreeSet<Uuid> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Critical)
            .flat_map(|f| f.event_ids.iter().copied())
            .collect()
    }
}

/// Events and report handed to narrative consumers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicationBatch {
    pub cycle: u64,
    pub accepted: Vec<MilestoneEvent>,
    /// Referenced by a critical finding; written to the ledger but not
    /// released for narrative use
    pub held: Vec<MilestoneEvent>,
    pub report: ValidationReport,
}

impl PublicationBatch {
    pub fn assemble(events: Vec<MilestoneEvent>, report: ValidationReport) -> Self {
        let held_ids = report.held_event_ids();
        let (held, accepted): (Vec<_>, Vec<_>) = events
            .into_iter()
            .partition(|e| held_ids.contains(&e.event_id));
        Self {
            cycle: report.cycle,
            accepted,
            held,
            report,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Validation settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub distribution: DistributionConfig,
}

impl ValidationConfig {
    pub fn validate(&self, errors: &mut Vec<String>) {
        self.distribution.validate(errors);
    }
}

/// The registered validators, run in registration order.
pub struct ValidationSuite {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidationSuite {
    pub fn empty() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// Tone, continuity, distribution and sensitivity checks
    pub fn standard(expected_shares: BTreeMap<MilestoneCategory, f64>, config: &ValidationConfig) -> Self {
        Self::empty()
            .with_validator(Box::new(ToneChecker))
            .with_validator(Box::new(ContinuityChecker))
            .with_validator(Box::new(DistributionAuditor::new(
                expected_shares,
                config.distribution.clone(),
            )))
            .with_validator(Box::new(SensitivityFilter))
    }

    pub fn with_validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    /// Run every validator and merge with findings raised while generating.
    pub fn run(
        &self,
        batch: &[MilestoneEvent],
        world: &WorldSnapshot,
        engine_findings: Vec<Finding>,
    ) -> ValidationReport {
        let mut report = ValidationReport::new(world.cycle);
        report.extend(engine_findings);
        for validator in &self.validators {
            let findings = validator.check(batch, world);
            if !findings.is_empty() {
                tracing::info!(
                    target: "validation",
                    cycle = world.cycle,
                    validator = validator.name(),
                    findings = findings.len(),
                );
            }
            report.extend(findings);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calendar::{CalendarContext, Season};
    use crate::models::event::EventLog;

    #[test]
    fn test_critical_findings_hold_their_events() {
        let ctx = CalendarContext::new(4, 1, Season::Winter);
        let mut log = EventLog::for_cycle(1, 4);
        let held = log.log(MilestoneEvent::milestone(CitizenId(1), MilestoneCategory::Birth, ctx.clone()));
        log.log(MilestoneEvent::milestone(CitizenId(2), MilestoneCategory::Birth, ctx));

        let mut report = ValidationReport::new(4);
        report.push(Finding::new("test", Severity::Critical, "bad").with_event_id(held));
        report.push(Finding::new("test", Severity::Warning, "meh").with_event(&log.events()[1]));

        let batch = PublicationBatch::assemble(log.into_events(), report);
        assert_eq!(batch.held.len(), 1);
        assert_eq!(batch.held[0].event_id, held);
        assert_eq!(batch.accepted.len(), 1);
    }

    #[test]
    fn test_standard_suite_order() {
        let suite = ValidationSuite::standard(BTreeMap::new(), &ValidationConfig::default());
        assert_eq!(suite.names(), vec!["tone", "continuity", "distribution", "sensitivity"]);
    }
}
