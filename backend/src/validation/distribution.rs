//! Distribution auditor: one category monopolizing output.
//!
//! Compares observed category shares over this batch plus a rolling window
//! of prior cycles against expected shares (the generator's normalized base
//! probabilities). Only categories with an expected share are audited, so
//! lifecycle transitions never count toward the total.

use super::{Finding, Severity, Validator};
use crate::models::event::{MilestoneCategory, MilestoneEvent};
use crate::models::world::{CategoryCounts, WorldSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Allowed excess of observed share over expected share
    pub tolerance: f64,
    /// Below this many audited events the window is not judged
    pub min_events: u64,
    /// Prior cycles included in the window
    pub window_cycles: usize,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.25,
            min_events: 12,
            window_cycles: 4,
        }
    }
}

impl DistributionConfig {
    pub fn validate(&self, errors: &mut Vec<String>) {
        if !(self.tolerance > 0.0 && self.tolerance <= 1.0) {
            errors.push(format!(
                "validation.distribution.tolerance must be within (0, 1], got {}",
                self.tolerance
            ));
        }
    }
}

/// Count events per category
pub fn category_counts(batch: &[MilestoneEvent]) -> CategoryCounts {
    let mut counts = CategoryCounts::new();
    for event in batch {
        *counts.entry(event.category).or_insert(0) += 1;
    }
    counts
}

pub struct DistributionAuditor {
    expected: BTreeMap<MilestoneCategory, f64>,
    config: DistributionConfig,
}

impl DistributionAuditor {
    pub fn new(expected: BTreeMap<MilestoneCategory, f64>, config: DistributionConfig) -> Self {
        Self { expected, config }
    }
}

impl Validator for DistributionAuditor {
    fn name(&self) -> &'static str {
        "distribution"
    }

    fn check(&self, batch: &[MilestoneEvent], world: &WorldSnapshot) -> Vec<Finding> {
        let mut window = category_counts(batch);
        let skip = world
            .prior_category_counts
            .len()
            .saturating_sub(self.config.window_cycles);
        for prior in world.prior_category_counts.iter().skip(skip) {
            for (category, count) in prior {
                *window.entry(*category).or_insert(0) += count;
            }
        }

        let total: u64 = self
            .expected
            .keys()
            .map(|c| window.get(c).copied().unwrap_or(0))
            .sum();
        if total == 0 || total < self.config.min_events {
            return Vec::new();
        }

        let mut findings = Vec::new();
        for (category, expected_share) in &self.expected {
            let observed = window.get(category).copied().unwrap_or(0) as f64 / total as f64;
            if observed - expected_share > self.config.tolerance {
                let finding = Finding::new(
                    self.name(),
                    Severity::Warning,
                    format!(
                        "{} is {:.0}% of recent milestones, expected about {:.0}%",
                        category,
                        observed * 100.0,
                        expected_share * 100.0
                    ),
                );
                findings.push(
                    batch
                        .iter()
                        .filter(|e| e.category == *category)
                        .fold(finding, |f, e| f.with_event_id(e.event_id)),
                );
            }
        }
        findings
    }
}
