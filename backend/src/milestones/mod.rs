//! Milestone generator
//!
//! Decides, per citizen per cycle, which life milestones fire and resolves
//! their cascades within the same cycle.
//!
//! # Draw order
//!
//! For one citizen, categories are evaluated in [`MilestoneCategory::GENERATED`]
//! order. Each eligible category consumes exactly one draw; ineligible
//! categories (age window, health incident for a non-active citizen) consume
//! none. A fired milestone's cascade tree is resolved breadth-first before
//! the next category is evaluated, and each matching cascade rule consumes
//! one draw. Deceased citizens are skipped entirely.
//!
//! # Cascades
//!
//! A directly fired milestone has depth 1; each follow-on adds one. A
//! follow-on that would exceed `max_cascade_depth` is dropped and reported
//! as a non-fatal finding. A health incident admits the citizen to hospital
//! (`active → hospitalized`) one level below the incident; the admission
//! consumes no draw but obeys the same depth limit, so an incident at the
//! limit is written without its admission.

use crate::core::calendar::{CalendarContext, Season};
use crate::lifecycle;
use crate::lifecycle::Transition;
use crate::models::citizen::{Citizen, HealthStatus};
use crate::models::event::{EventLog, MilestoneCategory, MilestoneEvent};
use crate::rng::RngManager;
use crate::validation::{Finding, Severity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use uuid::Uuid;

/// Finding source for generator findings
pub const SOURCE: &str = "milestones";

/// Follow-on evaluation enqueued when `trigger` fires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeRule {
    pub trigger: MilestoneCategory,
    pub follow_on: MilestoneCategory,
    pub probability: f64,
}

impl CascadeRule {
    pub fn new(trigger: MilestoneCategory, follow_on: MilestoneCategory, probability: f64) -> Self {
        Self {
            trigger,
            follow_on,
            probability,
        }
    }
}

/// Generator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MilestoneConfig {
    /// Per-cycle chance of each category for one eligible citizen
    pub base_probabilities: BTreeMap<MilestoneCategory, f64>,
    /// Multiplier applied to every base probability, by season
    pub seasonal_modifiers: BTreeMap<Season, f64>,
    pub cascade_rules: Vec<CascadeRule>,
    pub max_cascade_depth: u8,
    /// Citizens this old or older get `elder_incident_factor` applied to
    /// the health incident probability
    pub elder_age: u32,
    pub elder_incident_factor: f64,
}

impl Default for MilestoneConfig {
    fn default() -> Self {
        use MilestoneCategory::*;

        let base_probabilities = [
            (Birth, 0.004),
            (Wedding, 0.003),
            (Graduation, 0.01),
            (Promotion, 0.01),
            (JobLoss, 0.006),
            (CivicHonor, 0.002),
            (CivicParticipation, 0.02),
            (Relocation, 0.008),
            (HealthIncident, 0.01),
        ]
        .into_iter()
        .collect();

        let seasonal_modifiers = [
            (Season::Spring, 1.05),
            (Season::Summer, 1.15),
            (Season::Fall, 1.0),
            (Season::Winter, 0.85),
        ]
        .into_iter()
        .collect();

        Self {
            base_probabilities,
            seasonal_modifiers,
            cascade_rules: vec![
                CascadeRule::new(Wedding, Birth, 0.15),
                CascadeRule::new(JobLoss, Relocation, 0.2),
                CascadeRule::new(JobLoss, HealthIncident, 0.1),
                CascadeRule::new(Promotion, Relocation, 0.1),
                CascadeRule::new(Graduation, CivicParticipation, 0.1),
            ],
            max_cascade_depth: 3,
            elder_age: 65,
            elder_incident_factor: 2.0,
        }
    }
}

impl MilestoneConfig {
    /// Append configuration problems to `errors`
    pub fn validate(&self, errors: &mut Vec<String>) {
        for (category, p) in &self.base_probabilities {
            if category.is_lifecycle() {
                errors.push(format!(
                    "milestones.base_probabilities: {} is a lifecycle category and cannot be rolled",
                    category
                ));
            }
            if !(0.0..=1.0).contains(p) {
                errors.push(format!(
                    "milestones.base_probabilities.{} must be within [0, 1], got {}",
                    category, p
                ));
            }
        }
        for (season, modifier) in &self.seasonal_modifiers {
            if !modifier.is_finite() || *modifier < 0.0 {
                errors.push(format!(
                    "milestones.seasonal_modifiers.{} must be a non-negative number, got {}",
                    season, modifier
                ));
            }
        }
        for (index, rule) in self.cascade_rules.iter().enumerate() {
            if !(0.0..=1.0).contains(&rule.probability) {
                errors.push(format!(
                    "milestones.cascade_rules[{}].probability must be within [0, 1], got {}",
                    index, rule.probability
                ));
            }
            if rule.follow_on.is_lifecycle() {
                errors.push(format!(
                    "milestones.cascade_rules[{}]: follow-on {} is a lifecycle category",
                    index, rule.follow_on
                ));
            }
        }
        if self.max_cascade_depth == 0 {
            errors.push("milestones.max_cascade_depth must be at least 1".to_string());
        }
        if !self.elder_incident_factor.is_finite() || self.elder_incident_factor < 0.0 {
            errors.push(format!(
                "milestones.elder_incident_factor must be a non-negative number, got {}",
                self.elder_incident_factor
            ));
        }
    }

    /// Normalized base probabilities, the "expected balance" for audits.
    pub fn expected_shares(&self) -> BTreeMap<MilestoneCategory, f64> {
        let positive: Vec<(MilestoneCategory, f64)> = self
            .base_probabilities
            .iter()
            .filter(|(c, p)| !c.is_lifecycle() && **p > 0.0)
            .map(|(c, p)| (*c, *p))
            .collect();
        let total: f64 = positive.iter().map(|(_, p)| p).sum();
        if total <= 0.0 {
            return BTreeMap::new();
        }
        positive.into_iter().map(|(c, p)| (c, p / total)).collect()
    }
}

/// Rolls milestones for one citizen at a time.
pub struct MilestoneGenerator<'a> {
    config: &'a MilestoneConfig,
}

impl<'a> MilestoneGenerator<'a> {
    pub fn new(config: &'a MilestoneConfig) -> Self {
        Self { config }
    }

    /// Seasonal multiplier; unknown or missing seasons are neutral.
    pub fn modifier_for(&self, season: Option<Season>) -> f64 {
        season
            .and_then(|s| self.config.seasonal_modifiers.get(&s))
            .copied()
            .unwrap_or(1.0)
    }

    /// Effective probability of `category` for a citizen of `age`.
    pub fn probability(&self, category: MilestoneCategory, age: u32, modifier: f64) -> f64 {
        let base = self
            .config
            .base_probabilities
            .get(&category)
            .copied()
            .unwrap_or(0.0);
        let mut p = base * modifier;
        if category == MilestoneCategory::HealthIncident && age >= self.config.elder_age {
            p *= self.config.elder_incident_factor;
        }
        p.clamp(0.0, 1.0)
    }

    /// Roll every generated category for `citizen` and resolve cascades.
    ///
    /// `health_eligible` is false when the citizen already transitioned
    /// earlier in this cycle. Events are appended to `log`; admissions caused
    /// by health incidents are applied to `citizen` and returned.
    pub fn generate_for(
        &self,
        citizen: &mut Citizen,
        calendar: &CalendarContext,
        health_eligible: bool,
        rng: &mut RngManager,
        log: &mut EventLog,
        findings: &mut Vec<Finding>,
    ) -> Vec<Transition> {
        let mut admissions = Vec::new();
        if citizen.is_deceased() {
            return admissions;
        }

        let modifier = self.modifier_for(calendar.season);
        for category in MilestoneCategory::GENERATED {
            if !self.can_fire(category, citizen, health_eligible) {
                continue;
            }
            let p = self.probability(category, citizen.age, modifier);
            if rng.chance(p) {
                self.resolve(category, citizen, calendar, health_eligible, rng, log, findings, &mut admissions);
            }
        }
        admissions
    }

    fn can_fire(&self, category: MilestoneCategory, citizen: &Citizen, health_eligible: bool) -> bool {
        if !category.eligible_at(citizen.age) {
            return false;
        }
        category != MilestoneCategory::HealthIncident
            || (health_eligible && citizen.health_status == HealthStatus::Active)
    }

    /// Log `root` and its cascade tree, breadth-first.
    #[allow(clippy::too_many_arguments)]
    fn resolve(
        &self,
        root: MilestoneCategory,
        citizen: &mut Citizen,
        calendar: &CalendarContext,
        health_eligible: bool,
        rng: &mut RngManager,
        log: &mut EventLog,
        findings: &mut Vec<Finding>,
        admissions: &mut Vec<Transition>,
    ) {
        let mut queue: VecDeque<(MilestoneCategory, u8, Option<MilestoneCategory>)> =
            VecDeque::from([(root, 1, None)]);

        while let Some((category, depth, trigger)) = queue.pop_front() {
            let mut event = MilestoneEvent::milestone(citizen.id, category, calendar.clone()).at_depth(depth);
            if let Some(trigger) = trigger {
                event = event.with_cause(format!("cascade:{}", trigger));
            }
            let event_id = log.log(event);

            if category == MilestoneCategory::HealthIncident {
                if depth >= self.config.max_cascade_depth {
                    findings.push(self.depth_exceeded(
                        citizen,
                        category,
                        MilestoneCategory::Hospitalization,
                        depth,
                        event_id,
                    ));
                } else {
                    self.admit(citizen, calendar, depth + 1, log, admissions);
                }
            }

            for rule in self.config.cascade_rules.iter().filter(|r| r.trigger == category) {
                if !rng.chance(rule.probability) {
                    continue;
                }
                if !self.can_fire(rule.follow_on, citizen, health_eligible) {
                    continue;
                }
                if depth >= self.config.max_cascade_depth {
                    findings.push(self.depth_exceeded(citizen, rule.trigger, rule.follow_on, depth, event_id));
                    continue;
                }
                queue.push_back((rule.follow_on, depth + 1, Some(category)));
            }
        }
    }

    fn admit(
        &self,
        citizen: &mut Citizen,
        calendar: &CalendarContext,
        depth: u8,
        log: &mut EventLog,
        admissions: &mut Vec<Transition>,
    ) {
        match lifecycle::admit(citizen, calendar.cycle) {
            Ok(transition) => {
                log.log(
                    MilestoneEvent::transition(citizen.id, transition.change, calendar.clone())
                        .with_cause(format!("cascade:{}", MilestoneCategory::HealthIncident))
                        .at_depth(depth),
                );
                admissions.push(transition);
            }
            Err(e) => {
                // can_fire only lets incidents through for active citizens
                tracing::warn!(target: "milestones", cycle = calendar.cycle, error = %e, "admission skipped");
            }
        }
    }

    fn depth_exceeded(
        &self,
        citizen: &Citizen,
        trigger: MilestoneCategory,
        follow_on: MilestoneCategory,
        depth: u8,
        parent: Uuid,
    ) -> Finding {
        let attempted = u16::from(depth) + 1;
        tracing::warn!(
            target: "milestones",
            citizen_id = citizen.id.0,
            trigger = trigger.as_str(),
            follow_on = follow_on.as_str(),
            depth = attempted,
            limit = self.config.max_cascade_depth,
            "cascade depth exceeded"
        );
        Finding::new(
            SOURCE,
            Severity::Warning,
            format!(
                "cascade-depth: {} -> {} for {} would reach depth {} (limit {}); dropped",
                trigger,
                follow_on,
                citizen.id,
                attempted,
                self.config.max_cascade_depth
            ),
        )
        .for_citizen(citizen.id)
        .with_event_id(parent)
    }
}
