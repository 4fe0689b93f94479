//! Citizen model
//!
//! Citizens are created by external population logic and loaded from the
//! registry at the start of every cycle. The engine owns only the health
//! fields; `name`, `age`, `tier` and `role` are read-only context.
//!
//! # Critical Invariants
//!
//! 1. `HealthStatus` is a closed set; unknown status strings are rejected
//! 2. `Deceased` is terminal (see [`HealthStatus::can_transition_to`])
//! 3. A corrupt cycle field never fails the cycle, it degrades to `None`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Stable citizen identifier, displayed as `POP-00042`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CitizenId(pub u64);

impl fmt::Display for CitizenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "POP-{:05}", self.0)
    }
}

/// Errors raised while reading citizen records
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StatusParseError {
    #[error("Unknown health status '{0}'")]
    UnknownStatus(String),
}

/// Health status of a citizen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Active,
    Hospitalized,
    Recovering,
    Critical,
    Deceased,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Active => "active",
            HealthStatus::Hospitalized => "hospitalized",
            HealthStatus::Recovering => "recovering",
            HealthStatus::Critical => "critical",
            HealthStatus::Deceased => "deceased",
        }
    }

    /// Transient statuses are evaluated by the lifecycle state machine
    /// every cycle and track a duration.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HealthStatus::Hospitalized | HealthStatus::Recovering | HealthStatus::Critical
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, HealthStatus::Deceased)
    }

    /// Transition table.
    ///
    /// `critical → recovering` is listed here; whether it can actually fire
    /// depends on the stabilization setting in the health config.
    pub fn can_transition_to(&self, to: HealthStatus) -> bool {
        use HealthStatus::*;
        matches!(
            (self, to),
            (Active, Hospitalized)
                | (Hospitalized, Recovering)
                | (Hospitalized, Critical)
                | (Recovering, Active)
                | (Critical, Deceased)
                | (Critical, Recovering)
        )
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(HealthStatus::Active),
            "hospitalized" => Ok(HealthStatus::Hospitalized),
            "recovering" => Ok(HealthStatus::Recovering),
            "critical" => Ok(HealthStatus::Critical),
            "deceased" => Ok(HealthStatus::Deceased),
            _ => Err(StatusParseError::UnknownStatus(s.to_string())),
        }
    }
}

/// Raw citizen row as stored by the registry.
///
/// Cycle fields are signed because stores may hold blanks, negatives or
/// garbage; they are cleaned up by `Citizen::try_from`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitizenRecord {
    pub id: CitizenId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub tier: u8,
    #[serde(default)]
    pub role: String,
    pub health_status: String,
    #[serde(default)]
    pub status_start_cycle: Option<i64>,
    #[serde(default)]
    pub status_duration: Option<i64>,
}

impl CitizenRecord {
    /// New active citizen record
    pub fn active(id: u64, name: impl Into<String>, age: u32) -> Self {
        Self {
            id: CitizenId(id),
            name: name.into(),
            age,
            tier: 0,
            role: String::new(),
            health_status: HealthStatus::Active.as_str().to_string(),
            status_start_cycle: None,
            status_duration: None,
        }
    }

    /// Set health fields, as the registry does on save.
    pub fn with_status(mut self, status: HealthStatus, start: Option<u64>, duration: Option<u64>) -> Self {
        self.health_status = status.as_str().to_string();
        self.status_start_cycle = start.and_then(to_stored);
        self.status_duration = duration.and_then(to_stored);
        self
    }
}

/// Citizen working-set entry for one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citizen {
    pub id: CitizenId,
    pub name: String,
    pub age: u32,
    pub tier: u8,
    pub role: String,
    pub health_status: HealthStatus,
    /// Cycle the current status began; `None` if unset or corrupt
    pub status_start_cycle: Option<u64>,
    /// Cycles elapsed in the current status; `None` if unset or corrupt
    pub status_duration: Option<u64>,
}

impl Citizen {
    /// New citizen in the initial `Active` status
    pub fn new(id: u64, name: impl Into<String>, age: u32) -> Self {
        Self {
            id: CitizenId(id),
            name: name.into(),
            age,
            tier: 0,
            role: String::new(),
            health_status: HealthStatus::Active,
            status_start_cycle: None,
            status_duration: None,
        }
    }

    /// Builder used by tests and seeding code
    pub fn with_status(mut self, status: HealthStatus, start_cycle: u64) -> Self {
        self.health_status = status;
        self.status_start_cycle = Some(start_cycle);
        self.status_duration = Some(0);
        self
    }

    pub fn is_deceased(&self) -> bool {
        self.health_status.is_terminal()
    }

    /// Cycle the citizen died in, if deceased and the start cycle is known.
    pub fn deceased_since(&self) -> Option<u64> {
        if self.is_deceased() {
            self.status_start_cycle
        } else {
            None
        }
    }

    /// Record back to registry form
    pub fn to_record(&self) -> CitizenRecord {
        CitizenRecord {
            id: self.id,
            name: self.name.clone(),
            age: self.age,
            tier: self.tier,
            role: self.role.clone(),
            health_status: self.health_status.as_str().to_string(),
            status_start_cycle: self.status_start_cycle.and_then(to_stored),
            status_duration: self.status_duration.and_then(to_stored),
        }
    }
}

impl TryFrom<CitizenRecord> for Citizen {
    type Error = StatusParseError;

    fn try_from(record: CitizenRecord) -> Result<Self, Self::Error> {
        let health_status = record.health_status.parse::<HealthStatus>()?;
        Ok(Citizen {
            id: record.id,
            name: record.name,
            age: record.age,
            tier: record.tier,
            role: record.role,
            health_status,
            status_start_cycle: non_negative(record.status_start_cycle),
            status_duration: non_negative(record.status_duration),
        })
    }
}

fn non_negative(value: Option<i64>) -> Option<u64> {
    value.and_then(|v| u64::try_from(v).ok())
}

/// Registry columns are signed; cycles past `i64::MAX` are stored as unset.
fn to_stored(value: u64) -> Option<i64> {
    i64::try_from(value).ok()
}
