//! Scenario files: engine config, starting population and ledger layout.

use std::path::Path;

use anyhow::{bail, Context, Result};
use generational_events_core::ledger::{InMemoryLedger, DEFAULT_COLUMNS};
use generational_events_core::{
    CalendarProvider, CitizenRecord, CrisisState, EngineConfig, FixedCalendar, RawCalendar, WeeklyCalendar,
};
use serde::Deserialize;

/// Calendar selection in a scenario file
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalendarSpec {
    Weekly { cycles_per_year: u64 },
    Fixed { month: u8, season: String },
}

impl Default for CalendarSpec {
    fn default() -> Self {
        CalendarSpec::Weekly { cycles_per_year: 52 }
    }
}

/// Calendar built from a [`CalendarSpec`]
pub enum ScenarioCalendar {
    Weekly(WeeklyCalendar),
    Fixed(FixedCalendar),
}

impl CalendarProvider for ScenarioCalendar {
    fn calendar_context(&self, cycle: u64) -> RawCalendar {
        match self {
            ScenarioCalendar::Weekly(c) => c.calendar_context(cycle),
            ScenarioCalendar::Fixed(c) => c.calendar_context(cycle),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: EngineConfig,
    #[serde(default)]
    pub citizens: Vec<CitizenRecord>,
    #[serde(default)]
    pub ledger_columns: Option<Vec<String>>,
    #[serde(default)]
    pub calendar: CalendarSpec,
    #[serde(default)]
    pub crisis: Option<CrisisState>,
}

impl Scenario {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        let scenario: Scenario = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse scenario {}", path.display()))?;
        scenario.config.validate().context("invalid engine config")?;
        Ok(scenario)
    }

    pub fn calendar(&self) -> Result<ScenarioCalendar> {
        match &self.calendar {
            CalendarSpec::Weekly { cycles_per_year } => {
                if *cycles_per_year == 0 {
                    bail!("calendar.cycles_per_year must be positive");
                }
                Ok(ScenarioCalendar::Weekly(WeeklyCalendar::new(*cycles_per_year)))
            }
            CalendarSpec::Fixed { month, season } => Ok(ScenarioCalendar::Fixed(FixedCalendar::new(*month, season.clone()))),
        }
    }

    pub fn ledger(&self) -> InMemoryLedger {
        match &self.ledger_columns {
            Some(columns) => InMemoryLedger::new(columns.clone()),
            None => InMemoryLedger::with_columns(&DEFAULT_COLUMNS),
        }
    }
}
