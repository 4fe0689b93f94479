//! Calendar context for simulation cycles
//!
//! The engine advances in discrete cycles. The calendar provider maps a
//! cycle number to a simulated month and season. Season strings arrive from
//! several upstream producers with inconsistent casing, so every season goes
//! through [`normalize_season`] before it is used for a modifier lookup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Calendar errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalendarError {
    #[error("Season '{0}' cannot be normalized to a known season")]
    InvalidSeason(String),
}

/// Canonical season. Serialized in lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Fall, Season::Winter];

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
            Season::Winter => "winter",
        }
    }

    /// Northern-hemisphere meteorological season for a month (1-12).
    pub fn from_month(month: u8) -> Season {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Fall,
            _ => Season::Winter,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize_season(s)
    }
}

/// Normalize a season string from any producer to its canonical form.
///
/// Case and surrounding whitespace are ignored; `autumn` is accepted as an
/// alias for `fall`. Normalizing an already-canonical value returns the same
/// season.
///
/// # Example
/// ```
/// use generational_events_core::core::calendar::{normalize_season, Season};
///
/// assert_eq!(normalize_season("Winter").unwrap(), Season::Winter);
/// assert_eq!(normalize_season(" AUTUMN ").unwrap(), Season::Fall);
/// assert!(normalize_season("monsoon").is_err());
/// ```
pub fn normalize_season(raw: &str) -> Result<Season, CalendarError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "spring" => Ok(Season::Spring),
        "summer" => Ok(Season::Summer),
        "fall" | "autumn" => Ok(Season::Fall),
        "winter" => Ok(Season::Winter),
        _ => Err(CalendarError::InvalidSeason(raw.to_string())),
    }
}

/// Calendar values as supplied by the provider, season not yet normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCalendar {
    pub cycle: u64,
    pub month: u8,
    pub season: String,
}

/// Calendar context attached to every milestone event.
///
/// `season` is `None` when the provider supplied a value that could not be
/// normalized; the generator then uses the neutral modifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarContext {
    pub cycle: u64,
    pub month: u8,
    pub season: Option<Season>,
}

impl CalendarContext {
    pub fn new(cycle: u64, month: u8, season: Season) -> Self {
        Self {
            cycle,
            month,
            season: Some(season),
        }
    }

    /// Normalize a provider value. An invalid season is returned alongside
    /// the context rather than failing the cycle.
    pub fn normalize(raw: RawCalendar) -> (Self, Option<CalendarError>) {
        match normalize_season(&raw.season) {
            Ok(season) => (Self::new(raw.cycle, raw.month, season), None),
            Err(err) => (
                Self {
                    cycle: raw.cycle,
                    month: raw.month,
                    season: None,
                },
                Some(err),
            ),
        }
    }
}

/// Source of calendar context for a cycle.
pub trait CalendarProvider {
    fn calendar_context(&self, cycle: u64) -> RawCalendar;
}

/// Calendar where a fixed number of cycles make up one simulated year.
///
/// The default of 52 treats every cycle as one week.
///
/// # Example
/// ```
/// use generational_events_core::core::calendar::{CalendarProvider, WeeklyCalendar};
///
/// let calendar = WeeklyCalendar::default();
/// let ctx = calendar.calendar_context(0);
/// assert_eq!(ctx.month, 1);
/// assert_eq!(ctx.season, "Winter");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyCalendar {
    cycles_per_year: u64,
}

impl WeeklyCalendar {
    /// # Panics
    /// Panics if `cycles_per_year` is zero.
    pub fn new(cycles_per_year: u64) -> Self {
        assert!(cycles_per_year > 0, "cycles_per_year must be positive");
        Self { cycles_per_year }
    }

    pub fn cycles_per_year(&self) -> u64 {
        self.cycles_per_year
    }

    /// Simulated year (0-indexed) for a cycle
    pub fn year_of(&self, cycle: u64) -> u64 {
        cycle / self.cycles_per_year
    }

    /// Month (1-12) for a cycle
    pub fn month_of(&self, cycle: u64) -> u8 {
        let position = cycle % self.cycles_per_year;
        (position * 12 / self.cycles_per_year) as u8 + 1
    }
}

impl Default for WeeklyCalendar {
    fn default() -> Self {
        Self::new(52)
    }
}

impl CalendarProvider for WeeklyCalendar {
    fn calendar_context(&self, cycle: u64) -> RawCalendar {
        let month = self.month_of(cycle);
        // Title case, the way upstream producers write it.
        let season = match Season::from_month(month) {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
            Season::Winter => "Winter",
        };
        RawCalendar {
            cycle,
            month,
            season: season.to_string(),
        }
    }
}

/// Calendar that returns the same month and season for every cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedCalendar {
    pub month: u8,
    pub season: String,
}

impl FixedCalendar {
    pub fn new(month: u8, season: impl Into<String>) -> Self {
        Self {
            month,
            season: season.into(),
        }
    }
}

impl CalendarProvider for FixedCalendar {
    fn calendar_context(&self, cycle: u64) -> RawCalendar {
        RawCalendar {
            cycle,
            month: self.month,
            season: self.season.clone(),
        }
    }
}
