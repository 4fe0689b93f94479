//! Name-based mapping of event fields onto ledger columns.

use super::{LedgerError, LedgerRow, LedgerStore};
use crate::models::event::MilestoneEvent;
use std::collections::BTreeMap;

/// Event field recorded in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LedgerField {
    EventId,
    Cycle,
    CitizenId,
    Category,
    Outcome,
    Month,
    Season,
    Cause,
    CascadeDepth,
    Transition,
}

impl LedgerField {
    pub const ALL: [LedgerField; 10] = [
        LedgerField::EventId,
        LedgerField::Cycle,
        LedgerField::CitizenId,
        LedgerField::Category,
        LedgerField::Outcome,
        LedgerField::Month,
        LedgerField::Season,
        LedgerField::Cause,
        LedgerField::CascadeDepth,
        LedgerField::Transition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerField::EventId => "event_id",
            LedgerField::Cycle => "cycle",
            LedgerField::CitizenId => "citizen_id",
            LedgerField::Category => "category",
            LedgerField::Outcome => "outcome",
            LedgerField::Month => "month",
            LedgerField::Season => "season",
            LedgerField::Cause => "cause",
            LedgerField::CascadeDepth => "cascade_depth",
            LedgerField::Transition => "transition",
        }
    }

    /// Accepted column names, already normalized
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            LedgerField::EventId => &["eventid", "uuid", "id"],
            LedgerField::Cycle => &["cycle", "cyclenumber", "cycleid"],
            LedgerField::CitizenId => &["citizenid", "popid", "citizen"],
            LedgerField::Category => &["category", "eventtype", "milestone"],
            LedgerField::Outcome => &["outcome", "result"],
            LedgerField::Month => &["month", "simmonth"],
            LedgerField::Season => &["season", "simseason"],
            LedgerField::Cause => &["cause", "trigger"],
            LedgerField::CascadeDepth => &["cascadedepth", "depth"],
            LedgerField::Transition => &["transition", "statuschange", "healthtransition"],
        }
    }
}

/// Lowercase and keep only ASCII alphanumerics: `"Event ID"` → `"eventid"`.
pub fn normalize_column(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Field-to-column mapping resolved against one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerWriter {
    schema: Vec<String>,
    columns: BTreeMap<LedgerField, usize>,
}

impl LedgerWriter {
    /// Map every known field to the first column whose normalized name
    /// matches one of its aliases. Unknown columns are left alone; missing
    /// fields only fail once an event actually carries them.
    pub fn resolve(schema: &[String]) -> Self {
        let normalized: Vec<String> = schema.iter().map(|c| normalize_column(c)).collect();
        let mut columns = BTreeMap::new();
        for field in LedgerField::ALL {
            let aliases = field.aliases();
            if let Some(index) = normalized.iter().position(|n| aliases.contains(&n.as_str())) {
                columns.insert(field, index);
            }
        }
        Self {
            schema: schema.to_vec(),
            columns,
        }
    }

    pub fn column_for(&self, field: LedgerField) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn width(&self) -> usize {
        self.schema.len()
    }

    /// Build one row per event; fails before anything is written.
    pub fn rows_for(&self, events: &[MilestoneEvent]) -> Result<Vec<LedgerRow>, LedgerError> {
        events.iter().map(|e| self.row_for(e)).collect()
    }

    fn row_for(&self, event: &MilestoneEvent) -> Result<LedgerRow, LedgerError> {
        let mut cells = vec![String::new(); self.width()];
        for (field, value) in carried_fields(event) {
            let index = self
                .column_for(field)
                .ok_or_else(|| LedgerError::SchemaMismatch {
                    field: field.as_str().to_string(),
                })?;
            cells[index] = value;
        }
        Ok(LedgerRow(cells))
    }

    /// Append one row per event in a single call. Returns the row count.
    pub fn write<S: LedgerStore + ?Sized>(
        &self,
        store: &mut S,
        events: &[MilestoneEvent],
    ) -> Result<usize, LedgerError> {
        if store.schema() != self.schema {
            return Err(LedgerError::SchemaChanged);
        }
        let rows = self.rows_for(events)?;
        let count = rows.len();
        if count > 0 {
            store.append_rows(rows)?;
        }
        tracing::info!(target: "ledger", rows = count, "appended");
        Ok(count)
    }
}

/// Fields an event carries, with their ledger text.
fn carried_fields(event: &MilestoneEvent) -> Vec<(LedgerField, String)> {
    let mut fields = vec![
        (LedgerField::EventId, event.event_id.to_string()),
        (LedgerField::Cycle, event.cycle().to_string()),
        (LedgerField::CitizenId, event.citizen_id.to_string()),
        (LedgerField::Category, event.category.as_str().to_string()),
        (LedgerField::Outcome, event.outcome.clone()),
        (LedgerField::Month, event.calendar.month.to_string()),
    ];
    if let Some(season) = event.calendar.season {
        fields.push((LedgerField::Season, season.as_str().to_string()));
    }
    if let Some(cause) = &event.cause {
        fields.push((LedgerField::Cause, cause.clone()));
    }
    if event.cascade_depth > 1 {
        fields.push((LedgerField::CascadeDepth, event.cascade_depth.to_string()));
    }
    if let Some(change) = &event.status_change {
        fields.push((LedgerField::Transition, change.to_string()));
    }
    fields
}
