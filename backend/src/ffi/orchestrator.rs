//! PyO3 wrapper for Orchestrator
//!
//! The Python side owns an orchestrator together with an in-memory citizen
//! registry and ledger. Everything crosses the boundary as JSON strings so
//! Python code can hand results straight to the narrative stage.

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::core::calendar::WeeklyCalendar;
use crate::ledger::InMemoryLedger;
use crate::models::citizen::CitizenRecord;
use crate::models::registry::InMemoryRegistry;
use crate::models::world::{CrisisLevel, CrisisState};
use crate::orchestrator::{EngineConfig, EngineError, EngineSnapshot, Orchestrator as RustOrchestrator};

fn value_error(context: &str, e: impl std::fmt::Display) -> PyErr {
    PyErr::new::<PyValueError, _>(format!("{}: {}", context, e))
}

fn engine_error(context: &str, e: EngineError) -> PyErr {
    match e {
        EngineError::InvalidConfig(_) | EngineError::StateValidation(_) => value_error(context, e),
        other => PyErr::new::<PyRuntimeError, _>(format!("{}: {}", context, other)),
    }
}

fn parse_citizens(citizens_json: &str) -> PyResult<Vec<CitizenRecord>> {
    serde_json::from_str(citizens_json).map_err(|e| value_error("Invalid citizens", e))
}

fn ledger_for(columns: Option<Vec<String>>) -> InMemoryLedger {
    match columns {
        Some(columns) => InMemoryLedger::new(columns),
        None => InMemoryLedger::standard(),
    }
}

/// Python wrapper for the Rust orchestrator
///
/// # Example (from Python)
///
/// ```python
/// import json
/// from generational_events_core import Orchestrator
///
/// orch = Orchestrator('{"base_seed": 42}', '[{"id": 1, "age": 34, "health_status": "active"}]')
/// outcome = json.loads(orch.run_cycle(1))
/// print(outcome["publication"]["accepted"])
/// ```
#[pyclass(name = "Orchestrator")]
pub struct PyOrchestrator {
    inner: RustOrchestrator,
    registry: InMemoryRegistry,
    ledger: InMemoryLedger,
    calendar: WeeklyCalendar,
    crisis: Option<CrisisState>,
}

#[pymethods]
impl PyOrchestrator {
    /// Create an orchestrator from JSON config and citizen records.
    ///
    /// `columns` is the ledger schema; the standard layout is used if absent.
    ///
    /// # Errors
    ///
    /// Raises ValueError if the config or citizens cannot be parsed or the
    /// config fails validation.
    #[new]
    #[pyo3(signature = (config_json, citizens_json, columns=None, cycles_per_year=52))]
    fn new(
        config_json: &str,
        citizens_json: &str,
        columns: Option<Vec<String>>,
        cycles_per_year: u64,
    ) -> PyResult<Self> {
        let config = EngineConfig::from_json_str(config_json)
            .map_err(|e| engine_error("Failed to create orchestrator", e))?;
        let inner = RustOrchestrator::new(config)
            .map_err(|e| engine_error("Failed to create orchestrator", e))?;
        if cycles_per_year == 0 {
            return Err(value_error("Invalid calendar", "cycles_per_year must be positive"));
        }

        Ok(PyOrchestrator {
            inner,
            registry: InMemoryRegistry::new(parse_citizens(citizens_json)?),
            ledger: ledger_for(columns),
            calendar: WeeklyCalendar::new(cycles_per_year),
            crisis: None,
        })
    }

    /// Run one cycle and return the `CycleOutcome` as JSON.
    fn run_cycle(&mut self, cycle: u64) -> PyResult<String> {
        let outcome = self
            .inner
            .run_cycle(
                cycle,
                &self.calendar,
                &mut self.registry,
                &mut self.ledger,
                self.crisis.clone(),
            )
            .map_err(|e| engine_error("Cycle execution failed", e))?;

        serde_json::to_string(&outcome).map_err(|e| PyErr::new::<PyRuntimeError, _>(e.to_string()))
    }

    /// Declare a crisis window (`level` is "advisory" or "emergency").
    fn declare_crisis(&mut self, label: String, level: &str, started_cycle: u64) -> PyResult<()> {
        let level = match level.trim().to_ascii_lowercase().as_str() {
            "advisory" => CrisisLevel::Advisory,
            "emergency" => CrisisLevel::Emergency,
            other => return Err(value_error("Unknown crisis level", other)),
        };
        self.crisis = Some(CrisisState {
            label,
            level,
            started_cycle,
        });
        Ok(())
    }

    fn clear_crisis(&mut self) {
        self.crisis = None;
    }

    /// Last committed cycle, or None
    fn last_cycle(&self) -> Option<u64> {
        self.inner.last_cycle()
    }

    /// Ledger column names
    fn ledger_columns(&self) -> Vec<String> {
        self.ledger.columns().to_vec()
    }

    /// All ledger rows written so far
    fn ledger_rows(&self) -> Vec<Vec<String>> {
        self.ledger.rows().iter().map(|r| r.cells().to_vec()).collect()
    }

    /// Current registry contents as JSON
    fn citizens_json(&self) -> PyResult<String> {
        let records: Vec<&CitizenRecord> = self.registry.records().collect();
        serde_json::to_string(&records).map_err(|e| PyErr::new::<PyRuntimeError, _>(e.to_string()))
    }

    // ========================================================================
    // Checkpoint
    // ========================================================================

    /// Snapshot the engine as JSON
    fn save_state(&self) -> PyResult<String> {
        self.inner
            .save_state()
            .and_then(|s| s.to_json())
            .map_err(|e| engine_error("Failed to save state", e))
    }

    /// Restore an orchestrator from `save_state` output.
    ///
    /// The registry is rebuilt from the snapshot's citizens; the ledger
    /// starts empty with the given columns.
    #[staticmethod]
    #[pyo3(signature = (config_json, snapshot_json, columns=None, cycles_per_year=52))]
    fn load_state(
        config_json: &str,
        snapshot_json: &str,
        columns: Option<Vec<String>>,
        cycles_per_year: u64,
    ) -> PyResult<Self> {
        if cycles_per_year == 0 {
            return Err(value_error("Invalid calendar", "cycles_per_year must be positive"));
        }
        let config = EngineConfig::from_json_str(config_json)
            .map_err(|e| engine_error("Failed to load state", e))?;
        let snapshot =
            EngineSnapshot::from_json(snapshot_json).map_err(|e| engine_error("Failed to load state", e))?;
        let registry = snapshot.registry();
        let inner = RustOrchestrator::load_state(config, snapshot)
            .map_err(|e| engine_error("Failed to load state", e))?;

        Ok(PyOrchestrator {
            inner,
            registry,
            ledger: ledger_for(columns),
            calendar: WeeklyCalendar::new(cycles_per_year),
            crisis: None,
        })
    }
}
