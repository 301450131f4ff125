//! PyO3 wrapper for the simulation engine
//!
//! # Example (from Python)
//!
//! ```python
//! import json
//! from queue_simulator_core_rs import Simulation
//!
//! config = {
//!     "rng_seed": 42,
//!     "horizon": 1000.0,
//!     "resources": [{"id": "grader", "servers": 2, "queue_capacity": 5}],
//!     "populations": [
//!         {"name": "ING", "resource": "grader", "arrival_rate": 3.0, "service_rate": 2.5}
//!     ],
//! }
//!
//! sim = Simulation(json.dumps(config))
//! report = json.loads(sim.run())
//! rejections = [e for e in sim.events() if e["event_kind"] == "rejected"]
//! ```

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::models::event::EventRecord;
use crate::orchestrator::{Engine, SimulationConfig, SimulationError};

#[pyclass(name = "Simulation")]
pub struct PySimulation {
    inner: Engine,
}

#[pymethods]
impl PySimulation {
    /// Build a simulation from a JSON configuration string
    ///
    /// Raises ValueError if the configuration is malformed or invalid.
    #[new]
    fn new(config_json: &str) -> PyResult<Self> {
        let config = SimulationConfig::from_json(config_json)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        let inner = Engine::new(config).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Run to the horizon and return the report as JSON
    fn run(&mut self) -> PyResult<String> {
        let report = self.inner.run().map_err(to_py_err)?;
        report
            .to_json()
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    /// Event log as a list of dicts, in dispatch order
    fn events<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyList>> {
        let list = PyList::empty_bound(py);
        for event in self.inner.event_log().events() {
            list.append(event_to_py(py, event)?)?;
        }
        Ok(list)
    }

    /// Event log as JSON lines
    fn event_log_jsonl(&self) -> PyResult<String> {
        self.inner
            .event_log()
            .to_json_lines()
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    #[getter]
    fn now(&self) -> f64 {
        self.inner.now()
    }

    #[getter]
    fn fingerprint(&self) -> String {
        self.inner.fingerprint().to_string()
    }
}

fn to_py_err(err: SimulationError) -> PyErr {
    match err {
        SimulationError::Config(e) => PyValueError::new_err(e.to_string()),
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

fn event_to_py<'py>(py: Python<'py>, event: &EventRecord) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("time", event.time)?;
    dict.set_item("event_kind", event.kind.name())?;
    dict.set_item("cause", event.kind.cause().map(|c| c.as_str()))?;
    dict.set_item("job_id", event.job_id)?;
    dict.set_item("population", event.population.as_deref())?;
    dict.set_item("resource_id", event.resource_id.as_str())?;
    dict.set_item("queue_length_at_time", event.queue_length_at_time)?;
    dict.set_item("service_time", event.service_time)?;
    dict.set_item("backup_time", event.backup_time)?;
    dict.set_item("waiting_time", event.waiting_time)?;
    dict.set_item("response_time", event.response_time)?;
    Ok(dict)
}
