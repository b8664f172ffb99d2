use numpy::PyArray1;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::model::RadiationModel;
use crate::tumor::Real;

type Sequences = (PyObject, PyObject, PyObject, PyObject);

#[pymethods]
impl RadiationModel {
	//Starts from the reference scenario; fields are settable from Python
	#[new]
	fn new() -> Self {
		RadiationModel::default()
	}
}

/// Runs a treatment course and returns the live oxygenated, dead oxygenated,
/// live hypoxic and dead hypoxic counts, one entry per recorded step.
#[pyfunction]
fn run(py: Python, model: RadiationModel, fraction_count: usize, dose: Real) -> PyResult<Sequences> {
	let trajectory = crate::tumor::run(fraction_count, dose, &model)
		.map_err(|e| PyValueError::new_err(e.to_string()))?;
	Ok((
		PyArray1::from_slice(py, trajectory.live_oxygenated()).into_py(py),
		PyArray1::from_slice(py, trajectory.dead_oxygenated()).into_py(py),
		PyArray1::from_slice(py, trajectory.live_hypoxic()).into_py(py),
		PyArray1::from_slice(py, trajectory.dead_hypoxic()).into_py(py),
	))
}

#[pymodule]
fn tumor_radiation(_py: Python, m: &PyModule) -> PyResult<()> {
	m.add_class::<RadiationModel>()?;
	m.add_function(wrap_pyfunction!(run, m)?)?;
	Ok(())
}
