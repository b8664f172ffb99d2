use std::fs;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TreatmentError};
use crate::tumor::{effective_cycle_time, Real};

//Contains the radiobiological parameters that set the rules for a tumor model.
//Defaults reproduce the reference scenario (Fischer 1969 population split).
#[cfg_attr(feature = "python", pyo3::pyclass)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiationModel {
	/// Hit (extrapolation) number `n` of the oxygenated survival curve.
	#[cfg_attr(feature = "python", pyo3(get, set))]
	pub oxic_hit_number: Real,
	/// Characteristic dose `D0` of oxygenated cells, in rads.
	#[cfg_attr(feature = "python", pyo3(get, set))]
	pub oxic_d0: Real,
	/// Hit (extrapolation) number `n` of the hypoxic survival curve.
	#[cfg_attr(feature = "python", pyo3(get, set))]
	pub hypoxic_hit_number: Real,
	/// Characteristic dose `D0` of hypoxic cells, in rads.
	#[cfg_attr(feature = "python", pyo3(get, set))]
	pub hypoxic_d0: Real,
	/// Division rate `alpha` of living oxygenated cells per cell cycle.
	#[cfg_attr(feature = "python", pyo3(get, set))]
	pub division_rate: Real,
	/// Reoxygenation coefficient `beta`; the equilibrium ratio is `exp(-beta * N)`.
	#[cfg_attr(feature = "python", pyo3(get, set))]
	pub reoxygenation_rate: Real,
	/// Mitotic delay `gamma` per rad of delivered dose.
	#[cfg_attr(feature = "python", pyo3(get, set))]
	pub mitotic_delay: Real,
	#[cfg_attr(feature = "python", pyo3(get, set))]
	pub initial_cell_count: Real,
	/// Share of the initial cells that start oxygenated; the rest are hypoxic.
	#[cfg_attr(feature = "python", pyo3(get, set))]
	pub oxygenated_fraction: Real,
}

impl Default for RadiationModel {
	fn default() -> Self {
		RadiationModel {
			oxic_hit_number: 4.0,
			oxic_d0: 100.0,
			hypoxic_hit_number: 1.0,
			hypoxic_d0: 250.0,
			division_rate: 0.004,
			reoxygenation_rate: 1e-10,
			mitotic_delay: 0.005,
			initial_cell_count: 1e10,
			oxygenated_fraction: 0.36875,
		}
	}
}

impl RadiationModel {
	pub fn hypoxic_fraction(&self) -> Real {
		1.0 - self.oxygenated_fraction
	}

	pub fn validate(&self) -> Result<()> {
		positive("oxic_hit_number", self.oxic_hit_number)?;
		positive("oxic_d0", self.oxic_d0)?;
		positive("hypoxic_hit_number", self.hypoxic_hit_number)?;
		positive("hypoxic_d0", self.hypoxic_d0)?;
		finite("division_rate", self.division_rate)?;
		finite("reoxygenation_rate", self.reoxygenation_rate)?;
		finite("mitotic_delay", self.mitotic_delay)?;
		non_negative("initial_cell_count", self.initial_cell_count)?;
		non_negative("oxygenated_fraction", self.oxygenated_fraction)?;
		if self.oxygenated_fraction > 1.0 {
			return Err(TreatmentError::invalid(
				"oxygenated_fraction",
				format!("must not exceed 1, got {}", self.oxygenated_fraction),
			));
		}
		Ok(())
	}
}

/// How the tumor is treated: a constant dose delivered `fraction_count` times.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreatmentPlan {
	pub fraction_count: usize,
	/// Dose per fraction, in rads.
	pub dose: Real,
}

impl Default for TreatmentPlan {
	fn default() -> Self {
		TreatmentPlan { fraction_count: 50, dose: 200.0 }
	}
}

impl TreatmentPlan {
	pub fn validate(&self) -> Result<()> {
		if self.fraction_count == 0 {
			return Err(TreatmentError::invalid("fraction_count", "must be at least 1"));
		}
		non_negative("dose", self.dose)
	}
}

/// Everything a run needs. Any subset of fields may be given in JSON; the
/// rest fall back to the reference scenario.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
	pub plan: TreatmentPlan,
	pub model: RadiationModel,
}

impl SimulationConfig {
	pub fn validate(&self) -> Result<()> {
		self.plan.validate()?;
		self.model.validate()?;
		self.check_growth_bound()
	}

	//Radiation and reoxygenation conserve the total, and reproduction scales it by at most
	//exp(|alpha * t|) per fraction, so the whole course must fit below Real::MAX.
	fn check_growth_bound(&self) -> Result<()> {
		let per_fraction =
			(self.model.division_rate * effective_cycle_time(self.plan.dose, &self.model)).abs();
		let course = per_fraction * self.plan.fraction_count as Real;
		let headroom = Real::MAX.ln() - self.model.initial_cell_count.max(1.0).ln();
		if course < headroom {
			Ok(())
		} else {
			Err(TreatmentError::invalid(
				"division_rate",
				format!(
					"with this dose and mitotic delay the course grows counts by exp({:.1}), past the float range",
					course
				),
			))
		}
	}

	pub fn from_json_str(json: &str) -> Result<Self> {
		let config: SimulationConfig = serde_json::from_str(json)?;
		config.validate()?;
		Ok(config)
	}

	pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
		let text = fs::read_to_string(path)?;
		Self::from_json_str(&text)
	}

	/// Loads `path`, or the reference scenario when the file can't be read.
	/// A file that reads fine but fails to parse or validate is still an error.
	pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		match fs::read_to_string(path) {
			Ok(text) => Self::from_json_str(&text),
			Err(e) => {
				warn!("could not read {}: {}; using default configuration", path.display(), e);
				Ok(Self::default())
			}
		}
	}
}

fn finite(field: &'static str, value: Real) -> Result<()> {
	if value.is_finite() {
		Ok(())
	} else {
		Err(TreatmentError::invalid(field, format!("must be finite, got {}", value)))
	}
}

fn positive(field: &'static str, value: Real) -> Result<()> {
	finite(field, value)?;
	if value > 0.0 {
		Ok(())
	} else {
		Err(TreatmentError::invalid(field, format!("must be positive, got {}", value)))
	}
}

fn non_negative(field: &'static str, value: Real) -> Result<()> {
	finite(field, value)?;
	if value >= 0.0 {
		Ok(())
	} else {
		Err(TreatmentError::invalid(field, format!("must not be negative, got {}", value)))
	}
}
