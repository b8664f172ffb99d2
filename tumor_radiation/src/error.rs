use thiserror::Error;

/// Everything that can go wrong around a treatment simulation.
///
/// Only `InvalidConfig` can come out of the engine itself, and always before
/// any population state exists. The rest belong to loading configs and
/// writing trajectories.
#[derive(Error, Debug)]
pub enum TreatmentError {
	#[error("invalid configuration: `{field}` {reason}")]
	InvalidConfig { field: &'static str, reason: String },

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("config parse error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("CSV error: {0}")]
	Csv(#[from] csv::Error),

	#[error("numerical error: {0}")]
	Numerical(String),
}

impl TreatmentError {
	pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
		TreatmentError::InvalidConfig { field, reason: reason.into() }
	}
}

pub type Result<T> = std::result::Result<T, TreatmentError>;
