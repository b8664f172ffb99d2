//! Fractionated radiotherapy of a tumor made of oxygenated and hypoxic cells.
//!
//! Each fraction kills cells with the multi-target single-hit model, lets the
//! surviving oxygenated cells divide after a dose-dependent mitotic delay, and
//! then moves cells between the oxygenated and hypoxic pools towards a
//! size-dependent equilibrium ratio.

pub mod error;
pub mod export;
pub mod model;
pub mod tumor;

#[cfg(feature = "python")]
mod python;

pub use error::{Result, TreatmentError};
pub use model::{RadiationModel, SimulationConfig, TreatmentPlan};
pub use tumor::{run, simulate, Populations, Real, Rebalance, Trajectory, Tumor};
