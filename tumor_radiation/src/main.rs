//! Runs one treatment course and writes the trajectory as CSV.
//!
//!   tumor_radiation                       # ./treatment.json if present, else the reference scenario
//!   tumor_radiation config.json           # override parameters from JSON
//!   tumor_radiation config.json out.csv   # write CSV to a file
//!
//! Set RUST_LOG=debug to follow each fraction.

use std::io;

use anyhow::{Context, Result};
use tumor_radiation::export::{write_csv, write_csv_file};
use tumor_radiation::{simulate, SimulationConfig};

const DEFAULT_CONFIG: &str = "treatment.json";

fn main() -> Result<()> {
	env_logger::init();

	let mut args = std::env::args().skip(1);
	let config = match args.next() {
		Some(path) => SimulationConfig::from_json_file(&path)
			.with_context(|| format!("loading configuration from {}", path))?,
		None => SimulationConfig::load_or_default(DEFAULT_CONFIG)?,
	};

	let trajectory = simulate(&config)?;
	let summary = trajectory.summary()?;
	log::info!(
		"{} steps, nadir of {:.4e} living cells at step {}",
		summary.steps,
		summary.nadir_live_cells,
		summary.nadir_step
	);
	match summary.surviving_fraction {
		Some(fraction) => log::info!("surviving fraction {:.4e}", fraction),
		None => log::info!("tumor started without living cells"),
	}
	if summary.fallback_steps > 0 {
		log::warn!("reoxygenation skipped at {} steps", summary.fallback_steps);
	}

	match args.next() {
		Some(out) => write_csv_file(&trajectory, &out)?,
		None => write_csv(&trajectory, io::stdout().lock())?,
	}
	Ok(())
}
