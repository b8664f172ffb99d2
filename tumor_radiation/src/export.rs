//! Output side of a run: a short summary and CSV time series.
//!
//! Nothing here feeds back into the engine; it only reads a finished [`Trajectory`].

use std::fs::File;
use std::io::Write;
use std::path::Path;

use ndarray::Axis;
use ndarray_stats::QuantileExt;
use serde::Serialize;

use crate::error::{Result, TreatmentError};
use crate::tumor::{guarded_div, Populations, Real, Trajectory};

/// One CSV row per recorded step.
#[derive(Debug, Clone, Serialize)]
pub struct TrajectoryRecord {
    pub step: usize,
    /// Treatment fraction the step belongs to; 0 for the seeded state.
    pub fraction: usize,
    /// `initial` for step 0, `radiation` right after a dose, and
    /// `reproduction+reoxygenation` for the reproduction step as corrected in place
    /// by that fraction's reoxygenation.
    pub phase: &'static str,
    pub live_oxygenated: Real,
    pub dead_oxygenated: Real,
    pub live_hypoxic: Real,
    pub dead_hypoxic: Real,
    pub total: Real,
}

impl TrajectoryRecord {
    fn new(step: usize, p: &Populations) -> Self {
        let phase = match step {
            0 => "initial",
            s if s % 2 == 1 => "radiation",
            _ => "reproduction+reoxygenation",
        };
        Self {
            step,
            fraction: (step + 1) / 2,
            phase,
            live_oxygenated: p.live_oxygenated,
            dead_oxygenated: p.dead_oxygenated,
            live_hypoxic: p.live_hypoxic,
            dead_hypoxic: p.dead_hypoxic,
            total: p.total(),
        }
    }
}

pub fn records(trajectory: &Trajectory) -> Vec<TrajectoryRecord> {
    (0..trajectory.len())
        .filter_map(|step| trajectory.at(step).map(|p| TrajectoryRecord::new(step, &p)))
        .collect()
}

pub fn write_csv<W: Write>(trajectory: &Trajectory, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records(trajectory) {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_csv_file<P: AsRef<Path>>(trajectory: &Trajectory, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    write_csv(trajectory, File::create(path)?)?;
    log::info!("Trajectory written to {}", path.display());
    Ok(())
}

/// Headline numbers of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub steps: usize,
    pub final_populations: Populations,
    /// Step with the fewest living cells.
    pub nadir_step: usize,
    pub nadir_live_cells: Real,
    pub peak_total: Real,
    /// Living cells at the end relative to living cells at the start; `None` when
    /// the tumor started with no living cells.
    pub surviving_fraction: Option<Real>,
    pub fallback_steps: usize,
}

impl Trajectory {
    pub fn summary(&self) -> Result<Summary> {
        let array = self.to_array();
        let living = &array.column(0) + &array.column(2);
        let totals = array.sum_axis(Axis(1));

        let nadir_step = living
            .argmin()
            .map_err(|e| TreatmentError::Numerical(format!("no nadir in trajectory: {}", e)))?;
        let peak_total = *totals
            .max()
            .map_err(|e| TreatmentError::Numerical(format!("no peak in trajectory: {}", e)))?;
        let final_populations = self
            .last()
            .ok_or_else(|| TreatmentError::Numerical("empty trajectory".into()))?;
        let surviving_fraction = guarded_div(final_populations.living(), living[0]);

        Ok(Summary {
            steps: self.len(),
            final_populations,
            nadir_step,
            nadir_live_cells: living[nadir_step],
            peak_total,
            surviving_fraction,
            fallback_steps: self.fallback_steps().len(),
        })
    }
}
