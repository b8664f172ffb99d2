use std::cmp::Ordering;

use log::{debug, info, warn};
use ndarray::Array2;
use serde::Serialize;

use crate::error::Result;
use crate::model::{RadiationModel, SimulationConfig, TreatmentPlan};

pub type Real = f64;
pub const POPULATIONS: usize = 4; //live ox, dead ox, live hypoxic, dead hypoxic

//Length of an undelayed cell cycle; the dose-dependent mitotic delay is subtracted from it
const NOMINAL_CYCLE_TIME: Real = 1.0;

/// The four cell counts at one recorded step.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Populations {
	pub live_oxygenated: Real,
	pub dead_oxygenated: Real,
	pub live_hypoxic: Real,
	pub dead_hypoxic: Real,
}

impl Populations {
	pub fn oxygenated(&self) -> Real {
		self.live_oxygenated + self.dead_oxygenated
	}

	pub fn hypoxic(&self) -> Real {
		self.live_hypoxic + self.dead_hypoxic
	}

	pub fn living(&self) -> Real {
		self.live_oxygenated + self.live_hypoxic
	}

	pub fn total(&self) -> Real {
		self.oxygenated() + self.hypoxic()
	}

	fn is_finite(&self) -> bool {
		self.live_oxygenated.is_finite()
			&& self.dead_oxygenated.is_finite()
			&& self.live_hypoxic.is_finite()
			&& self.dead_hypoxic.is_finite()
	}
}

/// What the reoxygenation transition did to a step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rebalance {
	/// Hypoxic cells were moved into the oxygenated pools.
	Reoxygenated,
	/// Oxygenated cells were moved into the hypoxic pools.
	Deoxygenated,
	/// The current ratio already equals the target.
	Balanced,
	/// A ratio was undefined (empty pool or non-finite count); nothing moved.
	Fallback,
}

/// `numerator / denominator`, or `None` when the quotient would not be a finite number.
pub fn guarded_div(numerator: Real, denominator: Real) -> Option<Real> {
	if denominator == 0.0 {
		return None;
	}
	let q = numerator / denominator;
	if q.is_finite() {
		Some(q)
	} else {
		None
	}
}

/// Multi-target single-hit survival, `S = 1 - (1 - exp(-dose/d0))^n`.
/// Zero dose gives exactly 1 for any `n > 0`.
pub fn survival_fraction(dose: Real, d0: Real, hit_number: Real) -> Real {
	1.0 - (1.0 - (-dose / d0).exp()).powf(hit_number)
}

/// Cell kill from one fraction. Every cell that dies moves to the dead pool of its type.
pub fn after_radiation(current: &Populations, dose: Real, model: &RadiationModel) -> Populations {
	let live_oxygenated =
		current.live_oxygenated * survival_fraction(dose, model.oxic_d0, model.oxic_hit_number);
	let live_hypoxic =
		current.live_hypoxic * survival_fraction(dose, model.hypoxic_d0, model.hypoxic_hit_number);
	Populations {
		live_oxygenated,
		dead_oxygenated: current.dead_oxygenated + (current.live_oxygenated - live_oxygenated),
		live_hypoxic,
		dead_hypoxic: current.dead_hypoxic + (current.live_hypoxic - live_hypoxic),
	}
}

/// Cell-cycle time left after the mitotic delay, `1 - gamma * dose`. Not clamped, so
/// `mitotic_delay * dose > 1` turns growth into decay.
pub fn effective_cycle_time(dose: Real, model: &RadiationModel) -> Real {
	NOMINAL_CYCLE_TIME - model.mitotic_delay * dose
}

/// Oxygenated cells divide over a cycle shortened by the mitotic delay; dead oxygenated
/// cells that attempt division disintegrate at the same rate. Hypoxic cells don't divide.
pub fn after_reproduction(current: &Populations, dose: Real, model: &RadiationModel) -> Populations {
	let growth = model.division_rate * effective_cycle_time(dose, model);
	Populations {
		live_oxygenated: grown(current.live_oxygenated, growth),
		dead_oxygenated: grown(current.dead_oxygenated, -growth),
		live_hypoxic: current.live_hypoxic,
		dead_hypoxic: current.dead_hypoxic,
	}
}

//An empty pool stays empty whatever the exponent
fn grown(count: Real, exponent: Real) -> Real {
	if count == 0.0 {
		0.0
	} else {
		count * exponent.exp()
	}
}

/// Moves cells between the oxygenated and hypoxic pools towards the equilibrium ratio
/// `exp(-beta * N)`. The pool holding too many cells shrinks to its target size, giving up
/// live and dead cells in proportion, so both pools keep their live/dead split and the
/// total is conserved.
pub fn after_reoxygenation(current: &Populations, model: &RadiationModel) -> (Populations, Rebalance) {
	let total = current.total();
	let target = (-model.reoxygenation_rate * total).exp();
	let ratio = match guarded_div(current.oxygenated(), current.hypoxic()) {
		Some(ratio) => ratio,
		None => return (*current, Rebalance::Fallback),
	};

	match target.partial_cmp(&ratio) {
		Some(Ordering::Greater) => {
			let hypoxic_target = total / (1.0 + target);
			let moved = match released_share(hypoxic_target, current.hypoxic()) {
				Some(moved) => moved,
				None => return (*current, Rebalance::Fallback),
			};
			let live = current.live_hypoxic * moved;
			let dead = current.dead_hypoxic * moved;
			let next = Populations {
				live_oxygenated: current.live_oxygenated + live,
				dead_oxygenated: current.dead_oxygenated + dead,
				live_hypoxic: current.live_hypoxic - live,
				dead_hypoxic: current.dead_hypoxic - dead,
			};
			checked(current, next, Rebalance::Reoxygenated)
		}
		Some(Ordering::Less) => {
			let oxygenated_target = target * total / (1.0 + target);
			let moved = match released_share(oxygenated_target, current.oxygenated()) {
				Some(moved) => moved,
				None => return (*current, Rebalance::Fallback),
			};
			let live = current.live_oxygenated * moved;
			let dead = current.dead_oxygenated * moved;
			let next = Populations {
				live_oxygenated: current.live_oxygenated - live,
				dead_oxygenated: current.dead_oxygenated - dead,
				live_hypoxic: current.live_hypoxic + live,
				dead_hypoxic: current.dead_hypoxic + dead,
			};
			checked(current, next, Rebalance::Deoxygenated)
		}
		_ => (*current, Rebalance::Balanced),
	}
}

//Share of a pool that has to leave for it to shrink to `target`
fn released_share(target: Real, pool: Real) -> Option<Real> {
	guarded_div(target, pool).map(|kept| (1.0 - kept).clamp(0.0, 1.0))
}

fn checked(current: &Populations, next: Populations, outcome: Rebalance) -> (Populations, Rebalance) {
	if next.is_finite() {
		(next, outcome)
	} else {
		(*current, Rebalance::Fallback)
	}
}

/// The recorded cell-count history of one run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trajectory {
	live_oxygenated: Vec<Real>,
	dead_oxygenated: Vec<Real>,
	live_hypoxic: Vec<Real>,
	dead_hypoxic: Vec<Real>,
	fallback_steps: Vec<usize>,
}

impl Trajectory {
	pub fn live_oxygenated(&self) -> &[Real] {
		&self.live_oxygenated
	}

	pub fn dead_oxygenated(&self) -> &[Real] {
		&self.dead_oxygenated
	}

	pub fn live_hypoxic(&self) -> &[Real] {
		&self.live_hypoxic
	}

	pub fn dead_hypoxic(&self) -> &[Real] {
		&self.dead_hypoxic
	}

	/// Steps whose reoxygenation was skipped because a ratio was undefined.
	pub fn fallback_steps(&self) -> &[usize] {
		&self.fallback_steps
	}

	pub fn len(&self) -> usize {
		self.live_oxygenated.len()
	}

	pub fn is_empty(&self) -> bool {
		self.live_oxygenated.is_empty()
	}

	pub fn at(&self, step: usize) -> Option<Populations> {
		if step < self.len() {
			Some(self.entry(step))
		} else {
			None
		}
	}

	pub fn last(&self) -> Option<Populations> {
		self.len().checked_sub(1).and_then(|step| self.at(step))
	}

	/// One row per step, columns ordered as in [`Populations`].
	pub fn to_array(&self) -> Array2<Real> {
		let mut array = Array2::<Real>::zeros((self.len(), POPULATIONS));
		for step in 0..self.len() {
			array[[step, 0]] = self.live_oxygenated[step];
			array[[step, 1]] = self.dead_oxygenated[step];
			array[[step, 2]] = self.live_hypoxic[step];
			array[[step, 3]] = self.dead_hypoxic[step];
		}
		array
	}

	fn entry(&self, step: usize) -> Populations {
		Populations {
			live_oxygenated: self.live_oxygenated[step],
			dead_oxygenated: self.dead_oxygenated[step],
			live_hypoxic: self.live_hypoxic[step],
			dead_hypoxic: self.dead_hypoxic[step],
		}
	}

	fn push(&mut self, p: Populations) {
		self.live_oxygenated.push(p.live_oxygenated);
		self.dead_oxygenated.push(p.dead_oxygenated);
		self.live_hypoxic.push(p.live_hypoxic);
		self.dead_hypoxic.push(p.dead_hypoxic);
	}

	fn replace(&mut self, step: usize, p: Populations) {
		self.live_oxygenated[step] = p.live_oxygenated;
		self.dead_oxygenated[step] = p.dead_oxygenated;
		self.live_hypoxic[step] = p.live_hypoxic;
		self.dead_hypoxic[step] = p.dead_hypoxic;
	}
}

//Contains state of a tumor under treatment. `step` always points at the last recorded entry.
pub struct Tumor {
	model: RadiationModel,
	history: Trajectory,
	step: usize,
}

impl Tumor {
	/// Seeds step 0 from the initial cell count and the oxygenated/hypoxic split.
	pub fn new(model: &RadiationModel) -> Tumor {
		let mut history = Trajectory::default();
		history.push(Populations {
			live_oxygenated: model.initial_cell_count * model.oxygenated_fraction,
			dead_oxygenated: 0.0,
			live_hypoxic: model.initial_cell_count * model.hypoxic_fraction(),
			dead_hypoxic: 0.0,
		});
		Tumor { model: model.clone(), history, step: 0 }
	}

	pub fn step(&self) -> usize {
		self.step
	}

	pub fn current(&self) -> Populations {
		self.history.entry(self.step)
	}

	pub fn history(&self) -> &Trajectory {
		&self.history
	}

	/// Appends the post-radiation step.
	pub fn irradiate(&mut self, dose: Real) {
		let next = after_radiation(&self.current(), dose, &self.model);
		self.history.push(next);
		self.step += 1;
	}

	/// Appends the post-reproduction step.
	pub fn reproduce(&mut self, dose: Real) {
		let next = after_reproduction(&self.current(), dose, &self.model);
		self.history.push(next);
		self.step += 1;
	}

	/// Corrects the current step in place; no entry is appended.
	pub fn reoxygenate(&mut self) -> Rebalance {
		let (next, outcome) = after_reoxygenation(&self.current(), &self.model);
		if outcome == Rebalance::Fallback {
			warn!("step {}: oxygenation ratio undefined, skipping reoxygenation", self.step);
			self.history.fallback_steps.push(self.step);
		} else {
			self.history.replace(self.step, next);
		}
		outcome
	}

	/// One treatment fraction: radiation, reproduction, then reoxygenation.
	pub fn treat(&mut self, dose: Real) -> Rebalance {
		self.irradiate(dose);
		self.reproduce(dose);
		self.reoxygenate()
	}

	pub fn into_trajectory(self) -> Trajectory {
		self.history
	}
}

/// Runs `fraction_count` fractions of `dose` and returns the `2 * fraction_count + 1` step history.
pub fn run(fraction_count: usize, dose: Real, model: &RadiationModel) -> Result<Trajectory> {
	let config = SimulationConfig {
		plan: TreatmentPlan { fraction_count, dose },
		model: model.clone(),
	};
	simulate(&config)
}

pub fn simulate(config: &SimulationConfig) -> Result<Trajectory> {
	config.validate()?;
	let plan = &config.plan;
	info!("Treating tumor: {} fractions of {} rad", plan.fraction_count, plan.dose);

	let mut tumor = Tumor::new(&config.model);
	for fraction in 0..plan.fraction_count {
		let outcome = tumor.treat(plan.dose);
		let p = tumor.current();
		debug!(
			"fraction {}: {:?}, live {:.4e}, total {:.4e}",
			fraction + 1,
			outcome,
			p.living(),
			p.total()
		);
	}

	let trajectory = tumor.into_trajectory();
	if let Some(last) = trajectory.last() {
		info!("Treatment done: {:.4e} living cells remain", last.living());
	}
	Ok(trajectory)
}
