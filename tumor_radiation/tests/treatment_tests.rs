//! End-to-end checks of the treatment pipeline.
//!
//! Each fraction is stepped by hand so the reoxygenation correction can be
//! compared against the post-reproduction state it replaces.

use approx::assert_relative_eq;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};
use rand_pcg::Pcg64;

use tumor_radiation::{run, simulate, RadiationModel, Rebalance, SimulationConfig, TreatmentError, Tumor};

fn assert_sane(tumor: &Tumor) {
	let p = tumor.current();
	for &count in &[p.live_oxygenated, p.dead_oxygenated, p.live_hypoxic, p.dead_hypoxic] {
		assert!(count.is_finite(), "non-finite count at step {}: {:?}", tumor.step(), p);
		assert!(count >= 0.0, "negative count at step {}: {:?}", tumor.step(), p);
	}
}

fn step_course(model: &RadiationModel, fractions: usize, dose: f64) -> Tumor {
	let mut tumor = Tumor::new(model);
	for _ in 0..fractions {
		let before = tumor.current();
		tumor.irradiate(dose);
		let irradiated = tumor.current();
		assert!(irradiated.dead_oxygenated >= before.dead_oxygenated);
		assert!(irradiated.dead_hypoxic >= before.dead_hypoxic);
		assert!(irradiated.live_oxygenated <= before.live_oxygenated);
		assert!(irradiated.live_hypoxic <= before.live_hypoxic);

		tumor.reproduce(dose);
		let reproduced = tumor.current();
		assert_eq!(reproduced.live_hypoxic, irradiated.live_hypoxic);
		assert_eq!(reproduced.dead_hypoxic, irradiated.dead_hypoxic);

		let step = tumor.step();
		tumor.reoxygenate();
		assert_eq!(tumor.step(), step, "reoxygenation must not append a step");
		assert_relative_eq!(tumor.current().total(), reproduced.total(), max_relative = 1e-12);
		assert_sane(&tumor);
	}
	tumor
}

#[test]
fn test_reference_course_conserves_cells_at_every_reoxygenation() {
	let model = RadiationModel::default();
	let tumor = step_course(&model, 50, 200.0);
	assert_eq!(tumor.history().len(), 101);
	assert_eq!(tumor.step(), 100);
	assert!(tumor.history().fallback_steps().is_empty());
}

#[test]
fn test_stepping_matches_driver() {
	let model = RadiationModel::default();
	let stepped = step_course(&model, 20, 200.0).into_trajectory();
	let driven = run(20, 200.0, &model).unwrap();
	assert_eq!(stepped, driven);
}

#[test]
fn test_runs_are_deterministic_and_independent() {
	let config = SimulationConfig::default();
	let first = simulate(&config).unwrap();
	let second = simulate(&config).unwrap();
	assert_eq!(first, second);
	assert_eq!(first.len(), 2 * config.plan.fraction_count + 1);
}

#[test]
fn test_zero_dose_never_kills() {
	let model = RadiationModel::default();
	let trajectory = run(10, 0.0, &model).unwrap();
	assert!(trajectory.dead_oxygenated().iter().all(|&c| c == 0.0));
	assert!(trajectory.dead_hypoxic().iter().all(|&c| c == 0.0));
	assert!(trajectory.fallback_steps().is_empty());

	//without radiation the undelayed oxygenated cells grow every fraction
	let first = trajectory.at(0).unwrap();
	let last = trajectory.last().unwrap();
	assert!(last.living() > first.living());
	assert!(last.total().is_finite());
}

#[test]
fn test_dose_shrinks_living_cells() {
	let model = RadiationModel::default();
	let trajectory = run(1, 200.0, &model).unwrap();
	let start = trajectory.at(0).unwrap();
	let irradiated = trajectory.at(1).unwrap();
	assert_relative_eq!(start.live_oxygenated, 3.6875e9, max_relative = 1e-12);
	assert_relative_eq!(start.live_hypoxic, 6.3125e9, max_relative = 1e-12);
	assert!(irradiated.live_oxygenated < start.live_oxygenated);
	assert!(irradiated.live_hypoxic < start.live_hypoxic);
	assert_relative_eq!(
		irradiated.dead_oxygenated + irradiated.live_oxygenated,
		start.dead_oxygenated + start.live_oxygenated,
		max_relative = 1e-12
	);
}

#[test]
fn test_empty_tumor_falls_back_every_fraction() {
	let model = RadiationModel { initial_cell_count: 0.0, ..RadiationModel::default() };
	let mut tumor = Tumor::new(&model);
	for _ in 0..5 {
		assert_eq!(tumor.treat(200.0), Rebalance::Fallback);
	}
	let trajectory = tumor.into_trajectory();
	assert_eq!(trajectory.fallback_steps(), &[2, 4, 6, 8, 10]);
	assert!(trajectory.live_oxygenated().iter().all(|&c| c == 0.0));
}

#[test]
fn test_random_parameters_keep_counts_sane() {
	let mut rng = Pcg64::seed_from_u64(42);
	let hit = Uniform::new(0.5, 8.0);
	let d0 = Uniform::new(50.0, 400.0);
	let rate = Uniform::new(0.0, 0.02);
	let beta = Uniform::new(0.0, 5e-10);
	let dose = Uniform::new(0.0, 400.0);

	for _ in 0..50 {
		let model = RadiationModel {
			oxic_hit_number: hit.sample(&mut rng),
			oxic_d0: d0.sample(&mut rng),
			hypoxic_hit_number: hit.sample(&mut rng),
			hypoxic_d0: d0.sample(&mut rng),
			division_rate: rate.sample(&mut rng),
			reoxygenation_rate: beta.sample(&mut rng),
			mitotic_delay: rate.sample(&mut rng),
			..RadiationModel::default()
		};
		step_course(&model, 30, dose.sample(&mut rng));
	}
}

#[test]
fn test_invalid_configuration_is_rejected_before_running() {
	let mut config = SimulationConfig::default();
	config.model.hypoxic_d0 = -250.0;
	match simulate(&config) {
		Err(TreatmentError::InvalidConfig { field, .. }) => assert_eq!(field, "hypoxic_d0"),
		other => panic!("expected invalid config, got {:?}", other),
	}
	assert!(run(0, 200.0, &RadiationModel::default()).is_err());
}

#[test]
fn test_overflowing_growth_is_rejected_before_running() {
	let fast = RadiationModel { division_rate: 1.0, mitotic_delay: 1.0, ..RadiationModel::default() };
	let empty = RadiationModel { initial_cell_count: 0.0, ..fast.clone() };
	for model in &[fast, empty] {
		match run(1, 1000.0, model) {
			Err(TreatmentError::InvalidConfig { field, .. }) => assert_eq!(field, "division_rate"),
			other => panic!("expected invalid config, got {:?}", other),
		}
	}
}

#[test]
fn test_fastest_accepted_growth_stays_finite() {
	//exp(10) per fraction for 60 fractions is just inside the float range for 1e10 cells
	let model = RadiationModel { division_rate: 10.0, mitotic_delay: 0.0, ..RadiationModel::default() };
	let trajectory = run(60, 0.0, &model).unwrap();
	let array = trajectory.to_array();
	assert!(array.iter().all(|c| c.is_finite() && *c >= 0.0), "non-finite counts in {:?}", trajectory);
}
