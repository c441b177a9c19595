//! PSO solver: canonical global-best Particle Swarm Optimization with
//! linearly decreasing inertia, seeded by uniform and "smart" samples
//! (spec §4.6).

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::camera_man::CameraMan;
use crate::candidate::Candidate;
use crate::domain::Range;
use crate::log;
use crate::oracle::SceneOracle;

const MAX_CANDIDATES: usize = 300;
const MIN_CANDIDATES: usize = 1;
const HARD_ITERATION_CAP: u32 = 3000;
const STEADY_VELOCITY_FRACTION: f32 = 0.001;

/// Why a `solve` call stopped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitCondition {
    TimeLimitReached,
    SatisfactionThresholdReached,
    Continuing,
}

impl ExitCondition {
    pub fn code(self) -> i32 {
        match self {
            ExitCondition::TimeLimitReached => 0,
            ExitCondition::SatisfactionThresholdReached => 1,
            ExitCondition::Continuing => 2,
        }
    }
}

/// A recorded global-best snapshot (spec §6 "Viewpoint output record").
#[derive(Clone, Debug)]
pub struct Viewpoint {
    pub params: Vec<f32>,
    /// `[objective, property_1, property_2, ...]`, index-aligned with the
    /// evaluator's property arena.
    pub satisfactions: Vec<f32>,
    pub in_screen_ratios: Vec<f32>,
    pub iteration: u32,
}

impl Viewpoint {
    /// The sentinel viewpoint returned when a `solve` call produces no
    /// valid global best (spec §6, §7 "NoSolution").
    pub fn sentinel(property_count: usize) -> Self {
        Self {
            params: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 60.0],
            satisfactions: vec![-1.0; property_count.max(1)],
            in_screen_ratios: vec![0.0; property_count.max(1)],
            iteration: 0,
        }
    }
}

pub struct PsoSolver {
    pub evaluator: CameraMan,
    candidates: Vec<Candidate>,
    num_active: usize,
    random_fraction: f32,
    c1: f32,
    c2: f32,
    w_max: f32,
    w_min: f32,

    max_sat: f32,
    exit_condition: ExitCondition,
    iter: u32,
    iter_of_best: u32,
    time_limit_s: f32,
    t0: Option<Instant>,
    elapsed: f32,
    ranges: Vec<Range>,
    global_best_index: usize,
    steady_particles: bool,
    pub best_history: Vec<Viewpoint>,
    rng: StdRng,
}

impl PsoSolver {
    pub fn new(evaluator: CameraMan, seed: u64) -> Self {
        let dims = evaluator.dimensions();
        let ranges = evaluator.domain.ranges();
        let num_active = 40usize.min(MAX_CANDIDATES);
        Self {
            candidates: (0..num_active).map(|_| Candidate::new(dims)).collect(),
            num_active,
            random_fraction: 0.3,
            c1: 1.7,
            c2: 1.7,
            w_max: 0.9,
            w_min: 0.4,
            max_sat: 0.95,
            exit_condition: ExitCondition::Continuing,
            iter: 0,
            iter_of_best: 0,
            time_limit_s: 0.0,
            t0: None,
            elapsed: 0.0,
            ranges,
            global_best_index: 0,
            steady_particles: false,
            best_history: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            evaluator,
        }
    }

    pub fn exit_condition(&self) -> ExitCondition {
        self.exit_condition
    }

    pub fn iter(&self) -> u32 {
        self.iter
    }

    pub fn steady_particles(&self) -> bool {
        self.steady_particles
    }

    /// Sets swarm size, the uniform-vs-smart seeding split, and the PSO
    /// constants, clamping each to a sane range and logging a warning when
    /// the caller's value was out of bounds (spec's Camera Man/solver
    /// external-interfaces surface, spec §6).
    pub fn set_parameters(&mut self, n_candidates: usize, random_fraction: f32, pso_constants: [f32; 4]) {
        let clamped_n = n_candidates.clamp(MIN_CANDIDATES, MAX_CANDIDATES);
        if clamped_n != n_candidates {
            log::warn(format!(
                "requested {n_candidates} candidates, clamped to {clamped_n} (allowed range [{MIN_CANDIDATES}, {MAX_CANDIDATES}])"
            ));
        }
        let dims = self.evaluator.dimensions();
        self.candidates.resize_with(clamped_n, || Candidate::new(dims));
        self.num_active = clamped_n;

        let clamped_fraction = random_fraction.clamp(0.0, 1.0);
        if (clamped_fraction - random_fraction).abs() > f32::EPSILON {
            log::warn(format!("random_fraction {random_fraction} clamped to {clamped_fraction}"));
        }
        self.random_fraction = clamped_fraction;

        let [c1, c2, w_max, w_min] = pso_constants;
        self.c1 = c1.max(0.0);
        self.c2 = c2.max(0.0);
        self.w_max = w_max.max(w_min.max(0.0));
        self.w_min = w_min.max(0.0).min(self.w_max);
        if w_min > w_max {
            log::warn(format!("w_min ({w_min}) > w_max ({w_max}); swapped to keep the inertia schedule decreasing"));
        }
    }

    /// Populates the swarm (spec §4.6 "Initialization"): copies any
    /// externally seeded candidates, fills a uniform-random fraction, and
    /// distributes the remainder as smart samples across the target list.
    pub fn initialize<O: SceneOracle + ?Sized>(&mut self, initial_candidates: &[Vec<f32>], oracle: &O) {
        let n = self.num_active;
        let seeded = initial_candidates.len().min(n);
        for (i, params) in initial_candidates.iter().take(seeded).enumerate() {
            self.candidates[i].seed(params.clone());
        }

        let random_count = ((n as f32) * self.random_fraction).floor() as usize;
        let random_end = random_count.max(seeded);
        for candidate in self.candidates.iter_mut().take(random_end).skip(seeded) {
            let params = self.evaluator.random_viewpoint(&mut self.rng);
            candidate.seed(params);
        }

        let target_count = self.evaluator.targets.len().max(1);
        for (offset, candidate) in self.candidates.iter_mut().skip(random_end).enumerate() {
            let target_index = offset % target_count;
            let params = if self.evaluator.targets.is_empty() {
                self.evaluator.random_viewpoint(&mut self.rng)
            } else {
                // `smart_random_viewpoint` needs `&mut CameraMan`, which is
                // already borrowed by `self.evaluator` here; sample via a
                // temporary solver-owned RNG split to avoid aliasing.
                Self::smart_sample(&mut self.evaluator, target_index, oracle, &mut self.rng)
            };
            candidate.seed(params);
        }

        self.iter = 0;
        self.iter_of_best = 0;
        self.exit_condition = ExitCondition::Continuing;
        self.best_history.clear();
        self.global_best_index = 0;
    }

    fn smart_sample<O: SceneOracle + ?Sized>(evaluator: &mut CameraMan, target_index: usize, oracle: &O, rng: &mut StdRng) -> Vec<f32> {
        evaluator.smart_random_viewpoint(target_index, oracle, rng)
    }

    fn inertia_weight(&self) -> f32 {
        if self.time_limit_s <= 0.0 {
            return self.w_min;
        }
        let t = self.elapsed;
        let decay_window = 0.85 * self.time_limit_s;
        if decay_window <= 0.0 {
            return self.w_min;
        }
        let w = self.w_max - t * (self.w_max - self.w_min) / decay_window;
        w.max(self.w_min)
    }

    /// Runs PSO until the time budget, satisfaction threshold, or the hard
    /// 3000-iteration cap is reached, returning the best viewpoint found (or
    /// the sentinel if none was, spec §6/§7).
    #[allow(clippy::too_many_arguments)]
    pub fn solve<O: SceneOracle + ?Sized>(
        &mut self,
        time_limit_ms: u64,
        sat_threshold: f32,
        initial_candidates: &[Vec<f32>],
        check_geometry: bool,
        init: bool,
        oracle: &O,
    ) -> Viewpoint {
        self.time_limit_s = time_limit_ms as f32 / 1000.0;
        self.max_sat = sat_threshold;
        self.t0 = Some(Instant::now());
        self.elapsed = 0.0;

        if init {
            self.initialize(initial_candidates, oracle);
        } else {
            self.iter = 0;
            self.exit_condition = ExitCondition::Continuing;
        }

        // A warm start reuses candidates (and their cumulative
        // `times_out_of_domain`) from a prior `solve` call; only count
        // out-of-domain iterations from this call when judging whether a
        // candidate is chronically stuck.
        let out_of_domain_baseline: Vec<u32> = self.candidates.iter().map(|c| c.times_out_of_domain).collect();

        loop {
            self.elapsed = self.t0.map(|t0| t0.elapsed().as_secs_f32()).unwrap_or(0.0);
            if self.elapsed >= self.time_limit_s {
                self.exit_condition = ExitCondition::TimeLimitReached;
                break;
            }
            if self.best_history.last().map(|v| v.satisfactions[0] >= self.max_sat).unwrap_or(false) {
                self.exit_condition = ExitCondition::SatisfactionThresholdReached;
                break;
            }
            if self.iter >= HARD_ITERATION_CAP {
                self.exit_condition = ExitCondition::TimeLimitReached;
                break;
            }

            self.iter += 1;
            self.run_iteration(check_geometry, oracle);
        }

        self.warn_chronically_out_of_domain(&out_of_domain_baseline);

        match self.best_history.last().cloned() {
            Some(viewpoint) => {
                log::info(format!(
                    "solve finished after {} iteration(s) ({:?}): satisfaction={:.4}, found at iteration {}",
                    self.iter, self.exit_condition, viewpoint.satisfactions[0], self.iter_of_best
                ));
                viewpoint
            }
            None => {
                log::err(format!(
                    "solve found no valid viewpoint in {} iteration(s) ({:?}); returning the NoSolution sentinel",
                    self.iter, self.exit_condition
                ));
                Viewpoint::sentinel(self.evaluator.properties.len())
            }
        }
    }

    /// Warns once per `solve` call about any candidate that was out of
    /// domain on every iteration of this call, since such a candidate never
    /// contributed an evaluation and likely signals a domain that is too
    /// tight around its seed (spec §1 ambient diagnostics). `baseline` is
    /// each candidate's `times_out_of_domain` before this call started, so a
    /// warm start's carried-over count doesn't inflate the tally.
    fn warn_chronically_out_of_domain(&self, baseline: &[u32]) {
        if self.iter == 0 {
            return;
        }
        let stuck = self
            .candidates
            .iter()
            .zip(baseline)
            .filter(|(c, &before)| c.times_out_of_domain - before >= self.iter)
            .count();
        if stuck > 0 {
            log::warn(format!(
                "{stuck} of {} candidate(s) were out of domain for all {} iteration(s) of this solve",
                self.num_active, self.iter
            ));
        }
    }

    fn run_iteration<O: SceneOracle + ?Sized>(&mut self, check_geometry: bool, oracle: &O) {
        let w = self.inertia_weight();
        let global_best_position = self.candidates[self.global_best_index].best_position.clone();
        let mut all_steady = true;

        for i in 0..self.num_active {
            if self.iter > 1 {
                self.update_velocity_and_position(i, w, &global_best_position, &mut all_steady);
            }

            let params = self.candidates[i].position.clone();
            let in_domain = self.evaluator.in_domain_checked(&params, oracle, check_geometry);
            self.candidates[i].in_domain = in_domain;

            let evaluation = if !in_domain {
                self.candidates[i].times_out_of_domain += 1;
                -2.0
            } else if self.evaluator.update(&params).is_err() {
                -2.0
            } else {
                let threshold = self.candidates[i].best_evaluation;
                self.evaluator.evaluate(oracle, threshold, &mut self.rng)
            };
            self.candidates[i].evaluation = evaluation;

            if evaluation >= 0.0 {
                if evaluation > self.candidates[i].best_evaluation {
                    self.candidates[i].best_evaluation = evaluation;
                    self.candidates[i].best_position = params.clone();
                    self.candidates[i].best_iteration = self.iter;
                }

                let current_best = self.candidates[self.global_best_index].best_evaluation;
                if evaluation > current_best || (i == self.global_best_index && evaluation >= current_best) {
                    self.global_best_index = i;
                    self.iter_of_best = self.iter;
                    let (satisfactions, ratios) = self.evaluator.snapshot();
                    self.best_history.push(Viewpoint {
                        params,
                        satisfactions,
                        in_screen_ratios: ratios,
                        iteration: self.iter,
                    });
                }
            }
        }

        self.steady_particles = all_steady;
    }

    fn update_velocity_and_position(&mut self, i: usize, w: f32, global_best_position: &[f32], all_steady: &mut bool) {
        let dims = self.candidates[i].dimensions();
        for j in 0..dims {
            let r1: f32 = self.rng.gen_range(0.0..1.0);
            let r2: f32 = self.rng.gen_range(0.0..1.0);
            let range = self.ranges.get(j).copied().unwrap_or(Range::new(-1.0, 1.0)).span().max(1.0e-6);

            let candidate = &mut self.candidates[i];
            let personal = candidate.best_position[j] - candidate.position[j];
            let social = global_best_position[j] - candidate.position[j];
            let mut v = w * candidate.velocity[j] + self.c1 * r1 * personal + self.c2 * r2 * social;
            v = v.clamp(-range, range);
            candidate.velocity[j] = v;
            candidate.position[j] += v;

            if v.abs() > STEADY_VELOCITY_FRACTION * range {
                *all_steady = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Box3, Domain, Range as DomainRange};
    use crate::property::{Property, PropertyKind};
    use crate::target::Target;
    use crate::test_support::MockOracle;
    use nalgebra::Vector3;
    use viewpoint_math::{SatSpline, SizeMode};

    fn cube_problem() -> (PsoSolver, MockOracle) {
        let mut oracle = MockOracle::new();
        let id = oracle.add_box(Vector3::zeros(), Vector3::new(2.0, 2.0, 2.0));
        let mut target = Target::new("cube", id, vec![id], vec![]);
        let mut rng = rand::thread_rng();
        target.update_bounds(&oracle, &mut rng);

        let size_spline = SatSpline::new(&[0.0, 0.25, 1.0], &[0.0, 1.0, 0.0]).unwrap();
        let size_property = Property::new(
            "size",
            vec![0],
            1.0,
            size_spline,
            PropertyKind::Size { targets: vec![0], mode: SizeMode::Area },
        );
        let root = Property::aggregation("root", vec![1], &[1.0]).unwrap();

        let domain = Domain::look_at(
            Box3::new(Vector3::new(-10.0, -10.0, -10.0), Vector3::new(10.0, 10.0, 10.0)),
            Box3::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0)),
            DomainRange::new(0.0, 0.0),
            DomainRange::new(60.0f32.to_radians(), 60.0f32.to_radians()),
        );

        let mut camera_man = CameraMan::new(domain, vec![root, size_property], vec![target]);
        camera_man.targets[0].referencing_properties.push(1);
        let solver = PsoSolver::new(camera_man, 42);
        (solver, oracle)
    }

    #[test]
    fn set_parameters_clamps_out_of_range_candidate_count() {
        let (mut solver, _oracle) = cube_problem();
        solver.set_parameters(10_000, 2.0, [1.7, 1.7, 0.9, 0.4]);
        assert_eq!(solver.num_active, MAX_CANDIDATES);
        assert_eq!(solver.random_fraction, 1.0);
    }

    #[test]
    fn solve_finds_a_reasonable_viewpoint_for_a_single_cube() {
        let (mut solver, oracle) = cube_problem();
        solver.set_parameters(30, 0.4, [1.7, 1.7, 0.9, 0.4]);
        let viewpoint = solver.solve(300, 0.95, &[], true, true, &oracle);
        assert!(viewpoint.satisfactions[0] >= -1.0);
        assert_eq!(viewpoint.params.len(), 8);
    }

    #[test]
    fn best_evaluation_is_non_decreasing_across_history() {
        let (mut solver, oracle) = cube_problem();
        solver.set_parameters(20, 0.5, [1.7, 1.7, 0.9, 0.4]);
        solver.solve(200, 0.999, &[], true, true, &oracle);
        let mut last = -1.0;
        for v in &solver.best_history {
            assert!(v.satisfactions[0] + 1.0e-6 >= last);
            last = v.satisfactions[0];
        }
    }

    #[test]
    fn warm_start_continues_from_previous_best() {
        let (mut solver, oracle) = cube_problem();
        solver.set_parameters(20, 0.5, [1.7, 1.7, 0.9, 0.4]);
        let first = solver.solve(100, 0.999, &[], true, true, &oracle);
        let second = solver.solve(100, 0.999, &[], true, false, &oracle);
        assert!(second.satisfactions[0] + 1.0e-6 >= first.satisfactions[0]);
    }
}
