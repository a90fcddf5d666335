//! Outer solver iteration (spec section 4.4): rollout, linearize,
//! quadraticize, solve the LQ game, modify, log, check convergence.

use nalgebra::DVector;
use rayon::prelude::*;

use crate::convergence::{ConvergenceMonitor, ConvergenceStatus};
use crate::cost::{quadraticize_exponentiated, PlayerCost};
use crate::dynamics::Dynamics;
use crate::error::GameSolveError;
use crate::lq_solver::{solve_lq_game, solve_lq_game_flat};
use crate::log::Log;
use crate::modifier::{FixedAlphaScaling, Modifier, ModifierContext};
use crate::rollout::rollout;
use crate::types::{LinearDynamicsApproximation, OperatingPoint, QuadraticCostApproximation, Strategy};

/// Everything a caller gets back from [`Solver::solve`].
pub struct SolveResult {
    pub operating_point: OperatingPoint,
    pub strategies: Vec<Strategy>,
    pub log: Log,
    pub iterations: usize,
    /// True when the iteration cap was hit before the convergence test was
    /// met (spec section 4.8: reported as success, not failure).
    pub timed_out: bool,
}

/// Ties the dynamics, per-player costs, LQ recursion, rollout, and modifier
/// together into the fixed-point iteration of spec section 4.4.
///
/// Dynamics are a concrete, shared-read type for the life of a solve; costs
/// are trait objects since each player may use a different cost
/// implementation. Both are immutable references for the duration of
/// `solve` (spec section 5).
pub struct Solver<D: Dynamics> {
    dynamics: D,
    costs: Vec<Box<dyn PlayerCost>>,
    config: crate::config::SolverConfig,
    modifier: Box<dyn Modifier>,
}

impl<D: Dynamics> Solver<D> {
    /// Build a solver with the default modifier implied by `config`: a
    /// `FixedAlphaScaling` seeded from `config.initial_alpha_scaling` and
    /// clipped to `config.trust_region_size` when set (spec section 6). Use
    /// [`Solver::with_modifier`] to supply a different modifier (e.g.
    /// [`crate::modifier::LineSearchModifier`]) explicitly.
    pub fn new(
        dynamics: D,
        costs: Vec<Box<dyn PlayerCost>>,
        config: crate::config::SolverConfig,
    ) -> Result<Self, GameSolveError> {
        let mut default_modifier = FixedAlphaScaling::new(config.initial_alpha_scaling);
        if let Some(size) = config.trust_region_size {
            default_modifier = default_modifier.with_trust_region(size);
        }
        Self::with_modifier(dynamics, costs, config, Box::new(default_modifier))
    }

    /// Build a solver with an explicit modifier. The modifier's own fields
    /// (e.g. `LineSearchModifier::initial_gamma`) are authoritative over its
    /// step-size control; `config.initial_alpha_scaling`/`trust_region_size`
    /// are not consulted on this path.
    pub fn with_modifier(
        dynamics: D,
        costs: Vec<Box<dyn PlayerCost>>,
        config: crate::config::SolverConfig,
        modifier: Box<dyn Modifier>,
    ) -> Result<Self, GameSolveError> {
        if costs.len() != dynamics.num_players() {
            return Err(GameSolveError::config(
                "number of player costs does not match dynamics.num_players()",
            ));
        }

        let shared_a = config.exponential_constant;
        for (i, cost) in costs.iter().enumerate() {
            if cost.is_exponentiated() && (cost.exponential_constant() - shared_a).abs() > 1e-12 {
                return Err(GameSolveError::config(format!(
                    "player {i}'s exponential constant does not match the configured shared constant"
                )));
            }
        }

        Ok(Self {
            dynamics,
            costs,
            config,
            modifier,
        })
    }

    pub fn num_players(&self) -> usize {
        self.dynamics.num_players()
    }

    /// Run the outer fixed-point iteration to an approximate feedback Nash
    /// equilibrium, starting from `x0`, `initial_operating_point`, and
    /// `initial_strategies`.
    pub fn solve(
        &self,
        x0: DVector<f64>,
        initial_operating_point: OperatingPoint,
        initial_strategies: Vec<Strategy>,
    ) -> Result<SolveResult, GameSolveError> {
        let horizon = self.config.horizon_steps();
        let x_dim = self.dynamics.x_dim();
        let num_players = self.dynamics.num_players();
        let u_dims: Vec<usize> = (0..num_players).map(|i| self.dynamics.u_dim(i)).collect();

        self.validate_dims(&initial_operating_point, &initial_strategies, horizon, x_dim, &u_dims)?;

        let dt = self.config.time_step;
        let mut strategies = initial_strategies;
        let mut last_point = initial_operating_point;
        let mut scratch_point = OperatingPoint::zeros(horizon, x_dim, &u_dims, last_point.t0);

        let mut linearization: Vec<LinearDynamicsApproximation> = (0..horizon)
            .map(|_| LinearDynamicsApproximation::zeros(x_dim, &u_dims))
            .collect();
        let mut quadraticization: Vec<Vec<QuadraticCostApproximation>> = (0..horizon)
            .map(|_| {
                (0..num_players)
                    .map(|_| QuadraticCostApproximation::zeros(x_dim, &u_dims))
                    .collect()
            })
            .collect();

        let mut log = Log::new();
        let monitor = ConvergenceMonitor::new(
            self.config.convergence_tolerance,
            self.config.convergence_tolerance,
            self.config.max_iterations,
        );

        let mut iterations = 0usize;
        let timed_out;

        loop {
            iterations += 1;
            tracing::debug!(iterations, "starting outer iteration");

            rollout(
                &self.dynamics,
                &last_point,
                &strategies,
                &x0,
                dt,
                self.config.open_loop,
                &mut scratch_point,
            );

            self.quadraticize_all(&scratch_point, &mut quadraticization);

            let candidate_strategies = if self.config.time_invariant_dynamics {
                let lin0 =
                    self.dynamics
                        .linearize(scratch_point.t0, dt, &scratch_point.xs[0], &scratch_point.us[0]);
                solve_lq_game_flat(&lin0, &quadraticization)?
            } else {
                self.linearize_all(&scratch_point, &mut linearization);
                solve_lq_game(&linearization, &quadraticization)?
            };

            let current_costs = self.trajectory_costs(&scratch_point);
            let reference_point = scratch_point.clone();
            let trial_fn = |trial_strategies: &[Strategy]| {
                let mut trial_point = reference_point.clone();
                rollout(
                    &self.dynamics,
                    &reference_point,
                    trial_strategies,
                    &x0,
                    dt,
                    self.config.open_loop,
                    &mut trial_point,
                );
                let costs = self.trajectory_costs(&trial_point);
                (trial_point, costs)
            };
            let context = ModifierContext {
                trial: &trial_fn,
                last_cost: &current_costs,
            };
            let modified_strategies = self.modifier.modify(&candidate_strategies, &context)?;

            log.push(scratch_point.clone(), modified_strategies.clone());

            let status = monitor.check(iterations, &scratch_point, &last_point);

            strategies = modified_strategies;
            std::mem::swap(&mut last_point, &mut scratch_point);

            match status {
                ConvergenceStatus::Converged => {
                    timed_out = false;
                    break;
                }
                ConvergenceStatus::Timeout => {
                    timed_out = true;
                    break;
                }
                ConvergenceStatus::NotConverged => continue,
            }
        }

        Ok(SolveResult {
            operating_point: last_point,
            strategies,
            log,
            iterations,
            timed_out,
        })
    }

    fn validate_dims(
        &self,
        operating_point: &OperatingPoint,
        strategies: &[Strategy],
        horizon: usize,
        x_dim: usize,
        u_dims: &[usize],
    ) -> Result<(), GameSolveError> {
        if operating_point.horizon() != horizon {
            return Err(GameSolveError::config(format!(
                "operating point horizon {} does not match configured horizon {}",
                operating_point.horizon(),
                horizon
            )));
        }
        if strategies.len() != u_dims.len() {
            return Err(GameSolveError::config(format!(
                "got {} strategies for {} players",
                strategies.len(),
                u_dims.len()
            )));
        }
        for (i, (strategy, &u_dim)) in strategies.iter().zip(u_dims.iter()).enumerate() {
            if strategy.horizon() != horizon {
                return Err(GameSolveError::config(format!(
                    "player {i} strategy horizon {} does not match {horizon}",
                    strategy.horizon()
                )));
            }
            if strategy.p[0].nrows() != u_dim || strategy.p[0].ncols() != x_dim {
                return Err(GameSolveError::config(format!(
                    "player {i} gain shape does not match ({u_dim} x {x_dim})"
                )));
            }
            if strategy.alpha[0].len() != u_dim {
                return Err(GameSolveError::config(format!(
                    "player {i} offset length does not match {u_dim}"
                )));
            }
        }
        Ok(())
    }

    /// Linearize dynamics at every `(x_hat(k), u_hat(k))`. Per spec section
    /// 5, the per-time-step loop reads immutable inputs and writes disjoint
    /// slots, so it is safe to parallelize; the backward Riccati recursion
    /// (in `lq_solver`) is not. Skipped when `config.time_invariant_dynamics`
    /// is set, which linearizes once per iteration instead (see `Solver::solve`).
    fn linearize_all(&self, point: &OperatingPoint, linearization: &mut [LinearDynamicsApproximation]) {
        let dt = self.config.time_step;

        linearization.par_iter_mut().enumerate().for_each(|(k, lin_k)| {
            let t = point.t0 + k as f64 * dt;
            *lin_k = self.dynamics.linearize(t, dt, &point.xs[k], &point.us[k]);
        });
    }

    /// Quadraticize every player's cost at every `(x_hat(k), u_hat(k))`,
    /// folding in risk-sensitive exponentiation when configured. Always
    /// runs, regardless of `config.time_invariant_dynamics`: only the
    /// dynamics linearization is time-invariant, not the cost.
    fn quadraticize_all(
        &self,
        point: &OperatingPoint,
        quadraticization: &mut [Vec<QuadraticCostApproximation>],
    ) {
        let dt = self.config.time_step;
        let shared_a = self.config.exponential_constant;
        let costs = &self.costs;

        quadraticization.par_iter_mut().enumerate().for_each(|(k, quad_k)| {
            let t = point.t0 + k as f64 * dt;
            for i in 0..costs.len() {
                quad_k[i] =
                    quadraticize_exponentiated(costs[i].as_ref(), t, &point.xs[k], &point.us[k], i, shared_a);
            }
        });
    }

    /// Each player's total trajectory cost at `point`, applying the
    /// risk-sensitive reshaping of spec section 4.6 when configured.
    fn trajectory_costs(&self, point: &OperatingPoint) -> Vec<f64> {
        let dt = self.config.time_step;
        let a = self.config.exponential_constant;
        self.costs
            .iter()
            .map(|cost| {
                let per_step: Vec<f64> = (0..point.horizon())
                    .map(|k| {
                        let t = point.t0 + k as f64 * dt;
                        cost.evaluate(t, &point.xs[k], &point.us[k])
                    })
                    .collect();
                if a > 0.0 {
                    crate::cost::exponentiated_trajectory_cost(a, &per_step)
                } else {
                    per_step.iter().sum()
                }
            })
            .collect()
    }
}
