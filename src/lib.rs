//! Iterative LQ approximation for finite-horizon, discrete-time, nonzero-sum
//! N-player dynamic games.
//!
//! Given a multi-player nonlinear dynamical system (a [`dynamics::Dynamics`]
//! implementation), a per-player cost functional (a [`cost::PlayerCost`]
//! implementation), and an initial joint state, [`solver::Solver::solve`]
//! produces a feedback [`types::Strategy`] for each player and a nominal
//! [`types::OperatingPoint`] that approximate a feedback Nash equilibrium of
//! the game.
//!
//! The algorithmic core is the coupled backward Riccati recursion in
//! [`lq_solver`]: at each outer iteration, the true dynamics and costs are
//! linearized/quadraticized about the current operating point, the
//! resulting time-varying LQ game is solved in closed form, the candidate
//! strategies are damped by a [`modifier::Modifier`], and [`rollout::rollout`]
//! regenerates the next operating point through the true nonlinear dynamics.
//!
//! Concrete dynamics and cost libraries, CLI drivers, and visualization are
//! out of scope here; this crate defines the trait contracts they implement
//! and the solver that consumes them.

pub mod config;
pub mod convergence;
pub mod cost;
pub mod dynamics;
pub mod error;
pub mod log;
pub mod lq_solver;
pub mod modifier;
pub mod rollout;
pub mod solver;
pub mod types;

pub use config::SolverConfig;
pub use convergence::{ConvergenceMonitor, ConvergenceStatus};
pub use cost::PlayerCost;
pub use dynamics::Dynamics;
pub use error::GameSolveError;
pub use log::Log;
pub use modifier::{FixedAlphaScaling, LineSearchModifier, Modifier, ModifierContext};
pub use solver::{SolveResult, Solver};
pub use types::{LinearDynamicsApproximation, OperatingPoint, QuadraticCostApproximation, Strategy};
