//! Error taxonomy for the solver (spec section 7).
//!
//! `ConvergenceTimeout` is deliberately not a variant here: reaching the
//! iteration cap without meeting the convergence test is reported as a
//! *successful* `Solve` with a timeout flag, not a failure.

use thiserror::Error;

/// Errors that can surface from [`crate::solver::Solver::solve`].
#[derive(Debug, Error)]
pub enum GameSolveError {
    /// Dimension mismatch between strategies, operating point, dynamics, or
    /// costs, detected before iteration begins.
    #[error("config error: {text}")]
    ConfigError { text: String },

    /// `S(k)` in the coupled Riccati recursion is singular or ill-conditioned
    /// even after per-block and diagonal regularization.
    #[error("linear algebra failure at time step {step}: {text}")]
    LinAlgFailure { step: usize, text: String },

    /// The strategy modifier could not find a step size above its floor.
    #[error("modifier failure: {text}")]
    ModifierFailure { text: String },
}

impl GameSolveError {
    pub fn config<S: Into<String>>(text: S) -> Self {
        Self::ConfigError { text: text.into() }
    }

    pub fn lin_alg<S: Into<String>>(step: usize, text: S) -> Self {
        Self::LinAlgFailure {
            step,
            text: text.into(),
        }
    }

    pub fn modifier<S: Into<String>>(text: S) -> Self {
        Self::ModifierFailure { text: text.into() }
    }
}
