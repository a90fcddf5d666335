//! Core data model: strategies, operating points, and the per-time-step
//! linear/quadratic approximations the solver builds and consumes.

use nalgebra::{DMatrix, DVector};

/// Affine time-varying feedback for a single player:
/// `u_i(k, x) = u_hat_i(k) - P_i(k)*(x - x_hat(k)) - alpha_i(k)`.
///
/// `p[k]` has shape `u_dim x x_dim`, `alpha[k]` has shape `u_dim`.
#[derive(Debug, Clone)]
pub struct Strategy {
    pub p: Vec<DMatrix<f64>>,
    pub alpha: Vec<DVector<f64>>,
}

impl Strategy {
    /// A zero-content strategy for `player`'s control dimension over `horizon` steps.
    pub fn zeros(horizon: usize, u_dim: usize, x_dim: usize) -> Self {
        Self {
            p: vec![DMatrix::zeros(u_dim, x_dim); horizon],
            alpha: vec![DVector::zeros(u_dim); horizon],
        }
    }

    pub fn horizon(&self) -> usize {
        self.p.len()
    }
}

/// Nominal state/control trajectory about which dynamics are linearized and
/// costs quadraticized.
#[derive(Debug, Clone)]
pub struct OperatingPoint {
    /// Joint state at each time step, length `T`.
    pub xs: Vec<DVector<f64>>,
    /// Per-player control at each time step: `us[k][i]`, length `T`.
    pub us: Vec<Vec<DVector<f64>>>,
    /// Initial time of the horizon.
    pub t0: f64,
}

impl OperatingPoint {
    pub fn zeros(horizon: usize, x_dim: usize, u_dims: &[usize], t0: f64) -> Self {
        Self {
            xs: vec![DVector::zeros(x_dim); horizon],
            us: vec![u_dims.iter().map(|&d| DVector::zeros(d)).collect(); horizon],
            t0,
        }
    }

    pub fn horizon(&self) -> usize {
        self.xs.len()
    }

    pub fn num_players(&self) -> usize {
        self.us.first().map(|u| u.len()).unwrap_or(0)
    }
}

/// Discrete-time linearization of the joint dynamics about an operating
/// point at a single time step: `A = d(Integrate)/dx`, `B_i = d(Integrate)/du_i`.
#[derive(Debug, Clone)]
pub struct LinearDynamicsApproximation {
    pub a: DMatrix<f64>,
    pub bs: Vec<DMatrix<f64>>,
}

impl LinearDynamicsApproximation {
    pub fn zeros(x_dim: usize, u_dims: &[usize]) -> Self {
        Self {
            a: DMatrix::zeros(x_dim, x_dim),
            bs: u_dims.iter().map(|&d| DMatrix::zeros(x_dim, d)).collect(),
        }
    }
}

/// Quadratic approximation of a single player's cost at a single time step:
/// state Hessian/gradient `q`/`l`, and per-controller Hessian/gradient blocks
/// `r[j]`/`r_grad[j]` for every player `j` (including cross terms `j != i`).
#[derive(Debug, Clone)]
pub struct QuadraticCostApproximation {
    pub q: DMatrix<f64>,
    pub l: DVector<f64>,
    pub r: Vec<DMatrix<f64>>,
    pub r_grad: Vec<DVector<f64>>,
}

impl QuadraticCostApproximation {
    pub fn zeros(x_dim: usize, u_dims: &[usize]) -> Self {
        Self {
            q: DMatrix::zeros(x_dim, x_dim),
            l: DVector::zeros(x_dim),
            r: u_dims.iter().map(|&d| DMatrix::zeros(d, d)).collect(),
            r_grad: u_dims.iter().map(|&d| DVector::zeros(d)).collect(),
        }
    }
}
