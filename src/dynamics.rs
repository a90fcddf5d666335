//! Dynamics interface: discrete-time integration plus its linearization.
//!
//! Concrete dynamics (unicycle, bicycle, ...) are out of scope for this
//! crate; this module only defines the trait contract that such libraries
//! implement, plus a finite-difference default for `linearize` that mirrors
//! the teacher's central-difference Jacobian.

use nalgebra::{DMatrix, DVector};

use crate::types::LinearDynamicsApproximation;

/// Step size used for the central-difference Jacobian fallback.
const FINITE_DIFF_EPSILON: f64 = 1e-5;

/// A nonlinear, discrete-time, multi-player dynamical system.
///
/// `Integrate` is deterministic; in general it is a one-step integrator
/// (e.g. RK4) of an underlying continuous ODE `xdot = f(t, x, u)`.
/// `linearize` must return Jacobians of `integrate` consistent to first
/// order with the map `integrate` actually computes in rollout — otherwise
/// the LQ model used by the solver is inconsistent with the true system and
/// convergence is not expected.
pub trait Dynamics: Send + Sync {
    /// Dimension of the joint state space.
    fn x_dim(&self) -> usize;

    /// Dimension of player `i`'s control space.
    fn u_dim(&self, i: usize) -> usize;

    /// Number of players.
    fn num_players(&self) -> usize;

    /// Advance the joint state one discrete step under the players' controls.
    fn integrate(
        &self,
        t: f64,
        dt: f64,
        x: &DVector<f64>,
        u: &[DVector<f64>],
    ) -> DVector<f64>;

    /// Discrete-time Jacobians of `integrate` about `(x, u)`.
    ///
    /// The default implementation uses a central finite difference, exact
    /// to `O(FINITE_DIFF_EPSILON^2)`; implementations with closed-form
    /// derivatives (or an RK4 first-order surrogate `A ~= I + dt*df/dx`,
    /// `B_i ~= dt*df/du_i`) should override this for speed and accuracy.
    fn linearize(
        &self,
        t: f64,
        dt: f64,
        x: &DVector<f64>,
        u: &[DVector<f64>],
    ) -> LinearDynamicsApproximation {
        let x_dim = self.x_dim();
        let u_dims: Vec<usize> = (0..self.num_players()).map(|i| self.u_dim(i)).collect();

        let mut a = DMatrix::zeros(x_dim, x_dim);
        for i in 0..x_dim {
            let mut x_plus = x.clone();
            x_plus[i] += FINITE_DIFF_EPSILON;
            let mut x_minus = x.clone();
            x_minus[i] -= FINITE_DIFF_EPSILON;

            let f_plus = self.integrate(t, dt, &x_plus, u);
            let f_minus = self.integrate(t, dt, &x_minus, u);
            let column = (f_plus - f_minus) / (2.0 * FINITE_DIFF_EPSILON);
            a.set_column(i, &column);
        }

        let mut bs = Vec::with_capacity(u_dims.len());
        for (i, &u_dim) in u_dims.iter().enumerate() {
            let mut b = DMatrix::zeros(x_dim, u_dim);
            for j in 0..u_dim {
                let mut u_plus: Vec<DVector<f64>> = u.to_vec();
                u_plus[i][j] += FINITE_DIFF_EPSILON;
                let mut u_minus: Vec<DVector<f64>> = u.to_vec();
                u_minus[i][j] -= FINITE_DIFF_EPSILON;

                let f_plus = self.integrate(t, dt, x, &u_plus);
                let f_minus = self.integrate(t, dt, x, &u_minus);
                let column = (f_plus - f_minus) / (2.0 * FINITE_DIFF_EPSILON);
                b.set_column(j, &column);
            }
            bs.push(b);
        }

        LinearDynamicsApproximation { a, bs }
    }
}
