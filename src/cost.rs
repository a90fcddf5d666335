//! Player cost interface: evaluation, quadraticization, and the
//! exponential ("risk-sensitive") reshaping described in spec section 4.6.
//!
//! Concrete cost libraries (collision cost, route-progress cost, quadratic
//! goal cost, ...) are out of scope; this module is the contract plus the
//! exponentiation wrapper, which is common machinery every risk-sensitive
//! cost needs and so belongs here rather than in each cost implementation.

use nalgebra::DVector;

use crate::types::QuadraticCostApproximation;

/// A single player's running cost over the joint state and every player's
/// control.
///
/// `quadraticize` must return Hessians for the state block and for
/// `R_{ii}` (this player w.r.t. its own control) that are symmetric
/// positive-definite; implementations regularize by eigenvalue flooring
/// when a raw term is not PD (e.g. a concave signed-distance term). Cross
/// blocks `R_{ij}`, `i != j`, need not be definite.
pub trait PlayerCost: Send + Sync {
    /// Sum of all component terms' cost at `(x, u)`.
    fn evaluate(&self, t: f64, x: &DVector<f64>, u: &[DVector<f64>]) -> f64;

    /// Quadratic approximation of this player's cost about `(x, u)`.
    ///
    /// `player` is this cost's own index; `u` is indexed by player so cross
    /// Hessians `R_{ij}` for `j != player` can be populated.
    fn quadraticize(
        &self,
        t: f64,
        x: &DVector<f64>,
        u: &[DVector<f64>],
        player: usize,
    ) -> QuadraticCostApproximation;

    /// Shared exponential constant `a`. `0.0` (the default) disables risk
    /// sensitivity. All players must agree on `a` when any are exponentiated
    /// (spec section 4.6); the outer solver enforces this at construction.
    fn exponential_constant(&self) -> f64 {
        0.0
    }

    fn is_exponentiated(&self) -> bool {
        self.exponential_constant() > 0.0
    }
}

/// Sum `exp(a*c)` over a trajectory's per-step costs and report
/// `log(total)/a`, the risk-sensitive trajectory cost (spec section 4.6).
/// Requires `total > 0`, which holds whenever `a > 0` since `exp(.) > 0`.
pub fn exponentiated_trajectory_cost(a: f64, per_step_costs: &[f64]) -> f64 {
    assert!(a > 0.0, "exponentiated_trajectory_cost requires a > 0");
    let total: f64 = per_step_costs.iter().map(|&c| (a * c).exp()).sum();
    total.ln() / a
}

/// Fold the exponential reshaping into a single point's quadratic
/// approximation: given the *risk-neutral* cost `c_tilde`, gradient `g`,
/// and Hessian `h` at a point, `exp(a*c)` has gradient `a*exp(a*c_tilde)*g`
/// and Hessian `exp(a*c_tilde)*(a*h + a^2*g*g^T)` there (spec section 4.6).
pub fn exponentiate_quadratic(
    a: f64,
    c_tilde: f64,
    gradient: &DVector<f64>,
    hessian: &nalgebra::DMatrix<f64>,
) -> (DVector<f64>, nalgebra::DMatrix<f64>) {
    let factor = (a * c_tilde).exp();
    let new_gradient = gradient * (a * factor);
    let outer = gradient * gradient.transpose();
    let new_hessian = (hessian * a + outer * (a * a)) * factor;
    (new_gradient, new_hessian)
}

/// Quadraticize `cost` at `(x, u)`, folding in the exponential reshaping
/// (spec section 4.6) when `shared_a > 0`. Each block of the quadratic
/// approximation — the state block and each per-controller block — is
/// exponentiated independently using the same per-point factor
/// `exp(shared_a * evaluate(t, x, u))`; the data model carries no
/// state-control cross Hessian, so this is the finest-grained fold the
/// representation supports (see DESIGN.md).
pub fn quadraticize_exponentiated(
    cost: &dyn PlayerCost,
    t: f64,
    x: &DVector<f64>,
    u: &[DVector<f64>],
    player: usize,
    shared_a: f64,
) -> QuadraticCostApproximation {
    let base = cost.quadraticize(t, x, u, player);
    if shared_a <= 0.0 {
        return base;
    }

    let c_tilde = cost.evaluate(t, x, u);
    let (l, q) = exponentiate_quadratic(shared_a, c_tilde, &base.l, &base.q);

    let mut r = Vec::with_capacity(base.r.len());
    let mut r_grad = Vec::with_capacity(base.r_grad.len());
    for (rj, rgj) in base.r.iter().zip(base.r_grad.iter()) {
        let (g, h) = exponentiate_quadratic(shared_a, c_tilde, rgj, rj);
        r.push(h);
        r_grad.push(g);
    }

    QuadraticCostApproximation { q, l, r, r_grad }
}
