//! Rollout: apply the current affine feedback strategies through the true
//! nonlinear dynamics to produce the next operating point (spec section 4.5).
//!
//! Rollout always uses the true dynamics, even though the LQ step that
//! produced the strategies used a linearized surrogate.

use nalgebra::DVector;

use crate::dynamics::Dynamics;
use crate::types::{OperatingPoint, Strategy};

/// Roll `strategies` forward from `x0`, using `last` as the operating point
/// the feedback gains are relative to, writing the result into `out`.
///
/// `out` must already have the same horizon and dimensions as `last`; its
/// buffers are overwritten in place (spec section 5: no per-iteration
/// allocation in the hot path).
///
/// When `open_loop` is set (spec section 6 `open_loop` option), `x_delta` is
/// forced to zero at every step, so the controls are exactly `last`'s
/// minus `alpha`, independent of how the true trajectory tracks `last`.
pub fn rollout<D: Dynamics + ?Sized>(
    dynamics: &D,
    last: &OperatingPoint,
    strategies: &[Strategy],
    x0: &DVector<f64>,
    dt: f64,
    open_loop: bool,
    out: &mut OperatingPoint,
) {
    let horizon = last.horizon();
    let mut x = x0.clone();

    for k in 0..horizon {
        let x_delta = if open_loop {
            DVector::zeros(x.len())
        } else {
            &x - &last.xs[k]
        };

        let mut us_k = Vec::with_capacity(strategies.len());
        for (i, strategy) in strategies.iter().enumerate() {
            let u = &last.us[k][i] - &strategy.p[k] * &x_delta - &strategy.alpha[k];
            us_k.push(u);
        }

        out.xs[k] = x.clone();
        out.us[k] = us_k.clone();

        if k + 1 < horizon {
            let t = last.t0 + k as f64 * dt;
            x = dynamics.integrate(t, dt, &x, &us_k);
        }
    }
    out.t0 = last.t0;
}
