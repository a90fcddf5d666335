//! Coupled Riccati recursion for N-player LQ games — the algorithmic core
//! (spec section 4.3).
//!
//! Given linearized dynamics and quadraticized per-player costs over a
//! horizon, produces affine feedback `(P_i(k), alpha_i(k))` such that the
//! controls `u_i(k) = -P_i(k)*x_delta(k) - alpha_i(k)` constitute a feedback
//! Nash equilibrium of the LQ game. The recursion runs backward in time and
//! is inherently sequential in `k` (spec section 5): each step's coupling
//! system depends on the downstream cost-to-go from step `k+1`.

use nalgebra::{DMatrix, DVector};

use crate::error::GameSolveError;
use crate::types::{LinearDynamicsApproximation, QuadraticCostApproximation, Strategy};

/// Base diagonal regularizer tried when `S(k)` is singular despite
/// per-block PD Hessians; doubled... tenfold'd each retry up to a cap.
const BASE_REGULARIZATION: f64 = 1e-8;
const MAX_REGULARIZATION_TRIES: usize = 6;

/// Solve the N-player coupled Riccati recursion over the whole horizon.
///
/// `lin[k]` and `quad[k]` must be consistent: same horizon length, same
/// `x_dim`, and `quad[k]` has one entry per player in the same order as
/// `lin[k].bs`.
pub fn solve_lq_game(
    lin: &[LinearDynamicsApproximation],
    quad: &[Vec<QuadraticCostApproximation>],
) -> Result<Vec<Strategy>, GameSolveError> {
    let horizon = lin.len();
    if horizon == 0 {
        return Err(GameSolveError::config("solve_lq_game: empty horizon"));
    }
    if quad.len() != horizon {
        return Err(GameSolveError::config(
            "solve_lq_game: linearization/quadraticization horizon mismatch",
        ));
    }

    let num_players = lin[0].bs.len();
    let x_dim = lin[0].a.nrows();
    let u_dims: Vec<usize> = lin[0].bs.iter().map(|b| b.ncols()).collect();

    for k in 0..horizon {
        if lin[k].bs.len() != num_players || quad[k].len() != num_players {
            return Err(GameSolveError::config(format!(
                "solve_lq_game: player count mismatch at step {k}"
            )));
        }
    }

    let mut strategies: Vec<Strategy> = (0..num_players)
        .map(|i| Strategy::zeros(horizon, u_dims[i], x_dim))
        .collect();

    // Terminal cost-to-go: Z_i(T) = 0, zeta_i(T) = 0 (spec section 4.3 step 4).
    // Terminal cost is folded into stage T-1's quadraticization rather than
    // living at a separate stage T with zero dynamics (see DESIGN.md).
    let mut z: Vec<DMatrix<f64>> = vec![DMatrix::zeros(x_dim, x_dim); num_players];
    let mut zeta: Vec<DVector<f64>> = vec![DVector::zeros(x_dim); num_players];

    let mut offsets = vec![0usize; num_players + 1];
    for i in 0..num_players {
        offsets[i + 1] = offsets[i] + u_dims[i];
    }
    let sum_u: usize = offsets[num_players];

    for k in (0..horizon).rev() {
        let a = &lin[k].a;
        let bs = &lin[k].bs;
        let q_k = &quad[k];

        let mut s = DMatrix::<f64>::zeros(sum_u, sum_u);
        let mut rhs = DMatrix::<f64>::zeros(sum_u, x_dim + 1);

        for i in 0..num_players {
            let bi = &bs[i];
            let zi = &z[i];
            let cost_i = &q_k[i];

            for j in 0..num_players {
                let bj = &bs[j];
                let mut block = bi.transpose() * zi * bj;
                if i == j {
                    block += &cost_i.r[j];
                }
                s.view_mut((offsets[i], offsets[j]), (u_dims[i], u_dims[j]))
                    .copy_from(&block);
            }

            let y_p_i = bi.transpose() * zi * a;
            rhs.view_mut((offsets[i], 0), (u_dims[i], x_dim))
                .copy_from(&y_p_i);

            let y_alpha_i = bi.transpose() * &zeta[i] + &cost_i.r_grad[i];
            rhs.view_mut((offsets[i], x_dim), (u_dims[i], 1))
                .copy_from(&y_alpha_i);
        }

        let solution = solve_regularized(&s, &rhs, k)?;

        let mut p_blocks = Vec::with_capacity(num_players);
        let mut alpha_blocks = Vec::with_capacity(num_players);
        for i in 0..num_players {
            let p_i = solution
                .view((offsets[i], 0), (u_dims[i], x_dim))
                .clone_owned();
            let alpha_i = solution
                .view((offsets[i], x_dim), (u_dims[i], 1))
                .column(0)
                .clone_owned();
            strategies[i].p[k] = p_i.clone();
            strategies[i].alpha[k] = alpha_i.clone();
            p_blocks.push(p_i);
            alpha_blocks.push(alpha_i);
        }

        // F(k) = A(k) - sum_i B_i(k) P_i(k); beta(k) = -sum_i B_i(k) alpha_i(k).
        let mut f = a.clone();
        let mut beta = DVector::zeros(x_dim);
        for i in 0..num_players {
            f -= &bs[i] * &p_blocks[i];
            beta -= &bs[i] * &alpha_blocks[i];
        }

        let mut new_z = Vec::with_capacity(num_players);
        let mut new_zeta = Vec::with_capacity(num_players);
        for i in 0..num_players {
            let cost_i = &q_k[i];
            let mut zi_new = cost_i.q.clone() + f.transpose() * &z[i] * &f;
            let mut zetai_new = &cost_i.l + f.transpose() * (&zeta[i] + &z[i] * &beta);
            for j in 0..num_players {
                let pj = &p_blocks[j];
                zi_new += pj.transpose() * &cost_i.r[j] * pj;
                zetai_new += pj.transpose() * (&cost_i.r[j] * &alpha_blocks[j] - &cost_i.r_grad[j]);
            }
            new_z.push(zi_new);
            new_zeta.push(zetai_new);
        }
        z = new_z;
        zeta = new_zeta;
    }

    Ok(strategies)
}

/// Flat variant for feedback-linearizable systems with time-invariant
/// `(A, B_i)` (spec section 4.3): reuses the same backward recursion rather
/// than re-deriving it, tiling the constant linearization across the
/// horizon so time-varying costs are still handled correctly.
pub fn solve_lq_game_flat(
    lin: &LinearDynamicsApproximation,
    quad: &[Vec<QuadraticCostApproximation>],
) -> Result<Vec<Strategy>, GameSolveError> {
    let horizon = quad.len();
    let tiled: Vec<LinearDynamicsApproximation> = (0..horizon).map(|_| lin.clone()).collect();
    solve_lq_game(&tiled, quad)
}

/// Solve `S * X = rhs`, adding a growing diagonal regularizer to `S` if it
/// is singular or ill-conditioned (spec section 4.3 edge cases). A single
/// factorization serves both the `P` and `alpha` right-hand sides, stacked
/// as columns of `rhs`.
fn solve_regularized(
    s: &DMatrix<f64>,
    rhs: &DMatrix<f64>,
    step: usize,
) -> Result<DMatrix<f64>, GameSolveError> {
    let mut eps = 0.0;
    for attempt in 0..MAX_REGULARIZATION_TRIES {
        let s_reg = if eps > 0.0 {
            s + DMatrix::identity(s.nrows(), s.ncols()) * eps
        } else {
            s.clone()
        };
        if let Some(solution) = s_reg.lu().solve(rhs) {
            if attempt > 0 {
                tracing::warn!(step, eps, "regularized S(k) to avoid near-singularity");
            }
            return Ok(solution);
        }
        eps = if eps == 0.0 {
            BASE_REGULARIZATION
        } else {
            eps * 10.0
        };
    }
    Err(GameSolveError::lin_alg(
        step,
        "S(k) singular after regularization",
    ))
}
