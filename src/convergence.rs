//! Convergence monitor (spec section 4.8): elementwise trajectory stability
//! test plus an iteration cap.

use crate::types::OperatingPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceStatus {
    NotConverged,
    /// Trajectory stabilized within tolerance.
    Converged,
    /// Iteration cap reached without stabilizing; spec section 4.8 reports
    /// this as a successful solve, not a failure.
    Timeout,
}

pub struct ConvergenceMonitor {
    pub eps_x: f64,
    pub eps_u: f64,
    pub max_iterations: usize,
}

impl Default for ConvergenceMonitor {
    fn default() -> Self {
        Self {
            eps_x: 0.1,
            eps_u: 0.1,
            max_iterations: 50,
        }
    }
}

impl ConvergenceMonitor {
    pub fn new(eps_x: f64, eps_u: f64, max_iterations: usize) -> Self {
        Self {
            eps_x,
            eps_u,
            max_iterations,
        }
    }

    /// `iteration` is 1-indexed: the count of completed outer iterations.
    pub fn check(
        &self,
        iteration: usize,
        current: &OperatingPoint,
        last: &OperatingPoint,
    ) -> ConvergenceStatus {
        if iteration >= self.max_iterations {
            return ConvergenceStatus::Timeout;
        }

        let x_shift = current
            .xs
            .iter()
            .zip(last.xs.iter())
            .map(|(a, b)| (a - b).amax())
            .fold(0.0_f64, f64::max);
        if x_shift > self.eps_x {
            return ConvergenceStatus::NotConverged;
        }

        let num_players = current.num_players();
        for i in 0..num_players {
            let u_shift = current
                .us
                .iter()
                .zip(last.us.iter())
                .map(|(a, b)| (&a[i] - &b[i]).amax())
                .fold(0.0_f64, f64::max);
            if u_shift > self.eps_u {
                return ConvergenceStatus::NotConverged;
            }
        }

        ConvergenceStatus::Converged
    }
}
