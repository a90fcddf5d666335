//! Strategy modifier (step-size control), spec section 4.7.
//!
//! After the LQ solve produces candidate `(P, alpha)`, the modifier decides
//! what is actually rolled out next. The trait is pluggable; both
//! implementations here never change `P`, are idempotent at `gamma = 1`, and
//! preserve the lengths and dimensions of the input strategies.

use nalgebra::DVector;

use crate::error::GameSolveError;
use crate::types::{OperatingPoint, Strategy};

/// Shared context a modifier needs beyond the candidate strategies: how to
/// produce a trial rollout and its per-player trajectory cost, for modifiers
/// that need to evaluate progress before committing to a step size.
pub struct ModifierContext<'a> {
    /// Runs a trial rollout under the given strategies and reports each
    /// player's total trajectory cost.
    pub trial: &'a dyn Fn(&[Strategy]) -> (OperatingPoint, Vec<f64>),
    /// Per-player trajectory cost of the last accepted iterate, for
    /// progress comparisons.
    pub last_cost: &'a [f64],
}

/// Scales every `alpha_i(k)` by `gamma`, gains untouched.
fn scale_alpha(candidate: &[Strategy], gamma: f64, clip: Option<f64>) -> Vec<Strategy> {
    candidate
        .iter()
        .map(|s| Strategy {
            p: s.p.clone(),
            alpha: s
                .alpha
                .iter()
                .map(|a| {
                    let scaled = a * gamma;
                    match clip {
                        Some(bound) => clip_inf_norm(scaled, bound),
                        None => scaled,
                    }
                })
                .collect(),
        })
        .collect()
}

/// Hard-clip `v`'s infinity norm to `bound`, preserving direction.
fn clip_inf_norm(v: DVector<f64>, bound: f64) -> DVector<f64> {
    let inf_norm = v.amax();
    if inf_norm > bound && inf_norm > 0.0 {
        v * (bound / inf_norm)
    } else {
        v
    }
}

pub trait Modifier: Send + Sync {
    /// Produce the `(P, alpha)` to actually roll out next from the LQ
    /// solve's candidate strategies.
    fn modify(
        &self,
        candidate: &[Strategy],
        context: &ModifierContext,
    ) -> Result<Vec<Strategy>, GameSolveError>;
}

/// Multiply every `alpha_i(k)` by a fixed `gamma in (0, 1]`; optionally clip
/// `||alpha||_inf` to a trust-region size.
pub struct FixedAlphaScaling {
    pub gamma: f64,
    pub trust_region_size: Option<f64>,
}

impl FixedAlphaScaling {
    pub fn new(gamma: f64) -> Self {
        Self {
            gamma,
            trust_region_size: None,
        }
    }

    pub fn with_trust_region(mut self, size: f64) -> Self {
        self.trust_region_size = Some(size);
        self
    }
}

impl Modifier for FixedAlphaScaling {
    fn modify(
        &self,
        candidate: &[Strategy],
        _context: &ModifierContext,
    ) -> Result<Vec<Strategy>, GameSolveError> {
        Ok(scale_alpha(candidate, self.gamma, self.trust_region_size))
    }
}

/// Backtracking line search over a descending `gamma` schedule: accept the
/// first `gamma` whose trial rollout does not increase the summed merit
/// (total trajectory cost across players) relative to the last iterate;
/// otherwise halve `gamma` and retry, failing below `floor`.
pub struct LineSearchModifier {
    pub initial_gamma: f64,
    pub floor: f64,
    pub trust_region_size: Option<f64>,
}

impl LineSearchModifier {
    pub fn new(initial_gamma: f64, floor: f64) -> Self {
        Self {
            initial_gamma,
            floor,
            trust_region_size: None,
        }
    }

    pub fn with_trust_region(mut self, size: f64) -> Self {
        self.trust_region_size = Some(size);
        self
    }
}

impl Modifier for LineSearchModifier {
    fn modify(
        &self,
        candidate: &[Strategy],
        context: &ModifierContext,
    ) -> Result<Vec<Strategy>, GameSolveError> {
        let last_merit: f64 = context.last_cost.iter().sum();
        let mut gamma = self.initial_gamma;

        while gamma >= self.floor {
            let trial_strategies = scale_alpha(candidate, gamma, self.trust_region_size);
            let (_trial_point, trial_costs) = (context.trial)(&trial_strategies);
            let trial_merit: f64 = trial_costs.iter().sum();

            if trial_merit <= last_merit {
                tracing::debug!(gamma, trial_merit, last_merit, "line search accepted step");
                return Ok(trial_strategies);
            }
            tracing::debug!(gamma, trial_merit, last_merit, "line search rejected step");
            gamma *= 0.5;
        }

        Err(GameSolveError::modifier(format!(
            "no gamma above floor {} improved merit {last_merit}",
            self.floor
        )))
    }
}
