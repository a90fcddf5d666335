//! Solver configuration (spec section 6).

/// Recognized solver options. Builder-style `with_*` setters follow the
/// pattern of the pack's `SolverOptions` structs (plain fields, consumed
/// directly by the solver rather than hidden behind getters).
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Horizon in seconds; `time_horizon` and `time_step` determine
    /// `T = ceil(time_horizon / time_step)`.
    pub time_horizon: f64,
    /// Integration step `dt`.
    pub time_step: f64,
    /// Outer-loop iteration cap.
    pub max_iterations: usize,
    /// `eps_x = eps_u` convergence tolerance (spec section 4.8).
    pub convergence_tolerance: f64,
    /// Initial `gamma` passed to the modifier.
    pub initial_alpha_scaling: f64,
    /// Max `||alpha||_inf` the modifier may enforce; `None` disables the cap.
    pub trust_region_size: Option<f64>,
    /// Shared risk-sensitive exponential constant `a`; `0.0` disables it.
    pub exponential_constant: f64,
    /// Uniform weight for quadratic control costs built by example drivers;
    /// unused by the solver itself, carried through for caller convenience.
    pub control_cost_weight: f64,
    /// When true, rollout and cost evaluation use `x_delta = 0` (open-loop)
    /// instead of feedback.
    pub open_loop: bool,
    /// When true, the dynamics are linearized once per outer iteration (at
    /// the first time step) and that linearization is tiled across the
    /// horizon via `lq_solver::solve_lq_game_flat`, instead of linearizing at
    /// every time step. Only correct for dynamics whose Jacobian does not
    /// depend on `(t, x, u)`.
    pub time_invariant_dynamics: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_horizon: 2.0,
            time_step: 0.1,
            max_iterations: 50,
            convergence_tolerance: 0.1,
            initial_alpha_scaling: 1.0,
            trust_region_size: None,
            exponential_constant: 0.0,
            control_cost_weight: 1.0,
            open_loop: false,
            time_invariant_dynamics: false,
        }
    }
}

impl SolverConfig {
    /// `T = ceil(time_horizon / time_step)`.
    pub fn horizon_steps(&self) -> usize {
        (self.time_horizon / self.time_step).ceil() as usize
    }

    pub fn with_time_horizon(mut self, time_horizon: f64) -> Self {
        self.time_horizon = time_horizon;
        self
    }

    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_convergence_tolerance(mut self, tol: f64) -> Self {
        self.convergence_tolerance = tol;
        self
    }

    pub fn with_initial_alpha_scaling(mut self, gamma: f64) -> Self {
        self.initial_alpha_scaling = gamma;
        self
    }

    pub fn with_trust_region_size(mut self, size: f64) -> Self {
        self.trust_region_size = Some(size);
        self
    }

    pub fn with_exponential_constant(mut self, a: f64) -> Self {
        self.exponential_constant = a;
        self
    }

    pub fn with_open_loop(mut self, open_loop: bool) -> Self {
        self.open_loop = open_loop;
        self
    }

    pub fn with_time_invariant_dynamics(mut self, time_invariant_dynamics: bool) -> Self {
        self.time_invariant_dynamics = time_invariant_dynamics;
        self
    }
}
