use std::fmt;

/// Configuration of the Newton-Brent maximizer.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Maximum number of outer Newton iterations.
    pub max_iterations: usize,
    /// Stopping criterion on the change between consecutive objectives.
    pub objective_tolerance: f64,
    /// Keep per-iteration state history (slow).
    pub diagnostic_mode: bool,
    /// Tikhonov attempts before giving up on the Newton direction.
    pub max_regularization_attempts: usize,
    /// Damping exponent: `lambda = (n / max)^factor`. Larger values start
    /// with smaller regularization, keeping early attempts closer to the
    /// pure Newton step.
    pub regularization_damping_factor: f64,
    /// Brent tolerance as a multiple of the objective tolerance.
    pub brent_tolerance_factor: f64,
    /// Left boundary of the Brent step interval. Negative values allow
    /// moves past the current point.
    pub brent_boundary_left: f64,
    /// Right boundary of the Brent step interval.
    pub brent_boundary_right: f64,
    /// Shrink factor applied to an interval boundary while the objective
    /// there is not finite.
    pub brent_feasible_search_restriction_factor: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            max_iterations: 1000,
            objective_tolerance: 1e-3,
            diagnostic_mode: false,
            max_regularization_attempts: 10,
            regularization_damping_factor: 2.0,
            brent_tolerance_factor: 1.0,
            brent_boundary_left: -1.0,
            brent_boundary_right: 2.0,
            brent_feasible_search_restriction_factor: 0.75,
        }
    }
}

/// Per-iteration diagnostics, recorded when
/// [`SolverConfig::diagnostic_mode`] is set.
#[derive(Debug, Clone)]
pub struct SolverState {
    pub iter: usize,
    pub objective_initial: f64,
    pub objective_final: f64,
    /// Selected regularization strength, 0 for a pure Newton step.
    pub lambda: f64,
    /// Parameters at the start of the iteration.
    pub parameters: Vec<f64>,
    /// Gradient after the step.
    pub gradient: Vec<f64>,
    /// Dense rendition of the working (possibly regularized) Hessian.
    pub hessian: Vec<f64>,
    /// Newton direction actually searched.
    pub direction: Vec<f64>,
    pub brent_left: f64,
    pub brent_right: f64,
    /// Selected step amplitude along the direction.
    pub optstep: f64,
    /// Objective evaluations spent in the line search.
    pub n_eval: usize,
    /// Regularization attempts before factorization succeeded.
    pub n_regul: usize,
}

impl fmt::Display for SolverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Step #{}:", self.iter)?;
        writeln!(f, "Parameter vector: {:?}", self.parameters)?;
        writeln!(f, "Gradient vector: {:?}", self.gradient)?;
        writeln!(
            f,
            "Regularization lambda = {} found after {} attempts",
            self.lambda, self.n_regul
        )?;
        writeln!(f, "Direction vector: {:?}", self.direction)?;
        writeln!(
            f,
            "Optimal step amplitude = {} found after {} objective evaluations",
            self.optstep, self.n_eval
        )?;
        writeln!(
            f,
            "Objective changed from {} to {}",
            self.objective_initial, self.objective_final
        )
    }
}
