//! Safeguarded Newton-Marquardt maximization of a recorded objective.

use faer::Col;
use umbra::Trace;

use crate::brent::brent_optimize;
use crate::config::{SolverConfig, SolverState};
use crate::error::SolverError;
use crate::linalg::{damp_triplets, dense_from_triplets, lu_solve, working_triplets};

/// Maximizes the scalar objective at the end of a trace's tape.
///
/// The solver has exclusive mutable access to its trace for the duration of
/// [`maximize`](Solver::maximize); afterwards the trace holds values,
/// adjoints, and Hessian at the stationary point.
pub struct Solver<'s, 't> {
    pub trace: &'s mut Trace<'t>,
    pub config: SolverConfig,
    /// Per-iteration history, populated in diagnostic mode.
    pub states: Vec<SolverState>,
    /// Forward tape evaluations performed so far.
    pub n_eval_forward: usize,
    /// Reverse tape evaluations performed so far.
    pub n_eval_reverse: usize,
    fixed_parameter_indices: Vec<usize>,
    /// Parameters at the start of the current iteration.
    param_buffer: Vec<f64>,
    /// Newton direction of the current iteration.
    direction_buffer: Vec<f64>,
}

impl<'s, 't> Solver<'s, 't> {
    pub fn new(trace: &'s mut Trace<'t>, config: SolverConfig) -> Self {
        let n = trace.tape.input_len();
        Solver {
            trace,
            config,
            states: Vec::new(),
            n_eval_forward: 0,
            n_eval_reverse: 0,
            fixed_parameter_indices: Vec::new(),
            param_buffer: vec![0.0; n],
            direction_buffer: vec![0.0; n],
        }
    }

    /// Freeze the given input slots during maximization. Used by profile
    /// likelihood; their adjoints are zeroed and their Hessian rows and
    /// columns neutralized, so the Newton direction leaves them unchanged.
    pub fn set_fixed_parameter_indices(&mut self, indices: Vec<usize>) -> &mut Self {
        assert!(
            indices.len() < self.trace.tape.input_len(),
            "cannot fix every input"
        );
        self.fixed_parameter_indices = indices;
        self
    }

    pub fn fixed_parameter_indices(&self) -> &[usize] {
        &self.fixed_parameter_indices
    }

    /// Run Newton iterations until the objective improves by less than the
    /// configured tolerance or the iteration cap is reached.
    pub fn maximize(&mut self) -> Result<(), SolverError> {
        let n = self.trace.tape.input_len();

        let mut objective_old = f64::NEG_INFINITY;
        self.trace.play();
        self.n_eval_forward += 1;
        self.n_eval_reverse += 1;
        let mut objective_new = self.trace.result();

        let mut iter = 0;
        while objective_new - objective_old > self.config.objective_tolerance
            && iter < self.config.max_iterations
        {
            iter += 1;
            self.param_buffer
                .copy_from_slice(&self.trace.values[..n]);

            // Fixed parameters get no gradient; their second derivatives
            // are neutralized inside working_triplets.
            for &i in &self.fixed_parameter_indices {
                self.trace.adjoints[i] = 0.0;
            }

            let base = working_triplets(&self.trace.hessian, n, &self.fixed_parameter_indices);
            let neg_grad = Col::<f64>::from_fn(n, |i| -self.trace.adjoints[i]);

            // Newton direction H d = -g, regularized toward the identity
            // until a factorization succeeds. lambda = 1 degenerates to a
            // pure gradient step, which guarantees progress even with an
            // indefinite Hessian.
            let mut lambda = 0.0;
            let mut n_regul = 0usize;
            let mut direction = lu_solve(n, &base, &neg_grad);
            if direction.is_none() {
                n_regul = 1;
                let reg_step = 1.0 / self.config.max_regularization_attempts as f64;
                while n_regul <= self.config.max_regularization_attempts {
                    lambda = (n_regul as f64 * reg_step)
                        .powf(self.config.regularization_damping_factor);
                    let damped = damp_triplets(&base, lambda);
                    direction = lu_solve(n, &damped, &neg_grad);
                    if direction.is_some() {
                        break;
                    }
                    n_regul += 1;
                }
            }
            let direction =
                direction.ok_or(SolverError::FactorizationFailed { attempts: n_regul })?;
            self.direction_buffer.copy_from_slice(&direction);

            // Bracketed line search on phi(t) = objective(x + t d).
            let mut brent_left = self.config.brent_boundary_left;
            let mut brent_right = self.config.brent_boundary_right;
            let mut brent_evals = 0usize;
            let brent_tol;
            let brent_out;
            {
                let trace = &mut *self.trace;
                let params = &self.param_buffer;
                let dir = &self.direction_buffer;
                let evals = &mut brent_evals;
                let mut phi = |t: f64| -> Result<f64, SolverError> {
                    *evals += 1;
                    for i in 0..n {
                        trace.values[i] = params[i] + t * dir[i];
                    }
                    trace.play_forward();
                    let objective = trace.result();
                    if objective.is_finite() {
                        Ok(objective)
                    } else if objective == f64::INFINITY {
                        Err(SolverError::InfiniteObjective)
                    } else {
                        Ok(f64::NEG_INFINITY)
                    }
                };

                // Restrict the interval to the feasible region.
                let restriction = self.config.brent_feasible_search_restriction_factor;
                while !phi(brent_left)?.is_finite() {
                    brent_left *= restriction;
                }
                while !phi(brent_right)?.is_finite() {
                    brent_right *= restriction;
                }

                // The line-search tolerance must not exceed the squared
                // interval width, or the accepted objective could decrease
                // by more than the outer tolerance admits.
                let width = brent_right - brent_left;
                brent_tol = (self.config.objective_tolerance * self.config.brent_tolerance_factor)
                    .min(width * width);

                brent_out = brent_optimize(&mut phi, brent_left, brent_right, true, brent_tol)?;
                // The final functor call inside brent_optimize committed the
                // selected step to the trace values.
            }
            self.n_eval_forward += brent_evals;

            if brent_out.objective < objective_new - brent_tol {
                return Err(SolverError::BacktrackingFailure {
                    start: objective_new,
                    found: brent_out.objective,
                });
            }

            objective_old = objective_new;
            objective_new = brent_out.objective;
            self.trace.play_reverse();
            self.n_eval_reverse += 1;

            if self.config.diagnostic_mode {
                let working = if n_regul > 0 {
                    damp_triplets(&base, lambda)
                } else {
                    base.clone()
                };
                self.states.push(SolverState {
                    iter,
                    objective_initial: objective_old,
                    objective_final: objective_new,
                    lambda,
                    parameters: self.param_buffer.clone(),
                    gradient: self.trace.adjoints[..n].to_vec(),
                    hessian: dense_from_triplets(n, &working),
                    direction: self.direction_buffer.clone(),
                    brent_left,
                    brent_right,
                    optstep: brent_out.x,
                    n_eval: brent_evals,
                    n_regul,
                });
            }
        }
        Ok(())
    }
}
