//! Likelihood inference on a solved trace: asymptotic (Wald) intervals
//! from the inverse observed Fisher information, and profile-likelihood
//! intervals from re-optimization with one parameter frozen.

use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

use crate::brent::brent_optimize;
use crate::error::SolverError;
use crate::linalg::{inverse_column, negated_cholesky};
use crate::solver::Solver;

/// Likelihood-ratio cutpoint for a two-sided 95% interval:
/// `qchisq(0.95, df = 1) / 2`.
const LRT_CHISQ_CUTPOINT_95_HALF: f64 = 1.920_729_410_347_062;

/// A confidence interval for one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfInt {
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
    pub coverage: f64,
}

/// Diagnostics from one side of a profile-likelihood search.
#[derive(Debug, Clone, Copy)]
pub struct BracketInfo {
    /// Bracket endpoint at which the profile log-likelihood first dropped
    /// below the target.
    pub initial_bracket: f64,
    /// Profile log-likelihood at that endpoint.
    pub initial_bracket_log_likelihood: f64,
    /// Final squared difference between the profile log-likelihood and the
    /// target at the returned bound.
    pub residual_squared_diff: f64,
    /// Objective evaluations spent in the Brent root search.
    pub n_evaluations: usize,
}

/// Profile-likelihood interval for one parameter, with per-side
/// diagnostics.
#[derive(Debug, Clone)]
pub struct ProfileInterval {
    pub interval: ConfInt,
    pub lower: BracketInfo,
    pub upper: BracketInfo,
}

/// Inference methods over a solver whose trace sits at the maximum.
pub struct Likelihood<'l, 's, 't> {
    solver: &'l mut Solver<'s, 't>,
}

impl<'l, 's, 't> Likelihood<'l, 's, 't> {
    pub fn new(solver: &'l mut Solver<'s, 't>) -> Self {
        Likelihood { solver }
    }

    /// Asymptotic Wald standard deviations of the parameter estimates.
    ///
    /// The negated Hessian at the maximum is the observed Fisher
    /// information; a sparse Cholesky `-H = L L^T` gives the per-parameter
    /// variance as the diagonal of `(-H)^{-1} = L^{-T} L^{-1}`, read off by
    /// solving against identity columns. Fails with
    /// [`SolverError::BadHessian`] when the factorization does not succeed.
    pub fn asymptotic_standard_deviations(&self) -> Result<Vec<f64>, SolverError> {
        let n = self.solver.trace.tape.input_len();
        let llt =
            negated_cholesky(&self.solver.trace.hessian, n).ok_or(SolverError::BadHessian)?;
        let mut out = Vec::with_capacity(n);
        for j in 0..n {
            let column = inverse_column(&llt, n, j);
            let variance = column[j];
            if !variance.is_finite() || variance < 0.0 {
                return Err(SolverError::BadHessian);
            }
            out.push(variance.sqrt());
        }
        Ok(out)
    }

    /// Wald intervals `x_j +/- z_(1 - alpha/2) sd_j` for every parameter.
    pub fn confint_asymptotic(&self, coverage: f64) -> Result<Vec<ConfInt>, SolverError> {
        assert!(coverage > 0.0 && coverage < 1.0);
        let sds = self.asymptotic_standard_deviations()?;
        sds.iter()
            .enumerate()
            .map(|(i, &sd)| {
                let estimate = self.solver.trace.values[i];
                let normal = Normal::new(estimate, sd).map_err(|_| SolverError::BadHessian)?;
                Ok(ConfInt {
                    estimate,
                    lower: normal.inverse_cdf(0.5 * (1.0 - coverage)),
                    upper: normal.inverse_cdf(1.0 - 0.5 * (1.0 - coverage)),
                    coverage,
                })
            })
            .collect()
    }

    /// Profile-likelihood intervals for every parameter.
    ///
    /// For each input slot `p`, the parameter is frozen, moved away from its
    /// estimate, and the remaining parameters re-maximized; the interval
    /// bounds are the values where the profile log-likelihood drops to
    /// `L* - qchisq(coverage, 1) / 2`. The Wald half-width seeds the
    /// bracket, which doubles until it straddles the target. On return the
    /// trace is restored to the optimum and replayed.
    pub fn confint_profile(&mut self, coverage: f64) -> Result<Vec<ProfileInterval>, SolverError> {
        assert!(coverage > 0.0 && coverage < 1.0);
        let half_cutpoint = if coverage == 0.95 {
            LRT_CHISQ_CUTPOINT_95_HALF
        } else {
            0.5 * ChiSquared::new(1.0)
                .expect("chi-square with df = 1")
                .inverse_cdf(coverage)
        };

        let n = self.solver.trace.tape.input_len();
        let optimal_inputs = self.solver.trace.values[..n].to_vec();
        let maximum_likelihood = self.solver.trace.result();
        let target = maximum_likelihood - half_cutpoint;

        // Wald intervals seed the bracket half-widths.
        let asymptotic = self.confint_asymptotic(coverage)?;

        let mut results = Vec::with_capacity(n);
        for p in 0..n {
            self.solver.set_fixed_parameter_indices(vec![p]);
            let point = optimal_inputs[p];
            let halfwidth = 0.5 * (asymptotic[p].upper - asymptotic[p].lower);

            let (lower_bound, lower_info) =
                self.profile_side(p, point, target, halfwidth, true)?;
            let (upper_bound, upper_info) =
                self.profile_side(p, point, target, halfwidth, false)?;

            results.push(ProfileInterval {
                interval: ConfInt {
                    estimate: point,
                    lower: lower_bound,
                    upper: upper_bound,
                    coverage,
                },
                lower: lower_info,
                upper: upper_info,
            });
        }

        // Restore the optimum.
        self.solver.trace.values[..n].copy_from_slice(&optimal_inputs);
        self.solver.set_fixed_parameter_indices(Vec::new());
        self.solver.trace.play();
        Ok(results)
    }

    /// Profile log-likelihood with slot `p` held at `x`.
    fn profile_loglik(&mut self, p: usize, x: f64) -> Result<f64, SolverError> {
        self.solver.trace.values[p] = x;
        self.solver.maximize()?;
        Ok(self.solver.trace.result())
    }

    /// One side of the profile interval: bracket outward by doubling, then
    /// Brent-minimize the squared distance to the target likelihood.
    fn profile_side(
        &mut self,
        p: usize,
        point: f64,
        target: f64,
        halfwidth_guess: f64,
        lower: bool,
    ) -> Result<(f64, BracketInfo), SolverError> {
        self.solver.trace.values[p] = point;

        let mut width = halfwidth_guess;
        let bracket_ll = loop {
            let x = if lower { point - width } else { point + width };
            let ll = self.profile_loglik(p, x)?;
            if ll <= target {
                break ll;
            }
            width *= 2.0;
        };
        let bracket = if lower { point - width } else { point + width };
        let (left, right) = if lower {
            (point - width, point)
        } else {
            (point, point + width)
        };

        let solver = &mut *self.solver;
        let mut squared_gap = |x: f64| -> Result<f64, SolverError> {
            solver.trace.values[p] = x;
            solver.maximize()?;
            let diff = solver.trace.result() - target;
            Ok(diff * diff)
        };
        let out = brent_optimize(&mut squared_gap, left, right, false, f64::EPSILON.sqrt())?;

        Ok((
            out.x,
            BracketInfo {
                initial_bracket: bracket,
                initial_bracket_log_likelihood: bracket_ll,
                residual_squared_diff: out.objective,
                n_evaluations: out.n_eval,
            },
        ))
    }
}
