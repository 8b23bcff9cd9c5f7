use thiserror::Error;

/// Fatal conditions surfaced by the solver and the inference methods.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SolverError {
    /// Every Tikhonov attempt failed to factorize the working Hessian.
    #[error("Hessian factorization failed after {attempts} regularization attempts")]
    FactorizationFailed { attempts: usize },

    /// The line search returned an objective strictly below the starting
    /// one; the local Hessian model is broken or the objective pathological.
    #[error("failure of backtracking line search: objective fell from {start} to {found}")]
    BacktrackingFailure { start: f64, found: f64 },

    /// Cholesky of the negated Hessian failed at the optimum.
    #[error("bad Hessian: negated Hessian is not positive definite")]
    BadHessian,

    /// The objective evaluated to positive infinity: the model is unbounded
    /// above.
    #[error("infinitely high objective encountered")]
    InfiniteObjective,
}
