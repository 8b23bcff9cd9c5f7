//! Regularized Newton maximization and likelihood inference on `umbra`
//! tapes.
//!
//! [`Solver::maximize`] drives a recorded scalar objective to a stationary
//! point: each iteration solves the sparse Newton system `H d = -g`,
//! falling back to Tikhonov damping toward the identity when factorization
//! fails, then picks the step length with a bracketed Brent search.
//! [`Likelihood`] consumes the solved trace for asymptotic (Wald) and
//! profile-likelihood confidence intervals.

pub mod brent;
mod config;
mod error;
mod likelihood;
mod linalg;
mod solver;

pub use brent::{brent_optimize, BrentOutput};
pub use config::{SolverConfig, SolverState};
pub use error::SolverError;
pub use likelihood::{BracketInfo, ConfInt, Likelihood, ProfileInterval};
pub use solver::Solver;
