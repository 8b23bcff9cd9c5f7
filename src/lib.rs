//! Recorded expression graphs with exact gradients and sparse Hessians.
//!
//! A [`Tape`] holds an ordered sequence of primitive operations over a flat
//! value array. User code builds the graph through [`Spy`] handles whose
//! overloaded arithmetic records onto the tape as a side effect. A [`Trace`]
//! bound to the tape replays it: [`Trace::play_forward`] evaluates the
//! objective, [`Trace::play_reverse`] computes every adjoint and the sparse
//! symmetric Hessian of the final scalar in one edge-pushing sweep.
//!
//! The tape is immutable once recording ends and may be shared by any number
//! of traces; each trace owns its value/adjoint/Hessian buffers exclusively.
//! The companion `umbra-optim` crate maximizes a recorded objective with a
//! regularized Newton method and derives confidence intervals from the
//! solved trace.

pub mod distributions;
mod error;
pub mod op;
pub mod sparse;
pub mod special;
mod spy;
mod spy_ops;
mod tape;
pub mod tensor;
mod trace;

pub use error::Error;
pub use sparse::SparseSymMat;
pub use spy::Spy;
pub use spy_ops::{dot, matmult, matmult_const_left, pow_base, pow_basef, sum_log_dbern};
pub use tape::Tape;
pub use tensor::Tensor;
pub use trace::Trace;
