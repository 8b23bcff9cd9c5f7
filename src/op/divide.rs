//! Element-wise division, both orientations.
//!
//! `Div` is `p / s` with the numerator free or on the left; `DivInto` is
//! `s / p` with a constant numerator. Division by a locally evaluated zero
//! is not guarded; the resulting non-finite values propagate into the line
//! search, whose feasibility restriction steps back from them.

use super::{eval_binary, partial2_binary, partial_binary, Op, OpKind};

pub(super) fn evaluate(op: &Op, values: &mut [f64]) {
    match op.kind {
        OpKind::Div => eval_binary(op, values, |p, s| p / s),
        OpKind::DivInto => eval_binary(op, values, |p, s| s / p),
        _ => unreachable!(),
    }
}

pub(super) fn partial(op: &Op, values: &[f64], i: usize, j: usize) -> f64 {
    match op.kind {
        OpKind::Div => partial_binary(
            op,
            values,
            i,
            j,
            |_, s| 1.0 / s,
            |p, s| -p / (s * s),
        ),
        OpKind::DivInto => partial_binary(op, values, i, j, |p, s| -s / (p * p), |_, _| 0.0),
        _ => unreachable!(),
    }
}

pub(super) fn partial2(op: &Op, values: &[f64], i: usize, j: usize, k: usize) -> f64 {
    match op.kind {
        OpKind::Div => partial2_binary(
            op,
            values,
            i,
            j,
            k,
            |_, _| 0.0,
            |_, s| -1.0 / (s * s),
            |p, s| 2.0 * p / (s * s * s),
        ),
        OpKind::DivInto => partial2_binary(
            op,
            values,
            i,
            j,
            k,
            |p, s| 2.0 * s / (p * p * p),
            |_, _| 0.0,
            |_, _| 0.0,
        ),
        _ => unreachable!(),
    }
}
