//! Addition, subtraction, and element-wise multiplication.

use super::{eval_binary, partial2_binary, partial_binary, Op, OpKind};

pub(super) fn evaluate(op: &Op, values: &mut [f64]) {
    match op.kind {
        OpKind::Add => eval_binary(op, values, |p, s| p + s),
        OpKind::Sub => eval_binary(op, values, |p, s| p - s),
        OpKind::SubFrom => eval_binary(op, values, |p, s| s - p),
        OpKind::Mul => eval_binary(op, values, |p, s| p * s),
        _ => unreachable!(),
    }
}

pub(super) fn partial(op: &Op, values: &[f64], i: usize, j: usize) -> f64 {
    match op.kind {
        OpKind::Add => partial_binary(op, values, i, j, |_, _| 1.0, |_, _| 1.0),
        OpKind::Sub => partial_binary(op, values, i, j, |_, _| 1.0, |_, _| -1.0),
        OpKind::SubFrom => partial_binary(op, values, i, j, |_, _| -1.0, |_, _| 0.0),
        OpKind::Mul => partial_binary(op, values, i, j, |_, s| s, |p, _| p),
        _ => unreachable!(),
    }
}

pub(super) fn partial2(op: &Op, values: &[f64], i: usize, j: usize, k: usize) -> f64 {
    match op.kind {
        // d2(p*s)/dp ds = 1; both pure seconds vanish.
        OpKind::Mul => partial2_binary(op, values, i, j, k, |_, _| 0.0, |_, _| 1.0, |_, _| 0.0),
        _ => 0.0,
    }
}
