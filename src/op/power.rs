//! Element-wise power, both orientations.
//!
//! `Pow` is `p ^ s` with the base free or on the left; `PowExp` is `s ^ p`
//! with a constant base.

use super::{eval_binary, partial2_binary, partial_binary, Op, OpKind};

pub(super) fn evaluate(op: &Op, values: &mut [f64]) {
    match op.kind {
        OpKind::Pow => eval_binary(op, values, f64::powf),
        OpKind::PowExp => eval_binary(op, values, |p, s| s.powf(p)),
        _ => unreachable!(),
    }
}

pub(super) fn partial(op: &Op, values: &[f64], i: usize, j: usize) -> f64 {
    match op.kind {
        OpKind::Pow => partial_binary(
            op,
            values,
            i,
            j,
            |p, s| s * p.powf(s - 1.0),
            |p, s| p.powf(s) * p.ln(),
        ),
        OpKind::PowExp => partial_binary(
            op,
            values,
            i,
            j,
            |p, s| s.powf(p) * s.ln(),
            |_, _| 0.0,
        ),
        _ => unreachable!(),
    }
}

pub(super) fn partial2(op: &Op, values: &[f64], i: usize, j: usize, k: usize) -> f64 {
    match op.kind {
        OpKind::Pow => partial2_binary(
            op,
            values,
            i,
            j,
            k,
            |p, s| (s - 1.0) * s * p.powf(s - 2.0),
            |p, s| {
                let pow_p_sm1 = p.powf(s - 1.0);
                pow_p_sm1 + s * pow_p_sm1 * p.ln()
            },
            |p, s| {
                let log_p = p.ln();
                p.powf(s) * log_p * log_p
            },
        ),
        OpKind::PowExp => partial2_binary(
            op,
            values,
            i,
            j,
            k,
            |p, s| {
                let log_s = s.ln();
                s.powf(p) * log_s * log_s
            },
            |_, _| 0.0,
            |_, _| 0.0,
        ),
        _ => unreachable!(),
    }
}
