//! Unary operators in scalar and vector form.

use super::{eval_unary, unary_operand, Op, OpKind};
use crate::special::{digamma, ln_gamma, trigamma};

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

pub(super) fn evaluate(op: &Op, values: &mut [f64]) {
    use OpKind::*;
    match op.kind {
        Identity => eval_unary(op, values, |x| x),
        Trivial0 => eval_unary(op, values, |_| 0.0),
        Trivial1 => eval_unary(op, values, |_| 1.0),
        Negate => eval_unary(op, values, |x| -x),
        Invert => eval_unary(op, values, |x| 1.0 / x),
        Square => eval_unary(op, values, |x| x * x),
        Cube => eval_unary(op, values, |x| x * x * x),
        Log => eval_unary(op, values, f64::ln),
        Log1p => eval_unary(op, values, f64::ln_1p),
        Log1m => eval_unary(op, values, |x| (-x).ln_1p()),
        Exp => eval_unary(op, values, f64::exp),
        SelfPow => eval_unary(op, values, |x| x.powf(x)),
        LogGamma => eval_unary(op, values, ln_gamma),
        Logit => eval_unary(op, values, |x| (x / (1.0 - x)).ln()),
        Logistic => eval_unary(op, values, logistic),
        Sin => eval_unary(op, values, f64::sin),
        Cos => eval_unary(op, values, f64::cos),
        _ => unreachable!(),
    }
}

pub(super) fn partial(op: &Op, values: &[f64], i: usize, j: usize) -> f64 {
    use OpKind::*;
    let x = match unary_operand(op, values, i, j) {
        Some(x) => x,
        None => return 0.0,
    };
    match op.kind {
        Identity => 1.0,
        Trivial0 | Trivial1 => 0.0,
        Negate => -1.0,
        Invert => {
            let x_inv = 1.0 / x;
            -x_inv * x_inv
        }
        Square => 2.0 * x,
        Cube => 3.0 * x * x,
        Log => 1.0 / x,
        Log1p => 1.0 / (x + 1.0),
        Log1m => -1.0 / (1.0 - x),
        Exp => x.exp(),
        SelfPow => x.powf(x) * (1.0 + x.ln()),
        LogGamma => digamma(x),
        Logit => 1.0 / (x - x * x),
        Logistic => {
            let exp_mx = (-x).exp();
            let exp_mx_p1 = exp_mx + 1.0;
            exp_mx / (exp_mx_p1 * exp_mx_p1)
        }
        Sin => x.cos(),
        Cos => -x.sin(),
        _ => unreachable!(),
    }
}

pub(super) fn partial2(op: &Op, values: &[f64], i: usize, j: usize, k: usize) -> f64 {
    use OpKind::*;
    if j != k {
        return 0.0;
    }
    let x = match unary_operand(op, values, i, j) {
        Some(x) => x,
        None => return 0.0,
    };
    match op.kind {
        Identity | Trivial0 | Trivial1 | Negate => 0.0,
        Invert => {
            let x_inv = 1.0 / x;
            2.0 * x_inv * x_inv * x_inv
        }
        Square => 2.0,
        Cube => 6.0 * x,
        Log => {
            let x_inv = 1.0 / x;
            -x_inv * x_inv
        }
        Log1p => {
            let y = 1.0 / (x + 1.0);
            -y * y
        }
        Log1m => {
            let y = 1.0 / (1.0 - x);
            -y * y
        }
        Exp => x.exp(),
        SelfPow => {
            let lx1p = x.ln() + 1.0;
            x.powf(x - 1.0) + x.powf(x) * lx1p * lx1p
        }
        LogGamma => trigamma(x),
        Logit => {
            let xm1_inv = 1.0 / (x - 1.0);
            xm1_inv * xm1_inv - 1.0 / (x * x)
        }
        Logistic => {
            let exp_mx = (-x).exp();
            let exp_mx_p1 = exp_mx + 1.0;
            exp_mx * (exp_mx - 1.0) / (exp_mx_p1 * exp_mx_p1 * exp_mx_p1)
        }
        Sin => -x.sin(),
        Cos => -x.cos(),
        _ => unreachable!(),
    }
}
