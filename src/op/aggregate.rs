//! Aggregators with scalar output: sum, sum of squares, dot product, and
//! the Bernoulli log-likelihood against a fixed binary vector.

use super::{Op, OpConst, OpInput, OpKind};

pub(super) fn evaluate(op: &Op, values: &mut [f64]) {
    let y = match (op.kind, &op.input, &op.constant) {
        (OpKind::Sum, OpInput::Range(r), OpConst::None) => {
            (0..r.len()).map(|i| values[r.slot(i)]).sum()
        }
        (OpKind::SumSq, OpInput::Range(r), OpConst::None) => (0..r.len())
            .map(|i| {
                let x = values[r.slot(i)];
                x * x
            })
            .sum(),
        (OpKind::Dot, OpInput::RangePair(l, r), OpConst::None) => {
            debug_assert_eq!(l.len(), r.len());
            (0..l.len())
                .map(|i| values[l.slot(i)] * values[r.slot(i)])
                .sum()
        }
        (OpKind::Dot, OpInput::Range(r), OpConst::Vector(c)) => {
            debug_assert_eq!(r.len(), c.len());
            (0..r.len()).map(|i| values[r.slot(i)] * c[i]).sum()
        }
        (OpKind::BernoulliLogLik, OpInput::Range(r), OpConst::Vector(y01)) => {
            debug_assert_eq!(r.len(), y01.len());
            let mut acc = 0.0;
            for i in 0..r.len() {
                let p = values[r.slot(i)];
                acc += if y01[i] != 0.0 { p.ln() } else { (-p).ln_1p() };
            }
            acc
        }
        _ => unreachable!("aggregator operand layout"),
    };
    values[op.out.begin] = y;
}

pub(super) fn partial(op: &Op, values: &[f64], _i: usize, j: usize) -> f64 {
    match (op.kind, &op.input, &op.constant) {
        (OpKind::Sum, ..) => 1.0,
        (OpKind::SumSq, OpInput::Range(r), _) => 2.0 * values[r.slot(j)],
        (OpKind::Dot, OpInput::RangePair(l, r), _) => {
            let n = l.len();
            if j < n {
                values[r.slot(j)]
            } else {
                values[l.slot(j - n)]
            }
        }
        (OpKind::Dot, OpInput::Range(_), OpConst::Vector(c)) => c[j],
        (OpKind::BernoulliLogLik, OpInput::Range(r), OpConst::Vector(y01)) => {
            let p = values[r.slot(j)];
            if y01[j] != 0.0 {
                1.0 / p
            } else {
                1.0 / (p - 1.0)
            }
        }
        _ => unreachable!("aggregator operand layout"),
    }
}

pub(super) fn partial2(op: &Op, values: &[f64], _i: usize, j: usize, k: usize) -> f64 {
    match (op.kind, &op.input, &op.constant) {
        (OpKind::Sum, ..) => 0.0,
        (OpKind::SumSq, ..) => {
            if j == k {
                2.0
            } else {
                0.0
            }
        }
        (OpKind::Dot, OpInput::RangePair(l, _), _) => {
            let n = l.len();
            if j + n == k || k + n == j {
                1.0
            } else {
                0.0
            }
        }
        (OpKind::Dot, OpInput::Range(_), _) => 0.0,
        (OpKind::BernoulliLogLik, OpInput::Range(r), OpConst::Vector(y01)) => {
            if j != k {
                return 0.0;
            }
            let p = values[r.slot(j)];
            if y01[j] != 0.0 {
                -1.0 / (p * p)
            } else {
                let pm1 = p - 1.0;
                -1.0 / (pm1 * pm1)
            }
        }
        _ => unreachable!("aggregator operand layout"),
    }
}
