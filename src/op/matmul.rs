//! Matrix product of 2-D tensors, three freedom mixes.
//!
//! Vectorized local input indexing places the left factor first, then the
//! right one, each in column-major order. For the free-free form, the local
//! Hessian is 1 exactly when the result row matches the left factor's row,
//! the result column matches the right factor's column, and the left
//! factor's column matches the right factor's row (dot-product
//! bilinearity); it is 0 everywhere else.

use super::{Op, OpConst, OpInput, OpKind};

pub(super) fn evaluate(op: &Op, values: &mut [f64]) {
    match (op.kind, &op.input, &op.constant) {
        (OpKind::MatMul, OpInput::MatrixPair(l, ld, r, rd), OpConst::None) => {
            let (m, k_len, n) = (ld[0], ld[1], rd[1]);
            debug_assert_eq!(k_len, rd[0]);
            for col in 0..n {
                for row in 0..m {
                    let mut x = 0.0;
                    for k in 0..k_len {
                        x += values[l.slot(row + k * m)] * values[r.slot(k + col * k_len)];
                    }
                    values[op.out.slot(row + col * m)] = x;
                }
            }
        }
        (OpKind::MatMul, OpInput::Matrix(a, ad), OpConst::Matrix(b)) => {
            let (m, k_len, n) = (ad[0], ad[1], b.ncol());
            debug_assert_eq!(k_len, b.nrow());
            for col in 0..n {
                for row in 0..m {
                    let mut x = 0.0;
                    for k in 0..k_len {
                        x += values[a.slot(row + k * m)] * b.at(k, col);
                    }
                    values[op.out.slot(row + col * m)] = x;
                }
            }
        }
        (OpKind::MatMulConstLeft, OpInput::Matrix(b, bd), OpConst::Matrix(a)) => {
            let (m, k_len, n) = (a.nrow(), a.ncol(), bd[1]);
            debug_assert_eq!(k_len, bd[0]);
            for col in 0..n {
                for row in 0..m {
                    let mut x = 0.0;
                    for k in 0..k_len {
                        x += a.at(row, k) * values[b.slot(k + col * k_len)];
                    }
                    values[op.out.slot(row + col * m)] = x;
                }
            }
        }
        _ => unreachable!("matmul operand layout"),
    }
}

/// Jacobian of the product: `dC[k,l]/dA[i,j] = B[j,l]` when `i == k`,
/// `dC[k,l]/dB[i,j] = A[k,i]` when `j == l`, zero otherwise.
pub(super) fn partial(op: &Op, values: &[f64], i: usize, j: usize) -> f64 {
    match (op.kind, &op.input, &op.constant) {
        (OpKind::MatMul, OpInput::MatrixPair(l, ld, r, rd), OpConst::None) => {
            let rows_a = ld[0];
            let rows_b = rd[0];
            let rows_c = rows_a;
            let size_a = ld[0] * ld[1];

            let (ci, cj) = (i % rows_c, i / rows_c);
            if j < size_a {
                let (ai, aj) = (j % rows_a, j / rows_a);
                if ai != ci {
                    return 0.0;
                }
                values[r.slot(aj + cj * rows_b)]
            } else {
                let j_aligned = j - size_a;
                let (bi, bj) = (j_aligned % rows_b, j_aligned / rows_b);
                if bj != cj {
                    return 0.0;
                }
                values[l.slot(ci + bi * rows_a)]
            }
        }
        (OpKind::MatMul, OpInput::Matrix(_, ad), OpConst::Matrix(b)) => {
            let rows_a = ad[0];
            let (ci, cj) = (i % rows_a, i / rows_a);
            let (ai, aj) = (j % rows_a, j / rows_a);
            if ai != ci {
                return 0.0;
            }
            b.at(aj, cj)
        }
        (OpKind::MatMulConstLeft, OpInput::Matrix(_, bd), OpConst::Matrix(a)) => {
            let rows_b = bd[0];
            let rows_c = a.nrow();
            let (ci, cj) = (i % rows_c, i / rows_c);
            let (bi, bj) = (j % rows_b, j / rows_b);
            if bj != cj {
                return 0.0;
            }
            a.at(ci, bi)
        }
        _ => unreachable!("matmul operand layout"),
    }
}

pub(super) fn partial2(op: &Op, _values: &[f64], i: usize, j: usize, k: usize) -> f64 {
    match (op.kind, &op.input) {
        (OpKind::MatMul, OpInput::MatrixPair(_, ld, _, rd)) => {
            let rows_a = ld[0];
            let rows_b = rd[0];
            let size_a = ld[0] * ld[1];

            // Order so that j addresses the left factor and k the right one;
            // a pair inside a single factor has zero second partial.
            let (j, k) = if j <= k { (j, k) } else { (k, j) };
            if j >= size_a || k < size_a {
                return 0.0;
            }

            let (ai, aj) = (j % rows_a, j / rows_a);
            let k_aligned = k - size_a;
            let (bi, bj) = (k_aligned % rows_b, k_aligned / rows_b);
            let (ci, cj) = (i % rows_a, i / rows_a);

            if ci == ai && cj == bj && aj == bi {
                1.0
            } else {
                0.0
            }
        }
        // One factor fixed: both local indices address the same free factor.
        _ => 0.0,
    }
}
