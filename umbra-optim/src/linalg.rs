//! Bridges between the map-based sparse Hessian and faer's sparse solvers.
//!
//! faer's sparse factorizations panic on some singular inputs rather than
//! returning an error, so every factorization is wrapped in `catch_unwind`
//! and any panic is treated as a failed factorization.

use std::panic::{catch_unwind, AssertUnwindSafe};

use faer::linalg::solvers::SpSolver;
use faer::sparse::SparseColMat;
use faer::{Col, Side};

use umbra::SparseSymMat;

/// Triplets of the working Newton matrix.
///
/// Every diagonal position is materialized (zero when the Hessian has no
/// entry there) so that the Tikhonov interpolation toward the identity acts
/// on the full diagonal. Rows and columns of fixed parameters are
/// neutralized: their off-diagonal couplings are dropped and their diagonal
/// is set to -1, matching the sign convention of a concave objective.
pub(crate) fn working_triplets(
    hessian: &SparseSymMat,
    n: usize,
    fixed: &[usize],
) -> Vec<(usize, usize, f64)> {
    let is_fixed = |i: usize| fixed.contains(&i);
    let mut triplets = Vec::with_capacity(n + hessian.stored_len());
    for i in 0..n {
        let d = if is_fixed(i) { -1.0 } else { hessian.read(i, i) };
        triplets.push((i, i, d));
    }
    for (i, j, v) in hessian.iter() {
        if i == j || is_fixed(i) || is_fixed(j) {
            continue;
        }
        triplets.push((i, j, v));
    }
    triplets
}

/// Tikhonov interpolation `(1 - lambda) H + lambda I` over a triplet list
/// whose diagonal is fully materialized.
pub(crate) fn damp_triplets(
    base: &[(usize, usize, f64)],
    lambda: f64,
) -> Vec<(usize, usize, f64)> {
    let h_weight = 1.0 - lambda;
    base.iter()
        .map(|&(i, j, v)| {
            let damped = if i == j {
                v * h_weight + lambda
            } else {
                v * h_weight
            };
            (i, j, damped)
        })
        .collect()
}

/// Factorize the triplet matrix with sparse LU and solve for `rhs`.
/// `None` when construction, factorization, or the solve fails.
pub(crate) fn lu_solve(
    n: usize,
    triplets: &[(usize, usize, f64)],
    rhs: &Col<f64>,
) -> Option<Vec<f64>> {
    let mat = SparseColMat::<usize, f64>::try_new_from_triplets(n, n, triplets).ok()?;
    let lu = catch_unwind(AssertUnwindSafe(|| mat.sp_lu().ok()))
        .ok()
        .flatten()?;
    let sol = lu.solve(rhs);
    let out: Vec<f64> = (0..n).map(|i| sol[i]).collect();
    if out.iter().all(|v| v.is_finite()) {
        Some(out)
    } else {
        None
    }
}

/// Sparse Cholesky of the negated Hessian. `None` when the factorization
/// does not succeed, i.e. `-H` is not positive definite.
pub(crate) fn negated_cholesky(
    hessian: &SparseSymMat,
    n: usize,
) -> Option<faer::sparse::linalg::solvers::Cholesky<usize, f64>> {
    let triplets: Vec<(usize, usize, f64)> = hessian.iter().map(|(i, j, v)| (i, j, -v)).collect();
    let mat = SparseColMat::<usize, f64>::try_new_from_triplets(n, n, &triplets).ok()?;
    catch_unwind(AssertUnwindSafe(|| mat.sp_cholesky(Side::Lower).ok()))
        .ok()
        .flatten()
}

/// Column `j` of the inverse of a factorized matrix.
pub(crate) fn inverse_column(
    llt: &faer::sparse::linalg::solvers::Cholesky<usize, f64>,
    n: usize,
    j: usize,
) -> Vec<f64> {
    let e_j = Col::<f64>::from_fn(n, |i| if i == j { 1.0 } else { 0.0 });
    let sol = llt.solve(&e_j);
    (0..n).map(|i| sol[i]).collect()
}

/// Dense row-major rendition of a triplet matrix, for diagnostics.
pub(crate) fn dense_from_triplets(n: usize, triplets: &[(usize, usize, f64)]) -> Vec<f64> {
    let mut out = vec![0.0; n * n];
    for &(i, j, v) in triplets {
        out[i * n + j] += v;
    }
    out
}
