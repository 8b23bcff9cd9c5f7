//! Log-density helpers built from recorded primitives.
//!
//! Data enters as fixed tensors, parameters as recorded handles; every
//! helper returns the handle of the recorded log-density (element-wise
//! where the data is a vector, so callers aggregate with `sum`).

use crate::spy::Spy;
use crate::tensor::Tensor;

/// Normal log-density `log N(x; mu, sd)`, element-wise over `x`.
pub fn logdnorm<'t>(x: &Tensor, mu: &Spy<'t>, sd: &Spy<'t>) -> Spy<'t> {
    // -1/2 log(2 pi)
    const C: f64 = -0.918_938_533_204_672_7;
    let z = &(x - mu) / sd;
    C - 0.5 * z.powf(2.0) - sd.log()
}

/// Beta log-density `log Beta(x; alpha, beta)` over recorded arguments.
pub fn logdbeta<'t>(x: &Spy<'t>, alpha: &Spy<'t>, beta: &Spy<'t>) -> Spy<'t> {
    let normalization = (alpha + beta).lgamma() - alpha.lgamma() - beta.lgamma();
    (alpha - 1.0) * x.log() + (beta - 1.0) * x.log1m() + normalization
}

/// Unitary Beta log-density with parameter `mu` in (0, 1).
pub fn logdunibeta<'t>(x: &Spy<'t>, mu: &Spy<'t>) -> Spy<'t> {
    let alpha = 1.0 + mu;
    let beta = 2.0 - mu;
    logdbeta(x, &alpha, &beta)
}

/// Dirichlet log-density for one observation vector `x` with concentration
/// vector `alpha` of length >= 2.
pub fn logddirichlet<'t>(x: &Spy<'t>, alpha: &Spy<'t>) -> Spy<'t> {
    assert!(x.len() > 1 && alpha.len() > 1);
    let normalization = alpha.sum().lgamma() - alpha.lgamma().sum();
    ((alpha - 1.0) * x.log()).sum() + normalization
}

/// Logistic log-density with unit scale, element-wise over `x`.
pub fn logdlogis<'t>(x: &Tensor, mu: &Spy<'t>) -> Spy<'t> {
    let mz = mu - x;
    let expmz = mz.exp();
    &mz - 2.0 * expmz.log1p()
}

/// Gamma log-density with shape `alpha` and scale `scale`, element-wise
/// over `d`. The `log[alpha > 0]` barrier restricts the domain instead of
/// producing NaN outside it.
pub fn logdgamma<'t>(d: &Tensor, alpha: &Spy<'t>, scale: &Spy<'t>) -> Spy<'t> {
    let bd = d / scale;
    alpha.log_gt0() + alpha * bd.log() - alpha.lgamma() - &d.map(f64::ln) - bd
}

/// `tan(x) = sin(x) / cos(x)` as recorded primitives.
pub fn tan<'t>(x: &Spy<'t>) -> Spy<'t> {
    x.sin() / x.cos()
}
