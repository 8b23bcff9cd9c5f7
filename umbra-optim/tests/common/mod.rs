//! Shared simulated-data models for the solver and likelihood tests.

use rand::prelude::*;
use rand_distr::StandardNormal;
use umbra::distributions::logdnorm;
use umbra::{Spy, Tape, Tensor};

pub struct RegressionData {
    pub x: Tensor,
    pub y: Tensor,
}

/// `y = 10 + 0.5 x + 0.2 eps` with `x, eps ~ N(0, 1)` and a fixed seed.
pub fn simulate_regression(n: usize, seed: u64) -> RegressionData {
    let mut rng = StdRng::seed_from_u64(seed);
    let x: Vec<f64> = (0..n).map(|_| rng.sample(StandardNormal)).collect();
    let y: Vec<f64> = x
        .iter()
        .map(|&xi| {
            let eps: f64 = rng.sample(StandardNormal);
            10.0 + 0.5 * xi + 0.2 * eps
        })
        .collect();
    RegressionData {
        x: Tensor::from(x),
        y: Tensor::from(y),
    }
}

/// Record the Gaussian regression log-likelihood. Parameters are declared
/// as (y0, beta, sigma), or in reverse order when `reversed` is set, from
/// the far-off starting point of the estimation scenario.
pub fn record_regression<'t>(
    tape: &'t Tape,
    data: &RegressionData,
    reversed: bool,
) -> (Spy<'t>, Spy<'t>, Spy<'t>) {
    let (y0, beta, sigma);
    if reversed {
        sigma = Spy::input(3.0, tape).unwrap();
        beta = Spy::input(0.0, tape).unwrap();
        y0 = Spy::input(-5.0, tape).unwrap();
    } else {
        y0 = Spy::input(-5.0, tape).unwrap();
        beta = Spy::input(0.0, tape).unwrap();
        sigma = Spy::input(3.0, tape).unwrap();
    }
    let mu = &beta * &data.x + &y0;
    let _ll = logdnorm(&data.y, &mu, &sigma).sum();
    (y0, beta, sigma)
}
