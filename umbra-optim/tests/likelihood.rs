//! Wald and profile-likelihood confidence intervals on the regression
//! scenario.

mod common;

use common::{record_regression, simulate_regression};
use umbra::{Spy, Tape, Trace};
use umbra_optim::{Likelihood, Solver, SolverConfig, SolverError};

#[test]
fn wald_and_profile_intervals() {
    let data = simulate_regression(100, 42);
    let tape = Tape::new();
    let (_y0, beta, sigma) = record_regression(&tape, &data, false);
    let beta_slot = beta.tape_begin();
    let sigma_slot = sigma.tape_begin();

    let mut trace = Trace::new(&tape);
    let mut solver = Solver::new(&mut trace, SolverConfig::default());
    solver.maximize().unwrap();

    let mut inference = Likelihood::new(&mut solver);
    let wald = inference.confint_asymptotic(0.95).unwrap();

    // The Wald interval for beta is roughly estimate +/- 1.96 sigma / 10.
    let wald_beta = wald[beta_slot];
    assert!(wald_beta.lower < wald_beta.estimate && wald_beta.estimate < wald_beta.upper);
    let width = wald_beta.upper - wald_beta.lower;
    assert!(
        (0.05..0.12).contains(&width),
        "beta interval width = {width}"
    );

    let profile = inference.confint_profile(0.95).unwrap();

    // Near-quadratic log-likelihood in beta: profile and Wald agree to
    // three significant figures and the profile interval straddles the
    // estimate.
    let profile_beta = &profile[beta_slot].interval;
    assert!(profile_beta.lower < profile_beta.estimate);
    assert!(profile_beta.upper > profile_beta.estimate);
    assert!(
        (profile_beta.lower - wald_beta.lower).abs() < 5e-3,
        "beta lower bounds: profile {} vs wald {}",
        profile_beta.lower,
        wald_beta.lower
    );
    assert!(
        (profile_beta.upper - wald_beta.upper).abs() < 5e-3,
        "beta upper bounds: profile {} vs wald {}",
        profile_beta.upper,
        wald_beta.upper
    );

    // The sampling distribution of sigma-hat is right-skewed, so the
    // profile interval sits strictly to the right of the symmetric Wald
    // interval at its lower end.
    let profile_sigma = &profile[sigma_slot].interval;
    let wald_sigma = wald[sigma_slot];
    assert!(
        profile_sigma.lower > wald_sigma.lower,
        "profile lower {} should exceed wald lower {}",
        profile_sigma.lower,
        wald_sigma.lower
    );

    // Bracket diagnostics describe a crossing.
    let info = &profile[beta_slot].lower;
    assert!(info.initial_bracket < profile_beta.estimate);
    assert!(info.n_evaluations > 0);
    assert!(info.residual_squared_diff < 1e-3);

    // The profile loop restored the optimum and replayed.
    assert!((solver.trace.read_scalar(&beta) - wald_beta.estimate).abs() < 1e-9);
}

#[test]
fn convex_objective_yields_bad_hessian() {
    // Minimum, not maximum: -H is negative definite, Cholesky must fail.
    let tape = Tape::new();
    let x = Spy::input(1.0, &tape).unwrap();
    let _y = x.powf(2.0);

    let mut trace = Trace::new(&tape);
    trace.play();
    let mut solver = Solver::new(&mut trace, SolverConfig::default());
    let inference = Likelihood::new(&mut solver);
    assert_eq!(
        inference.asymptotic_standard_deviations().unwrap_err(),
        SolverError::BadHessian
    );
}

#[test]
fn profile_restores_fixed_set_and_inputs() {
    let data = simulate_regression(60, 3);
    let tape = Tape::new();
    record_regression(&tape, &data, false);

    let mut trace = Trace::new(&tape);
    let mut solver = Solver::new(&mut trace, SolverConfig::default());
    solver.maximize().unwrap();
    let optimum: Vec<f64> = solver.trace.values[..3].to_vec();
    let objective = solver.trace.result();

    let mut inference = Likelihood::new(&mut solver);
    inference.confint_profile(0.95).unwrap();

    assert!(solver.fixed_parameter_indices().is_empty());
    for (restored, original) in solver.trace.values[..3].iter().zip(&optimum) {
        assert_eq!(restored, original);
    }
    assert!((solver.trace.result() - objective).abs() < 1e-12);
}
