//! Newton-Brent maximization scenarios.

mod common;

use common::{record_regression, simulate_regression};
use umbra::{Spy, Tape, Trace};
use umbra_optim::{Solver, SolverConfig};

#[test]
fn scalar_paraboloid_maximizes_at_zero() {
    let tape = Tape::new();
    let x = Spy::input(1.5, &tape).unwrap();
    let _y = -x.powf(2.0);

    let mut trace = Trace::new(&tape);
    let mut solver = Solver::new(&mut trace, SolverConfig::default());
    solver.maximize().unwrap();

    let x_hat = solver.trace.read_scalar(&x);
    assert!(
        x_hat.abs() < 5e-3,
        "expected stationary point at 0, got {x_hat}"
    );
    assert!(solver.n_eval_forward > 0 && solver.n_eval_reverse > 0);
}

#[test]
fn linear_regression_mle() {
    let data = simulate_regression(100, 42);
    let tape = Tape::new();
    let (y0, beta, sigma) = record_regression(&tape, &data, false);

    let mut trace = Trace::new(&tape);
    let mut solver = Solver::new(&mut trace, SolverConfig::default());
    solver.maximize().unwrap();

    let y0_hat = solver.trace.read_scalar(&y0);
    let beta_hat = solver.trace.read_scalar(&beta);
    let sigma_hat = solver.trace.read_scalar(&sigma);

    assert!((y0_hat - 10.0).abs() < 0.1, "y0 = {y0_hat}");
    assert!((beta_hat - 0.5).abs() < 0.1, "beta = {beta_hat}");
    assert!((sigma_hat - 0.2).abs() < 0.07, "sigma = {sigma_hat}");
}

#[test]
fn newton_iterations_ascend_monotonically() {
    let data = simulate_regression(100, 42);
    let tape = Tape::new();
    record_regression(&tape, &data, false);

    let mut trace = Trace::new(&tape);
    let config = SolverConfig {
        diagnostic_mode: true,
        ..SolverConfig::default()
    };
    let tolerance = config.objective_tolerance;
    let mut solver = Solver::new(&mut trace, config);
    solver.maximize().unwrap();

    assert!(!solver.states.is_empty());
    for state in &solver.states {
        assert!(
            state.objective_final >= state.objective_initial - tolerance,
            "iteration {} decreased the objective: {} -> {}",
            state.iter,
            state.objective_initial,
            state.objective_final
        );
    }
    // Consecutive iterations chain together.
    for pair in solver.states.windows(2) {
        assert_eq!(pair[0].objective_final, pair[1].objective_initial);
    }
}

#[test]
fn logistic_regression_gradient_vanishes_at_mle() {
    use rand::prelude::*;
    use rand_distr::StandardNormal;
    use umbra::{sum_log_dbern, Tensor};

    let n = 100;
    let mut rng = StdRng::seed_from_u64(7);
    let x: Vec<f64> = (0..n).map(|_| rng.sample(StandardNormal)).collect();
    let y: Vec<f64> = x
        .iter()
        .map(|&xi| {
            let p = 1.0 / (1.0 + (-(0.3 + 1.0 * xi)).exp());
            if rng.gen::<f64>() < p {
                1.0
            } else {
                0.0
            }
        })
        .collect();
    let x = Tensor::from(x);
    let y = Tensor::from(y);

    let tape = Tape::new();
    let alpha = Spy::input(0.0, &tape).unwrap();
    let beta = Spy::input(0.0, &tape).unwrap();
    let eta = &beta * &x + &alpha;
    let _ll = sum_log_dbern(&eta.logistic(), &y);

    let mut trace = Trace::new(&tape);
    let config = SolverConfig {
        objective_tolerance: 1e-10,
        ..SolverConfig::default()
    };
    let mut solver = Solver::new(&mut trace, config);
    solver.maximize().unwrap();

    let g_alpha = solver.trace.partial(alpha.tape_begin());
    let g_beta = solver.trace.partial(beta.tape_begin());
    assert!(g_alpha.abs() < 1e-6, "d ll / d alpha = {g_alpha}");
    assert!(g_beta.abs() < 1e-6, "d ll / d beta = {g_beta}");
}

#[test]
fn declaration_order_does_not_change_the_optimum() {
    let data = simulate_regression(100, 42);

    let tape_a = Tape::new();
    let (y0_a, beta_a, sigma_a) = record_regression(&tape_a, &data, false);
    let mut trace_a = Trace::new(&tape_a);
    let mut solver_a = Solver::new(&mut trace_a, SolverConfig::default());
    solver_a.maximize().unwrap();
    let objective_a = solver_a.trace.result();
    let estimates_a = [
        solver_a.trace.read_scalar(&y0_a),
        solver_a.trace.read_scalar(&beta_a),
        solver_a.trace.read_scalar(&sigma_a),
    ];

    let tape_b = Tape::new();
    let (y0_b, beta_b, sigma_b) = record_regression(&tape_b, &data, true);
    // Parameter slots differ between the two declarations.
    assert_ne!(y0_a.tape_begin(), y0_b.tape_begin());
    let mut trace_b = Trace::new(&tape_b);
    let mut solver_b = Solver::new(&mut trace_b, SolverConfig::default());
    solver_b.maximize().unwrap();
    let objective_b = solver_b.trace.result();
    let estimates_b = [
        solver_b.trace.read_scalar(&y0_b),
        solver_b.trace.read_scalar(&beta_b),
        solver_b.trace.read_scalar(&sigma_b),
    ];

    assert!(
        (objective_a - objective_b).abs() <= SolverConfig::default().objective_tolerance,
        "objectives diverged: {objective_a} vs {objective_b}"
    );
    for (a, b) in estimates_a.iter().zip(&estimates_b) {
        assert!((a - b).abs() < 0.05, "estimates diverged: {a} vs {b}");
    }
}
