use approx::assert_relative_eq;
use umbra::{Spy, Tape, Trace};

/// Check the recorded gradient and sparse Hessian of a scalar objective
/// against central finite differences over the free inputs.
///
/// The objective must be the last operation recorded on the tape. Finite
/// differences re-use the trace by overwriting the input slots and
/// replaying forward, which also exercises the re-evaluation semantics.
pub fn check_derivatives(tape: &Tape, objective: &Spy<'_>, grad_tol: f64, hess_tol: f64) {
    assert!(objective.is_scalar(), "objective must be scalar");
    assert_eq!(
        objective.tape_end(),
        tape.trace_len(),
        "objective must be the last recorded operation"
    );

    let n = tape.input_len();
    let mut trace = Trace::new(tape);
    trace.play();

    let analytic_grad: Vec<f64> = trace.adjoints[..n].to_vec();
    let analytic_hess: Vec<Vec<f64>> = (0..n)
        .map(|j| (0..n).map(|k| trace.hessian.read(j, k)).collect())
        .collect();
    let x0: Vec<f64> = trace.values[..n].to_vec();

    fn eval(trace: &mut Trace<'_>, n: usize, x: &[f64]) -> f64 {
        trace.values[..n].copy_from_slice(x);
        trace.play_forward();
        trace.result()
    }

    let h = 1e-6;
    for j in 0..n {
        let mut xp = x0.clone();
        xp[j] += h;
        let mut xm = x0.clone();
        xm[j] -= h;
        let fd = (eval(&mut trace, n, &xp) - eval(&mut trace, n, &xm)) / (2.0 * h);
        assert_relative_eq!(
            analytic_grad[j],
            fd,
            max_relative = grad_tol,
            epsilon = grad_tol
        );
    }

    let h = 1e-4;
    for j in 0..n {
        for k in j..n {
            let mut x = x0.clone();
            x[j] += h;
            x[k] += h;
            let fpp = eval(&mut trace, n, &x);
            let mut x = x0.clone();
            x[j] += h;
            x[k] -= h;
            let fpm = eval(&mut trace, n, &x);
            let mut x = x0.clone();
            x[j] -= h;
            x[k] += h;
            let fmp = eval(&mut trace, n, &x);
            let mut x = x0.clone();
            x[j] -= h;
            x[k] -= h;
            let fmm = eval(&mut trace, n, &x);
            let fd = (fpp - fpm - fmp + fmm) / (4.0 * h * h);
            assert_relative_eq!(
                analytic_hess[j][k],
                fd,
                max_relative = hess_tol,
                epsilon = hess_tol
            );
        }
    }
}
