//! Structural invariants of tape and trace: buffer layout, playback
//! idempotence, Hessian symmetry, and input re-evaluation semantics.

use approx::assert_relative_eq;
use umbra::{dot, Spy, Tape, Trace};

/// A small nonlinear objective with a dense-ish Hessian over 3 inputs.
fn record_model(tape: &Tape) -> (Spy<'_>, Spy<'_>, Spy<'_>) {
    let a = Spy::input(0.8, tape).unwrap();
    let b = Spy::input(vec![0.4, 1.1], tape).unwrap();
    let c = Spy::input(0.6, tape).unwrap();
    let z = &(&b * &a) / &c;
    let _y = z.sumsq() + a.log() * &c;
    (a, b, c)
}

#[test]
fn trace_buffers_match_tape_layout() {
    let tape = Tape::new();
    record_model(&tape);

    // inputs: 1 + 2 + 1 slots; ops: mul (2), div (2), sumsq (1), log (1),
    // mul (1), add (1).
    assert_eq!(tape.input_len(), 4);
    assert_eq!(tape.trace_len(), 4 + 2 + 2 + 1 + 1 + 1 + 1);

    let trace = Trace::new(&tape);
    assert_eq!(trace.values.len(), tape.trace_len());
    assert_eq!(trace.adjoints.len(), tape.trace_len());
    assert_eq!(trace.hessian.width(), tape.input_len());
}

#[test]
fn playback_is_idempotent_bitwise() {
    let tape = Tape::new();
    record_model(&tape);
    let mut trace = Trace::new(&tape);
    trace.play();

    let values = trace.values.clone();
    let adjoints = trace.adjoints.clone();
    let hessian = trace.hessian.to_dense();

    trace.play();
    assert_eq!(trace.values, values);
    assert_eq!(trace.adjoints, adjoints);
    assert_eq!(trace.hessian.to_dense(), hessian);
}

#[test]
fn hessian_is_exactly_symmetric_with_paired_presence() {
    let tape = Tape::new();
    record_model(&tape);
    let mut trace = Trace::new(&tape);
    trace.play();

    let mut seen = 0;
    for (i, j, v) in trace.hessian.iter() {
        // The mirrored entry exists and holds the identical bits.
        let mirror = trace.hessian.row(j).and_then(|r| r.get(&i)).copied();
        assert_eq!(mirror, Some(v), "missing or unequal mirror of ({i},{j})");
        seen += 1;
    }
    assert!(seen > 0, "model should have a nonempty Hessian");
}

#[test]
fn hessian_support_is_restricted_to_inputs() {
    let tape = Tape::new();
    record_model(&tape);
    let n = tape.input_len();
    let mut trace = Trace::new(&tape);
    trace.play();
    for (i, j, _) in trace.hessian.iter() {
        assert!(i < n && j < n);
    }
}

#[test]
fn writing_inputs_and_replaying_reevaluates() {
    let tape = Tape::new();
    let x = Spy::input(1.0, &tape).unwrap();
    let _y = x.powf(2.0);

    let mut trace = Trace::new(&tape);
    trace.play();
    assert_relative_eq!(trace.result(), 1.0);
    assert_relative_eq!(trace.partial(x.tape_begin()), 2.0);

    trace.values[x.tape_begin()] = 3.0;
    trace.play();
    assert_relative_eq!(trace.result(), 9.0);
    assert_relative_eq!(trace.partial(x.tape_begin()), 6.0);
    assert_relative_eq!(trace.partial2(x.tape_begin(), x.tape_begin()), 2.0);
}

#[test]
fn many_traces_share_one_tape() {
    let tape = Tape::new();
    let x = Spy::input(2.0, &tape).unwrap();
    let _y = x.log();

    let mut t1 = Trace::new(&tape);
    let mut t2 = Trace::new(&tape);
    t2.values[x.tape_begin()] = 4.0;
    t1.play();
    t2.play();
    assert_relative_eq!(t1.result(), 2.0_f64.ln());
    assert_relative_eq!(t2.result(), 4.0_f64.ln());
    assert_relative_eq!(t1.partial(0), 0.5);
    assert_relative_eq!(t2.partial(0), 0.25);
}

#[test]
fn dot_of_handle_with_itself_routes_to_sumsq() {
    let tape = Tape::new();
    let v = Spy::input(vec![1.0, 2.0, 3.0], &tape).unwrap();
    let y = dot(&v, &v);
    let mut trace = Trace::new(&tape);
    trace.play();
    assert_relative_eq!(trace.read_scalar(&y), 14.0);
    // d sum(v_i^2) / d v_1 = 2 v_1
    assert_relative_eq!(trace.partial(1), 4.0);
    assert_relative_eq!(trace.partial2(1, 1), 2.0);
    assert_relative_eq!(trace.partial2(0, 1), 0.0);
}
