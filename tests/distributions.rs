//! Distribution log-density helpers: values against closed forms and
//! derivatives against finite differences.

mod common;

use approx::assert_relative_eq;
use common::check_derivatives;
use statrs::distribution::{Beta, Continuous, Gamma, Normal};
use umbra::distributions::{logdbeta, logddirichlet, logdgamma, logdlogis, logdnorm, logdunibeta, tan};
use umbra::{Spy, Tape, Tensor, Trace};

#[test]
fn logdnorm_matches_closed_form() {
    let tape = Tape::new();
    let mu = Spy::input(0.4, &tape).unwrap();
    let sd = Spy::input(1.3, &tape).unwrap();
    let x = Tensor::from(vec![-0.5, 0.0, 2.25]);
    let ll = logdnorm(&x, &mu, &sd);
    let mut trace = Trace::new(&tape);
    trace.play_forward();

    let reference = Normal::new(0.4, 1.3).unwrap();
    for (i, &xi) in x.val.iter().enumerate() {
        assert_relative_eq!(
            trace.read(&ll)[i],
            reference.ln_pdf(xi),
            max_relative = 1e-12
        );
    }
}

#[test]
fn logdnorm_derivatives() {
    let tape = Tape::new();
    let mu = Spy::input(0.4, &tape).unwrap();
    let sd = Spy::input(1.3, &tape).unwrap();
    let x = Tensor::from(vec![-0.5, 0.0, 2.25]);
    let y = logdnorm(&x, &mu, &sd).sum();
    check_derivatives(&tape, &y, 1e-6, 1e-4);
}

#[test]
fn logdbeta_matches_closed_form() {
    let tape = Tape::new();
    let x = Spy::input(0.3, &tape).unwrap();
    let alpha = Spy::input(2.5, &tape).unwrap();
    let beta = Spy::input(1.5, &tape).unwrap();
    let ll = logdbeta(&x, &alpha, &beta);
    let mut trace = Trace::new(&tape);
    trace.play_forward();
    let reference = Beta::new(2.5, 1.5).unwrap();
    assert_relative_eq!(
        trace.read_scalar(&ll),
        reference.ln_pdf(0.3),
        max_relative = 1e-12
    );
}

#[test]
fn logdbeta_derivatives() {
    let tape = Tape::new();
    let x = Spy::input(0.3, &tape).unwrap();
    let alpha = Spy::input(2.5, &tape).unwrap();
    let beta = Spy::input(1.5, &tape).unwrap();
    let y = logdbeta(&x, &alpha, &beta);
    check_derivatives(&tape, &y, 1e-6, 1e-4);
}

#[test]
fn logdgamma_matches_closed_form_on_support() {
    let tape = Tape::new();
    let alpha = Spy::input(2.2, &tape).unwrap();
    let scale = Spy::input(0.7, &tape).unwrap();
    let d = Tensor::from(vec![0.5, 1.8]);
    let ll = logdgamma(&d, &alpha, &scale);
    let mut trace = Trace::new(&tape);
    trace.play_forward();
    // statrs parameterizes by rate = 1 / scale.
    let reference = Gamma::new(2.2, 1.0 / 0.7).unwrap();
    for (i, &di) in d.val.iter().enumerate() {
        assert_relative_eq!(
            trace.read(&ll)[i],
            reference.ln_pdf(di),
            max_relative = 1e-10
        );
    }
}

#[test]
fn logdgamma_barrier_fires_outside_support() {
    let tape = Tape::new();
    let alpha = Spy::input(2.2, &tape).unwrap();
    let scale = Spy::input(0.7, &tape).unwrap();
    let d = Tensor::from(vec![0.5]);
    let ll = logdgamma(&d, &alpha, &scale).sum();
    let mut trace = Trace::new(&tape);
    trace.values[alpha.tape_begin()] = -1.0;
    trace.play();
    assert_eq!(trace.read_scalar(&ll), f64::NEG_INFINITY);
}

#[test]
fn logdgamma_derivatives() {
    let tape = Tape::new();
    let alpha = Spy::input(2.2, &tape).unwrap();
    let scale = Spy::input(0.7, &tape).unwrap();
    let d = Tensor::from(vec![0.5, 1.8]);
    let y = logdgamma(&d, &alpha, &scale).sum();
    check_derivatives(&tape, &y, 1e-6, 1e-4);
}

#[test]
fn logdunibeta_derivatives() {
    let tape = Tape::new();
    let x = Spy::input(0.4, &tape).unwrap();
    let mu = Spy::input(0.6, &tape).unwrap();
    let y = logdunibeta(&x, &mu);
    check_derivatives(&tape, &y, 1e-6, 1e-4);
}

#[test]
fn logddirichlet_derivatives() {
    let tape = Tape::new();
    let x = Spy::input(vec![0.3, 0.7], &tape).unwrap();
    let alpha = Spy::input(vec![2.0, 3.0], &tape).unwrap();
    let y = logddirichlet(&x, &alpha);
    check_derivatives(&tape, &y, 1e-6, 1e-4);
}

#[test]
fn logdlogis_derivatives() {
    let tape = Tape::new();
    let mu = Spy::input(0.3, &tape).unwrap();
    let x = Tensor::from(vec![-1.0, 0.5, 2.0]);
    let y = logdlogis(&x, &mu).sum();
    check_derivatives(&tape, &y, 1e-6, 1e-4);
}

#[test]
fn tan_is_sin_over_cos() {
    let tape = Tape::new();
    let x = Spy::input(0.7, &tape).unwrap();
    let y = tan(&x);
    let mut trace = Trace::new(&tape);
    trace.play();
    assert_relative_eq!(trace.read_scalar(&y), 0.7_f64.tan(), max_relative = 1e-14);
    // d tan / dx = 1 / cos^2
    let c = 0.7_f64.cos();
    assert_relative_eq!(trace.partial(0), 1.0 / (c * c), max_relative = 1e-12);
}
