//! Operator overloads and recording functions for [`Spy`] handles.
//!
//! Every function here shape-dispatches to the cheapest operator variant,
//! applies the recording-time peephole rewrites (`a - a`, `a / a`, `x * 1`,
//! `x ^ 2`, ...), appends the chosen operator to the tape, and wraps the
//! output range in a fresh handle. Overlapping operands always route to a
//! self-form operator (square, self-power, double, trivial) rather than
//! recording a duplicate edge.
//!
//! Shape mismatches panic: `std::ops` traits cannot return `Result`, and a
//! mismatched model formula is a programming error in the caller.

use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::op::{OpConst, OpInput, OpKind, SlotRange};
use crate::spy::Spy;
use crate::tape::Tape;
use crate::tensor::Tensor;
use crate::Error;

fn range_of(s: &Spy<'_>) -> SlotRange {
    SlotRange::new(s.tape_begin(), s.tape_end())
}

fn matrix_of(s: &Spy<'_>) -> OpInput {
    assert!(s.is_matrix(), "matrix product needs 2-D operands");
    OpInput::Matrix(range_of(s), [s.value().nrow(), s.value().ncol()])
}

fn same_tape(a: &Spy<'_>, b: &Spy<'_>) {
    assert!(
        std::ptr::eq(a.tape, b.tape),
        "operands recorded on different tapes"
    );
}

fn same_handle(a: &Spy<'_>, b: &Spy<'_>) -> bool {
    a.tape_begin() == b.tape_begin() && a.len() == b.len()
}

fn shape_panic(a: &[usize], b: &[usize]) -> ! {
    panic!(
        "{}",
        Error::ShapeMismatch {
            left: a.to_vec(),
            right: b.to_vec(),
        }
    )
}

fn tzip(a: &Tensor, b: &Tensor, f: impl Fn(f64, f64) -> f64) -> Tensor {
    a.zip(b, f).unwrap_or_else(|e| panic!("{e}"))
}

fn rec<'t>(tape: &'t Tape, kind: OpKind, input: OpInput, constant: OpConst, value: Tensor) -> Spy<'t> {
    let out = tape.record(kind, input, constant);
    Spy::wrap(value, tape, out)
}

/// Record a unary operator over a handle's full range.
fn unary<'t>(kind: OpKind, a: &Spy<'t>, value: Tensor) -> Spy<'t> {
    let input = if a.is_scalar() {
        OpInput::Scalar(a.tape_begin())
    } else {
        OpInput::Range(range_of(a))
    };
    rec(a.tape, kind, input, OpConst::None, value)
}

fn trivial0<'t>(a: &Spy<'t>) -> Spy<'t> {
    unary(OpKind::Trivial0, a, Tensor::zeros(a.dim().to_vec()))
}

fn trivial1<'t>(a: &Spy<'t>) -> Spy<'t> {
    unary(OpKind::Trivial1, a, Tensor::zeros(a.dim().to_vec()).fill(1.0))
}

fn identity<'t>(a: &Spy<'t>) -> Spy<'t> {
    unary(OpKind::Identity, a, a.value().clone())
}

/// Record a binary operator over two free operands. `commute` lets the
/// commutative families present a scalar-vector pair as vector-scalar.
fn binary_free<'t>(
    kind: OpKind,
    a: &Spy<'t>,
    b: &Spy<'t>,
    commute: bool,
    value: Tensor,
) -> Spy<'t> {
    same_tape(a, b);
    let input = if a.dim() == b.dim() {
        if a.is_scalar() {
            OpInput::ScalarPair(a.tape_begin(), b.tape_begin())
        } else {
            OpInput::RangePair(range_of(a), range_of(b))
        }
    } else if a.is_scalar() {
        if commute {
            OpInput::RangeScalar(range_of(b), a.tape_begin())
        } else {
            OpInput::ScalarRange(a.tape_begin(), range_of(b))
        }
    } else if b.is_scalar() {
        OpInput::RangeScalar(range_of(a), b.tape_begin())
    } else {
        shape_panic(a.dim(), b.dim());
    };
    rec(a.tape, kind, input, OpConst::None, value)
}

/// Record a binary operator over one free operand and one constant. The
/// kind already carries the orientation (`Sub` vs `SubFrom`, ...).
fn binary_const<'t>(kind: OpKind, a: &Spy<'t>, t: &Tensor, value: Tensor) -> Spy<'t> {
    let (input, constant) = if a.dim() == t.dim {
        if a.is_scalar() {
            (OpInput::Scalar(a.tape_begin()), OpConst::Scalar(t.scalar()))
        } else {
            (OpInput::Range(range_of(a)), OpConst::Vector(t.val.clone()))
        }
    } else if a.is_scalar() {
        (OpInput::Scalar(a.tape_begin()), OpConst::Vector(t.val.clone()))
    } else if t.is_scalar() {
        (OpInput::Range(range_of(a)), OpConst::Scalar(t.scalar()))
    } else {
        shape_panic(a.dim(), &t.dim);
    };
    rec(a.tape, kind, input, constant, value)
}

// ── Addition ──────────────────────────────────────────────────────────

fn add_spies<'t>(a: &Spy<'t>, b: &Spy<'t>) -> Spy<'t> {
    same_tape(a, b);
    let value = tzip(a.value(), b.value(), |x, y| x + y);
    if same_handle(a, b) {
        // a + a = 2 a
        return binary_const(OpKind::Mul, a, &Tensor::from(2.0), value);
    }
    binary_free(OpKind::Add, a, b, true, value)
}

fn add_spy_tensor<'t>(a: &Spy<'t>, t: &Tensor) -> Spy<'t> {
    if t.is_scalar() && t.scalar() == 0.0 {
        return identity(a);
    }
    let value = tzip(a.value(), t, |x, y| x + y);
    binary_const(OpKind::Add, a, t, value)
}

fn add_tensor_spy<'t>(t: &Tensor, b: &Spy<'t>) -> Spy<'t> {
    add_spy_tensor(b, t)
}

// ── Subtraction ───────────────────────────────────────────────────────

fn sub_spies<'t>(a: &Spy<'t>, b: &Spy<'t>) -> Spy<'t> {
    same_tape(a, b);
    if same_handle(a, b) {
        return trivial0(a);
    }
    let value = tzip(a.value(), b.value(), |x, y| x - y);
    binary_free(OpKind::Sub, a, b, false, value)
}

fn sub_spy_tensor<'t>(a: &Spy<'t>, t: &Tensor) -> Spy<'t> {
    if t.is_scalar() && t.scalar() == 0.0 {
        return identity(a);
    }
    let value = tzip(a.value(), t, |x, y| x - y);
    binary_const(OpKind::Sub, a, t, value)
}

fn sub_tensor_spy<'t>(t: &Tensor, b: &Spy<'t>) -> Spy<'t> {
    if t.is_scalar() && t.scalar() == 0.0 {
        return unary(OpKind::Negate, b, b.value().map(|x| -x));
    }
    let value = tzip(t, b.value(), |x, y| x - y);
    binary_const(OpKind::SubFrom, b, t, value)
}

// ── Multiplication ────────────────────────────────────────────────────

fn mul_spies<'t>(a: &Spy<'t>, b: &Spy<'t>) -> Spy<'t> {
    same_tape(a, b);
    let value = tzip(a.value(), b.value(), |x, y| x * y);
    if same_handle(a, b) {
        return unary(OpKind::Square, a, value);
    }
    binary_free(OpKind::Mul, a, b, true, value)
}

fn mul_spy_tensor<'t>(a: &Spy<'t>, t: &Tensor) -> Spy<'t> {
    if t.is_scalar() && t.scalar() == 0.0 {
        return trivial0(a);
    }
    if t.is_scalar() && t.scalar() == 1.0 {
        return identity(a);
    }
    let value = tzip(a.value(), t, |x, y| x * y);
    binary_const(OpKind::Mul, a, t, value)
}

fn mul_tensor_spy<'t>(t: &Tensor, b: &Spy<'t>) -> Spy<'t> {
    mul_spy_tensor(b, t)
}

// ── Division ──────────────────────────────────────────────────────────

fn div_spies<'t>(a: &Spy<'t>, b: &Spy<'t>) -> Spy<'t> {
    same_tape(a, b);
    if same_handle(a, b) {
        return trivial1(a);
    }
    let value = tzip(a.value(), b.value(), |x, y| x / y);
    binary_free(OpKind::Div, a, b, false, value)
}

fn div_spy_tensor<'t>(a: &Spy<'t>, t: &Tensor) -> Spy<'t> {
    if t.is_scalar() && t.scalar() == 1.0 {
        return identity(a);
    }
    let value = tzip(a.value(), t, |x, y| x / y);
    binary_const(OpKind::Div, a, t, value)
}

fn div_tensor_spy<'t>(t: &Tensor, b: &Spy<'t>) -> Spy<'t> {
    if t.is_scalar() && t.scalar() == 0.0 {
        return trivial0(b);
    }
    if t.is_scalar() && t.scalar() == 1.0 {
        return unary(OpKind::Invert, b, b.value().map(|x| 1.0 / x));
    }
    let value = tzip(t, b.value(), |x, y| x / y);
    binary_const(OpKind::DivInto, b, t, value)
}

// ── Power ─────────────────────────────────────────────────────────────

fn pow_spies<'t>(a: &Spy<'t>, b: &Spy<'t>) -> Spy<'t> {
    same_tape(a, b);
    let value = tzip(a.value(), b.value(), f64::powf);
    if same_handle(a, b) {
        return unary(OpKind::SelfPow, a, value);
    }
    binary_free(OpKind::Pow, a, b, false, value)
}

fn pow_spy_tensor<'t>(a: &Spy<'t>, t: &Tensor) -> Spy<'t> {
    if t.is_scalar() {
        match t.scalar() {
            c if c == -1.0 => return unary(OpKind::Invert, a, a.value().map(|x| 1.0 / x)),
            c if c == 0.0 => return trivial1(a),
            c if c == 1.0 => return identity(a),
            c if c == 2.0 => return unary(OpKind::Square, a, a.value().map(|x| x * x)),
            c if c == 3.0 => return unary(OpKind::Cube, a, a.value().map(|x| x * x * x)),
            _ => {}
        }
    }
    let value = tzip(a.value(), t, f64::powf);
    binary_const(OpKind::Pow, a, t, value)
}

fn pow_tensor_spy<'t>(t: &Tensor, b: &Spy<'t>) -> Spy<'t> {
    if t.is_scalar() && t.scalar() == 0.0 {
        return trivial0(b);
    }
    if t.is_scalar() && t.scalar() == 1.0 {
        return trivial1(b);
    }
    let value = tzip(t, b.value(), f64::powf);
    binary_const(OpKind::PowExp, b, t, value)
}

/// `base ^ exponent` with a constant base and a recorded exponent.
pub fn pow_base<'t>(base: &Tensor, exponent: &Spy<'t>) -> Spy<'t> {
    pow_tensor_spy(base, exponent)
}

/// `base ^ exponent` with a literal base.
pub fn pow_basef<'t>(base: f64, exponent: &Spy<'t>) -> Spy<'t> {
    pow_tensor_spy(&Tensor::from(base), exponent)
}

// ── std::ops overloads ────────────────────────────────────────────────

macro_rules! spy_binary_op {
    ($OpTrait:ident, $method:ident, $ss:ident, $st:ident, $ts:ident) => {
        impl<'t> $OpTrait<&Spy<'t>> for &Spy<'t> {
            type Output = Spy<'t>;
            fn $method(self, rhs: &Spy<'t>) -> Spy<'t> {
                $ss(self, rhs)
            }
        }
        impl<'t> $OpTrait<Spy<'t>> for &Spy<'t> {
            type Output = Spy<'t>;
            fn $method(self, rhs: Spy<'t>) -> Spy<'t> {
                $ss(self, &rhs)
            }
        }
        impl<'t> $OpTrait<&Spy<'t>> for Spy<'t> {
            type Output = Spy<'t>;
            fn $method(self, rhs: &Spy<'t>) -> Spy<'t> {
                $ss(&self, rhs)
            }
        }
        impl<'t> $OpTrait<Spy<'t>> for Spy<'t> {
            type Output = Spy<'t>;
            fn $method(self, rhs: Spy<'t>) -> Spy<'t> {
                $ss(&self, &rhs)
            }
        }
        impl<'t> $OpTrait<f64> for &Spy<'t> {
            type Output = Spy<'t>;
            fn $method(self, rhs: f64) -> Spy<'t> {
                $st(self, &Tensor::from(rhs))
            }
        }
        impl<'t> $OpTrait<f64> for Spy<'t> {
            type Output = Spy<'t>;
            fn $method(self, rhs: f64) -> Spy<'t> {
                $st(&self, &Tensor::from(rhs))
            }
        }
        impl<'t> $OpTrait<&Spy<'t>> for f64 {
            type Output = Spy<'t>;
            fn $method(self, rhs: &Spy<'t>) -> Spy<'t> {
                $ts(&Tensor::from(self), rhs)
            }
        }
        impl<'t> $OpTrait<Spy<'t>> for f64 {
            type Output = Spy<'t>;
            fn $method(self, rhs: Spy<'t>) -> Spy<'t> {
                $ts(&Tensor::from(self), &rhs)
            }
        }
        impl<'t> $OpTrait<&Tensor> for &Spy<'t> {
            type Output = Spy<'t>;
            fn $method(self, rhs: &Tensor) -> Spy<'t> {
                $st(self, rhs)
            }
        }
        impl<'t> $OpTrait<&Tensor> for Spy<'t> {
            type Output = Spy<'t>;
            fn $method(self, rhs: &Tensor) -> Spy<'t> {
                $st(&self, rhs)
            }
        }
        impl<'t> $OpTrait<&Spy<'t>> for &Tensor {
            type Output = Spy<'t>;
            fn $method(self, rhs: &Spy<'t>) -> Spy<'t> {
                $ts(self, rhs)
            }
        }
        impl<'t> $OpTrait<Spy<'t>> for &Tensor {
            type Output = Spy<'t>;
            fn $method(self, rhs: Spy<'t>) -> Spy<'t> {
                $ts(self, &rhs)
            }
        }
    };
}

spy_binary_op!(Add, add, add_spies, add_spy_tensor, add_tensor_spy);
spy_binary_op!(Sub, sub, sub_spies, sub_spy_tensor, sub_tensor_spy);
spy_binary_op!(Mul, mul, mul_spies, mul_spy_tensor, mul_tensor_spy);
spy_binary_op!(Div, div, div_spies, div_spy_tensor, div_tensor_spy);

impl<'t> Neg for &Spy<'t> {
    type Output = Spy<'t>;
    fn neg(self) -> Spy<'t> {
        unary(OpKind::Negate, self, self.value().map(|x| -x))
    }
}

impl<'t> Neg for Spy<'t> {
    type Output = Spy<'t>;
    fn neg(self) -> Spy<'t> {
        -&self
    }
}

// ── Unary functions, powers, comparisons, aggregators ─────────────────

impl<'t> Spy<'t> {
    pub fn log(&self) -> Spy<'t> {
        unary(OpKind::Log, self, self.value().map(f64::ln))
    }

    pub fn log1p(&self) -> Spy<'t> {
        unary(OpKind::Log1p, self, self.value().map(f64::ln_1p))
    }

    /// `log(1 - x)`.
    pub fn log1m(&self) -> Spy<'t> {
        unary(OpKind::Log1m, self, self.value().map(|x| (-x).ln_1p()))
    }

    pub fn exp(&self) -> Spy<'t> {
        unary(OpKind::Exp, self, self.value().map(f64::exp))
    }

    pub fn lgamma(&self) -> Spy<'t> {
        unary(
            OpKind::LogGamma,
            self,
            self.value().map(crate::special::ln_gamma),
        )
    }

    /// `log(x / (1 - x))`.
    pub fn logit(&self) -> Spy<'t> {
        unary(OpKind::Logit, self, self.value().map(|x| (x / (1.0 - x)).ln()))
    }

    /// `1 / (1 + exp(-x))`.
    pub fn logistic(&self) -> Spy<'t> {
        unary(
            OpKind::Logistic,
            self,
            self.value().map(|x| 1.0 / (1.0 + (-x).exp())),
        )
    }

    pub fn sin(&self) -> Spy<'t> {
        unary(OpKind::Sin, self, self.value().map(f64::sin))
    }

    pub fn cos(&self) -> Spy<'t> {
        unary(OpKind::Cos, self, self.value().map(f64::cos))
    }

    /// `self ^ exponent` with a recorded exponent.
    pub fn pow(&self, exponent: &Spy<'t>) -> Spy<'t> {
        pow_spies(self, exponent)
    }

    /// `self ^ exponent` with a fixed tensor exponent.
    pub fn pow_const(&self, exponent: &Tensor) -> Spy<'t> {
        pow_spy_tensor(self, exponent)
    }

    /// `self ^ exponent` with a literal exponent.
    pub fn powf(&self, exponent: f64) -> Spy<'t> {
        pow_spy_tensor(self, &Tensor::from(exponent))
    }

    /// Iverson bracket `[self > 0]`.
    pub fn gt0(&self) -> Spy<'t> {
        unary(
            OpKind::IversonGt,
            self,
            self.value().map(|x| if x > 0.0 { 1.0 } else { 0.0 }),
        )
    }

    /// Iverson bracket `[self >= 0]`.
    pub fn ge0(&self) -> Spy<'t> {
        unary(
            OpKind::IversonGe,
            self,
            self.value().map(|x| if x >= 0.0 { 1.0 } else { 0.0 }),
        )
    }

    /// Log-scale barrier `log[self > 0]`: 0 on the support, -inf outside,
    /// with zero partials everywhere.
    pub fn log_gt0(&self) -> Spy<'t> {
        unary(
            OpKind::LogIversonGt,
            self,
            self.value()
                .map(|x| if x > 0.0 { 0.0 } else { f64::NEG_INFINITY }),
        )
    }

    /// Log-scale barrier `log[self >= 0]`.
    pub fn log_ge0(&self) -> Spy<'t> {
        unary(
            OpKind::LogIversonGe,
            self,
            self.value()
                .map(|x| if x >= 0.0 { 0.0 } else { f64::NEG_INFINITY }),
        )
    }

    /// Iverson bracket `[self > other]`.
    pub fn gt(&self, other: &Spy<'t>) -> Spy<'t> {
        same_tape(self, other);
        if same_handle(self, other) {
            return trivial0(self);
        }
        (self - other).gt0()
    }

    /// Iverson bracket `[self >= other]`.
    pub fn ge(&self, other: &Spy<'t>) -> Spy<'t> {
        same_tape(self, other);
        if same_handle(self, other) {
            return trivial1(self);
        }
        (self - other).ge0()
    }

    /// Iverson bracket `[self < other]`.
    pub fn lt(&self, other: &Spy<'t>) -> Spy<'t> {
        other.gt(self)
    }

    /// Iverson bracket `[self <= other]`.
    pub fn le(&self, other: &Spy<'t>) -> Spy<'t> {
        other.ge(self)
    }

    /// Iverson bracket `[self > c]`.
    pub fn gtf(&self, c: f64) -> Spy<'t> {
        (self - c).gt0()
    }

    /// Iverson bracket `[self >= c]`.
    pub fn gef(&self, c: f64) -> Spy<'t> {
        (self - c).ge0()
    }

    /// Iverson bracket `[self < c]`.
    pub fn ltf(&self, c: f64) -> Spy<'t> {
        (c - self).gt0()
    }

    /// Iverson bracket `[self <= c]`.
    pub fn lef(&self, c: f64) -> Spy<'t> {
        (c - self).ge0()
    }

    /// Sum of all elements.
    pub fn sum(&self) -> Spy<'t> {
        rec(
            self.tape,
            OpKind::Sum,
            OpInput::Range(range_of(self)),
            OpConst::None,
            Tensor::from(self.value().sum()),
        )
    }

    /// Sum of squared elements.
    pub fn sumsq(&self) -> Spy<'t> {
        rec(
            self.tape,
            OpKind::SumSq,
            OpInput::Range(range_of(self)),
            OpConst::None,
            Tensor::from(self.value().sumsq()),
        )
    }

    /// Dot product against a fixed vector.
    pub fn dot_const(&self, t: &Tensor) -> Spy<'t> {
        assert_eq!(self.len(), t.len());
        if self.is_scalar() {
            return mul_spy_tensor(self, t);
        }
        rec(
            self.tape,
            OpKind::Dot,
            OpInput::Range(range_of(self)),
            OpConst::Vector(t.val.clone()),
            Tensor::from(self.value().dot(t)),
        )
    }

    /// Matrix product `self * t` with a fixed right factor.
    pub fn matmult_const(&self, t: &Tensor) -> Spy<'t> {
        let value = self
            .value()
            .matmult(t)
            .unwrap_or_else(|e| panic!("{e}"));
        rec(
            self.tape,
            OpKind::MatMul,
            matrix_of(self),
            OpConst::Matrix(t.clone()),
            value,
        )
    }
}

/// Dot product of two recorded vectors.
pub fn dot<'t>(a: &Spy<'t>, b: &Spy<'t>) -> Spy<'t> {
    same_tape(a, b);
    assert_eq!(a.len(), b.len());
    if same_handle(a, b) {
        return a.sumsq();
    }
    if a.is_scalar() {
        return mul_spies(a, b);
    }
    rec(
        a.tape,
        OpKind::Dot,
        OpInput::RangePair(range_of(a), range_of(b)),
        OpConst::None,
        Tensor::from(a.value().dot(b.value())),
    )
}

/// Matrix product of two recorded 2-D tensors.
pub fn matmult<'t>(a: &Spy<'t>, b: &Spy<'t>) -> Spy<'t> {
    same_tape(a, b);
    assert!(a.is_matrix() && b.is_matrix(), "matrix product needs 2-D operands");
    let value = a
        .value()
        .matmult(b.value())
        .unwrap_or_else(|e| panic!("{e}"));
    rec(
        a.tape,
        OpKind::MatMul,
        OpInput::MatrixPair(
            range_of(a),
            [a.value().nrow(), a.value().ncol()],
            range_of(b),
            [b.value().nrow(), b.value().ncol()],
        ),
        OpConst::None,
        value,
    )
}

/// Matrix product `t * b` with a fixed left factor.
pub fn matmult_const_left<'t>(t: &Tensor, b: &Spy<'t>) -> Spy<'t> {
    let value = t.matmult(b.value()).unwrap_or_else(|e| panic!("{e}"));
    rec(
        b.tape,
        OpKind::MatMulConstLeft,
        matrix_of(b),
        OpConst::Matrix(t.clone()),
        value,
    )
}

/// Sum of Bernoulli log-likelihoods `sum log(p y + (1 - p)(1 - y))` for a
/// recorded probability vector `p` and a fixed binary outcome vector `y`.
pub fn sum_log_dbern<'t>(p: &Spy<'t>, y: &Tensor) -> Spy<'t> {
    assert_eq!(p.len(), y.len());
    debug_assert!(y.val.iter().all(|&v| v == 0.0 || v == 1.0));
    let value: f64 = p
        .value()
        .val
        .iter()
        .zip(&y.val)
        .map(|(&pi, &yi)| if yi != 0.0 { pi.ln() } else { (-pi).ln_1p() })
        .sum();
    rec(
        p.tape,
        OpKind::BernoulliLogLik,
        OpInput::Range(range_of(p)),
        OpConst::Vector(y.val.clone()),
        Tensor::from(value),
    )
}
