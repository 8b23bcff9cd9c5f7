//! Primitive operators of the expression graph.
//!
//! Every recorded operation is an [`Op`]: a kind tag, an input descriptor
//! over trace slots, an optional constant operand, and a contiguous output
//! range. The builder picks the cheapest variant from operand shapes and
//! freedom mix (free operands live on the trace; fixed operands are stored
//! as constants on the operator itself).
//!
//! Each operator exposes three capabilities used by trace playback:
//! forward evaluation, local first partials, and local second partials over
//! its vectorized free inputs. Sparsity tags let the reverse sweep skip
//! provably zero contributions, and element-wise operators expose the small
//! candidate set of input positions that can interact with a given output
//! position instead of the generic all-pairs loops.

mod aggregate;
mod arith;
mod divide;
mod iverson;
mod matmul;
mod power;
mod unary;

use crate::tensor::Tensor;

/// Contiguous range of trace slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRange {
    pub begin: usize,
    pub end: usize,
}

impl SlotRange {
    pub fn new(begin: usize, end: usize) -> Self {
        debug_assert!(begin <= end);
        SlotRange { begin, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Slot at local offset `i`.
    pub fn slot(&self, i: usize) -> usize {
        debug_assert!(self.begin + i < self.end);
        self.begin + i
    }

    /// True when two ranges share no slot.
    pub fn disjoint(&self, other: &SlotRange) -> bool {
        self.end <= other.begin || other.end <= self.begin
    }
}

/// Free (trace-backed) inputs of an operator.
///
/// Vectorized local indexing runs left operand first, then right:
/// for a pair of ranges of length `n`, local index `i` addresses the left
/// element `i` and `i + n` the right element `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpInput {
    /// One scalar slot.
    Scalar(usize),
    /// Two scalar slots (both free).
    ScalarPair(usize, usize),
    /// One contiguous range.
    Range(SlotRange),
    /// Two contiguous ranges of equal length (both free).
    RangePair(SlotRange, SlotRange),
    /// A range and a broadcast scalar slot (both free).
    RangeScalar(SlotRange, usize),
    /// A broadcast scalar slot and a range (both free).
    ScalarRange(usize, SlotRange),
    /// A 2-D tensor: range plus `[nrow, ncol]`.
    Matrix(SlotRange, [usize; 2]),
    /// Two 2-D tensors (both free).
    MatrixPair(SlotRange, [usize; 2], SlotRange, [usize; 2]),
}

impl OpInput {
    /// Number of vectorized free input positions.
    pub fn len(&self) -> usize {
        match self {
            OpInput::Scalar(_) => 1,
            OpInput::ScalarPair(..) => 2,
            OpInput::Range(r) => r.len(),
            OpInput::RangePair(l, r) => l.len() + r.len(),
            OpInput::RangeScalar(l, _) => l.len() + 1,
            OpInput::ScalarRange(_, r) => 1 + r.len(),
            OpInput::Matrix(r, _) => r.len(),
            OpInput::MatrixPair(l, _, r, _) => l.len() + r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Trace slot of vectorized local input `j`.
    pub fn slot(&self, j: usize) -> usize {
        match self {
            OpInput::Scalar(s) => {
                debug_assert_eq!(j, 0);
                *s
            }
            OpInput::ScalarPair(a, b) => {
                if j == 0 {
                    *a
                } else {
                    *b
                }
            }
            OpInput::Range(r) | OpInput::Matrix(r, _) => r.slot(j),
            OpInput::RangePair(l, r) | OpInput::MatrixPair(l, _, r, _) => {
                if j < l.len() {
                    l.slot(j)
                } else {
                    r.slot(j - l.len())
                }
            }
            OpInput::RangeScalar(l, s) => {
                if j < l.len() {
                    l.slot(j)
                } else {
                    *s
                }
            }
            OpInput::ScalarRange(s, r) => {
                if j == 0 {
                    *s
                } else {
                    r.slot(j - 1)
                }
            }
        }
    }
}

/// Fixed operand stored with the operator, not part of the trace.
#[derive(Debug, Clone, PartialEq)]
pub enum OpConst {
    None,
    Scalar(f64),
    Vector(Vec<f64>),
    Matrix(Tensor),
}

/// Operator kind. Shape and freedom mix live in [`OpInput`]/[`OpConst`];
/// the kind carries the semantics, with a reversed variant wherever a
/// non-commutative family can hold its constant on the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    // Element-wise binary arithmetic.
    Add,
    /// `a - b` with `a` free or on the left.
    Sub,
    /// `c - b` with the constant on the left.
    SubFrom,
    Mul,
    /// `a / b` with `a` free or on the left.
    Div,
    /// `c / b` with the constant numerator on the left.
    DivInto,
    /// `a ^ b` with the base free or on the left.
    Pow,
    /// `c ^ b` with a constant base.
    PowExp,

    // Matrix product.
    MatMul,
    /// Matrix product with a constant left factor.
    MatMulConstLeft,

    // Unary.
    Identity,
    Trivial0,
    Trivial1,
    Negate,
    Invert,
    Square,
    Cube,
    Log,
    Log1p,
    Log1m,
    Exp,
    SelfPow,
    LogGamma,
    Logit,
    Logistic,
    Sin,
    Cos,

    // Iverson brackets.
    IversonGt,
    IversonGe,
    LogIversonGt,
    LogIversonGe,

    // Aggregators with scalar output.
    Sum,
    SumSq,
    Dot,
    BernoulliLogLik,
}

/// Compile-time-style sparsity knowledge about an operator instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpTags {
    /// Every first partial is zero (trivial and Iverson operators).
    pub partial_always_zero: bool,
    /// Local Hessian diagonal is identically zero.
    pub hessian_diag_zero: bool,
    /// Local Hessian off-diagonal is identically zero.
    pub hessian_off_diag_zero: bool,
    /// Output element `i` depends only on input position `i` (plus the
    /// broadcast companion for paired shapes).
    pub element_wise: bool,
}

impl OpTags {
    pub fn hessian_zero(&self) -> bool {
        self.hessian_diag_zero && self.hessian_off_diag_zero
    }
}

/// Input positions that can carry a nonzero partial for a given output
/// position. Element-wise shapes restrict the generic loop to one or two
/// candidates.
#[derive(Debug, Clone, Copy)]
pub enum Candidates {
    One(usize),
    Two(usize, usize),
    All(usize),
}

/// A recorded operator instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Op {
    pub kind: OpKind,
    pub input: OpInput,
    pub constant: OpConst,
    pub out: SlotRange,
}

impl Op {
    /// Output width implied by a family's shape rule: element-wise operators
    /// match their widest operand, aggregators collapse to one slot, and a
    /// matrix product spans `rows(left) * cols(right)`.
    pub fn output_width(kind: OpKind, input: &OpInput, constant: &OpConst) -> usize {
        use OpKind::*;
        match kind {
            Sum | SumSq | Dot | BernoulliLogLik => 1,
            MatMul => match (input, constant) {
                (OpInput::MatrixPair(_, ld, _, rd), _) => ld[0] * rd[1],
                (OpInput::Matrix(_, d), OpConst::Matrix(t)) => d[0] * t.ncol(),
                _ => unreachable!("matmul operand layout"),
            },
            MatMulConstLeft => match (input, constant) {
                (OpInput::Matrix(_, d), OpConst::Matrix(t)) => t.nrow() * d[1],
                _ => unreachable!("matmul operand layout"),
            },
            _ => match (input, constant) {
                (OpInput::Scalar(_), OpConst::Vector(c)) => c.len(),
                (OpInput::Scalar(_), _) => 1,
                (OpInput::ScalarPair(..), _) => 1,
                (OpInput::Range(r), _) => r.len(),
                (OpInput::RangePair(l, _), _) => l.len(),
                (OpInput::RangeScalar(l, _), _) => l.len(),
                (OpInput::ScalarRange(_, r), _) => r.len(),
                _ => unreachable!("element-wise operand layout"),
            },
        }
    }

    /// Evaluate into `values[out]` from `values[input]` and the constant.
    pub fn evaluate(&self, values: &mut [f64]) {
        use OpKind::*;
        match self.kind {
            Add | Sub | SubFrom | Mul => arith::evaluate(self, values),
            Div | DivInto => divide::evaluate(self, values),
            Pow | PowExp => power::evaluate(self, values),
            MatMul | MatMulConstLeft => matmul::evaluate(self, values),
            Sum | SumSq | Dot | BernoulliLogLik => aggregate::evaluate(self, values),
            IversonGt | IversonGe | LogIversonGt | LogIversonGe => {
                iverson::evaluate(self, values)
            }
            _ => unary::evaluate(self, values),
        }
    }

    /// Local Jacobian entry d out\[i\] / d in\[j\] over vectorized free inputs.
    pub fn partial(&self, values: &[f64], i: usize, j: usize) -> f64 {
        use OpKind::*;
        match self.kind {
            Add | Sub | SubFrom | Mul => arith::partial(self, values, i, j),
            Div | DivInto => divide::partial(self, values, i, j),
            Pow | PowExp => power::partial(self, values, i, j),
            MatMul | MatMulConstLeft => matmul::partial(self, values, i, j),
            Sum | SumSq | Dot | BernoulliLogLik => aggregate::partial(self, values, i, j),
            IversonGt | IversonGe | LogIversonGt | LogIversonGe => 0.0,
            _ => unary::partial(self, values, i, j),
        }
    }

    /// Local Hessian entry d2 out\[i\] / d in\[j\] d in\[k\].
    pub fn partial2(&self, values: &[f64], i: usize, j: usize, k: usize) -> f64 {
        use OpKind::*;
        match self.kind {
            Add | Sub | SubFrom => 0.0,
            Mul => arith::partial2(self, values, i, j, k),
            Div | DivInto => divide::partial2(self, values, i, j, k),
            Pow | PowExp => power::partial2(self, values, i, j, k),
            MatMul | MatMulConstLeft => matmul::partial2(self, values, i, j, k),
            Sum | SumSq | Dot | BernoulliLogLik => aggregate::partial2(self, values, i, j, k),
            IversonGt | IversonGe | LogIversonGt | LogIversonGe => 0.0,
            _ => unary::partial2(self, values, i, j, k),
        }
    }

    /// Sparsity tags of this instance.
    pub fn tags(&self) -> OpTags {
        use OpKind::*;
        let ew = matches!(
            self.input,
            OpInput::Range(_)
                | OpInput::RangePair(..)
                | OpInput::RangeScalar(..)
                | OpInput::ScalarRange(..)
        );
        let fixed = !matches!(self.constant, OpConst::None);
        match self.kind {
            Add | Sub | SubFrom | Identity | Negate => OpTags {
                hessian_diag_zero: true,
                hessian_off_diag_zero: true,
                element_wise: ew,
                ..Default::default()
            },
            Mul => OpTags {
                hessian_diag_zero: true,
                hessian_off_diag_zero: fixed,
                element_wise: ew,
                ..Default::default()
            },
            Div => OpTags {
                hessian_diag_zero: fixed,
                hessian_off_diag_zero: fixed,
                element_wise: ew,
                ..Default::default()
            },
            DivInto | Pow | PowExp | Invert | Square | Cube | Log | Log1p | Log1m | Exp
            | SelfPow | LogGamma | Logit | Logistic | Sin | Cos => OpTags {
                element_wise: ew,
                ..Default::default()
            },
            Trivial0 | Trivial1 => OpTags {
                partial_always_zero: true,
                hessian_diag_zero: true,
                hessian_off_diag_zero: true,
                element_wise: ew,
                ..Default::default()
            },
            IversonGt | IversonGe | LogIversonGt | LogIversonGe => OpTags {
                partial_always_zero: true,
                hessian_diag_zero: true,
                hessian_off_diag_zero: true,
                element_wise: ew,
                ..Default::default()
            },
            MatMul => OpTags {
                hessian_diag_zero: true,
                hessian_off_diag_zero: fixed,
                ..Default::default()
            },
            MatMulConstLeft => OpTags {
                hessian_diag_zero: true,
                hessian_off_diag_zero: true,
                ..Default::default()
            },
            Sum => OpTags {
                hessian_diag_zero: true,
                hessian_off_diag_zero: true,
                ..Default::default()
            },
            SumSq | BernoulliLogLik => OpTags {
                hessian_off_diag_zero: true,
                ..Default::default()
            },
            Dot => OpTags {
                hessian_diag_zero: true,
                hessian_off_diag_zero: fixed,
                ..Default::default()
            },
        }
    }

    /// Input positions whose partial against output position `i` can be
    /// nonzero. Scalar layouts are unrolled; element-wise shapes pair the
    /// matching position with its broadcast companion; everything else
    /// falls back to the full input set.
    pub fn candidates(&self, i: usize) -> Candidates {
        let ew = self.tags().element_wise;
        match (&self.input, ew) {
            (OpInput::Scalar(_), _) => Candidates::One(0),
            (OpInput::ScalarPair(..), _) => Candidates::Two(0, 1),
            (OpInput::Range(_), true) => Candidates::One(i),
            (OpInput::RangePair(l, _), true) => Candidates::Two(i, i + l.len()),
            (OpInput::RangeScalar(l, _), true) => Candidates::Two(i, l.len()),
            (OpInput::ScalarRange(..), true) => Candidates::Two(0, i + 1),
            _ => Candidates::All(self.input.len()),
        }
    }
}

/// Dispatch table shared by the element-wise binary families.
///
/// Resolves the `(input, constant)` layout so family modules only provide
/// the scalar math: `f(p, s)` where `p` is the left/free operand value and
/// `s` the right/constant one.
pub(crate) fn eval_binary(op: &Op, values: &mut [f64], f: impl Fn(f64, f64) -> f64) {
    let out = op.out;
    match (&op.input, &op.constant) {
        (OpInput::ScalarPair(a, b), OpConst::None) => {
            values[out.begin] = f(values[*a], values[*b]);
        }
        (OpInput::RangePair(l, r), OpConst::None) => {
            debug_assert_eq!(l.len(), r.len());
            for i in 0..l.len() {
                values[out.slot(i)] = f(values[l.slot(i)], values[r.slot(i)]);
            }
        }
        (OpInput::RangeScalar(l, s), OpConst::None) => {
            let b = values[*s];
            for i in 0..l.len() {
                values[out.slot(i)] = f(values[l.slot(i)], b);
            }
        }
        (OpInput::ScalarRange(s, r), OpConst::None) => {
            let a = values[*s];
            for i in 0..r.len() {
                values[out.slot(i)] = f(a, values[r.slot(i)]);
            }
        }
        (OpInput::Scalar(s), OpConst::Scalar(c)) => {
            values[out.begin] = f(values[*s], *c);
        }
        (OpInput::Scalar(s), OpConst::Vector(c)) => {
            let a = values[*s];
            for (i, &ci) in c.iter().enumerate() {
                values[out.slot(i)] = f(a, ci);
            }
        }
        (OpInput::Range(r), OpConst::Scalar(c)) => {
            for i in 0..r.len() {
                values[out.slot(i)] = f(values[r.slot(i)], *c);
            }
        }
        (OpInput::Range(r), OpConst::Vector(c)) => {
            debug_assert_eq!(r.len(), c.len());
            for i in 0..r.len() {
                values[out.slot(i)] = f(values[r.slot(i)], c[i]);
            }
        }
        _ => unreachable!("element-wise operand layout"),
    }
}

/// Operand values of an element-wise binary op at output position `i`,
/// or `None` when local input `j` cannot touch output `i`.
///
/// The flag in the result distinguishes the left/free position (`true`)
/// from the right position of a free pair (`false`).
pub(crate) fn binary_operand(op: &Op, values: &[f64], i: usize, j: usize) -> Option<(f64, f64, bool)> {
    match (&op.input, &op.constant) {
        (OpInput::ScalarPair(a, b), OpConst::None) => {
            let (p, s) = (values[*a], values[*b]);
            match j {
                0 => Some((p, s, true)),
                1 => Some((p, s, false)),
                _ => None,
            }
        }
        (OpInput::RangePair(l, r), OpConst::None) => {
            let n = l.len();
            let (p, s) = (values[l.slot(i)], values[r.slot(i)]);
            if j == i {
                Some((p, s, true))
            } else if j == i + n {
                Some((p, s, false))
            } else {
                None
            }
        }
        (OpInput::RangeScalar(l, s), OpConst::None) => {
            let n = l.len();
            let (p, q) = (values[l.slot(i)], values[*s]);
            if j == i {
                Some((p, q, true))
            } else if j == n {
                Some((p, q, false))
            } else {
                None
            }
        }
        (OpInput::ScalarRange(s, r), OpConst::None) => {
            let (p, q) = (values[*s], values[r.slot(i)]);
            if j == 0 {
                Some((p, q, true))
            } else if j == i + 1 {
                Some((p, q, false))
            } else {
                None
            }
        }
        (OpInput::Scalar(s), OpConst::Scalar(c)) => {
            if j == 0 {
                Some((values[*s], *c, true))
            } else {
                None
            }
        }
        (OpInput::Scalar(s), OpConst::Vector(c)) => {
            if j == 0 {
                Some((values[*s], c[i], true))
            } else {
                None
            }
        }
        (OpInput::Range(r), OpConst::Scalar(c)) => {
            if j == i {
                Some((values[r.slot(i)], *c, true))
            } else {
                None
            }
        }
        (OpInput::Range(r), OpConst::Vector(c)) => {
            if j == i {
                Some((values[r.slot(i)], c[i], true))
            } else {
                None
            }
        }
        _ => unreachable!("element-wise operand layout"),
    }
}

/// First-partial dispatch for element-wise binary families:
/// `d_p` differentiates against the left/free operand, `d_s` against the
/// right operand of a free pair.
pub(crate) fn partial_binary(
    op: &Op,
    values: &[f64],
    i: usize,
    j: usize,
    d_p: impl Fn(f64, f64) -> f64,
    d_s: impl Fn(f64, f64) -> f64,
) -> f64 {
    match binary_operand(op, values, i, j) {
        Some((p, s, true)) => d_p(p, s),
        Some((p, s, false)) => d_s(p, s),
        None => 0.0,
    }
}

/// Second-partial dispatch for element-wise binary families. The three
/// closures are d2/dp2, d2/dpds and d2/ds2 over `(p, s)` operand values.
pub(crate) fn partial2_binary(
    op: &Op,
    values: &[f64],
    i: usize,
    j: usize,
    k: usize,
    d_pp: impl Fn(f64, f64) -> f64,
    d_ps: impl Fn(f64, f64) -> f64,
    d_ss: impl Fn(f64, f64) -> f64,
) -> f64 {
    let a = binary_operand(op, values, i, j);
    let b = binary_operand(op, values, i, k);
    match (a, b) {
        (Some((p, s, true)), Some((_, _, true))) => d_pp(p, s),
        (Some((p, s, false)), Some((_, _, false))) => d_ss(p, s),
        (Some((p, s, _)), Some(_)) => d_ps(p, s),
        _ => 0.0,
    }
}

/// Forward-evaluation dispatch for unary families (scalar or range shape).
pub(crate) fn eval_unary(op: &Op, values: &mut [f64], f: impl Fn(f64) -> f64) {
    match &op.input {
        OpInput::Scalar(s) => values[op.out.begin] = f(values[*s]),
        OpInput::Range(r) => {
            debug_assert_eq!(r.len(), op.out.len());
            for i in 0..r.len() {
                values[op.out.slot(i)] = f(values[r.slot(i)]);
            }
        }
        _ => unreachable!("unary operand layout"),
    }
}

/// Operand value of a unary op at output `i` when input `j` matches,
/// `None` otherwise.
pub(crate) fn unary_operand(op: &Op, values: &[f64], i: usize, j: usize) -> Option<f64> {
    match &op.input {
        OpInput::Scalar(s) => {
            if j == 0 {
                Some(values[*s])
            } else {
                None
            }
        }
        OpInput::Range(r) => {
            if j == i {
                Some(values[r.slot(i)])
            } else {
                None
            }
        }
        _ => unreachable!("unary operand layout"),
    }
}
