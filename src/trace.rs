//! Numerical state bound to a tape: values, adjoints, sparse Hessian.
//!
//! `play_forward` evaluates operators in record order; `play_reverse` runs
//! the edge-pushing second-order adjoint sweep in reverse record order. For
//! the mathematics see Wang, Gebremedhin & Pothen, "Capitalizing on live
//! variables: new algorithms for efficient Hessian computation via
//! automatic differentiation", Math. Prog. Comp. 8 (2016).
//!
//! The sweep distinguishes operand pairs of the current node (creating
//! part), pairs with exactly one live neighbor (pushing), and skips
//! non-operand pairs entirely. Correctness depends on reverse record order
//! plus the invariant that when a node is visited, every Hessian row with a
//! higher slot index has already been erased.

use crate::op::{Candidates, Op};
use crate::sparse::SparseSymMat;
use crate::spy::Spy;
use crate::tape::Tape;
use crate::tensor::Tensor;

/// Trace of function, gradient, and Hessian evaluation over one tape.
#[derive(Debug)]
pub struct Trace<'t> {
    /// The immutable tape this trace replays.
    pub tape: &'t Tape,
    /// Function values, one per trace slot.
    pub values: Vec<f64>,
    /// Adjoints of the final scalar with respect to every slot.
    pub adjoints: Vec<f64>,
    /// Sparse symmetric Hessian; after a reverse sweep its support is
    /// restricted to free-input slots.
    pub hessian: SparseSymMat,
}

impl<'t> Trace<'t> {
    /// Allocate buffers for `tape` and seed the input slots with the tape's
    /// initial values.
    pub fn new(tape: &'t Tape) -> Self {
        let mut values = vec![0.0; tape.trace_len()];
        let init = tape.initial_values();
        values[..init.len()].copy_from_slice(&init);
        Trace {
            tape,
            values,
            adjoints: vec![0.0; tape.trace_len()],
            hessian: SparseSymMat::new(tape.input_len()),
        }
    }

    /// The last trace value: the recorded objective.
    pub fn result(&self) -> f64 {
        *self.values.last().expect("empty trace")
    }

    /// First partial of the objective with respect to slot `j`.
    pub fn partial(&self, j: usize) -> f64 {
        self.adjoints[j]
    }

    /// Second partial of the objective with respect to slots `j` and `k`.
    pub fn partial2(&self, j: usize, k: usize) -> f64 {
        self.hessian.read(j, k)
    }

    /// Current scalar value of a handle.
    pub fn read_scalar(&self, spy: &Spy<'t>) -> f64 {
        debug_assert!(spy.is_scalar());
        self.values[spy.tape_begin()]
    }

    /// Current values of a handle's range.
    pub fn read(&self, spy: &Spy<'t>) -> Vec<f64> {
        self.values[spy.tape_begin()..spy.tape_end()].to_vec()
    }

    /// Current values of a handle, shaped like the handle.
    pub fn read_tensor(&self, spy: &Spy<'t>) -> Tensor {
        Tensor::from_parts(self.read(spy), spy.dim().to_vec())
    }

    /// Evaluate all operators in record order, in place.
    pub fn play_forward(&mut self) -> &mut Self {
        let tape = self.tape;
        let ops = tape.ops();
        for op in ops.iter() {
            op.evaluate(&mut self.values);
        }
        self
    }

    /// Reverse sweep: seed the last adjoint, clear the Hessian, and visit
    /// operators in reverse record order updating adjoints and pushing
    /// Hessian contributions.
    pub fn play_reverse(&mut self) -> &mut Self {
        for a in &mut self.adjoints {
            *a = 0.0;
        }
        *self.adjoints.last_mut().expect("empty trace") = 1.0;
        self.hessian.clear();

        let tape = self.tape;
        let ops = tape.ops();
        for op in ops.iter().rev() {
            self.reverse_op(op);
        }
        self
    }

    /// Forward then reverse: the canonical refresh after any input change.
    pub fn play(&mut self) -> &mut Self {
        self.play_forward();
        self.play_reverse();
        self
    }

    fn reverse_op(&mut self, op: &Op) {
        let tags = op.tags();
        for i_local in 0..op.out.len() {
            let i = op.out.slot(i_local);
            let w = self.adjoints[i];

            // Adjoint update: a(j) += d out_i / d in_j * a(i).
            if w != 0.0 && !tags.partial_always_zero {
                self.for_each_partial(op, i_local, |trace, slot, d| {
                    trace.adjoints[slot] += d * w;
                });
            }

            // Hessian update:
            // h(j,k) += di/dk h(i,j) + di/dj h(i,k)   (pushing part 1)
            //         + di/dj di/dk h(i,i)            (pushing part 2)
            //         + d2i/djdk a(i)                 (creating part)
            // Each term is skipped whenever a factor is zero.
            let row_i = self.hessian.row_entries(i);
            let mut h_ii = 0.0;

            for &(l, h_il) in &row_i {
                if l == i {
                    h_ii = h_il;
                    continue;
                }
                self.for_each_partial(op, i_local, |trace, slot, d| {
                    // The two orderings di/dk h(i,l) and di/dl h(i,k) land
                    // on the same diagonal entry when the operand is the
                    // live neighbor itself.
                    let scale = if slot == l { 2.0 } else { 1.0 };
                    trace.hessian.add(l, slot, scale * d * h_il);
                });
            }

            if h_ii != 0.0 {
                self.for_each_partial_pair(op, i_local, |trace, (sj, dj), (sk, dk)| {
                    trace.hessian.add(sj, sk, dj * dk * h_ii);
                });
            }

            if w != 0.0 && !tags.hessian_zero() {
                self.creating_part(op, i_local, w, &tags);
            }

            // Housekeeping: node i leaves the live set.
            if !row_i.is_empty() {
                self.hessian.erase(i);
            }
        }
    }

    /// Visit every free input position with a nonzero first partial against
    /// output position `i_local`, passing its trace slot and partial value.
    fn for_each_partial(
        &mut self,
        op: &Op,
        i_local: usize,
        mut f: impl FnMut(&mut Self, usize, f64),
    ) {
        match op.candidates(i_local) {
            Candidates::One(j) => {
                let d = op.partial(&self.values, i_local, j);
                if d != 0.0 {
                    f(self, op.input.slot(j), d);
                }
            }
            Candidates::Two(j, k) => {
                let dj = op.partial(&self.values, i_local, j);
                if dj != 0.0 {
                    f(self, op.input.slot(j), dj);
                }
                let dk = op.partial(&self.values, i_local, k);
                if dk != 0.0 {
                    f(self, op.input.slot(k), dk);
                }
            }
            Candidates::All(n) => {
                for j in 0..n {
                    let d = op.partial(&self.values, i_local, j);
                    if d != 0.0 {
                        f(self, op.input.slot(j), d);
                    }
                }
            }
        }
    }

    /// Visit every unordered pair of free input positions (diagonal pairs
    /// included) whose first partials are both nonzero.
    fn for_each_partial_pair(
        &mut self,
        op: &Op,
        i_local: usize,
        mut f: impl FnMut(&mut Self, (usize, f64), (usize, f64)),
    ) {
        match op.candidates(i_local) {
            Candidates::One(j) => {
                let d = op.partial(&self.values, i_local, j);
                if d != 0.0 {
                    let s = op.input.slot(j);
                    f(self, (s, d), (s, d));
                }
            }
            Candidates::Two(j, k) => {
                let dj = op.partial(&self.values, i_local, j);
                let dk = op.partial(&self.values, i_local, k);
                let (sj, sk) = (op.input.slot(j), op.input.slot(k));
                if dj != 0.0 {
                    f(self, (sj, dj), (sj, dj));
                }
                if dk != 0.0 {
                    f(self, (sk, dk), (sk, dk));
                }
                if dj != 0.0 && dk != 0.0 {
                    f(self, (sj, dj), (sk, dk));
                }
            }
            Candidates::All(n) => {
                for j in 0..n {
                    let dj = op.partial(&self.values, i_local, j);
                    if dj == 0.0 {
                        continue;
                    }
                    let sj = op.input.slot(j);
                    for k in j..n {
                        let dk = op.partial(&self.values, i_local, k);
                        if dk == 0.0 {
                            continue;
                        }
                        f(self, (sj, dj), (op.input.slot(k), dk));
                    }
                }
            }
        }
    }

    /// Creating part: h(j,k) += d2 out_i / d in_j d in_k * a(i), with the
    /// diagonal and off-diagonal halves gated by the operator's tags.
    fn creating_part(&mut self, op: &Op, i_local: usize, w: f64, tags: &crate::op::OpTags) {
        let diag = !tags.hessian_diag_zero;
        let offdiag = !tags.hessian_off_diag_zero;
        match op.candidates(i_local) {
            Candidates::One(j) => {
                if diag {
                    let d2 = op.partial2(&self.values, i_local, j, j);
                    if d2 != 0.0 {
                        let s = op.input.slot(j);
                        self.hessian.add(s, s, d2 * w);
                    }
                }
            }
            Candidates::Two(j, k) => {
                if diag {
                    let d2 = op.partial2(&self.values, i_local, j, j);
                    if d2 != 0.0 {
                        let s = op.input.slot(j);
                        self.hessian.add(s, s, d2 * w);
                    }
                    let d2 = op.partial2(&self.values, i_local, k, k);
                    if d2 != 0.0 {
                        let s = op.input.slot(k);
                        self.hessian.add(s, s, d2 * w);
                    }
                }
                if offdiag {
                    let d2 = op.partial2(&self.values, i_local, j, k);
                    if d2 != 0.0 {
                        self.hessian
                            .add(op.input.slot(j), op.input.slot(k), d2 * w);
                    }
                }
            }
            Candidates::All(n) => {
                for j in 0..n {
                    if diag {
                        let d2 = op.partial2(&self.values, i_local, j, j);
                        if d2 != 0.0 {
                            let s = op.input.slot(j);
                            self.hessian.add(s, s, d2 * w);
                        }
                    }
                    if offdiag {
                        for k in (j + 1)..n {
                            let d2 = op.partial2(&self.values, i_local, j, k);
                            if d2 != 0.0 {
                                self.hessian
                                    .add(op.input.slot(j), op.input.slot(k), d2 * w);
                            }
                        }
                    }
                }
            }
        }
    }
}
