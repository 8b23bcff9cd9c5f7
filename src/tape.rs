//! The recorded expression graph.
//!
//! A tape is an append-only sequence of operator instances plus the layout
//! bookkeeping of the flat trace it describes: how many slots belong to
//! declared free inputs, how many to operator outputs, and the starting
//! values of the inputs. Recording goes through interior mutability so that
//! [`crate::Spy`] handles can share `&Tape` while arithmetic overloads
//! append operations.
//!
//! After recording, the tape is immutable and may back any number of
//! [`crate::Trace`] instances.

use std::cell::{Cell, Ref, RefCell};
use std::collections::HashMap;

use crate::error::Error;
use crate::op::{Op, OpConst, OpInput, OpKind, SlotRange};

/// Ordered record of primitive operations forming an expression graph.
#[derive(Debug, Default)]
pub struct Tape {
    ops: RefCell<Vec<Op>>,
    input_len: Cell<usize>,
    trace_len: Cell<usize>,
    initial_values: RefCell<Vec<f64>>,
    /// Optional external tensor identifiers, both directions.
    to_tensor: RefCell<HashMap<usize, usize>>,
    to_slot: RefCell<HashMap<usize, usize>>,
}

impl Tape {
    /// Create an empty tape.
    pub fn new() -> Self {
        Tape::default()
    }

    /// Total scalar width of the declared free inputs.
    pub fn input_len(&self) -> usize {
        self.input_len.get()
    }

    /// Total width of the trace: inputs plus every operator output.
    pub fn trace_len(&self) -> usize {
        self.trace_len.get()
    }

    /// Number of recorded operators.
    pub fn num_ops(&self) -> usize {
        self.ops.borrow().len()
    }

    /// Starting values of the free inputs, in declaration order.
    pub fn initial_values(&self) -> Vec<f64> {
        self.initial_values.borrow().clone()
    }

    /// Declare a free input of the given scalar width. Returns its first
    /// trace slot. Inputs must precede any recorded operation.
    pub(crate) fn declare_input(&self, values: &[f64]) -> Result<usize, Error> {
        if self.num_ops() > 0 {
            return Err(Error::DeclarationAfterRecording);
        }
        let begin = self.input_len.get();
        self.input_len.set(begin + values.len());
        self.trace_len.set(self.trace_len.get() + values.len());
        self.initial_values.borrow_mut().extend_from_slice(values);
        Ok(begin)
    }

    /// Append an operator; its output range starts at the current end of the
    /// trace. Returns the first output slot.
    pub(crate) fn record(&self, kind: OpKind, input: OpInput, constant: OpConst) -> usize {
        let out_begin = self.trace_len.get();
        let width = Op::output_width(kind, &input, &constant);
        debug_assert!(width > 0);
        debug_assert!(disjoint_free_operands(&input), "duplicate edge in operands");
        let out = SlotRange::new(out_begin, out_begin + width);
        self.trace_len.set(out.end);
        self.ops.borrow_mut().push(Op {
            kind,
            input,
            constant,
            out,
        });
        out_begin
    }

    /// Borrow the operator sequence for playback.
    pub(crate) fn ops(&self) -> Ref<'_, Vec<Op>> {
        self.ops.borrow()
    }

    /// Associate a trace slot with an external tensor identifier.
    pub fn map(&self, slot: usize, tensor_id: usize) {
        self.to_tensor.borrow_mut().insert(slot, tensor_id);
        self.to_slot.borrow_mut().insert(tensor_id, slot);
    }

    /// External tensor identifier mapped to `slot`, if any.
    pub fn tensor_id(&self, slot: usize) -> Option<usize> {
        self.to_tensor.borrow().get(&slot).copied()
    }

    /// Trace slot mapped to an external tensor identifier, if any.
    pub fn slot_of(&self, tensor_id: usize) -> Option<usize> {
        self.to_slot.borrow().get(&tensor_id).copied()
    }
}

/// Trace-backed operand ranges of a single operator must not overlap;
/// the builder routes duplicate edges to self-form operators instead.
fn disjoint_free_operands(input: &OpInput) -> bool {
    match input {
        OpInput::ScalarPair(a, b) => a != b,
        OpInput::RangePair(l, r) | OpInput::MatrixPair(l, _, r, _) => l.disjoint(r),
        OpInput::RangeScalar(l, s) => *s < l.begin || *s >= l.end,
        OpInput::ScalarRange(s, r) => *s < r.begin || *s >= r.end,
        _ => true,
    }
}
