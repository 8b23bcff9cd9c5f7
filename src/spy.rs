//! Variable handles that record operations as a side effect of arithmetic.

use crate::error::Error;
use crate::tape::Tape;
use crate::tensor::Tensor;

/// A view into the tape: drop-in stand-in for a scalar or tensor variable.
///
/// A spy carries the tensor value at recording time (used only for shape
/// dispatch and literal peepholes), a reference to its tape, and the
/// contiguous trace range `[tape_begin, tape_end)` holding its slots. Free
/// inputs are declared with [`Spy::input`] before any operation is
/// recorded; every overloaded operation returns a new spy over the freshly
/// recorded output range.
#[derive(Debug, Clone)]
pub struct Spy<'t> {
    pub(crate) tensor: Tensor,
    pub(crate) tape: &'t Tape,
    tape_begin: usize,
    tensor_id: Option<usize>,
}

impl<'t> Spy<'t> {
    /// Declare a new free input with the given starting value.
    ///
    /// Fails with [`Error::DeclarationAfterRecording`] once the tape holds
    /// any recorded operation.
    pub fn input(value: impl Into<Tensor>, tape: &'t Tape) -> Result<Self, Error> {
        let tensor = value.into();
        let tape_begin = tape.declare_input(&tensor.val)?;
        Ok(Spy {
            tensor,
            tape,
            tape_begin,
            tensor_id: None,
        })
    }

    /// Declare a free input carrying an external tensor identifier, or
    /// re-use the slots already mapped to that identifier.
    pub fn input_mapped(
        value: impl Into<Tensor>,
        tensor_id: usize,
        tape: &'t Tape,
    ) -> Result<Self, Error> {
        let tensor = value.into();
        if let Some(existing) = tape.slot_of(tensor_id) {
            return Ok(Spy {
                tensor,
                tape,
                tape_begin: existing,
                tensor_id: Some(tensor_id),
            });
        }
        let tape_begin = tape.declare_input(&tensor.val)?;
        tape.map(tape_begin, tensor_id);
        Ok(Spy {
            tensor,
            tape,
            tape_begin,
            tensor_id: Some(tensor_id),
        })
    }

    /// Wrap an operator output range in a new handle.
    pub(crate) fn wrap(tensor: Tensor, tape: &'t Tape, tape_begin: usize) -> Self {
        Spy {
            tensor,
            tape,
            tape_begin,
            tensor_id: None,
        }
    }

    /// Recording-time value (shape carrier).
    pub fn value(&self) -> &Tensor {
        &self.tensor
    }

    pub fn dim(&self) -> &[usize] {
        &self.tensor.dim
    }

    pub fn len(&self) -> usize {
        self.tensor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensor.is_empty()
    }

    pub fn is_scalar(&self) -> bool {
        self.tensor.is_scalar()
    }

    pub fn is_vector(&self) -> bool {
        self.tensor.is_vector()
    }

    pub fn is_matrix(&self) -> bool {
        self.tensor.is_matrix()
    }

    /// First trace slot of this handle.
    pub fn tape_begin(&self) -> usize {
        self.tape_begin
    }

    /// One past the last trace slot of this handle.
    pub fn tape_end(&self) -> usize {
        self.tape_begin + self.tensor.len()
    }

    /// External tensor identifier, if mapped.
    pub fn tensor_id(&self) -> Option<usize> {
        self.tensor_id
    }

    /// Scalar handle referencing element `i` of this handle's range.
    /// No operation is recorded.
    pub fn at(&self, i: usize) -> Result<Spy<'t>, Error> {
        if i >= self.tensor.len() {
            return Err(Error::IndexOutOfRange {
                index: i,
                len: self.tensor.len(),
            });
        }
        Ok(Spy {
            tensor: Tensor::from(self.tensor.val[i]),
            tape: self.tape,
            tape_begin: self.tape_begin + i,
            tensor_id: None,
        })
    }

    /// Scalar handle referencing matrix element `(i, j)`.
    pub fn at2(&self, i: usize, j: usize) -> Result<Spy<'t>, Error> {
        if !self.is_matrix() || i >= self.tensor.nrow() || j >= self.tensor.ncol() {
            return Err(Error::IndexOutOfRange {
                index: i + j * self.tensor.dim[0],
                len: self.tensor.len(),
            });
        }
        self.at(self.tensor.vec_index(i, j))
    }

    /// Reshape a vector handle into an explicit column matrix.
    pub fn as_col_vector(mut self) -> Self {
        self.tensor = self.tensor.as_col_vector();
        self
    }

    /// Reshape a vector handle into an explicit row matrix.
    pub fn as_row_vector(mut self) -> Self {
        self.tensor = self.tensor.as_row_vector();
        self
    }
}
