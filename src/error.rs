use thiserror::Error;

/// Errors raised while declaring inputs or addressing recorded handles.
///
/// Shape mismatches inside overloaded arithmetic panic instead (operator
/// traits cannot return `Result`); the panic message is
/// [`Error::ShapeMismatch`]'s display form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A free input was declared after the first operator was recorded.
    #[error("attempt to declare an input after recording started")]
    DeclarationAfterRecording,

    /// Operand shapes are incompatible for an element-wise or matrix operation.
    #[error("incompatible tensor dimensions: {left:?} vs {right:?}")]
    ShapeMismatch { left: Vec<usize>, right: Vec<usize> },

    /// Element access outside a handle's range.
    #[error("index {index} out of range for a handle of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}
