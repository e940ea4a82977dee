//! Shape, encoding and layout checks applied before a buffer reaches the engine.
//!
//! ## Order of checks
//!
//! 1. Squeeze axes of length 1 (`[1, 256]` is accepted as `[256]`).
//! 2. Empty buffer → `InvalidShape`.
//! 3. Not one-dimensional, or length ≠ hop size → `InvalidShape`.
//! 4. Element type not int16 → `InvalidType`.
//! 5. Non-contiguous layout → copied (or `NotAContiguousBuffer` when
//!    normalization is disabled).

use ndarray::{ArrayViewD, Axis};

use super::{AudioInput, Frame};
use crate::error::{Result, VadError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameValidator {
    hop_size: usize,
    normalize_layout: bool,
}

impl FrameValidator {
    /// Validator for frames of `hop_size` samples that copies strided input
    /// into a contiguous buffer.
    pub fn new(hop_size: usize) -> Self {
        Self {
            hop_size,
            normalize_layout: true,
        }
    }

    /// Reject non-contiguous input instead of copying it.
    pub fn strict_layout(mut self) -> Self {
        self.normalize_layout = false;
        self
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Check `input` and produce an owned, contiguous [`Frame`].
    pub fn validate<'a>(&self, input: impl Into<AudioInput<'a>>) -> Result<Frame> {
        let input = input.into();
        match input {
            AudioInput::I16(view) => {
                let view = squeeze(view);
                self.check_shape(view.shape())?;
                self.to_frame(view)
            }
            AudioInput::I32(view) => self.reject_type(squeeze(view).shape(), "int32"),
            AudioInput::F32(view) => self.reject_type(squeeze(view).shape(), "float32"),
            AudioInput::F64(view) => self.reject_type(squeeze(view).shape(), "float64"),
        }
    }

    fn check_shape(&self, shape: &[usize]) -> Result<()> {
        let actual: usize = shape.iter().product();
        if actual == 0 || shape.len() != 1 || shape[0] != self.hop_size {
            return Err(VadError::InvalidShape {
                expected: self.hop_size,
                actual,
                shape: shape.to_vec(),
            });
        }
        Ok(())
    }

    fn reject_type(&self, shape: &[usize], found: &'static str) -> Result<Frame> {
        self.check_shape(shape)?;
        Err(VadError::InvalidType { found })
    }

    fn to_frame(&self, view: ArrayViewD<'_, i16>) -> Result<Frame> {
        if let Some(contiguous) = view.as_slice() {
            return Ok(Frame::from_validated(contiguous.to_vec()));
        }
        if !self.normalize_layout {
            return Err(VadError::NotAContiguousBuffer);
        }
        // Logical order copy; sample values are untouched.
        Ok(Frame::from_validated(view.iter().copied().collect()))
    }
}

/// Drop every axis of length 1 while more than one axis remains.
fn squeeze<A>(mut view: ArrayViewD<'_, A>) -> ArrayViewD<'_, A> {
    let mut axis = view.ndim();
    while axis > 0 {
        axis -= 1;
        if view.ndim() > 1 && view.len_of(Axis(axis)) == 1 {
            view = view.index_axis_move(Axis(axis), 0);
        }
    }
    view
}
