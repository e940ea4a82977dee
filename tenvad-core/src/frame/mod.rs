//! Audio frames handed from the caller to the detector.
//!
//! Callers hand over an [`AudioInput`], a dynamically typed n-dimensional
//! view, so that wrong encodings and wrong shapes can be reported as distinct
//! errors instead of being rejected by the type system upstream. The
//! [`FrameValidator`] is the only way to obtain a [`Frame`], which is what the
//! engine actually consumes.

pub mod validate;

pub use validate::FrameValidator;

use ndarray::{ArrayView1, ArrayView2, ArrayViewD};

/// A contiguous block of mono int16 PCM samples, exactly one hop long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    samples: Vec<i16>,
}

impl Frame {
    pub(crate) fn from_validated(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Caller-supplied audio buffer of any supported element type and shape.
#[derive(Debug, Clone)]
pub enum AudioInput<'a> {
    I16(ArrayViewD<'a, i16>),
    I32(ArrayViewD<'a, i32>),
    F32(ArrayViewD<'a, f32>),
    F64(ArrayViewD<'a, f64>),
}

impl AudioInput<'_> {
    /// Name of the element type, used in `InvalidType` errors.
    pub fn sample_type(&self) -> &'static str {
        match self {
            AudioInput::I16(_) => "int16",
            AudioInput::I32(_) => "int32",
            AudioInput::F32(_) => "float32",
            AudioInput::F64(_) => "float64",
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            AudioInput::I16(v) => v.shape(),
            AudioInput::I32(v) => v.shape(),
            AudioInput::F32(v) => v.shape(),
            AudioInput::F64(v) => v.shape(),
        }
    }
}

macro_rules! impl_audio_input_from {
    ($ty:ty, $variant:ident) => {
        impl<'a> From<&'a [$ty]> for AudioInput<'a> {
            fn from(samples: &'a [$ty]) -> Self {
                AudioInput::$variant(ArrayView1::from(samples).into_dyn())
            }
        }

        impl<'a> From<&'a Vec<$ty>> for AudioInput<'a> {
            fn from(samples: &'a Vec<$ty>) -> Self {
                AudioInput::$variant(ArrayView1::from(samples.as_slice()).into_dyn())
            }
        }

        impl<'a, const N: usize> From<&'a [$ty; N]> for AudioInput<'a> {
            fn from(samples: &'a [$ty; N]) -> Self {
                AudioInput::$variant(ArrayView1::from(&samples[..]).into_dyn())
            }
        }

        impl<'a> From<ArrayView1<'a, $ty>> for AudioInput<'a> {
            fn from(view: ArrayView1<'a, $ty>) -> Self {
                AudioInput::$variant(view.into_dyn())
            }
        }

        impl<'a> From<ArrayView2<'a, $ty>> for AudioInput<'a> {
            fn from(view: ArrayView2<'a, $ty>) -> Self {
                AudioInput::$variant(view.into_dyn())
            }
        }

        impl<'a> From<ArrayViewD<'a, $ty>> for AudioInput<'a> {
            fn from(view: ArrayViewD<'a, $ty>) -> Self {
                AudioInput::$variant(view)
            }
        }
    };
}

impl_audio_input_from!(i16, I16);
impl_audio_input_from!(i32, I32);
impl_audio_input_from!(f32, F32);
impl_audio_input_from!(f64, F64);

impl<'a> From<&'a Frame> for AudioInput<'a> {
    fn from(frame: &'a Frame) -> Self {
        AudioInput::from(frame.samples())
    }
}
