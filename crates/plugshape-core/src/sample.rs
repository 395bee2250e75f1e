//! Sample type abstraction for f32/f64 audio processing.
//!
//! Enables zero-cost generic buffer processing through monomorphization, and
//! carries the width tag the classifier and buffer adapter compare against.
//!
//! Width conversion is a plain value-preserving cast: widening is exact,
//! narrowing uses `as f32` with whatever rounding the platform performs.

use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

use crate::effect::{Call, Invocation};
use crate::port::{PortMut, TypedPort};

/// Native width of a sample type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleWidth {
    /// 32-bit IEEE float.
    F32,
    /// 64-bit IEEE float.
    F64,
}

impl SampleWidth {
    /// Size of one sample in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            SampleWidth::F32 => 4,
            SampleWidth::F64 => 8,
        }
    }
}

impl fmt::Display for SampleWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleWidth::F32 => write!(f, "f32"),
            SampleWidth::F64 => write!(f, "f64"),
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// An audio sample: `f32` or `f64`.
///
/// Sealed: the adapter relies on `WIDTH` uniquely identifying the type when
/// it hands host pointers to an effect without conversion.
///
/// # Example: Generic Gain
///
/// ```ignore
/// fn gain<S: Sample>(buffer: &mut Buffer<S>, gain: f32) {
///     let gain = S::from_f32(gain);
///     for (input, output) in buffer.zip_channels() {
///         for (i, o) in input.iter().zip(output.iter_mut()) {
///             *o = *i * gain;
///         }
///     }
/// }
/// ```
pub trait Sample:
    sealed::Sealed
    + Copy
    + Default
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + PartialOrd
    + fmt::Debug
{
    /// Width tag of this sample type.
    const WIDTH: SampleWidth;

    /// Zero value (0.0).
    const ZERO: Self;

    /// Convert from f32.
    fn from_f32(value: f32) -> Self;

    /// Convert from f64.
    fn from_f64(value: f64) -> Self;

    /// Convert to f64.
    fn to_f64(self) -> f64;

    /// Convert from either width through `f64`.
    #[inline(always)]
    fn from_sample<T: Sample>(value: T) -> Self {
        Self::from_f64(value.to_f64())
    }

    #[doc(hidden)]
    fn wrap_call<'c, 'b, I, O>(call: Call<'c, 'b, Self>, inputs: &'c I, outputs: &'c mut O) -> Invocation<'c, 'b, I, O>;

    #[doc(hidden)]
    fn typed_port(port: PortMut<'_>) -> Option<TypedPort<'_, Self>>;
}

macro_rules! impl_sample {
    ($ty:ident, $width:ident) => {
        impl Sample for $ty {
            const WIDTH: SampleWidth = SampleWidth::$width;
            const ZERO: Self = 0.0;

            #[inline(always)]
            fn from_f32(value: f32) -> Self {
                value as $ty
            }

            #[inline(always)]
            fn from_f64(value: f64) -> Self {
                value as $ty
            }

            #[inline(always)]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline(always)]
            fn wrap_call<'c, 'b, I, O>(
                call: Call<'c, 'b, Self>,
                inputs: &'c I,
                outputs: &'c mut O,
            ) -> Invocation<'c, 'b, I, O> {
                Invocation::$width { call, inputs, outputs }
            }

            #[inline(always)]
            fn typed_port(port: PortMut<'_>) -> Option<TypedPort<'_, Self>> {
                match port {
                    PortMut::$width(port) => Some(port),
                    _ => None,
                }
            }
        }
    };
}

impl_sample!(f32, F32);
impl_sample!(f64, F64);

/// Copy-convert `src` into `dst` sample by sample.
///
/// Converts `min(src.len(), dst.len())` samples.
#[inline]
pub fn convert_slice<S: Sample, D: Sample>(src: &[S], dst: &mut [D]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d = D::from_sample(*s);
    }
}
