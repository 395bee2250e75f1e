//! Audio buffer handed to bus-argument effects.
//!
//! A bus-argument effect takes its whole audio I/O as one positional
//! argument:
//!
//! ```ignore
//! #[audio_effect(input_channels = 2, output_channels = 2)]
//! impl Gain {
//!     fn process(&mut self, buffer: &mut Buffer<f64>) {
//!         for (input, output) in buffer.zip_channels() {
//!             for (i, o) in input.iter().zip(output.iter_mut()) {
//!                 *o = *i * 2.0;
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! # Storage
//!
//! [`Buffer`] borrows the processor's channel pointer tables instead of
//! owning slices, so it has no channel limit and building one never
//! allocates. The tables point either at host memory (matching widths) or at
//! the processor's conversion pool.

use std::marker::PhantomData;

use crate::sample::Sample;

// =============================================================================
// Buffer - Main Audio I/O
// =============================================================================

/// Input and output channels of one processing block.
///
/// # Type Parameter
///
/// `S` is the sample type, defaulting to `f32`. Use `Buffer<f64>` for
/// 64-bit double precision processing.
///
/// # Lifetime
///
/// The `'a` lifetime ties the buffer to the audio data of a single
/// `process()` call.
pub struct Buffer<'a, S: Sample = f32> {
    inputs: &'a [*mut S],
    outputs: &'a [*mut S],
    num_samples: usize,
    _marker: PhantomData<&'a mut [S]>,
}

impl<'a, S: Sample> Buffer<'a, S> {
    /// Wrap channel pointer tables.
    ///
    /// # Safety
    ///
    /// Every pointer must be valid for `num_samples` samples for `'a`. Output
    /// pointers must be distinct from each other and from every input
    /// pointer.
    #[inline]
    pub unsafe fn from_raw(inputs: &'a [*mut S], outputs: &'a [*mut S], num_samples: usize) -> Self {
        Self {
            inputs,
            outputs,
            num_samples,
            _marker: PhantomData,
        }
    }

    /// Frames in this block.
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Input channels across every input bus.
    #[inline]
    pub fn num_input_channels(&self) -> usize {
        self.inputs.len()
    }

    /// Output channels across every output bus.
    #[inline]
    pub fn num_output_channels(&self) -> usize {
        self.outputs.len()
    }

    /// One input channel, or an empty slice if it doesn't exist.
    #[inline]
    pub fn input(&self, channel: usize) -> &[S] {
        match self.inputs.get(channel) {
            // SAFETY: see `from_raw`.
            Some(&ptr) => unsafe { std::slice::from_raw_parts(ptr, self.num_samples) },
            None => &[],
        }
    }

    /// One output channel.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= num_output_channels()`.
    #[inline]
    pub fn output(&mut self, channel: usize) -> &mut [S] {
        let ptr = self.outputs[channel];
        // SAFETY: see `from_raw`.
        unsafe { std::slice::from_raw_parts_mut(ptr, self.num_samples) }
    }

    /// One output channel, or `None` if it doesn't exist.
    #[inline]
    pub fn output_checked(&mut self, channel: usize) -> Option<&mut [S]> {
        let n = self.num_samples;
        self.outputs
            .get(channel)
            // SAFETY: see `from_raw`.
            .map(|&ptr| unsafe { std::slice::from_raw_parts_mut(ptr, n) })
    }

    /// Every input channel in order.
    #[inline]
    pub fn inputs(&self) -> impl Iterator<Item = &[S]> + '_ {
        let n = self.num_samples;
        self.inputs
            .iter()
            // SAFETY: see `from_raw`.
            .map(move |&ptr| unsafe { std::slice::from_raw_parts(ptr as *const S, n) })
    }

    /// Every output channel in order.
    #[inline]
    pub fn outputs_mut(&mut self) -> impl Iterator<Item = &mut [S]> + use<'_, 'a, S> {
        let n = self.num_samples;
        self.outputs
            .iter()
            // SAFETY: output channels are pairwise distinct.
            .map(move |&ptr| unsafe { std::slice::from_raw_parts_mut(ptr, n) })
    }

    /// `(input, output)` pairs up to the smaller channel count.
    #[inline]
    pub fn zip_channels(&mut self) -> impl Iterator<Item = (&[S], &mut [S])> + use<'_, 'a, S> {
        let n = self.num_samples;
        self.inputs.iter().zip(self.outputs.iter()).map(move |(&i, &o)| {
            // SAFETY: inputs never alias outputs.
            unsafe {
                (
                    std::slice::from_raw_parts(i as *const S, n),
                    std::slice::from_raw_parts_mut(o, n),
                )
            }
        })
    }

    /// Copy each input into the output of the same index.
    pub fn copy_to_output(&mut self) {
        for (input, output) in self.zip_channels() {
            output.copy_from_slice(input);
        }
    }

    /// Silence every output.
    pub fn clear_outputs(&mut self) {
        for output in self.outputs_mut() {
            output.fill(S::ZERO);
        }
    }
}
