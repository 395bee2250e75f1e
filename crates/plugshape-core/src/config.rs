//! Host-side processing configuration.
//!
//! A host binding translates its native "prepare to play" callback into a
//! [`ProcessSetup`] and hands it to
//! [`Processor::prepare`](crate::processor::Processor::prepare).
//!
//! # Example
//!
//! ```ignore
//! use plugshape_core::ProcessSetup;
//!
//! const SETUP: ProcessSetup = ProcessSetup::new(48000.0, 256)
//!     .with_input_channels(2)
//!     .with_output_channels(2);
//! ```

use crate::effect::AudioSetup;

/// One configuration change as seen from the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSetup {
    /// Channels the host will deliver on input bus 0.
    pub input_channels: usize,

    /// Channels the host expects on output bus 0.
    pub output_channels: usize,

    /// Largest frame count of any following `process` call.
    pub frames_per_buffer: usize,

    /// Sample rate in Hz.
    pub sample_rate: f64,
}

impl ProcessSetup {
    /// Stereo in, stereo out.
    pub const fn new(sample_rate: f64, frames_per_buffer: usize) -> Self {
        Self {
            input_channels: 2,
            output_channels: 2,
            frames_per_buffer,
            sample_rate,
        }
    }

    /// Set the input channel count.
    pub const fn with_input_channels(mut self, channels: usize) -> Self {
        self.input_channels = channels;
        self
    }

    /// Set the output channel count.
    pub const fn with_output_channels(mut self, channels: usize) -> Self {
        self.output_channels = channels;
        self
    }

    /// The part of the setup effects see.
    pub const fn audio_setup(&self) -> AudioSetup {
        AudioSetup {
            sample_rate: self.sample_rate,
            max_block_size: self.frames_per_buffer,
        }
    }
}

impl Default for ProcessSetup {
    fn default() -> Self {
        Self::new(44100.0, 512)
    }
}
