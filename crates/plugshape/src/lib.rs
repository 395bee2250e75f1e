//! # Plugshape
//!
//! Write an audio effect once, run it in any host shape.
//!
//! An effect states how it wants audio (one sample, one channel, a whole
//! bus, or named ports) and at which sample width. Plugshape classifies
//! that once per type, negotiates channel counts with the host, and adapts
//! every processing call to it.
//!
//! ## Architecture
//!
//! ```text
//! Host binding
//!        ↓  channels, block size, buffers at the host's width
//! Processor<E> (plan, voices, conversion pool)
//!        ↓  the classified shape at the effect's width
//! Your effect (#[audio_effect] impl)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use plugshape::prelude::*;
//!
//! #[derive(Clone, Default)]
//! struct Drive {
//!     amount: f64,
//! }
//!
//! #[audio_effect]
//! impl Drive {
//!     fn process(&mut self, input: f64) -> f64 {
//!         (input * self.amount).tanh()
//!     }
//! }
//!
//! let mut processor = Processor::new(Drive { amount: 4.0 })?;
//! processor.set_input_channels(0, 2);
//! processor.configure(256, 48000.0);
//! processor.process::<f32>(&[&left, &right], &mut [&mut out_l, &mut out_r], 256)?;
//! ```

// Re-export sub-crates
pub use plugshape_core as core;

// Re-export macros when feature is enabled
#[cfg(feature = "derive")]
pub use plugshape_macros::{audio_effect, Ports};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use plugshape::prelude::*;
/// ```
pub mod prelude {
    pub use plugshape_core::{
        // Buffers and samples
        Buffer, Sample, SampleWidth,
        // Ports
        BusPort, ChannelPort, FramePort, SamplePort,
        // Effect contract
        AudioSetup, Effect, Record,
        // Engine
        Processor, ProcessSetup, Registry,
        // Classification and negotiation
        AudioVariant, BusState, ChannelPlan, EffectLayout,
        // Errors
        ClassifyError, ProcessError, RegistryError,
    };

    #[cfg(feature = "derive")]
    pub use plugshape_macros::{audio_effect, Ports};
}
