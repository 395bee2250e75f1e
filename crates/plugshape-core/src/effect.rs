//! The effect-side contract.
//!
//! Effect authors write an inherent `impl` block with one or more entry
//! points and let `#[audio_effect]` implement [`Effect`] for them:
//!
//! ```ignore
//! #[derive(Clone, Default)]
//! struct Doubler;
//!
//! #[audio_effect]
//! impl Doubler {
//!     fn process(&mut self, input: f64) -> f64 {
//!         input * 2.0
//!     }
//! }
//! ```
//!
//! The macro records each entry point's shape in [`Effect::ENTRY_POINTS`]
//! and routes [`Invocation`]s to the matching method. Which shape the effect
//! as a whole has is decided later, once, by
//! [`classify`](crate::classify::classify).

use crate::buffer::Buffer;
use crate::introspect::{Record, RecordDescriptor};
use crate::sample::{Sample, SampleWidth};

// =============================================================================
// Entry points
// =============================================================================

/// Signature family of one entry point.
///
/// Argument shapes may be followed by `&Inputs` and/or `&mut Outputs`
/// records of control values, e.g. `fn(&mut self, S, &Inputs) -> S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryShape {
    /// `fn(&mut self, S [, &Inputs] [, &mut Outputs]) -> S`
    SampleArg(SampleWidth),
    /// `fn(&mut self, &[S], &mut [S] [, &Inputs] [, &mut Outputs])`
    ChannelArg(SampleWidth),
    /// `fn(&mut self, &mut Buffer<S> [, &Inputs] [, &mut Outputs])`
    BusArg(SampleWidth),
    /// `fn(&mut self [, &Inputs] [, &mut Outputs])`
    Ports,
}

/// One processing method of an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPoint {
    /// Method name, for diagnostics.
    pub name: &'static str,
    pub shape: EntryShape,
}

impl EntryPoint {
    pub const fn new(name: &'static str, shape: EntryShape) -> Self {
        Self { name, shape }
    }
}

/// Declared channel counts of argument-style effects.
///
/// `None` means dynamic. An undeclared output count with a bus-argument
/// entry point mirrors input bus 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoChannels {
    pub inputs: Option<usize>,
    pub outputs: Option<usize>,
}

impl IoChannels {
    /// Both directions dynamic.
    pub const DYNAMIC: IoChannels = IoChannels {
        inputs: None,
        outputs: None,
    };
}

/// Everything the classifier looks at, gathered from an [`Effect`] impl.
#[derive(Debug, Clone, Copy)]
pub struct EffectDescriptor {
    pub name: &'static str,
    pub entry_points: &'static [EntryPoint],
    pub inputs: &'static RecordDescriptor,
    pub outputs: &'static RecordDescriptor,
    pub io_channels: IoChannels,
}

// =============================================================================
// Invocation
// =============================================================================

/// One call into a width-specific argument entry point.
pub enum Call<'c, 'b, S: Sample> {
    Sample { input: S, output: &'c mut S },
    Channel { input: &'c [S], output: &'c mut [S] },
    Bus(&'c mut Buffer<'b, S>),
}

/// One call into an effect, built by the processor for the classified shape.
///
/// Argument calls carry the voice's records too; for argument shapes these
/// hold control values only.
pub enum Invocation<'c, 'b, I, O> {
    F32 {
        call: Call<'c, 'b, f32>,
        inputs: &'c I,
        outputs: &'c mut O,
    },
    F64 {
        call: Call<'c, 'b, f64>,
        inputs: &'c I,
        outputs: &'c mut O,
    },
    Ports { inputs: &'c I, outputs: &'c mut O },
}

// =============================================================================
// AudioSetup
// =============================================================================

/// Processing parameters handed to an effect before audio runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioSetup {
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Largest block the host will ask for.
    pub max_block_size: usize,
}

impl Default for AudioSetup {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            max_block_size: 512,
        }
    }
}

// =============================================================================
// Effect
// =============================================================================

/// An audio effect the processor can drive.
///
/// `Clone` lets mono effects be duplicated once per channel.
pub trait Effect: Clone + Send + 'static {
    /// Record of named input ports and controls; `()` if none.
    type Inputs: Record + Default + Send;

    /// Record of named output ports; `()` if none.
    type Outputs: Record + Default + Send;

    /// Display name.
    const NAME: &'static str;

    /// Every processing method the effect defines.
    const ENTRY_POINTS: &'static [EntryPoint];

    /// Channel declarations for argument-style bus effects.
    const IO_CHANNELS: IoChannels = IoChannels::DYNAMIC;

    /// Dispatch one call to the matching entry point.
    ///
    /// Calls for shapes the effect doesn't implement are ignored.
    fn invoke(&mut self, call: Invocation<'_, '_, Self::Inputs, Self::Outputs>);

    /// Called on every voice when the processor is configured.
    fn prepare(&mut self, setup: &AudioSetup) {
        let _ = setup;
    }

    /// Gather the static facts the classifier needs.
    fn descriptor() -> EffectDescriptor {
        EffectDescriptor {
            name: Self::NAME,
            entry_points: Self::ENTRY_POINTS,
            inputs: <Self::Inputs as Record>::DESCRIPTOR,
            outputs: <Self::Outputs as Record>::DESCRIPTOR,
            io_channels: Self::IO_CHANNELS,
        }
    }
}
