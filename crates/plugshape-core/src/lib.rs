//! # plugshape-core
//!
//! Runtime of the Plugshape audio effect adapter.
//!
//! Effects describe their processing entry points and port records once.
//! This crate classifies that description into a single audio shape and
//! adapts whatever a host delivers (sample width, channel counts, buffer
//! ownership) to it.
//!
//! ## Main Types
//!
//! - [`Effect`] - Contract implemented by `#[audio_effect]`
//! - [`Record`] - Port records implemented by `#[derive(Ports)]`
//! - [`Processor`] - One running effect instance
//! - [`Registry`] - Classified layouts shared across instances
//!
//! ## Ports and Buffers
//!
//! - [`SamplePort`], [`ChannelPort`], [`BusPort`], [`FramePort`] - Typed views
//!   bound by the processor
//! - [`Buffer`] - Multi-channel I/O handed to bus-argument entry points
//!
//! ## Negotiation
//!
//! - [`ChannelPlan`] - Per-bus channel counts and their state
//! - [`ProcessSetup`] - Host configuration in one value

pub mod buffer;
pub mod channels;
pub mod classify;
pub mod config;
pub mod effect;
pub mod error;
pub mod introspect;
pub mod port;
pub mod processor;
pub mod registry;
pub mod sample;

mod adapter;

// Re-exports for convenience
pub use buffer::Buffer;
pub use channels::{BusState, ChannelPlan, Direction};
pub use classify::{
    classify, classify_descriptor, Arity, AudioVariant, BusDescriptor, EffectLayout, WidthSupport,
};
pub use config::ProcessSetup;
pub use effect::{
    AudioSetup, Call, Effect, EffectDescriptor, EntryPoint, EntryShape, Invocation, IoChannels,
};
pub use error::{ClassifyError, ClassifyResult, ProcessError, ProcessResult, RegistryError};
pub use introspect::{FieldIndex, FieldInfo, FieldKind, Record, RecordDescriptor};
pub use port::{
    AudioPort, AudioPortType, BusPort, Carrier, ChannelPort, FramePort, PortMut, SamplePort,
    TypedPort,
};
pub use processor::{Processor, Voice};
pub use registry::Registry;
pub use sample::{convert_slice, Sample, SampleWidth};
