//! Error types.
//!
//! Channel rejection is not an error: `set_*_channels` return `bool`.

use thiserror::Error;

use crate::channels::Direction;
use crate::port::Carrier;

/// Result type for classification.
pub type ClassifyResult<T> = Result<T, ClassifyError>;

/// Result type for processing calls.
pub type ProcessResult<T> = Result<T, ProcessError>;

/// An effect type whose audio shape can't be determined.
///
/// Raised before any instance runs; fatal for that effect type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("effect `{effect}` declares no entry point")]
    NoEntryPoint { effect: &'static str },

    #[error("effect `{effect}` mixes carrier families: {}", join(.families))]
    MultipleCarriers {
        effect: &'static str,
        families: Vec<Carrier>,
    },

    #[error("effect `{effect}` mixes 32-bit and 64-bit audio ports")]
    MixedWidths { effect: &'static str },

    #[error("effect `{effect}` combines argument and port entry points")]
    MixedEntryStyles { effect: &'static str },

    #[error("effect `{effect}` takes audio arguments, so record field `{port}` cannot be an audio port")]
    PortsWithArguments {
        effect: &'static str,
        port: &'static str,
    },

    #[error("input port `{port}` cannot mirror another port")]
    MirrorOnInput { port: &'static str },

    #[error("port `{port}` mirrors unknown port `{target}`")]
    UnknownMirrorTarget {
        port: &'static str,
        target: &'static str,
    },

    #[error("port `{port}` mirrors `{target}`, which is itself a mirror")]
    ChainedMirror {
        port: &'static str,
        target: &'static str,
    },

    #[error("port `{port}` mirrors `{target}`, which is not an input port")]
    MirrorTargetNotInput {
        port: &'static str,
        target: &'static str,
    },

    #[error("single-channel port `{port}` cannot declare a channel arity")]
    MonoPortArity { port: &'static str },
}

fn join(families: &[Carrier]) -> String {
    families
        .iter()
        .map(Carrier::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A processing call that could not run.
///
/// Outputs are left untouched whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    #[error("host passed {actual} {direction} channels, negotiated plan has {expected}")]
    ChannelMismatch {
        direction: Direction,
        expected: usize,
        actual: usize,
    },

    #[error("{direction} channel {channel} holds {len} samples, block needs {frames}")]
    ShortBuffer {
        direction: Direction,
        channel: usize,
        len: usize,
        frames: usize,
    },

    #[error("could not grow conversion storage to {requested} samples")]
    AllocationFailed { requested: usize },
}

/// Registry lookups and instantiation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error("effect `{effect}` is not registered")]
    NotRegistered { effect: &'static str },
}
