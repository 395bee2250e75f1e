//! Named audio ports.
//!
//! Port-based effects declare their audio I/O as fields of an inputs record
//! and an outputs record (see [`Record`](crate::introspect::Record)). Each
//! port type is one carrier kind:
//!
//! | Port            | Carrier                               |
//! |-----------------|---------------------------------------|
//! | [`SamplePort`]  | one sample per call                   |
//! | [`ChannelPort`] | one channel of one block per call     |
//! | [`BusPort`]     | every channel of a bus for one block  |
//! | [`FramePort`]   | one sample of every channel per call  |
//!
//! Block ports hold raw pointers into host or pool memory. The processor binds
//! them right before invoking the effect and unbinds them right after, so
//! outside a `process` call every accessor yields an empty view.

use std::fmt;
use std::ptr;

use crate::sample::{Sample, SampleWidth};

// =============================================================================
// Port Type Tags
// =============================================================================

/// What a port conveys per effect invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Carrier {
    /// A single sample.
    Sample,
    /// A single channel for a whole block.
    Channel,
    /// A multi-channel bus for a whole block.
    Bus,
    /// One sample of each channel of a bus.
    Frame,
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Carrier::Sample => "sample",
            Carrier::Channel => "channel",
            Carrier::Bus => "bus",
            Carrier::Frame => "frame",
        };
        f.write_str(name)
    }
}

/// Carrier kind and native width of a port field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioPortType {
    pub carrier: Carrier,
    pub width: SampleWidth,
}

/// Implemented by every port type so derived records can describe and expose
/// their fields.
pub trait AudioPort {
    /// Static type tag, usable in const descriptors.
    const TYPE: AudioPortType;

    /// Type-erased mutable handle used by the processor to bind pointers.
    fn as_port_mut(&mut self) -> PortMut<'_>;
}

/// Mutable handle to a port of known width.
pub enum TypedPort<'a, S: Sample> {
    Sample(&'a mut SamplePort<S>),
    Channel(&'a mut ChannelPort<S>),
    Bus(&'a mut BusPort<S>),
    Frame(&'a mut FramePort<S>),
}

/// Width-erased mutable handle to a port.
pub enum PortMut<'a> {
    F32(TypedPort<'a, f32>),
    F64(TypedPort<'a, f64>),
}

impl PortMut<'_> {
    /// Native width of the referenced port.
    pub fn width(&self) -> SampleWidth {
        match self {
            PortMut::F32(_) => SampleWidth::F32,
            PortMut::F64(_) => SampleWidth::F64,
        }
    }
}

// =============================================================================
// SamplePort
// =============================================================================

/// One sample in or out per invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SamplePort<S: Sample = f32> {
    pub sample: S,
}

impl<S: Sample> SamplePort<S> {
    /// Current sample value.
    #[inline]
    pub fn get(&self) -> S {
        self.sample
    }

    /// Store a sample value.
    #[inline]
    pub fn set(&mut self, value: S) {
        self.sample = value;
    }
}

// =============================================================================
// ChannelPort
// =============================================================================

/// One channel of one block.
pub struct ChannelPort<S: Sample = f32> {
    channel: *mut S,
    frames: usize,
}

// SAFETY: the pointer is only non-null while the owning processor is inside
// `process`, on the thread running that call.
unsafe impl<S: Sample> Send for ChannelPort<S> {}

impl<S: Sample> Default for ChannelPort<S> {
    fn default() -> Self {
        Self {
            channel: ptr::null_mut(),
            frames: 0,
        }
    }
}

impl<S: Sample> ChannelPort<S> {
    /// Number of frames in the bound block (0 when unbound).
    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Whether the port currently points at audio.
    #[inline]
    pub fn is_bound(&self) -> bool {
        !self.channel.is_null()
    }

    /// The bound samples.
    #[inline]
    pub fn samples(&self) -> &[S] {
        if self.channel.is_null() {
            return &[];
        }
        // SAFETY: bound pointers are valid for `frames` samples for the
        // duration of the effect invocation.
        unsafe { std::slice::from_raw_parts(self.channel, self.frames) }
    }

    /// The bound samples, mutably.
    #[inline]
    pub fn samples_mut(&mut self) -> &mut [S] {
        if self.channel.is_null() {
            return &mut [];
        }
        // SAFETY: as above; output channels never alias one another.
        unsafe { std::slice::from_raw_parts_mut(self.channel, self.frames) }
    }

    /// # Safety
    ///
    /// `channel` must be valid for `frames` reads and writes until `unbind`.
    #[inline]
    pub(crate) unsafe fn bind(&mut self, channel: *mut S, frames: usize) {
        self.channel = channel;
        self.frames = if channel.is_null() { 0 } else { frames };
    }

    #[inline]
    pub(crate) fn unbind(&mut self) {
        self.channel = ptr::null_mut();
        self.frames = 0;
    }
}

impl<S: Sample> fmt::Debug for ChannelPort<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelPort")
            .field("bound", &self.is_bound())
            .field("frames", &self.frames)
            .finish()
    }
}

// =============================================================================
// BusPort
// =============================================================================

/// Every channel of a bus for one block.
///
/// The channel count is set from the negotiated channel plan when bound; a
/// bus negotiated to zero channels is bound with no channels.
pub struct BusPort<S: Sample = f32> {
    channels: *const *mut S,
    num_channels: usize,
    frames: usize,
}

// SAFETY: see `ChannelPort`.
unsafe impl<S: Sample> Send for BusPort<S> {}

impl<S: Sample> Default for BusPort<S> {
    fn default() -> Self {
        Self {
            channels: ptr::null(),
            num_channels: 0,
            frames: 0,
        }
    }
}

impl<S: Sample> BusPort<S> {
    /// Number of bound channels.
    #[inline]
    pub fn channels(&self) -> usize {
        self.num_channels
    }

    /// Number of frames per channel.
    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Whether the port currently points at audio.
    #[inline]
    pub fn is_bound(&self) -> bool {
        !self.channels.is_null()
    }

    /// One channel, or an empty slice if it doesn't exist.
    #[inline]
    pub fn channel(&self, index: usize) -> &[S] {
        match self.channel_ptr(index) {
            // SAFETY: bound channel pointers are valid for `frames` samples.
            Some(ch) => unsafe { std::slice::from_raw_parts(ch, self.frames) },
            None => &[],
        }
    }

    /// One channel mutably, or an empty slice if it doesn't exist.
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [S] {
        match self.channel_ptr(index) {
            // SAFETY: as above; channels of an output bus are disjoint.
            Some(ch) => unsafe { std::slice::from_raw_parts_mut(ch, self.frames) },
            None => &mut [],
        }
    }

    /// Iterate over the bound channels.
    pub fn iter(&self) -> impl Iterator<Item = &[S]> + '_ {
        (0..self.num_channels).map(move |c| self.channel(c))
    }

    /// Iterate over the bound channels mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut [S]> + '_ {
        let frames = self.frames;
        let table: &[*mut S] = if self.channels.is_null() {
            &[]
        } else {
            // SAFETY: the pointer table holds `num_channels` entries while bound.
            unsafe { std::slice::from_raw_parts(self.channels, self.num_channels) }
        };
        // SAFETY: each table entry is a distinct channel valid for `frames`.
        table
            .iter()
            .map(move |&ch| unsafe { std::slice::from_raw_parts_mut(ch, frames) })
    }

    #[inline]
    fn channel_ptr(&self, index: usize) -> Option<*mut S> {
        if self.channels.is_null() || index >= self.num_channels {
            return None;
        }
        // SAFETY: index is within the bound table.
        Some(unsafe { *self.channels.add(index) })
    }

    /// # Safety
    ///
    /// `table` must stay alive and unmoved until `unbind`, and each entry must
    /// be valid for `frames` reads and writes.
    #[inline]
    pub(crate) unsafe fn bind(&mut self, table: &[*mut S], frames: usize) {
        if table.is_empty() {
            self.unbind();
            return;
        }
        self.channels = table.as_ptr();
        self.num_channels = table.len();
        self.frames = frames;
    }

    #[inline]
    pub(crate) fn unbind(&mut self) {
        self.channels = ptr::null();
        self.num_channels = 0;
        self.frames = 0;
    }
}

impl<S: Sample> fmt::Debug for BusPort<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusPort")
            .field("channels", &self.num_channels)
            .field("frames", &self.frames)
            .finish()
    }
}

// =============================================================================
// FramePort
// =============================================================================

/// One sample of every channel of a bus per invocation.
pub struct FramePort<S: Sample = f32> {
    frame: *mut S,
    num_channels: usize,
}

// SAFETY: see `ChannelPort`.
unsafe impl<S: Sample> Send for FramePort<S> {}

impl<S: Sample> Default for FramePort<S> {
    fn default() -> Self {
        Self {
            frame: ptr::null_mut(),
            num_channels: 0,
        }
    }
}

impl<S: Sample> FramePort<S> {
    /// Number of channels in the frame.
    #[inline]
    pub fn channels(&self) -> usize {
        self.num_channels
    }

    /// The current frame, one sample per channel.
    #[inline]
    pub fn frame(&self) -> &[S] {
        if self.frame.is_null() {
            return &[];
        }
        // SAFETY: bound frames point at `num_channels` scratch samples.
        unsafe { std::slice::from_raw_parts(self.frame, self.num_channels) }
    }

    /// The current frame, mutably.
    #[inline]
    pub fn frame_mut(&mut self) -> &mut [S] {
        if self.frame.is_null() {
            return &mut [];
        }
        // SAFETY: as above; frame scratch regions never overlap.
        unsafe { std::slice::from_raw_parts_mut(self.frame, self.num_channels) }
    }

    /// # Safety
    ///
    /// `frame` must be valid for `channels` reads and writes until `unbind`.
    #[inline]
    pub(crate) unsafe fn bind(&mut self, frame: *mut S, channels: usize) {
        if channels == 0 {
            self.unbind();
            return;
        }
        self.frame = frame;
        self.num_channels = channels;
    }

    #[inline]
    pub(crate) fn unbind(&mut self) {
        self.frame = ptr::null_mut();
        self.num_channels = 0;
    }
}

impl<S: Sample> fmt::Debug for FramePort<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramePort")
            .field("channels", &self.num_channels)
            .finish()
    }
}

// =============================================================================
// AudioPort impls
// =============================================================================

macro_rules! impl_audio_port {
    ($port:ident, $carrier:ident) => {
        impl_audio_port!(@width $port, $carrier, f32, F32);
        impl_audio_port!(@width $port, $carrier, f64, F64);
    };
    (@width $port:ident, $carrier:ident, $ty:ty, $width:ident) => {
        impl AudioPort for $port<$ty> {
            const TYPE: AudioPortType = AudioPortType {
                carrier: Carrier::$carrier,
                width: SampleWidth::$width,
            };

            #[inline]
            fn as_port_mut(&mut self) -> PortMut<'_> {
                PortMut::$width(TypedPort::$carrier(self))
            }
        }
    };
}

impl_audio_port!(SamplePort, Sample);
impl_audio_port!(ChannelPort, Channel);
impl_audio_port!(BusPort, Bus);
impl_audio_port!(FramePort, Frame);
