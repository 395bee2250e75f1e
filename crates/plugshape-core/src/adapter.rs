//! Buffer adaptation between host and effect.
//!
//! One processing call runs through these steps, in order:
//!
//! 1. If the host width equals the effect's native width (and the host's
//!    input and output channels don't overlap), channel pointers go straight
//!    to the effect.
//! 2. Otherwise input channels are copy-converted into the conversion pool.
//! 3. Output channels of the effect point at pool storage.
//! 4. Pointers are bound into ports or wrapped as arguments.
//! 5. The effect runs once per block, or once per frame for sample and
//!    frame shapes (with one-sample-per-channel scratch instead of block
//!    storage).
//! 6. Pooled outputs are copy-converted back into host buffers.
//! 7. Port pointers are nulled again.
//!
//! Everything that can fail (growing storage) happens before the first
//! output write, so a failed call leaves host outputs untouched.
//!
//! # Real-Time Safety
//!
//! [`BufferPool::allocate`] sizes all storage ahead of time from the channel
//! plan. During processing, storage only grows when a call exceeds what was
//! allocated (more frames than announced); growth uses `try_reserve` so an
//! allocation failure becomes [`ProcessError::AllocationFailed`] instead of
//! an abort.

use std::ptr;
use std::slice;

use crate::buffer::Buffer;
use crate::channels::{ChannelPlan, Direction};
use crate::classify::{AudioVariant, BusDescriptor};
use crate::effect::{Call, Effect, Invocation};
use crate::error::{ProcessError, ProcessResult};
use crate::introspect::Record;
use crate::port::TypedPort;
use crate::processor::Voice;
use crate::sample::{convert_slice, Sample};

// =============================================================================
// Host channel views
// =============================================================================

/// Input channels as delivered by a host.
pub(crate) trait HostInputs<H> {
    fn count(&self) -> usize;

    /// Channel length in samples, when the host tells us.
    fn len(&self, channel: usize) -> Option<usize>;

    fn ptr(&self, channel: usize) -> *const H;
}

/// Output channels as delivered by a host.
pub(crate) trait HostOutputs<H> {
    fn count(&self) -> usize;

    fn len(&self, channel: usize) -> Option<usize>;

    fn ptr_mut(&mut self, channel: usize) -> *mut H;
}

impl<H> HostInputs<H> for [&[H]] {
    #[inline]
    fn count(&self) -> usize {
        <[&[H]]>::len(self)
    }

    #[inline]
    fn len(&self, channel: usize) -> Option<usize> {
        Some(self[channel].len())
    }

    #[inline]
    fn ptr(&self, channel: usize) -> *const H {
        self[channel].as_ptr()
    }
}

impl<H> HostOutputs<H> for [&mut [H]] {
    #[inline]
    fn count(&self) -> usize {
        <[&mut [H]]>::len(self)
    }

    #[inline]
    fn len(&self, channel: usize) -> Option<usize> {
        Some(self[channel].len())
    }

    #[inline]
    fn ptr_mut(&mut self, channel: usize) -> *mut H {
        self[channel].as_mut_ptr()
    }
}

/// Raw channel pointer array from a host binding.
pub(crate) struct RawChannels<H> {
    pub(crate) table: *const *mut H,
    pub(crate) count: usize,
}

impl<H> RawChannels<H> {
    #[inline]
    fn get(&self, channel: usize) -> *mut H {
        if self.table.is_null() {
            return ptr::null_mut();
        }
        // SAFETY: the caller of `process_raw` guarantees `count` entries.
        unsafe { *self.table.add(channel) }
    }

    #[inline]
    fn known_len(&self, channel: usize) -> Option<usize> {
        // Null channels are reported as empty so they fail the length check.
        self.get(channel).is_null().then_some(0)
    }
}

impl<H> HostInputs<H> for RawChannels<H> {
    #[inline]
    fn count(&self) -> usize {
        self.count
    }

    #[inline]
    fn len(&self, channel: usize) -> Option<usize> {
        self.known_len(channel)
    }

    #[inline]
    fn ptr(&self, channel: usize) -> *const H {
        self.get(channel)
    }
}

impl<H> HostOutputs<H> for RawChannels<H> {
    #[inline]
    fn count(&self) -> usize {
        self.count
    }

    #[inline]
    fn len(&self, channel: usize) -> Option<usize> {
        self.known_len(channel)
    }

    #[inline]
    fn ptr_mut(&mut self, channel: usize) -> *mut H {
        self.get(channel)
    }
}

/// Whether any output channel overlaps any input channel over `frames`.
pub(crate) fn channels_overlap<H>(inputs: &RawChannels<H>, outputs: &RawChannels<H>, frames: usize) -> bool {
    let span = frames * std::mem::size_of::<H>();
    (0..outputs.count).any(|o| {
        let out = outputs.get(o) as usize;
        (0..inputs.count).any(|i| {
            let inp = inputs.get(i) as usize;
            out < inp + span && inp < out + span
        })
    })
}

/// Verify host channel counts and lengths against the plan.
pub(crate) fn check_host<H, I, O>(plan: &ChannelPlan, inputs: &I, outputs: &O, frames: usize) -> ProcessResult<()>
where
    I: HostInputs<H> + ?Sized,
    O: HostOutputs<H> + ?Sized,
{
    for (direction, actual) in [(Direction::Input, inputs.count()), (Direction::Output, outputs.count())] {
        let expected = plan.total_channels(direction);
        if actual != expected {
            return Err(ProcessError::ChannelMismatch {
                direction,
                expected,
                actual,
            });
        }
    }
    for channel in 0..inputs.count() {
        if let Some(len) = inputs.len(channel).filter(|&len| len < frames) {
            return Err(ProcessError::ShortBuffer {
                direction: Direction::Input,
                channel,
                len,
                frames,
            });
        }
    }
    for channel in 0..outputs.count() {
        if let Some(len) = outputs.len(channel).filter(|&len| len < frames) {
            return Err(ProcessError::ShortBuffer {
                direction: Direction::Output,
                channel,
                len,
                frames,
            });
        }
    }
    Ok(())
}

// =============================================================================
// BufferPool
// =============================================================================

/// Conversion storage of one instance at one native width.
///
/// Per-bus block storage holds `channels × frames` samples, channel-major.
/// Frame scratch holds one sample per channel. The pointer tables are what
/// ports and [`Buffer`] actually look at.
pub(crate) struct BufferPool<S: Sample> {
    inputs: Vec<Vec<S>>,
    outputs: Vec<Vec<S>>,
    frame_in: Vec<S>,
    frame_out: Vec<S>,
    in_ptrs: Vec<*mut S>,
    out_ptrs: Vec<*mut S>,
}

// SAFETY: the pointer tables only hold pointers during a `process` call and
// are cleared before it returns.
unsafe impl<S: Sample> Send for BufferPool<S> {}

impl<S: Sample> Default for BufferPool<S> {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            frame_in: Vec::new(),
            frame_out: Vec::new(),
            in_ptrs: Vec::new(),
            out_ptrs: Vec::new(),
        }
    }
}

fn grow<T: Clone>(buf: &mut Vec<T>, len: usize, fill: T) -> ProcessResult<()> {
    if buf.len() < len {
        buf.try_reserve_exact(len - buf.len())
            .map_err(|_| ProcessError::AllocationFailed { requested: len })?;
        buf.resize(len, fill);
    }
    Ok(())
}

fn reserve_table<T>(table: &mut Vec<T>, len: usize) -> ProcessResult<()> {
    if table.capacity() < len {
        table
            .try_reserve_exact(len - table.len())
            .map_err(|_| ProcessError::AllocationFailed { requested: len })?;
    }
    Ok(())
}

impl<S: Sample> BufferPool<S> {
    /// Size everything for `plan` at `block_size` frames.
    ///
    /// Block storage is only sized when `convert` is set.
    pub(crate) fn allocate(&mut self, plan: &ChannelPlan, block_size: usize, convert: bool) -> ProcessResult<()> {
        self.ensure_tables(plan)?;
        self.ensure_frame(plan.total_input_channels(), plan.total_output_channels())?;
        if convert {
            self.ensure_block(plan, block_size)?;
        }
        Ok(())
    }

    /// Total samples held, for diagnostics.
    pub(crate) fn footprint(&self) -> usize {
        self.inputs.iter().chain(&self.outputs).map(Vec::len).sum::<usize>()
            + self.frame_in.len()
            + self.frame_out.len()
    }

    fn ensure_tables(&mut self, plan: &ChannelPlan) -> ProcessResult<()> {
        reserve_table(&mut self.in_ptrs, plan.total_input_channels())?;
        reserve_table(&mut self.out_ptrs, plan.total_output_channels())
    }

    fn ensure_block(&mut self, plan: &ChannelPlan, frames: usize) -> ProcessResult<()> {
        grow(&mut self.inputs, plan.input_bus_count(), Vec::new())?;
        grow(&mut self.outputs, plan.output_bus_count(), Vec::new())?;
        for (bus, channels) in plan.input_counts().enumerate() {
            grow(&mut self.inputs[bus], channels * frames, S::ZERO)?;
        }
        for (bus, channels) in plan.output_counts().enumerate() {
            grow(&mut self.outputs[bus], channels * frames, S::ZERO)?;
        }
        Ok(())
    }

    fn ensure_frame(&mut self, inputs: usize, outputs: usize) -> ProcessResult<()> {
        grow(&mut self.frame_in, inputs, S::ZERO)?;
        grow(&mut self.frame_out, outputs, S::ZERO)
    }
}

// =============================================================================
// Port binding
// =============================================================================

/// Point the block ports of `record` at consecutive runs of `table`, one run
/// per bus.
fn bind_block_ports<R: Record, W: Sample>(
    record: &mut R,
    buses: &[BusDescriptor],
    counts: impl Iterator<Item = usize>,
    table: &[*mut W],
    frames: usize,
) {
    let mut offset = 0;
    for (desc, count) in buses.iter().zip(counts) {
        let channels = &table[offset..offset + count];
        offset += count;
        let Some(port) = desc.field.and_then(|f| record.port_mut(f)).and_then(W::typed_port) else {
            continue;
        };
        // SAFETY: table entries are valid for `frames` until `unbind_ports`.
        unsafe {
            match port {
                TypedPort::Channel(p) => p.bind(channels.first().copied().unwrap_or(ptr::null_mut()), frames),
                TypedPort::Bus(p) => p.bind(channels, frames),
                TypedPort::Sample(_) | TypedPort::Frame(_) => {}
            }
        }
    }
}

/// Point the frame ports of `record` at consecutive runs of scratch.
fn bind_frame_ports<R: Record, W: Sample>(
    record: &mut R,
    buses: &[BusDescriptor],
    counts: impl Iterator<Item = usize>,
    scratch: *mut W,
) {
    let mut offset = 0;
    for (desc, count) in buses.iter().zip(counts) {
        let Some(port) = desc.field.and_then(|f| record.port_mut(f)).and_then(W::typed_port) else {
            offset += count;
            continue;
        };
        if let TypedPort::Frame(p) = port {
            // SAFETY: scratch holds one sample per channel of every bus.
            unsafe { p.bind(scratch.add(offset), count) };
        }
        offset += count;
    }
}

fn unbind_ports<R: Record, W: Sample>(record: &mut R, buses: &[BusDescriptor]) {
    for desc in buses {
        let Some(port) = desc.field.and_then(|f| record.port_mut(f)).and_then(W::typed_port) else {
            continue;
        };
        match port {
            TypedPort::Channel(p) => p.unbind(),
            TypedPort::Bus(p) => p.unbind(),
            TypedPort::Frame(p) => p.unbind(),
            TypedPort::Sample(_) => {}
        }
    }
}

fn sample_port_mut<'a, R: Record, W: Sample>(record: &'a mut R, desc: &BusDescriptor) -> Option<&'a mut W> {
    let port = desc.field.and_then(|f| record.port_mut(f)).and_then(W::typed_port)?;
    match port {
        TypedPort::Sample(p) => Some(&mut p.sample),
        _ => None,
    }
}

// =============================================================================
// run
// =============================================================================

/// Run one block through the classified shape at native width `W`.
pub(crate) fn run<E, H, W, I, O>(
    plan: &ChannelPlan,
    voices: &mut [Voice<E>],
    pool: &mut BufferPool<W>,
    host_in: &I,
    host_out: &mut O,
    frames: usize,
    aliased: bool,
) -> ProcessResult<()>
where
    E: Effect,
    H: Sample,
    W: Sample,
    I: HostInputs<H> + ?Sized,
    O: HostOutputs<H> + ?Sized,
{
    match plan.layout().variant {
        AudioVariant::SampleArg(_) | AudioVariant::SamplePort(_) => {
            run_mono_frames::<E, H, W, I, O>(plan, voices, pool, host_in, host_out, frames)
        }
        AudioVariant::FramePort(_) => run_frames::<E, H, W, I, O>(plan, voices, pool, host_in, host_out, frames),
        AudioVariant::ChannelArg(_)
        | AudioVariant::BusArg(_)
        | AudioVariant::ChannelPort(_)
        | AudioVariant::BusPort(_) => run_block::<E, H, W, I, O>(plan, voices, pool, host_in, host_out, frames, aliased),
        AudioVariant::NotAudio => {
            for voice in voices {
                voice.effect.invoke(Invocation::Ports {
                    inputs: &voice.inputs,
                    outputs: &mut voice.outputs,
                });
            }
            Ok(())
        }
    }
}

fn run_block<E, H, W, I, O>(
    plan: &ChannelPlan,
    voices: &mut [Voice<E>],
    pool: &mut BufferPool<W>,
    host_in: &I,
    host_out: &mut O,
    frames: usize,
    aliased: bool,
) -> ProcessResult<()>
where
    E: Effect,
    H: Sample,
    W: Sample,
    I: HostInputs<H> + ?Sized,
    O: HostOutputs<H> + ?Sized,
{
    let staged = H::WIDTH != W::WIDTH || aliased;
    pool.ensure_tables(plan)?;
    if staged {
        pool.ensure_block(plan, frames)?;
    }

    pool.in_ptrs.clear();
    pool.out_ptrs.clear();

    if staged {
        let mut k = 0;
        for (bus, channels) in plan.input_counts().enumerate() {
            let base = pool.inputs[bus].as_mut_ptr();
            for c in 0..channels {
                // SAFETY: bus storage holds `channels * frames` samples and
                // the host channel holds at least `frames`.
                unsafe {
                    let dst = base.add(c * frames);
                    let src = slice::from_raw_parts(host_in.ptr(k), frames);
                    convert_slice(src, slice::from_raw_parts_mut(dst, frames));
                    pool.in_ptrs.push(dst);
                }
                k += 1;
            }
        }
        for (bus, channels) in plan.output_counts().enumerate() {
            let base = pool.outputs[bus].as_mut_ptr();
            for c in 0..channels {
                // SAFETY: as above.
                pool.out_ptrs.push(unsafe { base.add(c * frames) });
            }
        }
    } else {
        // Widths match, so `H` and `W` are the same type.
        for k in 0..host_in.count() {
            pool.in_ptrs.push(host_in.ptr(k) as *mut W);
        }
        for k in 0..host_out.count() {
            pool.out_ptrs.push(host_out.ptr_mut(k) as *mut W);
        }
    }

    invoke_block(plan, voices, &pool.in_ptrs, &pool.out_ptrs, frames);

    if staged {
        for (k, &src) in pool.out_ptrs.iter().enumerate() {
            // SAFETY: pool channels hold `frames` samples, host outputs were
            // length-checked.
            unsafe {
                let src = slice::from_raw_parts(src as *const W, frames);
                convert_slice(src, slice::from_raw_parts_mut(host_out.ptr_mut(k), frames));
            }
        }
    }

    pool.in_ptrs.clear();
    pool.out_ptrs.clear();
    Ok(())
}

fn invoke_block<E: Effect, W: Sample>(
    plan: &ChannelPlan,
    voices: &mut [Voice<E>],
    ins: &[*mut W],
    outs: &[*mut W],
    frames: usize,
) {
    let layout = plan.layout();
    match layout.variant {
        AudioVariant::BusArg(_) => {
            let Some(voice) = voices.first_mut() else {
                return;
            };
            // SAFETY: tables come from host or pool channels valid for
            // `frames`; outputs are distinct from each other and from inputs.
            let mut buffer = unsafe { Buffer::from_raw(ins, outs, frames) };
            voice.effect.invoke(W::wrap_call(Call::Bus(&mut buffer), &voice.inputs, &mut voice.outputs));
        }
        AudioVariant::ChannelArg(_) => {
            for (voice, (&i, &o)) in voices.iter_mut().zip(ins.iter().zip(outs)) {
                // SAFETY: as above.
                let (input, output) = unsafe {
                    (
                        slice::from_raw_parts(i as *const W, frames),
                        slice::from_raw_parts_mut(o, frames),
                    )
                };
                voice.effect.invoke(W::wrap_call(
                    Call::Channel { input, output },
                    &voice.inputs,
                    &mut voice.outputs,
                ));
            }
        }
        AudioVariant::ChannelPort(_) if layout.mono => {
            let channels = ins.len().min(outs.len());
            for (c, voice) in voices.iter_mut().enumerate().take(channels) {
                bind_block_ports(&mut voice.inputs, &layout.inputs, std::iter::once(1), &ins[c..], frames);
                bind_block_ports(&mut voice.outputs, &layout.outputs, std::iter::once(1), &outs[c..], frames);
                voice.effect.invoke(Invocation::Ports {
                    inputs: &voice.inputs,
                    outputs: &mut voice.outputs,
                });
                unbind_ports::<_, W>(&mut voice.inputs, &layout.inputs);
                unbind_ports::<_, W>(&mut voice.outputs, &layout.outputs);
            }
        }
        AudioVariant::ChannelPort(_) | AudioVariant::BusPort(_) => {
            let Some(voice) = voices.first_mut() else {
                return;
            };
            bind_block_ports(&mut voice.inputs, &layout.inputs, plan.input_counts(), ins, frames);
            bind_block_ports(&mut voice.outputs, &layout.outputs, plan.output_counts(), outs, frames);
            voice.effect.invoke(Invocation::Ports {
                inputs: &voice.inputs,
                outputs: &mut voice.outputs,
            });
            unbind_ports::<_, W>(&mut voice.inputs, &layout.inputs);
            unbind_ports::<_, W>(&mut voice.outputs, &layout.outputs);
        }
        AudioVariant::SampleArg(_)
        | AudioVariant::SamplePort(_)
        | AudioVariant::FramePort(_)
        | AudioVariant::NotAudio => {}
    }
}

/// One voice per channel, one call per sample.
fn run_mono_frames<E, H, W, I, O>(
    plan: &ChannelPlan,
    voices: &mut [Voice<E>],
    pool: &mut BufferPool<W>,
    host_in: &I,
    host_out: &mut O,
    frames: usize,
) -> ProcessResult<()>
where
    E: Effect,
    H: Sample,
    W: Sample,
    I: HostInputs<H> + ?Sized,
    O: HostOutputs<H> + ?Sized,
{
    let layout = plan.layout();
    let channels = voices.len().min(host_in.count()).min(host_out.count());
    pool.ensure_frame(channels, channels)?;
    let (Some(in_bus), Some(out_bus)) = (layout.input_bus(0), layout.output_bus(0)) else {
        return Ok(());
    };
    let port_shape = matches!(layout.variant, AudioVariant::SamplePort(_));

    for frame in 0..frames {
        // Fetch the whole frame first: hosts may share input and output storage.
        for c in 0..channels {
            // SAFETY: host channels were length-checked against `frames`.
            let sample = unsafe { *host_in.ptr(c).add(frame) };
            pool.frame_in[c] = W::from_sample(sample);
        }
        for (c, voice) in voices.iter_mut().take(channels).enumerate() {
            let input = pool.frame_in[c];
            let mut output = W::ZERO;
            if port_shape {
                if let Some(slot) = sample_port_mut::<_, W>(&mut voice.inputs, in_bus) {
                    *slot = input;
                }
                voice.effect.invoke(Invocation::Ports {
                    inputs: &voice.inputs,
                    outputs: &mut voice.outputs,
                });
                if let Some(slot) = sample_port_mut::<_, W>(&mut voice.outputs, out_bus) {
                    output = *slot;
                }
            } else {
                voice.effect.invoke(W::wrap_call(
                    Call::Sample {
                        input,
                        output: &mut output,
                    },
                    &voice.inputs,
                    &mut voice.outputs,
                ));
            }
            pool.frame_out[c] = output;
        }
        for c in 0..channels {
            // SAFETY: as above.
            unsafe { *host_out.ptr_mut(c).add(frame) = H::from_sample(pool.frame_out[c]) };
        }
    }
    Ok(())
}

/// One voice, one call per frame through frame ports or single sample ports.
fn run_frames<E, H, W, I, O>(
    plan: &ChannelPlan,
    voices: &mut [Voice<E>],
    pool: &mut BufferPool<W>,
    host_in: &I,
    host_out: &mut O,
    frames: usize,
) -> ProcessResult<()>
where
    E: Effect,
    H: Sample,
    W: Sample,
    I: HostInputs<H> + ?Sized,
    O: HostOutputs<H> + ?Sized,
{
    let layout = plan.layout();
    let total_in = host_in.count();
    let total_out = host_out.count();
    pool.ensure_frame(total_in, total_out)?;
    let Some(voice) = voices.first_mut() else {
        return Ok(());
    };

    let in_base = pool.frame_in.as_mut_ptr();
    let out_base = pool.frame_out.as_mut_ptr();
    bind_frame_ports(&mut voice.inputs, &layout.inputs, plan.input_counts(), in_base);
    bind_frame_ports(&mut voice.outputs, &layout.outputs, plan.output_counts(), out_base);

    for frame in 0..frames {
        for k in 0..total_in {
            // SAFETY: scratch holds `total_in` samples; host channels were
            // length-checked.
            unsafe { *in_base.add(k) = W::from_sample(*host_in.ptr(k).add(frame)) };
        }
        let mut offset = 0;
        for (desc, count) in layout.inputs.iter().zip(plan.input_counts()) {
            if count > 0 {
                if let Some(slot) = sample_port_mut::<_, W>(&mut voice.inputs, desc) {
                    // SAFETY: offset < total_in.
                    *slot = unsafe { *in_base.add(offset) };
                }
            }
            offset += count;
        }

        voice.effect.invoke(Invocation::Ports {
            inputs: &voice.inputs,
            outputs: &mut voice.outputs,
        });

        let mut offset = 0;
        for (desc, count) in layout.outputs.iter().zip(plan.output_counts()) {
            if count > 0 {
                if let Some(slot) = sample_port_mut::<_, W>(&mut voice.outputs, desc) {
                    // SAFETY: offset < total_out.
                    unsafe { *out_base.add(offset) = *slot };
                }
            }
            offset += count;
        }
        for k in 0..total_out {
            // SAFETY: as above.
            unsafe { *host_out.ptr_mut(k).add(frame) = H::from_sample(*out_base.add(k)) };
        }
    }

    unbind_ports::<_, W>(&mut voice.inputs, &layout.inputs);
    unbind_ports::<_, W>(&mut voice.outputs, &layout.outputs);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grow_only_grows() {
        let mut buf = vec![1.0_f32; 4];
        grow(&mut buf, 2, 0.0).unwrap();
        assert_eq!(buf.len(), 4);
        grow(&mut buf, 6, 0.0).unwrap();
        assert_eq!(buf, vec![1.0, 1.0, 1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_raw_overlap_detection() {
        let mut a = [0.0_f32; 8];
        let mut b = [0.0_f32; 8];
        let a_ptr = a.as_mut_ptr();
        let b_ptr = b.as_mut_ptr();

        let ins = [a_ptr];
        let shared = [a_ptr];
        let separate = [b_ptr];
        let inputs = RawChannels { table: ins.as_ptr(), count: 1 };
        let same = RawChannels { table: shared.as_ptr(), count: 1 };
        let other = RawChannels { table: separate.as_ptr(), count: 1 };

        assert!(channels_overlap(&inputs, &same, 8));
        assert!(!channels_overlap(&inputs, &other, 8));
        assert!(!channels_overlap(&inputs, &same, 0));
    }

    #[test]
    fn test_raw_null_channel_reports_empty() {
        let table = [ptr::null_mut::<f64>()];
        let raw = RawChannels { table: table.as_ptr(), count: 1 };
        assert_eq!(HostInputs::len(&raw, 0), Some(0));
    }
}
