//! Per-instance processing engine.
//!
//! [`Processor`] wraps one effect instance and exposes the normalized
//! contract host bindings drive:
//!
//! ```text
//! host binding
//!      ↓  set_*_channels / configure / process
//! Processor<E>   (channel plan, voices, conversion pools)
//!      ↓  Invocation in the classified shape
//! effect author's code
//! ```
//!
//! Configuration calls and `process` must not overlap on one instance;
//! bindings serialize them (usually configuring while the graph is stopped).
//! Distinct instances share nothing mutable and may run on different
//! threads.

use std::sync::Arc;

use crate::adapter::{self, channels_overlap, check_host, BufferPool, HostInputs, HostOutputs, RawChannels};
use crate::channels::ChannelPlan;
use crate::classify::{classify, AudioVariant, EffectLayout};
use crate::config::ProcessSetup;
use crate::effect::{AudioSetup, Effect};
use crate::error::{ClassifyResult, ProcessError, ProcessResult};
use crate::sample::{Sample, SampleWidth};

/// One copy of the effect with its own port records.
///
/// Mono shapes get one voice per channel; every other shape has exactly one.
pub struct Voice<E: Effect> {
    pub effect: E,
    pub inputs: E::Inputs,
    pub outputs: E::Outputs,
}

impl<E: Effect> Voice<E> {
    fn new(effect: E) -> Self {
        Self {
            effect,
            inputs: E::Inputs::default(),
            outputs: E::Outputs::default(),
        }
    }
}

/// An effect instance plus everything needed to run it in any host shape.
pub struct Processor<E: Effect> {
    plan: ChannelPlan,
    prototype: E,
    voices: Vec<Voice<E>>,
    pool_f32: BufferPool<f32>,
    pool_f64: BufferPool<f64>,
    setup: Option<AudioSetup>,
    mismatch_reported: bool,
}

impl<E: Effect> Processor<E> {
    /// Classify `E` and wrap `effect`.
    pub fn new(effect: E) -> ClassifyResult<Self> {
        Ok(Self::with_layout(effect, Arc::new(classify::<E>()?)))
    }

    /// Wrap `effect` using an already classified layout (see
    /// [`Registry`](crate::registry::Registry)).
    pub fn with_layout(effect: E, layout: Arc<EffectLayout>) -> Self {
        let voices = if layout.mono {
            Vec::new()
        } else {
            vec![Voice::new(effect.clone())]
        };
        Self {
            plan: ChannelPlan::new(layout),
            prototype: effect,
            voices,
            pool_f32: BufferPool::default(),
            pool_f64: BufferPool::default(),
            setup: None,
            mismatch_reported: false,
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    #[inline]
    pub fn layout(&self) -> &EffectLayout {
        self.plan.layout()
    }

    #[inline]
    pub fn variant(&self) -> AudioVariant {
        self.plan.layout().variant
    }

    #[inline]
    pub fn plan(&self) -> &ChannelPlan {
        &self.plan
    }

    /// Setup from the last successful `configure`.
    #[inline]
    pub fn audio_setup(&self) -> Option<AudioSetup> {
        self.setup
    }

    #[inline]
    pub fn voices(&self) -> &[Voice<E>] {
        &self.voices
    }

    #[inline]
    pub fn voices_mut(&mut self) -> &mut [Voice<E>] {
        &mut self.voices
    }

    /// The effect new voices are cloned from.
    #[inline]
    pub fn prototype(&self) -> &E {
        &self.prototype
    }

    // =========================================================================
    // Channel negotiation
    // =========================================================================

    /// See [`ChannelPlan::set_input_channels`].
    pub fn set_input_channels(&mut self, bus: usize, requested: usize) -> bool {
        let accepted = self.plan.set_input_channels(bus, requested);
        if accepted {
            self.plan_changed();
        }
        accepted
    }

    /// See [`ChannelPlan::set_output_channels`].
    pub fn set_output_channels(&mut self, bus: usize, requested: usize) -> bool {
        let accepted = self.plan.set_output_channels(bus, requested);
        if accepted {
            self.plan_changed();
        }
        accepted
    }

    /// Negotiated input channels of `bus`, 0 if it doesn't exist.
    #[inline]
    pub fn input_channels(&self, bus: usize) -> usize {
        self.plan.input_channels(bus)
    }

    /// Negotiated output channels of `bus`, 0 if it doesn't exist.
    #[inline]
    pub fn output_channels(&self, bus: usize) -> usize {
        self.plan.output_channels(bus)
    }

    fn plan_changed(&mut self) {
        if self.plan.layout().mono {
            let wanted = self.plan.input_channels(0);
            self.voices.truncate(wanted);
            while self.voices.len() < wanted {
                let mut voice = Voice::new(self.prototype.clone());
                if let Some(setup) = &self.setup {
                    voice.effect.prepare(setup);
                }
                self.voices.push(voice);
            }
        }
        if let Some(setup) = self.setup {
            self.allocate(setup.max_block_size);
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Prepare for blocks of up to `block_size` frames.
    ///
    /// Allocates conversion storage for the current channel plan and calls
    /// every voice's prepare hook. A zero block size is ignored.
    pub fn configure(&mut self, block_size: usize, sample_rate: f64) {
        if block_size == 0 {
            log::warn!("`{}`: ignoring configure with zero block size", self.plan.layout().name);
            return;
        }
        let setup = AudioSetup {
            sample_rate,
            max_block_size: block_size,
        };
        for voice in &mut self.voices {
            voice.effect.prepare(&setup);
        }
        self.setup = Some(setup);
        self.allocate(block_size);
        log::debug!(
            "`{}`: configured {} frames at {} Hz ({} in / {} out)",
            self.plan.layout().name,
            block_size,
            sample_rate,
            self.plan.total_input_channels(),
            self.plan.total_output_channels()
        );
    }

    /// Apply a host configuration: channel counts of bus 0, then
    /// [`configure`](Self::configure).
    ///
    /// Both counts are checked before either is applied: if one is rejected
    /// this returns false and the plan, voices and storage stay as they
    /// were. An effect without a bus in one direction accepts only 0 there.
    pub fn prepare(&mut self, setup: &ProcessSetup) -> bool {
        if !self.plan.admits_main(setup.input_channels, setup.output_channels) {
            log::warn!(
                "`{}`: unsupported configuration {} in / {} out",
                self.plan.layout().name,
                setup.input_channels,
                setup.output_channels
            );
            return false;
        }
        let applied = (self.plan.input_bus_count() == 0 || self.set_input_channels(0, setup.input_channels))
            && (self.plan.output_bus_count() == 0 || self.set_output_channels(0, setup.output_channels));
        if !applied {
            return false;
        }
        self.configure(setup.frames_per_buffer, setup.sample_rate);
        true
    }

    fn allocate(&mut self, block_size: usize) {
        let widths = self.plan.layout().variant.widths();
        // Block storage at `native` is only needed when hosts at `other` must be converted.
        let converts = |native: SampleWidth, other: SampleWidth| {
            widths.is_some_and(|w| w.supports(native) && !w.supports(other))
        };
        let result = self
            .pool_f32
            .allocate(&self.plan, block_size, converts(SampleWidth::F32, SampleWidth::F64))
            .and_then(|()| {
                self.pool_f64
                    .allocate(&self.plan, block_size, converts(SampleWidth::F64, SampleWidth::F32))
            });
        match result {
            Ok(()) => log::debug!(
                "`{}`: conversion pool holds {} samples",
                self.plan.layout().name,
                self.pool_f32.footprint() + self.pool_f64.footprint()
            ),
            Err(err) => log::error!("`{}`: {}", self.plan.layout().name, err),
        }
    }

    // =========================================================================
    // Processing
    // =========================================================================

    /// Run one block.
    ///
    /// `inputs` and `outputs` hold every channel of every bus, bus after bus,
    /// and must match the negotiated plan. A zero frame count does nothing.
    /// On error the effect isn't called and outputs are untouched.
    pub fn process<H: Sample>(
        &mut self,
        inputs: &[&[H]],
        outputs: &mut [&mut [H]],
        frames: usize,
    ) -> ProcessResult<()> {
        self.process_host::<H, _, _>(inputs, outputs, frames, false)
    }

    /// Run one block from raw channel pointer arrays.
    ///
    /// Input and output channels may share storage; the block is then staged
    /// through the conversion pool.
    ///
    /// # Safety
    ///
    /// `inputs` must point at `num_inputs` channel pointers and `outputs` at
    /// `num_outputs`, each valid for `frames` samples for the duration of the
    /// call. Null channel pointers are reported as short buffers.
    pub unsafe fn process_raw<H: Sample>(
        &mut self,
        inputs: *const *mut H,
        num_inputs: usize,
        outputs: *const *mut H,
        num_outputs: usize,
        frames: usize,
    ) -> ProcessResult<()> {
        let host_in = RawChannels {
            table: inputs,
            count: if inputs.is_null() { 0 } else { num_inputs },
        };
        let mut host_out = RawChannels {
            table: outputs,
            count: if outputs.is_null() { 0 } else { num_outputs },
        };
        let aliased = channels_overlap(&host_in, &host_out, frames);
        self.process_host::<H, _, _>(&host_in, &mut host_out, frames, aliased)
    }

    fn process_host<H, I, O>(&mut self, inputs: &I, outputs: &mut O, frames: usize, aliased: bool) -> ProcessResult<()>
    where
        H: Sample,
        I: HostInputs<H> + ?Sized,
        O: HostOutputs<H> + ?Sized,
    {
        if frames == 0 {
            return Ok(());
        }
        if let Err(err) = check_host::<H, I, O>(&self.plan, inputs, outputs, frames) {
            self.report(&err);
            return Err(err);
        }

        let native = self.plan.layout().native_width(H::WIDTH);
        let result = match native {
            Some(SampleWidth::F64) => adapter::run::<E, H, f64, I, O>(
                &self.plan,
                &mut self.voices,
                &mut self.pool_f64,
                inputs,
                outputs,
                frames,
                aliased,
            ),
            _ => adapter::run::<E, H, f32, I, O>(
                &self.plan,
                &mut self.voices,
                &mut self.pool_f32,
                inputs,
                outputs,
                frames,
                aliased,
            ),
        };
        if let Err(err) = &result {
            log::error!("`{}`: skipped block: {}", self.plan.layout().name, err);
        }
        result
    }

    fn report(&mut self, err: &ProcessError) {
        if !self.mismatch_reported {
            self.mismatch_reported = true;
            log::warn!("`{}`: {}", self.plan.layout().name, err);
        }
    }
}
