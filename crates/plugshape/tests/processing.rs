//! End-to-end processing through every audio shape.

use approx::assert_relative_eq;
use plugshape::core::channels::Direction;
use plugshape::core::classify::WidthSupport;
use plugshape::prelude::*;

fn ramp(frames: usize, step: f32) -> Vec<f32> {
    (0..frames).map(|i| (i as f32 * step).sin()).collect()
}

/// Run one block of `f32` channels through `processor`.
fn run<E: Effect>(processor: &mut Processor<E>, inputs: &[Vec<f32>], outputs: &mut [Vec<f32>], frames: usize) {
    let ins: Vec<&[f32]> = inputs.iter().map(Vec::as_slice).collect();
    let mut outs: Vec<&mut [f32]> = outputs.iter_mut().map(Vec::as_mut_slice).collect();
    processor.process(&ins, &mut outs, frames).unwrap();
}

// =============================================================================
// Effects
// =============================================================================

#[derive(Clone, Default)]
struct Doubler {
    prepared_rate: Option<f64>,
}

#[audio_effect(input_channels = 2, output_channels = 2)]
impl Doubler {
    fn process(&mut self, buffer: &mut Buffer<f64>) {
        for (input, output) in buffer.zip_channels() {
            for (i, o) in input.iter().zip(output.iter_mut()) {
                *o = *i * 2.0;
            }
        }
    }

    fn prepare(&mut self, setup: &AudioSetup) {
        self.prepared_rate = Some(setup.sample_rate);
    }
}

#[derive(Clone, Default)]
struct Counter {
    count: f64,
}

#[audio_effect]
impl Counter {
    fn process(&mut self, input: f64) -> f64 {
        self.count += 1.0;
        input + self.count
    }
}

#[derive(Clone, Default)]
struct Reverse;

#[audio_effect]
impl Reverse {
    fn process(&mut self, input: &[f32], output: &mut [f32]) {
        for (o, i) in output.iter_mut().zip(input.iter().rev()) {
            *o = *i;
        }
    }
}

#[derive(Default, Ports)]
struct MixerInputs {
    gain: f32,
    main: BusPort<f32>,
    #[port(channels = 1)]
    sidechain: BusPort<f32>,
}

#[derive(Default, Ports)]
struct MixerOutputs {
    #[port(mirror = "main")]
    main: BusPort<f32>,
}

#[derive(Clone, Default)]
struct Mixer;

#[audio_effect]
impl Mixer {
    fn process(&mut self, inputs: &MixerInputs, outputs: &mut MixerOutputs) {
        let side = inputs.sidechain.channel(0);
        for c in 0..outputs.main.channels() {
            let input = inputs.main.channel(c);
            for (i, o) in outputs.main.channel_mut(c).iter_mut().enumerate() {
                *o = input[i] * inputs.gain + side[i];
            }
        }
    }
}

#[derive(Default, Ports)]
struct StereoFrame {
    #[port(channels = 2)]
    frame: FramePort<f64>,
}

#[derive(Clone, Default)]
struct Swap;

#[audio_effect]
impl Swap {
    fn process(&mut self, inputs: &StereoFrame, outputs: &mut StereoFrame) {
        let frame = inputs.frame.frame();
        let out = outputs.frame.frame_mut();
        out[0] = frame[1];
        out[1] = frame[0];
    }
}

#[derive(Default, Ports)]
struct PairIn {
    left: SamplePort<f64>,
    right: SamplePort<f64>,
}

#[derive(Default, Ports)]
struct SumOut {
    sum: SamplePort<f64>,
}

#[derive(Clone, Default)]
struct Summer;

#[audio_effect]
impl Summer {
    fn process(&mut self, inputs: &PairIn, outputs: &mut SumOut) {
        outputs.sum.sample = inputs.left.sample + inputs.right.sample;
    }
}

#[derive(Default, Ports)]
struct HoldIn {
    x: SamplePort<f64>,
}

#[derive(Default, Ports)]
struct HoldOut {
    y: SamplePort<f64>,
}

/// Outputs the previous input of its own channel.
#[derive(Clone, Default)]
struct Delay {
    last: f64,
}

#[audio_effect]
impl Delay {
    fn process(&mut self, inputs: &HoldIn, outputs: &mut HoldOut) {
        outputs.y.sample = self.last;
        self.last = inputs.x.sample;
    }
}

#[derive(Default, Ports)]
struct ChannelIn {
    input: ChannelPort<f32>,
}

#[derive(Default, Ports)]
struct ChannelOut {
    output: ChannelPort<f32>,
}

#[derive(Clone, Default)]
struct Invert;

#[audio_effect]
impl Invert {
    fn process(&mut self, inputs: &ChannelIn, outputs: &mut ChannelOut) {
        for (o, i) in outputs.output.samples_mut().iter_mut().zip(inputs.input.samples()) {
            *o = -*i;
        }
    }
}

#[derive(Default, Ports)]
struct Controls {
    level: f32,
}

#[derive(Clone, Default)]
struct Meter {
    blocks: usize,
    last_level: f32,
}

#[audio_effect]
impl Meter {
    fn process(&mut self, controls: &Controls) {
        self.blocks += 1;
        self.last_level = controls.level;
    }
}

#[derive(Default, Ports)]
struct TrimControls {
    gain: f32,
}

#[derive(Default, Ports)]
struct TrimReport {
    peak: f32,
}

#[derive(Clone, Default)]
struct Trim;

#[audio_effect]
impl Trim {
    fn process(&mut self, input: f32, controls: &TrimControls, report: &mut TrimReport) -> f32 {
        let output = input * controls.gain;
        report.peak = report.peak.max(output.abs());
        output
    }
}

#[derive(Default, Ports)]
struct TiltControls {
    offset: f64,
}

#[derive(Clone, Default)]
struct Tilt;

#[audio_effect]
impl Tilt {
    fn process(&mut self, input: &[f64], output: &mut [f64], controls: &TiltControls) {
        for (i, o) in input.iter().zip(output.iter_mut()) {
            *o = *i + controls.offset;
        }
    }
}

// =============================================================================
// Bus argument
// =============================================================================

#[test]
fn f64_bus_effect_on_f32_host() {
    let mut processor = Processor::new(Doubler::default()).unwrap();
    assert!(processor.prepare(&ProcessSetup::new(48000.0, 128)));
    assert_eq!(processor.voices()[0].effect.prepared_rate, Some(48000.0));

    let inputs = vec![ramp(128, 0.01), ramp(128, -0.03)];
    let mut outputs = vec![vec![0.0; 128]; 2];
    run(&mut processor, &inputs, &mut outputs, 128);

    for (input, output) in inputs.iter().zip(&outputs) {
        for (x, y) in input.iter().zip(output) {
            let expected = (*x as f64 * 2.0) as f32;
            assert_eq!(y.to_bits(), expected.to_bits());
        }
    }
}

#[test]
fn fixed_channel_count_rejects_others() {
    let mut processor = Processor::new(Doubler::default()).unwrap();
    assert!(!processor.set_input_channels(0, 1));
    assert!(!processor.set_output_channels(0, 6));
    assert!(!processor.set_input_channels(1, 2));
    assert_eq!(processor.input_channels(0), 2);
    assert_eq!(processor.input_channels(1), 0);
}

#[test]
fn mismatched_host_channels_leave_outputs_untouched() {
    let mut processor = Processor::new(Doubler::default()).unwrap();
    let input = [1.0_f32; 8];
    let mut out = [9.0_f32; 8];
    let err = processor.process::<f32>(&[&input], &mut [&mut out], 8).unwrap_err();
    assert_eq!(
        err,
        ProcessError::ChannelMismatch {
            direction: Direction::Input,
            expected: 2,
            actual: 1
        }
    );
    assert_eq!(out, [9.0; 8]);
}

// =============================================================================
// Mono shapes
// =============================================================================

#[test]
fn sample_argument_runs_one_voice_per_channel() {
    let mut processor = Processor::new(Counter::default()).unwrap();
    assert!(processor.set_input_channels(0, 2));
    assert_eq!(processor.output_channels(0), 2);

    let inputs = vec![vec![0.0; 4], vec![10.0; 4]];
    let mut outputs = vec![vec![0.0; 4]; 2];
    run(&mut processor, &inputs, &mut outputs, 4);

    // Each channel counts its own calls.
    assert_eq!(outputs[0], [1.0, 2.0, 3.0, 4.0]);
    assert_eq!(outputs[1], [11.0, 12.0, 13.0, 14.0]);
}

#[test]
fn new_voices_start_from_the_prototype() {
    let mut processor = Processor::new(Counter { count: 100.0 }).unwrap();
    assert!(processor.set_input_channels(0, 1));
    let mut outputs = vec![vec![0.0; 2]];
    run(&mut processor, &[vec![0.0; 2]], &mut outputs, 2);
    assert_eq!(outputs[0], [101.0, 102.0]);

    assert!(processor.set_input_channels(0, 2));
    let mut outputs = vec![vec![0.0; 1]; 2];
    run(&mut processor, &[vec![0.0], vec![0.0]], &mut outputs, 1);
    assert_eq!(outputs[0], [103.0]);
    assert_eq!(outputs[1], [101.0]);
}

#[test]
fn channel_argument_per_channel() {
    let mut processor = Processor::new(Reverse).unwrap();
    assert!(processor.set_input_channels(0, 2));
    let inputs = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
    let mut outputs = vec![vec![0.0; 3]; 2];
    run(&mut processor, &inputs, &mut outputs, 3);
    assert_eq!(outputs, [[3.0, 2.0, 1.0], [6.0, 5.0, 4.0]]);
}

#[test]
fn sample_argument_reads_and_writes_control_records() {
    let mut processor = Processor::new(Trim).unwrap();
    assert_eq!(processor.variant(), AudioVariant::SampleArg(WidthSupport::Only(SampleWidth::F32)));
    assert!(processor.set_input_channels(0, 2));
    for (c, voice) in processor.voices_mut().iter_mut().enumerate() {
        voice.inputs.gain = if c == 0 { 0.5 } else { -2.0 };
    }

    let inputs = vec![vec![1.0, -3.0, 2.0], vec![0.25, 0.5, -0.125]];
    let mut outputs = vec![vec![0.0; 3]; 2];
    run(&mut processor, &inputs, &mut outputs, 3);

    assert_eq!(outputs[0], [0.5, -1.5, 1.0]);
    assert_eq!(outputs[1], [-0.5, -1.0, 0.25]);
    assert_eq!(processor.voices()[0].outputs.peak, 1.5);
    assert_eq!(processor.voices()[1].outputs.peak, 1.0);
}

#[test]
fn channel_argument_controls_at_converted_width() {
    let mut processor = Processor::new(Tilt).unwrap();
    assert!(processor.set_input_channels(0, 1));
    processor.configure(8, 48000.0);
    processor.voices_mut()[0].inputs.offset = 0.25;

    let inputs = vec![vec![0.5_f32; 8]];
    let mut outputs = vec![vec![0.0; 8]];
    run(&mut processor, &inputs, &mut outputs, 8);
    assert_relative_eq!(outputs[0][7], 0.75);
}

#[test]
fn in_place_raw_processing_sees_original_input() {
    let mut processor = Processor::new(Reverse).unwrap();
    assert!(processor.set_input_channels(0, 1));
    let mut channel = [1.0_f32, 2.0, 3.0, 4.0];
    let table = [channel.as_mut_ptr()];
    let result = unsafe { processor.process_raw(table.as_ptr(), 1, table.as_ptr(), 1, 4) };
    assert_eq!(result, Ok(()));
    assert_eq!(channel, [4.0, 3.0, 2.0, 1.0]);
}

#[test]
fn sample_ports_one_to_one_keep_per_channel_state() {
    let mut processor = Processor::new(Delay::default()).unwrap();
    assert_eq!(processor.variant(), AudioVariant::SamplePort(SampleWidth::F64));
    assert!(processor.set_input_channels(0, 2));

    let inputs = vec![vec![1.0, 2.0, 3.0], vec![-1.0, -2.0, -3.0]];
    let mut outputs = vec![vec![9.0; 3]; 2];
    run(&mut processor, &inputs, &mut outputs, 3);
    assert_eq!(outputs[0], [0.0, 1.0, 2.0]);
    assert_eq!(outputs[1], [0.0, -1.0, -2.0]);
}

#[test]
fn channel_ports_one_to_one() {
    let mut processor = Processor::new(Invert).unwrap();
    assert_eq!(processor.variant(), AudioVariant::ChannelPort(SampleWidth::F32));
    assert!(processor.set_input_channels(0, 3));
    let inputs = vec![vec![0.5; 8], vec![0.25; 8], vec![-1.0; 8]];
    let mut outputs = vec![vec![0.0; 8]; 3];
    run(&mut processor, &inputs, &mut outputs, 8);
    assert_eq!(outputs[0], [-0.5; 8]);
    assert_eq!(outputs[1], [-0.25; 8]);
    assert_eq!(outputs[2], [1.0; 8]);
}

// =============================================================================
// Port shapes
// =============================================================================

#[test]
fn bus_ports_follow_mirror() {
    let mut processor = Processor::new(Mixer).unwrap();
    assert_eq!(processor.output_channels(0), 0);
    assert!(processor.set_input_channels(0, 2));
    assert_eq!(processor.output_channels(0), 2);
    assert!(!processor.set_output_channels(0, 3));
    assert!(!processor.set_input_channels(1, 2));
    processor.voices_mut()[0].inputs.gain = 0.5;
    processor.configure(64, 44100.0);

    let inputs = vec![vec![1.0; 64], vec![-1.0; 64], vec![0.25; 64]];
    let mut outputs = vec![vec![0.0; 64]; 2];
    run(&mut processor, &inputs, &mut outputs, 64);
    assert_relative_eq!(outputs[0][0], 0.75);
    assert_relative_eq!(outputs[1][63], -0.25);

    assert!(processor.set_input_channels(0, 1));
    assert_eq!(processor.output_channels(0), 1);
    let inputs = vec![vec![2.0; 16], vec![0.0; 16]];
    let mut outputs = vec![vec![0.0; 16]];
    run(&mut processor, &inputs, &mut outputs, 16);
    assert_relative_eq!(outputs[0][15], 1.0);
}

#[test]
fn ports_are_unbound_after_processing() {
    let mut processor = Processor::new(Mixer).unwrap();
    assert!(processor.set_input_channels(0, 1));
    let inputs = vec![vec![1.0; 4], vec![0.0; 4]];
    let mut outputs = vec![vec![0.0; 4]];
    run(&mut processor, &inputs, &mut outputs, 4);

    let voice = &processor.voices()[0];
    assert!(!voice.inputs.main.is_bound());
    assert!(voice.inputs.sidechain.channel(0).is_empty());
    assert_eq!(voice.outputs.main.channels(), 0);
}

#[test]
fn frame_ports_convert_each_frame() {
    let mut processor = Processor::new(Swap).unwrap();
    assert_eq!(processor.variant(), AudioVariant::FramePort(SampleWidth::F64));
    let inputs = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
    let mut outputs = vec![vec![0.0; 2]; 2];
    run(&mut processor, &inputs, &mut outputs, 2);
    assert_eq!(outputs, [[3.0, 4.0], [1.0, 2.0]]);
}

#[test]
fn frame_ports_in_place_keep_the_whole_frame() {
    let mut processor = Processor::new(Swap).unwrap();
    let mut left = [1.0_f64, 2.0];
    let mut right = [3.0_f64, 4.0];
    let table = [left.as_mut_ptr(), right.as_mut_ptr()];
    let result = unsafe { processor.process_raw(table.as_ptr(), 2, table.as_ptr(), 2, 2) };
    assert_eq!(result, Ok(()));
    assert_eq!(left, [3.0, 4.0]);
    assert_eq!(right, [1.0, 2.0]);
}

#[test]
fn sample_ports_n_to_m() {
    let mut processor = Processor::new(Summer).unwrap();
    let inputs = vec![vec![1.0, 2.0, 3.0], vec![0.5, 0.5, 0.5]];
    let mut outputs = vec![vec![0.0; 3]];
    run(&mut processor, &inputs, &mut outputs, 3);
    assert_eq!(outputs[0], [1.5, 2.5, 3.5]);
}

#[test]
fn not_audio_runs_once_per_block() {
    let mut processor = Processor::new(Meter::default()).unwrap();
    assert_eq!(processor.variant(), AudioVariant::NotAudio);
    assert!(!processor.set_input_channels(0, 0));
    processor.voices_mut()[0].inputs.level = -6.0;

    processor.process::<f32>(&[], &mut [], 32).unwrap();
    processor.process::<f64>(&[], &mut [], 32).unwrap();
    let effect = &processor.voices()[0].effect;
    assert_eq!(effect.blocks, 2);
    assert_eq!(effect.last_level, -6.0);
    assert!(processor.prepare(&ProcessSetup::new(44100.0, 32).with_input_channels(0).with_output_channels(0)));
}

// =============================================================================
// Zero frames
// =============================================================================

fn assert_zero_frames_is_no_op<E: Effect>(effect: E) {
    let mut processor = Processor::new(effect).unwrap();
    let input = [1.0_f32; 4];
    let mut out = [7.0_f32; 4];
    // Channel counts don't even matter for an empty block.
    assert_eq!(processor.process::<f32>(&[&input], &mut [&mut out], 0), Ok(()));
    assert_eq!(out, [7.0; 4]);
}

#[test]
fn zero_frames_is_a_no_op_for_every_shape() {
    assert_zero_frames_is_no_op(Doubler::default());
    assert_zero_frames_is_no_op(Counter::default());
    assert_zero_frames_is_no_op(Reverse);
    assert_zero_frames_is_no_op(Mixer);
    assert_zero_frames_is_no_op(Swap);
    assert_zero_frames_is_no_op(Summer);
    assert_zero_frames_is_no_op(Delay::default());
    assert_zero_frames_is_no_op(Invert);

    let mut meter = Processor::new(Meter::default()).unwrap();
    meter.process::<f32>(&[], &mut [], 0).unwrap();
    assert_eq!(meter.voices()[0].effect.blocks, 0);
}
