//! Shape classification.
//!
//! Turns the static facts about an effect (its entry points and its input and
//! output records) into exactly one [`AudioVariant`] plus the bus tables the
//! negotiator and the processor work from.
//!
//! # Rules
//!
//! - An effect must declare at least one entry point.
//! - Argument entry points and port entry points are not combined.
//! - Records taken by argument entry points hold control values, never
//!   audio ports.
//! - Every audio-facing element (argument entry points and port fields)
//!   belongs to one carrier family: sample, channel, bus or frame.
//! - Argument effects may implement one shape at both widths; the host's
//!   width is then used directly. Port effects use one width for all ports.
//! - No audio at all classifies as [`AudioVariant::NotAudio`].
//!
//! Mono shapes (sample/channel arguments, and a single sample or channel
//! port in each direction) expose one dynamic input bus whose output mirrors
//! it; the processor runs one copy of the effect per channel. Sample or
//! channel ports in any other layout become fixed single-channel buses.
//!
//! Classification is pure: the same effect type always yields the same
//! layout, so results can be cached and shared (see
//! [`Registry`](crate::registry::Registry)).

use std::fmt;

use crate::effect::{Effect, EffectDescriptor, EntryShape};
use crate::error::{ClassifyError, ClassifyResult};
use crate::introspect::{FieldIndex, FieldInfo, RecordDescriptor};
use crate::port::{AudioPortType, Carrier};
use crate::sample::SampleWidth;

// =============================================================================
// Variant
// =============================================================================

/// Which widths an effect can process natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidthSupport {
    Only(SampleWidth),
    Both,
}

impl WidthSupport {
    /// Native width to run at for a host delivering `host`.
    #[inline]
    pub fn pick(self, host: SampleWidth) -> SampleWidth {
        match self {
            WidthSupport::Only(width) => width,
            WidthSupport::Both => host,
        }
    }

    #[inline]
    pub fn supports(self, width: SampleWidth) -> bool {
        match self {
            WidthSupport::Only(only) => only == width,
            WidthSupport::Both => true,
        }
    }

    fn merge(current: Option<WidthSupport>, width: SampleWidth) -> WidthSupport {
        match current {
            None => WidthSupport::Only(width),
            Some(WidthSupport::Only(w)) if w == width => WidthSupport::Only(w),
            Some(_) => WidthSupport::Both,
        }
    }
}

/// The closed set of audio interface shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioVariant {
    /// `fn(&mut self, S) -> S`, once per sample per channel.
    SampleArg(WidthSupport),
    /// `fn(&mut self, &[S], &mut [S])`, once per channel per block.
    ChannelArg(WidthSupport),
    /// `fn(&mut self, &mut Buffer<S>)`, once per block.
    BusArg(WidthSupport),
    /// One sample port in, one out; once per sample per channel.
    SamplePort(SampleWidth),
    /// Channel ports; once per block (per channel when 1:1).
    ChannelPort(SampleWidth),
    /// Bus ports; once per block.
    BusPort(SampleWidth),
    /// Frame ports, or sample ports in an N:M layout; once per sample.
    FramePort(SampleWidth),
    /// No audio I/O. The port entry point runs once per block.
    NotAudio,
}

impl AudioVariant {
    /// Carrier family, or `None` for [`AudioVariant::NotAudio`].
    pub fn family(&self) -> Option<Carrier> {
        match self {
            AudioVariant::SampleArg(_) | AudioVariant::SamplePort(_) => Some(Carrier::Sample),
            AudioVariant::ChannelArg(_) | AudioVariant::ChannelPort(_) => Some(Carrier::Channel),
            AudioVariant::BusArg(_) | AudioVariant::BusPort(_) => Some(Carrier::Bus),
            AudioVariant::FramePort(_) => Some(Carrier::Frame),
            AudioVariant::NotAudio => None,
        }
    }

    /// Native widths, or `None` for [`AudioVariant::NotAudio`].
    pub fn widths(&self) -> Option<WidthSupport> {
        match *self {
            AudioVariant::SampleArg(w) | AudioVariant::ChannelArg(w) | AudioVariant::BusArg(w) => {
                Some(w)
            }
            AudioVariant::SamplePort(w)
            | AudioVariant::ChannelPort(w)
            | AudioVariant::BusPort(w)
            | AudioVariant::FramePort(w) => Some(WidthSupport::Only(w)),
            AudioVariant::NotAudio => None,
        }
    }

    /// Whether the effect runs once per frame rather than once per block.
    pub fn is_per_frame(&self) -> bool {
        matches!(
            self,
            AudioVariant::SampleArg(_) | AudioVariant::SamplePort(_) | AudioVariant::FramePort(_)
        )
    }
}

impl fmt::Display for AudioVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, widths) = match self {
            AudioVariant::SampleArg(w) => ("sample-argument", Some(*w)),
            AudioVariant::ChannelArg(w) => ("channel-argument", Some(*w)),
            AudioVariant::BusArg(w) => ("bus-argument", Some(*w)),
            AudioVariant::SamplePort(w) => ("sample-port", Some(WidthSupport::Only(*w))),
            AudioVariant::ChannelPort(w) => ("channel-port", Some(WidthSupport::Only(*w))),
            AudioVariant::BusPort(w) => ("bus-port", Some(WidthSupport::Only(*w))),
            AudioVariant::FramePort(w) => ("frame-port", Some(WidthSupport::Only(*w))),
            AudioVariant::NotAudio => ("not-audio", None),
        };
        match widths {
            Some(WidthSupport::Only(w)) => write!(f, "{name}({w})"),
            Some(WidthSupport::Both) => write!(f, "{name}(f32|f64)"),
            None => f.write_str(name),
        }
    }
}

// =============================================================================
// Bus tables
// =============================================================================

/// How a bus's channel count is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// Exactly this many channels.
    Fixed(usize),
    /// Whatever the host asks for.
    Dynamic,
    /// Always the current count of this input bus.
    Mirrors(usize),
}

/// One classified input or output bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusDescriptor {
    pub name: &'static str,
    /// Unfiltered field index in the record, for port shapes.
    pub field: Option<usize>,
    pub carrier: Carrier,
    pub arity: Arity,
}

/// Result of classifying one effect type. Immutable and shareable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectLayout {
    pub name: &'static str,
    pub variant: AudioVariant,
    pub inputs: Vec<BusDescriptor>,
    pub outputs: Vec<BusDescriptor>,
    /// One effect voice per channel.
    pub mono: bool,
}

impl EffectLayout {
    #[inline]
    pub fn input_bus(&self, bus: usize) -> Option<&BusDescriptor> {
        self.inputs.get(bus)
    }

    #[inline]
    pub fn output_bus(&self, bus: usize) -> Option<&BusDescriptor> {
        self.outputs.get(bus)
    }

    /// Native width for a host delivering `host`, or `None` without audio.
    #[inline]
    pub fn native_width(&self, host: SampleWidth) -> Option<SampleWidth> {
        self.variant.widths().map(|w| w.pick(host))
    }
}

// =============================================================================
// classify
// =============================================================================

/// Classify an effect type.
pub fn classify<E: Effect>() -> ClassifyResult<EffectLayout> {
    classify_descriptor(&E::descriptor())
}

/// Classify from a descriptor.
pub fn classify_descriptor(desc: &EffectDescriptor) -> ClassifyResult<EffectLayout> {
    let effect = desc.name;
    if desc.entry_points.is_empty() {
        return Err(ClassifyError::NoEntryPoint { effect });
    }

    let has_port_entry = desc
        .entry_points
        .iter()
        .any(|e| e.shape == EntryShape::Ports);
    let arg_shapes: Vec<EntryShape> = desc
        .entry_points
        .iter()
        .map(|e| e.shape)
        .filter(|s| *s != EntryShape::Ports)
        .collect();

    if has_port_entry && !arg_shapes.is_empty() {
        return Err(ClassifyError::MixedEntryStyles { effect });
    }

    let in_ports = desc.inputs.audio_ports();
    let out_ports = desc.outputs.audio_ports();

    // Records next to audio arguments carry control values only.
    if !arg_shapes.is_empty() {
        if let Some((port, _, _)) = in_ports.iter().chain(out_ports.iter()).next() {
            return Err(ClassifyError::PortsWithArguments { effect, port });
        }
    }

    let mut families = Vec::new();
    let arg_carriers = arg_shapes.iter().map(|s| arg_carrier(*s));
    let port_carriers = port_types(desc.inputs, &in_ports)
        .chain(port_types(desc.outputs, &out_ports))
        .map(|ty| ty.carrier);
    for carrier in arg_carriers.chain(port_carriers) {
        if !families.contains(&carrier) {
            families.push(carrier);
        }
    }
    if families.len() > 1 {
        return Err(ClassifyError::MultipleCarriers { effect, families });
    }

    let layout = match families.first() {
        None => EffectLayout {
            name: effect,
            variant: AudioVariant::NotAudio,
            inputs: Vec::new(),
            outputs: Vec::new(),
            mono: false,
        },
        Some(&carrier) if !arg_shapes.is_empty() => arg_layout(desc, carrier, &arg_shapes),
        Some(&carrier) => port_layout(desc, carrier, &in_ports, &out_ports)?,
    };

    log::debug!("classified `{}` as {}", effect, layout.variant);
    Ok(layout)
}

fn arg_carrier(shape: EntryShape) -> Carrier {
    match shape {
        EntryShape::SampleArg(_) => Carrier::Sample,
        EntryShape::ChannelArg(_) => Carrier::Channel,
        EntryShape::BusArg(_) | EntryShape::Ports => Carrier::Bus,
    }
}

fn arg_width(shape: EntryShape) -> Option<SampleWidth> {
    match shape {
        EntryShape::SampleArg(w) | EntryShape::ChannelArg(w) | EntryShape::BusArg(w) => Some(w),
        EntryShape::Ports => None,
    }
}

fn port_types<'a>(
    record: &'static RecordDescriptor,
    index: &'a FieldIndex,
) -> impl Iterator<Item = AudioPortType> + 'a {
    index
        .iter()
        .filter_map(move |(_, unfiltered, _)| record.fields[unfiltered].audio())
}

/// Mono input bus plus an output mirroring it.
fn mono_buses(
    carrier: Carrier,
    input: (&'static str, Option<usize>),
    output: (&'static str, Option<usize>),
) -> (Vec<BusDescriptor>, Vec<BusDescriptor>) {
    (
        vec![BusDescriptor {
            name: input.0,
            field: input.1,
            carrier,
            arity: Arity::Dynamic,
        }],
        vec![BusDescriptor {
            name: output.0,
            field: output.1,
            carrier,
            arity: Arity::Mirrors(0),
        }],
    )
}

fn arg_layout(desc: &EffectDescriptor, carrier: Carrier, shapes: &[EntryShape]) -> EffectLayout {
    let mut widths = None;
    for width in shapes.iter().filter_map(|s| arg_width(*s)) {
        widths = Some(WidthSupport::merge(widths, width));
    }
    // Every argument shape carries a width, and `shapes` is non-empty.
    let widths = widths.unwrap_or(WidthSupport::Only(SampleWidth::F32));

    let (variant, mono) = match carrier {
        Carrier::Sample => (AudioVariant::SampleArg(widths), true),
        Carrier::Channel => (AudioVariant::ChannelArg(widths), true),
        _ => (AudioVariant::BusArg(widths), false),
    };

    let (inputs, outputs) = if mono {
        mono_buses(carrier, ("input", None), ("output", None))
    } else {
        let io = desc.io_channels;
        let input_arity = io.inputs.map_or(Arity::Dynamic, Arity::Fixed);
        let output_arity = io.outputs.map_or(Arity::Mirrors(0), Arity::Fixed);
        (
            vec![BusDescriptor {
                name: "input",
                field: None,
                carrier,
                arity: input_arity,
            }],
            vec![BusDescriptor {
                name: "output",
                field: None,
                carrier,
                arity: output_arity,
            }],
        )
    };

    EffectLayout {
        name: desc.name,
        variant,
        inputs,
        outputs,
        mono,
    }
}

fn port_layout(
    desc: &EffectDescriptor,
    carrier: Carrier,
    in_ports: &FieldIndex,
    out_ports: &FieldIndex,
) -> ClassifyResult<EffectLayout> {
    let effect = desc.name;
    let mut width = None;
    for ty in port_types(desc.inputs, in_ports).chain(port_types(desc.outputs, out_ports)) {
        match width {
            None => width = Some(ty.width),
            Some(w) if w != ty.width => return Err(ClassifyError::MixedWidths { effect }),
            Some(_) => {}
        }
    }
    let width = width.unwrap_or(SampleWidth::F32);

    let one_to_one = in_ports.len() == 1 && out_ports.len() == 1;

    if matches!(carrier, Carrier::Sample | Carrier::Channel) {
        for field in in_ports.iter().map(|(_, i, _)| &desc.inputs.fields[i]) {
            reject_mono_arity(field)?;
        }
        for field in out_ports.iter().map(|(_, i, _)| &desc.outputs.fields[i]) {
            reject_mono_arity(field)?;
        }

        if one_to_one {
            let input = in_ports.nth(0);
            let output = out_ports.nth(0);
            let (inputs, outputs) = mono_buses(
                carrier,
                (input.name, Some(input.index)),
                (output.name, Some(output.index)),
            );
            let variant = match carrier {
                Carrier::Sample => AudioVariant::SamplePort(width),
                _ => AudioVariant::ChannelPort(width),
            };
            return Ok(EffectLayout {
                name: effect,
                variant,
                inputs,
                outputs,
                mono: true,
            });
        }

        let single = |field: &FieldInfo| BusDescriptor {
            name: field.name,
            field: Some(field.index),
            carrier,
            arity: Arity::Fixed(1),
        };
        let variant = match carrier {
            Carrier::Sample => AudioVariant::FramePort(width),
            _ => AudioVariant::ChannelPort(width),
        };
        return Ok(EffectLayout {
            name: effect,
            variant,
            inputs: in_ports.iter().map(|(_, i, _)| single(&desc.inputs.fields[i])).collect(),
            outputs: out_ports.iter().map(|(_, i, _)| single(&desc.outputs.fields[i])).collect(),
            mono: false,
        });
    }

    let mut inputs = Vec::with_capacity(in_ports.len());
    for (_, i, _) in in_ports.iter() {
        let field = &desc.inputs.fields[i];
        if field.mirror.is_some() {
            return Err(ClassifyError::MirrorOnInput { port: field.name });
        }
        inputs.push(BusDescriptor {
            name: field.name,
            field: Some(field.index),
            carrier,
            arity: field.channels.map_or(Arity::Dynamic, Arity::Fixed),
        });
    }

    let mut outputs = Vec::with_capacity(out_ports.len());
    for (_, i, _) in out_ports.iter() {
        let field = &desc.outputs.fields[i];
        let arity = match field.mirror {
            Some(target) => Arity::Mirrors(resolve_mirror(desc, in_ports, out_ports, field, target)?),
            None => field.channels.map_or(Arity::Dynamic, Arity::Fixed),
        };
        outputs.push(BusDescriptor {
            name: field.name,
            field: Some(field.index),
            carrier,
            arity,
        });
    }

    let variant = match carrier {
        Carrier::Frame => AudioVariant::FramePort(width),
        _ => AudioVariant::BusPort(width),
    };
    Ok(EffectLayout {
        name: effect,
        variant,
        inputs,
        outputs,
        mono: false,
    })
}

fn reject_mono_arity(field: &FieldInfo) -> ClassifyResult<()> {
    if field.mirror.is_some() || field.channels.is_some_and(|n| n != 1) {
        return Err(ClassifyError::MonoPortArity { port: field.name });
    }
    Ok(())
}

/// Input bus index an output mirrors. Only a single hop is allowed.
fn resolve_mirror(
    desc: &EffectDescriptor,
    in_ports: &FieldIndex,
    out_ports: &FieldIndex,
    field: &FieldInfo,
    target: &'static str,
) -> ClassifyResult<usize> {
    let port = field.name;
    if let Some((_, _, bus)) = in_ports.iter().find(|(name, _, _)| *name == target) {
        return Ok(bus);
    }
    match out_ports.iter().find(|(name, _, _)| *name == target) {
        Some((_, i, _)) if desc.outputs.fields[i].mirror.is_some() => {
            Err(ClassifyError::ChainedMirror { port, target })
        }
        Some(_) => Err(ClassifyError::MirrorTargetNotInput { port, target }),
        None => Err(ClassifyError::UnknownMirrorTarget { port, target }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{EntryPoint, IoChannels};
    use crate::introspect::FieldKind;
    use crate::port::{AudioPort, BusPort, ChannelPort, FramePort, SamplePort};

    const fn port(name: &'static str, index: usize, ty: AudioPortType) -> FieldInfo {
        FieldInfo {
            name,
            index,
            kind: FieldKind::Audio(ty),
            channels: None,
            mirror: None,
        }
    }

    const fn value(name: &'static str, index: usize) -> FieldInfo {
        FieldInfo {
            name,
            index,
            kind: FieldKind::Value("f32"),
            channels: None,
            mirror: None,
        }
    }

    const BUS32: AudioPortType = <BusPort<f32> as AudioPort>::TYPE;
    const BUS64: AudioPortType = <BusPort<f64> as AudioPort>::TYPE;
    const SAMPLE32: AudioPortType = <SamplePort<f32> as AudioPort>::TYPE;
    const CHANNEL64: AudioPortType = <ChannelPort<f64> as AudioPort>::TYPE;
    const FRAME32: AudioPortType = <FramePort<f32> as AudioPort>::TYPE;

    const PORTS: &[EntryPoint] = &[EntryPoint::new("process", EntryShape::Ports)];

    fn descriptor(
        entry_points: &'static [EntryPoint],
        inputs: &'static RecordDescriptor,
        outputs: &'static RecordDescriptor,
    ) -> EffectDescriptor {
        EffectDescriptor {
            name: "Test",
            entry_points,
            inputs,
            outputs,
            io_channels: IoChannels::DYNAMIC,
        }
    }

    #[test]
    fn test_no_entry_point_is_an_error() {
        let desc = descriptor(&[], &RecordDescriptor::EMPTY, &RecordDescriptor::EMPTY);
        assert_eq!(
            classify_descriptor(&desc),
            Err(ClassifyError::NoEntryPoint { effect: "Test" })
        );
    }

    #[test]
    fn test_sample_argument_both_widths() {
        static ENTRIES: &[EntryPoint] = &[
            EntryPoint::new("process", EntryShape::SampleArg(SampleWidth::F32)),
            EntryPoint::new("process_f64", EntryShape::SampleArg(SampleWidth::F64)),
        ];
        let desc = descriptor(ENTRIES, &RecordDescriptor::EMPTY, &RecordDescriptor::EMPTY);
        let layout = classify_descriptor(&desc).unwrap();
        assert_eq!(layout.variant, AudioVariant::SampleArg(WidthSupport::Both));
        assert!(layout.mono);
        assert_eq!(layout.inputs[0].arity, Arity::Dynamic);
        assert_eq!(layout.outputs[0].arity, Arity::Mirrors(0));
        assert_eq!(layout.native_width(SampleWidth::F32), Some(SampleWidth::F32));
        assert_eq!(layout.native_width(SampleWidth::F64), Some(SampleWidth::F64));
    }

    #[test]
    fn test_bus_argument_uses_declared_channels() {
        static ENTRIES: &[EntryPoint] =
            &[EntryPoint::new("process", EntryShape::BusArg(SampleWidth::F64))];
        let mut desc = descriptor(ENTRIES, &RecordDescriptor::EMPTY, &RecordDescriptor::EMPTY);
        desc.io_channels = IoChannels {
            inputs: Some(2),
            outputs: None,
        };
        let layout = classify_descriptor(&desc).unwrap();
        assert_eq!(layout.variant, AudioVariant::BusArg(WidthSupport::Only(SampleWidth::F64)));
        assert_eq!(layout.inputs[0].arity, Arity::Fixed(2));
        assert_eq!(layout.outputs[0].arity, Arity::Mirrors(0));
        assert!(!layout.mono);
        assert_eq!(layout.native_width(SampleWidth::F32), Some(SampleWidth::F64));
    }

    #[test]
    fn test_bus_and_sample_ports_are_rejected() {
        static INPUTS: RecordDescriptor = RecordDescriptor {
            name: "Inputs",
            fields: &[port("main", 0, BUS32), port("trigger", 1, SAMPLE32)],
        };
        let desc = descriptor(PORTS, &INPUTS, &RecordDescriptor::EMPTY);
        assert_eq!(
            classify_descriptor(&desc),
            Err(ClassifyError::MultipleCarriers {
                effect: "Test",
                families: vec![Carrier::Bus, Carrier::Sample],
            })
        );
    }

    #[test]
    fn test_mixed_widths_are_rejected() {
        static INPUTS: RecordDescriptor = RecordDescriptor {
            name: "Inputs",
            fields: &[port("a", 0, BUS32)],
        };
        static OUTPUTS: RecordDescriptor = RecordDescriptor {
            name: "Outputs",
            fields: &[port("b", 0, BUS64)],
        };
        let desc = descriptor(PORTS, &INPUTS, &OUTPUTS);
        assert_eq!(
            classify_descriptor(&desc),
            Err(ClassifyError::MixedWidths { effect: "Test" })
        );
    }

    #[test]
    fn test_argument_and_port_entry_points_are_rejected() {
        static ENTRIES: &[EntryPoint] = &[
            EntryPoint::new("process", EntryShape::Ports),
            EntryPoint::new("process_sample", EntryShape::SampleArg(SampleWidth::F32)),
        ];
        let desc = descriptor(ENTRIES, &RecordDescriptor::EMPTY, &RecordDescriptor::EMPTY);
        assert_eq!(
            classify_descriptor(&desc),
            Err(ClassifyError::MixedEntryStyles { effect: "Test" })
        );
    }

    #[test]
    fn test_argument_records_hold_controls_only() {
        static ENTRIES: &[EntryPoint] =
            &[EntryPoint::new("process", EntryShape::ChannelArg(SampleWidth::F32))];
        static CONTROLS: RecordDescriptor = RecordDescriptor {
            name: "Controls",
            fields: &[value("gain", 0)],
        };
        static WITH_PORT: RecordDescriptor = RecordDescriptor {
            name: "Controls",
            fields: &[value("gain", 0), port("side", 1, BUS32)],
        };

        let layout = classify_descriptor(&descriptor(ENTRIES, &CONTROLS, &RecordDescriptor::EMPTY)).unwrap();
        assert_eq!(layout.variant, AudioVariant::ChannelArg(WidthSupport::Only(SampleWidth::F32)));
        assert!(layout.mono);

        assert_eq!(
            classify_descriptor(&descriptor(ENTRIES, &CONTROLS, &WITH_PORT)),
            Err(ClassifyError::PortsWithArguments {
                effect: "Test",
                port: "side"
            })
        );
    }

    #[test]
    fn test_width_support() {
        let both = WidthSupport::Both;
        let only = WidthSupport::Only(SampleWidth::F64);
        assert!(both.supports(SampleWidth::F32) && both.supports(SampleWidth::F64));
        assert!(only.supports(SampleWidth::F64));
        assert!(!only.supports(SampleWidth::F32));
        assert_eq!(only.pick(SampleWidth::F32), SampleWidth::F64);
        assert_eq!(both.pick(SampleWidth::F32), SampleWidth::F32);
    }

    #[test]
    fn test_bus_ports_with_arity_and_mirror() {
        static INPUTS: RecordDescriptor = RecordDescriptor {
            name: "Inputs",
            fields: &[
                value("gain", 0),
                FieldInfo {
                    channels: Some(2),
                    ..port("main", 1, BUS32)
                },
                port("side", 2, BUS32),
            ],
        };
        static OUTPUTS: RecordDescriptor = RecordDescriptor {
            name: "Outputs",
            fields: &[FieldInfo {
                mirror: Some("side"),
                ..port("out", 0, BUS32)
            }],
        };
        let layout = classify_descriptor(&descriptor(PORTS, &INPUTS, &OUTPUTS)).unwrap();
        assert_eq!(layout.variant, AudioVariant::BusPort(SampleWidth::F32));
        assert_eq!(layout.inputs.len(), 2);
        assert_eq!(layout.inputs[0].arity, Arity::Fixed(2));
        assert_eq!(layout.inputs[0].field, Some(1));
        assert_eq!(layout.inputs[1].arity, Arity::Dynamic);
        assert_eq!(layout.outputs[0].arity, Arity::Mirrors(1));
    }

    #[test]
    fn test_mirror_errors() {
        static INPUTS: RecordDescriptor = RecordDescriptor {
            name: "Inputs",
            fields: &[port("main", 0, BUS32)],
        };
        static CHAINED: RecordDescriptor = RecordDescriptor {
            name: "Outputs",
            fields: &[
                FieldInfo {
                    mirror: Some("main"),
                    ..port("a", 0, BUS32)
                },
                FieldInfo {
                    mirror: Some("a"),
                    ..port("b", 1, BUS32)
                },
            ],
        };
        static UNKNOWN: RecordDescriptor = RecordDescriptor {
            name: "Outputs",
            fields: &[FieldInfo {
                mirror: Some("nope"),
                ..port("a", 0, BUS32)
            }],
        };
        static TO_OUTPUT: RecordDescriptor = RecordDescriptor {
            name: "Outputs",
            fields: &[
                port("a", 0, BUS32),
                FieldInfo {
                    mirror: Some("a"),
                    ..port("b", 1, BUS32)
                },
            ],
        };
        static MIRRORED_INPUT: RecordDescriptor = RecordDescriptor {
            name: "Inputs",
            fields: &[FieldInfo {
                mirror: Some("x"),
                ..port("main", 0, BUS32)
            }],
        };

        assert_eq!(
            classify_descriptor(&descriptor(PORTS, &INPUTS, &CHAINED)),
            Err(ClassifyError::ChainedMirror { port: "b", target: "a" })
        );
        assert_eq!(
            classify_descriptor(&descriptor(PORTS, &INPUTS, &UNKNOWN)),
            Err(ClassifyError::UnknownMirrorTarget { port: "a", target: "nope" })
        );
        assert_eq!(
            classify_descriptor(&descriptor(PORTS, &INPUTS, &TO_OUTPUT)),
            Err(ClassifyError::MirrorTargetNotInput { port: "b", target: "a" })
        );
        assert_eq!(
            classify_descriptor(&descriptor(PORTS, &MIRRORED_INPUT, &RecordDescriptor::EMPTY)),
            Err(ClassifyError::MirrorOnInput { port: "main" })
        );
    }

    #[test]
    fn test_single_sample_ports_are_mono() {
        static INPUTS: RecordDescriptor = RecordDescriptor {
            name: "Inputs",
            fields: &[value("drive", 0), port("input", 1, SAMPLE32)],
        };
        static OUTPUTS: RecordDescriptor = RecordDescriptor {
            name: "Outputs",
            fields: &[port("output", 0, SAMPLE32)],
        };
        let layout = classify_descriptor(&descriptor(PORTS, &INPUTS, &OUTPUTS)).unwrap();
        assert_eq!(layout.variant, AudioVariant::SamplePort(SampleWidth::F32));
        assert!(layout.mono);
        assert_eq!(layout.inputs[0].field, Some(1));
    }

    #[test]
    fn test_sample_ports_n_to_m_become_frames() {
        static INPUTS: RecordDescriptor = RecordDescriptor {
            name: "Inputs",
            fields: &[port("a", 0, SAMPLE32), port("b", 1, SAMPLE32)],
        };
        static OUTPUTS: RecordDescriptor = RecordDescriptor {
            name: "Outputs",
            fields: &[port("sum", 0, SAMPLE32)],
        };
        let layout = classify_descriptor(&descriptor(PORTS, &INPUTS, &OUTPUTS)).unwrap();
        assert_eq!(layout.variant, AudioVariant::FramePort(SampleWidth::F32));
        assert!(!layout.mono);
        assert!(layout.inputs.iter().all(|b| b.arity == Arity::Fixed(1)));
        assert!(layout.variant.is_per_frame());
    }

    #[test]
    fn test_channel_ports_layouts() {
        static ONE: RecordDescriptor = RecordDescriptor {
            name: "Inputs",
            fields: &[port("input", 0, CHANNEL64)],
        };
        static TWO: RecordDescriptor = RecordDescriptor {
            name: "Outputs",
            fields: &[port("left", 0, CHANNEL64), port("right", 1, CHANNEL64)],
        };
        let mono = classify_descriptor(&descriptor(PORTS, &ONE, &ONE)).unwrap();
        assert_eq!(mono.variant, AudioVariant::ChannelPort(SampleWidth::F64));
        assert!(mono.mono);

        let split = classify_descriptor(&descriptor(PORTS, &ONE, &TWO)).unwrap();
        assert_eq!(split.variant, AudioVariant::ChannelPort(SampleWidth::F64));
        assert!(!split.mono);
        assert_eq!(split.outputs.len(), 2);
        assert_eq!(split.outputs[1].arity, Arity::Fixed(1));
    }

    #[test]
    fn test_mono_port_arity_is_rejected() {
        static INPUTS: RecordDescriptor = RecordDescriptor {
            name: "Inputs",
            fields: &[FieldInfo {
                channels: Some(2),
                ..port("input", 0, CHANNEL64)
            }],
        };
        assert_eq!(
            classify_descriptor(&descriptor(PORTS, &INPUTS, &RecordDescriptor::EMPTY)),
            Err(ClassifyError::MonoPortArity { port: "input" })
        );
    }

    #[test]
    fn test_frame_ports() {
        static INPUTS: RecordDescriptor = RecordDescriptor {
            name: "Inputs",
            fields: &[FieldInfo {
                channels: Some(2),
                ..port("input", 0, FRAME32)
            }],
        };
        static OUTPUTS: RecordDescriptor = RecordDescriptor {
            name: "Outputs",
            fields: &[FieldInfo {
                mirror: Some("input"),
                ..port("output", 0, FRAME32)
            }],
        };
        let layout = classify_descriptor(&descriptor(PORTS, &INPUTS, &OUTPUTS)).unwrap();
        assert_eq!(layout.variant, AudioVariant::FramePort(SampleWidth::F32));
        assert_eq!(layout.outputs[0].arity, Arity::Mirrors(0));
    }

    #[test]
    fn test_no_audio_is_not_audio() {
        static INPUTS: RecordDescriptor = RecordDescriptor {
            name: "Inputs",
            fields: &[value("freq", 0)],
        };
        let layout = classify_descriptor(&descriptor(PORTS, &INPUTS, &RecordDescriptor::EMPTY)).unwrap();
        assert_eq!(layout.variant, AudioVariant::NotAudio);
        assert!(layout.inputs.is_empty());
        assert_eq!(layout.native_width(SampleWidth::F32), None);
        assert_eq!(layout.variant.to_string(), "not-audio");
    }

    #[test]
    fn test_classification_is_deterministic() {
        static INPUTS: RecordDescriptor = RecordDescriptor {
            name: "Inputs",
            fields: &[port("main", 0, BUS32)],
        };
        let desc = descriptor(PORTS, &INPUTS, &INPUTS);
        assert_eq!(classify_descriptor(&desc), classify_descriptor(&desc));
    }

    #[test]
    fn test_variant_display() {
        assert_eq!(AudioVariant::BusPort(SampleWidth::F64).to_string(), "bus-port(f64)");
        assert_eq!(
            AudioVariant::ChannelArg(WidthSupport::Both).to_string(),
            "channel-argument(f32|f64)"
        );
    }
}
