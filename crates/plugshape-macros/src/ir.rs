//! Intermediate representation for both macros.
//!
//! Parsing fills these structures from the token stream; validation and
//! code generation only ever look at the IR.

use proc_macro2::Span;

// =============================================================================
// #[derive(Ports)]
// =============================================================================

/// A struct deriving `Ports`.
pub struct PortsIR {
    pub struct_name: syn::Ident,
    pub generics: syn::Generics,
    /// Every named field, in declaration order.
    pub fields: Vec<FieldIR>,
}

/// One field of the record.
pub struct FieldIR {
    pub field_name: syn::Ident,
    pub field_type: syn::Type,
    /// Carrier if the type is one of the port types.
    pub port: Option<PortKind>,
    pub attrs: PortAttrs,
}

/// Port type recognized by the last path segment of a field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    Sample,
    Channel,
    Bus,
    Frame,
}

impl PortKind {
    pub fn from_ident(ident: &str) -> Option<Self> {
        match ident {
            "SamplePort" => Some(PortKind::Sample),
            "ChannelPort" => Some(PortKind::Channel),
            "BusPort" => Some(PortKind::Bus),
            "FramePort" => Some(PortKind::Frame),
            _ => None,
        }
    }

    /// Whether the port may carry more than one channel.
    pub fn is_multichannel(self) -> bool {
        matches!(self, PortKind::Bus | PortKind::Frame)
    }
}

/// Contents of `#[port(...)]`.
#[derive(Default)]
pub struct PortAttrs {
    /// `channels = N`
    pub channels: Option<(usize, Span)>,
    /// `mirror = "field"`
    pub mirror: Option<(String, Span)>,
    /// Span of the attribute itself, if present.
    pub span: Option<Span>,
}

impl FieldIR {
    pub fn is_port(&self) -> bool {
        self.port.is_some()
    }
}

impl PortsIR {
    /// Audio port fields with their declaration index.
    pub fn port_fields(&self) -> impl Iterator<Item = (usize, &FieldIR)> {
        self.fields.iter().enumerate().filter(|(_, f)| f.is_port())
    }
}

// =============================================================================
// #[audio_effect]
// =============================================================================

/// An inherent impl block annotated with `#[audio_effect]`.
pub struct EffectIR {
    /// The impl block, emitted unchanged.
    pub item: syn::ItemImpl,
    pub name: String,
    pub input_channels: Option<usize>,
    pub output_channels: Option<usize>,
    pub entries: Vec<EntryIR>,
    /// Whether the impl defines `prepare(&mut self, &AudioSetup)`.
    pub has_prepare: bool,
}

/// One processing method.
pub struct EntryIR {
    pub method: syn::Ident,
    pub shape: ShapeIR,
    pub records: RecordsIR,
    pub span: Span,
}

/// Record arguments of an entry point: `&Inputs`, `&mut Outputs`, either,
/// or neither.
#[derive(Default)]
pub struct RecordsIR {
    pub inputs: Option<syn::Type>,
    pub outputs: Option<syn::Type>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    F32,
    F64,
}

/// Recognized audio part of a method signature.
pub enum ShapeIR {
    /// `fn(&mut self, S, ..) -> S`
    SampleArg(Width),
    /// `fn(&mut self, &[S], &mut [S], ..)`
    ChannelArg(Width),
    /// `fn(&mut self, &mut Buffer<S>, ..)`
    BusArg(Width),
    /// Records only.
    Ports,
}

impl ShapeIR {
    /// Family and width for duplicate detection; `None` for ports.
    pub fn key(&self) -> Option<(&'static str, Width)> {
        match self {
            ShapeIR::SampleArg(w) => Some(("sample", *w)),
            ShapeIR::ChannelArg(w) => Some(("channel", *w)),
            ShapeIR::BusArg(w) => Some(("bus", *w)),
            ShapeIR::Ports => None,
        }
    }
}
