//! Procedural macros for the plugshape adapter engine.
//!
//! - `#[derive(Ports)]` describes an input or output record of an effect.
//! - `#[audio_effect]` turns an inherent impl block into an `Effect`.
//!
//! # Example
//!
//! ```ignore
//! use plugshape::prelude::*;
//!
//! #[derive(Default, Ports)]
//! pub struct Inputs {
//!     pub gain: f32,
//!     #[port(channels = 2)]
//!     pub main: BusPort<f32>,
//! }
//!
//! #[derive(Default, Ports)]
//! pub struct Outputs {
//!     #[port(mirror = "main")]
//!     pub main: BusPort<f32>,
//! }
//!
//! #[derive(Clone, Default)]
//! pub struct Gain;
//!
//! #[audio_effect]
//! impl Gain {
//!     fn process(&mut self, inputs: &Inputs, outputs: &mut Outputs) {
//!         for (c, out) in outputs.main.iter_mut().enumerate() {
//!             for (o, i) in out.iter_mut().zip(inputs.main.channel(c)) {
//!                 *o = *i * inputs.gain;
//!             }
//!         }
//!     }
//! }
//! ```

use proc_macro::TokenStream;

mod codegen;
mod effect;
mod ir;
mod parse;
mod validate;

/// Derive macro implementing `Record` for a port struct.
///
/// Every named field is listed in the generated descriptor in declaration
/// order. Fields whose type is `SamplePort`, `ChannelPort`, `BusPort` or
/// `FramePort` become audio ports; all others are plain values.
///
/// # Attributes
///
/// - `#[port(channels = N)]` - Fixed channel count on a `BusPort` or
///   `FramePort`.
/// - `#[port(mirror = "field")]` - Output port whose channel count follows
///   the named input port.
///
/// Without either attribute a multi-channel port accepts any count.
#[proc_macro_derive(Ports, attributes(port))]
pub fn derive_ports(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);

    match derive_ports_impl(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_ports_impl(input: syn::DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let ir = parse::parse(input)?;
    validate::validate(&ir)?;
    Ok(codegen::generate(&ir))
}

/// Attribute macro implementing `Effect` from an inherent impl block.
///
/// Methods whose name starts with `process` are entry points:
///
/// - `fn(&mut self, S) -> S` - one sample of one channel
/// - `fn(&mut self, &[S], &mut [S])` - one channel of one block
/// - `fn(&mut self, &mut Buffer<S>)` - every channel of one block
/// - `fn(&mut self [, &Inputs] [, &mut Outputs])` - port records
///
/// The three argument shapes may also take `&Inputs` and/or `&mut Outputs`
/// after their audio arguments, e.g. `fn(&mut self, x: f32, controls:
/// &Controls) -> f32`. Those records hold control values only; every entry
/// point uses the same record types.
///
/// `S` is `f32` or `f64`; defining both widths lets the host's width run
/// without conversion. A `fn prepare(&mut self, setup: &AudioSetup)` method
/// is called whenever the processor is configured.
///
/// # Arguments
///
/// - `name = "..."` - Display name (defaults to the type name)
/// - `input_channels = N` / `output_channels = N` - Fixed channel counts for
///   `Buffer` entry points
#[proc_macro_attribute]
pub fn audio_effect(args: TokenStream, item: TokenStream) -> TokenStream {
    let mut effect_args = effect::EffectArgs::default();
    let parser = syn::meta::parser(|meta| effect_args.parse(meta));
    syn::parse_macro_input!(args with parser);
    let item = syn::parse_macro_input!(item as syn::ItemImpl);

    match effect::audio_effect_impl(effect_args, item) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
