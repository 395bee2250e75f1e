//! The `#[audio_effect]` attribute.
//!
//! Scans an inherent impl block for methods whose name starts with
//! `process`, recognizes each signature as one entry-point shape, and
//! implements `Effect` by routing every `Invocation` to the matching method.
//! Argument shapes may take trailing `&Inputs` / `&mut Outputs` control
//! records; all entry points share the same record types. The impl block
//! itself is emitted unchanged.

use std::collections::HashSet;

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{FnArg, ImplItem, ImplItemFn, ItemImpl, ReturnType, Type};

use crate::ir::{EffectIR, EntryIR, RecordsIR, ShapeIR, Width};
use crate::parse::extract_type_name;

const ENTRY_PREFIX: &str = "process";

/// Arguments of `#[audio_effect(...)]`.
#[derive(Default)]
pub struct EffectArgs {
    pub name: Option<String>,
    pub input_channels: Option<usize>,
    pub output_channels: Option<usize>,
}

impl EffectArgs {
    pub fn parse(&mut self, meta: syn::meta::ParseNestedMeta) -> syn::Result<()> {
        if meta.path.is_ident("name") {
            let value: syn::LitStr = meta.value()?.parse()?;
            self.name = Some(value.value());
            Ok(())
        } else if meta.path.is_ident("input_channels") {
            let value: syn::LitInt = meta.value()?.parse()?;
            self.input_channels = Some(value.base10_parse()?);
            Ok(())
        } else if meta.path.is_ident("output_channels") {
            let value: syn::LitInt = meta.value()?.parse()?;
            self.output_channels = Some(value.base10_parse()?);
            Ok(())
        } else {
            Err(meta.error("unknown attribute. Expected: name, input_channels, output_channels"))
        }
    }
}

/// Expand `#[audio_effect]`.
pub fn audio_effect_impl(args: EffectArgs, item: ItemImpl) -> syn::Result<TokenStream> {
    let ir = parse(args, item)?;
    validate(&ir)?;
    Ok(generate(&ir))
}

// =============================================================================
// Parsing
// =============================================================================

fn parse(args: EffectArgs, item: ItemImpl) -> syn::Result<EffectIR> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[audio_effect] goes on an inherent impl block, not a trait impl",
        ));
    }

    let mut entries = Vec::new();
    let mut has_prepare = false;
    for impl_item in &item.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        let name = method.sig.ident.to_string();
        if name == "prepare" {
            has_prepare = is_prepare(method)?;
        } else if name.starts_with(ENTRY_PREFIX) {
            entries.push(parse_entry(method)?);
        }
    }

    let self_ty = &item.self_ty;
    let name = args
        .name
        .or_else(|| extract_type_name(self_ty))
        .unwrap_or_else(|| quote!(#self_ty).to_string());

    Ok(EffectIR {
        item,
        name,
        input_channels: args.input_channels,
        output_channels: args.output_channels,
        entries,
        has_prepare,
    })
}

fn is_prepare(method: &ImplItemFn) -> syn::Result<bool> {
    let typed = typed_args(method)?;
    if typed.len() != 1 || !matches!(method.sig.output, ReturnType::Default) {
        return Err(syn::Error::new_spanned(
            &method.sig,
            "`prepare` must have the signature `fn prepare(&mut self, setup: &AudioSetup)`",
        ));
    }
    Ok(true)
}

/// Non-receiver argument types, requiring a `&mut self` receiver.
fn typed_args(method: &ImplItemFn) -> syn::Result<Vec<&Type>> {
    let mut inputs = method.sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() && receiver.mutability.is_some() => {}
        _ => {
            return Err(syn::Error::new_spanned(
                &method.sig,
                format!("`{}` must take `&mut self`", method.sig.ident),
            ))
        }
    }
    Ok(inputs
        .filter_map(|arg| match arg {
            FnArg::Typed(pat) => Some(pat.ty.as_ref()),
            FnArg::Receiver(_) => None,
        })
        .collect())
}

fn parse_entry(method: &ImplItemFn) -> syn::Result<EntryIR> {
    let sig = &method.sig;
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            format!("entry point `{}` cannot be generic; write one method per sample width", sig.ident),
        ));
    }

    let args = typed_args(method)?;
    let returns = match &sig.output {
        ReturnType::Default => None,
        ReturnType::Type(_, ty) => Some(ty.as_ref()),
    };

    let (shape, records) = recognize(&args, returns).ok_or_else(|| {
        syn::Error::new_spanned(
            sig,
            format!(
                "unsupported entry point signature for `{}`. Expected one of:\n\
                 fn(&mut self, S [, &Inputs] [, &mut Outputs]) -> S\n\
                 fn(&mut self, &[S], &mut [S] [, &Inputs] [, &mut Outputs])\n\
                 fn(&mut self, &mut Buffer<S> [, &Inputs] [, &mut Outputs])\n\
                 fn(&mut self [, &Inputs] [, &mut Outputs])\n\
                 where S is f32 or f64",
                sig.ident
            ),
        )
    })?;

    Ok(EntryIR {
        method: sig.ident.clone(),
        shape,
        records,
        span: sig.span(),
    })
}

fn recognize(args: &[&Type], returns: Option<&Type>) -> Option<(ShapeIR, RecordsIR)> {
    if let Some(ret) = returns {
        // Only the sample-argument shape returns a value.
        let (arg, rest) = args.split_first()?;
        let width = scalar_width(arg)?;
        if scalar_width(ret)? != width {
            return None;
        }
        return Some((ShapeIR::SampleArg(width), recognize_records(rest)?));
    }

    if let [input, output, rest @ ..] = args {
        if let (Some((false, a)), Some((true, b))) = (slice_ref(input), slice_ref(output)) {
            return (a == b).then_some((ShapeIR::ChannelArg(a), recognize_records(rest)?));
        }
    }
    if let Some((arg, rest)) = args.split_first() {
        if let Some(width) = buffer_ref(arg) {
            return Some((ShapeIR::BusArg(width), recognize_records(rest)?));
        }
    }
    Some((ShapeIR::Ports, recognize_records(args)?))
}

/// `[&Inputs] [, &mut Outputs]`, in that order.
fn recognize_records(args: &[&Type]) -> Option<RecordsIR> {
    match args {
        [] => Some(RecordsIR::default()),
        [arg] => {
            let (mutable, record) = record_ref(arg)?;
            let record = Some(record.clone());
            Some(if mutable {
                RecordsIR {
                    inputs: None,
                    outputs: record,
                }
            } else {
                RecordsIR {
                    inputs: record,
                    outputs: None,
                }
            })
        }
        [input, output] => {
            let (false, inputs) = record_ref(input)? else { return None };
            let (true, outputs) = record_ref(output)? else { return None };
            Some(RecordsIR {
                inputs: Some(inputs.clone()),
                outputs: Some(outputs.clone()),
            })
        }
        _ => None,
    }
}

/// `f32` or `f64`.
fn scalar_width(ty: &Type) -> Option<Width> {
    let Type::Path(path) = ty else { return None };
    if path.qself.is_some() {
        return None;
    }
    let ident = path.path.get_ident()?;
    if ident == "f32" {
        Some(Width::F32)
    } else if ident == "f64" {
        Some(Width::F64)
    } else {
        None
    }
}

/// `&[S]` or `&mut [S]`, returning mutability and width.
fn slice_ref(ty: &Type) -> Option<(bool, Width)> {
    let Type::Reference(reference) = ty else { return None };
    let Type::Slice(slice) = reference.elem.as_ref() else { return None };
    Some((reference.mutability.is_some(), scalar_width(&slice.elem)?))
}

/// `&mut Buffer<S>`; a missing sample type means `f32`.
fn buffer_ref(ty: &Type) -> Option<Width> {
    let Type::Reference(reference) = ty else { return None };
    reference.mutability?;
    let Type::Path(path) = reference.elem.as_ref() else { return None };
    let segment = path.path.segments.last()?;
    if segment.ident != "Buffer" {
        return None;
    }
    let syn::PathArguments::AngleBracketed(generic) = &segment.arguments else {
        return Some(Width::F32);
    };
    generic
        .args
        .iter()
        .find_map(|arg| match arg {
            syn::GenericArgument::Type(ty) => Some(scalar_width(ty)),
            _ => None,
        })
        .unwrap_or(Some(Width::F32))
}

fn buffer_path(ty: &Type) -> bool {
    let Type::Path(path) = ty else { return false };
    path.path.segments.last().is_some_and(|segment| segment.ident == "Buffer")
}

/// `&T` or `&mut T` with `T` a record type, returning mutability and `T`.
fn record_ref(ty: &Type) -> Option<(bool, &Type)> {
    let Type::Reference(reference) = ty else { return None };
    let elem = reference.elem.as_ref();
    if !matches!(elem, Type::Path(_) | Type::Tuple(_)) || scalar_width(elem).is_some() || buffer_path(elem) {
        return None;
    }
    Some((reference.mutability.is_some(), elem))
}

// =============================================================================
// Validation
// =============================================================================

fn validate(ir: &EffectIR) -> syn::Result<()> {
    let mut seen = HashSet::new();
    let mut ports = None;
    let mut inputs: Option<(&syn::Ident, String)> = None;
    let mut outputs: Option<(&syn::Ident, String)> = None;
    for entry in &ir.entries {
        same_record(entry, "input", entry.records.inputs.as_ref(), &mut inputs)?;
        same_record(entry, "output", entry.records.outputs.as_ref(), &mut outputs)?;
        match entry.shape.key() {
            Some(key) => {
                if !seen.insert(key) {
                    return Err(syn::Error::new(
                        entry.span,
                        format!(
                            "`{}` duplicates another {}-argument entry point at the same sample width",
                            entry.method, key.0
                        ),
                    ));
                }
            }
            None => {
                if let Some(first) = ports.replace(&entry.method) {
                    return Err(syn::Error::new(
                        entry.span,
                        format!(
                            "`{}` is a second port-based entry point; `{}` already is one",
                            entry.method, first
                        ),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Every entry point taking a record of one direction takes the same type.
fn same_record<'a>(
    entry: &'a EntryIR,
    direction: &str,
    record: Option<&syn::Type>,
    first: &mut Option<(&'a syn::Ident, String)>,
) -> syn::Result<()> {
    let Some(record) = record else {
        return Ok(());
    };
    let name = quote!(#record).to_string();
    if let Some((method, expected)) = first.as_ref() {
        if *expected != name {
            return Err(syn::Error::new_spanned(
                record,
                format!(
                    "`{}` takes {} record `{}` but `{}` takes `{}`; entry points share one {} record",
                    entry.method, direction, name, method, expected, direction
                ),
            ));
        }
        return Ok(());
    }
    *first = Some((&entry.method, name));
    Ok(())
}

// =============================================================================
// Code generation
// =============================================================================

fn generate(ir: &EffectIR) -> TokenStream {
    let item = &ir.item;
    let self_ty = &item.self_ty;
    let (impl_generics, _, where_clause) = item.generics.split_for_impl();
    let name = &ir.name;

    let inputs_ty = record_type(ir.entries.iter().find_map(|e| e.records.inputs.as_ref()));
    let outputs_ty = record_type(ir.entries.iter().find_map(|e| e.records.outputs.as_ref()));

    let entry_points = ir.entries.iter().map(generate_entry_point);
    let arms = ir.entries.iter().map(generate_arm);
    let io_inputs = option_tokens(ir.input_channels);
    let io_outputs = option_tokens(ir.output_channels);

    let prepare = if ir.has_prepare {
        quote! {
            fn prepare(&mut self, setup: &::plugshape::core::effect::AudioSetup) {
                <#self_ty>::prepare(self, setup)
            }
        }
    } else {
        quote! {}
    };

    quote! {
        #item

        impl #impl_generics ::plugshape::core::effect::Effect for #self_ty #where_clause {
            type Inputs = #inputs_ty;
            type Outputs = #outputs_ty;

            const NAME: &'static str = #name;

            const ENTRY_POINTS: &'static [::plugshape::core::effect::EntryPoint] = &[
                #(#entry_points),*
            ];

            const IO_CHANNELS: ::plugshape::core::effect::IoChannels =
                ::plugshape::core::effect::IoChannels {
                    inputs: #io_inputs,
                    outputs: #io_outputs,
                };

            #[allow(unreachable_patterns, unused_variables)]
            fn invoke(
                &mut self,
                call: ::plugshape::core::effect::Invocation<'_, '_, Self::Inputs, Self::Outputs>,
            ) {
                use ::plugshape::core::effect::{Call, Invocation};
                match call {
                    #(#arms)*
                    _ => {}
                }
            }

            #prepare
        }
    }
}

fn record_type(record: Option<&syn::Type>) -> TokenStream {
    match record {
        Some(ty) => quote!(#ty),
        None => quote!(()),
    }
}

fn option_tokens(value: Option<usize>) -> TokenStream {
    match value {
        Some(n) => quote! { ::core::option::Option::Some(#n) },
        None => quote! { ::core::option::Option::None },
    }
}

fn width_tokens(width: Width) -> TokenStream {
    match width {
        Width::F32 => quote! { ::plugshape::core::sample::SampleWidth::F32 },
        Width::F64 => quote! { ::plugshape::core::sample::SampleWidth::F64 },
    }
}

fn generate_entry_point(entry: &EntryIR) -> TokenStream {
    let method = entry.method.to_string();
    let shape = match &entry.shape {
        ShapeIR::SampleArg(w) => {
            let w = width_tokens(*w);
            quote! { SampleArg(#w) }
        }
        ShapeIR::ChannelArg(w) => {
            let w = width_tokens(*w);
            quote! { ChannelArg(#w) }
        }
        ShapeIR::BusArg(w) => {
            let w = width_tokens(*w);
            quote! { BusArg(#w) }
        }
        ShapeIR::Ports => quote! { Ports },
    };
    quote! {
        ::plugshape::core::effect::EntryPoint::new(
            #method,
            ::plugshape::core::effect::EntryShape::#shape,
        )
    }
}

fn generate_arm(entry: &EntryIR) -> TokenStream {
    let method = &entry.method;
    let records = match (entry.records.inputs.is_some(), entry.records.outputs.is_some()) {
        (true, true) => vec![quote!(inputs), quote!(outputs)],
        (true, false) => vec![quote!(inputs)],
        (false, true) => vec![quote!(outputs)],
        (false, false) => Vec::new(),
    };
    let variant = |w: Width| match w {
        Width::F32 => format_ident!("F32"),
        Width::F64 => format_ident!("F64"),
    };
    match &entry.shape {
        ShapeIR::SampleArg(w) => {
            let v = variant(*w);
            quote! {
                Invocation::#v { call: Call::Sample { input, output }, inputs, outputs } => {
                    *output = self.#method(input #(, #records)*)
                }
            }
        }
        ShapeIR::ChannelArg(w) => {
            let v = variant(*w);
            quote! {
                Invocation::#v { call: Call::Channel { input, output }, inputs, outputs } => {
                    self.#method(input, output #(, #records)*)
                }
            }
        }
        ShapeIR::BusArg(w) => {
            let v = variant(*w);
            quote! {
                Invocation::#v { call: Call::Bus(buffer), inputs, outputs } => {
                    self.#method(buffer #(, #records)*)
                }
            }
        }
        ShapeIR::Ports => {
            quote! {
                Invocation::Ports { inputs, outputs } => self.#method(#(#records),*),
            }
        }
    }
}
