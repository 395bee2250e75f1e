//! Code generation for `#[derive(Ports)]`.
//!
//! Emits a `Record` implementation: a const field descriptor plus positional
//! mutable access to the port fields.

use proc_macro2::TokenStream;
use quote::quote;

use crate::ir::{FieldIR, PortsIR};

/// Generate all code for the derive macro.
pub fn generate(ir: &PortsIR) -> TokenStream {
    let struct_name = &ir.struct_name;
    let (impl_generics, ty_generics, where_clause) = ir.generics.split_for_impl();

    let field_infos = ir
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| generate_field_info(index, field));
    let port_arms = generate_port_arms(ir);

    quote! {
        impl #impl_generics ::plugshape::core::introspect::Record for #struct_name #ty_generics #where_clause {
            const DESCRIPTOR: &'static ::plugshape::core::introspect::RecordDescriptor =
                &::plugshape::core::introspect::RecordDescriptor {
                    name: stringify!(#struct_name),
                    fields: &[#(#field_infos),*],
                };

            fn port_mut(&mut self, index: usize) -> ::core::option::Option<::plugshape::core::port::PortMut<'_>> {
                match index {
                    #(#port_arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    }
}

fn generate_field_info(index: usize, field: &FieldIR) -> TokenStream {
    let name = field.field_name.to_string();
    let ty = &field.field_type;

    let kind = if field.is_port() {
        quote! {
            ::plugshape::core::introspect::FieldKind::Audio(
                <#ty as ::plugshape::core::port::AudioPort>::TYPE
            )
        }
    } else {
        quote! { ::plugshape::core::introspect::FieldKind::Value(stringify!(#ty)) }
    };

    let channels = match &field.attrs.channels {
        Some((n, _)) => quote! { ::core::option::Option::Some(#n) },
        None => quote! { ::core::option::Option::None },
    };
    let mirror = match &field.attrs.mirror {
        Some((target, _)) => quote! { ::core::option::Option::Some(#target) },
        None => quote! { ::core::option::Option::None },
    };

    quote! {
        ::plugshape::core::introspect::FieldInfo {
            name: #name,
            index: #index,
            kind: #kind,
            channels: #channels,
            mirror: #mirror,
        }
    }
}

fn generate_port_arms(ir: &PortsIR) -> Vec<TokenStream> {
    ir.port_fields()
        .map(|(index, field)| {
            let field_name = &field.field_name;
            quote! {
                #index => ::core::option::Option::Some(
                    ::plugshape::core::port::AudioPort::as_port_mut(&mut self.#field_name)
                ),
            }
        })
        .collect()
}
