//! AST parsing for `#[derive(Ports)]`.
//!
//! This module transforms `syn::DeriveInput` into our intermediate representation.

use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Field, Fields};

use crate::ir::{FieldIR, PortAttrs, PortKind, PortsIR};

/// Parse a `DeriveInput` into our intermediate representation.
pub fn parse(input: DeriveInput) -> syn::Result<PortsIR> {
    let data_struct = match &input.data {
        Data::Struct(s) => s,
        Data::Enum(_) => {
            return Err(syn::Error::new_spanned(
                &input,
                "#[derive(Ports)] only supports structs, not enums",
            ))
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                &input,
                "#[derive(Ports)] only supports structs, not unions",
            ))
        }
    };

    let fields = match &data_struct.fields {
        Fields::Named(named) => named.named.iter().map(parse_field).collect::<syn::Result<_>>()?,
        Fields::Unit => Vec::new(),
        Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(
                &input,
                "#[derive(Ports)] only supports structs with named fields",
            ))
        }
    };

    Ok(PortsIR {
        struct_name: input.ident.clone(),
        generics: input.generics.clone(),
        fields,
    })
}

fn parse_field(field: &Field) -> syn::Result<FieldIR> {
    let field_name = field
        .ident
        .clone()
        .ok_or_else(|| syn::Error::new_spanned(field, "Field must have a name"))?;

    let mut attrs = PortAttrs::default();
    for attr in &field.attrs {
        if attr.path().is_ident("port") {
            parse_port_attr(attr, &mut attrs)?;
        }
    }

    Ok(FieldIR {
        field_name,
        field_type: field.ty.clone(),
        port: extract_type_name(&field.ty).and_then(|name| PortKind::from_ident(&name)),
        attrs,
    })
}

/// Parse `#[port(channels = N)]` / `#[port(mirror = "field")]`.
fn parse_port_attr(attr: &syn::Attribute, attrs: &mut PortAttrs) -> syn::Result<()> {
    if attrs.span.is_some() {
        return Err(syn::Error::new_spanned(attr, "duplicate #[port] attribute"));
    }
    attrs.span = Some(attr.span());

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("channels") {
            let value: syn::LitInt = meta.value()?.parse()?;
            attrs.channels = Some((value.base10_parse()?, value.span()));
            Ok(())
        } else if meta.path.is_ident("mirror") {
            let value: syn::LitStr = meta.value()?.parse()?;
            attrs.mirror = Some((value.value(), value.span()));
            Ok(())
        } else {
            Err(meta.error("unknown attribute. Expected: channels, mirror"))
        }
    })
}

/// Last path segment of a type, e.g. `BusPort` for `plugshape::BusPort<f32>`.
pub fn extract_type_name(ty: &syn::Type) -> Option<String> {
    match ty {
        syn::Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string()),
        _ => None,
    }
}
