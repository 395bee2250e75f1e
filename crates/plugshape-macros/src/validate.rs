//! Semantic validation for `#[derive(Ports)]`.
//!
//! Mirror targets live in the other record of the effect, so they are
//! resolved at classification time, not here.

use crate::ir::{FieldIR, PortsIR};

/// Validate the IR for semantic correctness.
pub fn validate(ir: &PortsIR) -> syn::Result<()> {
    for field in &ir.fields {
        validate_field(field)?;
    }
    Ok(())
}

fn validate_field(field: &FieldIR) -> syn::Result<()> {
    let Some(attr_span) = field.attrs.span else {
        return Ok(());
    };

    let Some(kind) = field.port else {
        return Err(syn::Error::new(
            attr_span,
            format!(
                "#[port] on field `{}`, which is not an audio port",
                field.field_name
            ),
        ));
    };

    match (&field.attrs.channels, &field.attrs.mirror) {
        (Some(_), Some(_)) => Err(syn::Error::new(
            attr_span,
            format!(
                "field `{}` cannot declare both `channels` and `mirror`",
                field.field_name
            ),
        )),
        (Some((0, span)), None) => Err(syn::Error::new(*span, "`channels` must be at least 1")),
        (Some((_, span)), None) if !kind.is_multichannel() => Err(syn::Error::new(
            *span,
            format!(
                "`channels` needs a BusPort or FramePort; `{}` always carries one channel",
                field.field_name
            ),
        )),
        (None, Some((target, span))) if target.is_empty() => {
            Err(syn::Error::new(*span, "`mirror` needs a field name"))
        }
        _ => Ok(()),
    }
}
