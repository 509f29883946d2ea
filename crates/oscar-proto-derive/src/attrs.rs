//! Shared `#[oscar(...)]` attribute parsing for both derives.

use syn::Field;

/// A parsed prefix width. Unrecognized widths are carried through so the
/// generated code can report them at marshal/unmarshal time, matching the
/// runtime error surface of a reflection-driven codec.
#[derive(Clone, PartialEq, Eq)]
pub enum PrefixWidth {
    Uint8,
    Uint16,
    Other(String),
}

impl PrefixWidth {
    fn parse(raw: &str) -> Self {
        match raw {
            "uint8" => Self::Uint8,
            "uint16" => Self::Uint16,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Framing configuration for one field.
#[derive(Default)]
pub struct FieldFraming {
    pub len_prefix: Option<PrefixWidth>,
    pub count_prefix: Option<PrefixWidth>,
}

/// Extracts `len_prefix` / `count_prefix` settings from a field's
/// `#[oscar(...)]` attributes.
pub fn field_framing(field: &Field) -> FieldFraming {
    let mut framing = FieldFraming::default();
    for attr in &field.attrs {
        if attr.path().is_ident("oscar") {
            let _ = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("len_prefix") {
                    let s: syn::LitStr = meta.value()?.parse()?;
                    framing.len_prefix = Some(PrefixWidth::parse(&s.value()));
                }
                if meta.path.is_ident("count_prefix") {
                    let s: syn::LitStr = meta.value()?.parse()?;
                    framing.count_prefix = Some(PrefixWidth::parse(&s.value()));
                }
                Ok(())
            });
        }
    }
    framing
}

/// Names the signed-integer kind of a field type, if it is one. The wire
/// format is unsigned-only; the derives turn these into runtime
/// `UnsupportedKind` failures.
pub fn signed_kind(ty: &syn::Type) -> Option<&'static str> {
    let syn::Type::Path(path) = ty else {
        return None;
    };
    let ident = path.path.get_ident()?;
    for kind in ["i8", "i16", "i32", "i64", "i128", "isize"] {
        if ident == kind {
            return Some(kind);
        }
    }
    None
}
