use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields};

use crate::attrs::{PrefixWidth, field_framing, signed_kind};

/// Returns the error expression for a misconfigured field, if any. The first
/// offending field wins; the generated body reports it and nothing else, so
/// the codec fails fast the way a reflection walk would.
pub fn config_error(fields: &syn::FieldsNamed) -> Option<TokenStream> {
    for f in &fields.named {
        let ident = f.ident.as_ref()?;
        let fname = ident.to_string();
        if let Some(kind) = signed_kind(&f.ty) {
            return Some(quote! {
                ::oscar_proto::wire::WireError::UnsupportedKind { kind: #kind, field: #fname }
            });
        }
        let framing = field_framing(f);
        if framing.len_prefix.is_some() && framing.count_prefix.is_some() {
            return Some(quote! {
                ::oscar_proto::wire::WireError::ConflictingPrefix { field: #fname }
            });
        }
        for width in [&framing.len_prefix, &framing.count_prefix] {
            if let Some(PrefixWidth::Other(w)) = width {
                let w = w.as_str();
                return Some(quote! {
                    ::oscar_proto::wire::WireError::UnknownPrefix { width: #w, field: #fname }
                });
            }
        }
    }
    None
}

pub fn derive_marshal_impl(input: &DeriveInput) -> TokenStream {
    let name = &input.ident;

    let mut generics = input.generics.clone();
    for param in &mut generics.params {
        if let syn::GenericParam::Type(t) = param {
            t.bounds.push(syn::parse_quote!(::oscar_proto::wire::Marshal));
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let body = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(fields) => {
                if let Some(err) = config_error(fields) {
                    quote! {
                        let _ = dst;
                        Err(#err)
                    }
                } else {
                    let steps: Vec<TokenStream> = fields
                        .named
                        .iter()
                        .filter_map(|f| {
                            let ident = f.ident.as_ref()?;
                            let framing = field_framing(f);
                            Some(match (framing.len_prefix, framing.count_prefix) {
                                (Some(PrefixWidth::Uint8), None) => quote! {
                                    ::oscar_proto::wire::marshal_len_prefixed_u8(&self.#ident, dst)?;
                                },
                                (Some(PrefixWidth::Uint16), None) => quote! {
                                    ::oscar_proto::wire::marshal_len_prefixed_u16(&self.#ident, dst)?;
                                },
                                (None, Some(PrefixWidth::Uint8)) => quote! {
                                    ::oscar_proto::wire::marshal_count_prefixed_u8(&self.#ident, dst)?;
                                },
                                (None, Some(PrefixWidth::Uint16)) => quote! {
                                    ::oscar_proto::wire::marshal_count_prefixed_u16(&self.#ident, dst)?;
                                },
                                // Misconfigurations were handled by config_error
                                _ => quote! {
                                    ::oscar_proto::wire::Marshal::marshal(&self.#ident, dst)?;
                                },
                            })
                        })
                        .collect();
                    quote! {
                        #(#steps)*
                        Ok(())
                    }
                }
            }
            Fields::Unit => quote! {
                let _ = dst;
                Ok(())
            },
            Fields::Unnamed(_) => {
                quote! { compile_error!("OscarMarshal requires named struct fields"); }
            }
        },
        _ => quote! { compile_error!("OscarMarshal only supports structs"); },
    };

    quote! {
        #[automatically_derived]
        impl #impl_generics ::oscar_proto::wire::Marshal for #name #ty_generics #where_clause {
            fn marshal(
                &self,
                dst: &mut ::oscar_proto::bytes::BytesMut,
            ) -> ::core::result::Result<(), ::oscar_proto::wire::WireError> {
                #body
            }
        }
    }
}
