use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields};

use crate::attrs::{PrefixWidth, field_framing};
use crate::marshal::config_error;

pub fn derive_unmarshal_impl(input: &DeriveInput) -> TokenStream {
    let name = &input.ident;

    let mut generics = input.generics.clone();
    for param in &mut generics.params {
        if let syn::GenericParam::Type(t) = param {
            t.bounds.push(syn::parse_quote!(::oscar_proto::wire::Unmarshal));
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let body = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(fields) => {
                if let Some(err) = config_error(fields) {
                    quote! {
                        let _ = src;
                        Err(#err)
                    }
                } else {
                    let mut lets = Vec::new();
                    let mut idents = Vec::new();
                    for f in &fields.named {
                        let Some(ident) = f.ident.as_ref() else {
                            continue;
                        };
                        let ty = &f.ty;
                        let framing = field_framing(f);
                        lets.push(match (framing.len_prefix, framing.count_prefix) {
                            (Some(PrefixWidth::Uint8), None) => quote! {
                                let #ident: #ty =
                                    ::oscar_proto::wire::unmarshal_len_prefixed_u8(src)?;
                            },
                            (Some(PrefixWidth::Uint16), None) => quote! {
                                let #ident: #ty =
                                    ::oscar_proto::wire::unmarshal_len_prefixed_u16(src)?;
                            },
                            (None, Some(PrefixWidth::Uint8)) => quote! {
                                let #ident: #ty =
                                    ::oscar_proto::wire::unmarshal_count_prefixed_u8(src)?;
                            },
                            (None, Some(PrefixWidth::Uint16)) => quote! {
                                let #ident: #ty =
                                    ::oscar_proto::wire::unmarshal_count_prefixed_u16(src)?;
                            },
                            // Misconfigurations were handled by config_error
                            _ => quote! {
                                let #ident =
                                    <#ty as ::oscar_proto::wire::Unmarshal>::unmarshal(src)?;
                            },
                        });
                        idents.push(ident);
                    }
                    quote! {
                        #(#lets)*
                        Ok(Self { #(#idents),* })
                    }
                }
            }
            Fields::Unit => quote! {
                let _ = src;
                Ok(Self)
            },
            Fields::Unnamed(_) => {
                quote! { compile_error!("OscarUnmarshal requires named struct fields"); }
            }
        },
        _ => quote! { compile_error!("OscarUnmarshal only supports structs"); },
    };

    quote! {
        #[automatically_derived]
        impl #impl_generics ::oscar_proto::wire::Unmarshal for #name #ty_generics #where_clause {
            fn unmarshal(
                src: &mut ::oscar_proto::bytes::Bytes,
            ) -> ::core::result::Result<Self, ::oscar_proto::wire::WireError> {
                #body
            }
        }
    }
}
