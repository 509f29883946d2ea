//! Derive macros for the OSCAR wire codec.
//!
//! `#[derive(OscarMarshal, OscarUnmarshal)]` walks a struct's fields in
//! declaration order and generates big-endian marshal/unmarshal impls. Field
//! framing is controlled by `#[oscar(...)]` attributes:
//!
//! - `#[oscar(len_prefix = "uint8")]` / `"uint16"` — write the byte length of
//!   the encoded field, then its bytes; read the length, then exactly that
//!   many bytes.
//! - `#[oscar(count_prefix = "uint8")]` / `"uint16"` — write the element
//!   count, then each element unframed; read the count, then that many
//!   elements.
//!
//! Misconfigured fields (both prefixes at once, an unrecognized prefix width,
//! a signed integer) generate bodies that fail at marshal/unmarshal time
//! rather than at expansion time, so configuration errors surface through the
//! same `WireError` taxonomy as malformed input.

mod attrs;
mod marshal;
mod unmarshal;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `oscar_proto::wire::Marshal` for a named struct.
#[proc_macro_derive(OscarMarshal, attributes(oscar))]
pub fn derive_oscar_marshal(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    TokenStream::from(marshal::derive_marshal_impl(&input))
}

/// Derives `oscar_proto::wire::Unmarshal` for a named struct.
#[proc_macro_derive(OscarUnmarshal, attributes(oscar))]
pub fn derive_oscar_unmarshal(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    TokenStream::from(unmarshal::derive_unmarshal_impl(&input))
}
