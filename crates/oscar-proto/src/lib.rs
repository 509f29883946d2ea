//! Wire model for the OSCAR instant-messaging protocol.
//!
//! This crate is the pure data layer: FLAP frames, SNAC headers, the three
//! TLV container disciplines, and the typed bodies of every SNAC the server
//! speaks. There is no I/O and no runtime dependency here — socket loops
//! live in `oscar-server`, which drives these types through the
//! [`wire::Marshal`]/[`wire::Unmarshal`] traits.
//!
//! Record encodings are generated by `#[derive(OscarMarshal, OscarUnmarshal)]`
//! from field order plus `#[oscar(...)]` prefix attributes; see [`wire`] for
//! the framing rules.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

extern crate self as oscar_proto;

pub use bytes;
pub use oscar_proto_derive::{OscarMarshal, OscarUnmarshal};

pub mod flap;
pub mod snac;
pub mod snacs;
pub mod tlv;
pub mod wire;

pub use flap::{FLAP_START_MARKER, FLAP_VERSION, FlapFrame, FlapFrameType, FlapSignonFrame};
pub use snac::{SnacError, SnacHeader};
pub use tlv::{Tlv, TlvBlock, TlvLBlock, TlvRestBlock};
pub use wire::{Marshal, Unmarshal, WireError};
