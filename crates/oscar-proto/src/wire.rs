//! Marshal/unmarshal core for the big-endian OSCAR byte stream.
//!
//! Records implement [`Marshal`] and [`Unmarshal`], usually through the
//! `#[derive(OscarMarshal, OscarUnmarshal)]` macros, which walk a struct's
//! fields in declaration order. Length- and count-prefixed fields go through
//! the free helper functions in this module; the derive selects them from
//! `#[oscar(len_prefix = ...)]` / `#[oscar(count_prefix = ...)]` attributes.
//!
//! The codec is pure: it holds no state and is safe to invoke from any task.
//! Decoding operates on a [`Bytes`] view so that "read until the end of the
//! enclosing payload" is simply "read until the view is drained" — nested
//! regions are `split_to` sub-views of the parent.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Errors produced while marshaling or unmarshaling wire records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// The stream ended before an expected field was complete.
    #[error("unexpected end of stream: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes the current field still required
        needed: usize,
        /// Bytes actually left in the enclosing region
        remaining: usize,
    },

    /// A field has a type the wire format cannot carry (e.g. a signed
    /// integer).
    #[error("unsupported wire kind {kind} on field {field}")]
    UnsupportedKind {
        /// Rust type name of the offending field
        kind: &'static str,
        /// Field name as declared
        field: &'static str,
    },

    /// A prefix width other than `uint8`/`uint16` was configured.
    #[error("unknown prefix width {width:?} on field {field}")]
    UnknownPrefix {
        /// The unrecognized width string
        width: &'static str,
        /// Field name as declared
        field: &'static str,
    },

    /// A field declares both a length prefix and a count prefix.
    #[error("field {field} declares both len_prefix and count_prefix")]
    ConflictingPrefix {
        /// Field name as declared
        field: &'static str,
    },

    /// A region or element count does not fit its prefix integer.
    #[error("value of {len} does not fit prefix (max {max})")]
    PrefixOverflow {
        /// Actual byte length or element count
        len: usize,
        /// Largest value the prefix can carry
        max: usize,
    },

    /// A FLAP header did not begin with the `0x2A` start marker.
    #[error("invalid FLAP start marker {0:#04x}")]
    BadStartMarker(u8),

    /// A FLAP header carried a frame type outside 1..=5.
    #[error("unknown FLAP frame type {0}")]
    UnknownFrameType(u8),
}

/// Serializes a typed record into the big-endian wire form.
pub trait Marshal {
    /// Appends this value's encoding to `dst`.
    fn marshal(&self, dst: &mut BytesMut) -> Result<(), WireError>;
}

/// Reconstructs a typed record from the big-endian wire form.
pub trait Unmarshal: Sized {
    /// Consumes this value's encoding from the front of `src`.
    ///
    /// Types with rest-of-region semantics (strings, unframed slices) consume
    /// everything remaining; callers scope them by handing in a sub-view.
    fn unmarshal(src: &mut Bytes) -> Result<Self, WireError>;
}

/// Marshals `value` into a freshly allocated buffer.
pub fn to_bytes<T: Marshal + ?Sized>(value: &T) -> Result<Bytes, WireError> {
    let mut dst = BytesMut::new();
    value.marshal(&mut dst)?;
    Ok(dst.freeze())
}

/// Unmarshals a `T` from the start of `raw`. Trailing bytes are permitted,
/// matching the rest-block discipline of the enclosing containers.
pub fn from_bytes<T: Unmarshal>(raw: &[u8]) -> Result<T, WireError> {
    let mut src = Bytes::copy_from_slice(raw);
    T::unmarshal(&mut src)
}

fn ensure(src: &Bytes, needed: usize) -> Result<(), WireError> {
    if src.remaining() < needed {
        return Err(WireError::UnexpectedEof { needed, remaining: src.remaining() });
    }
    Ok(())
}

macro_rules! wire_uint {
    ($ty:ty, $put:ident, $get:ident, $width:expr) => {
        impl Marshal for $ty {
            fn marshal(&self, dst: &mut BytesMut) -> Result<(), WireError> {
                dst.$put(*self);
                Ok(())
            }
        }

        impl Unmarshal for $ty {
            fn unmarshal(src: &mut Bytes) -> Result<Self, WireError> {
                ensure(src, $width)?;
                Ok(src.$get())
            }
        }
    };
}

wire_uint!(u8, put_u8, get_u8, 1);
wire_uint!(u16, put_u16, get_u16, 2);
wire_uint!(u32, put_u32, get_u32, 4);
wire_uint!(u64, put_u64, get_u64, 8);

impl<const N: usize> Marshal for [u8; N] {
    fn marshal(&self, dst: &mut BytesMut) -> Result<(), WireError> {
        dst.put_slice(self);
        Ok(())
    }
}

impl<const N: usize> Unmarshal for [u8; N] {
    fn unmarshal(src: &mut Bytes) -> Result<Self, WireError> {
        ensure(src, N)?;
        let mut out = [0u8; N];
        src.copy_to_slice(&mut out);
        Ok(out)
    }
}

impl Marshal for String {
    fn marshal(&self, dst: &mut BytesMut) -> Result<(), WireError> {
        dst.put_slice(self.as_bytes());
        Ok(())
    }
}

impl Unmarshal for String {
    fn unmarshal(src: &mut Bytes) -> Result<Self, WireError> {
        let region = src.split_to(src.remaining());
        Ok(String::from_utf8_lossy(&region).into_owned())
    }
}

impl Marshal for Bytes {
    fn marshal(&self, dst: &mut BytesMut) -> Result<(), WireError> {
        dst.put_slice(self);
        Ok(())
    }
}

impl Unmarshal for Bytes {
    fn unmarshal(src: &mut Bytes) -> Result<Self, WireError> {
        Ok(src.split_to(src.remaining()))
    }
}

impl<T: Marshal> Marshal for Vec<T> {
    fn marshal(&self, dst: &mut BytesMut) -> Result<(), WireError> {
        for item in self {
            item.marshal(dst)?;
        }
        Ok(())
    }
}

impl<T: Unmarshal> Unmarshal for Vec<T> {
    fn unmarshal(src: &mut Bytes) -> Result<Self, WireError> {
        let mut out = Vec::new();
        while src.has_remaining() {
            out.push(T::unmarshal(src)?);
        }
        Ok(out)
    }
}

impl<T: Marshal> Marshal for Option<T> {
    fn marshal(&self, dst: &mut BytesMut) -> Result<(), WireError> {
        if let Some(value) = self {
            value.marshal(dst)?;
        }
        Ok(())
    }
}

impl<T: Unmarshal> Unmarshal for Option<T> {
    fn unmarshal(src: &mut Bytes) -> Result<Self, WireError> {
        if src.has_remaining() { Ok(Some(T::unmarshal(src)?)) } else { Ok(None) }
    }
}

/// A value that can occupy a length-delimited region of the stream.
///
/// `marshal_region` writes the raw content with no framing; the length-prefix
/// helpers measure the region and emit the prefix.
pub trait LenMarshal {
    /// Writes the region content without any prefix.
    fn marshal_region(&self, dst: &mut BytesMut) -> Result<(), WireError>;
}

/// Counterpart of [`LenMarshal`]: reconstructs a value from exactly one
/// length-delimited region.
pub trait LenUnmarshal: Sized {
    /// Decodes from `region`, which holds exactly the prefixed byte count.
    fn unmarshal_region(region: Bytes) -> Result<Self, WireError>;
}

impl LenMarshal for String {
    fn marshal_region(&self, dst: &mut BytesMut) -> Result<(), WireError> {
        dst.put_slice(self.as_bytes());
        Ok(())
    }
}

impl LenUnmarshal for String {
    fn unmarshal_region(region: Bytes) -> Result<Self, WireError> {
        Ok(String::from_utf8_lossy(&region).into_owned())
    }
}

impl LenMarshal for Bytes {
    fn marshal_region(&self, dst: &mut BytesMut) -> Result<(), WireError> {
        dst.put_slice(self);
        Ok(())
    }
}

impl LenUnmarshal for Bytes {
    fn unmarshal_region(region: Bytes) -> Result<Self, WireError> {
        Ok(region)
    }
}

impl<T: Marshal> LenMarshal for Vec<T> {
    fn marshal_region(&self, dst: &mut BytesMut) -> Result<(), WireError> {
        for item in self {
            item.marshal(dst)?;
        }
        Ok(())
    }
}

impl<T: Unmarshal> LenUnmarshal for Vec<T> {
    fn unmarshal_region(region: Bytes) -> Result<Self, WireError> {
        let mut region = region;
        let mut out = Vec::new();
        while region.has_remaining() {
            out.push(T::unmarshal(&mut region)?);
        }
        Ok(out)
    }
}

/// Writes `value` prefixed by its u8 byte length.
pub fn marshal_len_prefixed_u8<T: LenMarshal>(
    value: &T,
    dst: &mut BytesMut,
) -> Result<(), WireError> {
    let mut region = BytesMut::new();
    value.marshal_region(&mut region)?;
    if region.len() > usize::from(u8::MAX) {
        return Err(WireError::PrefixOverflow { len: region.len(), max: usize::from(u8::MAX) });
    }
    dst.put_u8(region.len() as u8);
    dst.put_slice(&region);
    Ok(())
}

/// Writes `value` prefixed by its u16 byte length.
pub fn marshal_len_prefixed_u16<T: LenMarshal>(
    value: &T,
    dst: &mut BytesMut,
) -> Result<(), WireError> {
    let mut region = BytesMut::new();
    value.marshal_region(&mut region)?;
    if region.len() > usize::from(u16::MAX) {
        return Err(WireError::PrefixOverflow { len: region.len(), max: usize::from(u16::MAX) });
    }
    dst.put_u16(region.len() as u16);
    dst.put_slice(&region);
    Ok(())
}

/// Reads a u8 byte length, then decodes a `T` from exactly that region.
pub fn unmarshal_len_prefixed_u8<T: LenUnmarshal>(src: &mut Bytes) -> Result<T, WireError> {
    ensure(src, 1)?;
    let len = usize::from(src.get_u8());
    ensure(src, len)?;
    T::unmarshal_region(src.split_to(len))
}

/// Reads a u16 byte length, then decodes a `T` from exactly that region.
pub fn unmarshal_len_prefixed_u16<T: LenUnmarshal>(src: &mut Bytes) -> Result<T, WireError> {
    ensure(src, 2)?;
    let len = usize::from(src.get_u16());
    ensure(src, len)?;
    T::unmarshal_region(src.split_to(len))
}

/// Writes the element count as a u8, then each element unframed.
pub fn marshal_count_prefixed_u8<T: Marshal>(
    items: &[T],
    dst: &mut BytesMut,
) -> Result<(), WireError> {
    if items.len() > usize::from(u8::MAX) {
        return Err(WireError::PrefixOverflow { len: items.len(), max: usize::from(u8::MAX) });
    }
    dst.put_u8(items.len() as u8);
    for item in items {
        item.marshal(dst)?;
    }
    Ok(())
}

/// Writes the element count as a u16, then each element unframed.
pub fn marshal_count_prefixed_u16<T: Marshal>(
    items: &[T],
    dst: &mut BytesMut,
) -> Result<(), WireError> {
    if items.len() > usize::from(u16::MAX) {
        return Err(WireError::PrefixOverflow { len: items.len(), max: usize::from(u16::MAX) });
    }
    dst.put_u16(items.len() as u16);
    for item in items {
        item.marshal(dst)?;
    }
    Ok(())
}

/// Reads a u8 element count, then that many elements.
pub fn unmarshal_count_prefixed_u8<T: Unmarshal>(src: &mut Bytes) -> Result<Vec<T>, WireError> {
    ensure(src, 1)?;
    let count = usize::from(src.get_u8());
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(T::unmarshal(src)?);
    }
    Ok(out)
}

/// Reads a u16 element count, then that many elements.
pub fn unmarshal_count_prefixed_u16<T: Unmarshal>(src: &mut Bytes) -> Result<Vec<T>, WireError> {
    ensure(src, 2)?;
    let count = usize::from(src.get_u16());
    // Cap the pre-allocation: the count is attacker-controlled
    let mut out = Vec::with_capacity(count.min(256));
    for _ in 0..count {
        out.push(T::unmarshal(src)?);
    }
    Ok(out)
}

pub(crate) fn ensure_remaining(src: &Bytes, needed: usize) -> Result<(), WireError> {
    ensure(src, needed)
}
