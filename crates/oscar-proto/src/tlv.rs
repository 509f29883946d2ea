//! Tag-length-value triples and their three container disciplines.
//!
//! A TLV's value is always carried as opaque bytes on the wire; the typed
//! constructors and accessors reinterpret those bytes. The containers differ
//! only in how a sequence of TLVs is framed:
//!
//! - [`TlvRestBlock`] — read until the end of the enclosing payload, write
//!   with no framing.
//! - [`TlvBlock`] — prefixed by a u16 count of entries.
//! - [`TlvLBlock`] — prefixed by a u16 total byte length of the entries.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::wire::{Marshal, Unmarshal, WireError, ensure_remaining, to_bytes};

/// One tag-length-value triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    /// Tag identifying the value's meaning within the enclosing SNAC
    pub tag: u16,
    /// Opaque value bytes
    pub value: Bytes,
}

impl Tlv {
    /// TLV with raw value bytes.
    pub fn new(tag: u16, value: impl Into<Bytes>) -> Self {
        Self { tag, value: value.into() }
    }

    /// TLV carrying a big-endian u16.
    pub fn new_u16(tag: u16, value: u16) -> Self {
        Self { tag, value: Bytes::copy_from_slice(&value.to_be_bytes()) }
    }

    /// TLV carrying a big-endian u32.
    pub fn new_u32(tag: u16, value: u32) -> Self {
        Self { tag, value: Bytes::copy_from_slice(&value.to_be_bytes()) }
    }

    /// TLV carrying a string's raw bytes.
    pub fn new_string(tag: u16, value: &str) -> Self {
        Self { tag, value: Bytes::copy_from_slice(value.as_bytes()) }
    }

    /// TLV carrying the marshaled form of a nested record.
    pub fn new_marshal<T: Marshal>(tag: u16, value: &T) -> Result<Self, WireError> {
        Ok(Self { tag, value: to_bytes(value)? })
    }

    /// Value reinterpreted as a big-endian u16. `None` if too short.
    pub fn value_u16(&self) -> Option<u16> {
        (self.value.len() >= 2).then(|| u16::from_be_bytes([self.value[0], self.value[1]]))
    }

    /// Value reinterpreted as a big-endian u32. `None` if too short.
    pub fn value_u32(&self) -> Option<u32> {
        (self.value.len() >= 4).then(|| {
            u32::from_be_bytes([self.value[0], self.value[1], self.value[2], self.value[3]])
        })
    }

    /// Value reinterpreted as text.
    pub fn value_string(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }
}

impl Marshal for Tlv {
    fn marshal(&self, dst: &mut BytesMut) -> Result<(), WireError> {
        if self.value.len() > usize::from(u16::MAX) {
            return Err(WireError::PrefixOverflow {
                len: self.value.len(),
                max: usize::from(u16::MAX),
            });
        }
        dst.put_u16(self.tag);
        dst.put_u16(self.value.len() as u16);
        dst.put_slice(&self.value);
        Ok(())
    }
}

impl Unmarshal for Tlv {
    fn unmarshal(src: &mut Bytes) -> Result<Self, WireError> {
        ensure_remaining(src, 4)?;
        let tag = src.get_u16();
        let len = usize::from(src.get_u16());
        ensure_remaining(src, len)?;
        Ok(Self { tag, value: src.split_to(len) })
    }
}

macro_rules! tlv_container {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Default)]
        pub struct $name {
            /// Entries in wire order
            pub tlvs: Vec<Tlv>,
        }

        impl $name {
            /// Empty container.
            pub fn new() -> Self {
                Self::default()
            }

            /// Appends an entry.
            pub fn push(&mut self, tlv: Tlv) {
                self.tlvs.push(tlv);
            }

            /// First entry with the given tag.
            pub fn first(&self, tag: u16) -> Option<&Tlv> {
                self.tlvs.iter().find(|t| t.tag == tag)
            }

            /// Whether any entry carries the given tag.
            pub fn has(&self, tag: u16) -> bool {
                self.first(tag).is_some()
            }

            /// First entry with the tag, reinterpreted as u16.
            pub fn u16(&self, tag: u16) -> Option<u16> {
                self.first(tag).and_then(Tlv::value_u16)
            }

            /// First entry with the tag, reinterpreted as u32.
            pub fn u32(&self, tag: u16) -> Option<u32> {
                self.first(tag).and_then(Tlv::value_u32)
            }

            /// First entry with the tag, reinterpreted as text.
            pub fn string(&self, tag: u16) -> Option<String> {
                self.first(tag).map(Tlv::value_string)
            }

            /// First entry with the tag, as raw bytes.
            pub fn bytes(&self, tag: u16) -> Option<Bytes> {
                self.first(tag).map(|t| t.value.clone())
            }
        }

        impl From<Vec<Tlv>> for $name {
            fn from(tlvs: Vec<Tlv>) -> Self {
                Self { tlvs }
            }
        }
    };
}

tlv_container!(
    /// TLV sequence that extends to the end of the enclosing payload.
    TlvRestBlock
);

tlv_container!(
    /// TLV sequence prefixed by a u16 entry count.
    TlvBlock
);

tlv_container!(
    /// TLV sequence prefixed by the u16 byte length of its entries.
    TlvLBlock
);

impl Marshal for TlvRestBlock {
    fn marshal(&self, dst: &mut BytesMut) -> Result<(), WireError> {
        for tlv in &self.tlvs {
            tlv.marshal(dst)?;
        }
        Ok(())
    }
}

impl Unmarshal for TlvRestBlock {
    fn unmarshal(src: &mut Bytes) -> Result<Self, WireError> {
        let mut tlvs = Vec::new();
        while src.has_remaining() {
            tlvs.push(Tlv::unmarshal(src)?);
        }
        Ok(Self { tlvs })
    }
}

impl Marshal for TlvBlock {
    fn marshal(&self, dst: &mut BytesMut) -> Result<(), WireError> {
        if self.tlvs.len() > usize::from(u16::MAX) {
            return Err(WireError::PrefixOverflow {
                len: self.tlvs.len(),
                max: usize::from(u16::MAX),
            });
        }
        dst.put_u16(self.tlvs.len() as u16);
        for tlv in &self.tlvs {
            tlv.marshal(dst)?;
        }
        Ok(())
    }
}

impl Unmarshal for TlvBlock {
    fn unmarshal(src: &mut Bytes) -> Result<Self, WireError> {
        ensure_remaining(src, 2)?;
        let count = usize::from(src.get_u16());
        let mut tlvs = Vec::with_capacity(count.min(256));
        for _ in 0..count {
            tlvs.push(Tlv::unmarshal(src)?);
        }
        Ok(Self { tlvs })
    }
}

impl Marshal for TlvLBlock {
    fn marshal(&self, dst: &mut BytesMut) -> Result<(), WireError> {
        let mut region = BytesMut::new();
        for tlv in &self.tlvs {
            tlv.marshal(&mut region)?;
        }
        if region.len() > usize::from(u16::MAX) {
            return Err(WireError::PrefixOverflow { len: region.len(), max: usize::from(u16::MAX) });
        }
        dst.put_u16(region.len() as u16);
        dst.put_slice(&region);
        Ok(())
    }
}

impl Unmarshal for TlvLBlock {
    fn unmarshal(src: &mut Bytes) -> Result<Self, WireError> {
        ensure_remaining(src, 2)?;
        let len = usize::from(src.get_u16());
        ensure_remaining(src, len)?;
        let mut region = src.split_to(len);
        let mut tlvs = Vec::new();
        while region.has_remaining() {
            tlvs.push(Tlv::unmarshal(&mut region)?);
        }
        Ok(Self { tlvs })
    }
}
