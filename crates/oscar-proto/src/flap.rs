//! FLAP framing: the outermost unit on every OSCAR connection.
//!
//! Layout on the wire:
//!
//! ```text
//! offset  size  meaning
//!   0      1    start marker (0x2A)
//!   1      1    frame type (1..=5)
//!   2      2    sequence number (BE u16)
//!   4      2    payload length (BE u16)
//!   6      N    payload
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::tlv::TlvRestBlock;
use crate::wire::{Marshal, Unmarshal, WireError, ensure_remaining};
use crate::{OscarMarshal, OscarUnmarshal};

/// Every FLAP header begins with this byte. Anything else is a protocol
/// error.
pub const FLAP_START_MARKER: u8 = 0x2A;

/// FLAP protocol version exchanged in sign-on frames.
pub const FLAP_VERSION: u32 = 0x0000_0001;

/// Tag of the screen-name TLV in a client sign-on payload.
pub const SIGNON_TLV_SCREEN_NAME: u16 = 0x0001;

/// Tag of the login-cookie TLV in a client sign-on payload.
pub const SIGNON_TLV_COOKIE: u16 = 0x0006;

/// FLAP frame type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FlapFrameType {
    /// Connection sign-on handshake
    SignOn = 1,
    /// Data frame carrying a SNAC
    Data = 2,
    /// Error; terminates the connection
    Error = 3,
    /// Orderly sign-off
    SignOff = 4,
    /// Liveness probe with no payload semantics
    KeepAlive = 5,
}

impl FlapFrameType {
    /// Frame type from its wire byte. `None` if outside 1..=5.
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::SignOn),
            2 => Some(Self::Data),
            3 => Some(Self::Error),
            4 => Some(Self::SignOff),
            5 => Some(Self::KeepAlive),
            _ => None,
        }
    }

    /// Wire byte for this frame type.
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// The five-field FLAP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlapFrame {
    /// Frame type (the start marker is implicit)
    pub frame_type: FlapFrameType,
    /// Per-connection sequence number, low 16 bits of the emitter's counter
    pub sequence: u16,
    /// Byte length of the payload that follows the header
    pub payload_length: u16,
}

impl FlapFrame {
    /// Encoded header size.
    pub const HEADER_LEN: usize = 6;
}

impl Marshal for FlapFrame {
    fn marshal(&self, dst: &mut BytesMut) -> Result<(), WireError> {
        dst.put_u8(FLAP_START_MARKER);
        dst.put_u8(self.frame_type.to_u8());
        dst.put_u16(self.sequence);
        dst.put_u16(self.payload_length);
        Ok(())
    }
}

impl Unmarshal for FlapFrame {
    fn unmarshal(src: &mut Bytes) -> Result<Self, WireError> {
        ensure_remaining(src, Self::HEADER_LEN)?;
        let marker = src.get_u8();
        if marker != FLAP_START_MARKER {
            return Err(WireError::BadStartMarker(marker));
        }
        let raw_type = src.get_u8();
        let frame_type =
            FlapFrameType::from_u8(raw_type).ok_or(WireError::UnknownFrameType(raw_type))?;
        Ok(Self { frame_type, sequence: src.get_u16(), payload_length: src.get_u16() })
    }
}

/// Payload of a sign-on FLAP: the FLAP version, optionally followed by TLVs
/// (screen name on the auth endpoint, login cookie on BOS-class endpoints).
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct FlapSignonFrame {
    /// Always [`FLAP_VERSION`]
    pub flap_version: u32,
    /// Sign-on TLVs; empty in the server's greeting
    pub tlvs: TlvRestBlock,
}

#[cfg(test)]
mod tests {
    use super::{FLAP_START_MARKER, FlapFrame, FlapFrameType, FlapSignonFrame};
    use crate::tlv::{Tlv, TlvRestBlock};
    use crate::wire::{WireError, from_bytes, to_bytes};

    #[test]
    fn header_round_trip() {
        let frame =
            FlapFrame { frame_type: FlapFrameType::Data, sequence: 0x0064, payload_length: 10 };
        let bytes = to_bytes(&frame).unwrap();
        assert_eq!(&bytes[..], &[0x2A, 0x02, 0x00, 0x64, 0x00, 0x0A]);
        assert_eq!(from_bytes::<FlapFrame>(&bytes).unwrap(), frame);
    }

    #[test]
    fn reject_bad_start_marker() {
        let raw = [0x2B, 0x02, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(from_bytes::<FlapFrame>(&raw).unwrap_err(), WireError::BadStartMarker(0x2B));
    }

    #[test]
    fn reject_unknown_frame_type() {
        let raw = [FLAP_START_MARKER, 0x06, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(from_bytes::<FlapFrame>(&raw).unwrap_err(), WireError::UnknownFrameType(6));
    }

    #[test]
    fn signon_frame_carries_version_then_tlvs() {
        let signon = FlapSignonFrame {
            flap_version: super::FLAP_VERSION,
            tlvs: TlvRestBlock::from(vec![Tlv::new_string(super::SIGNON_TLV_COOKIE, "c0ffee")]),
        };
        let bytes = to_bytes(&signon).unwrap();
        assert_eq!(&bytes[..4], &[0x00, 0x00, 0x00, 0x01]);
        assert_eq!(from_bytes::<FlapSignonFrame>(&bytes).unwrap(), signon);
    }
}
