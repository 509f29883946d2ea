//! Typed SNAC bodies, one module per food group.
//!
//! Each module carries its subgroup numbers, TLV tags, and the records
//! exchanged in that food group. Shared across most of them is
//! [`TlvUserInfo`], the presence record stamped into arrival notifications,
//! incoming messages, and locate replies.

pub mod auth;
pub mod buddy;
pub mod chat;
pub mod chatnav;
pub mod feedbag;
pub mod icbm;
pub mod locate;
pub mod oservice;
pub mod pd;

use crate::tlv::TlvBlock;
use crate::{OscarMarshal, OscarUnmarshal};

/// A user's presence summary: screen name, warning level, and a counted
/// block of user-info TLVs.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct TlvUserInfo {
    /// Screen name, u8 length prefixed
    #[oscar(len_prefix = "uint8")]
    pub screen_name: String,
    /// Warning ("evil") level, hundredths of a percent
    pub warning_level: u16,
    /// User-info TLVs; see [`userinfo`] for tags
    pub tlv_block: TlvBlock,
}

/// Tags and bit flags carried inside a [`TlvUserInfo`] block.
pub mod userinfo {
    /// u16 user flags
    pub const TLV_FLAGS: u16 = 0x0001;
    /// u32 sign-on time, UNIX epoch seconds
    pub const TLV_SIGNON_TIME: u16 = 0x0003;
    /// u16 idle time in seconds, 0 when active
    pub const TLV_IDLE_TIME: u16 = 0x0004;
    /// u16 status bits
    pub const TLV_STATUS: u16 = 0x0006;
    /// Concatenated 16-byte capability UUIDs
    pub const TLV_CAPABILITIES: u16 = 0x000D;

    /// Flag bit: an AIM client
    pub const FLAG_AIM: u16 = 0x0010;
    /// Flag bit: away message set
    pub const FLAG_UNAVAILABLE: u16 = 0x0020;
    /// Status bit: invisible to watchers
    pub const STATUS_INVISIBLE: u16 = 0x0100;
}

/// Binary form of the chat capability UUID
/// `748F2420-6287-11D1-8222-444553540000`. Opaque bytes on the wire.
pub const CHAT_CAPABILITY: [u8; 16] = [
    0x74, 0x8F, 0x24, 0x20, 0x62, 0x87, 0x11, 0xD1, 0x82, 0x22, 0x44, 0x45, 0x53, 0x54, 0x00, 0x00,
];

#[cfg(test)]
mod tests {
    use super::TlvUserInfo;
    use crate::tlv::{Tlv, TlvBlock};
    use crate::wire::{from_bytes, to_bytes};

    #[test]
    fn user_info_screen_name_is_u8_prefixed() {
        let info = TlvUserInfo {
            screen_name: "alice".to_string(),
            warning_level: 0,
            tlv_block: TlvBlock::from(vec![Tlv::new_u16(super::userinfo::TLV_FLAGS, 0x0010)]),
        };
        let bytes = to_bytes(&info).unwrap();
        assert_eq!(bytes[0], 5);
        assert_eq!(&bytes[1..6], b"alice");
        // warning, then TLV count
        assert_eq!(&bytes[6..10], &[0x00, 0x00, 0x00, 0x01]);
        assert_eq!(from_bytes::<TlvUserInfo>(&bytes).unwrap(), info);
    }
}
