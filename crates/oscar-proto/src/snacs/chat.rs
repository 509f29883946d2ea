//! Chat (food group `0x000E`): room traffic between joined members.

use super::TlvUserInfo;
use crate::tlv::{TlvBlock, TlvRestBlock};
use crate::{OscarMarshal, OscarUnmarshal};

/// Room metadata pushed to a joining member.
pub const SUBGROUP_ROOM_INFO_UPDATE: u16 = 0x0002;
/// Roster additions broadcast to all members.
pub const SUBGROUP_USERS_JOINED: u16 = 0x0003;
/// Roster removals broadcast to all members.
pub const SUBGROUP_USERS_LEFT: u16 = 0x0004;
/// Outgoing room message.
pub const SUBGROUP_CHANNEL_MSG_TO_HOST: u16 = 0x0005;
/// Incoming room message.
pub const SUBGROUP_CHANNEL_MSG_TO_CLIENT: u16 = 0x0006;

/// Sender-info TLV stamped by the server on relayed room messages.
pub const TLV_SENDER_INFO: u16 = 0x0003;
/// Message-info TLV relayed verbatim.
pub const TLV_MESSAGE_INFO: u16 = 0x0005;
/// Reflection-request TLV: when present, the sender receives its own
/// message back.
pub const TLV_ENABLE_REFLECTION: u16 = 0x0006;

/// Room-info TLV: room display name.
pub const ROOM_TLV_NAME: u16 = 0x00D3;

/// Identifies one chat room: exchange number, room cookie, instance.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct ChatRoomRef {
    /// Exchange the room lives on
    pub exchange: u16,
    /// Room cookie
    #[oscar(len_prefix = "uint8")]
    pub cookie: String,
    /// Room instance
    pub instance: u16,
}

/// Full room description: a [`ChatRoomRef`] plus detail TLVs.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct RoomInfo {
    /// Exchange the room lives on
    pub exchange: u16,
    /// Room cookie
    #[oscar(len_prefix = "uint8")]
    pub cookie: String,
    /// Room instance
    pub instance: u16,
    /// Detail level of the TLV block
    pub detail_level: u8,
    /// Room detail TLVs; [`ROOM_TLV_NAME`] carries the name
    pub tlvs: TlvBlock,
}

/// Roster broadcast: one presence record per affected member.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct UsersJoined {
    /// Members who joined
    pub users: Vec<TlvUserInfo>,
}

/// Roster broadcast for members who left.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct UsersLeft {
    /// Members who left
    pub users: Vec<TlvUserInfo>,
}

/// Outgoing room message.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct ChannelMsgToHost {
    /// Sender-chosen message cookie
    pub cookie: [u8; 8],
    /// Message channel
    pub channel_id: u16,
    /// Message TLVs; `0x06` requests reflection
    pub tlvs: TlvRestBlock,
}

/// Incoming room message, sender info stamped in TLV `0x03`.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct ChannelMsgToClient {
    /// Original sender cookie
    pub cookie: [u8; 8],
    /// Message channel
    pub channel_id: u16,
    /// Relayed message TLVs plus the sender-info stamp
    pub tlvs: TlvRestBlock,
}
